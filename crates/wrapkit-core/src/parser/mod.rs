//! Wrapper parser - tokenizer, AST types, and recursive descent parser
//!
//! Converts TypeScript wrapper source into a [`SourceUnit`]. The grammar
//! covered is the declaration surface: imports, `export * from`, type
//! aliases, interfaces and classes with their method signatures. Statement
//! and expression bodies are skipped by bracket balancing; their contents
//! are never interpreted.

pub mod ast;
pub mod tokenizer;

use crate::{Error, Result};
use ast::*;
use tokenizer::{Span, SpannedToken, Token, Tokenizer};

/// Parse wrapper source text into a [`SourceUnit`]
///
/// # Errors
/// Returns `ParseError` with line:column for syntax the parser cannot
/// place, e.g. a malformed type annotation or an unbalanced class body.
pub fn parse(input: &str) -> Result<SourceUnit> {
    let tokens = Tokenizer::new(input).tokenize()?;
    Parser::new(input, tokens).parse_source_unit()
}

/// Collect only the import specifiers of a source text.
///
/// Scans the token stream instead of building a full AST, so files whose
/// declarations use syntax outside the supported subset still resolve.
pub fn parse_imports(input: &str) -> Result<Vec<String>> {
    let tokens = Tokenizer::new(input).tokenize()?;
    let mut imports = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let is_statement_start = i == 0
            || !matches!(tokens[i - 1].token, Token::Dot | Token::QuestionDot);
        if tokens[i].token != Token::Import || !is_statement_start {
            i += 1;
            continue;
        }
        i += 1;
        if let Some(Token::StringLiteral(spec)) = tokens.get(i).map(|t| &t.token) {
            imports.push(spec.clone());
            continue;
        }
        while let Some(st) = tokens.get(i) {
            match &st.token {
                Token::Identifier(word) if word == "from" => {
                    if let Some(Token::StringLiteral(spec)) = tokens.get(i + 1).map(|t| &t.token) {
                        imports.push(spec.clone());
                        i += 2;
                        break;
                    }
                    i += 1;
                }
                Token::Semicolon | Token::Eof | Token::LParen | Token::Dot | Token::Equals => break,
                _ => i += 1,
            }
        }
    }

    Ok(imports)
}

/// Recursive descent parser over a token stream
pub struct Parser {
    source: Vec<char>,
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    pub fn new(source: &str, tokens: Vec<SpannedToken>) -> Self {
        Parser {
            source: source.chars().collect(),
            tokens,
            pos: 0,
        }
    }

    // ── Token helpers ──────────────────────────────────────

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.pos + offset)
            .map(|st| &st.token)
            .unwrap_or(&Token::Eof)
    }

    fn span(&self) -> Span {
        self.span_at(self.pos)
    }

    fn span_at(&self, index: usize) -> Span {
        match self.tokens.get(index).or_else(|| self.tokens.last()) {
            Some(st) => st.span.clone(),
            None => Span { line: 1, column: 1, offset: 0 },
        }
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        *self.peek() == Token::Eof
    }

    fn is_word(&self, word: &str) -> bool {
        matches!(self.peek(), Token::Identifier(w) if w == word)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("{:?}", expected)))
        }
    }

    fn unexpected(&self, expected: &str) -> Error {
        Error::ParseError(format!(
            "Expected {}, found {:?} at {}",
            expected,
            self.peek(),
            self.span()
        ))
    }

    fn expect_word(&mut self, what: &str) -> Result<String> {
        match self.peek().word() {
            Some(word) => {
                let word = word.to_string();
                self.advance();
                Ok(word)
            }
            None => Err(self.unexpected(what)),
        }
    }

    /// Verbatim source between two token indices (end exclusive)
    fn text_between(&self, start: usize, end: usize) -> String {
        let from = self.span_at(start).offset;
        let to = if end >= self.tokens.len() {
            self.source.len()
        } else {
            self.span_at(end).offset
        };
        self.source[from..to.max(from)].iter().collect::<String>().trim().to_string()
    }

    fn line_of(&self, index: usize) -> usize {
        self.span_at(index).line
    }

    // ── Skipping ───────────────────────────────────────────

    /// Consume tokens until `stop` matches at bracket depth zero. An
    /// unmatched closer at depth zero also stops (it belongs to the caller).
    fn skip_balanced_until(&mut self, stop: impl Fn(&Token) -> bool) {
        let mut depth = 0usize;
        loop {
            let token = self.peek();
            if *token == Token::Eof {
                return;
            }
            if depth == 0 && stop(token) {
                return;
            }
            match token {
                Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                Token::RParen | Token::RBracket | Token::RBrace => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip one balanced bracket group starting at the current opener
    fn skip_group(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.advance() {
                Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                Token::RParen | Token::RBracket | Token::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                Token::Eof => return,
                _ => {}
            }
        }
    }

    /// Skip `<…>` type parameters or arguments
    fn skip_angles(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.advance() {
                Token::LAngle => depth += 1,
                Token::RAngle => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                Token::Eof => return,
                _ => {}
            }
        }
    }

    /// Skip a statement (or class property initializer) the parser does
    /// not model. Ends at a depth-zero `;`, after a closing `}` that is not
    /// followed by an expression continuation, or at a line break before a
    /// token that begins a new declaration.
    fn skip_statement(&mut self) {
        let start = self.pos;
        let mut depth = 0usize;
        loop {
            let token = self.peek().clone();
            match token {
                Token::Eof => return,
                Token::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                Token::LParen | Token::LBracket | Token::LBrace => {
                    depth += 1;
                    self.advance();
                }
                Token::RParen | Token::RBracket => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    self.advance();
                }
                Token::RBrace => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    self.advance();
                    if depth == 0 && !continues_expression(self.peek()) {
                        self.eat(&Token::Semicolon);
                        return;
                    }
                }
                _ => {
                    if depth == 0
                        && self.pos > start
                        && self.line_of(self.pos) > self.line_of(self.pos - 1)
                        && self.starts_declaration()
                        && !continues_expression(&self.tokens[self.pos - 1].token)
                    {
                        return;
                    }
                    self.advance();
                }
            }
        }
    }

    fn starts_declaration(&self) -> bool {
        match self.peek() {
            Token::Import | Token::Export | Token::Class | Token::Interface | Token::At => true,
            Token::Identifier(word) => matches!(
                word.as_str(),
                "const" | "let" | "var" | "function" | "type" | "enum" | "declare" | "abstract"
                    | "async" | "namespace" | "module" | "public" | "private" | "protected"
                    | "static" | "readonly" | "get" | "set"
            ),
            _ => false,
        }
    }

    fn skip_decorator(&mut self) {
        self.advance(); // @
        while self.peek().word().is_some() {
            self.advance();
            if !self.eat(&Token::Dot) {
                break;
            }
        }
        if *self.peek() == Token::LParen {
            self.skip_group();
        }
    }

    // ── Source unit ────────────────────────────────────────

    pub fn parse_source_unit(&mut self) -> Result<SourceUnit> {
        let mut unit = SourceUnit::default();

        while !self.at_end() {
            match self.peek() {
                Token::Import => self.parse_import(&mut unit),
                Token::Export => {
                    self.advance();
                    match self.peek() {
                        Token::Operator('*') => self.parse_export_star(&mut unit),
                        Token::LBrace | Token::Equals => self.skip_statement(),
                        _ => {
                            if self.is_word("default") {
                                self.advance();
                            }
                            self.parse_declaration(&mut unit)?;
                        }
                    }
                }
                Token::At => self.skip_decorator(),
                Token::Semicolon => {
                    self.advance();
                }
                _ => self.parse_declaration(&mut unit)?,
            }
        }

        Ok(unit)
    }

    fn parse_import(&mut self, unit: &mut SourceUnit) {
        self.advance(); // import
        if let Token::StringLiteral(spec) = self.peek().clone() {
            self.advance();
            unit.imports.push(spec);
            self.eat(&Token::Semicolon);
            return;
        }
        if matches!(self.peek(), Token::LParen | Token::Dot) {
            // dynamic import() or import.meta inside an expression statement
            self.skip_statement();
            return;
        }
        loop {
            match self.peek().clone() {
                Token::Identifier(word) if word == "from" => {
                    self.advance();
                    if let Token::StringLiteral(spec) = self.peek().clone() {
                        self.advance();
                        unit.imports.push(spec);
                        self.eat(&Token::Semicolon);
                        return;
                    }
                }
                Token::Equals => {
                    // `import x = require('…')`
                    self.skip_statement();
                    return;
                }
                Token::Semicolon => {
                    self.advance();
                    return;
                }
                Token::Eof => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn parse_export_star(&mut self, unit: &mut SourceUnit) {
        self.advance(); // *
        if self.is_word("as") {
            self.advance();
            self.advance();
        }
        if self.is_word("from") {
            self.advance();
            if let Token::StringLiteral(spec) = self.peek().clone() {
                self.advance();
                unit.reexports.push(spec);
                self.eat(&Token::Semicolon);
                return;
            }
        }
        self.skip_statement();
    }

    fn parse_declaration(&mut self, unit: &mut SourceUnit) -> Result<()> {
        let mut is_abstract = false;
        loop {
            if self.is_word("declare") {
                self.advance();
            } else if self.is_word("abstract") && *self.peek_at(1) == Token::Class {
                self.advance();
                is_abstract = true;
            } else {
                break;
            }
        }

        match self.peek() {
            Token::Class => {
                let class = self.parse_class(is_abstract)?;
                unit.classes.push(class);
            }
            Token::Interface => {
                let decl = self.parse_interface()?;
                unit.type_decls.push(decl);
            }
            Token::Identifier(word)
                if word == "type"
                    && self.peek_at(1).word().is_some()
                    && matches!(self.peek_at(2), Token::Equals | Token::LAngle) =>
            {
                let decl = self.parse_type_alias()?;
                unit.type_decls.push(decl);
            }
            Token::Identifier(word)
                if word == "function"
                    || (word == "async" && self.peek_at(1).word() == Some("function")) =>
            {
                let start = self.pos;
                match self.parse_function() {
                    Ok(function) => unit.functions.push(function),
                    Err(_) => {
                        // signatures outside the supported subset are skipped like other statements
                        self.pos = start;
                        self.skip_statement();
                    }
                }
            }
            _ => {
                let start = self.pos;
                self.skip_statement();
                if self.pos == start {
                    // stray closer at top level
                    self.advance();
                }
            }
        }
        Ok(())
    }

    fn parse_function(&mut self) -> Result<FunctionDecl> {
        let span = self.span();
        if self.is_word("async") {
            self.advance();
        }
        self.advance(); // function
        self.eat(&Token::Operator('*'));
        let name = match self.peek() {
            Token::LParen | Token::LAngle => None,
            _ => Some(self.expect_word("function name")?),
        };
        self.parse_type_params();
        let params = self.parse_params()?;
        let returns = if self.eat(&Token::Colon) {
            Some(self.parse_type_return()?)
        } else {
            None
        };
        match self.peek() {
            Token::LBrace => self.skip_group(),
            _ => {
                // overload or ambient signature
                self.eat(&Token::Semicolon);
            }
        }
        Ok(FunctionDecl {
            name,
            params,
            returns,
            span,
        })
    }

    // ── Type declarations ──────────────────────────────────

    fn parse_type_params(&mut self) -> Vec<String> {
        let mut names = Vec::new();
        if *self.peek() != Token::LAngle {
            return names;
        }
        self.advance();
        let mut depth = 1usize;
        let mut expecting_name = true;
        while depth > 0 && !self.at_end() {
            match self.advance() {
                Token::LAngle => depth += 1,
                Token::RAngle => depth -= 1,
                Token::LParen | Token::LBracket | Token::LBrace => {
                    self.pos -= 1;
                    self.skip_group();
                }
                Token::Comma if depth == 1 => expecting_name = true,
                Token::Identifier(name) if depth == 1 && expecting_name => {
                    if name != "const" && name != "in" && name != "out" {
                        names.push(name);
                        expecting_name = false;
                    }
                }
                _ => {}
            }
        }
        names
    }

    fn parse_type_alias(&mut self) -> Result<TypeDecl> {
        let span = self.span();
        self.advance(); // type
        let name = self.expect_word("type name")?;
        let type_params = self.parse_type_params();
        self.expect(&Token::Equals)?;
        let body = self.parse_type()?;
        self.eat(&Token::Semicolon);
        Ok(TypeDecl {
            name,
            type_params,
            kind: TypeDeclKind::Alias(body),
            span,
        })
    }

    fn parse_interface(&mut self) -> Result<TypeDecl> {
        let span = self.span();
        self.advance(); // interface
        let name = self.expect_word("interface name")?;
        let type_params = self.parse_type_params();
        let mut extends = Vec::new();
        if self.eat(&Token::Extends) {
            loop {
                extends.push(self.parse_type_postfix()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        let members = self.parse_object_members()?;
        Ok(TypeDecl {
            name,
            type_params,
            kind: TypeDeclKind::Interface { extends, members },
            span,
        })
    }

    // ── Type expressions ───────────────────────────────────

    /// Parse a full type expression
    pub fn parse_type(&mut self) -> Result<TypeExpr> {
        let check = self.parse_type_union()?;
        if *self.peek() == Token::Extends {
            self.advance();
            let extends = self.parse_type_union()?;
            self.expect(&Token::Question)?;
            let then = self.parse_type()?;
            self.expect(&Token::Colon)?;
            let otherwise = self.parse_type()?;
            return Ok(TypeExpr::Conditional {
                check: Box::new(check),
                extends: Box::new(extends),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            });
        }
        Ok(check)
    }

    fn parse_type_union(&mut self) -> Result<TypeExpr> {
        self.eat(&Token::Pipe);
        let mut members = vec![self.parse_type_intersection()?];
        while self.eat(&Token::Pipe) {
            members.push(self.parse_type_intersection()?);
        }
        Ok(if members.len() == 1 {
            members.remove(0)
        } else {
            TypeExpr::Union(members)
        })
    }

    fn parse_type_intersection(&mut self) -> Result<TypeExpr> {
        self.eat(&Token::Amp);
        let mut members = vec![self.parse_type_operator()?];
        while self.eat(&Token::Amp) {
            members.push(self.parse_type_operator()?);
        }
        Ok(if members.len() == 1 {
            members.remove(0)
        } else {
            TypeExpr::Intersection(members)
        })
    }

    fn parse_type_operator(&mut self) -> Result<TypeExpr> {
        if let Token::Identifier(word) = self.peek() {
            let is_operator = matches!(word.as_str(), "keyof" | "unique" | "readonly" | "infer" | "typeof")
                && (self.peek_at(1).word().is_some()
                    || matches!(self.peek_at(1), Token::LParen | Token::LBracket | Token::LBrace | Token::Import));
            if is_operator {
                let op = word.clone();
                self.advance();
                let operand = self.parse_type_operator()?;
                return Ok(TypeExpr::Operator {
                    op,
                    operand: Box::new(operand),
                });
            }
        }
        self.parse_type_postfix()
    }

    fn parse_type_postfix(&mut self) -> Result<TypeExpr> {
        let mut base = self.parse_type_primary()?;
        while *self.peek() == Token::LBracket {
            // `T[]` only binds on the same line
            if self.line_of(self.pos) != self.line_of(self.pos - 1) {
                break;
            }
            self.advance();
            if self.eat(&Token::RBracket) {
                base = TypeExpr::Array(Box::new(base));
            } else {
                let index = self.parse_type()?;
                self.expect(&Token::RBracket)?;
                base = TypeExpr::Indexed {
                    object: Box::new(base),
                    index: Box::new(index),
                };
            }
        }
        Ok(base)
    }

    fn parse_type_primary(&mut self) -> Result<TypeExpr> {
        match self.peek().clone() {
            Token::LParen => {
                if self.paren_starts_function_type() {
                    self.parse_function_type(false)
                } else {
                    self.advance();
                    let inner = self.parse_type()?;
                    self.expect(&Token::RParen)?;
                    Ok(TypeExpr::Parenthesized(Box::new(inner)))
                }
            }
            Token::LAngle => {
                // generic function type `<T>(x: T) => T`
                self.skip_angles();
                self.parse_function_type(false)
            }
            Token::LBrace => Ok(TypeExpr::Object(self.parse_object_members()?)),
            Token::LBracket => self.parse_tuple_type(),
            Token::StringLiteral(value) => {
                self.advance();
                Ok(TypeExpr::Literal(format!("\"{}\"", value.replace('"', "\\\""))))
            }
            Token::TemplateLiteral(raw) => {
                self.advance();
                Ok(TypeExpr::Literal(format!("`{}`", raw)))
            }
            Token::NumberLiteral(text) => {
                self.advance();
                Ok(TypeExpr::Literal(text))
            }
            Token::BooleanLiteral(value) => {
                self.advance();
                Ok(TypeExpr::Literal(value.to_string()))
            }
            Token::Operator('-') => {
                self.advance();
                match self.advance() {
                    Token::NumberLiteral(text) => Ok(TypeExpr::Literal(format!("-{}", text))),
                    _ => Err(Error::ParseError(format!(
                        "Expected numeric literal after '-' at {}",
                        self.span()
                    ))),
                }
            }
            Token::Import => {
                // `import('module').Name`
                self.advance();
                self.expect(&Token::LParen)?;
                let spec = match self.advance() {
                    Token::StringLiteral(spec) => spec,
                    _ => return Err(self.unexpected("module specifier")),
                };
                self.expect(&Token::RParen)?;
                let mut name = format!("import(\"{}\")", spec);
                while self.eat(&Token::Dot) {
                    name.push('.');
                    name.push_str(&self.expect_word("qualified name")?);
                }
                let args = self.parse_type_args()?;
                Ok(TypeExpr::Reference { name, args })
            }
            Token::Identifier(word) if word == "new" && *self.peek_at(1) == Token::LParen => {
                self.advance();
                self.parse_function_type(true)
            }
            token => {
                if token.word().is_none() {
                    return Err(self.unexpected("type"));
                }
                let mut name = self.expect_word("type name")?;
                while *self.peek() == Token::Dot {
                    self.advance();
                    name.push('.');
                    name.push_str(&self.expect_word("qualified name")?);
                }
                let args = self.parse_type_args()?;
                Ok(TypeExpr::Reference { name, args })
            }
        }
    }

    fn parse_type_args(&mut self) -> Result<Vec<TypeExpr>> {
        let mut args = Vec::new();
        if !self.eat(&Token::LAngle) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_type()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RAngle)?;
            return Ok(args);
        }
    }

    /// `(` starts a function type when the matching `)` is followed by `=>`
    fn paren_starts_function_type(&self) -> bool {
        let mut depth = 0usize;
        let mut index = self.pos;
        while let Some(st) = self.tokens.get(index) {
            match st.token {
                Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                Token::RParen | Token::RBracket | Token::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return matches!(self.tokens.get(index + 1).map(|t| &t.token), Some(Token::Arrow));
                    }
                }
                Token::Eof => return false,
                _ => {}
            }
            index += 1;
        }
        false
    }

    fn parse_function_type(&mut self, constructor: bool) -> Result<TypeExpr> {
        let params = self.parse_params()?;
        self.expect(&Token::Arrow)?;
        let returns = self.parse_type_return()?;
        Ok(TypeExpr::Function {
            params,
            returns: Box::new(returns),
            constructor,
        })
    }

    /// Return position, allowing type predicates such as `x is Foo`
    fn parse_type_return(&mut self) -> Result<TypeExpr> {
        if self.is_word("asserts") && self.peek_at(1).word().is_some() {
            self.advance();
        }
        let ty = self.parse_type()?;
        if self.is_word("is") {
            self.advance();
            let narrowed = self.parse_type()?;
            return Ok(TypeExpr::Literal(format!("{} is {}", ty, narrowed)));
        }
        Ok(ty)
    }

    fn parse_tuple_type(&mut self) -> Result<TypeExpr> {
        self.expect(&Token::LBracket)?;
        let mut elements = Vec::new();
        while *self.peek() != Token::RBracket {
            let rest = self.eat(&Token::Ellipsis);
            // labelled element `name: T` or `name?: T`
            if self.peek().word().is_some()
                && (matches!(self.peek_at(1), Token::Colon)
                    || (*self.peek_at(1) == Token::Question && *self.peek_at(2) == Token::Colon))
            {
                self.advance();
                self.eat(&Token::Question);
                self.advance();
            }
            let mut element = self.parse_type()?;
            if self.eat(&Token::Question) {
                element = TypeExpr::Literal(format!("{}?", element));
            }
            if rest {
                element = TypeExpr::Literal(format!("...{}", element));
            }
            elements.push(element);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RBracket)?;
        Ok(TypeExpr::Tuple(elements))
    }

    /// Parse `{ … }` members of an object type or interface body
    fn parse_object_members(&mut self) -> Result<Vec<TypeMember>> {
        self.expect(&Token::LBrace)?;
        let mut members = Vec::new();

        loop {
            match self.peek() {
                Token::RBrace => {
                    self.advance();
                    return Ok(members);
                }
                Token::Eof => return Err(self.unexpected("'}' closing object type")),
                Token::Semicolon | Token::Comma => {
                    self.advance();
                }
                _ => members.push(self.parse_object_member()?),
            }
        }
    }

    fn parse_object_member(&mut self) -> Result<TypeMember> {
        let mut readonly = false;
        if self.is_word("readonly")
            && (self.peek_at(1).word().is_some()
                || matches!(self.peek_at(1), Token::LBracket | Token::StringLiteral(_)))
        {
            self.advance();
            readonly = true;
        }
        // mapped type modifiers `+readonly` / `-readonly`
        if matches!(self.peek(), Token::Operator('+') | Token::Operator('-')) && self.peek_at(1).word() == Some("readonly") {
            self.advance();
            self.advance();
            readonly = true;
        }

        match self.peek().clone() {
            Token::LBracket => {
                self.advance();
                let key_name = self.expect_word("index key")?;
                let mapped = if self.eat(&Token::Colon) {
                    false
                } else if self.is_word("in") {
                    self.advance();
                    true
                } else {
                    return Err(self.unexpected("':' or 'in' in index signature"));
                };
                let key = self.parse_type()?;
                if mapped && self.is_word("as") {
                    self.advance();
                    self.parse_type()?;
                }
                self.expect(&Token::RBracket)?;
                if matches!(self.peek(), Token::Operator('+') | Token::Operator('-')) {
                    self.advance();
                }
                self.eat(&Token::Question);
                let value = if self.eat(&Token::Colon) {
                    Some(self.parse_type()?)
                } else {
                    None
                };
                Ok(TypeMember::Index {
                    key_name,
                    key: Box::new(key),
                    mapped,
                    value,
                })
            }
            Token::LParen | Token::LAngle => self.parse_method_signature(String::new(), false),
            Token::Identifier(word) if word == "new" && matches!(self.peek_at(1), Token::LParen | Token::LAngle) => {
                self.advance();
                self.parse_method_signature("new".to_string(), false)
            }
            token => {
                let name = match token {
                    Token::StringLiteral(value) => {
                        self.advance();
                        value
                    }
                    Token::NumberLiteral(text) => {
                        self.advance();
                        text
                    }
                    _ => self.expect_word("property name")?,
                };
                let optional = self.eat(&Token::Question);
                if matches!(self.peek(), Token::LParen | Token::LAngle) {
                    return self.parse_method_signature(name, optional);
                }
                let annotation = if self.eat(&Token::Colon) {
                    Some(self.parse_type()?)
                } else {
                    None
                };
                Ok(TypeMember::Property {
                    name,
                    optional,
                    readonly,
                    annotation,
                })
            }
        }
    }

    fn parse_method_signature(&mut self, name: String, optional: bool) -> Result<TypeMember> {
        if *self.peek() == Token::LAngle {
            self.skip_angles();
        }
        let params = self.parse_params()?;
        let returns = if self.eat(&Token::Colon) {
            Some(self.parse_type_return()?)
        } else {
            None
        };
        Ok(TypeMember::Method {
            name,
            optional,
            params,
            returns,
        })
    }

    // ── Parameters ─────────────────────────────────────────

    fn parse_params(&mut self) -> Result<Vec<Param>> {
        self.expect(&Token::LParen)?;
        let mut params = Vec::new();

        loop {
            while *self.peek() == Token::At {
                self.skip_decorator();
            }
            if self.eat(&Token::RParen) {
                return Ok(params);
            }
            params.push(self.parse_param()?);
            if !self.eat(&Token::Comma) {
                self.expect(&Token::RParen)?;
                return Ok(params);
            }
        }
    }

    fn parse_param(&mut self) -> Result<Param> {
        let span = self.span();

        // parameter properties: `readonly address: Address`
        while let Token::Identifier(word) = self.peek() {
            let is_modifier = matches!(word.as_str(), "public" | "private" | "protected" | "readonly" | "override")
                && (self.peek_at(1).word().is_some() || matches!(self.peek_at(1), Token::LBrace | Token::LBracket));
            if !is_modifier {
                break;
            }
            self.advance();
        }

        let pattern = match self.peek().clone() {
            Token::Ellipsis => {
                self.advance();
                let name = self.expect_word("rest parameter name")?;
                let annotation = self.parse_optional_annotation()?;
                ParamPattern::Rest { name, annotation }
            }
            Token::LBrace | Token::LBracket => {
                let start = self.pos;
                self.skip_group();
                let text = self.text_between(start, self.pos);
                self.eat(&Token::Question);
                let annotation = self.parse_optional_annotation()?;
                ParamPattern::Destructured { text, annotation }
            }
            _ => {
                let name = self.expect_word("parameter name")?;
                let optional = self.eat(&Token::Question);
                let annotation = self.parse_optional_annotation()?;
                ParamPattern::Identifier {
                    name,
                    optional,
                    annotation,
                }
            }
        };

        let default = if self.eat(&Token::Equals) {
            let start = self.pos;
            self.skip_balanced_until(|t| matches!(t, Token::Comma | Token::RParen));
            if self.pos == start {
                return Err(self.unexpected("default value expression"));
            }
            Some(self.text_between(start, self.pos))
        } else {
            None
        };

        Ok(Param { pattern, default, span })
    }

    fn parse_optional_annotation(&mut self) -> Result<Option<TypeExpr>> {
        if self.eat(&Token::Colon) {
            Ok(Some(self.parse_type_return()?))
        } else {
            Ok(None)
        }
    }

    // ── Classes ────────────────────────────────────────────

    fn parse_class(&mut self, is_abstract: bool) -> Result<ClassDecl> {
        let span = self.span();
        self.expect(&Token::Class)?;

        let name = match self.peek() {
            Token::Identifier(word) if word != "implements" => {
                let word = word.clone();
                self.advance();
                Some(word)
            }
            _ => None,
        };
        self.parse_type_params();

        let extends = if self.eat(&Token::Extends) {
            let start = self.pos;
            self.skip_balanced_until(|t| matches!(t, Token::Implements | Token::LBrace));
            Some(self.text_between(start, self.pos))
        } else {
            None
        };

        let mut implements = Vec::new();
        if self.eat(&Token::Implements) {
            loop {
                implements.push(self.parse_type_postfix()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }

        self.expect(&Token::LBrace)?;
        let mut methods = Vec::new();
        let mut properties = Vec::new();
        loop {
            match self.peek() {
                Token::RBrace => {
                    self.advance();
                    break;
                }
                Token::Eof => {
                    return Err(Error::ParseError(format!(
                        "Unterminated class body starting at {}",
                        span
                    )));
                }
                Token::Semicolon => {
                    self.advance();
                }
                Token::At => self.skip_decorator(),
                _ => {
                    match self.parse_class_member()? {
                        Some(ClassMember::Method(method)) => methods.push(method),
                        Some(ClassMember::Property(property)) => properties.push(property),
                        None => {}
                    }
                }
            }
        }

        Ok(ClassDecl {
            name,
            is_abstract,
            extends,
            implements,
            methods,
            properties,
            span,
        })
    }

    /// Parse one class member; static blocks yield `None`
    fn parse_class_member(&mut self) -> Result<Option<ClassMember>> {
        let span = self.span();
        let mut is_static = false;
        let mut is_async = false;
        let mut kind = MethodKind::Method;

        loop {
            let Token::Identifier(word) = self.peek() else { break };
            let next_is_name = self.peek_at(1).word().is_some()
                || matches!(
                    self.peek_at(1),
                    Token::LBracket | Token::StringLiteral(_) | Token::NumberLiteral(_) | Token::Operator('*')
                );
            if !next_is_name {
                break;
            }
            match word.as_str() {
                "static" => is_static = true,
                "async" => is_async = true,
                "get" => kind = MethodKind::Getter,
                "set" => kind = MethodKind::Setter,
                "public" | "private" | "protected" | "readonly" | "abstract" | "override" | "declare"
                | "accessor" => {}
                _ => break,
            }
            self.advance();
        }
        if self.eat(&Token::Operator('*')) {
            // generator methods are never contract operations
        }

        let name = match self.peek().clone() {
            Token::LBracket => {
                let start = self.pos;
                self.skip_group();
                self.text_between(start, self.pos)
            }
            Token::StringLiteral(value) => {
                self.advance();
                value
            }
            Token::NumberLiteral(text) => {
                self.advance();
                text
            }
            Token::LBrace if is_static => {
                // static initialization block
                self.skip_group();
                return Ok(None);
            }
            _ => self.expect_word("class member name")?,
        };
        if name == "constructor" && kind == MethodKind::Method {
            kind = MethodKind::Constructor;
        }

        self.eat(&Token::Question);
        self.eat(&Token::Bang);

        if matches!(self.peek(), Token::LParen | Token::LAngle) {
            if *self.peek() == Token::LAngle {
                self.skip_angles();
            }
            let params = self.parse_params()?;
            let returns = if self.eat(&Token::Colon) {
                Some(self.parse_type_return()?)
            } else {
                None
            };
            match self.peek() {
                Token::LBrace => self.skip_group(),
                _ => {
                    // overload or abstract signature
                    self.eat(&Token::Semicolon);
                }
            }
            return Ok(Some(ClassMember::Method(MethodDecl {
                name,
                kind,
                is_async,
                is_static,
                params,
                returns,
                span,
            })));
        }

        // property: optional annotation, optional initializer
        let annotation = if self.eat(&Token::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        if self.eat(&Token::Equals) {
            self.skip_statement();
        } else {
            self.eat(&Token::Semicolon);
        }
        Ok(Some(ClassMember::Property(PropertyDecl {
            name,
            annotation,
            span,
        })))
    }
}

enum ClassMember {
    Method(MethodDecl),
    Property(PropertyDecl),
}

/// Tokens that keep an expression going after a closing brace or line end
fn continues_expression(token: &Token) -> bool {
    match token {
        Token::Dot
        | Token::QuestionDot
        | Token::LParen
        | Token::LBracket
        | Token::Comma
        | Token::Question
        | Token::Colon
        | Token::Pipe
        | Token::Amp
        | Token::Equals
        | Token::Arrow
        | Token::LAngle
        | Token::RAngle
        | Token::Operator(_)
        | Token::TemplateLiteral(_) => true,
        Token::Identifier(word) => matches!(word.as_str(), "as" | "satisfies" | "instanceof" | "in"),
        _ => false,
    }
}
