//! Tokenizer - converts wrapper source text into a token stream
//!
//! Handles: keywords, identifiers, string/template/regex literals, numeric
//! literals (including bigint `n` suffixes), and punctuation.
//! Comments (`//` and `/* */`) are discarded.
//!
//! Only the structural tokens matter downstream: bodies are skipped by
//! bracket balancing, so multi-character operators such as `===` are
//! emitted as runs of single-character tokens. `=>`, `...` and `?.` are
//! the exceptions because the parser inspects them.

/// Token types for the TypeScript subset
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Import,
    Export,
    Class,
    Interface,
    Extends,
    Implements,

    // Literals
    StringLiteral(String),
    TemplateLiteral(String),
    RegexLiteral(String),
    NumberLiteral(String),
    BooleanLiteral(bool),

    // Symbols
    LBrace,     // {
    RBrace,     // }
    LParen,     // (
    RParen,     // )
    LBracket,   // [
    RBracket,   // ]
    LAngle,     // <
    RAngle,     // >
    Colon,      // :
    Semicolon,  // ;
    Comma,      // ,
    Dot,        // .
    Ellipsis,   // ...
    Equals,     // =
    Arrow,      // =>
    Question,   // ?
    QuestionDot, // ?.
    Pipe,       // |
    Amp,        // &
    Bang,       // !
    At,         // @
    /// Any other operator character (`+ - * / % ^ ~`)
    Operator(char),

    // Other
    Identifier(String),
    Eof,
}

impl Token {
    /// Text of an identifier or keyword, usable where TypeScript accepts
    /// reserved words as property names.
    pub fn word(&self) -> Option<&str> {
        match self {
            Token::Identifier(name) => Some(name),
            Token::Import => Some("import"),
            Token::Export => Some("export"),
            Token::Class => Some("class"),
            Token::Interface => Some("interface"),
            Token::Extends => Some("extends"),
            Token::Implements => Some("implements"),
            Token::BooleanLiteral(true) => Some("true"),
            Token::BooleanLiteral(false) => Some("false"),
            _ => None,
        }
    }

    /// Whether a `/` following this token starts a regex literal
    fn allows_regex_after(&self) -> bool {
        match self {
            Token::Identifier(word) => matches!(
                word.as_str(),
                "return" | "typeof" | "case" | "do" | "else" | "in" | "of" | "new" | "delete" | "void" | "throw"
            ),
            Token::NumberLiteral(_)
            | Token::StringLiteral(_)
            | Token::TemplateLiteral(_)
            | Token::RegexLiteral(_)
            | Token::BooleanLiteral(_)
            | Token::RParen
            | Token::RBracket
            | Token::RBrace => false,
            _ => true,
        }
    }
}

/// Position in source text for error reporting
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Token with source position
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Tokenizer for wrapper source text
pub struct Tokenizer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    last: Option<Token>,
}

impl Tokenizer {
    /// Create a new tokenizer for the given input text
    pub fn new(text: &str) -> Self {
        Tokenizer {
            input: text.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            last: None,
        }
    }

    /// Tokenize the entire input into a stream of spanned tokens
    pub fn tokenize(&mut self) -> crate::Result<Vec<SpannedToken>> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments()?;

            if self.is_at_end() {
                tokens.push(SpannedToken {
                    token: Token::Eof,
                    span: self.current_span(),
                });
                break;
            }

            let token = self.next_token()?;
            self.last = Some(token.token.clone());
            tokens.push(token);
        }

        Ok(tokens)
    }

    // ── Character helpers ──────────────────────────────────

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.input.get(self.position).copied();
        if let Some(c) = ch {
            self.position += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        ch
    }

    fn current_span(&self) -> Span {
        Span {
            line: self.line,
            column: self.column,
            offset: self.position,
        }
    }

    fn error(&self, message: String) -> crate::Error {
        crate::Error::ParseError(message)
    }

    // ── Whitespace & Comments ──────────────────────────────

    fn skip_whitespace_and_comments(&mut self) -> crate::Result<()> {
        // hashbang line, only as the very first characters of the file
        if self.position == 0 && self.peek() == Some('#') && self.peek_ahead(1) == Some('!') {
            while let Some(ch) = self.peek() {
                if ch == '\n' {
                    break;
                }
                self.advance();
            }
        }

        loop {
            while let Some(ch) = self.peek() {
                if ch.is_whitespace() {
                    self.advance();
                } else {
                    break;
                }
            }

            if self.peek() == Some('/') && self.peek_ahead(1) == Some('/') {
                while let Some(ch) = self.peek() {
                    if ch == '\n' {
                        break;
                    }
                    self.advance();
                }
                continue;
            }

            if self.peek() == Some('/') && self.peek_ahead(1) == Some('*') {
                let span = self.current_span();
                self.advance();
                self.advance();
                loop {
                    match self.advance() {
                        None => {
                            return Err(self.error(format!("Unterminated block comment starting at {}", span)));
                        }
                        Some('*') if self.peek() == Some('/') => {
                            self.advance();
                            break;
                        }
                        Some(_) => {}
                    }
                }
                continue;
            }

            return Ok(());
        }
    }

    // ── Main dispatch ──────────────────────────────────────

    fn next_token(&mut self) -> crate::Result<SpannedToken> {
        let span = self.current_span();
        let Some(ch) = self.peek() else {
            return Ok(SpannedToken { token: Token::Eof, span });
        };

        match ch {
            '{' => self.single(Token::LBrace, span),
            '}' => self.single(Token::RBrace, span),
            '(' => self.single(Token::LParen, span),
            ')' => self.single(Token::RParen, span),
            '[' => self.single(Token::LBracket, span),
            ']' => self.single(Token::RBracket, span),
            '<' => self.single(Token::LAngle, span),
            '>' => self.single(Token::RAngle, span),
            ':' => self.single(Token::Colon, span),
            ';' => self.single(Token::Semicolon, span),
            ',' => self.single(Token::Comma, span),
            '|' => self.single(Token::Pipe, span),
            '&' => self.single(Token::Amp, span),
            '!' => self.single(Token::Bang, span),
            '@' => self.single(Token::At, span),
            '=' if self.peek_ahead(1) == Some('>') => {
                self.advance();
                self.advance();
                Ok(SpannedToken { token: Token::Arrow, span })
            }
            '=' => self.single(Token::Equals, span),
            '?' if self.peek_ahead(1) == Some('.')
                && !self.peek_ahead(2).is_some_and(|c| c.is_ascii_digit()) =>
            {
                self.advance();
                self.advance();
                Ok(SpannedToken { token: Token::QuestionDot, span })
            }
            '?' => self.single(Token::Question, span),
            '.' if self.peek_ahead(1) == Some('.') && self.peek_ahead(2) == Some('.') => {
                self.advance();
                self.advance();
                self.advance();
                Ok(SpannedToken { token: Token::Ellipsis, span })
            }
            '.' if self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit()) => self.read_number(span),
            '.' => self.single(Token::Dot, span),
            '"' | '\'' => self.read_string(ch, span),
            '`' => self.read_template(span),
            '/' if self.last.as_ref().map_or(true, Token::allows_regex_after) => self.read_regex(span),
            '+' | '-' | '*' | '/' | '%' | '^' | '~' => self.single(Token::Operator(ch), span),
            c if c.is_ascii_digit() => self.read_number(span),
            '#' if self.peek_ahead(1).is_some_and(is_identifier_start) => {
                self.advance();
                self.read_identifier_or_keyword(span, "#")
            }
            c if is_identifier_start(c) => self.read_identifier_or_keyword(span, ""),
            _ => Err(self.error(format!("Unexpected character '{}' at {}", ch, span))),
        }
    }

    fn single(&mut self, token: Token, span: Span) -> crate::Result<SpannedToken> {
        self.advance();
        Ok(SpannedToken { token, span })
    }

    // ── String literals ────────────────────────────────────

    fn read_string(&mut self, quote: char, span: Span) -> crate::Result<SpannedToken> {
        self.advance(); // consume opening quote
        let mut value = String::new();

        loop {
            match self.advance() {
                None | Some('\n') => {
                    return Err(self.error(format!("Unterminated string starting at {}", span)));
                }
                Some(c) if c == quote => break,
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('0') => value.push('\0'),
                    Some('\n') => {}
                    Some(c) => value.push(c),
                    None => {
                        return Err(self.error(format!("Unterminated escape sequence at {}", self.current_span())));
                    }
                },
                Some(c) => value.push(c),
            }
        }

        Ok(SpannedToken {
            token: Token::StringLiteral(value),
            span,
        })
    }

    /// Template literals are kept raw; `${ … }` substitutions are scanned
    /// with brace counting so nested braces do not end the literal early.
    fn read_template(&mut self, span: Span) -> crate::Result<SpannedToken> {
        self.advance(); // consume opening `
        let mut raw = String::new();
        let mut depth = 0usize;

        loop {
            match self.advance() {
                None => {
                    return Err(self.error(format!("Unterminated template literal starting at {}", span)));
                }
                Some('`') if depth == 0 => break,
                Some('\\') => {
                    raw.push('\\');
                    if let Some(c) = self.advance() {
                        raw.push(c);
                    }
                }
                Some('$') if depth == 0 && self.peek() == Some('{') => {
                    self.advance();
                    raw.push_str("${");
                    depth = 1;
                }
                Some('{') if depth > 0 => {
                    depth += 1;
                    raw.push('{');
                }
                Some('}') if depth > 0 => {
                    depth -= 1;
                    raw.push('}');
                }
                Some(c) => raw.push(c),
            }
        }

        Ok(SpannedToken {
            token: Token::TemplateLiteral(raw),
            span,
        })
    }

    fn read_regex(&mut self, span: Span) -> crate::Result<SpannedToken> {
        let start = self.position;
        self.advance(); // consume opening /
        let mut in_class = false;

        loop {
            match self.advance() {
                None | Some('\n') => {
                    return Err(self.error(format!("Unterminated regex literal starting at {}", span)));
                }
                Some('\\') => {
                    self.advance();
                }
                Some('[') => in_class = true,
                Some(']') => in_class = false,
                Some('/') if !in_class => break,
                Some(_) => {}
            }
        }
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.advance();
        }

        let text: String = self.input[start..self.position].iter().collect();
        Ok(SpannedToken {
            token: Token::RegexLiteral(text),
            span,
        })
    }

    // ── Numbers ────────────────────────────────────────────

    fn read_number(&mut self, span: Span) -> crate::Result<SpannedToken> {
        let start = self.position;

        let radix_prefix = self.peek() == Some('0')
            && matches!(self.peek_ahead(1), Some('x' | 'X' | 'b' | 'B' | 'o' | 'O'));
        if radix_prefix {
            self.advance();
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit() || c == '_') {
                self.advance();
            }
        } else {
            while let Some(ch) = self.peek() {
                if ch.is_ascii_digit() || ch == '_' || ch == '.' {
                    self.advance();
                } else if matches!(ch, 'e' | 'E') {
                    self.advance();
                    if matches!(self.peek(), Some('+' | '-')) {
                        self.advance();
                    }
                } else {
                    break;
                }
            }
        }

        if self.peek() == Some('n') {
            self.advance();
        }

        if self.peek().is_some_and(is_identifier_start) {
            let text: String = self.input[start..=self.position].iter().collect();
            return Err(self.error(format!("Invalid numeric literal '{}' at {}", text, span)));
        }

        let text: String = self.input[start..self.position].iter().collect();
        Ok(SpannedToken {
            token: Token::NumberLiteral(text),
            span,
        })
    }

    // ── Identifiers & Keywords ─────────────────────────────

    fn read_identifier_or_keyword(&mut self, span: Span, prefix: &str) -> crate::Result<SpannedToken> {
        let start = self.position;

        while let Some(ch) = self.peek() {
            if is_identifier_part(ch) {
                self.advance();
            } else {
                break;
            }
        }

        let text: String = self.input[start..self.position].iter().collect();
        if !prefix.is_empty() {
            return Ok(SpannedToken {
                token: Token::Identifier(format!("{}{}", prefix, text)),
                span,
            });
        }

        let token = match text.as_str() {
            "import" => Token::Import,
            "export" => Token::Export,
            "class" => Token::Class,
            "interface" => Token::Interface,
            "extends" => Token::Extends,
            "implements" => Token::Implements,
            "true" => Token::BooleanLiteral(true),
            "false" => Token::BooleanLiteral(false),
            _ => Token::Identifier(text),
        };

        Ok(SpannedToken { token, span })
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
