//! AST types - the structural view of a wrapper source unit
//!
//! Only what interface extraction and import resolution need is kept:
//! import specifiers, type declarations, top-level function signatures,
//! and class member signatures. Function bodies, initializers and
//! statements are skipped by the parser.
//!
//! Type expressions render back to source-like text through `Display`;
//! that text is what the schema emits for primitive and opaque types.

use std::fmt;

use super::tokenizer::Span;

/// One parsed source file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceUnit {
    /// Specifiers of `import … from '<spec>'` / `import '<spec>'`, in order
    pub imports: Vec<String>,
    /// Specifiers of `export * from '<spec>'`
    pub reexports: Vec<String>,
    pub type_decls: Vec<TypeDecl>,
    /// Top-level `function` declarations, overload signatures included
    pub functions: Vec<FunctionDecl>,
    pub classes: Vec<ClassDecl>,
}

impl SourceUnit {
    /// Find a type alias or interface by exact name
    pub fn type_decl(&self, name: &str) -> Option<&TypeDecl> {
        self.type_decls.iter().find(|decl| decl.name == name)
    }

    pub fn declares_type(&self, name: &str) -> bool {
        self.type_decl(name).is_some()
    }

    pub fn class(&self, name: &str) -> Option<&ClassDecl> {
        self.classes.iter().find(|class| class.name.as_deref() == Some(name))
    }
}

// ── Type declarations ─────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: String,
    pub type_params: Vec<String>,
    pub kind: TypeDeclKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDeclKind {
    /// `type Name = <body>`
    Alias(TypeExpr),
    /// `interface Name extends … { … }`
    Interface {
        extends: Vec<TypeExpr>,
        members: Vec<TypeMember>,
    },
}

/// A member of an object type literal or interface body
#[derive(Debug, Clone, PartialEq)]
pub enum TypeMember {
    Property {
        name: String,
        optional: bool,
        readonly: bool,
        annotation: Option<TypeExpr>,
    },
    /// `[key: K]: V`, or a mapped `[K in C]: V`
    Index {
        key_name: String,
        key: Box<TypeExpr>,
        mapped: bool,
        value: Option<TypeExpr>,
    },
    /// `name(params): R`; an empty name is a call signature
    Method {
        name: String,
        optional: bool,
        params: Vec<Param>,
        returns: Option<TypeExpr>,
    },
}

/// A type expression
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// `Name`, `Ns.Name`, `Name<A, B>`; keyword types land here too
    Reference { name: String, args: Vec<TypeExpr> },
    /// `T[]`
    Array(Box<TypeExpr>),
    /// `T[K]`
    Indexed { object: Box<TypeExpr>, index: Box<TypeExpr> },
    Union(Vec<TypeExpr>),
    Intersection(Vec<TypeExpr>),
    Object(Vec<TypeMember>),
    Tuple(Vec<TypeExpr>),
    Parenthesized(Box<TypeExpr>),
    /// `(a: A) => R`, or `new (a: A) => R`
    Function {
        params: Vec<Param>,
        returns: Box<TypeExpr>,
        constructor: bool,
    },
    /// `keyof T`, `typeof x`, `readonly T[]`, `unique symbol`, `infer U`
    Operator { op: String, operand: Box<TypeExpr> },
    /// `C extends E ? T : F`
    Conditional {
        check: Box<TypeExpr>,
        extends: Box<TypeExpr>,
        then: Box<TypeExpr>,
        otherwise: Box<TypeExpr>,
    },
    /// String, numeric, boolean or template literal type, rendered as written
    Literal(String),
}

impl TypeExpr {
    pub fn reference(name: impl Into<String>) -> Self {
        TypeExpr::Reference {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Name of a bare reference without generic arguments
    pub fn bare_reference(&self) -> Option<&str> {
        match self {
            TypeExpr::Reference { name, args } if args.is_empty() => Some(name),
            _ => None,
        }
    }

    /// Call `visit` with every referenced type name, outermost first
    pub fn for_each_reference<'a>(&'a self, visit: &mut dyn FnMut(&'a str)) {
        match self {
            TypeExpr::Reference { name, args } => {
                visit(name);
                for arg in args {
                    arg.for_each_reference(visit);
                }
            }
            TypeExpr::Array(inner) | TypeExpr::Parenthesized(inner) => inner.for_each_reference(visit),
            TypeExpr::Operator { operand, .. } => operand.for_each_reference(visit),
            TypeExpr::Indexed { object, index } => {
                object.for_each_reference(visit);
                index.for_each_reference(visit);
            }
            TypeExpr::Union(members) | TypeExpr::Intersection(members) | TypeExpr::Tuple(members) => {
                for member in members {
                    member.for_each_reference(visit);
                }
            }
            TypeExpr::Object(members) => {
                for member in members {
                    member.for_each_reference(visit);
                }
            }
            TypeExpr::Function { params, returns, .. } => {
                for param in params {
                    if let Some(annotation) = param.annotation() {
                        annotation.for_each_reference(visit);
                    }
                }
                returns.for_each_reference(visit);
            }
            TypeExpr::Conditional { check, extends, then, otherwise } => {
                check.for_each_reference(visit);
                extends.for_each_reference(visit);
                then.for_each_reference(visit);
                otherwise.for_each_reference(visit);
            }
            TypeExpr::Literal(_) => {}
        }
    }
}

impl TypeMember {
    pub fn for_each_reference<'a>(&'a self, visit: &mut dyn FnMut(&'a str)) {
        match self {
            TypeMember::Property { annotation, .. } => {
                if let Some(annotation) = annotation {
                    annotation.for_each_reference(visit);
                }
            }
            TypeMember::Index { key, value, .. } => {
                key.for_each_reference(visit);
                if let Some(value) = value {
                    value.for_each_reference(visit);
                }
            }
            TypeMember::Method { params, returns, .. } => {
                for param in params {
                    if let Some(annotation) = param.annotation() {
                        annotation.for_each_reference(visit);
                    }
                }
                if let Some(returns) = returns {
                    returns.for_each_reference(visit);
                }
            }
        }
    }
}

// ── Classes ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    /// `None` for `export default class { … }`
    pub name: Option<String>,
    pub is_abstract: bool,
    /// Raw text of the `extends` clause
    pub extends: Option<String>,
    pub implements: Vec<TypeExpr>,
    pub methods: Vec<MethodDecl>,
    pub properties: Vec<PropertyDecl>,
    pub span: Span,
}

/// Property or index signature; only the annotation is kept
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    pub name: String,
    pub annotation: Option<TypeExpr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Getter,
    Setter,
    Constructor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    pub kind: MethodKind,
    pub is_async: bool,
    pub is_static: bool,
    pub params: Vec<Param>,
    pub returns: Option<TypeExpr>,
    pub span: Span,
}

/// `function name(params): returns`; the body is skipped
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    /// `None` for `export default function (…)`
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub returns: Option<TypeExpr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub pattern: ParamPattern,
    /// Default expression, verbatim source text
    pub default: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamPattern {
    Identifier {
        name: String,
        optional: bool,
        annotation: Option<TypeExpr>,
    },
    Rest {
        name: String,
        annotation: Option<TypeExpr>,
    },
    /// `{ a, b }: T` or `[a, b]: T`, kept as raw text
    Destructured {
        text: String,
        annotation: Option<TypeExpr>,
    },
}

impl Param {
    pub fn annotation(&self) -> Option<&TypeExpr> {
        match &self.pattern {
            ParamPattern::Identifier { annotation, .. }
            | ParamPattern::Rest { annotation, .. }
            | ParamPattern::Destructured { annotation, .. } => annotation.as_ref(),
        }
    }
}

// ── Rendering ─────────────────────────────────────────────

fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter, items: &[T], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypeExpr::Reference { name, args } => {
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    write_joined(f, args, ", ")?;
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeExpr::Array(inner) => match inner.as_ref() {
                TypeExpr::Union(_)
                | TypeExpr::Intersection(_)
                | TypeExpr::Function { .. }
                | TypeExpr::Conditional { .. }
                | TypeExpr::Operator { .. } => write!(f, "({})[]", inner),
                _ => write!(f, "{}[]", inner),
            },
            TypeExpr::Indexed { object, index } => write!(f, "{}[{}]", object, index),
            TypeExpr::Union(members) => write_joined(f, members, " | "),
            TypeExpr::Intersection(members) => write_joined(f, members, " & "),
            TypeExpr::Object(members) => {
                if members.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{ ")?;
                write_joined(f, members, "; ")?;
                f.write_str(" }")
            }
            TypeExpr::Tuple(elements) => {
                f.write_str("[")?;
                write_joined(f, elements, ", ")?;
                f.write_str("]")
            }
            TypeExpr::Parenthesized(inner) => write!(f, "({})", inner),
            TypeExpr::Function { params, returns, constructor } => {
                if *constructor {
                    f.write_str("new ")?;
                }
                f.write_str("(")?;
                write_joined(f, params, ", ")?;
                write!(f, ") => {}", returns)
            }
            TypeExpr::Operator { op, operand } => write!(f, "{} {}", op, operand),
            TypeExpr::Conditional { check, extends, then, otherwise } => {
                write!(f, "{} extends {} ? {} : {}", check, extends, then, otherwise)
            }
            TypeExpr::Literal(text) => f.write_str(text),
        }
    }
}

impl fmt::Display for TypeMember {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypeMember::Property { name, optional, readonly, annotation } => {
                if *readonly {
                    f.write_str("readonly ")?;
                }
                f.write_str(name)?;
                if *optional {
                    f.write_str("?")?;
                }
                if let Some(annotation) = annotation {
                    write!(f, ": {}", annotation)?;
                }
                Ok(())
            }
            TypeMember::Index { key_name, key, mapped, value } => {
                let joiner = if *mapped { " in " } else { ": " };
                write!(f, "[{}{}{}]", key_name, joiner, key)?;
                if let Some(value) = value {
                    write!(f, ": {}", value)?;
                }
                Ok(())
            }
            TypeMember::Method { name, optional, params, returns } => {
                f.write_str(name)?;
                if *optional {
                    f.write_str("?")?;
                }
                f.write_str("(")?;
                write_joined(f, params, ", ")?;
                f.write_str(")")?;
                if let Some(returns) = returns {
                    write!(f, ": {}", returns)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let annotation = match &self.pattern {
            ParamPattern::Identifier { name, optional, annotation } => {
                f.write_str(name)?;
                if *optional {
                    f.write_str("?")?;
                }
                annotation
            }
            ParamPattern::Rest { name, annotation } => {
                write!(f, "...{}", name)?;
                annotation
            }
            ParamPattern::Destructured { text, annotation } => {
                f.write_str(text)?;
                annotation
            }
        };
        if let Some(annotation) = annotation {
            write!(f, ": {}", annotation)?;
        }
        if let Some(default) = &self.default {
            write!(f, " = {}", default)?;
        }
        Ok(())
    }
}
