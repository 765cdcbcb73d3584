//! Semantic entities built from the syntax tree.
//!
//! These are the shapes the validator and the Lua emitter work with: one
//! closed enum per position (top-level member, block statement, value)
//! and a shared [`Base`] composed into every named entity.

use std::fmt;

use crate::span::Span;
use crate::types::TypeName;

/// One piece of a reference path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Ident(String),
    /// `this`, rendered as `self`.
    SelfRef,
    /// `[key]` or `[a.b]`.
    Index(Vec<IndexPart>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexPart {
    Ident(String),
    SelfRef,
    Literal(Literal),
}

/// Ordered segments of a dotted reference such as `this.items[0].name`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RefPath {
    pub segments: Vec<PathSegment>,
}

impl RefPath {
    pub fn new(segments: Vec<PathSegment>) -> Self {
        RefPath { segments }
    }

    pub fn ident(name: impl Into<String>) -> Self {
        RefPath::new(vec![PathSegment::Ident(name.into())])
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The name when the path is a single identifier.
    pub fn as_single_ident(&self) -> Option<&str> {
        match self.segments.as_slice() {
            [PathSegment::Ident(name)] => Some(name),
            _ => None,
        }
    }

    pub fn first_ident(&self) -> Option<&str> {
        match self.segments.first() {
            Some(PathSegment::Ident(name)) => Some(name),
            _ => None,
        }
    }

    /// Last identifier segment; for `fn a.b.c` this is `c`.
    pub fn last_ident(&self) -> Option<&str> {
        match self.segments.last() {
            Some(PathSegment::Ident(name)) => Some(name),
            _ => None,
        }
    }

    pub fn starts_with_self(&self) -> bool {
        matches!(self.segments.first(), Some(PathSegment::SelfRef))
    }

    /// For `this.x...`, the name `x` when it is an identifier.
    pub fn self_member(&self) -> Option<&str> {
        match self.segments.as_slice() {
            [PathSegment::SelfRef, PathSegment::Ident(name), ..] => Some(name),
            _ => None,
        }
    }
}

/// Skal-style rendering, used in diagnostics.
impl fmt::Display for RefPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Index(parts) => {
                    f.write_str("[")?;
                    for (i, part) in parts.iter().enumerate() {
                        if i > 0 {
                            f.write_str(".")?;
                        }
                        match part {
                            IndexPart::Ident(name) => f.write_str(name)?,
                            IndexPart::SelfRef => f.write_str("this")?,
                            IndexPart::Literal(lit) => write!(f, "{lit}")?,
                        }
                    }
                    f.write_str("]")?;
                    continue;
                }
                _ if idx > 0 => f.write_str(".")?,
                _ => {}
            }
            match segment {
                PathSegment::Ident(name) => f.write_str(name)?,
                PathSegment::SelfRef => f.write_str("this")?,
                PathSegment::Index(_) => {}
            }
        }
        Ok(())
    }
}

/// Link from an entity to the entity that encloses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parent {
    pub kind: ParentKind,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentKind {
    Struct,
    Enum,
    Fn,
}

/// Fields shared by every named entity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Base {
    pub path: RefPath,
    pub public: bool,
    pub parent: Option<Parent>,
    pub span: Option<Span>,
}

impl Base {
    pub fn new(path: RefPath, span: Option<Span>) -> Self {
        Base {
            path,
            public: false,
            parent: None,
            span,
        }
    }

    /// The entity's own name: the last identifier of its path.
    pub fn name(&self) -> &str {
        self.path.last_ident().unwrap_or("")
    }
}

// ---------------------------------------------------------------------
// Literals and values
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Str,
    Int,
    Bool,
    Nil,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    pub kind: LiteralKind,
    pub text: String,
}

impl Literal {
    pub fn type_name(&self) -> TypeName {
        match self.kind {
            LiteralKind::Str => TypeName::Str,
            LiteralKind::Int => TypeName::Int,
            LiteralKind::Bool => TypeName::Bool,
            LiteralKind::Nil => TypeName::Nil,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LiteralKind::Str => write!(f, "'{}'", self.text),
            _ => f.write_str(&self.text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorClass {
    Math,
    Comparison,
    Concat,
    Logic,
    /// Prefix `!` or `-`.
    Unary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub class: OperatorClass,
    pub text: String,
}

impl Operator {
    pub fn binary(text: &str) -> Self {
        let class = match text {
            "+" | "-" | "*" | "/" => OperatorClass::Math,
            ".." => OperatorClass::Concat,
            "&&" | "||" => OperatorClass::Logic,
            _ => OperatorClass::Comparison,
        };
        Operator {
            class,
            text: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub path: RefPath,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Literal(Literal),
    Reference(Reference),
    Call(Call),
    AnonFn(Box<Fn>),
    List(Vec<Expr>),
    EmptyList,
    Group(Expr),
    Operator(Operator),
}

/// A flat, textually ordered sequence of values and operators.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Expr {
    pub values: Vec<Value>,
}

impl Expr {
    /// The literal when the expression is exactly one literal value.
    pub fn as_literal(&self) -> Option<&Literal> {
        match self.values.as_slice() {
            [Value::Literal(lit)] => Some(lit),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Struct {
    pub base: Base,
    pub fields: Vec<Field>,
    pub methods: Vec<Fn>,
    pub has_custom_constructor: bool,
}

impl Struct {
    pub fn constructor(&self) -> Option<&Fn> {
        self.methods.iter().find(|method| method.is_constructor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub base: Base,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enum {
    pub base: Base,
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    pub base: Base,
    pub value: Literal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FnArg {
    pub base: Base,
    pub hint: Option<TypeName>,
    pub vararg: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FnBody {
    Block(Vec<Statement>),
    /// Anonymous functions evaluate a single expression.
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fn {
    pub base: Base,
    pub args: Vec<FnArg>,
    pub return_hint: Option<TypeName>,
    pub body: FnBody,
    /// A struct's `new` method.
    pub is_constructor: bool,
}

impl Fn {
    pub fn vararg(&self) -> Option<&FnArg> {
        self.args.iter().find(|arg| arg.vararg)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bind {
    pub base: Base,
    pub targets: Vec<RefPath>,
    /// Empty for a bare declaration.
    pub values: Vec<Expr>,
    /// Assignment to existing names, without `let`.
    pub rebind: bool,
}

impl Bind {
    pub fn is_declaration(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallArg {
    pub value: Expr,
    pub spread: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub base: Base,
    pub args: Vec<CallArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForMode {
    /// `for i = a, b`
    Range,
    /// `for k, v in t`
    Each,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct For {
    pub base: Base,
    pub mode: ForMode,
    pub iterators: Vec<RefPath>,
    pub iterables: Vec<Expr>,
    pub block: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Elif {
    pub condition: Expr,
    pub block: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct If {
    pub base: Base,
    pub condition: Expr,
    pub block: Vec<Statement>,
    pub elifs: Vec<Elif>,
    pub otherwise: Option<Vec<Statement>>,
}

/// `path as alias` inside an `extern` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct External {
    pub base: Base,
    pub alias: String,
    pub target: RefPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Return {
    pub values: Vec<Expr>,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Return(Return),
    For(For),
    Call(Call),
    If(If),
    Bind(Bind),
    Fn(Fn),
    Defer(Box<Statement>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    Struct(Struct),
    Enum(Enum),
    Fn(Fn),
    Bind(Bind),
    Call(Call),
    For(For),
    If(If),
    Extern(Vec<External>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_paths_in_source_form() {
        let path = RefPath::new(vec![
            PathSegment::SelfRef,
            PathSegment::Ident("items".into()),
            PathSegment::Index(vec![IndexPart::Literal(Literal {
                kind: LiteralKind::Int,
                text: "0".into(),
            })]),
            PathSegment::Ident("name".into()),
        ]);
        assert_eq!(path.to_string(), "this.items[0].name");
        assert_eq!(path.self_member(), Some("items"));
        assert_eq!(path.last_ident(), Some("name"));
        assert!(path.as_single_ident().is_none());
    }

    #[test]
    fn classifies_binary_operators() {
        assert_eq!(Operator::binary("..").class, OperatorClass::Concat);
        assert_eq!(Operator::binary("&&").class, OperatorClass::Logic);
        assert_eq!(Operator::binary("<=").class, OperatorClass::Comparison);
        assert_eq!(Operator::binary("*").class, OperatorClass::Math);
    }
}
