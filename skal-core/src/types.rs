//! Type names used by argument hints.
//!
//! Skal values are dynamically typed at runtime. Hints on function
//! arguments are only checked at call sites where the argument is a
//! literal, so the model here stays small.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeName {
    Str,
    Int,
    Bool,
    Fn,
    /// Type of the `nil` literal.
    Nil,
    /// A struct, enum or other user-provided name.
    Named(String),
}

impl TypeName {
    /// Maps the text of a hint (`str`, `int`, `bool`, `fn` or a name).
    pub fn from_hint(text: &str) -> Self {
        match text {
            "str" => TypeName::Str,
            "int" => TypeName::Int,
            "bool" => TypeName::Bool,
            "fn" => TypeName::Fn,
            "nil" => TypeName::Nil,
            other => TypeName::Named(other.to_string()),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, TypeName::Nil)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeName::Str => f.write_str("str"),
            TypeName::Int => f.write_str("int"),
            TypeName::Bool => f.write_str("bool"),
            TypeName::Fn => f.write_str("fn"),
            TypeName::Nil => f.write_str("nil"),
            TypeName::Named(name) => f.write_str(name),
        }
    }
}

/// Outcome of checking a value's type against a declared hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    /// Same type.
    Exact,
    /// Accepted without proof, e.g. `nil` or a user-defined hint.
    Assumed,
    Mismatch,
}

impl Compatibility {
    pub fn is_ok(self) -> bool {
        !matches!(self, Compatibility::Mismatch)
    }
}

/// Check a value of type `actual` against the hint `declared`.
///
/// * `nil` is accepted everywhere.
/// * Named hints accept anything: enum members are plain literals at
///   runtime, so a literal may legitimately stand in for one.
pub fn check(actual: &TypeName, declared: &TypeName) -> Compatibility {
    if actual == declared {
        return Compatibility::Exact;
    }
    match (actual, declared) {
        (TypeName::Nil, _) | (_, TypeName::Named(_)) => Compatibility::Assumed,
        _ => Compatibility::Mismatch,
    }
}
