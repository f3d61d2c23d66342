//! Semantic errors raised by the table builder and the type checker.
//!
//! Compilation is fail-fast: the first error aborts the unit and is handed
//! back to the caller unchanged.

use crate::source::Span;
use crate::syntax::ast::BinOp;
use std::fmt;

/// What kind of member collided with an existing declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Method,
    Local,
    Argument,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MemberKind::Field => "field",
            MemberKind::Method => "method",
            MemberKind::Local => "variable",
            MemberKind::Argument => "argument",
        })
    }
}

/// What kind of name failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Class,
    Method,
    Field,
    Identifier,
    Type,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SymbolKind::Class => "class",
            SymbolKind::Method => "method",
            SymbolKind::Field => "field",
            SymbolKind::Identifier => "identifier",
            SymbolKind::Type => "type",
        })
    }
}

/// Which part of an override disagrees with the ancestor's signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideMismatch {
    ReturnType,
    ArgumentCount,
    ArgumentTypes,
}

impl fmt::Display for OverrideMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OverrideMismatch::ReturnType => "return type",
            OverrideMismatch::ArgumentCount => "argument count",
            OverrideMismatch::ArgumentTypes => "argument types",
        })
    }
}

/// The operator or statement whose typing rule was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construct {
    Operator(BinOp),
    Not,
    Index,
    Length,
    ArrayAlloc,
    Print,
    Assign,
    ArrayAssign,
    Call,
    IfCondition,
    WhileCondition,
    Return,
    This,
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Construct::Operator(op) => write!(f, "operator '{}'", op),
            Construct::Not => f.write_str("operator '!'"),
            Construct::Index => f.write_str("array index"),
            Construct::Length => f.write_str("'length'"),
            Construct::ArrayAlloc => f.write_str("array allocation"),
            Construct::Print => f.write_str("print statement"),
            Construct::Assign => f.write_str("assignment"),
            Construct::ArrayAssign => f.write_str("array assignment"),
            Construct::Call => f.write_str("method call"),
            Construct::IfCondition => f.write_str("'if' condition"),
            Construct::WhileCondition => f.write_str("'while' condition"),
            Construct::Return => f.write_str("return"),
            Construct::This => f.write_str("'this'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SemanticError {
    #[error("redefinition of class '{name}'")]
    DuplicateClass { name: String, span: Span },

    #[error("redefinition of {kind} '{name}' in {scope}")]
    DuplicateMember {
        kind: MemberKind,
        name: String,
        scope: String,
        span: Span,
    },

    #[error("unknown {kind} '{name}'")]
    UnknownSymbol {
        kind: SymbolKind,
        name: String,
        span: Span,
    },

    #[error("{reason} of {class}.{method} incompatible with {ancestor}.{method}")]
    IncompatibleOverride {
        class: String,
        method: String,
        ancestor: String,
        reason: OverrideMismatch,
        span: Span,
    },

    #[error("{detail}")]
    TypeMismatch {
        construct: Construct,
        detail: String,
        span: Span,
    },

    #[error("illegal use of {class}.main argument '{name}'")]
    IllegalEntryArgumentUse {
        class: String,
        name: String,
        span: Span,
    },
}

impl SemanticError {
    pub fn unknown(kind: SymbolKind, name: impl Into<String>, span: Span) -> Self {
        SemanticError::UnknownSymbol {
            kind,
            name: name.into(),
            span,
        }
    }

    pub fn mismatch(construct: Construct, detail: impl Into<String>, span: Span) -> Self {
        SemanticError::TypeMismatch {
            construct,
            detail: detail.into(),
            span,
        }
    }

    /// Stable identifier printed in diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            SemanticError::DuplicateClass { .. } => "duplicate-class",
            SemanticError::DuplicateMember { .. } => "duplicate-member",
            SemanticError::UnknownSymbol { .. } => "unknown-symbol",
            SemanticError::IncompatibleOverride { .. } => "incompatible-override",
            SemanticError::TypeMismatch { .. } => "type-mismatch",
            SemanticError::IllegalEntryArgumentUse { .. } => "illegal-entry-argument-use",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            SemanticError::DuplicateClass { span, .. }
            | SemanticError::DuplicateMember { span, .. }
            | SemanticError::UnknownSymbol { span, .. }
            | SemanticError::IncompatibleOverride { span, .. }
            | SemanticError::TypeMismatch { span, .. }
            | SemanticError::IllegalEntryArgumentUse { span, .. } => *span,
        }
    }

    /// The construct a `TypeMismatch` was raised for.
    pub fn construct(&self) -> Option<Construct> {
        match self {
            SemanticError::TypeMismatch { construct, .. } => Some(*construct),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let span = Span::default();
        let err = SemanticError::IncompatibleOverride {
            class: "B".into(),
            method: "m".into(),
            ancestor: "A".into(),
            reason: OverrideMismatch::ReturnType,
            span,
        };
        assert_eq!(err.to_string(), "return type of B.m incompatible with A.m");
        assert_eq!(err.code(), "incompatible-override");

        let err = SemanticError::unknown(SymbolKind::Type, "Foo", span);
        assert_eq!(err.to_string(), "unknown type 'Foo'");

        let err = SemanticError::DuplicateMember {
            kind: MemberKind::Local,
            name: "x".into(),
            scope: "A.m".into(),
            span,
        };
        assert_eq!(err.to_string(), "redefinition of variable 'x' in A.m");
    }

    #[test]
    fn test_construct_display() {
        assert_eq!(Construct::Operator(BinOp::Add).to_string(), "operator '+'");
        let err = SemanticError::mismatch(
            Construct::IfCondition,
            "'if' condition must be boolean",
            Span::default(),
        );
        assert_eq!(err.construct(), Some(Construct::IfCondition));
        assert_eq!(err.code(), "type-mismatch");
    }
}
