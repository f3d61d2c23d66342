//! Abstract syntax tree for MiniJava.
//!
//! This is the hand-off format between the parser and the semantic passes.
//! The tree is immutable once built; every pass walks it read-only.

use crate::source::Span;
use serde::Serialize;
use std::fmt;

/// An identifier together with where it was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A whole compilation unit: the entry class followed by user classes.
#[derive(Debug, Clone, Serialize)]
pub struct Program {
    pub main: MainClass,
    pub classes: Vec<ClassDecl>,
}

/// `class Main { public static void main(String[] args) { ... } }`
#[derive(Debug, Clone, Serialize)]
pub struct MainClass {
    pub name: Ident,
    /// Name of the `String[]` parameter of `main`.
    pub arg: Ident,
    pub locals: Vec<VarDecl>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassDecl {
    pub name: Ident,
    pub parent: Option<Ident>,
    pub fields: Vec<VarDecl>,
    pub methods: Vec<MethodDecl>,
    pub span: Span,
}

/// A typed name: field, local variable or formal parameter.
#[derive(Debug, Clone, Serialize)]
pub struct VarDecl {
    pub ty: TypeExpr,
    pub name: Ident,
}

#[derive(Debug, Clone, Serialize)]
pub struct MethodDecl {
    pub ret: TypeExpr,
    pub name: Ident,
    pub params: Vec<VarDecl>,
    pub locals: Vec<VarDecl>,
    pub body: Vec<Stmt>,
    /// The trailing `return` expression every method ends with.
    pub ret_expr: Expr,
    pub span: Span,
}

/// A type as written in source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TypeExprKind {
    Int,
    Boolean,
    IntArray,
    BooleanArray,
    Class(String),
}

impl fmt::Display for TypeExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExprKind::Int => f.write_str("int"),
            TypeExprKind::Boolean => f.write_str("boolean"),
            TypeExprKind::IntArray => f.write_str("int[]"),
            TypeExprKind::BooleanArray => f.write_str("boolean[]"),
            TypeExprKind::Class(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub enum StmtKind {
    /// `{ stmts }`
    Block(Vec<Stmt>),
    /// `x = e;`
    Assign { target: Ident, value: Expr },
    /// `x[i] = e;`
    ArrayAssign {
        target: Ident,
        index: Expr,
        value: Expr,
    },
    /// `if (c) s1 else s2`
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Box<Stmt>,
    },
    /// `while (c) s`
    While { cond: Expr, body: Box<Stmt> },
    /// `System.out.println(e);`
    Print(Expr),
}

#[derive(Debug, Clone, Serialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinOp {
    And,
    Less,
    Add,
    Sub,
    Mul,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::And => "&&",
            BinOp::Less => "<",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Element type of an array allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArrayElem {
    Int,
    Boolean,
}

#[derive(Debug, Clone, Serialize)]
pub enum ExprKind {
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Not(Box<Expr>),
    /// `array[index]`
    Index { array: Box<Expr>, index: Box<Expr> },
    /// `array.length`
    Length(Box<Expr>),
    /// `receiver.method(args)`
    Call {
        receiver: Box<Expr>,
        method: Ident,
        args: Vec<Expr>,
    },
    IntLit(i32),
    BoolLit(bool),
    Ident(String),
    This,
    /// `new int[len]` / `new boolean[len]`
    NewArray { elem: ArrayElem, len: Box<Expr> },
    /// `new C()`
    New(Ident),
}
