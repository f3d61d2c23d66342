//! Type checker: the second pass over the AST.
//!
//! Every statement and expression is checked against the completed symbol
//! table. The first violation aborts the unit.

use crate::error::{Construct, SemanticError, SymbolKind};
use crate::ids::ClassId;
use crate::source::Span;
use crate::symbols::{MethodSymbols, SymbolTable};
use crate::syntax::ast::{
    BinOp, ClassDecl, Expr, ExprKind, Ident, MethodDecl, Program, Stmt, StmtKind,
};
use crate::types::Type;

/// Check a program whose symbol table has been built.
pub fn type_check(program: &Program, table: &SymbolTable) -> Result<(), SemanticError> {
    let main = &program.main;
    let entry = table.lookup_class(main.name.as_str(), main.name.span)?;
    let (_, method) = table.lookup_method(entry, "main", main.span)?;
    let checker = TypeChecker {
        table,
        class: entry,
        method,
    };
    for stmt in &main.body {
        checker.stmt(stmt)?;
    }

    for class in &program.classes {
        check_class(table, class)?;
    }

    tracing::debug!("Type checked {} classes", program.classes.len() + 1);
    Ok(())
}

fn check_class(table: &SymbolTable, decl: &ClassDecl) -> Result<(), SemanticError> {
    let class = table.lookup_class(decl.name.as_str(), decl.name.span)?;
    for method in &decl.methods {
        let symbols = table
            .class(class)
            .methods
            .get(method.name.as_str())
            .ok_or_else(|| {
                SemanticError::unknown(SymbolKind::Method, method.name.as_str(), method.name.span)
            })?;
        TypeChecker {
            table,
            class,
            method: symbols,
        }
        .method(method)?;
    }
    Ok(())
}

struct TypeChecker<'a> {
    table: &'a SymbolTable,
    class: ClassId,
    method: &'a MethodSymbols,
}

impl TypeChecker<'_> {
    fn method(&self, decl: &MethodDecl) -> Result<(), SemanticError> {
        tracing::trace!("Checking {}", self.method.qualified_name);
        for stmt in &decl.body {
            self.stmt(stmt)?;
        }

        let ty = self.expr(&decl.ret_expr)?;
        if !self.table.is_subtype(ty, self.method.ret) {
            return Err(SemanticError::mismatch(
                Construct::Return,
                format!(
                    "'{}' does not match the return type '{}' of {}",
                    self.name(ty),
                    self.name(self.method.ret),
                    self.method.qualified_name
                ),
                decl.ret_expr.span,
            ));
        }
        Ok(())
    }

    fn name(&self, ty: Type) -> String {
        self.table.type_name(ty)
    }

    fn expect(
        &self,
        construct: Construct,
        expected: Type,
        actual: Type,
        span: Span,
    ) -> Result<(), SemanticError> {
        if actual == expected {
            return Ok(());
        }
        Err(SemanticError::mismatch(
            construct,
            format!(
                "{} expects '{}', found '{}'",
                construct,
                self.name(expected),
                self.name(actual)
            ),
            span,
        ))
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn stmt(&self, stmt: &Stmt) -> Result<(), SemanticError> {
        match &stmt.kind {
            StmtKind::Block(stmts) => {
                for stmt in stmts {
                    self.stmt(stmt)?;
                }
            }
            StmtKind::Assign { target, value } => {
                let target_ty = self.variable(target)?;
                let value_ty = self.expr(value)?;
                if !self.table.is_subtype(value_ty, target_ty) {
                    return Err(SemanticError::mismatch(
                        Construct::Assign,
                        format!(
                            "cannot assign '{}' to '{}'",
                            self.name(value_ty),
                            self.name(target_ty)
                        ),
                        stmt.span,
                    ));
                }
            }
            StmtKind::ArrayAssign {
                target,
                index,
                value,
            } => {
                let target_ty = self.variable(target)?;
                let Some(elem) = target_ty.element() else {
                    return Err(SemanticError::mismatch(
                        Construct::ArrayAssign,
                        format!("'{}' is not an array", target),
                        target.span,
                    ));
                };
                let index_ty = self.expr(index)?;
                self.expect(Construct::Index, Type::Int, index_ty, index.span)?;
                let value_ty = self.expr(value)?;
                if value_ty != elem {
                    return Err(SemanticError::mismatch(
                        Construct::ArrayAssign,
                        format!(
                            "cannot assign '{}' to an element of '{}'",
                            self.name(value_ty),
                            self.name(target_ty)
                        ),
                        stmt.span,
                    ));
                }
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let ty = self.expr(cond)?;
                self.expect(Construct::IfCondition, Type::Boolean, ty, cond.span)?;
                self.stmt(then_branch)?;
                self.stmt(else_branch)?;
            }
            StmtKind::While { cond, body } => {
                let ty = self.expr(cond)?;
                self.expect(Construct::WhileCondition, Type::Boolean, ty, cond.span)?;
                self.stmt(body)?;
            }
            StmtKind::Print(value) => {
                let ty = self.expr(value)?;
                self.expect(Construct::Print, Type::Int, ty, value.span)?;
            }
        }
        Ok(())
    }

    /// Type of a variable used as an assignment target.
    fn variable(&self, ident: &Ident) -> Result<Type, SemanticError> {
        self.check_entry_argument(ident.as_str(), ident.span)?;
        self.table
            .resolve_identifier_type(ident.as_str(), self.method, self.class)
            .ok_or_else(|| {
                SemanticError::unknown(SymbolKind::Identifier, ident.as_str(), ident.span)
            })
    }

    fn check_entry_argument(&self, name: &str, span: Span) -> Result<(), SemanticError> {
        if self.method.entry_arg.as_deref() == Some(name) {
            return Err(SemanticError::IllegalEntryArgumentUse {
                class: self.table.class(self.class).name.clone(),
                name: name.to_string(),
                span,
            });
        }
        Ok(())
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expr(&self, expr: &Expr) -> Result<Type, SemanticError> {
        match &expr.kind {
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs_ty = self.expr(lhs)?;
                let rhs_ty = self.expr(rhs)?;
                let (operand, result) = match op {
                    BinOp::And => (Type::Boolean, Type::Boolean),
                    BinOp::Less => (Type::Int, Type::Boolean),
                    BinOp::Add | BinOp::Sub | BinOp::Mul => (Type::Int, Type::Int),
                };
                if lhs_ty != operand || rhs_ty != operand {
                    return Err(SemanticError::mismatch(
                        Construct::Operator(*op),
                        format!(
                            "invalid use of operator '{}' on '{}' and '{}'",
                            op,
                            self.name(lhs_ty),
                            self.name(rhs_ty)
                        ),
                        expr.span,
                    ));
                }
                Ok(result)
            }
            ExprKind::Not(operand) => {
                let ty = self.expr(operand)?;
                self.expect(Construct::Not, Type::Boolean, ty, expr.span)?;
                Ok(Type::Boolean)
            }
            ExprKind::Index { array, index } => {
                let array_ty = self.expr(array)?;
                let Some(elem) = array_ty.element() else {
                    return Err(SemanticError::mismatch(
                        Construct::Index,
                        format!("cannot index into '{}'", self.name(array_ty)),
                        array.span,
                    ));
                };
                let index_ty = self.expr(index)?;
                self.expect(Construct::Index, Type::Int, index_ty, index.span)?;
                Ok(elem)
            }
            ExprKind::Length(array) => {
                let ty = self.expr(array)?;
                if !ty.is_array() {
                    return Err(SemanticError::mismatch(
                        Construct::Length,
                        format!("invalid use of 'length' on '{}'", self.name(ty)),
                        expr.span,
                    ));
                }
                Ok(Type::Int)
            }
            ExprKind::Call {
                receiver,
                method,
                args,
            } => self.call(expr, receiver, method, args),
            ExprKind::IntLit(_) => Ok(Type::Int),
            ExprKind::BoolLit(_) => Ok(Type::Boolean),
            ExprKind::Ident(name) => self.identifier(name, expr.span),
            ExprKind::This => {
                if self.method.is_entry() {
                    return Err(SemanticError::mismatch(
                        Construct::This,
                        "'this' cannot be used in the static main method",
                        expr.span,
                    ));
                }
                Ok(Type::Class(self.class))
            }
            ExprKind::NewArray { elem, len } => {
                let ty = self.expr(len)?;
                self.expect(Construct::ArrayAlloc, Type::Int, ty, len.span)?;
                Ok(Type::array_of(*elem))
            }
            ExprKind::New(class) => {
                let id = self.table.lookup_user_class(class.as_str(), class.span)?;
                Ok(Type::Class(id))
            }
        }
    }

    /// Variables first; otherwise a declared class name stands for a value
    /// of that class.
    fn identifier(&self, name: &str, span: Span) -> Result<Type, SemanticError> {
        self.check_entry_argument(name, span)?;
        if let Some(ty) = self
            .table
            .resolve_identifier_type(name, self.method, self.class)
        {
            return Ok(ty);
        }
        match self.table.class_id(name) {
            Some(id) if Some(id) != self.table.entry_class() => Ok(Type::Class(id)),
            _ => Err(SemanticError::unknown(SymbolKind::Identifier, name, span)),
        }
    }

    fn call(
        &self,
        expr: &Expr,
        receiver: &Expr,
        method: &Ident,
        args: &[Expr],
    ) -> Result<Type, SemanticError> {
        let receiver_ty = self.expr(receiver)?;
        let Some(class) = receiver_ty.class() else {
            return Err(SemanticError::mismatch(
                Construct::Call,
                format!(
                    "cannot call method '{}' on '{}'",
                    method,
                    self.name(receiver_ty)
                ),
                receiver.span,
            ));
        };

        let (_, target) = self.table.lookup_method(class, method.as_str(), method.span)?;
        if target.args.len() != args.len() {
            return Err(SemanticError::mismatch(
                Construct::Call,
                format!(
                    "{} takes {} arguments, {} given",
                    target.qualified_name,
                    target.args.len(),
                    args.len()
                ),
                expr.span,
            ));
        }

        for (arg, param_ty) in args.iter().zip(target.arg_types()) {
            let arg_ty = self.expr(arg)?;
            if !self.table.is_subtype(arg_ty, param_ty) {
                return Err(SemanticError::mismatch(
                    Construct::Call,
                    format!(
                        "invalid argument types for {}: expected '{}', found '{}'",
                        target.qualified_name,
                        self.name(param_ty),
                        self.name(arg_ty)
                    ),
                    arg.span,
                ));
            }
        }

        Ok(target.ret)
    }
}
