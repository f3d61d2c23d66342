use super::function::FunctionBuilder;
use super::{llvm_type, CodegenError};
use crate::syntax::ast::{Stmt, StmtKind};
use crate::types::Type;

impl FunctionBuilder<'_> {
    pub(super) fn stmt(&mut self, stmt: &Stmt) -> Result<(), CodegenError> {
        match &stmt.kind {
            StmtKind::Block(stmts) => {
                for stmt in stmts {
                    self.stmt(stmt)?;
                }
            }
            StmtKind::Assign { target, value } => {
                let value = self.expr(value)?;
                let (ptr, ty) = self.place(target.as_str(), target.span)?;
                let ty = llvm_type(ty);
                self.emit(format!("store {ty} {}, {ty}* {ptr}", value.value));
            }
            StmtKind::ArrayAssign {
                target,
                index,
                value,
            } => {
                let array = self.load_variable(target.as_str(), target.span)?;
                let index = self.expr(index)?;
                let value = self.expr(value)?;
                let ptr = self.element_ptr(&array.value, &index.value);
                let unit = match value.ty {
                    Type::Boolean => self.assign(format!("zext i1 {} to i32", value.value)),
                    _ => value.value,
                };
                self.emit(format!("store i32 {unit}, i32* {ptr}"));
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let id = self.fresh_label();
                let then_label = format!("if.then.{id}");
                let else_label = format!("if.else.{id}");
                let end = format!("if.end.{id}");

                let cond = self.expr(cond)?;
                self.emit(format!(
                    "br i1 {}, label %{then_label}, label %{else_label}",
                    cond.value
                ));
                self.label(&then_label);
                self.stmt(then_branch)?;
                self.emit(format!("br label %{end}"));
                self.label(&else_label);
                self.stmt(else_branch)?;
                self.emit(format!("br label %{end}"));
                self.label(&end);
            }
            StmtKind::While { cond, body } => {
                let id = self.fresh_label();
                let cond_label = format!("loop.cond.{id}");
                let body_label = format!("loop.body.{id}");
                let end = format!("loop.end.{id}");

                self.emit(format!("br label %{cond_label}"));
                self.label(&cond_label);
                let cond = self.expr(cond)?;
                self.emit(format!(
                    "br i1 {}, label %{body_label}, label %{end}",
                    cond.value
                ));
                self.label(&body_label);
                self.stmt(body)?;
                self.emit(format!("br label %{cond_label}"));
                self.label(&end);
            }
            StmtKind::Print(value) => {
                let value = self.expr(value)?;
                self.emit(format!("call void @print_int(i32 {})", value.value));
            }
        }
        Ok(())
    }
}
