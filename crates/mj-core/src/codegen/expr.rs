use super::function::{FunctionBuilder, Operand};
use super::vtable::{vtable_name, vtable_type};
use super::{fn_ptr_type, llvm_type, CodegenError};
use crate::error::{SemanticError, SymbolKind};
use crate::source::Span;
use crate::syntax::ast::{ArrayElem, BinOp, Expr, ExprKind, Ident};
use crate::types::Type;

impl FunctionBuilder<'_> {
    pub(super) fn expr(&mut self, expr: &Expr) -> Result<Operand, CodegenError> {
        match &expr.kind {
            ExprKind::IntLit(value) => Ok(Operand::new(Type::Int, value.to_string())),
            ExprKind::BoolLit(value) => Ok(Operand::new(Type::Boolean, value.to_string())),
            ExprKind::This => Ok(Operand::new(Type::Class(self.class), "%this")),
            ExprKind::Ident(name) => self.identifier(name, expr.span),
            ExprKind::Binary { op, lhs, rhs } => {
                let (instr, ty) = match op {
                    BinOp::And => return self.and(lhs, rhs),
                    BinOp::Less => ("icmp slt", Type::Boolean),
                    BinOp::Add => ("add", Type::Int),
                    BinOp::Sub => ("sub", Type::Int),
                    BinOp::Mul => ("mul", Type::Int),
                };
                let lhs = self.expr(lhs)?;
                let rhs = self.expr(rhs)?;
                let value = self.assign(format!("{} i32 {}, {}", instr, lhs.value, rhs.value));
                Ok(Operand::new(ty, value))
            }
            ExprKind::Not(operand) => {
                let operand = self.expr(operand)?;
                let value = self.assign(format!("xor i1 {}, true", operand.value));
                Ok(Operand::new(Type::Boolean, value))
            }
            ExprKind::Index { array, index } => {
                let array = self.expr(array)?;
                let index = self.expr(index)?;
                let elem = array.ty.element().ok_or_else(|| {
                    CodegenError::Internal(format!("indexing non-array value {}", array.value))
                })?;
                let ptr = self.element_ptr(&array.value, &index.value);
                let unit = self.assign(format!("load i32, i32* {ptr}"));
                let value = match elem {
                    Type::Boolean => self.assign(format!("trunc i32 {unit} to i1")),
                    _ => unit,
                };
                Ok(Operand::new(elem, value))
            }
            ExprKind::Length(array) => {
                let array = self.expr(array)?;
                let base = self.assign(format!("bitcast i8* {} to i32*", array.value));
                let len = self.assign(format!("load i32, i32* {base}"));
                Ok(Operand::new(Type::Int, len))
            }
            ExprKind::NewArray { elem, len } => self.new_array(*elem, len),
            ExprKind::New(class) => self.new_object(class),
            ExprKind::Call {
                receiver,
                method,
                args,
            } => self.call(receiver, method, args),
        }
    }

    /// A bare identifier in value position. A class name type-checks as a
    /// value of that class but has no object behind it, so it is rejected
    /// here instead of being lowered to a null receiver.
    fn identifier(&mut self, name: &str, span: Span) -> Result<Operand, CodegenError> {
        if self
            .table
            .resolve_identifier(name, self.method, self.class)
            .is_some()
        {
            return self.load_variable(name, span);
        }
        match self.table.class_id(name) {
            Some(_) => Err(CodegenError::ClassValue {
                name: name.to_string(),
                span,
            }),
            None => Err(SemanticError::unknown(SymbolKind::Identifier, name, span).into()),
        }
    }

    /// Short-circuit `&&`: the right operand only runs when the left one
    /// is true.
    fn and(&mut self, lhs: &Expr, rhs: &Expr) -> Result<Operand, CodegenError> {
        let id = self.fresh_label();
        let clause = format!("and.clause.{id}");
        let eval_rhs = format!("and.rhs.{id}");
        let rhs_end = format!("and.rhs.end.{id}");
        let end = format!("and.end.{id}");

        let lhs = self.expr(lhs)?;
        self.emit(format!("br label %{clause}"));
        self.label(&clause);
        self.emit(format!("br i1 {}, label %{eval_rhs}, label %{end}", lhs.value));

        self.label(&eval_rhs);
        let rhs = self.expr(rhs)?;
        self.emit(format!("br label %{rhs_end}"));
        self.label(&rhs_end);
        self.emit(format!("br label %{end}"));

        self.label(&end);
        let value = self.assign(format!(
            "phi i1 [ false, %{clause} ], [ {}, %{rhs_end} ]",
            rhs.value
        ));
        Ok(Operand::new(Type::Boolean, value))
    }

    /// Reject negative lengths, then allocate `len + 1` 32-bit units with
    /// the length in unit 0.
    fn new_array(&mut self, elem: ArrayElem, len: &Expr) -> Result<Operand, CodegenError> {
        let len = self.expr(len)?;
        let non_negative = self.assign(format!("icmp sge i32 {}, 0", len.value));
        self.guard(&non_negative, "arr.alloc");

        let units = self.assign(format!("add i32 {}, 1", len.value));
        let memory = self.assign(format!("call i8* @calloc(i32 4, i32 {units})"));
        let base = self.assign(format!("bitcast i8* {memory} to i32*"));
        self.emit(format!("store i32 {}, i32* {base}", len.value));
        Ok(Operand::new(Type::array_of(elem), memory))
    }

    /// Zeroed block of the object size with the dispatch table installed in
    /// the header.
    fn new_object(&mut self, class: &Ident) -> Result<Operand, CodegenError> {
        let id = self.table.lookup_user_class(class.as_str(), class.span)?;
        let size = self.table.class(id).object_size();
        let vtable_ty = vtable_type(self.table, id);

        let memory = self.assign(format!("call i8* @calloc(i32 1, i32 {size})"));
        let header = self.assign(format!("bitcast i8* {memory} to i8***"));
        let vtable = self.assign(format!(
            "getelementptr {vtable_ty}, {vtable_ty}* @{}, i32 0, i32 0",
            vtable_name(self.table, id)
        ));
        self.emit(format!("store i8** {vtable}, i8*** {header}"));
        Ok(Operand::new(Type::Class(id), memory))
    }

    /// Virtual call through the receiver's dispatch table.
    fn call(
        &mut self,
        receiver: &Expr,
        method: &Ident,
        args: &[Expr],
    ) -> Result<Operand, CodegenError> {
        let receiver = self.expr(receiver)?;
        let class = receiver.ty.class().ok_or_else(|| {
            CodegenError::Internal(format!("call of {} on a non-object", method))
        })?;
        let table = self.table;
        let (_, target) = table.lookup_method(class, method.as_str(), method.span)?;

        let mut call_args = vec![format!("i8* {}", receiver.value)];
        for (arg, param_ty) in args.iter().zip(target.arg_types()) {
            let value = self.expr(arg)?;
            call_args.push(format!("{} {}", llvm_type(param_ty), value.value));
        }

        let vtable_ptr = self.assign(format!("bitcast i8* {} to i8***", receiver.value));
        let vtable = self.assign(format!("load i8**, i8*** {vtable_ptr}"));
        let slot = self.assign(format!("getelementptr i8*, i8** {vtable}, i32 {}", target.slot));
        let raw = self.assign(format!("load i8*, i8** {slot}"));
        let function = self.assign(format!("bitcast i8* {raw} to {}", fn_ptr_type(target)));

        let value = self.assign(format!(
            "call {} {function}({})",
            llvm_type(target.ret),
            call_args.join(", ")
        ));
        Ok(Operand::new(target.ret, value))
    }
}
