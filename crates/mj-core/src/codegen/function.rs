//! Per-function emission state.

use super::{llvm_type, CodegenError};
use crate::error::{SemanticError, SymbolKind};
use crate::ids::ClassId;
use crate::source::Span;
use crate::symbols::{Binding, MethodSymbols, SymbolTable, HEADER_SIZE};
use crate::syntax::ast::{MainClass, MethodDecl};
use crate::types::Type;
use std::fmt::Write;

/// A value produced by an expression, with its static type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Operand {
    pub ty: Type,
    /// Register (`%_3`) or constant (`42`, `true`).
    pub value: String,
}

impl Operand {
    pub fn new(ty: Type, value: impl Into<String>) -> Self {
        Self {
            ty,
            value: value.into(),
        }
    }
}

/// Builds the text of one function.
///
/// Register and label counters live here, so every function starts
/// numbering from zero.
pub(super) struct FunctionBuilder<'a> {
    pub table: &'a SymbolTable,
    pub class: ClassId,
    pub method: &'a MethodSymbols,
    body: String,
    next_reg: u32,
    next_label: u32,
}

impl<'a> FunctionBuilder<'a> {
    pub fn new(table: &'a SymbolTable, class: ClassId, method: &'a MethodSymbols) -> Self {
        Self {
            table,
            class,
            method,
            body: String::new(),
            next_reg: 0,
            next_label: 0,
        }
    }

    /// `define RET @C.m(i8* %this, T %.x) { ... }`
    pub fn emit_method(mut self, decl: &MethodDecl) -> Result<String, CodegenError> {
        tracing::trace!("Emitting {}", self.method.qualified_name);
        let method = self.method;

        for (name, &ty) in &method.args {
            let ty = llvm_type(ty);
            self.emit(format!("%{name} = alloca {ty}"));
            self.emit(format!("store {ty} %.{name}, {ty}* %{name}"));
        }
        self.alloca_locals();

        for stmt in &decl.body {
            self.stmt(stmt)?;
        }
        let ret = self.expr(&decl.ret_expr)?;
        self.emit(format!("ret {} {}", llvm_type(method.ret), ret.value));

        let mut params = vec!["i8* %this".to_string()];
        params.extend(
            method
                .args
                .iter()
                .map(|(name, &ty)| format!("{} %.{}", llvm_type(ty), name)),
        );
        Ok(format!(
            "define {} @{}({}) {{\n{}}}\n",
            llvm_type(method.ret),
            method.qualified_name,
            params.join(", "),
            self.body
        ))
    }

    /// The program entry point; always returns 0.
    pub fn emit_main(mut self, main: &MainClass) -> Result<String, CodegenError> {
        tracing::trace!("Emitting main of {}", main.name);
        self.alloca_locals();
        for stmt in &main.body {
            self.stmt(stmt)?;
        }
        self.emit("ret i32 0");
        Ok(format!("define i32 @main() {{\n{}}}\n", self.body))
    }

    fn alloca_locals(&mut self) {
        let method = self.method;
        for (name, &ty) in &method.locals {
            self.emit(format!("%{} = alloca {}", name, llvm_type(ty)));
        }
    }

    // ========================================================================
    // Text helpers
    // ========================================================================

    /// Append one indented instruction.
    pub fn emit(&mut self, line: impl AsRef<str>) {
        let _ = writeln!(self.body, "    {}", line.as_ref());
    }

    /// Start a new basic block.
    pub fn label(&mut self, name: &str) {
        let _ = writeln!(self.body, "{name}:");
    }

    /// A fresh `%_N` register name.
    pub fn fresh(&mut self) -> String {
        let reg = format!("%_{}", self.next_reg);
        self.next_reg += 1;
        reg
    }

    /// Emit `%_N = <rhs>` and return `%_N`.
    pub fn assign(&mut self, rhs: impl AsRef<str>) -> String {
        let reg = self.fresh();
        self.emit(format!("{} = {}", reg, rhs.as_ref()));
        reg
    }

    /// A fresh id shared by the labels of one control-flow construct.
    pub fn fresh_label(&mut self) -> u32 {
        let id = self.next_label;
        self.next_label += 1;
        id
    }

    // ========================================================================
    // Variables
    // ========================================================================

    /// Resolve a variable to a pointer to its storage.
    ///
    /// Locals and arguments live in their own `alloca`; fields are reached
    /// through a constant byte offset from `%this`.
    pub fn place(&mut self, name: &str, span: Span) -> Result<(String, Type), CodegenError> {
        let binding = self
            .table
            .resolve_identifier(name, self.method, self.class)
            .ok_or_else(|| SemanticError::unknown(SymbolKind::Identifier, name, span))?;

        match binding {
            Binding::Local(ty) | Binding::Argument(ty) => Ok((format!("%{name}"), ty)),
            Binding::Field { ty, offset, .. } => {
                let byte = self.assign(format!(
                    "getelementptr i8, i8* %this, i32 {}",
                    offset + HEADER_SIZE
                ));
                let ptr = self.assign(format!("bitcast i8* {} to {}*", byte, llvm_type(ty)));
                Ok((ptr, ty))
            }
        }
    }

    /// Load the current value of a variable.
    pub fn load_variable(&mut self, name: &str, span: Span) -> Result<Operand, CodegenError> {
        let (ptr, ty) = self.place(name, span)?;
        let ty_str = llvm_type(ty);
        let value = self.assign(format!("load {ty_str}, {ty_str}* {ptr}"));
        Ok(Operand::new(ty, value))
    }

    // ========================================================================
    // Arrays
    // ========================================================================

    /// Branch to the runtime error helper unless `cond` holds.
    pub fn guard(&mut self, cond: &str, prefix: &str) {
        let id = self.fresh_label();
        let ok = format!("{prefix}.ok.{id}");
        let err = format!("{prefix}.err.{id}");
        self.emit(format!("br i1 {cond}, label %{ok}, label %{err}"));
        self.label(&err);
        self.emit(super::runtime::THROW_OOB);
        self.emit(format!("br label %{ok}"));
        self.label(&ok);
    }

    /// Check `0 <= index < length` and return an `i32*` to the element.
    pub fn element_ptr(&mut self, array: &str, index: &str) -> String {
        let base = self.assign(format!("bitcast i8* {array} to i32*"));
        let len = self.assign(format!("load i32, i32* {base}"));
        let non_negative = self.assign(format!("icmp sge i32 {index}, 0"));
        let below_len = self.assign(format!("icmp slt i32 {index}, {len}"));
        let in_bounds = self.assign(format!("and i1 {non_negative}, {below_len}"));
        self.guard(&in_bounds, "oob");

        let unit = self.assign(format!("add i32 {index}, 1"));
        self.assign(format!("getelementptr i32, i32* {base}, i32 {unit}"))
    }
}
