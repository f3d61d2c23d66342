//! LLVM IR generation.
//!
//! The module is emitted as text in a fixed order: runtime declarations and
//! helpers, one dispatch table per class, one function per user method, and
//! finally `@main`. Output depends only on declaration order, so the same
//! program always produces byte-identical IR.

mod expr;
mod function;
mod runtime;
mod stmt;
mod vtable;

pub use vtable::emit_vtables;

use crate::error::SemanticError;
use crate::source::Span;
use crate::symbols::{MethodSymbols, SymbolTable};
use crate::syntax::ast::Program;
use crate::types::Type;
use function::FunctionBuilder;

/// Code generation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CodegenError {
    /// A name the type checker should have rejected.
    #[error(transparent)]
    Symbol(#[from] SemanticError),

    /// A class name used where a runtime object is needed.
    #[error("class '{name}' is not a value")]
    ClassValue { name: String, span: Span },

    #[error("internal codegen error: {0}")]
    Internal(String),
}

/// Emit the whole IR module for a laid-out program.
pub fn emit_module(program: &Program, table: &SymbolTable) -> Result<String, CodegenError> {
    let mut out = String::new();
    out.push_str(runtime::PRELUDE);
    out.push('\n');
    out.push_str(&emit_vtables(table));
    out.push('\n');

    for decl in &program.classes {
        let class = table.lookup_class(decl.name.as_str(), decl.name.span)?;
        for method in &decl.methods {
            let symbols = table
                .class(class)
                .methods
                .get(method.name.as_str())
                .ok_or_else(|| {
                    CodegenError::Internal(format!(
                        "method {}.{} missing from symbol table",
                        decl.name, method.name
                    ))
                })?;
            let function = FunctionBuilder::new(table, class, symbols).emit_method(method)?;
            out.push_str(&function);
            out.push('\n');
        }
    }

    let main = &program.main;
    let entry = table.lookup_class(main.name.as_str(), main.name.span)?;
    let symbols = table.class(entry).methods.get("main").ok_or_else(|| {
        CodegenError::Internal(format!("entry class {} has no main", main.name))
    })?;
    out.push_str(&FunctionBuilder::new(table, entry, symbols).emit_main(main)?);

    tracing::debug!("Emitted IR module, {} bytes", out.len());
    Ok(out)
}

/// Storage type of a value.
pub(crate) fn llvm_type(ty: Type) -> &'static str {
    match ty {
        Type::Int => "i32",
        Type::Boolean => "i1",
        Type::IntArray | Type::BooleanArray | Type::Class(_) => "i8*",
    }
}

/// Function pointer type of a method, receiver first: `i32 (i8*, i1)*`.
pub(crate) fn fn_ptr_type(method: &MethodSymbols) -> String {
    let mut params = vec!["i8*"];
    params.extend(method.arg_types().map(llvm_type));
    format!("{} ({})*", llvm_type(method.ret), params.join(", "))
}
