//! MiniJava compiler core.
//!
//! Compiles a single-inheritance, class-based toy language to textual LLVM
//! IR with explicit virtual dispatch, object layout and runtime array bounds
//! checks.
//!
//! # Architecture
//!
//! ```text
//!   ┌─────────┐    ┌──────────┐    ┌──────────┐    ┌──────────┐    ┌──────────┐
//!   │  Parse  │ →  │  Table   │ →  │   Type   │ →  │  Layout  │ →  │ VTables  │
//!   │  (AST)  │    │ Builder  │    │ Checker  │    │          │    │ + Codegen│
//!   └─────────┘    └──────────┘    └──────────┘    └──────────┘    └──────────┘
//!                        │               ↑               │               ↑
//!                        └──────── SymbolTable (one per unit) ───────────┘
//! ```
//!
//! The [`SymbolTable`] is written by the table builder and the layout pass
//! only; every other pass reads it.

// Core modules
pub mod compiler;
pub mod diagnostic;
pub mod error;
pub mod ids;
pub mod index_vec;
pub mod source;
pub mod symbols;
pub mod syntax;
pub mod types;

// Passes
pub mod codegen;
pub mod collect;
pub mod layout;
pub mod typeck;

// Re-exports
pub use codegen::{emit_module, emit_vtables, CodegenError};
pub use collect::build_symbol_table;
pub use compiler::{analyze_program, compile_program, CompileError, CompileResult, Compiler};
pub use diagnostic::{Diagnostic, Severity};
pub use error::{Construct, MemberKind, OverrideMismatch, SemanticError, SymbolKind};
pub use ids::ClassId;
pub use index_vec::{Idx, IndexVec};
pub use layout::{compute_layout, render_offsets};
pub use source::{SourceId, SourceMap, Span};
pub use symbols::SymbolTable;
pub use syntax::{parse, parse_with_source_id, ParseError};
pub use typeck::type_check;
pub use types::Type;
