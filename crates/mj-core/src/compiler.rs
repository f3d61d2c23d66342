//! Main compiler driver.
//!
//! Runs a parsed program through the pipeline:
//! table builder → type checker → layout → dispatch tables + codegen.
//! Each pass finishes before the next starts and the first error aborts
//! the unit.

use crate::codegen::{emit_module, CodegenError};
use crate::collect::build_symbol_table;
use crate::diagnostic::Diagnostic;
use crate::error::SemanticError;
use crate::layout::compute_layout;
use crate::source::SourceMap;
use crate::symbols::SymbolTable;
use crate::syntax::ast::Program;
use crate::syntax::{parse_with_source_id, ParseError};
use crate::typeck::type_check;

use std::path::{Path, PathBuf};

/// Result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// Compilation error.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("semantic error: {0}")]
    Semantic(#[from] SemanticError),

    #[error("codegen error: {0}")]
    Codegen(#[from] CodegenError),

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl CompileError {
    /// Convert to a renderable diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            CompileError::Parse(e) => {
                let diag = match e {
                    ParseError::Syntax { message, .. } => Diagnostic::error(message.clone()),
                    other => Diagnostic::error(other.to_string()),
                };
                let diag = diag.with_code("syntax");
                match e.span() {
                    Some(span) => diag.with_span(span),
                    None => diag,
                }
            }
            CompileError::Semantic(e) => semantic_diagnostic(e),
            CompileError::Codegen(CodegenError::Symbol(e)) => semantic_diagnostic(e),
            CompileError::Codegen(e) => match e {
                CodegenError::ClassValue { span, .. } => Diagnostic::error(e.to_string())
                    .with_code("class-value")
                    .with_span(*span),
                _ => Diagnostic::error(e.to_string()),
            },
            CompileError::Io { .. } => Diagnostic::error(self.to_string()),
        }
    }
}

fn semantic_diagnostic(e: &SemanticError) -> Diagnostic {
    let diag = Diagnostic::error(e.to_string())
        .with_code(e.code())
        .with_span(e.span());
    match e.construct() {
        Some(construct) => diag.with_note(format!("in {}", construct)),
        None => diag,
    }
}

/// Build, check and lay out the symbol table of a program.
pub fn analyze_program(program: &Program) -> CompileResult<SymbolTable> {
    let mut table = build_symbol_table(program)?;
    type_check(program, &table)?;
    compute_layout(&mut table);
    Ok(table)
}

/// Compile a parsed program to an LLVM IR module.
pub fn compile_program(program: &Program) -> CompileResult<String> {
    let table = analyze_program(program)?;
    Ok(emit_module(program, &table)?)
}

/// Compiler session. Owns the sources so errors can be rendered.
#[derive(Debug, Default)]
pub struct Compiler {
    source_map: SourceMap,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    /// Parse a source string.
    pub fn parse(&mut self, source: &str) -> CompileResult<Program> {
        let source_id = self.source_map.add_inline(source);
        Ok(parse_with_source_id(source, source_id)?)
    }

    /// Read and parse a source file.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> CompileResult<Program> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| CompileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let source_id = self.source_map.add_file(path.to_path_buf(), content.as_str());
        tracing::debug!("Loaded {} as {}", path.display(), source_id);
        Ok(parse_with_source_id(&content, source_id)?)
    }

    /// Compile a source string to IR.
    pub fn compile(&mut self, source: &str) -> CompileResult<String> {
        let program = self.parse(source)?;
        compile_program(&program)
    }

    /// Compile a source file to IR.
    pub fn compile_file(&mut self, path: impl AsRef<Path>) -> CompileResult<String> {
        let program = self.load_file(path)?;
        compile_program(&program)
    }

    /// Render an error against the loaded sources.
    pub fn render_error(&self, error: &CompileError) -> String {
        error.to_diagnostic().render(&self.source_map)
    }
}
