//! Front end: grammar, AST and parser.

pub mod ast;
pub mod parser;

pub use parser::{parse, parse_with_source_id, ParseError};
