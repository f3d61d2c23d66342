//! Source file bookkeeping for diagnostics.
//!
//! Every AST node carries a [`Span`] pointing back into a [`SourceFile`]
//! registered in the [`SourceMap`], so errors from any pass can be rendered
//! with a file name, line and column.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Identifier of a file registered in a [`SourceMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceId(pub u32);

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// Half-open byte range `[start, end)` inside one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub source: SourceId,
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(source: SourceId, start: usize, end: usize) -> Self {
        Self { source, start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A loaded source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: SourceId,
    /// `None` for sources handed in as strings.
    pub path: Option<PathBuf>,
    pub content: String,
    /// Byte offset of the first character of every line.
    line_starts: Vec<usize>,
}

impl SourceFile {
    fn new(id: SourceId, path: Option<PathBuf>, content: String) -> Self {
        let line_starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            id,
            path,
            content,
            line_starts,
        }
    }

    /// Display name used in rendered diagnostics.
    pub fn name(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => format!("<input#{}>", self.id.0),
        }
    }

    /// One-based line and column of a byte offset.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let column = self.content[line_start..offset.min(self.content.len())]
            .chars()
            .count();
        (line + 1, column + 1)
    }

    /// Text of a one-based line, without its terminator.
    pub fn line_text(&self, line: usize) -> &str {
        let Some(&start) = self.line_starts.get(line.wrapping_sub(1)) else {
            return "";
        };
        let end = self
            .line_starts
            .get(line)
            .copied()
            .unwrap_or(self.content.len());
        self.content[start..end].trim_end_matches(['\n', '\r'])
    }
}

/// All sources of one compiler session.
#[derive(Debug, Default, Clone)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file read from disk.
    pub fn add_file(&mut self, path: PathBuf, content: impl Into<String>) -> SourceId {
        self.push(Some(path), content.into())
    }

    /// Register an in-memory source.
    pub fn add_inline(&mut self, content: impl Into<String>) -> SourceId {
        self.push(None, content.into())
    }

    fn push(&mut self, path: Option<PathBuf>, content: String) -> SourceId {
        let id = SourceId(self.files.len() as u32);
        self.files.push(SourceFile::new(id, path, content));
        id
    }

    pub fn get(&self, id: SourceId) -> Option<&SourceFile> {
        self.files.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        let mut map = SourceMap::new();
        let id = map.add_inline("class A {\n  int x;\n}\n");
        let file = map.get(id).unwrap();

        assert_eq!(file.line_col(0), (1, 1));
        assert_eq!(file.line_col(6), (1, 7));
        assert_eq!(file.line_col(12), (2, 3));
        assert_eq!(file.line_text(2), "  int x;");
    }

    #[test]
    fn test_span_len() {
        assert_eq!(Span::new(SourceId(0), 4, 14).len(), 10);
        assert_eq!(Span::new(SourceId(0), 8, 4).len(), 0);
    }

    #[test]
    fn test_source_names() {
        let mut map = SourceMap::new();
        let inline = map.add_inline("");
        let file = map.add_file(PathBuf::from("tests/Foo.java"), "");

        assert_eq!(map.get(inline).unwrap().name(), "<input#0>");
        assert_eq!(map.get(file).unwrap().name(), "tests/Foo.java");
        assert_eq!(map.len(), 2);
    }
}
