//! Index types for the symbol model.

use serde::Serialize;

/// Index of a class in the [`SymbolTable`](crate::symbols::SymbolTable).
///
/// Classes are numbered in registration order, which is also declaration
/// order, so a parent always has a smaller id than its children.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
pub struct ClassId(pub u32);

impl ClassId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}
