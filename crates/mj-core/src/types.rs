//! Resolved semantic types.

use crate::ids::ClassId;
use crate::syntax::ast::ArrayElem;

/// A fully resolved MiniJava type.
///
/// Class types refer to the symbol table by id; use
/// [`SymbolTable::type_name`](crate::symbols::SymbolTable::type_name) to
/// print one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Boolean,
    IntArray,
    BooleanArray,
    Class(ClassId),
}

impl Type {
    /// Element type of an array type.
    pub fn element(self) -> Option<Type> {
        match self {
            Type::IntArray => Some(Type::Int),
            Type::BooleanArray => Some(Type::Boolean),
            _ => None,
        }
    }

    pub fn is_array(self) -> bool {
        self.element().is_some()
    }

    pub fn class(self) -> Option<ClassId> {
        match self {
            Type::Class(id) => Some(id),
            _ => None,
        }
    }

    pub fn array_of(elem: ArrayElem) -> Type {
        match elem {
            ArrayElem::Int => Type::IntArray,
            ArrayElem::Boolean => Type::BooleanArray,
        }
    }

    /// Bytes a field of this type occupies in an object.
    pub fn field_size(self) -> u32 {
        match self {
            Type::Int => 4,
            Type::Boolean => 1,
            Type::IntArray | Type::BooleanArray | Type::Class(_) => 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_sizes() {
        assert_eq!(Type::Int.field_size(), 4);
        assert_eq!(Type::Boolean.field_size(), 1);
        assert_eq!(Type::BooleanArray.field_size(), 8);
        assert_eq!(Type::Class(ClassId::new(0)).field_size(), 8);
    }

    #[test]
    fn test_elements() {
        assert_eq!(Type::IntArray.element(), Some(Type::Int));
        assert_eq!(Type::array_of(ArrayElem::Boolean), Type::BooleanArray);
        assert!(!Type::Int.is_array());
        assert_eq!(Type::Class(ClassId::new(2)).class(), Some(ClassId::new(2)));
    }
}
