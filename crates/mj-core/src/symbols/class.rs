use super::method::MethodSymbols;
use crate::error::{MemberKind, SemanticError};
use crate::ids::ClassId;
use crate::source::Span;
use crate::types::Type;
use indexmap::IndexMap;

/// Size of the dispatch-table pointer at the start of every object.
pub const HEADER_SIZE: u32 = 8;

#[derive(Debug, Clone, Copy)]
pub struct FieldSymbol {
    pub ty: Type,
    /// Byte offset from the end of the object header.
    pub offset: u32,
    pub span: Span,
}

/// One dispatch-table entry: which class provides the code for a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchEntry {
    pub implementor: ClassId,
    pub method: String,
}

#[derive(Debug, Clone)]
pub struct ClassSymbols {
    pub name: String,
    pub parent: Option<ClassId>,
    pub fields: IndexMap<String, FieldSymbol>,
    pub methods: IndexMap<String, MethodSymbols>,
    /// Bytes used by inherited and own fields.
    pub field_size: u32,
    /// Number of dispatch slots, inherited ones included.
    pub slot_count: u32,
    /// Slot-indexed dispatch table.
    pub dispatch: Vec<DispatchEntry>,
    pub is_entry: bool,
    pub span: Span,
}

impl ClassSymbols {
    pub fn new(name: &str, parent: Option<ClassId>, span: Span) -> Self {
        Self {
            name: name.to_string(),
            parent,
            fields: IndexMap::new(),
            methods: IndexMap::new(),
            field_size: 0,
            slot_count: 0,
            dispatch: Vec::new(),
            is_entry: false,
            span,
        }
    }

    pub fn register_field(&mut self, name: &str, ty: Type, span: Span) -> Result<(), SemanticError> {
        if self.fields.contains_key(name) {
            return Err(self.duplicate(MemberKind::Field, name, span));
        }
        self.fields.insert(
            name.to_string(),
            FieldSymbol {
                ty,
                offset: 0,
                span,
            },
        );
        Ok(())
    }

    pub fn register_method(
        &mut self,
        method: MethodSymbols,
    ) -> Result<&mut MethodSymbols, SemanticError> {
        self.ensure_new_method(&method.name, method.span)?;
        let entry = self.methods.entry(method.name.clone());
        Ok(entry.or_insert(method))
    }

    /// Fails with `DuplicateMember` if this class already declares `name`.
    pub fn ensure_new_method(&self, name: &str, span: Span) -> Result<(), SemanticError> {
        if self.methods.contains_key(name) {
            return Err(self.duplicate(MemberKind::Method, name, span));
        }
        Ok(())
    }

    fn duplicate(&self, kind: MemberKind, name: &str, span: Span) -> SemanticError {
        SemanticError::DuplicateMember {
            kind,
            name: name.to_string(),
            scope: self.name.clone(),
            span,
        }
    }

    /// Bytes to allocate for an instance.
    pub fn object_size(&self) -> u32 {
        self.field_size + HEADER_SIZE
    }
}
