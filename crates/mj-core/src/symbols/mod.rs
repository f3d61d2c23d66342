//! The symbol model shared by every semantic pass.
//!
//! A [`SymbolTable`] is created once per compilation unit. The table builder
//! fills it, the layout pass annotates it with offsets and slots, and it is
//! read-only afterwards. Classes live in an [`IndexVec`] addressed by
//! [`ClassId`]; inheritance is an explicit parent link walked iteratively.

mod class;
mod method;

pub use class::{ClassSymbols, DispatchEntry, FieldSymbol, HEADER_SIZE};
pub use method::MethodSymbols;

use crate::error::{SemanticError, SymbolKind};
use crate::ids::ClassId;
use crate::index_vec::IndexVec;
use crate::source::Span;
use crate::syntax::ast::{TypeExpr, TypeExprKind};
use crate::types::Type;
use std::collections::HashMap;

/// Where an identifier resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Local(Type),
    Argument(Type),
    Field {
        owner: ClassId,
        ty: Type,
        offset: u32,
    },
}

impl Binding {
    pub fn ty(self) -> Type {
        match self {
            Binding::Local(ty) | Binding::Argument(ty) => ty,
            Binding::Field { ty, .. } => ty,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    classes: IndexVec<ClassId, ClassSymbols>,
    by_name: HashMap<String, ClassId>,
    entry: Option<ClassId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register the class holding `main`. It takes no part in inheritance.
    pub fn register_entry_class(&mut self, name: &str, span: Span) -> Result<ClassId, SemanticError> {
        let id = self.insert(ClassSymbols::new(name, None, span))?;
        self.classes[id].is_entry = true;
        self.entry = Some(id);
        Ok(id)
    }

    /// Register a user class. A parent must already be registered and must
    /// not be the entry class.
    pub fn register_class(
        &mut self,
        name: &str,
        span: Span,
        parent: Option<(&str, Span)>,
    ) -> Result<ClassId, SemanticError> {
        if self.by_name.contains_key(name) {
            return Err(SemanticError::DuplicateClass {
                name: name.to_string(),
                span,
            });
        }
        let parent = match parent {
            Some((parent, parent_span)) => Some(self.lookup_user_class(parent, parent_span)?),
            None => None,
        };
        self.insert(ClassSymbols::new(name, parent, span))
    }

    fn insert(&mut self, class: ClassSymbols) -> Result<ClassId, SemanticError> {
        if self.by_name.contains_key(&class.name) {
            return Err(SemanticError::DuplicateClass {
                name: class.name.clone(),
                span: class.span,
            });
        }
        let name = class.name.clone();
        let id = self.classes.push(class);
        self.by_name.insert(name, id);
        Ok(id)
    }

    // ========================================================================
    // Class queries
    // ========================================================================

    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub fn lookup_class(&self, name: &str, span: Span) -> Result<ClassId, SemanticError> {
        self.class_id(name)
            .ok_or_else(|| SemanticError::unknown(SymbolKind::Class, name, span))
    }

    /// Like [`lookup_class`](Self::lookup_class) but rejects the entry class,
    /// which can be neither extended nor instantiated.
    pub fn lookup_user_class(&self, name: &str, span: Span) -> Result<ClassId, SemanticError> {
        match self.class_id(name) {
            Some(id) if Some(id) != self.entry => Ok(id),
            _ => Err(SemanticError::unknown(SymbolKind::Class, name, span)),
        }
    }

    pub fn class(&self, id: ClassId) -> &ClassSymbols {
        &self.classes[id]
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassSymbols {
        &mut self.classes[id]
    }

    pub fn classes(&self) -> impl Iterator<Item = (ClassId, &ClassSymbols)> {
        self.classes.iter_enumerated()
    }

    /// Non-entry classes in declaration order.
    pub fn user_classes(&self) -> impl Iterator<Item = (ClassId, &ClassSymbols)> {
        self.classes.iter_enumerated().filter(|(_, class)| !class.is_entry)
    }

    pub fn class_ids(&self) -> impl Iterator<Item = ClassId> {
        self.classes.indices()
    }

    pub fn entry_class(&self) -> Option<ClassId> {
        self.entry
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    // ========================================================================
    // Inheritance
    // ========================================================================

    /// Proper ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: ClassId) -> Ancestors<'_> {
        Ancestors {
            table: self,
            next: self.classes[id].parent,
        }
    }

    /// `id` followed by its ancestors.
    pub fn self_and_ancestors(&self, id: ClassId) -> impl Iterator<Item = ClassId> + '_ {
        std::iter::once(id).chain(self.ancestors(id))
    }

    /// True when `ancestor` is a proper ancestor of `id`.
    pub fn is_ancestor(&self, ancestor: ClassId, id: ClassId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// Assignment compatibility: equal types, or a class and one of its
    /// ancestors.
    pub fn is_subtype(&self, sub: Type, sup: Type) -> bool {
        match (sub, sup) {
            (Type::Class(sub), Type::Class(sup)) => sub == sup || self.is_ancestor(sup, sub),
            _ => sub == sup,
        }
    }

    // ========================================================================
    // Member resolution
    // ========================================================================

    /// Find `name` in `class` or the nearest ancestor declaring it.
    pub fn resolve_inherited_method(
        &self,
        class: ClassId,
        name: &str,
    ) -> Option<(ClassId, &MethodSymbols)> {
        self.self_and_ancestors(class)
            .find_map(|id| self.classes[id].methods.get(name).map(|m| (id, m)))
    }

    pub fn lookup_method(
        &self,
        class: ClassId,
        name: &str,
        span: Span,
    ) -> Result<(ClassId, &MethodSymbols), SemanticError> {
        self.resolve_inherited_method(class, name)
            .ok_or_else(|| SemanticError::unknown(SymbolKind::Method, name, span))
    }

    /// Find field `name` in `class` or the nearest ancestor declaring it.
    pub fn resolve_field(&self, class: ClassId, name: &str) -> Option<(ClassId, &FieldSymbol)> {
        self.self_and_ancestors(class)
            .find_map(|id| self.classes[id].fields.get(name).map(|f| (id, f)))
    }

    pub fn lookup_field(
        &self,
        class: ClassId,
        name: &str,
        span: Span,
    ) -> Result<(ClassId, &FieldSymbol), SemanticError> {
        self.resolve_field(class, name)
            .ok_or_else(|| SemanticError::unknown(SymbolKind::Field, name, span))
    }

    /// Resolve a bare identifier inside `method` of `class`: locals, then
    /// arguments, then own fields, then ancestor fields.
    pub fn resolve_identifier(
        &self,
        name: &str,
        method: &MethodSymbols,
        class: ClassId,
    ) -> Option<Binding> {
        if let Some(&ty) = method.locals.get(name) {
            return Some(Binding::Local(ty));
        }
        if let Some(&ty) = method.args.get(name) {
            return Some(Binding::Argument(ty));
        }
        self.resolve_field(class, name).map(|(owner, field)| Binding::Field {
            owner,
            ty: field.ty,
            offset: field.offset,
        })
    }

    /// Type of a bare identifier, or `None` when it names no variable.
    pub fn resolve_identifier_type(
        &self,
        name: &str,
        method: &MethodSymbols,
        class: ClassId,
    ) -> Option<Type> {
        self.resolve_identifier(name, method, class).map(Binding::ty)
    }

    // ========================================================================
    // Types
    // ========================================================================

    /// Resolve a written type. Class names must denote a non-entry class.
    pub fn resolve_type(&self, ty: &TypeExpr) -> Result<Type, SemanticError> {
        Ok(match &ty.kind {
            TypeExprKind::Int => Type::Int,
            TypeExprKind::Boolean => Type::Boolean,
            TypeExprKind::IntArray => Type::IntArray,
            TypeExprKind::BooleanArray => Type::BooleanArray,
            TypeExprKind::Class(name) => match self.class_id(name) {
                Some(id) if Some(id) != self.entry => Type::Class(id),
                _ => return Err(SemanticError::unknown(SymbolKind::Type, name.as_str(), ty.span)),
            },
        })
    }

    pub fn type_name(&self, ty: Type) -> String {
        match ty {
            Type::Int => "int".to_string(),
            Type::Boolean => "boolean".to_string(),
            Type::IntArray => "int[]".to_string(),
            Type::BooleanArray => "boolean[]".to_string(),
            Type::Class(id) => self.classes[id].name.clone(),
        }
    }
}

/// Iterator over the proper ancestors of a class.
pub struct Ancestors<'a> {
    table: &'a SymbolTable,
    next: Option<ClassId>,
}

impl Iterator for Ancestors<'_> {
    type Item = ClassId;

    fn next(&mut self) -> Option<ClassId> {
        let id = self.next?;
        self.next = self.table.classes[id].parent;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MemberKind;

    fn span() -> Span {
        Span::default()
    }

    fn hierarchy() -> (SymbolTable, ClassId, ClassId, ClassId) {
        let mut table = SymbolTable::new();
        table.register_entry_class("Main", span()).unwrap();
        let a = table.register_class("A", span(), None).unwrap();
        let b = table.register_class("B", span(), Some(("A", span()))).unwrap();
        let c = table.register_class("C", span(), Some(("B", span()))).unwrap();
        (table, a, b, c)
    }

    #[test]
    fn test_duplicate_class() {
        let (mut table, ..) = hierarchy();
        let err = table.register_class("B", span(), None).unwrap_err();
        assert!(matches!(err, SemanticError::DuplicateClass { ref name, .. } if name == "B"));
        let err = table.register_class("Main", span(), None).unwrap_err();
        assert_eq!(err.code(), "duplicate-class");
    }

    #[test]
    fn test_parent_must_exist_and_not_be_entry() {
        let (mut table, ..) = hierarchy();
        let err = table.register_class("D", span(), Some(("Nope", span()))).unwrap_err();
        assert!(matches!(
            err,
            SemanticError::UnknownSymbol { kind: SymbolKind::Class, .. }
        ));
        let err = table.register_class("E", span(), Some(("Main", span()))).unwrap_err();
        assert!(matches!(err, SemanticError::UnknownSymbol { .. }));
    }

    #[test]
    fn test_ancestor_walk() {
        let (table, a, b, c) = hierarchy();
        assert_eq!(table.ancestors(c).collect::<Vec<_>>(), vec![b, a]);
        assert!(table.is_ancestor(a, c));
        assert!(!table.is_ancestor(c, a));
        assert!(!table.is_ancestor(c, c));
        assert!(table.is_subtype(Type::Class(c), Type::Class(a)));
        assert!(!table.is_subtype(Type::Class(a), Type::Class(b)));
        assert!(!table.is_subtype(Type::Int, Type::Boolean));
        assert_eq!(table.user_classes().count(), 3);
    }

    #[test]
    fn test_inherited_method_resolution() {
        let (mut table, a, b, c) = hierarchy();
        table
            .class_mut(a)
            .register_method(MethodSymbols::new("A", "get", Type::Int, span()))
            .unwrap();
        table
            .class_mut(b)
            .register_method(MethodSymbols::new("B", "get", Type::Int, span()))
            .unwrap();

        let (owner, method) = table.resolve_inherited_method(c, "get").unwrap();
        assert_eq!(owner, b);
        assert_eq!(method.qualified_name, "B.get");
        assert!(table.lookup_method(a, "missing", span()).is_err());

        let err = table
            .class_mut(a)
            .register_method(MethodSymbols::new("A", "get", Type::Boolean, span()))
            .unwrap_err();
        assert!(matches!(
            err,
            SemanticError::DuplicateMember { kind: MemberKind::Method, .. }
        ));
    }

    #[test]
    fn test_four_tier_identifier_resolution() {
        let (mut table, a, b, c) = hierarchy();
        table.class_mut(a).register_field("x", Type::Int, span()).unwrap();
        table.class_mut(a).register_field("y", Type::Int, span()).unwrap();
        table.class_mut(b).register_field("y", Type::Boolean, span()).unwrap();
        table.class_mut(c).register_field("z", Type::IntArray, span()).unwrap();

        let mut method = MethodSymbols::new("C", "m", Type::Int, span());
        method.add_argument("arg", Type::Boolean, span()).unwrap();
        method.add_local("z", Type::Int, span()).unwrap();

        assert_eq!(table.resolve_identifier_type("z", &method, c), Some(Type::Int));
        assert_eq!(table.resolve_identifier_type("arg", &method, c), Some(Type::Boolean));
        assert_eq!(table.resolve_identifier_type("y", &method, c), Some(Type::Boolean));
        assert!(matches!(
            table.resolve_identifier("x", &method, c),
            Some(Binding::Field { owner, .. }) if owner == a
        ));
        assert_eq!(table.resolve_identifier_type("A", &method, c), None);

        let (owner, field) = table.lookup_field(c, "x", span()).unwrap();
        assert_eq!(owner, a);
        assert_eq!(field.ty, Type::Int);
        assert!(matches!(
            table.lookup_field(a, "z", span()),
            Err(SemanticError::UnknownSymbol { kind: SymbolKind::Field, .. })
        ));
    }

    #[test]
    fn test_locals_share_namespace_with_arguments() {
        let mut method = MethodSymbols::new("A", "m", Type::Int, span());
        method.add_argument("a", Type::Int, span()).unwrap();
        let err = method.add_argument("a", Type::Int, span()).unwrap_err();
        assert!(matches!(
            err,
            SemanticError::DuplicateMember { kind: MemberKind::Argument, .. }
        ));
        let err = method.add_local("a", Type::Int, span()).unwrap_err();
        assert!(matches!(
            err,
            SemanticError::DuplicateMember { kind: MemberKind::Local, ref scope, .. } if scope == "A.m"
        ));

        let mut main = MethodSymbols::entry("Main", "args", span());
        assert!(main.add_local("args", Type::Int, span()).is_err());
    }

    #[test]
    fn test_resolve_type() {
        let (table, a, ..) = hierarchy();
        let class_ty = |name: &str| TypeExpr {
            kind: TypeExprKind::Class(name.to_string()),
            span: span(),
        };
        assert_eq!(table.resolve_type(&class_ty("A")).unwrap(), Type::Class(a));
        assert!(table.resolve_type(&class_ty("Main")).is_err());
        assert!(table.resolve_type(&class_ty("Zed")).is_err());
        assert_eq!(table.type_name(Type::Class(a)), "A");
        assert_eq!(table.type_name(Type::BooleanArray), "boolean[]");
    }
}
