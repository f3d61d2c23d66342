use crate::error::{MemberKind, SemanticError};
use crate::source::Span;
use crate::types::Type;
use indexmap::IndexMap;

/// Signature and variables of one method.
#[derive(Debug, Clone)]
pub struct MethodSymbols {
    pub name: String,
    /// `Class.method`, used in diagnostics and as the emitted function name.
    pub qualified_name: String,
    pub ret: Type,
    /// Formal parameters in declaration order.
    pub args: IndexMap<String, Type>,
    /// Local variables in declaration order.
    pub locals: IndexMap<String, Type>,
    /// Dispatch slot, assigned by the layout pass.
    pub slot: u32,
    /// Name of the `String[]` parameter when this is the entry function.
    pub entry_arg: Option<String>,
    pub span: Span,
}

impl MethodSymbols {
    pub fn new(class: &str, name: &str, ret: Type, span: Span) -> Self {
        Self {
            name: name.to_string(),
            qualified_name: format!("{}.{}", class, name),
            ret,
            args: IndexMap::new(),
            locals: IndexMap::new(),
            slot: 0,
            entry_arg: None,
            span,
        }
    }

    /// The static `main` of the entry class.
    pub fn entry(class: &str, arg: &str, span: Span) -> Self {
        let mut method = Self::new(class, "main", Type::Int, span);
        method.entry_arg = Some(arg.to_string());
        method
    }

    pub fn add_argument(&mut self, name: &str, ty: Type, span: Span) -> Result<(), SemanticError> {
        if self.args.contains_key(name) {
            return Err(self.duplicate(MemberKind::Argument, name, span));
        }
        self.args.insert(name.to_string(), ty);
        Ok(())
    }

    /// Locals share one namespace with the arguments.
    pub fn add_local(&mut self, name: &str, ty: Type, span: Span) -> Result<(), SemanticError> {
        if self.locals.contains_key(name)
            || self.args.contains_key(name)
            || self.entry_arg.as_deref() == Some(name)
        {
            return Err(self.duplicate(MemberKind::Local, name, span));
        }
        self.locals.insert(name.to_string(), ty);
        Ok(())
    }

    fn duplicate(&self, kind: MemberKind, name: &str, span: Span) -> SemanticError {
        SemanticError::DuplicateMember {
            kind,
            name: name.to_string(),
            scope: self.qualified_name.clone(),
            span,
        }
    }

    /// Argument types in declaration order.
    pub fn arg_types(&self) -> impl Iterator<Item = Type> + '_ {
        self.args.values().copied()
    }

    pub fn is_entry(&self) -> bool {
        self.entry_arg.is_some()
    }
}
