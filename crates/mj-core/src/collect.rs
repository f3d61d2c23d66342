//! Table builder: the first pass over the AST.
//!
//! Registers the entry class, then every user class, then the members of
//! every class in declaration order. Overrides are checked against every
//! ancestor as soon as the overriding method is seen.

use crate::error::{OverrideMismatch, SemanticError};
use crate::ids::ClassId;
use crate::symbols::{MethodSymbols, SymbolTable};
use crate::syntax::ast::{ClassDecl, MainClass, MethodDecl, Program};

/// Build the structurally complete symbol table for a program.
///
/// Offsets and slots are left at zero; see [`compute_layout`](crate::layout::compute_layout).
pub fn build_symbol_table(program: &Program) -> Result<SymbolTable, SemanticError> {
    let mut builder = TableBuilder {
        table: SymbolTable::new(),
    };

    builder.register_classes(program)?;
    builder.register_entry_members(&program.main)?;
    for class in &program.classes {
        builder.register_members(class)?;
    }

    tracing::debug!("Symbol table built, {} classes", builder.table.len());
    Ok(builder.table)
}

struct TableBuilder {
    table: SymbolTable,
}

impl TableBuilder {
    fn register_classes(&mut self, program: &Program) -> Result<(), SemanticError> {
        let main = &program.main;
        self.table
            .register_entry_class(main.name.as_str(), main.name.span)?;

        for class in &program.classes {
            let parent = class.parent.as_ref().map(|p| (p.as_str(), p.span));
            self.table
                .register_class(class.name.as_str(), class.name.span, parent)?;
        }
        Ok(())
    }

    fn register_entry_members(&mut self, main: &MainClass) -> Result<(), SemanticError> {
        let id = self.table.lookup_class(main.name.as_str(), main.name.span)?;
        let mut method = MethodSymbols::entry(main.name.as_str(), main.arg.as_str(), main.span);
        for local in &main.locals {
            let ty = self.table.resolve_type(&local.ty)?;
            method.add_local(local.name.as_str(), ty, local.name.span)?;
        }
        self.table.class_mut(id).register_method(method)?;
        Ok(())
    }

    fn register_members(&mut self, decl: &ClassDecl) -> Result<(), SemanticError> {
        let id = self.table.lookup_class(decl.name.as_str(), decl.name.span)?;
        tracing::trace!("Registering members of {}", decl.name);

        for field in &decl.fields {
            let ty = self.table.resolve_type(&field.ty)?;
            self.table
                .class_mut(id)
                .register_field(field.name.as_str(), ty, field.name.span)?;
        }

        for method in &decl.methods {
            self.register_method(id, decl, method)?;
        }
        Ok(())
    }

    fn register_method(
        &mut self,
        id: ClassId,
        decl: &ClassDecl,
        method: &MethodDecl,
    ) -> Result<(), SemanticError> {
        self.table
            .class(id)
            .ensure_new_method(method.name.as_str(), method.name.span)?;

        let ret = self.table.resolve_type(&method.ret)?;
        let mut symbols = MethodSymbols::new(
            decl.name.as_str(),
            method.name.as_str(),
            ret,
            method.name.span,
        );
        for param in &method.params {
            let ty = self.table.resolve_type(&param.ty)?;
            symbols.add_argument(param.name.as_str(), ty, param.name.span)?;
        }

        self.check_override(id, &symbols)?;

        let locals = method
            .locals
            .iter()
            .map(|local| Ok((local, self.table.resolve_type(&local.ty)?)))
            .collect::<Result<Vec<_>, SemanticError>>()?;

        let registered = self.table.class_mut(id).register_method(symbols)?;
        for (local, ty) in locals {
            registered.add_local(local.name.as_str(), ty, local.name.span)?;
        }
        Ok(())
    }

    /// An override must repeat the return type and argument types of every
    /// ancestor declaring a method of the same name.
    fn check_override(&self, id: ClassId, method: &MethodSymbols) -> Result<(), SemanticError> {
        for ancestor in self.table.ancestors(id) {
            let ancestor_class = self.table.class(ancestor);
            let Some(inherited) = ancestor_class.methods.get(&method.name) else {
                continue;
            };

            let reason = if inherited.ret != method.ret {
                Some(OverrideMismatch::ReturnType)
            } else if inherited.args.len() != method.args.len() {
                Some(OverrideMismatch::ArgumentCount)
            } else if !inherited.arg_types().eq(method.arg_types()) {
                Some(OverrideMismatch::ArgumentTypes)
            } else {
                None
            };

            if let Some(reason) = reason {
                return Err(SemanticError::IncompatibleOverride {
                    class: self.table.class(id).name.clone(),
                    method: method.name.clone(),
                    ancestor: ancestor_class.name.clone(),
                    reason,
                    span: method.span,
                });
            }
        }
        Ok(())
    }
}
