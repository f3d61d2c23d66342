//! Object layout: field offsets and dispatch slots.
//!
//! Runs after type checking. Classes are numbered in declaration order and
//! a parent is always declared before its children, so walking the table
//! in id order sees every parent's final layout first.

use crate::ids::ClassId;
use crate::symbols::{DispatchEntry, SymbolTable};
use std::fmt::Write;

/// Assign field offsets, method slots and dispatch tables in place.
pub fn compute_layout(table: &mut SymbolTable) {
    let ids: Vec<ClassId> = table.class_ids().collect();
    for id in ids {
        if table.class(id).is_entry {
            continue;
        }
        layout_class(table, id);
    }
    tracing::debug!("Layout computed for {} classes", table.len());
}

fn layout_class(table: &mut SymbolTable, id: ClassId) {
    let class = table.class(id);
    let (mut offset, mut slot_count, mut dispatch) = match class.parent {
        Some(parent) => {
            let parent = table.class(parent);
            (parent.field_size, parent.slot_count, parent.dispatch.clone())
        }
        None => (0, 0, Vec::new()),
    };

    let mut field_offsets = Vec::with_capacity(class.fields.len());
    for field in class.fields.values() {
        field_offsets.push(offset);
        offset += field.ty.field_size();
    }

    let mut method_slots = Vec::with_capacity(class.methods.len());
    for name in class.methods.keys() {
        let inherited = class
            .parent
            .and_then(|parent| table.resolve_inherited_method(parent, name));
        let entry = DispatchEntry {
            implementor: id,
            method: name.clone(),
        };
        let slot = match inherited {
            Some((_, method)) => {
                dispatch[method.slot as usize] = entry;
                method.slot
            }
            None => {
                dispatch.push(entry);
                slot_count += 1;
                slot_count - 1
            }
        };
        method_slots.push(slot);
    }

    let class = table.class_mut(id);
    for (field, offset) in class.fields.values_mut().zip(field_offsets) {
        field.offset = offset;
    }
    for (method, slot) in class.methods.values_mut().zip(method_slots) {
        method.slot = slot;
    }
    class.field_size = offset;
    class.slot_count = slot_count;
    class.dispatch = dispatch;

    tracing::trace!(
        "Laid out {}: {} bytes, {} slots",
        class.name,
        class.object_size(),
        class.slot_count
    );
}

/// Human-readable dump of field offsets and newly introduced method slots.
pub fn render_offsets(table: &SymbolTable) -> String {
    let mut out = String::new();
    for (_, class) in table.user_classes() {
        let _ = writeln!(out, "-----------Class {}-----------", class.name);

        let _ = writeln!(out, "--Variables---");
        for (name, field) in &class.fields {
            let _ = writeln!(out, "{}.{} : {}", class.name, name, field.offset);
        }

        let _ = writeln!(out, "--Methods---");
        for (name, method) in &class.methods {
            let overrides = class
                .parent
                .and_then(|parent| table.resolve_inherited_method(parent, name))
                .is_some();
            if !overrides {
                let _ = writeln!(out, "{}.{} : {}", class.name, name, method.slot * 8);
            }
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::build_symbol_table;
    use crate::syntax::parse;

    fn layout(source: &str) -> SymbolTable {
        let program = parse(source).unwrap();
        let mut table = build_symbol_table(&program).unwrap();
        compute_layout(&mut table);
        table
    }

    const SHAPES: &str = r#"
        class Main { public static void main(String[] args) { } }
        class A {
            int i;
            boolean flag;
            int j;
            public int foo() { return 1; }
            public int bar() { return 2; }
        }
        class B extends A {
            A ref;
            int[] data;
            public int bar() { return 3; }
            public int baz() { return 4; }
        }
        class C extends B {
            boolean done;
            public int foo() { return 5; }
        }
    "#;

    #[test]
    fn test_field_offsets_extend_parent_layout() {
        let table = layout(SHAPES);
        let a = table.class(table.class_id("A").unwrap());
        let b = table.class(table.class_id("B").unwrap());
        let c = table.class(table.class_id("C").unwrap());

        let offsets = |class: &crate::symbols::ClassSymbols| {
            class.fields.values().map(|f| f.offset).collect::<Vec<_>>()
        };
        assert_eq!(offsets(a), vec![0, 4, 5]);
        assert_eq!(a.field_size, 9);
        assert_eq!(offsets(b), vec![9, 17]);
        assert_eq!(b.field_size, 25);
        assert_eq!(offsets(c), vec![25]);
        assert_eq!(c.object_size(), 26 + 8);
    }

    #[test]
    fn test_overrides_reuse_slots() {
        let table = layout(SHAPES);
        let a_id = table.class_id("A").unwrap();
        let b_id = table.class_id("B").unwrap();
        let c_id = table.class_id("C").unwrap();
        let (a, b, c) = (table.class(a_id), table.class(b_id), table.class(c_id));

        assert_eq!(a.methods["foo"].slot, 0);
        assert_eq!(a.methods["bar"].slot, 1);
        assert_eq!(b.methods["bar"].slot, 1);
        assert_eq!(b.methods["baz"].slot, 2);
        assert_eq!(c.methods["foo"].slot, 0);
        assert_eq!((a.slot_count, b.slot_count, c.slot_count), (2, 3, 3));

        let implementors: Vec<_> = c
            .dispatch
            .iter()
            .map(|e| (e.implementor, e.method.as_str()))
            .collect();
        assert_eq!(
            implementors,
            vec![(c_id, "foo"), (b_id, "bar"), (b_id, "baz")]
        );
    }

    #[test]
    fn test_entry_class_has_no_layout() {
        let table = layout(SHAPES);
        let entry = table.class(table.entry_class().unwrap());
        assert!(entry.dispatch.is_empty());
        assert_eq!(entry.field_size, 0);
    }

    #[test]
    fn test_render_offsets() {
        let table = layout(SHAPES);
        let report = render_offsets(&table);
        let expected = "\
-----------Class A-----------
--Variables---
A.i : 0
A.flag : 4
A.j : 5
--Methods---
A.foo : 0
A.bar : 8

-----------Class B-----------
--Variables---
B.ref : 9
B.data : 17
--Methods---
B.baz : 16

-----------Class C-----------
--Variables---
C.done : 25
--Methods---

";
        assert_eq!(report, expected);
    }
}
