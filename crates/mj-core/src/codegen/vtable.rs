//! Dispatch-table globals.

use super::fn_ptr_type;
use crate::ids::ClassId;
use crate::symbols::SymbolTable;

/// Name of a class's dispatch-table global, without the `@`.
pub(crate) fn vtable_name(table: &SymbolTable, class: ClassId) -> String {
    format!(".{}_vtable", table.class(class).name)
}

/// Array type of a class's dispatch table: `[N x i8*]`.
pub(crate) fn vtable_type(table: &SymbolTable, class: ClassId) -> String {
    format!("[{} x i8*]", table.class(class).dispatch.len())
}

/// One global per class in declaration order, entries in slot order.
///
/// The entry class is never instantiated and gets an empty table.
pub fn emit_vtables(table: &SymbolTable) -> String {
    let mut out = String::new();
    for (id, class) in table.classes() {
        let entries: Vec<String> = class
            .dispatch
            .iter()
            .filter_map(|entry| {
                let implementor = table.class(entry.implementor);
                let method = implementor.methods.get(&entry.method)?;
                Some(format!(
                    "i8* bitcast ({} @{} to i8*)",
                    fn_ptr_type(method),
                    method.qualified_name
                ))
            })
            .collect();

        out.push_str(&format!(
            "@{} = global {} [{}]\n",
            vtable_name(table, id),
            vtable_type(table, id),
            entries.join(", ")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::build_symbol_table;
    use crate::layout::compute_layout;
    use crate::syntax::parse;

    #[test]
    fn test_vtables_in_slot_order() {
        let program = parse(
            r#"
            class Main { public static void main(String[] args) { } }
            class A {
                public int foo(int x) { return x; }
                public boolean bar() { return true; }
            }
            class B extends A {
                public boolean bar() { return false; }
                public A baz(A a, int[] b) { return a; }
            }
            class Empty { }
            "#,
        )
        .unwrap();
        let mut table = build_symbol_table(&program).unwrap();
        compute_layout(&mut table);

        let expected = "\
@.Main_vtable = global [0 x i8*] []
@.A_vtable = global [2 x i8*] [i8* bitcast (i32 (i8*, i32)* @A.foo to i8*), i8* bitcast (i1 (i8*)* @A.bar to i8*)]
@.B_vtable = global [3 x i8*] [i8* bitcast (i32 (i8*, i32)* @A.foo to i8*), i8* bitcast (i1 (i8*)* @B.bar to i8*), i8* bitcast (i8* (i8*, i8*, i8*)* @B.baz to i8*)]
@.Empty_vtable = global [0 x i8*] []
";
        assert_eq!(emit_vtables(&table), expected);
    }
}
