//! End-to-end tests over the fixture programs in `tests/programs`.

use mj_core::syntax::ast::BinOp;
use mj_core::{analyze_program, CompileError, Compiler, Construct, OverrideMismatch, SemanticError};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/programs")
        .join(name)
}

fn compile(name: &str) -> String {
    let mut compiler = Compiler::new();
    match compiler.compile_file(fixture(name)) {
        Ok(ir) => ir,
        Err(err) => panic!("{}", compiler.render_error(&err)),
    }
}

fn compile_err(name: &str) -> CompileError {
    Compiler::new()
        .compile_file(fixture(name))
        .expect_err("program should be rejected")
}

/// Text of the function defined with `header`, up to its closing brace.
fn function<'a>(module: &'a str, header: &str) -> &'a str {
    let start = module
        .find(header)
        .unwrap_or_else(|| panic!("no function `{header}` in module"));
    let end = module[start..].find("\n}\n").unwrap();
    &module[start..start + end + 3]
}

/// Text between two labels of one function.
fn block<'a>(function: &'a str, from: &str, to: &str) -> &'a str {
    let start = function.find(&format!("{from}:\n")).unwrap();
    let end = function.find(&format!("{to}:\n")).unwrap();
    &function[start..end]
}

#[test]
fn test_factorial_golden() {
    let ir = compile("Factorial.java");

    assert!(ir.contains(
        "@.Fac_vtable = global [1 x i8*] [i8* bitcast (i32 (i8*, i32)* @Fac.ComputeFac to i8*)]\n"
    ));
    assert!(ir.contains("@.Factorial_vtable = global [0 x i8*] []\n"));

    let expected = "\
define i32 @Fac.ComputeFac(i8* %this, i32 %.num) {
    %num = alloca i32
    store i32 %.num, i32* %num
    %num_aux = alloca i32
    %_0 = load i32, i32* %num
    %_1 = icmp slt i32 %_0, 1
    br i1 %_1, label %if.then.0, label %if.else.0
if.then.0:
    store i32 1, i32* %num_aux
    br label %if.end.0
if.else.0:
    %_2 = load i32, i32* %num
    %_3 = load i32, i32* %num
    %_4 = sub i32 %_3, 1
    %_5 = bitcast i8* %this to i8***
    %_6 = load i8**, i8*** %_5
    %_7 = getelementptr i8*, i8** %_6, i32 0
    %_8 = load i8*, i8** %_7
    %_9 = bitcast i8* %_8 to i32 (i8*, i32)*
    %_10 = call i32 %_9(i8* %this, i32 %_4)
    %_11 = mul i32 %_2, %_10
    store i32 %_11, i32* %num_aux
    br label %if.end.0
if.end.0:
    %_12 = load i32, i32* %num_aux
    ret i32 %_12
}
";
    assert_eq!(function(&ir, "define i32 @Fac.ComputeFac"), expected);

    let expected_main = "\
define i32 @main() {
    %_0 = call i8* @calloc(i32 1, i32 8)
    %_1 = bitcast i8* %_0 to i8***
    %_2 = getelementptr [1 x i8*], [1 x i8*]* @.Fac_vtable, i32 0, i32 0
    store i8** %_2, i8*** %_1
    %_3 = bitcast i8* %_0 to i8***
    %_4 = load i8**, i8*** %_3
    %_5 = getelementptr i8*, i8** %_4, i32 0
    %_6 = load i8*, i8** %_5
    %_7 = bitcast i8* %_6 to i32 (i8*, i32)*
    %_8 = call i32 %_7(i8* %_0, i32 10)
    call void @print_int(i32 %_8)
    ret i32 0
}
";
    assert_eq!(function(&ir, "define i32 @main()"), expected_main);
}

#[test]
fn test_subclass_layout_extends_parent() {
    let program = Compiler::new().load_file(fixture("Shapes.java")).unwrap();
    let table = analyze_program(&program).unwrap();

    for (id, class) in table.user_classes() {
        let Some(parent_id) = class.parent else {
            continue;
        };
        let parent = table.class(parent_id);

        if let Some(first) = class.fields.values().next() {
            assert_eq!(first.offset, parent.field_size, "{}", class.name);
        }
        for name in parent.fields.keys() {
            let (_, inherited) = table.resolve_field(id, name).unwrap();
            assert_eq!(inherited.offset, parent.fields[name].offset);
        }
        for (slot, entry) in parent.dispatch.iter().enumerate() {
            assert_eq!(class.dispatch[slot].method, entry.method);
        }
        assert_eq!(class.dispatch.len() as u32, class.slot_count);

        for (name, method) in &class.methods {
            if let Some((_, overridden)) = table.resolve_inherited_method(parent_id, name) {
                assert_eq!(method.slot, overridden.slot, "{}.{}", class.name, name);
            }
        }
    }
}

#[test]
fn test_object_allocation_size_and_header() {
    let ir = compile("Shapes.java");
    let main = function(&ir, "define i32 @main()");

    // Shape: int + boolean = 5 bytes; Square adds int[] (8), Circle adds a
    // reference and a boolean (9).
    assert!(main.contains("call i8* @calloc(i32 1, i32 21)"));
    assert!(main.contains("call i8* @calloc(i32 1, i32 22)"));
    assert!(main.contains("getelementptr [3 x i8*], [3 x i8*]* @.Square_vtable, i32 0, i32 0"));
    assert!(main.contains("getelementptr [4 x i8*], [4 x i8*]* @.Circle_vtable, i32 0, i32 0"));

    assert!(ir.contains(
        "@.Square_vtable = global [3 x i8*] [\
         i8* bitcast (i32 (i8*, i32)* @Shape.init to i8*), \
         i8* bitcast (i32 (i8*)* @Square.area to i8*), \
         i8* bitcast (i32 (i8*, i8*)* @Shape.describe to i8*)]"
    ));
    assert!(ir.contains("i8* bitcast (i32 (i8*)* @Circle.radius to i8*)]"));
}

#[test]
fn test_inherited_field_access_uses_static_offset() {
    let ir = compile("Shapes.java");
    let area = function(&ir, "define i32 @Square.area(i8* %this)");
    assert_eq!(area.matches("getelementptr i8, i8* %this, i32 8").count(), 2);

    let init = function(&ir, "define i32 @Shape.init(i8* %this, i32 %.n)");
    assert!(init.contains("getelementptr i8, i8* %this, i32 12\n"));
    assert!(init.contains("store i1 true, i1* %_"));
}

#[test]
fn test_and_short_circuits() {
    let ir = compile("ShortCircuit.java");
    let main = function(&ir, "define i32 @main()");

    assert!(main.contains("label %and.rhs.1, label %and.end.1"));
    let lhs = &main[..main.find("and.clause.1:\n").unwrap()];
    let rhs = block(main, "and.rhs.1", "and.rhs.end.1");

    // `no` is slot 0 and runs unconditionally; `loud` is slot 1 and only
    // runs once the left operand was true.
    assert!(lhs.contains("getelementptr i8*, i8** %_5, i32 0"));
    assert!(!lhs.contains("i32 1\n"));
    assert!(rhs.contains(", i32 1\n"));
    assert!(rhs.contains("call i1 %_"));
    assert!(main.contains("phi i1 [ false, %and.clause.1 ], [ %_"));
}

#[test]
fn test_every_array_access_is_guarded() {
    let ir = compile("ArrayBounds.java");
    let main = function(&ir, "define i32 @main()");

    // Two allocations plus five element accesses.
    assert_eq!(main.matches("call void @throw_out_of_bounds()").count(), 7);
    assert_eq!(main.matches("icmp slt i32 5, %_").count(), 1);
    assert!(main.contains("icmp slt i32 4, %_"));
    assert!(main.contains("trunc i32"));
    assert!(main.contains("zext i1"));
}

#[test]
fn test_negative_length_checked_before_allocation() {
    let ir = compile("NegativeLength.java");
    let main = function(&ir, "define i32 @main()");

    let check = main.find("icmp sge i32 %_0, 0").unwrap();
    let guard = main.find("call void @throw_out_of_bounds()").unwrap();
    let alloc = main.find("call i8* @calloc").unwrap();
    assert!(check < guard && guard < alloc);
    assert!(main.contains("%_0 = sub i32 0, 1\n"));
}

#[test]
fn test_bad_override_rejected_at_table_build() {
    match compile_err("BadOverride.java") {
        CompileError::Semantic(SemanticError::IncompatibleOverride {
            class,
            ancestor,
            reason,
            ..
        }) => {
            assert_eq!(class, "Sub");
            assert_eq!(ancestor, "Base");
            assert_eq!(reason, OverrideMismatch::ReturnType);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_type_error_reported_with_location() {
    let mut compiler = Compiler::new();
    let err = compiler.compile_file(fixture("TypeError.java")).unwrap_err();
    assert!(matches!(
        err,
        CompileError::Semantic(SemanticError::TypeMismatch {
            construct: Construct::Operator(BinOp::Add),
            ..
        })
    ));

    let rendered = compiler.render_error(&err);
    assert!(rendered.starts_with("error[type-mismatch]: "));
    assert!(rendered.contains("TypeError.java:4:13"));
}

#[test]
fn test_identifiers_never_name_blocks() {
    let ir = compile("LabelNames.java");
    let run = function(&ir, "define i32 @Blocks.run(i8* %this, i32 %.loop_body_1)");

    assert!(run.contains("%loop_body_1 = alloca i32\n"));
    assert!(run.contains("%if_then_0 = alloca i32\n"));
    assert!(run.contains("loop.body.1:\n"));
    for line in run.lines().filter(|line| line.ends_with(':')) {
        let label = line.trim_end_matches(':');
        assert!(label.contains('.'), "label {label} could clash with a variable");
        assert!(!run.contains(&format!("%{label} = alloca")));
    }
}

/// Feed a module to `llvm-as`. Returns `None` when the tool is not installed.
fn assemble(ir: &str) -> Option<Result<(), String>> {
    let mut child = Command::new("llvm-as")
        .args(["-o", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .ok()?;
    child.stdin.take()?.write_all(ir.as_bytes()).ok()?;
    let output = child.wait_with_output().ok()?;
    Some(if output.status.success() {
        Ok(())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).into_owned())
    })
}

#[test]
fn test_fixtures_assemble() {
    let fixtures = [
        "Factorial.java",
        "Shapes.java",
        "ShortCircuit.java",
        "ArrayBounds.java",
        "NegativeLength.java",
        "LabelNames.java",
    ];
    for name in fixtures {
        let ir = compile(name);
        match assemble(&ir) {
            None => {
                eprintln!("llvm-as not found, skipping assembly check");
                return;
            }
            Some(Err(stderr)) => panic!("{name} does not assemble:\n{stderr}"),
            Some(Ok(())) => {}
        }
    }
}
