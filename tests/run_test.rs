extern crate tinyc;

use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use tinyc::{run, ErrorKind, Expected, Variables};

fn vars(source: &str) -> Variables {
    match run(source) {
        Ok(vars) => vars,
        Err(e) => panic!("{source:?} failed to compile: {e}"),
    }
}

fn output(source: &str) -> String {
    vars(source).to_string()
}

#[test]
fn test_sample_programs() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/programs");
    let mut count = 0;

    for entry in fs::read_dir(&dir).unwrap() {
        let path = entry.unwrap().path();
        if path.extension() != Some(OsStr::new("tc")) {
            continue;
        }

        let program = fs::read_to_string(&path).unwrap();
        let expected = fs::read_to_string(path.with_extension("out")).unwrap();
        assert_eq!(
            output(&program).trim_end(),
            expected.trim_end(),
            "sample program {} printed the wrong variables",
            path.display()
        );
        count += 1;
    }

    assert!(count > 0, "no sample programs found in {}", dir.display());
}

#[test]
fn test_chained_assignment_yields_comparison() {
    assert_eq!(output("a=b=c=2<3;"), "a = 1\nb = 1\nc = 1\n");
}

#[test]
fn test_while_stops_when_condition_first_fails() {
    assert_eq!(output("{ i=1; while (i<100) i=i+i; }"), "i = 128\n");
    assert_eq!(output("{ i=200; while (i<100) i=i+i; }"), "i = 200\n");
}

#[test]
fn test_do_while_runs_body_once() {
    assert_eq!(output("{ i=1; do i=i+10; while (i<50); }"), "i = 51\n");
    assert_eq!(output("{ i=99; do i=i+10; while (i<50); }"), "i = 109\n");
}

#[test]
fn test_condition_side_effects() {
    assert_eq!(output("{ i=1; while ((i=i+10)<50) ; }"), "i = 51\n");
}

#[test]
fn test_if_else() {
    assert_eq!(
        output("{ i=7; if (i<5) x=1; if (i<10) y=2; }"),
        "i = 7\ny = 2\n"
    );
    assert_eq!(
        output("{ i=125; j=100; while (i-j) if (i<j) j=j-i; else i=i-j; }"),
        "i = 25\nj = 25\n"
    );
    // The else belongs to the inner if.
    assert_eq!(output("{ a=1; if (a) if (b) x=1; else y=1; }"), "a = 1\ny = 1\n");
    assert_eq!(output("{ if (a) if (b) x=1; else y=1; }"), "");
}

#[test]
fn test_negative_results() {
    let result = vars("{ a=3-10; b=0-a; c=a<b; }");
    assert_eq!(result.by_name('a'), Some(-7));
    assert_eq!(result.by_name('b'), Some(7));
    assert_eq!(result.by_name('c'), Some(1));
    assert_eq!(result.to_string(), "a = -7\nb = 7\nc = 1\n");
}

#[test]
fn test_unassigned_variables_are_not_reported() {
    let result = vars("{ x=y+z; q=1; q=q-1; }");
    assert_eq!(result.nonzero().count(), 0);
    assert_eq!(result.to_string(), "");
}

#[test]
fn test_runs_are_independent() {
    let program = "{ n=10; s=0; while (0<n) { s=s+n; n=n-1; } }";
    let first = vars(program);
    let second = vars(program);
    assert_eq!(first, second);
    assert_eq!(first.by_name('s'), Some(55));
}

#[test]
fn test_reused_machine_starts_from_zero() {
    let chunk = tinyc::compile("a=a+1;").unwrap();
    let mut vm = tinyc::VM::new();
    assert_eq!(vm.run(&chunk).by_name('a'), Some(1));
    assert_eq!(vm.run(&chunk).by_name('a'), Some(1));
}

#[test]
fn test_deep_nesting_is_a_parse_error() {
    let source = format!("a={}1{};", "(".repeat(50_000), ")".repeat(50_000));
    let err = run(&source).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[test]
fn test_compile_errors_abort_before_running() {
    let err = run("{ a=1; b=2 }").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert_eq!(err.to_string(), "expected ';', found '}'");

    let err = run("{ a=1; print(a); }").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lex);

    let err = run("(a;").unwrap_err();
    match err {
        tinyc::CompileError::Parse {
            expected, found, ..
        } => {
            assert_eq!(expected, Expected::Token(tinyc::lex::TokenType::RightParen));
            assert_eq!(found, "';'");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_diagnostic_carries_source() {
    use miette::Diagnostic;

    let err = run("a = 1 +;").unwrap_err();
    assert_eq!(err.to_string(), "expected an expression, found ';'");
    assert!(err.source_code().is_some());
    let label = err.labels().unwrap().next().unwrap();
    assert_eq!(label.offset(), 7);
}
