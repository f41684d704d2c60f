//! End-to-end tests driving the built `decaf` binary (§6), the way the
//! teacher's own CLI crate is exercised — spawn the real executable
//! against a scratch directory rather than calling internal functions.

use std::path::Path;
use std::process::Command;

fn decaf_bin() -> &'static str {
    env!("CARGO_BIN_EXE_decaf")
}

fn write_source(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn missing_argument_prints_usage_and_exits_zero() {
    let output = Command::new(decaf_bin()).output().unwrap();
    assert!(output.status.success(), "exit code must be 0 (§6, §9)");
    assert!(!output.stdout.is_empty());
}

#[test]
fn compiles_a_simple_class_and_writes_an_ami_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = indoc::indoc! {"
        class Point {
            int x;
            int y;

            Point(int x, int y) {
                this.x = x;
                this.y = y;
            }

            int getX() {
                return this.x;
            }
        }
    "};
    let source_path = write_source(dir.path(), "point.decaf", source);

    let output = Command::new(decaf_bin())
        .arg(&source_path)
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let ami_path = dir.path().join("point.ami");
    let ami = std::fs::read_to_string(&ami_path).unwrap();
    assert!(ami.contains("C_"));
    assert!(ami.contains("M_getX_"));
    assert!(ami.trim_end().ends_with(char::is_numeric));
    assert!(ami.contains(".static_data 0"));
}

#[test]
fn type_error_exits_one_and_writes_no_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = indoc::indoc! {"
        class A {
            boolean f() {
                return 1;
            }
        }
    "};
    let source_path = write_source(dir.path(), "bad.decaf", source);

    let output = Command::new(decaf_bin())
        .arg(&source_path)
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(!dir.path().join("bad.ami").exists());
    assert!(!output.stderr.is_empty());
}

#[test]
fn unreadable_source_path_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist.decaf");

    let output = Command::new(decaf_bin())
        .arg(&missing)
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn codegen_is_deterministic_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let source = indoc::indoc! {"
        class Counter {
            static int total;

            static void bump() {
                Counter.total = Counter.total + 1;
            }
        }
    "};
    let source_path = write_source(dir.path(), "counter.decaf", source);

    let run = || {
        let output = Command::new(decaf_bin())
            .arg(&source_path)
            .current_dir(dir.path())
            .output()
            .unwrap();
        assert!(output.status.success());
        std::fs::read_to_string(dir.path().join("counter.ami")).unwrap()
    };

    let first = run();
    let second = run();
    assert_eq!(first, second, "Testable Property 5: code-gen determinism");
}
