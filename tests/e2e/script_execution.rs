//! E2E tests for running test files
//! Tests the goop-lit binary against small Goop test trees

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

const CLI_BINARY: &str = env!("CARGO_BIN_EXE_goop-lit");

struct Project {
    dir: TempDir,
}

impl Project {
    fn new() -> Self {
        let project = Self {
            dir: TempDir::new().unwrap(),
        };
        fs::create_dir_all(project.src()).unwrap();
        project.tool("goop-tok", "cat");
        project.tool("goop-ast", "cat");
        project
    }

    fn bin(&self) -> PathBuf {
        self.dir.path().join("build")
    }

    fn src(&self) -> PathBuf {
        self.dir.path().join("src/test")
    }

    fn tool(&self, name: &str, body: &str) {
        fs::create_dir_all(self.bin()).unwrap();
        let path = self.bin().join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn test(&self, rel: &str, body: &str) {
        let path = self.src().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    fn run(&self, extra: &[&str]) -> std::process::Output {
        let bin = self.bin();
        let src = self.src();
        let mut args = vec![
            "--bin-root",
            bin.to_str().unwrap(),
            "--source-root",
            src.to_str().unwrap(),
        ];
        args.extend_from_slice(extra);
        Command::new(CLI_BINARY)
            .args(&args)
            .current_dir(self.dir.path())
            .output()
            .unwrap()
    }
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_tokenizer_invocation_end_to_end() {
    let project = Project::new();
    let log = project.dir.path().join("calls.log");
    project.tool("goop-tok", &format!("echo \"$0 $*\" >> {}", log.display()));
    project.test("foo.go", "// RUN: %goop-tok foo.go\npackage main\n");

    let output = project.run(&[]);

    assert!(output.status.success(), "{}", stdout(&output));
    assert!(stdout(&output).contains("PASS: Goop Tests :: foo.go (1 of 1)"));
    let calls = fs::read_to_string(&log).unwrap();
    assert_eq!(
        calls.trim(),
        format!("{} foo.go", project.bin().join("goop-tok").display())
    );
}

#[test]
fn test_failing_tool_fails_the_run() {
    let project = Project::new();
    project.tool("goop-ast", "echo 'unexpected token' >&2; exit 1");
    project.test("parse.go", "// RUN: %goop-ast < %s\npackage main\n");
    project.test("tokens.go", "// RUN: %goop-tok < %s | grep -q package\npackage main\n");

    let output = project.run(&[]);

    assert_eq!(output.status.code(), Some(1));
    let text = stdout(&output);
    assert!(text.contains("-- Testing: 2 tests --"));
    assert!(text.contains("FAIL: Goop Tests :: parse.go (1 of 2)"));
    assert!(text.contains("PASS: Goop Tests :: tokens.go (2 of 2)"));
    assert!(text.contains("  Passed: 1"));
    assert!(text.contains("  Failed: 1"));
}

#[test]
fn test_verbose_shows_substituted_script() {
    let project = Project::new();
    project.tool("goop-ast", "echo 'unexpected token' >&2; exit 3");
    project.test("parse.go", "// RUN: %goop-ast < %s\npackage main\n");

    let output = project.run(&["-v"]);

    let text = stdout(&output);
    let expected_command = format!(
        "{} < {}",
        project.bin().join("goop-ast").display(),
        project.src().join("parse.go").display()
    );
    assert!(text.contains(&expected_command), "{text}");
    assert!(text.contains("Exit Code: 3"));
    assert!(text.contains("unexpected token"));
}

#[test]
fn test_non_test_files_are_ignored() {
    let project = Project::new();
    project.test("a.go", "// RUN: true\n");
    project.test("b.c", "// RUN: true\n");
    project.test("notes.txt", "// RUN: false\n");
    project.test("Makefile", "// RUN: false\n");

    let output = project.run(&[]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("-- Testing: 2 tests --"));
    assert!(!text.contains("notes.txt"));
}

#[test]
fn test_single_file_argument() {
    let project = Project::new();
    project.test("a.go", "// RUN: true\n");
    project.test("b.go", "// RUN: false\n");

    let path = project.src().join("a.go");
    let output = project.run(&[path.to_str().unwrap()]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("PASS: Goop Tests :: a.go (1 of 1)"));
}

#[test]
fn test_unresolved_without_run_line() {
    let project = Project::new();
    project.test("empty.go", "package main\n");

    let output = project.run(&["-q"]);

    assert_eq!(output.status.code(), Some(1));
    let text = stdout(&output);
    assert!(text.contains("UNRESOLVED: Goop Tests :: empty.go (1 of 1)"));
    assert!(!text.contains("-- Testing"));
}

#[test]
fn test_pipe_and_redirection_use_real_shell() {
    let project = Project::new();
    project.test(
        "lex/pipes.go",
        "// RUN: %goop-tok < %s > %t && grep -c RUN %t | grep -q 1\npackage main\n",
    );

    let output = project.run(&[]);

    assert!(output.status.success(), "{}", stdout(&output));
    assert!(project.bin().join("test/lex/Output/pipes.go.tmp").is_file());
}
