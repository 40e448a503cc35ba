//! Integration tests for discovery + runner + external shell
//! Tests suites laid out on disk and executed for real

use goop_lit_ast::LitError;
use goop_lit_runner::{Runner, TestOutcome, TestReporter, TestStatus};
use goop_lit_suite::{SiteConfig, SuiteDescriptor};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use tempfile::TempDir;

struct Tree {
    root: TempDir,
}

impl Tree {
    fn new() -> Self {
        let tree = Self {
            root: TempDir::new().unwrap(),
        };
        fs::create_dir_all(tree.bin()).unwrap();
        fs::create_dir_all(tree.src()).unwrap();
        tree
    }

    fn bin(&self) -> PathBuf {
        self.root.path().join("build")
    }

    fn src(&self) -> PathBuf {
        self.root.path().join("src/test")
    }

    fn tool(&self, name: &str, body: &str) {
        let path = self.bin().join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn test(&self, rel: &str, body: &str) -> PathBuf {
        let path = self.src().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, body).unwrap();
        path
    }

    fn suite(&self) -> SuiteDescriptor {
        let config = SiteConfig {
            test_source_root: Some(self.src()),
            ..SiteConfig::new(self.bin())
        };
        SuiteDescriptor::goop(&config).unwrap()
    }
}

#[derive(Default)]
struct Collect {
    lines: Vec<String>,
}

impl TestReporter for Collect {
    fn on_test_complete(&mut self, index: usize, total: usize, outcome: &TestOutcome) {
        self.lines.push(format!(
            "{}: {} ({index} of {total})",
            outcome.status.label(),
            outcome.test.display_name()
        ));
    }
}

fn status_of<'a>(outcomes: &'a [TestOutcome], name: &str) -> &'a TestOutcome {
    outcomes
        .iter()
        .find(|outcome| outcome.test.display_name() == name)
        .unwrap_or_else(|| panic!("no outcome for {name}"))
}

#[test]
fn test_discovers_only_go_and_c_files() {
    let tree = Tree::new();
    tree.tool("goop-tok", "exit 0");
    tree.tool("goop-ast", "exit 0");
    for rel in ["tokens.go", "parse.go", "lex/ident.c", "lit.site.json", "README.md", "lex/data.txt"] {
        tree.test(rel, "// RUN: true\n");
    }

    let runner = Runner::load(tree.suite()).unwrap();
    let tests = runner.discover(&[]).unwrap();
    let names: Vec<_> = tests.iter().map(|t| t.display_name()).collect();

    assert_eq!(names, vec!["lex/ident.c", "parse.go", "tokens.go"]);
}

#[test]
fn test_tokenizer_path_reaches_the_shell() {
    let tree = Tree::new();
    let log = tree.root.path().join("calls.log");
    tree.tool("goop-tok", &format!("echo \"$0 $*\" >> {}", log.display()));
    tree.tool("goop-ast", "exit 0");
    let test = tree.test("foo.go", "// RUN: %goop-tok foo.go\npackage main\n");

    let runner = Runner::load(tree.suite()).unwrap();
    let tests = runner.discover(&[test]).unwrap();
    let outcomes = runner.run(&tests, &mut Collect::default());

    assert_eq!(outcomes[0].status, TestStatus::Pass);
    let expected = format!("{} foo.go", tree.bin().join("goop-tok").display());
    assert_eq!(outcomes[0].commands, vec![expected.clone()]);
    assert_eq!(fs::read_to_string(&log).unwrap().trim(), expected);
}

#[test]
fn test_exit_code_decides_status() {
    let tree = Tree::new();
    tree.tool("goop-tok", "cat");
    tree.tool("goop-ast", "echo 'parse error' >&2; exit 1");
    tree.test("tokens.go", "// RUN: %goop-tok < %s | grep -q 'package main'\npackage main\n");
    tree.test("parse.go", "// RUN: %goop-ast < %s\npackage main\n");
    tree.test("expected.go", "// XFAIL: *\n// RUN: %goop-ast < %s\n");

    let runner = Runner::load(tree.suite()).unwrap();
    let tests = runner.discover(&[]).unwrap();
    let mut reporter = Collect::default();
    let outcomes = runner.run(&tests, &mut reporter);

    assert_eq!(status_of(&outcomes, "tokens.go").status, TestStatus::Pass);
    assert_eq!(status_of(&outcomes, "expected.go").status, TestStatus::XFail);

    let parse = status_of(&outcomes, "parse.go");
    assert_eq!(parse.status, TestStatus::Fail);
    let exit = parse.exit.as_ref().unwrap();
    assert_eq!(exit.code, Some(1));
    assert!(exit.stderr.contains("parse error"));

    assert_eq!(
        reporter.lines,
        vec![
            "XFAIL: expected.go (1 of 3)",
            "FAIL: parse.go (2 of 3)",
            "PASS: tokens.go (3 of 3)",
        ]
    );
}

#[test]
fn test_temp_paths_live_under_exec_root() {
    let tree = Tree::new();
    tree.tool("goop-tok", "cat");
    tree.tool("goop-ast", "exit 0");
    tree.test(
        "lex/keywords.go",
        "// RUN: %goop-tok < %s > %t\n// RUN: grep -q func %t\n// RUN: test -d %T\nfunc f() {}\n",
    );

    let runner = Runner::load(tree.suite()).unwrap();
    let tests = runner.discover(&[]).unwrap();
    let outcomes = runner.run(&tests, &mut Collect::default());

    assert_eq!(outcomes[0].status, TestStatus::Pass, "{:?}", outcomes[0].exit);
    let output_dir = tree.bin().join("test/lex/Output");
    assert!(output_dir.join("keywords.go.tmp").is_file());
    assert!(output_dir.join("keywords.go.script").is_file());
}

#[test]
fn test_missing_tool_fails_before_any_test_runs() {
    let tree = Tree::new();
    tree.tool("goop-tok", "exit 0");
    tree.test("a.go", "// RUN: %goop-ast < %s\n");

    let err = Runner::load(tree.suite()).err().unwrap();
    match err {
        LitError::MissingTool { token, path } => {
            assert_eq!(token, "%goop-ast");
            assert_eq!(path, tree.bin().join("goop-ast"));
        }
        other => panic!("Expected MissingTool error, got {other:?}"),
    }
    assert!(!tree.bin().join("test").exists());
}

#[test]
fn test_pipefail_with_default_shell() {
    let tree = Tree::new();
    tree.tool("goop-tok", "cat");
    tree.tool("goop-ast", "exit 0");
    tree.test("ok.go", "// RUN: true\n");
    tree.test("pipe.go", "// RUN: false | true\n");

    let config = SiteConfig {
        test_source_root: Some(tree.src()),
        pipefail: true,
        ..SiteConfig::new(tree.bin())
    };
    let runner = Runner::load(SuiteDescriptor::goop(&config).unwrap()).unwrap();
    let tests = runner.discover(&[]).unwrap();
    let outcomes = runner.run(&tests, &mut Collect::default());

    let ok = status_of(&outcomes, "ok.go");
    assert_eq!(ok.status, TestStatus::Pass, "{:?}", ok.exit);
    assert_eq!(status_of(&outcomes, "pipe.go").status, TestStatus::Fail);
}
