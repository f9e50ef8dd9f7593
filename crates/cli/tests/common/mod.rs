//! Helpers for running the `arbor` binary against a scratch repository

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A scratch directory initialized with `arbor init`
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let repo = Self { dir };
        repo.run(&["init"]).assert_success();
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Run `arbor` with `args` from the repository root
    pub fn run(&self, args: &[&str]) -> CommandResult {
        run_in(self.path(), args)
    }
}

pub fn run_in(dir: &Path, args: &[&str]) -> CommandResult {
    let output = Command::new(arbor_binary())
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("spawn arbor");
    CommandResult {
        args: args.iter().map(|s| s.to_string()).collect(),
        output,
    }
}

fn arbor_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_arbor"))
}

pub struct CommandResult {
    args: Vec<String>,
    output: Output,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.output.status.success()
    }

    /// Stdout with color codes removed
    pub fn stdout(&self) -> String {
        strip_ansi(&String::from_utf8_lossy(&self.output.stdout))
    }

    pub fn stderr(&self) -> String {
        strip_ansi(&String::from_utf8_lossy(&self.output.stderr))
    }

    pub fn assert_success(&self) -> &Self {
        assert!(
            self.success(),
            "arbor {:?} failed\nstdout:\n{}\nstderr:\n{}",
            self.args,
            self.stdout(),
            self.stderr()
        );
        self
    }

    pub fn assert_failure(&self) -> &Self {
        assert!(
            !self.success(),
            "arbor {:?} unexpectedly succeeded\nstdout:\n{}",
            self.args,
            self.stdout()
        );
        self
    }

    pub fn assert_stdout_contains(&self, needle: &str) -> &Self {
        let stdout = self.stdout();
        assert!(stdout.contains(needle), "expected {:?} in stdout:\n{}", needle, stdout);
        self
    }

    pub fn assert_stderr_contains(&self, needle: &str) -> &Self {
        let stderr = self.stderr();
        assert!(stderr.contains(needle), "expected {:?} in stderr:\n{}", needle, stderr);
        self
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout()).expect("stdout is JSON")
    }
}

fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for code in chars.by_ref() {
                if code.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}
