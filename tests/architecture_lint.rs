//! Architecture enforcement tests.
//!
//! The repository abstraction is only backend-independent if nothing
//! outside the backends reaches git directly. These tests scan the source
//! tree so a violation fails CI instead of slipping into review.
//!
//! # Rules
//!
//! 1. **git2 containment** - only `src/git/libgit2.rs` names the `git2` crate
//! 2. **Process containment** - only `src/git/cli.rs` spawns processes
//! 3. **Backend opacity** - the CLI layer never names a concrete backend
//! 4. **No panics in library code** - no `unwrap()`/`expect()` outside tests

use std::fs;
use std::path::{Path, PathBuf};

/// Every `.rs` file under `dir`, recursively.
fn rust_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).expect("Failed to read source directory") {
        let path = entry.expect("Failed to read entry").path();
        if path.is_dir() {
            files.extend(rust_files(&path));
        } else if path.extension().map(|e| e == "rs").unwrap_or(false) {
            files.push(path);
        }
    }
    files.sort();
    files
}

/// Source lines before the unit test module, without comments.
fn production_lines(path: &Path) -> Vec<(usize, String)> {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|_| panic!("Failed to read {}", path.display()));

    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| line.trim() != "#[cfg(test)]")
        .filter(|(_, line)| !line.trim_start().starts_with("//"))
        .map(|(i, line)| (i + 1, line.to_string()))
        .collect()
}

fn relative(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Collect `file:line` for every production line matching `pattern`,
/// skipping the allowed files.
fn find_violations(pattern: &[&str], allowed: &[&str]) -> Vec<String> {
    let mut violations = Vec::new();
    for path in rust_files(Path::new("src")) {
        let name = relative(&path);
        if allowed.contains(&name.as_str()) {
            continue;
        }
        for (number, line) in production_lines(&path) {
            if pattern.iter().any(|p| line.contains(p)) {
                violations.push(format!("{}:{}: {}", name, number, line.trim()));
            }
        }
    }
    violations
}

/// Whether `line` paths into the `git2` crate (not `libgit2::`).
fn uses_git2_crate(line: &str) -> bool {
    line.match_indices("git2::").any(|(at, _)| {
        line[..at]
            .chars()
            .next_back()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_'))
    })
}

#[test]
fn only_libgit2_backend_uses_git2() {
    let mut violations = Vec::new();
    for path in rust_files(Path::new("src")) {
        let name = relative(&path);
        if name == "src/git/libgit2.rs" {
            continue;
        }
        for (number, line) in production_lines(&path) {
            if uses_git2_crate(&line) {
                violations.push(format!("{}:{}: {}", name, number, line.trim()));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "git2 used outside the libgit2 backend:\n  {}",
        violations.join("\n  ")
    );
}

#[test]
fn only_cli_backend_spawns_processes() {
    let violations = find_violations(
        &["std::process::Command", "process::Command", "Command::new("],
        &["src/git/cli.rs"],
    );

    assert!(
        violations.is_empty(),
        "processes spawned outside the cli backend:\n  {}",
        violations.join("\n  ")
    );
}

#[test]
fn cli_layer_never_names_a_backend() {
    let mut violations = Vec::new();
    for path in rust_files(Path::new("src/cli")) {
        for (number, line) in production_lines(&path) {
            for name in ["Git2Backend", "CliBackend", "MockBackend", "create_backend"] {
                if line.contains(name) {
                    violations.push(format!("{}:{}: {}", relative(&path), number, name));
                }
            }
        }
    }

    assert!(
        violations.is_empty(),
        "CLI code must go through Repository:\n  {}",
        violations.join("\n  ")
    );
}

#[test]
fn library_code_does_not_panic_on_errors() {
    let violations = find_violations(&[".unwrap()", ".expect("], &[]);

    assert!(
        violations.is_empty(),
        "unwrap/expect in non-test code:\n  {}",
        violations.join("\n  ")
    );
}

#[test]
fn git2_detection() {
    assert!(uses_git2_crate("use git2::Oid;"));
    assert!(uses_git2_crate("let r = git2::Repository::open(p);"));
    assert!(!uses_git2_crate("pub use libgit2::Git2Backend;"));
}

#[test]
fn every_backend_file_exists() {
    for file in [
        "src/git/backend.rs",
        "src/git/libgit2.rs",
        "src/git/cli.rs",
        "src/git/mock.rs",
        "src/git/repository.rs",
    ] {
        assert!(Path::new(file).exists(), "{} is missing", file);
    }
}
