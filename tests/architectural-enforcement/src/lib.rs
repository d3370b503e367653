//! Architectural Enforcement
//!
//! Source scanners used by the integration tests in this package to enforce
//! the workspace's structural rules:
//! - No blocking I/O inside async code
//! - No sleeping in production code
//! - `chat-core` stays free of terminal and CLI dependencies
//!
//! The scanners are line-based. They skip comments and everything from the
//! first `#[cfg(test)]` onward, since test modules sit at the bottom of each
//! file in this workspace.

use std::fs;
use std::path::{Path, PathBuf};

/// Source directories holding production code, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["chat/core/src", "chat/term/src"];

/// Workspace root (two levels above this package)
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// A loaded source file
#[derive(Debug)]
pub struct SourceFile {
    /// Path as found on disk
    pub path: PathBuf,
    /// File content split into lines
    pub lines: Vec<String>,
}

impl SourceFile {
    /// Build from in-memory text (detector tests)
    #[must_use]
    pub fn from_text(path: impl Into<PathBuf>, text: &str) -> Self {
        Self {
            path: path.into(),
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    /// Production lines as `(line_number, code_without_comment)`
    #[must_use]
    pub fn production_lines(&self) -> Vec<(usize, &str)> {
        let mut out = Vec::new();
        for (idx, line) in self.lines.iter().enumerate() {
            let trimmed = line.trim_start();
            if trimmed.starts_with("#[cfg(test)]") {
                break;
            }
            if trimmed.starts_with("//") {
                continue;
            }
            let code = line.split("//").next().unwrap_or(line);
            out.push((idx + 1, code));
        }
        out
    }

    /// Kind of the function enclosing a zero-based line index
    #[must_use]
    pub fn enclosing_fn(&self, idx: usize) -> Option<FnKind> {
        for line in self.lines.iter().take(idx + 1).rev() {
            let trimmed = line.trim_start();
            if let Some(kind) = fn_kind(trimmed) {
                return Some(kind);
            }
            if is_item_boundary(trimmed) {
                return None;
            }
        }
        None
    }

    /// Render a violation line
    #[must_use]
    pub fn violation(&self, line_number: usize, what: &str) -> String {
        let text = self
            .lines
            .get(line_number - 1)
            .map_or("", |l| l.trim());
        format!("{}:{} - {}: {}", self.path.display(), line_number, what, text)
    }
}

/// Whether a function is async
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FnKind {
    /// `async fn`
    Async,
    /// Plain `fn`
    Sync,
}

/// Detect a function signature line, with or without visibility
fn fn_kind(trimmed: &str) -> Option<FnKind> {
    let rest = strip_visibility(trimmed);
    if rest.starts_with("async fn ") {
        Some(FnKind::Async)
    } else if rest.starts_with("fn ") || rest.starts_with("const fn ") {
        Some(FnKind::Sync)
    } else {
        None
    }
}

fn strip_visibility(line: &str) -> &str {
    if let Some(rest) = line.strip_prefix("pub ") {
        return rest;
    }
    if line.starts_with("pub(") {
        if let Some(end) = line.find(')') {
            return line[end + 1..].trim_start();
        }
    }
    line
}

fn is_item_boundary(trimmed: &str) -> bool {
    let rest = strip_visibility(trimmed);
    rest.starts_with("mod ") || (rest.starts_with("impl") && trimmed.contains('{'))
}

/// Every `.rs` file under a workspace-relative directory
#[must_use]
pub fn rust_sources(dir: &str) -> Vec<SourceFile> {
    let root = workspace_root().join(dir);
    if !root.exists() {
        return Vec::new();
    }

    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .filter_map(|e| {
            let text = fs::read_to_string(e.path()).ok()?;
            Some(SourceFile::from_text(e.path(), &text))
        })
        .collect()
}

/// All production source files
#[must_use]
pub fn production_sources() -> Vec<SourceFile> {
    PRODUCTION_DIRS
        .iter()
        .flat_map(|dir| rust_sources(dir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_visibility_qualified_functions() {
        let file = SourceFile::from_text(
            "x.rs",
            "pub async fn load() {\n    body();\n}\npub(crate) fn read() {\n    body();\n}\n",
        );
        assert_eq!(file.enclosing_fn(1), Some(FnKind::Async));
        assert_eq!(file.enclosing_fn(4), Some(FnKind::Sync));
    }

    #[test]
    fn test_module_boundary_stops_search() {
        let file = SourceFile::from_text("x.rs", "fn a() {}\nmod inner {\n    use std::fs;\n}\n");
        assert_eq!(file.enclosing_fn(2), None);
    }

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let file = SourceFile::from_text(
            "x.rs",
            "fn a() {} // trailing\n// comment only\n#[cfg(test)]\nmod tests {}\n",
        );
        let lines = file.production_lines();
        assert_eq!(lines, vec![(1, "fn a() {} ")]);
    }

    #[test]
    fn test_workspace_root_contains_core() {
        assert!(workspace_root().join("chat/core/Cargo.toml").exists());
    }
}
