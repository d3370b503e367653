//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Async code in `chat-core` and `chat-term` MUST NOT use blocking
//! I/O. The REPL, the printer and the stream reader share one current-thread
//! runtime, so a blocking call stalls all of them.
//! **Required**: `tokio::fs`, `tokio::io`, async `reqwest`.
//! **Acceptable**: non-async functions (config loading before the runtime
//! starts) and test code.

use architectural_enforcement::{production_sources, FnKind, SourceFile};

const BLOCKING_PATTERNS: &[(&str, &str)] = &[
    ("std::fs::", "Blocking file I/O"),
    ("use std::fs", "Blocking file I/O"),
    ("std::net::", "Blocking network I/O"),
    ("std::process::Command", "Blocking process I/O"),
    ("reqwest::blocking", "Blocking HTTP client"),
];

const STDIO_PATTERNS: &[&str] = &["std::io::stdin()", "std::io::stdout()", "std::io::Read", "std::io::Write"];

#[test]
fn test_no_blocking_io_in_async_code() {
    let violations: Vec<String> = production_sources()
        .iter()
        .flat_map(find_violations)
        .collect();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Blocking I/O found in async code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ REQUIRED async I/O:");
        eprintln!("  - tokio::fs::read().await, tokio::fs::write().await");
        eprintln!("  - tokio::io::stdin(), tokio::io::stdout() with AsyncBufReadExt/AsyncWriteExt");
        eprintln!("  - reqwest::Client (async)");
        eprintln!("\n✅ ACCEPTABLE blocking I/O:");
        eprintln!("  - Non-async functions (before the runtime starts)");
        eprintln!("  - Test code");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.",
            violations.len()
        );
    }
}

#[test]
fn test_production_sources_are_found() {
    let sources = production_sources();
    assert!(
        sources.iter().any(|f| f.path.ends_with("coordinator.rs")),
        "scanner did not find chat-core sources"
    );
    assert!(
        sources.iter().any(|f| f.path.ends_with("main.rs")),
        "scanner did not find chat-term sources"
    );
}

fn find_violations(file: &SourceFile) -> Vec<String> {
    let mut violations = Vec::new();

    for (line_number, code) in file.production_lines() {
        let context = file.enclosing_fn(line_number - 1);
        let in_sync_fn = context == Some(FnKind::Sync);

        for (pattern, what) in BLOCKING_PATTERNS {
            if code.contains(pattern) && !in_sync_fn {
                violations.push(file.violation(line_number, what));
            }
        }

        if context == Some(FnKind::Async) && STDIO_PATTERNS.iter().any(|p| code.contains(p)) {
            violations.push(file.violation(line_number, "Blocking stdio in async"));
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_read_in_async_fn_is_flagged() {
        let file = SourceFile::from_text(
            "bad.rs",
            "pub async fn load() {\n    let s = std::fs::read_to_string(\"f\");\n}\n",
        );
        let violations = find_violations(&file);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].starts_with("bad.rs:2 - Blocking file I/O"));
    }

    #[test]
    fn test_blocking_read_in_sync_fn_is_allowed() {
        let file = SourceFile::from_text(
            "config.rs",
            "fn read_config_file(path: &Path) {\n    std::fs::read_to_string(path);\n}\n",
        );
        assert!(find_violations(&file).is_empty());
    }

    #[test]
    fn test_module_level_import_is_flagged() {
        let file = SourceFile::from_text("bad.rs", "use std::fs;\n\nfn a() {}\n");
        assert_eq!(find_violations(&file).len(), 1);
    }

    #[test]
    fn test_test_module_is_skipped() {
        let file = SourceFile::from_text(
            "ok.rs",
            "fn a() {}\n#[cfg(test)]\nmod tests {\n    #[tokio::test]\n    async fn t() {\n        std::fs::write(\"x\", \"y\");\n    }\n}\n",
        );
        assert!(find_violations(&file).is_empty());
    }

    #[test]
    fn test_tokio_stdout_is_not_blocking() {
        let file = SourceFile::from_text(
            "ok.rs",
            "async fn run() {\n    let out = tokio::io::stdout();\n}\n",
        );
        assert!(find_violations(&file).is_empty());
    }
}
