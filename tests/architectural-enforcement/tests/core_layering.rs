//! Integration Test: Core Layering
//!
//! **Policy**: `chat-core` holds all protocol and state logic and MUST NOT
//! depend on terminal, CLI or logging-subscriber crates. Those belong to the
//! surface (`chat-term`). The core must also never name the surface crate.

use std::fs;

use architectural_enforcement::{rust_sources, workspace_root};

const SURFACE_ONLY_CRATES: &[&str] = &[
    "clap",
    "ratatui",
    "crossterm",
    "tracing-subscriber",
    "anyhow",
];

fn dependency_names(manifest: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut in_deps = false;
    for line in manifest.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            in_deps = trimmed == "[dependencies]";
            continue;
        }
        if !in_deps || trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((name, _)) = trimmed.split_once('=') {
            names.push(name.trim().to_string());
        }
    }
    names
}

#[test]
fn test_core_has_no_surface_dependencies() {
    let manifest = fs::read_to_string(workspace_root().join("chat/core/Cargo.toml"))
        .expect("chat/core/Cargo.toml should be readable");
    let deps = dependency_names(&manifest);

    assert!(deps.iter().any(|d| d == "tokio"), "dependency scan found nothing");
    let forbidden: Vec<&String> = deps
        .iter()
        .filter(|d| SURFACE_ONLY_CRATES.contains(&d.as_str()))
        .collect();
    assert!(
        forbidden.is_empty(),
        "chat-core depends on surface-only crates: {forbidden:?}"
    );
}

#[test]
fn test_core_never_names_surface_crate() {
    let offenders: Vec<String> = rust_sources("chat/core/src")
        .iter()
        .flat_map(|file| {
            file.production_lines()
                .into_iter()
                .filter(|(_, code)| code.contains("chat_term::"))
                .map(|(n, _)| file.violation(n, "Surface crate referenced"))
                .collect::<Vec<_>>()
        })
        .collect();
    assert!(offenders.is_empty(), "{offenders:#?}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_names_reads_only_dependencies_table() {
        let manifest = "[package]\nname = \"x\"\n\n[dependencies]\n# comment\ntokio = \"1\"\nserde = { version = \"1\" }\n\n[dev-dependencies]\nclap = \"4\"\n";
        assert_eq!(dependency_names(manifest), vec!["tokio", "serde"]);
    }
}
