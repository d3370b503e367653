//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT sleep. The thinking timer uses
//! `tokio::time::interval_at`; everything else waits on I/O.
//! **Exceptions**: test code.

use architectural_enforcement::{production_sources, SourceFile};

#[test]
fn test_no_sleep_in_production_code() {
    let violations: Vec<String> = production_sources()
        .iter()
        .flat_map(find_sleeps)
        .collect();

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Sleep calls found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ Use tokio::time::interval() for periodic work");
        eprintln!("✅ Await the I/O you are waiting for instead of polling");

        panic!(
            "\nFound {} sleep violation(s) in production code.",
            violations.len()
        );
    }
}

fn find_sleeps(file: &SourceFile) -> Vec<String> {
    file.production_lines()
        .into_iter()
        .filter(|(_, code)| code.contains("::sleep(") || code.contains(".sleep("))
        .map(|(line_number, _)| file.violation(line_number, "Sleep call"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_detected_outside_tests() {
        let file = SourceFile::from_text(
            "bad.rs",
            "async fn poll() {\n    tokio::time::sleep(d).await;\n}\n#[cfg(test)]\nmod tests {\n    fn t() { std::thread::sleep(d); }\n}\n",
        );
        let violations = find_sleeps(&file);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].starts_with("bad.rs:2 - Sleep call"));
    }
}
