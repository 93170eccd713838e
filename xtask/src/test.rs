use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

pub fn run(unit_only: bool, integration_only: bool) -> Result<()> {
    println!();
    println!("{}", "🧪 Running tests...".cyan().bold());
    println!();

    let total_start = Instant::now();

    if !integration_only {
        suite("unit", &["test", "--lib", "--workspace"])?;
    }
    if !unit_only {
        // Engine scenarios and property tests under crates/*/tests.
        suite("integration", &["test", "--workspace", "--tests", "--exclude", "xtask"])?;
    }

    // Doc tests
    println!("{}", "  Running doc tests...".cyan());
    let doc_start = Instant::now();

    let doc_output = Command::new("cargo")
        .args(["test", "--doc", "--workspace"])
        .output()
        .context("Failed to run doc tests")?;

    if doc_output.status.success() {
        let output_str = String::from_utf8_lossy(&doc_output.stdout);
        println!(
            "{}",
            format!(
                "  ✓ Doc tests passed {} in {:.2}s",
                extract_test_summary(&output_str),
                doc_start.elapsed().as_secs_f64()
            )
            .green()
        );
    } else {
        eprintln!("{}", "  ⚠ Doc tests failed".yellow().bold());
        // Don't fail on doc test failures
    }
    println!();

    println!(
        "{}",
        format!(
            "✓ All tests completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}

fn suite(name: &str, args: &[&str]) -> Result<()> {
    println!("{}", format!("  Running {name} tests...").cyan());
    let start = Instant::now();

    let output = Command::new("cargo")
        .args(args)
        .output()
        .with_context(|| format!("Failed to run {name} tests"))?;

    let output_str = String::from_utf8_lossy(&output.stdout);
    if !output.status.success() {
        eprintln!("{}", format!("  ✗ {name} tests failed").red().bold());
        eprintln!();
        for line in output_str.lines() {
            eprintln!("  {line}");
        }
        anyhow::bail!("{name} tests failed");
    }

    println!(
        "{}",
        format!(
            "  ✓ {name} tests passed {} in {:.2}s",
            extract_test_summary(&output_str),
            start.elapsed().as_secs_f64()
        )
        .green()
    );
    println!();
    Ok(())
}

/// Sum every "test result:" line cargo prints, one per test binary.
fn extract_test_summary(output: &str) -> String {
    let mut passed = 0_u64;
    let mut failed = 0_u64;
    let mut binaries = 0_u64;
    for line in output.lines() {
        let Some(result) = line.split("test result:").nth(1) else {
            continue;
        };
        binaries = binaries.saturating_add(1);
        for part in result.split(';') {
            let mut words = part.split_whitespace().rev();
            let (Some(kind), Some(count)) = (words.next(), words.next()) else {
                continue;
            };
            let Ok(count) = count.parse::<u64>() else {
                continue;
            };
            match kind {
                "passed" => passed = passed.saturating_add(count),
                "failed" => failed = failed.saturating_add(count),
                _ => {}
            }
        }
    }
    if binaries == 0 {
        return "(summary not available)".to_string();
    }
    format!("({passed} passed, {failed} failed across {binaries} binaries)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_adds_up_every_binary() {
        let out = "test result: ok. 5 passed; 0 failed; 0 ignored; 0 measured; 0 filtered out\n\
                   running 3 tests\n\
                   test result: ok. 3 passed; 1 failed; 0 ignored; 0 measured; 0 filtered out\n";
        assert_eq!(
            extract_test_summary(out),
            "(8 passed, 1 failed across 2 binaries)"
        );
    }

    #[test]
    fn missing_summary_is_reported() {
        assert_eq!(extract_test_summary("nothing"), "(summary not available)");
    }
}
