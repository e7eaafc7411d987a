//! Custom cargo commands for the pacta workspace.
//!
//! Usage:
//!   cargo xtask verify    - Run full verification suite
//!   cargo xtask test      - Run all tests
//!   cargo xtask ui        - Run the macro expansion fixtures only
//!   cargo xtask check     - Quick check (check + clippy)
//!   cargo xtask bench     - Run benchmarks

use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::process::Command;

fn main() -> Result<()> {
    let task = env::args().nth(1);
    match task.as_deref() {
        Some("verify") => verify()?,
        Some("test") => test()?,
        Some("ui") => ui()?,
        Some("check") => check()?,
        Some("bench") => bench()?,
        _ => print_help(),
    }
    Ok(())
}

fn print_help() {
    eprintln!(
        r#"
cargo xtask <COMMAND>

Commands:
  verify    Run full verification suite (tests, fixtures, clippy, docs)
  test      Run all Rust tests in the workspace
  ui        Run the #[contracts] expansion fixtures
  check     Quick check (cargo check + clippy)
  bench     Run benchmarks
"#
    );
}

/// Full verification suite
fn verify() -> Result<()> {
    println!("==========================================");
    println!("pacta Verification Suite");
    println!("==========================================\n");

    println!("[1/4] Checking for stray debug output...");
    check_no_debug_prints()?;
    println!("✓ No println!/dbg! in library code\n");

    println!("[2/4] Running workspace tests...");
    run_cargo(&["test", "--workspace", "--quiet"], &[])?;
    println!("✓ All tests passed\n");

    println!("[3/4] Running clippy...");
    run_cargo(&["clippy", "--workspace", "--quiet", "--", "-D", "warnings"], &[])?;
    println!("✓ Clippy passed\n");

    println!("[4/4] Building docs...");
    run_cargo(&["doc", "--workspace", "--no-deps", "--quiet"], &[("RUSTDOCFLAGS", "-D warnings")])?;
    println!("✓ Docs build\n");

    println!("==========================================");
    println!("✓ ALL VERIFICATION CHECKS PASSED");
    println!("==========================================");

    Ok(())
}

/// Run all tests
fn test() -> Result<()> {
    run_cargo(&["test", "--workspace"], &[])
}

/// Run the trybuild fixtures for the attribute macro
fn ui() -> Result<()> {
    run_cargo(&["test", "-p", "pacta-macros", "--test", "ui"], &[])
}

/// Quick check
fn check() -> Result<()> {
    println!("Running quick checks...\n");

    println!("[1/2] cargo check...");
    run_cargo(&["check", "--workspace", "--all-targets"], &[])?;

    println!("[2/2] cargo clippy...");
    run_cargo(&["clippy", "--workspace", "--quiet", "--", "-D", "warnings"], &[])?;

    println!("\n✓ Quick checks passed");
    Ok(())
}

/// Run benchmarks
fn bench() -> Result<()> {
    run_cargo(&["bench", "-p", "pacta"], &[])
}

// ============================================================================
// Helper functions
// ============================================================================

fn project_root() -> Result<PathBuf> {
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => env::current_dir().context("Failed to read current directory")?,
    };

    // xtask is in project_root/xtask, so go up one level
    let root = manifest_dir.parent().unwrap_or(&manifest_dir);
    Ok(root.to_path_buf())
}

fn run_cargo(args: &[&str], envs: &[(&str, &str)]) -> Result<()> {
    let root = project_root()?;

    let status = Command::new("cargo")
        .args(args)
        .envs(envs.iter().copied())
        .current_dir(&root)
        .status()
        .with_context(|| format!("Failed to run cargo {:?}", args))?;

    if !status.success() {
        bail!("cargo {:?} failed", args);
    }

    Ok(())
}

/// Library code reports through `tracing`, never stdout.
fn check_no_debug_prints() -> Result<()> {
    let root = project_root()?;
    let mut offenders = Vec::new();

    for dir in ["src", "macros/src"] {
        let output = Command::new("grep")
            .args(["-rn", "-E", r"(println!|eprintln!|dbg!)\(", "--include=*.rs", "."])
            .current_dir(root.join(dir))
            .output()
            .context("Failed to run grep")?;

        let found = String::from_utf8_lossy(&output.stdout);
        offenders.extend(
            found
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| format!("{}/{}", dir, line.trim_start_matches("./"))),
        );
    }

    if !offenders.is_empty() {
        bail!(
            "Found {} debug print(s) in library code:\n{}",
            offenders.len(),
            offenders.join("\n")
        );
    }

    Ok(())
}
