// Licensed under the Apache-2.0 license

use anyhow::{Context, Result};
use std::process::Command;

fn cargo(args: &[&str], what: &str) -> Result<()> {
    println!("Running cargo {}...", args.join(" "));

    let status = Command::new("cargo")
        .args(args)
        .status()
        .with_context(|| format!("Failed to launch cargo for {what}"))?;

    if !status.success() {
        anyhow::bail!("{what} failed with {status}");
    }
    Ok(())
}

/// Unit tests on the host, with and without the `std` platform pieces.
pub fn test() -> Result<()> {
    cargo(&["test", "--lib"], "unit tests")?;
    cargo(&["test", "--lib", "--features", "std"], "unit tests (std)")
}

/// Lints, warnings denied.
pub fn clippy() -> Result<()> {
    cargo(
        &[
            "clippy",
            "--all-targets",
            "--features",
            "std",
            "--",
            "-D",
            "warnings",
        ],
        "clippy",
    )
}

pub fn doc() -> Result<()> {
    cargo(&["doc", "--no-deps", "--features", "std"], "rustdoc")
}

pub fn fmt_check() -> Result<()> {
    cargo(&["fmt", "--all", "--", "--check"], "rustfmt")
}
