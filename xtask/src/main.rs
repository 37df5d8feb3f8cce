use std::process::Command;

use anyhow::Result;
use clap::Parser;

#[derive(Debug, Parser)]
#[clap(about = "Wayback Collector build system.")]
enum CliArgs {
    Test {
        /// Also run tests against the live Wayback Machine.
        #[clap(long)]
        large: bool,
    },
    Lint,
    Ci,
}

fn cargo_features(large: bool) -> Vec<String> {
    if large {
        vec!["--features=large_tests".into()]
    } else {
        Vec::new()
    }
}

fn build() -> Result<()> {
    let status = Command::new("cargo").arg("build").status()?;
    anyhow::ensure!(status.success(), "cargo build failed");
    Ok(())
}

fn fmt(check: bool) -> Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.args(&["fmt", "--all"]);
    if check {
        cmd.arg("--check");
    }
    let status = cmd.status()?;
    anyhow::ensure!(status.success(), "cargo fmt failed");
    Ok(())
}

fn lint() -> Result<()> {
    let status = Command::new("cargo")
        .args(&["clippy", "--all-targets"])
        .args(&["--", "-D", "warnings"])
        .status()?;
    anyhow::ensure!(status.success(), "cargo clippy failed");
    Ok(())
}

fn test(large: bool) -> Result<()> {
    let status = Command::new("cargo")
        .arg("test")
        .args(&cargo_features(large))
        .status()?;
    anyhow::ensure!(status.success(), "cargo test failed");
    Ok(())
}

fn main() -> Result<()> {
    let opt = CliArgs::parse();
    match opt {
        CliArgs::Test { large } => test(large)?,
        CliArgs::Lint => lint()?,
        CliArgs::Ci => {
            build()?;
            fmt(true)?;
            lint()?;
            test(false)?
        }
    };

    Ok(())
}
