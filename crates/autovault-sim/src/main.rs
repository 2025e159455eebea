//! autovault-sim: run a vault scenario and print the report.
//!
//! ```text
//! autovault-sim <scenario.toml>
//! ```
//!
//! Logs go to stderr (`RUST_LOG` overrides the `autovault=info` default);
//! the JSON report goes to stdout.

use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

use autovault_sim::Scenario;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("autovault=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: autovault-sim <scenario.toml>")?;

    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let scenario = Scenario::from_toml_str(&content)
        .with_context(|| format!("parsing {}", path.display()))?;

    info!(path = %path.display(), "running scenario");
    let report = autovault_sim::run(&scenario)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.failed_steps > 0 {
        info!(failed_steps = report.failed_steps, "some steps were rejected");
    }
    Ok(())
}
