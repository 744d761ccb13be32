//! `fleet-dispatch` - run a scenario to completion and print its KPI report
//!
//! ```text
//! fleet-dispatch <scenario.json> [--summary]
//! ```
//!
//! The scenario holds `config` and `cost_tables`. Diagnostics go to stderr,
//! filtered by `RUST_LOG` (default `info`).

use anyhow::{bail, Context, Result};
use fleet_dispatch_core_rs::Scenario;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct Args {
    scenario: PathBuf,
    summary: bool,
}

fn parse_args() -> Result<Args> {
    let mut scenario = None;
    let mut summary = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--summary" => summary = true,
            flag if flag.starts_with("--") => bail!("unknown flag {flag}"),
            path if scenario.is_none() => scenario = Some(PathBuf::from(path)),
            extra => bail!("unexpected argument {extra}"),
        }
    }
    let Some(scenario) = scenario else {
        bail!("usage: fleet-dispatch <scenario.json> [--summary]");
    };
    Ok(Args { scenario, summary })
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = parse_args()?;
    let raw = std::fs::read_to_string(&args.scenario)
        .with_context(|| format!("reading {}", args.scenario.display()))?;
    let scenario: Scenario = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", args.scenario.display()))?;

    let mut orchestrator = scenario
        .into_orchestrator()
        .context("building the simulation")?;
    let report = orchestrator.run().context("running the simulation")?;
    tracing::info!(
        tick = report.final_tick,
        events = orchestrator.event_count(),
        "run complete"
    );

    if args.summary {
        print!("{}", report.summary());
    } else {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
