// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! `mcp-instrument`: runs the sample MCP handlers through the instrumentation
//! and prints the resulting metrics.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use tokio::task::JoinSet;

use mcp_instrumentation::config::{self, build_telemetry};
use mcp_instrumentation::demo::{demo_calls, register_demo_handlers, DemoServer};
use mcp_instrumentation::instrumentation::{instrument_server, McpMethod};
use mcp_instrumentation::telemetry::init_logging;

/// Instrument sample MCP handlers and report their telemetry.
#[derive(Parser)]
#[command(name = "mcp-instrument")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (JSON or YAML)
    #[arg(short, long, env = "MCP_INSTRUMENT_CONFIG")]
    config: Option<PathBuf>,

    /// Rounds of sample calls to run concurrently
    #[arg(short = 'n', long, default_value_t = 3)]
    calls: usize,

    /// Print the metrics report as JSON
    #[arg(long)]
    json: bool,

    /// Don't print individual call outcomes
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("loading {}", path.display()),
        None => "loading configuration".to_string(),
    })?;

    let _guard = init_logging(&config.logging).context("initializing logging")?;

    let backend = build_telemetry(&config);
    let mut server = instrument_server(DemoServer::new(), backend.telemetry());
    register_demo_handlers(&mut server);

    let mut tasks = JoinSet::new();
    for round in 0..cli.calls {
        for (method, name, params) in demo_calls() {
            let handler = server
                .handler(method, name)
                .with_context(|| format!("{method} {name} is not registered"))?;
            tasks.spawn(async move {
                let outcome = handler.call(params).await;
                (round, method, name, outcome)
            });
        }
    }

    let mut failures = 0usize;
    while let Some(joined) = tasks.join_next().await {
        let (round, method, name, outcome) = joined.context("call task panicked")?;
        if outcome.is_err() {
            failures += 1;
        }
        if !cli.quiet {
            print_outcome(round, method, name, &outcome);
        }
    }

    let snapshot = backend.snapshot();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!();
        println!(
            "{}",
            format!("{} ({} exporter)", config.service_name, backend.kind())
                .bright_blue()
                .bold()
        );
        println!("{}", snapshot.format_report());
        println!(
            "{}",
            format!(
                "{} calls, {} failed",
                cli.calls * demo_calls().len(),
                failures
            )
            .dimmed()
        );
    }

    Ok(())
}

fn print_outcome(
    round: usize,
    method: McpMethod,
    name: &str,
    outcome: &mcp_instrumentation::HandlerResult,
) {
    let label = format!("[{round}] {method} {name}");
    match outcome {
        Ok(value) => println!("{} {} {}", "✓".green(), label, value.to_string().dimmed()),
        Err(err) => println!(
            "{} {} {}",
            "✗".red(),
            label,
            format!("{}: {}", err.kind(), err.message()).red()
        ),
    }
}
