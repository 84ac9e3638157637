mod bytecode;
mod classpath;
mod complexity;
mod decoder;
mod descriptor;
mod engine;
mod hierarchy;
mod ir;
mod metrics;
mod opcodes;
mod overrides;
mod report;
mod scan;
mod telemetry;
#[cfg(test)]
mod test_harness;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use crate::engine::analyze;
use crate::report::{render_report, write_report};
use crate::telemetry::{Telemetry, init_logging};

/// CLI arguments for jarmetrics execution.
#[derive(Parser, Debug)]
#[command(
    name = "jarmetrics",
    about = "ABC complexity, inheritance depth and override metrics for JAR archives.",
    version
)]
struct Cli {
    /// JAR/zip archive, or a directory of class files.
    #[arg(value_name = "ARCHIVE")]
    archive: PathBuf,
    /// Where to write the JSON report; `-` prints it without writing a file.
    #[arg(long, value_name = "PATH", default_value = "metrics.json")]
    output: PathBuf,
    #[arg(long)]
    quiet: bool,
    #[arg(long)]
    timing: bool,
    /// OTLP HTTP endpoint that receives trace spans.
    #[arg(long, value_name = "URL")]
    otel: Option<String>,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let telemetry = cli.otel.clone().map(Telemetry::new).transpose()?;
    let result = run(&cli, telemetry.as_ref());
    if let Some(telemetry) = telemetry {
        if let Err(err) = telemetry.shutdown() {
            warn!("{err:#}");
        }
    }
    result
}

fn run(cli: &Cli, telemetry: Option<&Telemetry>) -> Result<()> {
    if !cli.archive.exists() {
        anyhow::bail!("input not found: {}", cli.archive.display());
    }

    let output = analyze(&cli.archive, telemetry)?;
    let rendered = render_report(&output.report)?;

    if !cli.quiet {
        println!("{rendered}");
    }
    if !is_stdout(&cli.output) {
        match write_report(&rendered, &cli.output) {
            Ok(()) => info!(path = %cli.output.display(), "wrote metrics report"),
            Err(err) => warn!("{err:#}"),
        }
    }

    if cli.timing && !cli.quiet {
        let timings = output.timings;
        eprintln!(
            "timing: total_ms={} scan_ms={} hierarchy_ms={} overrides_ms={} classes={}",
            timings.total_ms,
            timings.scan_ms,
            timings.hierarchy_ms,
            timings.overrides_ms,
            output.class_count
        );
    }

    Ok(())
}

fn is_stdout(path: &Path) -> bool {
    path == Path::new("-")
}
