//! autopar Command Line Interface
//!
//! Usage:
//!   autopar [OPTIONS] <input-file>
//!   autopar --help
//!
//! Examples:
//!   autopar --emit-parallel unit.json                  # Mark parallel loops (OpenACC)
//!   autopar --emit-parallel --emit-omp omp-cpu unit.json  # OpenMP CPU loops
//!   autopar --memory-coalescing unit.json              # Offload whole regions
//!   autopar --parallel-file lines.txt unit.json        # Annotate listed lines only
//!   autopar --emit=stats unit.json                     # Just print the counters

use clap::{Parser, ValueEnum};
use autopar::{AnnotateConfig, codegen::DirectiveFamily};
use std::path::PathBuf;
use std::fs;
use anyhow::{Result, Context};
use log::{info, debug};

/// autopar - Parallel directive annotation engine
#[derive(Parser, Debug)]
#[command(name = "autopar")]
#[command(author = "autopar Contributors")]
#[command(version)]
#[command(about = "Annotates loops and regions with parallel and offload directives", long_about = None)]
struct Cli {
    /// Input file (program model and analysis facts, JSON)
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Emit parallel-loop directives for loops marked parallel
    #[arg(long)]
    emit_parallel: bool,

    /// Directive family: acc, omp-gpu, omp-cpu (or 0, 1, 2)
    #[arg(long, value_name = "FAMILY", default_value = "acc", value_parser = parse_family)]
    emit_omp: DirectiveFamily,

    /// File with one parallel source line per record; skips the analysis
    #[arg(long, value_name = "FILE")]
    parallel_file: Option<PathBuf>,

    /// Do not parallelize divergent loops
    #[arg(long)]
    discard_divergent: bool,

    /// Annotate whole regions as offload kernels
    #[arg(long)]
    memory_coalescing: bool,

    /// What to emit
    #[arg(long, default_value = "listing")]
    emit: EmitKind,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress warnings)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EmitKind {
    /// Directives per source line
    Listing,
    /// Full report as JSON
    Json,
    /// Statistics only
    Stats,
}

fn parse_family(arg: &str) -> Result<DirectiveFamily, String> {
    match arg {
        "acc" => Ok(DirectiveFamily::OpenAcc),
        "omp-gpu" => Ok(DirectiveFamily::OpenMpGpu),
        "omp-cpu" => Ok(DirectiveFamily::OpenMpCpu),
        _ => {
            let mut chars = arg.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => DirectiveFamily::from_selector(c)
                    .ok_or_else(|| format!("unknown directive family selector `{}`", c)),
                _ => Err(format!("unknown directive family `{}`", arg)),
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    info!("autopar v{}", autopar::VERSION);
    debug!("Input file: {:?}", cli.input);

    let config = build_config(&cli);
    debug!("Annotation config: {:?}", config);

    let (module, mut facts) = autopar::load_input_file(&cli.input)?;
    info!("Loaded {} functions", module.len());

    let report = autopar::annotate(&module, &mut facts, &config)?;

    let output = match cli.emit {
        EmitKind::Listing => report.merged().to_string(),
        EmitKind::Json => serde_json::to_string_pretty(&report)
            .context("Failed to serialize report")?,
        EmitKind::Stats => report.statistics.to_string(),
    };
    write_output(&cli.output, &output)?;

    if !matches!(cli.emit, EmitKind::Stats) {
        info!("\n{}", report.statistics);
    }
    Ok(())
}

fn build_config(cli: &Cli) -> AnnotateConfig {
    AnnotateConfig {
        emit_parallel: cli.emit_parallel,
        family: cli.emit_omp,
        parallel_file: cli.parallel_file.clone(),
        discard_divergent: cli.discard_divergent,
        memory_coalescing: cli.memory_coalescing,
    }
}

fn write_output(path: &Option<PathBuf>, content: &str) -> Result<()> {
    match path {
        Some(p) => {
            fs::write(p, content)
                .with_context(|| format!("Failed to write output file: {:?}", p))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
