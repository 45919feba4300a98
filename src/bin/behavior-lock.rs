//! Behavior Lock command-line checker
//!
//! Usage: behavior-lock check [PATHS] [options]

use std::path::{Path, PathBuf};

use anyhow::Result;
use behavior_lock::error::exit_code;
use behavior_lock::{DefinitionError, LoadError};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::check::Limits;
use cli::OutputFormat;

#[derive(Parser)]
#[command(name = "behavior-lock")]
#[command(about = "Behavioral type checker for join-pattern contracts", long_about = None)]
struct Cli {
    /// Verbose logging (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every contract that declares a behavior
    Check {
        /// Documents or directories (default: current directory)
        paths: Vec<PathBuf>,

        /// Filter by contract name (supports `*`)
        #[arg(long)]
        name: Option<String>,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,

        /// Number of parallel jobs
        #[arg(short, long, default_value = "1")]
        jobs: usize,

        /// Bound on nested contract unfoldings
        #[arg(long)]
        max_depth: Option<usize>,

        /// Bound on the size of any trace set
        #[arg(long)]
        max_traces: Option<usize>,
    },

    /// Print the trace set of one contract
    Traces {
        /// Document containing the contract
        path: PathBuf,

        /// Contract name
        #[arg(long)]
        contract: String,

        /// Output format (human or json)
        #[arg(long, default_value = "human")]
        format: OutputFormat,

        #[arg(long)]
        max_depth: Option<usize>,

        #[arg(long)]
        max_traces: Option<usize>,
    },

    /// List contracts and type declarations
    List {
        /// Documents or directories (default: current directory)
        paths: Vec<PathBuf>,
    },

    /// Show behavioral type coverage
    Coverage {
        /// Documents or directories (default: current directory)
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Check {
            paths,
            name,
            format,
            jobs,
            max_depth,
            max_traces,
        } => handle_check(&paths, name.as_deref(), format, jobs, Limits { max_depth, max_traces }),
        Commands::Traces {
            path,
            contract,
            format,
            max_depth,
            max_traces,
        } => handle_traces(&path, &contract, format, Limits { max_depth, max_traces }),
        Commands::List { paths } => handle_list(&paths),
        Commands::Coverage { paths, format } => handle_coverage(&paths, format),
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            error_exit_code(&e)
        }
    };
    std::process::exit(code);
}

/// Definition errors found while loading keep their own exit code
fn error_exit_code(e: &anyhow::Error) -> i32 {
    if e.downcast_ref::<DefinitionError>().is_some() {
        exit_code::DEFINITION_ERROR
    } else {
        exit_code::IO_ERROR
    }
}

fn handle_check(
    paths: &[PathBuf],
    name: Option<&str>,
    format: OutputFormat,
    jobs: usize,
    limits: Limits,
) -> Result<i32> {
    let documents = cli::discover::load_documents(paths)?;
    let targets = cli::check::collect_targets(&documents)?;
    let filtered = cli::filters::filter_targets(targets, name)?;

    if filtered.is_empty() {
        eprintln!("No contracts with a declared behavior matched");
        return Ok(exit_code::PASS);
    }
    info!(documents = documents.len(), contracts = filtered.len(), "checking");

    let results = cli::check::run_checks(&documents, filtered, limits, jobs)?;
    print!("{}", cli::output::format_results(&results, format));

    Ok(cli::check::batch_exit_code(&results))
}

fn handle_traces(path: &Path, contract: &str, format: OutputFormat, limits: Limits) -> Result<i32> {
    let documents = cli::discover::load_documents(&[path.to_path_buf()])?;
    if documents.is_empty() {
        return Err(LoadError::NoListings(path.display().to_string()).into());
    }
    let Some(doc) = cli::discover::find_contract(&documents, contract) else {
        eprintln!("Error: {}", DefinitionError::NoSuchContract(contract.to_string()));
        return Ok(exit_code::DEFINITION_ERROR);
    };
    let config = doc.config.with_overrides(limits.max_depth, limits.max_traces);

    match doc.module.extract_traces(contract, &config) {
        Ok(traces) => {
            print!("{}", cli::output::format_traces(contract, &traces, format));
            Ok(exit_code::PASS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            Ok(e.exit_code())
        }
    }
}

fn handle_list(paths: &[PathBuf]) -> Result<i32> {
    let documents = cli::discover::load_documents(paths)?;
    print!("{}", cli::output::format_listing(&documents));
    Ok(exit_code::PASS)
}

fn handle_coverage(paths: &[PathBuf], format: OutputFormat) -> Result<i32> {
    let documents = cli::discover::load_documents(paths)?;
    let stats = cli::coverage::generate_coverage(&documents);

    let output = match format {
        OutputFormat::Human => cli::coverage::format_coverage_human(&stats),
        OutputFormat::Json => cli::coverage::format_coverage_json(&stats),
        OutputFormat::Markdown => cli::coverage::format_coverage_markdown(&stats),
        OutputFormat::Junit => {
            eprintln!("JUnit format is not supported for coverage");
            return Ok(exit_code::IO_ERROR);
        }
    };

    print!("{}", output);
    Ok(exit_code::PASS)
}
