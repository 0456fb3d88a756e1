// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error};
use zonectl::{
    commands::{self, PipelineOptions},
    constants::{DEFAULT_ZONE_CONCURRENCY, DEFAULT_ZONE_TIMEOUT_SECS, EXIT_CONFIG_ERROR, EXIT_FATAL},
    errors::{ConfigError, ProviderError},
    reconcile::RunOptions,
};

/// Declarative multi-provider DNS controller
#[derive(Debug, Parser)]
#[command(name = "zonectl", version, about)]
struct Cli {
    /// dnsconfig file (JSON, or YAML with a .yaml/.yml extension)
    #[arg(long, global = true, default_value = "dnsconfig.json")]
    config: PathBuf,

    /// Provider credentials file
    #[arg(long, global = true, default_value = "creds.json")]
    creds: PathBuf,

    /// Raise the default log level (repeat for trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct PipelineArgs {
    /// Only these zones (comma separated)
    #[arg(long, value_delimiter = ',')]
    domains: Vec<String>,

    /// Only these providers and registrars (comma separated)
    #[arg(long, value_delimiter = ',')]
    providers: Vec<String>,

    /// Per-zone timeout in seconds
    #[arg(long, default_value_t = DEFAULT_ZONE_TIMEOUT_SECS)]
    zone_timeout: u64,

    /// Zones reconciled at once
    #[arg(long, default_value_t = DEFAULT_ZONE_CONCURRENCY)]
    concurrency: usize,

    /// Write Prometheus text metrics here when done
    #[arg(long)]
    metrics_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the configuration
    Check(PipelineArgs),
    /// Show the corrections a push would make
    Preview(PipelineArgs),
    /// Apply corrections
    Push(PipelineArgs),
    /// List a provider's zones, or dump zones as dnsconfig records
    GetZones {
        /// Provider name from the credentials file
        provider: String,
        /// Zones to dump; none lists all zones
        zones: Vec<String>,
    },
    /// Print a shell completion script
    Completions {
        /// Target shell
        shell: Shell,
    },
}

impl PipelineArgs {
    fn into_options(self, config: &Path, creds: &Path, dry_run: bool) -> PipelineOptions {
        PipelineOptions {
            config: config.to_path_buf(),
            creds: creds.to_path_buf(),
            domains: self.domains,
            providers: self.providers,
            run: RunOptions {
                dry_run,
                zone_timeout: Duration::from_secs(self.zone_timeout),
                concurrency: self.concurrency.max(1),
            },
            metrics_file: self.metrics_file,
        }
    }
}

fn main() {
    let Cli {
        config,
        creds,
        verbose,
        command,
    } = Cli::parse();
    init_tracing(verbose);

    let code = match execute(&config, &creds, command) {
        Ok(code) => code,
        Err(err) => {
            error!(error = %format!("{err:#}"), "command failed");
            eprintln!("Error: {err:#}");
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}

fn execute(config: &Path, creds: &Path, command: Command) -> Result<i32> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("zonectl")
        .enable_all()
        .build()?;
    let mut stdout = std::io::stdout().lock();

    match command {
        Command::Check(args) => {
            commands::check(&args.into_options(config, creds, true), &mut stdout)
        }
        Command::Preview(args) => runtime.block_on(commands::reconcile(
            &args.into_options(config, creds, true),
            &mut stdout,
        )),
        Command::Push(args) => runtime.block_on(commands::reconcile(
            &args.into_options(config, creds, false),
            &mut stdout,
        )),
        Command::GetZones { provider, zones } => runtime.block_on(commands::get_zones(
            creds,
            config.exists().then_some(config),
            &provider,
            &zones,
            &mut stdout,
        )),
        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "zonectl", &mut stdout);
            Ok(0)
        }
    }
}

/// Exit code for an error that escaped a command.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err
        .downcast_ref::<ProviderError>()
        .is_some_and(ProviderError::is_fatal)
    {
        return EXIT_FATAL;
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return EXIT_CONFIG_ERROR;
    }
    debug!("unclassified error, treating as configuration error");
    EXIT_CONFIG_ERROR
}

fn init_tracing(verbose: u8) {
    // Format: timestamp file:line LEVEL message, on stderr so plan output stays clean.
    //
    // Respects RUST_LOG if set, otherwise defaults to INFO (DEBUG with -v, TRACE with -vv).
    // Respects RUST_LOG_FORMAT=json for structured output.
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
    debug!("Logging initialized with file and line number tracking");
}
