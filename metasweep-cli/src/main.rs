mod output;

use std::io::{self, BufRead, Write};
use std::process;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use metasweep_core::catalog::{Environment, TargetSpec};
use metasweep_core::config::{CliOverrides, SweepConfig};
use metasweep_core::error::SweepError;
use metasweep_core::Metasweep;

#[derive(Parser)]
#[command(
    name = "metasweep",
    about = "Guarded bulk-deletion tool for Trino-compatible metastores",
    version = concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_HASH"), " ", env!("BUILD_TIME"), ")"
    ),
    propagate_version = true
)]
struct Cli {
    /// Config file path
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Target environment: dev (default) or prod
    #[arg(long, value_name = "ENV", default_value = "dev")]
    target: String,

    /// Schema name or LIKE pattern (% wildcard). Defaults to the team's
    /// dev/prod schema
    #[arg(long, value_name = "SCHEMA")]
    schema: Option<String>,

    /// Specific table or view to drop (requires --schema with an exact name)
    #[arg(long, value_name = "NAME")]
    table: Option<String>,

    /// Metastore gateway host (overrides config)
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// Gateway port (overrides config)
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,

    /// Gateway user (overrides config)
    #[arg(long, value_name = "USER")]
    user: Option<String>,

    /// API key (overrides config and METASWEEP_API_KEY)
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,

    /// HTTP scheme: https (default) or http
    #[arg(long, value_name = "SCHEME")]
    http_scheme: Option<String>,

    /// Catalog name (overrides config)
    #[arg(long, value_name = "CATALOG")]
    catalog: Option<String>,

    /// Team name used for default schema selectors (overrides config)
    #[arg(long, value_name = "TEAM")]
    team: Option<String>,

    /// Connection timeout in seconds (default: 30, 0 = no timeout)
    #[arg(long, value_name = "SECS")]
    connect_timeout: Option<u32>,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Enable verbose/debug output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the selector and show what would be dropped
    Plan,

    /// Drop the resolved objects (dry-run unless --execute is given)
    Sweep {
        /// Actually execute the drops (default is dry-run)
        #[arg(long)]
        execute: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging (suppress when JSON output is requested)
    let filter = if cli.json {
        "error"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .without_time()
        .init();

    if let Err(e) = run(cli).await {
        print_error(&e);
        process::exit(exit_code(&e));
    }
}

/// Map error types to differentiated exit codes.
///
/// Per-object drop failures are not errors: the run completes and exits 0
/// with the failures reported in the summary.
fn exit_code(error: &SweepError) -> i32 {
    match error {
        SweepError::ConfigError(_) => 2,
        SweepError::Transport(_) => 4,
        SweepError::QueryFailed { .. } => 4,
        SweepError::PolicyViolation(_) => 5,
        SweepError::ConfirmationDeclined => 6,
        _ => 1,
    }
}

async fn run(cli: Cli) -> Result<(), SweepError> {
    let json_output = cli.json;

    let environment: Environment = cli.target.parse()?;

    if cli.table.is_some() && cli.schema.is_none() {
        return Err(SweepError::ConfigError(
            "--table requires --schema with an exact schema name".to_string(),
        ));
    }

    let overrides = CliOverrides {
        host: cli.host,
        port: cli.port,
        user: cli.user,
        api_key: cli.api_key,
        http_scheme: cli.http_scheme,
        catalog: cli.catalog,
        team: cli.team,
        connect_timeout: cli.connect_timeout,
    };

    let config = SweepConfig::load(cli.config.as_deref(), &overrides)?;

    let schema = match cli.schema {
        Some(s) => s,
        None => config.default_schema(environment)?,
    };
    let spec = TargetSpec {
        environment,
        schema,
        table: cli.table,
    };

    let ms = Metasweep::new(config)?;

    match cli.command {
        Commands::Plan => {
            let plan = ms.plan(&spec).await?;
            if json_output {
                println!("{}", serde_json::to_string_pretty(&plan).unwrap());
            } else {
                output::print_plan_table(&spec, &plan);
            }
        }
        Commands::Sweep { execute } => {
            if !execute && !json_output && !cli.quiet {
                println!(
                    "{}",
                    "DRY RUN — no drops will be executed. Pass --execute to apply."
                        .yellow()
                        .bold()
                );
            }

            let mut confirm = |prompt: &str| {
                print!("{}", prompt.yellow().bold());
                let _ = io::stdout().flush();
                let mut line = String::new();
                match io::stdin().lock().read_line(&mut line) {
                    // EOF or an interrupted read counts as declined
                    Ok(0) | Err(_) => false,
                    Ok(_) => line.trim().to_lowercase() == "yes",
                }
            };

            let summary = ms.sweep(&spec, execute, &mut confirm).await?;
            if json_output {
                println!("{}", serde_json::to_string_pretty(&summary).unwrap());
            } else {
                output::print_summary(&summary);
            }
        }
    }

    Ok(())
}

fn print_error(error: &SweepError) {
    eprintln!("{} {}", "ERROR:".red().bold(), error);

    // Provide actionable guidance
    match error {
        SweepError::ConfigError(_) => {
            eprintln!(
                "{}",
                "Hint: Check your metasweep.toml or set METASWEEP_HOST / METASWEEP_API_KEY."
                    .dimmed()
            );
        }
        SweepError::Transport(_) | SweepError::QueryFailed { .. } => {
            eprintln!(
                "{}",
                "Hint: Verify the gateway is reachable and the API key is valid.".dimmed()
            );
        }
        SweepError::PolicyViolation(_) => {
            eprintln!(
                "{}",
                "Hint: Prod drops take one object at a time: --target prod --schema NAME --table NAME."
                    .dimmed()
            );
        }
        SweepError::ConfirmationDeclined => {
            eprintln!("{}", "No objects were dropped.".dimmed());
        }
        _ => {}
    }
}
