mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ledgerbyte",
    version,
    about = "Clean raw sales orders and load the analytics table"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Also write JSON logs to a daily rolling file in this directory
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline
    Run {
        /// Path to pipeline YAML file
        pipeline: PathBuf,
        /// Preview mode: skip the load, print accepted rows to stdout
        #[arg(long)]
        dry_run: bool,
        /// Maximum orders to read (implies --dry-run)
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Validate pipeline configuration and connectivity
    Check {
        /// Path to pipeline YAML file
        pipeline: PathBuf,
    },
    /// Recreate the raw source tables with synthetic data
    Generate {
        /// Path to pipeline YAML file
        pipeline: PathBuf,
        /// Number of customers to generate
        #[arg(long, default_value_t = 100)]
        customers: usize,
        /// Number of orders to generate
        #[arg(long, default_value_t = 1000)]
        orders: usize,
        /// Seed for reproducible data
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let _guard = logging::init(&cli.log_level, cli.log_file.as_deref());

    match cli.command {
        Commands::Run {
            pipeline,
            dry_run,
            limit,
        } => commands::run::execute(&pipeline, dry_run, limit).await,
        Commands::Check { pipeline } => commands::check::execute(&pipeline).await,
        Commands::Generate {
            pipeline,
            customers,
            orders,
            seed,
        } => commands::generate::execute(&pipeline, customers, orders, seed).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn limit_and_global_flags_parse() {
        let cli = Cli::try_parse_from([
            "ledgerbyte",
            "run",
            "pipeline.yaml",
            "--limit",
            "20",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Commands::Run {
                pipeline,
                dry_run,
                limit,
            } => {
                assert_eq!(pipeline, PathBuf::from("pipeline.yaml"));
                assert!(!dry_run);
                assert_eq!(limit, Some(20));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn generate_defaults() {
        let cli = Cli::try_parse_from(["ledgerbyte", "generate", "p.yaml"]).unwrap();
        match cli.command {
            Commands::Generate {
                customers,
                orders,
                seed,
                ..
            } => {
                assert_eq!((customers, orders, seed), (100, 1000, None));
            }
            _ => panic!("expected generate"),
        }
    }
}
