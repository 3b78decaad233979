#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # hfspec-cli
//!
//! Command-line interface for validating statistical model specifications,
//! inspecting the schema set and computing digests.

mod commands;
mod config;

use clap::Parser;
use config::CliConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hfspec")]
#[command(about = "Statistical model specification toolkit")]
#[command(version)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of schemas laid out as `<version>/<name>.json`
    #[arg(long)]
    schema_dir: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `hfspec_validation=trace` (RUST_LOG wins)
    #[arg(long)]
    log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
enum Commands {
    /// Validate a JSON or YAML specification against a schema
    Validate {
        /// Input file path
        input: PathBuf,

        /// Schema name, e.g. workspace.json
        #[arg(short, long)]
        schema: String,

        /// Schema version (e.g., 1.0.0)
        #[arg(short, long)]
        version: Option<String>,
    },

    /// Print a schema document
    Schema {
        /// Schema name, e.g. model.json
        name: String,

        /// Schema version (e.g., 1.0.0)
        #[arg(short, long)]
        version: Option<String>,
    },

    /// List the schemas available for a version
    Schemas {
        /// Schema version (e.g., 1.0.0)
        #[arg(short, long)]
        version: Option<String>,
    },

    /// Print the digest of a JSON or YAML document
    Digest {
        /// Input file path
        input: PathBuf,

        /// Hash algorithm (md5, sha1, sha256, sha3_256, ...)
        #[arg(short, long)]
        algorithm: Option<String>,
    },

    /// Print the BibTeX citation
    Cite {
        /// Join the entry onto a single line
        #[arg(long)]
        oneline: bool,
    },

    /// Parse key=value options and print them as JSON
    Options {
        /// Options such as `poi_name=mu` or `bounds=[0, 10]`
        #[arg(required = true, value_parser = hfspec_utils::parse_eqdelim)]
        options: Vec<(String, serde_json::Value)>,
    },
}

impl Commands {
    /// Schema version and digest algorithm given on the command line
    fn overrides(&self) -> (Option<String>, Option<String>) {
        match self {
            Commands::Validate { version, .. }
            | Commands::Schema { version, .. }
            | Commands::Schemas { version } => (version.clone(), None),
            Commands::Digest { algorithm, .. } => (None, algorithm.clone()),
            Commands::Cite { .. } | Commands::Options { .. } => (None, None),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match cli.config.as_deref().map(CliConfig::from_file).transpose() {
        Ok(config) => config.unwrap_or_else(CliConfig::new),
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let (version, algorithm) = cli.command.overrides();
    let config = loaded.with_overrides(cli.schema_dir, version, algorithm, cli.log_level);

    init_tracing(&config.log_level);
    tracing::debug!(?config, "Loaded configuration");

    match run(cli.command, &config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands, config: &CliConfig) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Validate { input, schema, .. } => commands::validate(config, &input, &schema),
        Commands::Schema { name, .. } => {
            commands::schema(config, &name)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Schemas { .. } => {
            commands::schemas(config)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Digest { input, .. } => {
            commands::digest(config, &input)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Cite { oneline } => {
            println!("{}", hfspec_utils::citation(oneline));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Options { options } => {
            commands::options(options)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
