//! # rx-cli
//!
//! Validate a YAML file against a multi-file Rx schema. Without a data file
//! the assembled schema is printed instead.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rx_pipeline::{Outcome, Pipeline, PipelineConfig, SchemaSummary};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "validate")]
#[command(about = "Validate a yaml file with a given schema. If no data file is specified, the expanded schema is printed out.")]
#[command(version)]
struct Cli {
    /// The file with the root schema
    schema: PathBuf,

    /// The data file to be validated
    data: Option<PathBuf>,

    /// Print registries and confirmations
    #[arg(short, long)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };

    let report = Pipeline::new(config).run(&cli.schema, cli.data.as_deref())?;
    tracing::debug!("{} load warning(s)", report.warnings.len());

    match report.outcome {
        Outcome::Validated { .. } => {
            if cli.verbose {
                println!("File validated OK.");
            }
        }
        Outcome::Schema(summary) => print_summary(&summary, cli.verbose)?,
    }
    Ok(())
}

fn print_summary(summary: &SchemaSummary, verbose: bool) -> anyhow::Result<()> {
    println!("Schema:");
    print!("{}", serde_yaml::to_string(&summary.types)?);

    if verbose {
        println!("Rx prefix registry:");
        print!("{}", serde_yaml::to_string(&summary.prefixes)?);
        println!("Rx type registry:");
        print!("{}", serde_yaml::to_string(&summary.registered)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_schema_and_data() {
        let cli = Cli::try_parse_from(["validate", "schema.yaml", "data.yaml", "-v"]).unwrap();
        assert_eq!(cli.schema, PathBuf::from("schema.yaml"));
        assert_eq!(cli.data, Some(PathBuf::from("data.yaml")));
        assert!(cli.verbose);
        assert!(cli.config.is_none());
    }

    #[test]
    fn cli_data_is_optional() {
        let cli = Cli::try_parse_from(["validate", "--config", "rx.yaml", "schema.yaml"]).unwrap();
        assert!(cli.data.is_none());
        assert_eq!(cli.config, Some(PathBuf::from("rx.yaml")));
    }

    #[test]
    fn cli_requires_a_schema() {
        assert!(Cli::try_parse_from(["validate"]).is_err());
    }
}
