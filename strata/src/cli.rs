// strata/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Raw-layer ingestion and curated-layer quality gate", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 📥 Loads every declared source file into the raw layer
    Ingest {
        /// Project directory
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Do not run the schema definition script first
        #[arg(long)]
        skip_schema: bool,

        /// Exit with an error if any unit failed
        #[arg(long)]
        fail_on_error: bool,
    },

    /// 🛡️  Runs the quality catalog against the curated layer
    Check {
        /// Project directory
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Logical project (overrides config and STRATA_PROJECT)
        #[arg(long)]
        project: Option<String>,

        /// Curated dataset (overrides config and STRATA_CURATED_DATASET)
        #[arg(long)]
        dataset: Option<String>,

        /// Also write the JSON report to this file
        #[arg(long)]
        output_json: Option<PathBuf>,

        /// Output format on stdout
        #[arg(long, value_enum, default_value_t = ReportFormat::Table)]
        format: ReportFormat,
    },

    /// 📋 Lists the compiled quality checks
    Checks {
        /// Project directory
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Print the rendered SQL of each check
        #[arg(long)]
        sql: bool,
    },

    /// 🔎 Reads back the ingestion ledger
    Audit {
        /// Project directory
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, bail};
    use clap::Parser;

    #[test]
    fn test_cli_parse_ingest_defaults() -> Result<()> {
        let args = Cli::parse_from(["strata", "ingest"]);
        match args.command {
            Commands::Ingest {
                project_dir,
                skip_schema,
                fail_on_error,
            } => {
                assert_eq!(project_dir.to_string_lossy(), ".");
                assert!(!skip_schema);
                assert!(!fail_on_error);
                Ok(())
            }
            _ => bail!("Expected Ingest command"),
        }
    }

    #[test]
    fn test_cli_parse_check_overrides() -> Result<()> {
        let args = Cli::parse_from([
            "strata",
            "check",
            "--project-dir",
            "/tmp",
            "--project",
            "psa-data",
            "--dataset",
            "psa_curated",
            "--format",
            "json",
            "--output-json",
            "report.json",
        ]);
        match args.command {
            Commands::Check {
                project_dir,
                project,
                dataset,
                output_json,
                format,
            } => {
                assert_eq!(project_dir.to_string_lossy(), "/tmp");
                assert_eq!(project.as_deref(), Some("psa-data"));
                assert_eq!(dataset.as_deref(), Some("psa_curated"));
                assert_eq!(output_json, Some(PathBuf::from("report.json")));
                assert_eq!(format, ReportFormat::Json);
                Ok(())
            }
            _ => bail!("Expected Check command"),
        }
    }

    #[test]
    fn test_cli_parse_checks_sql() -> Result<()> {
        let args = Cli::parse_from(["strata", "checks", "--sql"]);
        match args.command {
            Commands::Checks { sql, .. } => {
                assert!(sql);
                Ok(())
            }
            _ => bail!("Expected Checks command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["strata", "check", "--format", "xml"]).is_err());
    }
}
