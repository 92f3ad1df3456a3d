#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line tool that converts tables in a PDF into an Excel workbook.
//!
//! With just a file argument it runs interactively: pick a delimiter or
//! strategy, preview, choose tables and columns, then export. With
//! `--non-interactive` the same pipeline runs from flags and the config
//! file alone.
//!
//! Uses `indicatif-log-bridge` (via [`pdf2xlsx_cli_utils::init_logger`])
//! so that log lines and the extraction spinner don't interleave.

mod config;
mod interactive;
mod pipeline;

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pdf2xlsx_extract::{ExternalConfig, Ingestor, StrategyConfig};
use pdf2xlsx_table_models::{Delimiter, StrategyKind, TableChoice};

use crate::config::{AppConfig, Overrides};

#[derive(Parser)]
#[command(
    name = "pdf2xlsx",
    about = "Convert tables in a PDF into an Excel workbook",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    convert: ConvertArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the external extractor's runtime can be started
    Probe {
        /// Config file (defaults to `pdf2xlsx.toml` if present)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct ConvertArgs {
    /// PDF file to convert
    file: Option<PathBuf>,

    /// Extraction strategy (`line_heuristic`, `geometry`, `external`)
    #[arg(long)]
    strategy: Option<StrategyKind>,

    /// Delimiter for the line heuristic (`auto`, `comma`, `semicolon`,
    /// `pipe`, `tab`, `double-space`)
    #[arg(long)]
    delimiter: Option<Delimiter>,

    /// Comma-separated columns to export, in order (default: all)
    #[arg(long, value_delimiter = ',')]
    columns: Option<Vec<String>>,

    /// Merge every detected table into one
    #[arg(long, conflicts_with = "table")]
    merge: bool,

    /// Export only the Nth detected table (1-based)
    #[arg(long)]
    table: Option<NonZeroUsize>,

    /// Output workbook path (default: `converted_data.xlsx`)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Seconds before the external extractor is killed
    #[arg(long)]
    timeout: Option<u64>,

    /// Run without prompts, using flags and the config file only
    #[arg(long)]
    non_interactive: bool,

    /// Config file (defaults to `pdf2xlsx.toml` if present)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl ConvertArgs {
    fn overrides(&self) -> Overrides {
        let table_choice = if self.merge {
            Some(TableChoice::Merge)
        } else {
            self.table.map(|n| TableChoice::Single(n.get() - 1))
        };

        Overrides {
            strategy: self.strategy,
            delimiter: self.delimiter,
            timeout_secs: self.timeout,
            table_choice,
            output: self.output.clone(),
            columns: self.columns.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = pdf2xlsx_cli_utils::init_logger();
    let cli = Cli::parse();

    if let Some(Commands::Probe { config }) = cli.command {
        let config = AppConfig::load(config.as_deref())?;
        let external = match config.extraction {
            StrategyConfig::External(external) => external,
            _ => ExternalConfig::default(),
        };
        let program = external.program.clone();

        return match Ingestor::new(StrategyConfig::External(external))
            .check_runtime()
            .await
        {
            Ok(()) => {
                println!("External extractor '{program}' is available.");
                Ok(())
            }
            Err(e) => {
                pipeline::report_extract_error(&e);
                Err(e.into())
            }
        };
    }

    let args = cli.convert;
    let Some(file) = args.file.clone() else {
        return Err("no PDF file given (see --help)".into());
    };

    let mut config = AppConfig::load(args.config.as_deref())?;
    config.apply(args.overrides());
    log::debug!("Resolved config: {config:?}");

    if args.non_interactive {
        pipeline::run(&multi, &file, &config).await
    } else {
        interactive::run(&multi, &file, config).await
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "pdf2xlsx",
            "report.pdf",
            "--strategy",
            "geometry",
            "--columns",
            "City,Name",
            "--table",
            "2",
            "-o",
            "out.xlsx",
        ])
        .unwrap();

        let overrides = cli.convert.overrides();
        assert_eq!(overrides.strategy, Some(StrategyKind::Geometry));
        assert_eq!(
            overrides.columns,
            Some(vec!["City".to_owned(), "Name".to_owned()])
        );
        assert_eq!(overrides.table_choice, Some(TableChoice::Single(1)));
        assert_eq!(overrides.output, Some(PathBuf::from("out.xlsx")));
    }

    #[test]
    fn merge_and_table_conflict() {
        assert!(Cli::try_parse_from(["pdf2xlsx", "a.pdf", "--merge", "--table", "1"]).is_err());
    }

    #[test]
    fn table_numbers_start_at_one() {
        assert!(Cli::try_parse_from(["pdf2xlsx", "a.pdf", "--table", "0"]).is_err());
    }

    #[test]
    fn delimiter_names_parse() {
        let cli =
            Cli::try_parse_from(["pdf2xlsx", "a.pdf", "--delimiter", "double-space"]).unwrap();
        assert_eq!(cli.convert.delimiter, Some(Delimiter::DoubleSpace));
    }

    #[test]
    fn probe_is_a_subcommand() {
        let cli = Cli::try_parse_from(["pdf2xlsx", "probe"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Probe { config: None })));
    }
}
