//! Run configuration: an optional TOML file overlaid with command-line
//! flags.
//!
//! ```toml
//! table_choice = "merge"          # or { single = 0 }
//! output = "converted_data.xlsx"
//! columns = ["Name", "City"]
//!
//! [extraction]
//! type = "geometry"               # line_heuristic | geometry | external
//! column_gap = 1.5
//! ```

use std::path::{Path, PathBuf};

use pdf2xlsx_extract::StrategyConfig;
use pdf2xlsx_table_models::{DEFAULT_OUTPUT_FILE_NAME, Delimiter, StrategyKind, TableChoice};
use serde::{Deserialize, Serialize};

/// Config file picked up from the working directory when `--config` is
/// not given.
pub const DEFAULT_CONFIG_FILE: &str = "pdf2xlsx.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Everything a conversion run needs besides the PDF itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Extraction strategy and its settings.
    pub extraction: StrategyConfig,
    /// Merge every candidate table or keep one.
    pub table_choice: TableChoice,
    /// Where to write the workbook.
    pub output: Option<PathBuf>,
    /// Columns to export, in order. `None` exports every column.
    pub columns: Option<Vec<String>>,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub strategy: Option<StrategyKind>,
    pub delimiter: Option<Delimiter>,
    pub timeout_secs: Option<u64>,
    pub table_choice: Option<TableChoice>,
    pub output: Option<PathBuf>,
    pub columns: Option<Vec<String>>,
}

impl AppConfig {
    /// Parses a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`toml::de::Error`] if `text` is not a valid config.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Loads the config from `path`, or from [`DEFAULT_CONFIG_FILE`] if it
    /// exists, or falls back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicitly given file cannot be read,
    /// or any config file fails to parse.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    log::debug!("No {DEFAULT_CONFIG_FILE} found, using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };

        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config =
            Self::from_toml(&text).map_err(|source| ConfigError::Parse { path: path.clone(), source })?;

        log::info!(
            "Loaded config from {} ({} strategy)",
            path.display(),
            config.extraction.kind()
        );
        Ok(config)
    }

    /// Applies command-line overrides.
    ///
    /// Choosing a different strategy resets its settings to defaults.
    /// Settings that do not apply to the resulting strategy are ignored
    /// with a warning.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(kind) = overrides.strategy
            && kind != self.extraction.kind()
        {
            self.extraction = StrategyConfig::for_kind(kind);
        }

        if let Some(delimiter) = overrides.delimiter {
            match &mut self.extraction {
                StrategyConfig::LineHeuristic(config) => config.delimiter = delimiter,
                other => log::warn!(
                    "--delimiter only applies to the line_heuristic strategy, not {}",
                    other.kind()
                ),
            }
        }

        if let Some(timeout_secs) = overrides.timeout_secs {
            match &mut self.extraction {
                StrategyConfig::External(config) => config.timeout_secs = timeout_secs,
                other => log::warn!(
                    "--timeout only applies to the external strategy, not {}",
                    other.kind()
                ),
            }
        }

        if let Some(choice) = overrides.table_choice {
            self.table_choice = choice;
        }
        if overrides.output.is_some() {
            self.output = overrides.output;
        }
        if overrides.columns.is_some() {
            self.columns = overrides.columns;
        }
    }

    /// The output path, defaulting to [`DEFAULT_OUTPUT_FILE_NAME`].
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use pdf2xlsx_extract::{ExternalConfig, GeometryConfig, LineHeuristicConfig};

    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.output_path(), PathBuf::from("converted_data.xlsx"));
        assert_eq!(config.extraction.kind(), StrategyKind::LineHeuristic);
    }

    #[test]
    fn parses_every_section() {
        let config = AppConfig::from_toml(
            r#"
            table_choice = { single = 1 }
            output = "out/report.xlsx"
            columns = ["City", "Name"]

            [extraction]
            type = "geometry"
            column_gap = 2.0
            "#,
        )
        .unwrap();

        assert_eq!(config.table_choice, TableChoice::Single(1));
        assert_eq!(config.output_path(), PathBuf::from("out/report.xlsx"));
        assert_eq!(config.columns, Some(vec!["City".to_owned(), "Name".to_owned()]));
        assert_eq!(
            config.extraction,
            StrategyConfig::Geometry(GeometryConfig {
                column_gap: 2.0,
                ..GeometryConfig::default()
            })
        );
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        assert!(AppConfig::from_toml("[extraction]\ntype = \"ocr\"").is_err());
    }

    #[test]
    fn overrides_win_over_file_values() {
        let mut config = AppConfig::from_toml(
            r#"
            table_choice = "merge"
            [extraction]
            type = "line_heuristic"
            delimiter = "comma"
            "#,
        )
        .unwrap();

        config.apply(Overrides {
            delimiter: Some(Delimiter::Pipe),
            table_choice: Some(TableChoice::Single(0)),
            output: Some(PathBuf::from("x.xlsx")),
            ..Overrides::default()
        });

        assert_eq!(
            config.extraction,
            StrategyConfig::LineHeuristic(LineHeuristicConfig {
                delimiter: Delimiter::Pipe
            })
        );
        assert_eq!(config.table_choice, TableChoice::Single(0));
        assert_eq!(config.output_path(), PathBuf::from("x.xlsx"));
    }

    #[test]
    fn switching_strategy_resets_its_settings() {
        let mut config = AppConfig::default();
        config.apply(Overrides {
            strategy: Some(StrategyKind::External),
            timeout_secs: Some(5),
            delimiter: Some(Delimiter::Tab),
            ..Overrides::default()
        });

        assert_eq!(
            config.extraction,
            StrategyConfig::External(ExternalConfig {
                timeout_secs: 5,
                ..ExternalConfig::default()
            })
        );
    }

    #[test]
    fn same_strategy_keeps_file_settings() {
        let mut config = AppConfig::from_toml("[extraction]\ntype = \"geometry\"\nmin_columns = 3")
            .unwrap();
        config.apply(Overrides {
            strategy: Some(StrategyKind::Geometry),
            ..Overrides::default()
        });

        let StrategyConfig::Geometry(geometry) = config.extraction else {
            panic!("expected geometry config");
        };
        assert_eq!(geometry.min_columns, 3);
    }

    #[test]
    fn load_reads_an_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "output = \"from-file.xlsx\"").unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.output_path(), PathBuf::from("from-file.xlsx"));
    }

    #[test]
    fn load_reports_a_missing_explicit_file() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/pdf2xlsx.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }), "{err}");
    }
}
