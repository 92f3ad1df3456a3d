#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! PDF table extraction.
//!
//! Turns the bytes of a PDF into one or more [`RawTable`]s using one of
//! three interchangeable strategies:
//!
//! - [`line_heuristic`]: pure-Rust text extraction ([`pdf_extract`]) with
//!   each line split on a delimiter.
//! - [`geometry`]: glyph positions from [`pdf_extract`] grouped into lines,
//!   cells, and table regions.
//! - [`external`]: table detection delegated to an external process (by
//!   default `tabula-java`) under a bounded timeout.
//!
//! The primary entry point is [`Ingestor`], configured with a
//! [`StrategyConfig`].

pub mod external;
pub mod geometry;
pub mod grid;
pub mod line_heuristic;

use pdf2xlsx_table_models::{RawTable, StrategyKind};
use serde::{Deserialize, Serialize};

pub use external::ExternalConfig;
pub use geometry::GeometryConfig;
pub use line_heuristic::LineHeuristicConfig;

/// Errors specific to PDF table extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The PDF library or external extractor failed.
    #[error("PDF extraction error: {0}")]
    Extraction(String),

    /// The external extraction runtime could not be started.
    #[error("External extractor '{program}' is unavailable: {reason}")]
    RuntimeUnavailable {
        /// Program that was probed or spawned.
        program: String,
        /// Why it could not be used.
        reason: String,
    },

    /// The document was read but no valid table survived filtering.
    #[error("No table found: {reason}")]
    NoTableFound {
        /// What the strategy found instead.
        reason: String,
    },

    /// The external extractor exceeded its time budget and was killed.
    #[error("External extractor timed out after {seconds}s")]
    Timeout {
        /// The configured budget.
        seconds: u64,
    },

    /// The auto-detect split pattern failed to compile.
    #[error("Invalid regex pattern: {0}")]
    Regex(#[from] regex::Error),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The external extractor produced output that is not valid JSON.
    #[error("Invalid extractor output: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExtractError {
    /// Builds a [`Self::NoTableFound`] from any displayable reason.
    #[must_use]
    pub fn no_table(reason: impl Into<String>) -> Self {
        Self::NoTableFound {
            reason: reason.into(),
        }
    }

    /// A human-readable suggestion for recovering from this error.
    #[must_use]
    pub const fn hint(&self) -> &'static str {
        match self {
            Self::Extraction(_) | Self::Io(_) | Self::Regex(_) => {
                "For best results, convert the PDF to CSV or Excel first, or use a PDF with a \
                 clear table structure. Image-based or encrypted PDFs are not supported."
            }
            Self::RuntimeUnavailable { .. } => {
                "Install the external runtime (e.g. a Java JRE and tabula.jar) or choose the \
                 line_heuristic or geometry strategy."
            }
            Self::NoTableFound { .. } => {
                "Try a different delimiter or extraction strategy, or use a PDF with clear \
                 column headers."
            }
            Self::Timeout { .. } => {
                "Increase the extraction timeout or try the geometry strategy on large documents."
            }
            Self::Json(_) => "Check that the external extractor is configured to emit JSON.",
        }
    }
}

/// Runs a `pdf_extract` call, turning both its error and any panic it
/// raises into [`ExtractError::Extraction`]. The library panics on some
/// malformed documents instead of returning an error.
pub(crate) fn guard_pdf<T, E: std::fmt::Display>(
    what: &str,
    call: impl FnOnce() -> Result<T, E>,
) -> Result<T, ExtractError> {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(call)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ExtractError::Extraction(format!("{what}: {e}"))),
        Err(_) => Err(ExtractError::Extraction(format!(
            "{what}: the PDF library panicked on this document"
        ))),
    }
}

/// Where a table came from and what was discarded while building it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Strategy that produced the table.
    pub strategy: StrategyKind,
    /// 1-based page the table was found on, when known.
    pub page: Option<u32>,
    /// Rows excluded because their width did not match the header.
    pub dropped_rows: usize,
}

/// One table produced by an extraction strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTable {
    /// The table itself.
    pub table: RawTable,
    /// Provenance and filtering details.
    pub metadata: TableMetadata,
}

/// A successful extraction: at least one table plus any non-fatal
/// warnings (skipped regions, excluded rows).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Extracted tables in document order.
    pub tables: Vec<ExtractedTable>,
    /// Non-fatal problems encountered along the way.
    pub warnings: Vec<String>,
}

impl Extraction {
    /// Clones out the bare tables, in document order.
    #[must_use]
    pub fn raw_tables(&self) -> Vec<RawTable> {
        self.tables.iter().map(|t| t.table.clone()).collect()
    }

    /// Total number of data rows across all tables.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|t| t.table.len()).sum()
    }
}

/// Which strategy to use, with its settings.
///
/// Tagged by `type` in TOML:
///
/// ```toml
/// type = "line_heuristic"
/// delimiter = "pipe"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// Split extracted text lines on a delimiter.
    LineHeuristic(LineHeuristicConfig),
    /// Detect tables from glyph positions.
    Geometry(GeometryConfig),
    /// Delegate to an external process.
    External(ExternalConfig),
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::LineHeuristic(LineHeuristicConfig::default())
    }
}

impl StrategyConfig {
    /// Default settings for the given strategy kind.
    #[must_use]
    pub fn for_kind(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::LineHeuristic => Self::LineHeuristic(LineHeuristicConfig::default()),
            StrategyKind::Geometry => Self::Geometry(GeometryConfig::default()),
            StrategyKind::External => Self::External(ExternalConfig::default()),
        }
    }

    /// The kind of strategy this config selects.
    #[must_use]
    pub const fn kind(&self) -> StrategyKind {
        match self {
            Self::LineHeuristic(_) => StrategyKind::LineHeuristic,
            Self::Geometry(_) => StrategyKind::Geometry,
            Self::External(_) => StrategyKind::External,
        }
    }
}

/// Runs the configured extraction strategy over PDF bytes.
#[derive(Debug, Clone, Default)]
pub struct Ingestor {
    strategy: StrategyConfig,
}

impl Ingestor {
    /// Creates an `Ingestor` for the given strategy.
    #[must_use]
    pub const fn new(strategy: StrategyConfig) -> Self {
        Self { strategy }
    }

    /// The configured strategy.
    #[must_use]
    pub const fn strategy(&self) -> &StrategyConfig {
        &self.strategy
    }

    /// Mutable access to the configured strategy (e.g. to change the
    /// delimiter between runs).
    pub const fn strategy_mut(&mut self) -> &mut StrategyConfig {
        &mut self.strategy
    }

    /// Verifies that everything the strategy needs at runtime is present.
    ///
    /// Only the external strategy has an environment dependency; the
    /// others always succeed.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::RuntimeUnavailable`] if the external runtime
    /// cannot be started.
    pub async fn check_runtime(&self) -> Result<(), ExtractError> {
        match &self.strategy {
            StrategyConfig::External(config) => external::check_runtime(config).await,
            StrategyConfig::LineHeuristic(_) | StrategyConfig::Geometry(_) => Ok(()),
        }
    }

    /// Extracts tables from `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if the bytes are not a readable PDF, the
    /// strategy fails, or no table survives filtering.
    pub async fn extract(&self, bytes: &[u8]) -> Result<Extraction, ExtractError> {
        if !bytes.starts_with(b"%PDF") {
            return Err(ExtractError::Extraction(
                "input does not look like a PDF (missing %PDF header)".to_owned(),
            ));
        }

        log::debug!(
            "Extracting tables from {} bytes using {} strategy",
            bytes.len(),
            self.strategy.kind()
        );

        let extraction = match &self.strategy {
            StrategyConfig::LineHeuristic(config) => line_heuristic::extract(bytes, config)?,
            StrategyConfig::Geometry(config) => geometry::extract(bytes, config)?,
            StrategyConfig::External(config) => external::extract(bytes, config).await?,
        };

        for warning in &extraction.warnings {
            log::warn!("{warning}");
        }
        log::info!(
            "Extracted {} table(s) with {} row(s)",
            extraction.tables.len(),
            extraction.row_count()
        );

        Ok(extraction)
    }
}
