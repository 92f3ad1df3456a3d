//! Table extraction delegated to an external process.
//!
//! By default this runs `tabula-java`:
//!
//! ```text
//! java -jar tabula.jar --format JSON --pages all --silent <file.pdf>
//! ```
//!
//! The PDF is written to a temporary file whose path is appended as the
//! last argument. The process must print a JSON array of tables on
//! stdout, each shaped like `{"page_number": 1, "data": [[{"text": ".."}]]}`.
//! The process is killed if it outlives the configured timeout.

use std::process::Stdio;
use std::time::Duration;

use pdf2xlsx_table_models::StrategyKind;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::grid::table_from_grid;
use crate::{ExtractError, ExtractedTable, Extraction, TableMetadata};

/// Default time budget for one extraction run.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Settings for the external strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalConfig {
    /// Program to run.
    pub program: String,
    /// Arguments placed before the PDF path.
    pub args: Vec<String>,
    /// Arguments for the availability probe.
    pub probe_args: Vec<String>,
    /// Seconds before the process is killed.
    pub timeout_secs: u64,
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            program: "java".to_owned(),
            args: ["-jar", "tabula.jar", "--format", "JSON", "--pages", "all", "--silent"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            probe_args: vec!["-version".to_owned()],
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ExternalConfig {
    const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn unavailable(&self, reason: impl Into<String>) -> ExtractError {
        ExtractError::RuntimeUnavailable {
            program: self.program.clone(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TabulaTable {
    #[serde(default)]
    page_number: Option<u32>,
    #[serde(default)]
    data: Vec<Vec<TabulaCell>>,
}

#[derive(Debug, Deserialize)]
struct TabulaCell {
    #[serde(default)]
    text: String,
}

/// Runs the configured probe command and checks that it exits cleanly.
///
/// # Errors
///
/// Returns [`ExtractError::RuntimeUnavailable`] if the program cannot be
/// spawned, exits with a failure status, or does not finish in time.
pub async fn check_runtime(config: &ExternalConfig) -> Result<(), ExtractError> {
    log::debug!("Probing {} {:?}", config.program, config.probe_args);

    let output = Command::new(&config.program)
        .args(&config.probe_args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(config.timeout(), output)
        .await
        .map_err(|_| config.unavailable("probe did not finish in time"))?
        .map_err(|e| config.unavailable(e.to_string()))?;

    if !output.status.success() {
        return Err(config.unavailable(format!("probe exited with {}", output.status)));
    }

    Ok(())
}

/// Parses the extractor's JSON output into grids, one table per entry.
///
/// # Errors
///
/// Returns [`ExtractError::Json`] if `json` is not an array of tables.
pub fn parse_tables(json: &str) -> Result<Vec<(Option<u32>, Vec<Vec<String>>)>, ExtractError> {
    let tables: Vec<TabulaTable> = serde_json::from_str(json)?;

    Ok(tables
        .into_iter()
        .map(|table| {
            let grid = table
                .data
                .into_iter()
                .map(|row| row.into_iter().map(|cell| cell.text).collect())
                .collect();
            (table.page_number, grid)
        })
        .collect())
}

/// Builds an [`Extraction`] from the extractor's JSON output.
///
/// # Errors
///
/// Returns [`ExtractError::Json`] for malformed output and
/// [`ExtractError::NoTableFound`] if no table survives.
pub fn tables_from_json(json: &str) -> Result<Extraction, ExtractError> {
    let parsed = parse_tables(json)?;
    let found = parsed.len();
    let mut extraction = Extraction::default();

    for (index, (page, grid)) in parsed.into_iter().enumerate() {
        let Some(built) = table_from_grid(grid) else {
            extraction.warnings.push(format!(
                "Skipped external table {} with no usable data rows",
                index + 1
            ));
            continue;
        };
        if built.dropped_rows > 0 {
            extraction.warnings.push(format!(
                "Excluded {} malformed row(s) from external table {}",
                built.dropped_rows,
                index + 1
            ));
        }
        extraction.tables.push(ExtractedTable {
            table: built.table,
            metadata: TableMetadata {
                strategy: StrategyKind::External,
                page,
                dropped_rows: built.dropped_rows,
            },
        });
    }

    if extraction.tables.is_empty() {
        return Err(ExtractError::no_table(format!(
            "external extractor reported {found} table(s), none with data rows"
        )));
    }

    Ok(extraction)
}

/// Writes `bytes` to a temporary file, runs the external extractor on it,
/// and parses its output.
///
/// # Errors
///
/// Returns [`ExtractError::RuntimeUnavailable`] if the program cannot be
/// spawned, [`ExtractError::Timeout`] if it runs too long,
/// [`ExtractError::Extraction`] if it exits with a failure status, and
/// [`ExtractError::NoTableFound`] if no table survives.
pub async fn extract(bytes: &[u8], config: &ExternalConfig) -> Result<Extraction, ExtractError> {
    let file = tempfile::Builder::new()
        .prefix("pdf2xlsx-")
        .suffix(".pdf")
        .tempfile()?;
    tokio::fs::write(file.path(), bytes).await?;

    log::info!(
        "Running {} {} {}",
        config.program,
        config.args.join(" "),
        file.path().display()
    );

    let child = Command::new(&config.program)
        .args(&config.args)
        .arg(file.path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| config.unavailable(e.to_string()))?;

    let output = tokio::time::timeout(config.timeout(), child.wait_with_output())
        .await
        .map_err(|_| ExtractError::Timeout {
            seconds: config.timeout_secs,
        })??;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtractError::Extraction(format!(
            "{} exited with {}: {}",
            config.program,
            output.status,
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    log::debug!("External extractor produced {} bytes", stdout.len());

    tables_from_json(&stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABULA_JSON: &str = r#"[
        {"extraction_method": "lattice", "page_number": 2, "data": [
            [{"text": "Name"}, {"text": "Age"}],
            [{"text": "Alice"}, {"text": "30"}],
            [{"text": "Bob"}, {"text": "25"}]
        ]},
        {"page_number": 3, "data": [[{"text": "Only a header"}]]}
    ]"#;

    #[test]
    fn tabula_output_becomes_tables() {
        let extraction = tables_from_json(TABULA_JSON).unwrap();

        assert_eq!(extraction.tables.len(), 1);
        let table = &extraction.tables[0];
        assert_eq!(table.table.columns, vec!["Name", "Age"]);
        assert_eq!(table.table.rows[1], vec!["Bob", "25"]);
        assert_eq!(table.metadata.page, Some(2));
        assert_eq!(table.metadata.strategy, StrategyKind::External);
        assert_eq!(extraction.warnings.len(), 1);
    }

    #[test]
    fn empty_output_is_no_table() {
        let err = tables_from_json("[]").unwrap_err();
        assert!(matches!(err, ExtractError::NoTableFound { .. }), "{err}");
    }

    #[test]
    fn malformed_output_is_a_json_error() {
        let err = tables_from_json("Error: Unable to access jarfile").unwrap_err();
        assert!(matches!(err, ExtractError::Json(_)), "{err}");
    }

    #[cfg(unix)]
    fn shell(script: &str, timeout_secs: u64) -> ExternalConfig {
        ExternalConfig {
            program: "sh".to_owned(),
            // `sh -c script name path`: the PDF path lands in `$1`.
            args: vec!["-c".to_owned(), script.to_owned(), "pdf2xlsx".to_owned()],
            probe_args: vec!["-c".to_owned(), "exit 0".to_owned()],
            timeout_secs,
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_the_program_on_a_temp_file() {
        let script = r#"test -s "$1" && printf '%s' '[{"page_number":1,"data":[[{"text":"A"}],[{"text":"1"}]]}]'"#;
        let extraction = extract(b"%PDF-1.4 fake", &shell(script, 10)).await.unwrap();
        assert_eq!(extraction.tables[0].table.rows, vec![vec!["1"]]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_programs_time_out() {
        let err = extract(b"%PDF", &shell("sleep 5", 1)).await.unwrap_err();
        assert!(matches!(err, ExtractError::Timeout { seconds: 1 }), "{err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_programs_report_stderr() {
        let err = extract(b"%PDF", &shell("echo broken >&2; exit 3", 10))
            .await
            .unwrap_err();
        assert!(matches!(&err, ExtractError::Extraction(msg) if msg.contains("broken")), "{err}");
    }

    #[tokio::test]
    async fn missing_program_is_runtime_unavailable() {
        let config = ExternalConfig {
            program: "pdf2xlsx-definitely-not-installed".to_owned(),
            ..ExternalConfig::default()
        };

        let err = check_runtime(&config).await.unwrap_err();
        assert!(matches!(err, ExtractError::RuntimeUnavailable { .. }), "{err}");

        let err = extract(b"%PDF", &config).await.unwrap_err();
        assert!(matches!(err, ExtractError::RuntimeUnavailable { .. }), "{err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn probe_checks_exit_status() {
        assert!(check_runtime(&shell("", 10)).await.is_ok());

        let failing = ExternalConfig {
            probe_args: vec!["-c".to_owned(), "exit 1".to_owned()],
            ..shell("", 10)
        };
        assert!(check_runtime(&failing).await.is_err());
    }
}
