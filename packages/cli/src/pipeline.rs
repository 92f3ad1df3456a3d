//! Steps shared by the interactive and non-interactive front ends, plus
//! the non-interactive run itself.

use std::collections::BTreeSet;
use std::path::Path;

use pdf2xlsx_cli_utils::{MultiProgress, Spinner};
use pdf2xlsx_extract::{ExtractError, Extraction, Ingestor};
use pdf2xlsx_table::{Session, TableError};
use pdf2xlsx_table_models::PREVIEW_ROWS;

use crate::config::AppConfig;

/// Prints an extraction error together with its recovery hint.
pub fn report_extract_error(error: &ExtractError) {
    eprintln!("Error: {error}");
    eprintln!("Tip: {}", error.hint());
}

/// Runs extraction behind a spinner.
///
/// # Errors
///
/// Propagates the strategy's [`ExtractError`].
pub async fn extract(
    multi: &MultiProgress,
    ingestor: &Ingestor,
    bytes: &[u8],
) -> Result<Extraction, ExtractError> {
    let spinner = Spinner::start(
        multi,
        &format!("Extracting tables ({} strategy)", ingestor.strategy().kind()),
    );

    let result = ingestor.extract(bytes).await;
    match &result {
        Ok(extraction) => spinner.finish(&format!(
            "Found {} table(s) with {} row(s)",
            extraction.tables.len(),
            extraction.row_count()
        )),
        Err(_) => spinner.finish_and_clear(),
    }
    result
}

/// Prints the candidate tables found by an extraction.
pub fn print_extraction(extraction: &Extraction) {
    for (index, table) in extraction.tables.iter().enumerate() {
        let page = table
            .metadata
            .page
            .map_or_else(String::new, |page| format!(" on page {page}"));
        println!(
            "  Table {}{page}: {} row(s) x {} column(s)",
            index + 1,
            table.table.len(),
            table.table.width()
        );
    }
}

/// Prints the projected table preview with totals.
pub fn print_preview(session: &Session) {
    let projected = session.projected();
    println!();
    println!("{}", projected.preview(PREVIEW_ROWS));
    println!(
        "({} row(s) x {} column(s), showing up to {PREVIEW_ROWS})",
        projected.rows.len(),
        projected.columns.len()
    );
    println!();
}

/// Exports the session's projected table to `path`.
///
/// # Errors
///
/// Returns an error if the workbook cannot be built or written.
pub async fn write_output(session: &Session, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let projected = session.projected();
    let bytes = pdf2xlsx_export::export(&projected)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, &bytes).await?;

    println!(
        "Wrote {} row(s) x {} column(s) to {}",
        projected.rows.len(),
        projected.columns.len(),
        path.display()
    );
    Ok(())
}

/// Selects exactly `columns` and orders them as given. On error the
/// session is left unchanged.
///
/// # Errors
///
/// Returns [`TableError::DuplicateColumn`] if a column is listed twice, or
/// [`TableError::UnknownColumn`] if it does not exist.
pub fn select_in_order(session: &mut Session, columns: &[String]) -> Result<(), TableError> {
    let mut seen = BTreeSet::new();
    if let Some(duplicate) = columns.iter().find(|name| !seen.insert(name.as_str())) {
        return Err(TableError::DuplicateColumn(duplicate.clone()));
    }

    let mut next = session.clone();
    next.select_subset(columns)?;
    for (position, name) in columns.iter().enumerate() {
        next.set_order(position, name)?;
    }
    *session = next;
    Ok(())
}

/// Converts `file` using only the resolved configuration.
///
/// # Errors
///
/// Returns an error if the PDF cannot be read, the runtime is missing,
/// extraction finds no table, a configured column does not exist, or the
/// workbook cannot be written.
pub async fn run(
    multi: &MultiProgress,
    file: &Path,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = tokio::fs::read(file).await?;
    let ingestor = Ingestor::new(config.extraction.clone());

    let extraction = match ingestor.check_runtime().await {
        Ok(()) => extract(multi, &ingestor, &bytes).await,
        Err(e) => Err(e),
    };
    let extraction = match extraction {
        Ok(extraction) => extraction,
        Err(e) => {
            report_extract_error(&e);
            return Err(e.into());
        }
    };
    print_extraction(&extraction);

    let mut session = Session::new(extraction.raw_tables(), config.table_choice)?;
    if let Some(warning) = session.warning() {
        println!("Warning: {warning}");
    }

    match &config.columns {
        Some(columns) => select_in_order(&mut session, columns)?,
        None => session.select_all(),
    }

    print_preview(&session);
    write_output(&session, &config.output_path()).await
}
