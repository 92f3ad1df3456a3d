#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spreadsheet export.
//!
//! Serializes a [`ProjectedTable`] into a minimal Office Open XML workbook
//! with a single sheet named [`SHEET_NAME`]: a bold header row followed by
//! one row per data row, with no index column.

mod parts;
pub mod sheet;

use std::io::{Cursor, Seek, Write};

use pdf2xlsx_table_models::ProjectedTable;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub use pdf2xlsx_table_models::{DEFAULT_OUTPUT_FILE_NAME, SHEET_NAME, XLSX_MIME_TYPE};

/// Errors that can occur while writing a workbook.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Writing the zip container failed.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Generating sheet XML failed.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes `table` as an xlsx workbook into `out`.
///
/// # Errors
///
/// Returns [`ExportError`] if any part of the archive cannot be written.
pub fn write_workbook<W: Write + Seek>(out: W, table: &ProjectedTable) -> Result<W, ExportError> {
    let mut zip = ZipWriter::new(out);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let fixed_parts = [
        (parts::CONTENT_TYPES_PATH, parts::CONTENT_TYPES.to_owned()),
        (parts::ROOT_RELS_PATH, parts::ROOT_RELS.to_owned()),
        (parts::APP_PROPS_PATH, parts::app_props()),
        (parts::CORE_PROPS_PATH, parts::CORE_PROPS.to_owned()),
        (parts::WORKBOOK_PATH, parts::workbook()),
        (parts::WORKBOOK_RELS_PATH, parts::WORKBOOK_RELS.to_owned()),
        (parts::STYLES_PATH, parts::STYLES.to_owned()),
    ];
    for (path, content) in fixed_parts {
        zip.start_file(path, options)?;
        zip.write_all(content.as_bytes())?;
    }

    zip.start_file(parts::SHEET_PATH, options)?;
    sheet::write_sheet(&mut zip, table)?;

    Ok(zip.finish()?)
}

/// Serializes `table` into the bytes of an xlsx workbook.
///
/// A table with columns but no rows still produces a valid workbook
/// holding only the header row.
///
/// # Errors
///
/// Returns [`ExportError`] if the workbook cannot be written.
pub fn export(table: &ProjectedTable) -> Result<Vec<u8>, ExportError> {
    let bytes = write_workbook(Cursor::new(Vec::new()), table)?.into_inner();

    log::info!(
        "Exported {} row(s) x {} column(s) to sheet '{SHEET_NAME}' ({} bytes)",
        table.rows.len(),
        table.columns.len(),
        bytes.len()
    );

    Ok(bytes)
}
