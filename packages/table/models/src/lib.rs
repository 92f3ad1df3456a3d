#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared table types for the PDF-to-spreadsheet pipeline.
//!
//! This crate contains only data types and simple conversions. It has no
//! heavyweight dependencies (no PDF parsing, no I/O). Every stage of the
//! pipeline speaks in terms of [`RawTable`] (what extraction produced) and
//! [`ProjectedTable`] (what the user chose to export).

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// MIME type of the exported spreadsheet.
pub const XLSX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// File name the exported spreadsheet is offered under.
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "converted_data.xlsx";

/// Name of the single worksheet in the exported spreadsheet.
pub const SHEET_NAME: &str = "Data";

/// Number of rows shown in table previews.
pub const PREVIEW_ROWS: usize = 10;

/// Field delimiter used by the line-heuristic extraction strategy.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Delimiter {
    /// Split on runs of two or more whitespace characters.
    #[default]
    Auto,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `|`
    Pipe,
    /// `\t`
    Tab,
    /// Exactly two spaces.
    DoubleSpace,
}

impl Delimiter {
    /// Every delimiter choice, in the order they are offered to the user.
    pub const ALL: &[Self] = &[
        Self::Auto,
        Self::Comma,
        Self::Semicolon,
        Self::Pipe,
        Self::Tab,
        Self::DoubleSpace,
    ];

    /// Returns the literal separator, or `None` for [`Self::Auto`].
    #[must_use]
    pub const fn separator(self) -> Option<&'static str> {
        match self {
            Self::Auto => None,
            Self::Comma => Some(","),
            Self::Semicolon => Some(";"),
            Self::Pipe => Some("|"),
            Self::Tab => Some("\t"),
            Self::DoubleSpace => Some("  "),
        }
    }

    /// Human-readable label for pickers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Auto => "Auto-detect",
            Self::Comma => "','",
            Self::Semicolon => "';'",
            Self::Pipe => "'|'",
            Self::Tab => "'\\t' (tab)",
            Self::DoubleSpace => "'  ' (double space)",
        }
    }
}

/// Which extraction strategy produced a table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StrategyKind {
    /// Delimiter splitting of extracted text lines.
    LineHeuristic,
    /// Table regions detected from glyph positions.
    Geometry,
    /// Tables detected by an external process.
    External,
}

/// How multiple candidate tables are reduced to one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableChoice {
    /// Concatenate every table, taking the union of their columns.
    #[default]
    Merge,
    /// Keep only the table at this (0-based) index.
    Single(usize),
}

/// A table as extracted from one region of the source document.
///
/// Column names are not necessarily unique until the table has been
/// cleaned. Once validated, every row has exactly one cell per column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    /// Ordered column names.
    pub columns: Vec<String>,
    /// Ordered rows of string cells.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Creates a table from its columns and rows.
    #[must_use]
    pub const fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// Number of columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the index of the first column with the given name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Drops every row whose width differs from the header's, returning how
    /// many rows were dropped.
    pub fn retain_valid_rows(&mut self) -> usize {
        let width = self.width();
        let before = self.rows.len();
        self.rows.retain(|row| row.len() == width);
        before - self.rows.len()
    }

    /// Whether every row has exactly one cell per column.
    #[must_use]
    pub fn is_rectangular(&self) -> bool {
        let width = self.width();
        self.rows.iter().all(|row| row.len() == width)
    }

    /// Projects the table onto `order`, keeping the given column order.
    ///
    /// Names not present in the table are skipped.
    #[must_use]
    pub fn project(&self, order: &[String]) -> ProjectedTable {
        let indices: Vec<usize> = order
            .iter()
            .filter_map(|name| self.column_index(name))
            .collect();

        let columns = indices.iter().map(|&i| self.columns[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                indices
                    .iter()
                    .map(|&i| row.get(i).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();

        ProjectedTable { columns, rows }
    }
}

/// A [`RawTable`] restricted to a chosen subset of columns, in the chosen
/// order. Derived on demand and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedTable {
    /// Column names in export order.
    pub columns: Vec<String>,
    /// Rows with cells in export order.
    pub rows: Vec<Vec<String>>,
}

impl ProjectedTable {
    /// Renders the first `limit` rows as an aligned plain-text table.
    #[must_use]
    pub fn preview(&self, limit: usize) -> String {
        render_preview(&self.columns, &self.rows, limit)
    }
}

/// Renders `columns` and the first `limit` of `rows` as an aligned
/// plain-text table with a dashed separator under the header.
#[must_use]
pub fn render_preview(columns: &[String], rows: &[Vec<String>], limit: usize) -> String {
    let shown = &rows[..rows.len().min(limit)];

    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in shown {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let mut out = String::new();
    let render_line = |out: &mut String, cells: &[String]| {
        let line = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{cell:<w$}"))
            .collect::<Vec<_>>()
            .join("  ");
        let _ = writeln!(out, "{}", line.trim_end());
    };

    render_line(&mut out, columns);
    let rule: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
    let _ = writeln!(out, "{}", "-".repeat(rule));
    for row in shown {
        render_line(&mut out, row);
    }

    out
}
