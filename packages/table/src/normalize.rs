//! Header cleaning, empty-row/column removal, and table combination.
//!
//! Extraction strategies hand over tables whose headers may contain
//! blanks or duplicates and whose bodies may contain padding rows and
//! columns. This module turns them into well-formed [`RawTable`]s and, when
//! several candidates were found, reduces them to one.

use std::collections::BTreeSet;
use std::fmt;

use pdf2xlsx_table_models::{RawTable, TableChoice};

use crate::TableError;

/// Builds the synthetic name given to a blank header at `index` (0-based).
#[must_use]
pub fn synthetic_column_name(index: usize) -> String {
    format!("Column_{}", index + 1)
}

/// Trims header names, renames blanks to `Column_N`, and makes duplicates
/// unique by suffixing `_2`, `_3`, and so on.
#[must_use]
pub fn clean_headers(names: &[String]) -> Vec<String> {
    let trimmed: Vec<String> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let name = name.trim();
            if name.is_empty() {
                synthetic_column_name(i)
            } else {
                name.to_owned()
            }
        })
        .collect();

    // Reserve every original name first so a generated suffix never
    // collides with a name that appears later in the header.
    let mut taken: BTreeSet<String> = trimmed.iter().cloned().collect();
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut cleaned = Vec::with_capacity(trimmed.len());

    for name in &trimmed {
        if seen.insert(name.as_str()) {
            cleaned.push(name.clone());
            continue;
        }

        let mut suffix = 2;
        let unique = loop {
            let candidate = format!("{name}_{suffix}");
            if !taken.contains(&candidate) {
                break candidate;
            }
            suffix += 1;
        };
        log::debug!("Renamed duplicate column '{name}' to '{unique}'");
        taken.insert(unique.clone());
        cleaned.push(unique);
    }

    cleaned
}

/// Removes rows and columns in which every cell is blank.
///
/// A column counts as blank only if its header is blank too, so a named
/// column with no values survives. Returns the number of rows and columns
/// removed.
pub fn drop_empty(table: &mut RawTable) -> (usize, usize) {
    let rows_before = table.rows.len();
    table
        .rows
        .retain(|row| row.iter().any(|cell| !cell.trim().is_empty()));
    let dropped_rows = rows_before - table.rows.len();

    let keep: Vec<bool> = (0..table.width())
        .map(|i| {
            !table.columns[i].trim().is_empty()
                || table
                    .rows
                    .iter()
                    .any(|row| row.get(i).is_some_and(|cell| !cell.trim().is_empty()))
        })
        .collect();
    let dropped_columns = keep.iter().filter(|&&k| !k).count();

    if dropped_columns > 0 {
        table.columns = retain_indices(&table.columns, &keep);
        for row in &mut table.rows {
            *row = retain_indices(row, &keep);
        }
    }

    (dropped_rows, dropped_columns)
}

fn retain_indices(cells: &[String], keep: &[bool]) -> Vec<String> {
    cells
        .iter()
        .zip(keep)
        .filter(|(_, k)| **k)
        .map(|(cell, _)| cell.clone())
        .collect()
}

/// Cleans a freshly extracted table in place: blank rows/columns are
/// dropped first, then headers are cleaned, then ragged rows are excluded.
///
/// Returns the number of ragged rows that were excluded.
pub fn normalize(table: &mut RawTable) -> usize {
    let (rows, columns) = drop_empty(table);
    if rows > 0 || columns > 0 {
        log::debug!("Dropped {rows} blank row(s) and {columns} blank column(s)");
    }
    table.columns = clean_headers(&table.columns);
    let ragged = table.retain_valid_rows();
    if ragged > 0 {
        log::warn!("Excluded {ragged} row(s) that did not match the header width");
    }
    ragged
}

/// A degraded but successful merge the caller should be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeWarning {
    /// The candidate tables had different column sets, so their union was
    /// used and missing cells were left empty.
    ColumnsDiffer {
        /// Every column of the merged table.
        union: Vec<String>,
    },
}

impl fmt::Display for MergeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ColumnsDiffer { union } => write!(
                f,
                "Tables have different columns; merged using the union of {} column(s). \
                 Cells missing from a table were left empty.",
                union.len()
            ),
        }
    }
}

/// The outcome of reducing candidate tables to one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combined {
    /// The single resulting table.
    pub table: RawTable,
    /// Set when the merge had to fall back to a column union.
    pub warning: Option<MergeWarning>,
}

/// Concatenates `tables` in order.
///
/// If every table has the same column set, rows are concatenated under the
/// first table's column order. Otherwise the union of all columns (in
/// first-seen order) is used, absent cells become empty strings, and a
/// [`MergeWarning`] is returned alongside the table.
#[must_use]
pub fn merge(tables: &[RawTable]) -> Combined {
    let mut union: Vec<String> = Vec::new();
    let mut known: BTreeSet<&str> = BTreeSet::new();
    for table in tables {
        for column in &table.columns {
            if known.insert(column.as_str()) {
                union.push(column.clone());
            }
        }
    }

    let identical = tables.iter().all(|table| {
        table.width() == union.len()
            && table.columns.iter().collect::<BTreeSet<_>>().len() == union.len()
    });

    let mut rows = Vec::with_capacity(tables.iter().map(RawTable::len).sum());
    for table in tables {
        let mapping: Vec<Option<usize>> = union.iter().map(|c| table.column_index(c)).collect();
        for row in &table.rows {
            rows.push(
                mapping
                    .iter()
                    .map(|idx| idx.and_then(|i| row.get(i)).cloned().unwrap_or_default())
                    .collect(),
            );
        }
    }

    log::debug!(
        "Merged {} table(s) into {} row(s) x {} column(s)",
        tables.len(),
        rows.len(),
        union.len()
    );

    let warning = (!identical).then(|| MergeWarning::ColumnsDiffer {
        union: union.clone(),
    });

    Combined {
        table: RawTable::new(union, rows),
        warning,
    }
}

/// Reduces candidate tables to one according to the caller's `choice`.
///
/// # Errors
///
/// * [`TableError::Empty`] if `tables` is empty.
/// * [`TableError::UnknownTable`] if `choice` picks an index that does not
///   exist.
pub fn combine(tables: &[RawTable], choice: TableChoice) -> Result<Combined, TableError> {
    if tables.is_empty() {
        return Err(TableError::Empty);
    }

    match choice {
        TableChoice::Merge if tables.len() == 1 => Ok(Combined {
            table: tables[0].clone(),
            warning: None,
        }),
        TableChoice::Merge => Ok(merge(tables)),
        TableChoice::Single(index) => {
            tables
                .get(index)
                .cloned()
                .map(|table| Combined {
                    table,
                    warning: None,
                })
                .ok_or(TableError::UnknownTable {
                    index,
                    count: tables.len(),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|&v| v.to_owned()).collect()
    }

    fn table(columns: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(strings(columns), rows.iter().map(|r| strings(r)).collect())
    }

    #[test]
    fn clean_headers_renames_blanks_and_duplicates() {
        let cleaned = clean_headers(&strings(&[" Name ", "", "Name", "Age", "Name"]));
        assert_eq!(cleaned, vec!["Name", "Column_2", "Name_2", "Age", "Name_3"]);
    }

    #[test]
    fn clean_headers_skips_suffixes_already_taken() {
        let cleaned = clean_headers(&strings(&["A", "A", "A_2"]));
        assert_eq!(cleaned, vec!["A", "A_3", "A_2"]);
    }

    #[test]
    fn drop_empty_removes_blank_rows_and_unnamed_blank_columns() {
        let mut t = table(
            &["Name", "", "Age", "Notes"],
            &[
                &["Alice", "", "30", ""],
                &["", " ", "", ""],
                &["Bob", "", "25", ""],
            ],
        );

        assert_eq!(drop_empty(&mut t), (1, 1));
        assert_eq!(t.columns, vec!["Name", "Age", "Notes"]);
        assert_eq!(t.rows, vec![strings(&["Alice", "30", ""]), strings(&["Bob", "25", ""])]);
    }

    #[test]
    fn normalize_excludes_ragged_rows() {
        let mut t = table(&["A", "B"], &[&["1", "2"], &["3"], &["4", "5"]]);
        assert_eq!(normalize(&mut t), 1);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn merging_identical_columns_sums_rows() {
        let a = table(&["Name", "Age"], &[&["Alice", "30"], &["Bob", "25"]]);
        let b = table(&["Age", "Name"], &[&["41", "Carol"]]);

        let combined = combine(&[a, b], TableChoice::Merge).unwrap();
        assert!(combined.warning.is_none());
        assert_eq!(combined.table.columns, vec!["Name", "Age"]);
        assert_eq!(combined.table.len(), 3);
        assert_eq!(combined.table.rows[2], strings(&["Carol", "41"]));
    }

    #[test]
    fn merging_different_columns_takes_union_with_warning() {
        let a = table(&["Name", "Age"], &[&["Alice", "30"]]);
        let b = table(&["Name", "City"], &[&["Bob", "Rome"]]);

        let combined = combine(&[a, b], TableChoice::Merge).unwrap();
        assert_eq!(combined.table.columns, vec!["Name", "Age", "City"]);
        assert_eq!(
            combined.table.rows,
            vec![strings(&["Alice", "30", ""]), strings(&["Bob", "", "Rome"])]
        );
        assert_eq!(
            combined.warning,
            Some(MergeWarning::ColumnsDiffer {
                union: strings(&["Name", "Age", "City"])
            })
        );
    }

    #[test]
    fn single_choice_picks_one_table() {
        let a = table(&["A"], &[&["1"]]);
        let b = table(&["B"], &[&["2"]]);

        let combined = combine(&[a, b.clone()], TableChoice::Single(1)).unwrap();
        assert_eq!(combined.table, b);
        assert!(combined.warning.is_none());
    }

    #[test]
    fn single_choice_out_of_range_is_rejected() {
        let a = table(&["A"], &[&["1"]]);
        assert_eq!(
            combine(&[a], TableChoice::Single(3)),
            Err(TableError::UnknownTable { index: 3, count: 1 })
        );
    }

    #[test]
    fn combining_nothing_is_an_error() {
        assert_eq!(combine(&[], TableChoice::Merge), Err(TableError::Empty));
    }
}
