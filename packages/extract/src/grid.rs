//! Conversion of raw cell grids into [`RawTable`]s.
//!
//! Both the geometry and external strategies end up with a grid of cell
//! strings per detected table. The first row is the header; everything
//! else is data.

use pdf2xlsx_table::normalize::{clean_headers, drop_empty};
use pdf2xlsx_table_models::RawTable;

/// A table built from a grid, with how many ragged rows were excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridTable {
    /// The resulting table.
    pub table: RawTable,
    /// Rows excluded because their width differed from the header's.
    pub dropped_rows: usize,
}

/// Builds a table from `grid`, treating the first row as the header.
///
/// Cells are trimmed, rows whose width differs from the header's are
/// excluded, all-blank rows and columns are dropped, and blank header
/// cells become `Column_N`. Returns `None` if no header or no data row
/// survives.
#[must_use]
pub fn table_from_grid(grid: Vec<Vec<String>>) -> Option<GridTable> {
    let mut rows = grid.into_iter().map(|row| {
        row.into_iter()
            .map(|cell| cell.trim().to_owned())
            .collect::<Vec<_>>()
    });

    let header = rows.next()?;
    let mut table = RawTable::new(header, rows.collect());

    let dropped_rows = table.retain_valid_rows();
    drop_empty(&mut table);
    table.columns = clean_headers(&table.columns);

    if table.width() == 0 || table.is_empty() {
        return None;
    }

    Some(GridTable {
        table,
        dropped_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|&c| c.to_owned()).collect())
            .collect()
    }

    #[test]
    fn first_row_becomes_header_with_synthetic_names() {
        let built = table_from_grid(grid(&[
            &["Name", " ", "Age"],
            &["Alice", "x", " 30 "],
        ]))
        .unwrap();

        assert_eq!(built.table.columns, vec!["Name", "Column_2", "Age"]);
        assert_eq!(built.table.rows, grid(&[&["Alice", "x", "30"]]));
        assert_eq!(built.dropped_rows, 0);
    }

    #[test]
    fn ragged_and_blank_rows_are_excluded() {
        let built = table_from_grid(grid(&[
            &["A", "B", ""],
            &["1", "2", ""],
            &["3"],
            &["", "", ""],
            &["4", "5", ""],
        ]))
        .unwrap();

        assert_eq!(built.table.columns, vec!["A", "B"]);
        assert_eq!(built.table.rows, grid(&[&["1", "2"], &["4", "5"]]));
        assert_eq!(built.dropped_rows, 1);
    }

    #[test]
    fn header_only_grid_does_not_survive() {
        assert!(table_from_grid(grid(&[&["A", "B"]])).is_none());
        assert!(table_from_grid(Vec::new()).is_none());
    }
}
