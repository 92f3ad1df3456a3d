//! Column selection and ordering.
//!
//! [`SelectionState`] keeps two pieces of state in lockstep: the *set* of
//! selected columns and the *order* they will be exported in. The order is
//! always a permutation of the selected set; every mutator re-checks this
//! and rebuilds the order from the table's natural column order if it ever
//! drifts.

use std::collections::BTreeSet;

use pdf2xlsx_table_models::{ProjectedTable, RawTable};

use crate::TableError;

/// The user's chosen subset of columns and their export order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    /// Every column of the underlying table, in natural order.
    columns: Vec<String>,
    /// Names of the selected columns.
    selected: BTreeSet<String>,
    /// Export order; always a permutation of `selected`.
    order: Vec<String>,
}

impl SelectionState {
    /// Creates a selection over `columns` with every column selected in
    /// natural order.
    #[must_use]
    pub fn new(columns: &[String]) -> Self {
        Self {
            columns: columns.to_vec(),
            selected: columns.iter().cloned().collect(),
            order: columns.to_vec(),
        }
    }

    /// Every column of the underlying table, in natural order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The selected column set.
    #[must_use]
    pub const fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    /// The current export order.
    #[must_use]
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Whether every column of the table is selected.
    #[must_use]
    pub fn all_selected(&self) -> bool {
        self.selected.len() == self.columns.len()
    }

    /// Whether no column is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selects every column and resets the order to the natural order.
    pub fn select_all(&mut self) {
        self.selected = self.columns.iter().cloned().collect();
        self.order.clone_from(&self.columns);
    }

    /// Replaces the selection with `names`.
    ///
    /// Columns that stay selected keep their relative order; newly selected
    /// columns are appended in natural order.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::UnknownColumn`] for the first name that is not
    /// a column of the table. The selection is left untouched in that case.
    pub fn select_subset<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), TableError> {
        let mut selected = BTreeSet::new();
        for name in names {
            let name = name.as_ref();
            if !self.columns.iter().any(|c| c == name) {
                return Err(TableError::UnknownColumn(name.to_owned()));
            }
            selected.insert(name.to_owned());
        }

        let mut order: Vec<String> = self
            .order
            .iter()
            .filter(|c| selected.contains(*c))
            .cloned()
            .collect();
        for column in &self.columns {
            if selected.contains(column) && !order.contains(column) {
                order.push(column.clone());
            }
        }

        self.selected = selected;
        self.order = order;
        self.ensure_consistent();
        Ok(())
    }

    /// Places `name` at `position`, swapping it with whichever column held
    /// that position before.
    ///
    /// # Errors
    ///
    /// * [`TableError::PositionOutOfRange`] if `position` is past the end of
    ///   the order.
    /// * [`TableError::UnknownColumn`] if `name` is not a selected column.
    pub fn set_order(&mut self, position: usize, name: &str) -> Result<(), TableError> {
        self.ensure_consistent();

        if position >= self.order.len() {
            return Err(TableError::PositionOutOfRange {
                position,
                len: self.order.len(),
            });
        }
        let current = self
            .order
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_owned()))?;

        self.order.swap(current, position);
        self.ensure_consistent();
        Ok(())
    }

    /// Swaps the column at `index` with the one before it. No-op for the
    /// first position or an out-of-range index.
    pub fn move_up(&mut self, index: usize) {
        self.ensure_consistent();
        if index > 0 && index < self.order.len() {
            self.order.swap(index - 1, index);
        }
    }

    /// Swaps the column at `index` with the one after it. No-op for the
    /// last position or an out-of-range index.
    pub fn move_down(&mut self, index: usize) {
        self.ensure_consistent();
        if index + 1 < self.order.len() {
            self.order.swap(index, index + 1);
        }
    }

    /// Resets the order to the selected columns in natural order if it is
    /// not a permutation of the selected set. Returns whether a reset
    /// happened.
    pub fn ensure_consistent(&mut self) -> bool {
        let in_order: BTreeSet<&String> = self.order.iter().collect();
        let consistent = in_order.len() == self.order.len()
            && in_order.len() == self.selected.len()
            && in_order.iter().all(|c| self.selected.contains(*c));

        if consistent {
            return false;
        }

        log::debug!("Column order drifted from selection; resetting to natural order");
        self.order = self
            .columns
            .iter()
            .filter(|c| self.selected.contains(*c))
            .cloned()
            .collect();
        true
    }

    /// Projects `table` onto the current export order.
    #[must_use]
    pub fn project(&self, table: &RawTable) -> ProjectedTable {
        table.project(&self.order)
    }
}
