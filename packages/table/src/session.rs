//! Explicit per-session state.
//!
//! A [`Session`] owns the candidate tables from the latest extraction, the
//! single table derived from them, and the user's column selection. Each
//! mutator recomputes whatever downstream state depends on what it
//! changed, and failed mutations leave the previous valid state in place.

use std::fmt;

use pdf2xlsx_table_models::{ProjectedTable, RawTable, TableChoice};

use crate::normalize::{self, MergeWarning};
use crate::selection::SelectionState;
use crate::TableError;

/// A table pick that no longer exists after re-extraction, so the session
/// fell back to merging every table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChoiceReset {
    /// The (0-based) table that was picked.
    pub index: usize,
    /// How many tables the new extraction found.
    pub count: usize,
}

impl fmt::Display for ChoiceReset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Table #{} no longer exists ({} table(s) found); merging all tables instead.",
            self.index + 1,
            self.count
        )
    }
}

/// State for one user session, from extracted tables to projected output.
#[derive(Debug, Clone)]
pub struct Session {
    candidates: Vec<RawTable>,
    choice: TableChoice,
    table: RawTable,
    warning: Option<MergeWarning>,
    selection: SelectionState,
}

impl Session {
    /// Starts a session from freshly extracted tables.
    ///
    /// Each candidate is normalized (blank rows/columns dropped, headers
    /// cleaned, ragged rows excluded) before being combined per `choice`.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Empty`] if no candidates were given, or
    /// [`TableError::UnknownTable`] if `choice` picks a missing candidate.
    pub fn new(mut candidates: Vec<RawTable>, choice: TableChoice) -> Result<Self, TableError> {
        for table in &mut candidates {
            normalize::normalize(table);
        }

        let combined = normalize::combine(&candidates, choice)?;
        if let Some(warning) = &combined.warning {
            log::warn!("{warning}");
        }
        let selection = SelectionState::new(&combined.table.columns);

        Ok(Self {
            candidates,
            choice,
            table: combined.table,
            warning: combined.warning,
            selection,
        })
    }

    /// Like [`Session::new`], but a `choice` picking a table that doesn't
    /// exist falls back to [`TableChoice::Merge`] instead of failing.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Empty`] if no candidates were given.
    pub fn new_or_merge(
        candidates: Vec<RawTable>,
        choice: TableChoice,
    ) -> Result<(Self, Option<ChoiceReset>), TableError> {
        let reset = match choice {
            TableChoice::Single(index) if index >= candidates.len() && !candidates.is_empty() => {
                Some(ChoiceReset {
                    index,
                    count: candidates.len(),
                })
            }
            _ => None,
        };
        if let Some(reset) = &reset {
            log::warn!("{reset}");
        }

        let choice = if reset.is_some() {
            TableChoice::Merge
        } else {
            choice
        };
        Ok((Self::new(candidates, choice)?, reset))
    }

    /// Replaces every table with the result of a new extraction, resetting
    /// the selection. The current table choice is kept when it still
    /// exists; otherwise the tables are merged and the reset is returned.
    /// On error the session is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Empty`] if no candidates were given.
    pub fn replace_tables(
        &mut self,
        candidates: Vec<RawTable>,
    ) -> Result<Option<ChoiceReset>, TableError> {
        let (session, reset) = Self::new_or_merge(candidates, self.choice)?;
        *self = session;
        Ok(reset)
    }

    /// Switches between merging and picking a single candidate table.
    ///
    /// The selection is kept when the new table has the same columns and
    /// reset to defaults otherwise. On error the session is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::UnknownTable`] if `choice` picks a missing
    /// candidate.
    pub fn set_table_choice(&mut self, choice: TableChoice) -> Result<(), TableError> {
        let combined = normalize::combine(&self.candidates, choice)?;
        if let Some(warning) = &combined.warning {
            log::warn!("{warning}");
        }

        if combined.table.columns != self.table.columns {
            self.selection = SelectionState::new(&combined.table.columns);
        }
        self.choice = choice;
        self.table = combined.table;
        self.warning = combined.warning;
        Ok(())
    }

    /// The normalized candidate tables.
    #[must_use]
    pub fn candidates(&self) -> &[RawTable] {
        &self.candidates
    }

    /// How the candidates are currently combined.
    #[must_use]
    pub const fn table_choice(&self) -> TableChoice {
        self.choice
    }

    /// The combined table the selection applies to.
    #[must_use]
    pub const fn table(&self) -> &RawTable {
        &self.table
    }

    /// Warning raised by the last merge, if it was degraded.
    #[must_use]
    pub const fn warning(&self) -> Option<&MergeWarning> {
        self.warning.as_ref()
    }

    /// The current column selection.
    #[must_use]
    pub const fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Selects every column in natural order.
    pub fn select_all(&mut self) {
        self.selection.select_all();
    }

    /// Selects exactly `names`.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::UnknownColumn`] if any name is not a column of
    /// the combined table.
    pub fn select_subset<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), TableError> {
        self.selection.select_subset(names)
    }

    /// Places `name` at `position` in the export order.
    ///
    /// # Errors
    ///
    /// See [`SelectionState::set_order`].
    pub fn set_order(&mut self, position: usize, name: &str) -> Result<(), TableError> {
        self.selection.set_order(position, name)
    }

    /// Moves the column at `index` one position earlier.
    pub fn move_up(&mut self, index: usize) {
        self.selection.move_up(index);
    }

    /// Moves the column at `index` one position later.
    pub fn move_down(&mut self, index: usize) {
        self.selection.move_down(index);
    }

    /// Derives the table to export from the current selection.
    #[must_use]
    pub fn projected(&self) -> ProjectedTable {
        self.selection.project(&self.table)
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

    fn two_tables() -> Vec<RawTable> {
        vec![
            table(&["Name", "Age"], &[&["Alice", "30"]]),
            table(&["Name", "City"], &[&["Bob", "Rome"]]),
        ]
    }

    #[test]
    fn new_session_normalizes_and_selects_everything() {
        let session = Session::new(
            vec![table(&["Name", "", "Name"], &[&["Alice", "x", "A."], &["", "", ""]])],
            TableChoice::Merge,
        )
        .unwrap();

        assert_eq!(session.table().columns, vec!["Name", "Column_2", "Name_2"]);
        assert_eq!(session.table().len(), 1);
        assert!(session.selection().all_selected());
        assert!(session.warning().is_none());
    }

    #[test]
    fn merge_warning_is_surfaced() {
        let session = Session::new(two_tables(), TableChoice::Merge).unwrap();
        assert!(session.warning().is_some());
        assert_eq!(session.table().columns, vec!["Name", "Age", "City"]);
    }

    #[test]
    fn switching_to_single_table_resets_selection() {
        let mut session = Session::new(two_tables(), TableChoice::Merge).unwrap();
        session.select_subset(&["City"]).unwrap();

        session.set_table_choice(TableChoice::Single(0)).unwrap();
        assert!(session.warning().is_none());
        assert_eq!(session.selection().order(), ["Name", "Age"]);
    }

    #[test]
    fn failed_choice_leaves_session_untouched() {
        let mut session = Session::new(two_tables(), TableChoice::Merge).unwrap();
        session.select_subset(&["City", "Name"]).unwrap();

        assert!(session.set_table_choice(TableChoice::Single(5)).is_err());
        assert_eq!(session.table_choice(), TableChoice::Merge);
        assert_eq!(session.selection().order(), ["Name", "City"]);
    }

    #[test]
    fn projection_follows_selection_and_order() {
        let mut session = Session::new(two_tables(), TableChoice::Merge).unwrap();
        session.select_subset(&["Name", "City"]).unwrap();
        session.move_up(1);

        let projected = session.projected();
        assert_eq!(projected.columns, vec!["City", "Name"]);
        assert_eq!(projected.rows, vec![strings(&["", "Alice"]), strings(&["Rome", "Bob"])]);
    }

    #[test]
    fn replacing_tables_resets_selection() {
        let mut session = Session::new(two_tables(), TableChoice::Merge).unwrap();
        session.select_subset(&["Age"]).unwrap();

        session
            .replace_tables(vec![table(&["X", "Y"], &[&["1", "2"]])])
            .unwrap();
        assert_eq!(session.selection().order(), ["X", "Y"]);
    }

    #[test]
    fn replacing_tables_falls_back_to_merge_when_pick_is_gone() {
        let mut session = Session::new(
            vec![
                table(&["A"], &[&["1"]]),
                table(&["B"], &[&["2"]]),
                table(&["C"], &[&["3"]]),
            ],
            TableChoice::Single(2),
        )
        .unwrap();

        let reset = session
            .replace_tables(vec![table(&["Name", "Age"], &[&["Alice", "30"]])])
            .unwrap();

        assert_eq!(reset, Some(ChoiceReset { index: 2, count: 1 }));
        assert_eq!(session.table_choice(), TableChoice::Merge);
        assert_eq!(session.table().columns, vec!["Name", "Age"]);
        assert_eq!(session.selection().order(), ["Name", "Age"]);
    }

    #[test]
    fn replacing_tables_keeps_a_pick_that_still_exists() {
        let mut session = Session::new(two_tables(), TableChoice::Single(1)).unwrap();

        let reset = session.replace_tables(two_tables()).unwrap();
        assert!(reset.is_none());
        assert_eq!(session.table_choice(), TableChoice::Single(1));
        assert_eq!(session.table().columns, vec!["Name", "City"]);
    }

    #[test]
    fn missing_configured_pick_merges_on_start() {
        let (session, reset) = Session::new_or_merge(two_tables(), TableChoice::Single(4)).unwrap();
        assert_eq!(reset, Some(ChoiceReset { index: 4, count: 2 }));
        assert_eq!(session.table_choice(), TableChoice::Merge);

        assert_eq!(
            Session::new_or_merge(Vec::new(), TableChoice::Single(0)).unwrap_err(),
            TableError::Empty
        );
    }
}
