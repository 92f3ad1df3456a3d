#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Table normalization and column selection.
//!
//! Everything downstream of extraction lives here:
//!
//! - [`normalize`] cleans headers, drops empty rows/columns, and reduces
//!   several candidate tables to one (union merge or explicit pick).
//! - [`selection`] tracks which columns the user wants and in what order.
//! - [`session`] ties both together into one explicit per-session state
//!   object whose mutators recompute derived state.
//!
//! All operations are pure transformations over in-memory tables; nothing
//! here touches the filesystem.

pub mod normalize;
pub mod selection;
pub mod session;

pub use normalize::{Combined, MergeWarning};
pub use selection::SelectionState;
pub use session::{ChoiceReset, Session};

/// Errors raised by table normalization and column selection.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TableError {
    /// A selection referenced a column the table does not have.
    #[error("Unknown column: '{0}'")]
    UnknownColumn(String),

    /// A column was listed more than once where each must appear once.
    #[error("Column listed more than once: '{0}'")]
    DuplicateColumn(String),

    /// A table pick referenced a candidate that does not exist.
    #[error("Unknown table #{index} (only {count} candidate table(s) found)")]
    UnknownTable {
        /// Requested (0-based) index.
        index: usize,
        /// Number of candidate tables available.
        count: usize,
    },

    /// An ordering action referenced a position past the end of the order.
    #[error("Position {position} is out of range for {len} selected column(s)")]
    PositionOutOfRange {
        /// Requested (0-based) position.
        position: usize,
        /// Number of selected columns.
        len: usize,
    },

    /// There were no candidate tables to work with.
    #[error("No tables to combine")]
    Empty,
}
