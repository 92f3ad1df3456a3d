//! Interactive front end.
//!
//! Extracts once up front, then loops over a menu built with `dialoguer`
//! until the user exports or quits. Every action works on one [`Session`];
//! a failed extraction or selection is reported and the previous state is
//! kept.

use std::path::{Path, PathBuf};

use dialoguer::{Confirm, Input, MultiSelect, Select};
use pdf2xlsx_cli_utils::MultiProgress;
use pdf2xlsx_extract::{Ingestor, StrategyConfig};
use pdf2xlsx_table::Session;
use pdf2xlsx_table_models::{Delimiter, StrategyKind, TableChoice};

use crate::config::AppConfig;
use crate::pipeline;

/// Menu entries.
enum Action {
    Preview,
    SelectColumns,
    ReorderColumns,
    ChooseTables,
    ChangeDelimiter,
    ChangeStrategy,
    Export,
    Quit,
}

impl Action {
    const ALL: &[Self] = &[
        Self::Preview,
        Self::SelectColumns,
        Self::ReorderColumns,
        Self::ChooseTables,
        Self::ChangeDelimiter,
        Self::ChangeStrategy,
        Self::Export,
        Self::Quit,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Preview => "Preview table",
            Self::SelectColumns => "Select columns",
            Self::ReorderColumns => "Reorder columns",
            Self::ChooseTables => "Merge tables or pick one",
            Self::ChangeDelimiter => "Change delimiter and re-extract",
            Self::ChangeStrategy => "Change extraction strategy",
            Self::Export => "Export to Excel",
            Self::Quit => "Quit",
        }
    }

    /// Whether the action makes sense in the current state.
    fn available(&self, ingestor: &Ingestor, session: Option<&Session>) -> bool {
        match self {
            Self::Preview | Self::SelectColumns | Self::Export => session.is_some(),
            Self::ReorderColumns => session.is_some_and(|s| s.selection().order().len() > 1),
            Self::ChooseTables => session.is_some_and(|s| s.candidates().len() > 1),
            Self::ChangeDelimiter => {
                matches!(ingestor.strategy(), StrategyConfig::LineHeuristic(_))
            }
            Self::ChangeStrategy | Self::Quit => true,
        }
    }
}

/// How to reorder the selected columns.
enum ReorderMode {
    AssignPositions,
    MoveOne,
}

impl ReorderMode {
    const ALL: &[Self] = &[Self::AssignPositions, Self::MoveOne];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::AssignPositions => "Pick the column for each position",
            Self::MoveOne => "Move a column up or down",
        }
    }
}

const STRATEGIES: &[StrategyKind] = &[
    StrategyKind::LineHeuristic,
    StrategyKind::Geometry,
    StrategyKind::External,
];

const fn strategy_label(kind: StrategyKind) -> &'static str {
    match kind {
        StrategyKind::LineHeuristic => "Text lines split on a delimiter",
        StrategyKind::Geometry => "Glyph positions (detects several tables)",
        StrategyKind::External => "External extractor (tabula-java)",
    }
}

/// Runs the interactive conversion of `file`.
///
/// # Errors
///
/// Returns an error if the PDF cannot be read or a prompt fails (e.g. the
/// terminal is not interactive).
pub async fn run(
    multi: &MultiProgress,
    file: &Path,
    config: AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = tokio::fs::read(file).await?;
    let mut ingestor = Ingestor::new(config.extraction.clone());
    let mut output = config.output_path();

    println!("pdf2xlsx: {} ({} bytes)", file.display(), bytes.len());
    println!();

    if let StrategyConfig::LineHeuristic(line) = ingestor.strategy_mut() {
        line.delimiter = prompt_delimiter(line.delimiter)?;
    }

    let mut session = None;
    reextract(multi, &ingestor, &bytes, config.table_choice, &mut session).await;
    if let (Some(session), Some(columns)) = (session.as_mut(), &config.columns)
        && let Err(e) = pipeline::select_in_order(session, columns)
    {
        println!("Ignoring configured columns: {e}");
    }

    loop {
        let actions: Vec<&Action> = Action::ALL
            .iter()
            .filter(|a| a.available(&ingestor, session.as_ref()))
            .collect();
        let labels: Vec<&str> = actions.iter().map(|a| a.label()).collect();

        let idx = Select::new()
            .with_prompt("What would you like to do?")
            .items(&labels)
            .default(0)
            .interact()?;

        match actions[idx] {
            Action::ChangeDelimiter => {
                if let StrategyConfig::LineHeuristic(line) = ingestor.strategy_mut() {
                    line.delimiter = prompt_delimiter(line.delimiter)?;
                }
                reextract(multi, &ingestor, &bytes, config.table_choice, &mut session).await;
            }
            Action::ChangeStrategy => {
                let kind = prompt_strategy(ingestor.strategy().kind())?;
                *ingestor.strategy_mut() = StrategyConfig::for_kind(kind);
                if let StrategyConfig::LineHeuristic(line) = ingestor.strategy_mut() {
                    line.delimiter = prompt_delimiter(line.delimiter)?;
                }
                reextract(multi, &ingestor, &bytes, config.table_choice, &mut session).await;
            }
            Action::Quit => break,
            action => {
                let Some(current) = session.as_mut() else {
                    continue;
                };
                match action {
                    Action::Preview => pipeline::print_preview(current),
                    Action::SelectColumns => select_columns(current)?,
                    Action::ReorderColumns => reorder_columns(current)?,
                    Action::ChooseTables => choose_tables(current)?,
                    Action::Export => {
                        output = prompt_output(&output)?;
                        if let Err(e) = pipeline::write_output(current, &output).await {
                            println!("Export failed: {e}");
                            continue;
                        }
                        let keep_going = Confirm::new()
                            .with_prompt("Keep editing?")
                            .default(false)
                            .interact()?;
                        if !keep_going {
                            break;
                        }
                    }
                    Action::ChangeDelimiter | Action::ChangeStrategy | Action::Quit => {}
                }
            }
        }
    }

    Ok(())
}

/// Runs extraction and replaces the session's tables. On failure the
/// error and its hint are printed and `session` is left as it was.
async fn reextract(
    multi: &MultiProgress,
    ingestor: &Ingestor,
    bytes: &[u8],
    choice: TableChoice,
    session: &mut Option<Session>,
) {
    if let Err(e) = ingestor.check_runtime().await {
        pipeline::report_extract_error(&e);
        return;
    }

    let extraction = match pipeline::extract(multi, ingestor, bytes).await {
        Ok(extraction) => extraction,
        Err(e) => {
            pipeline::report_extract_error(&e);
            if session.is_some() {
                println!("Keeping the previously extracted table.");
            }
            return;
        }
    };
    pipeline::print_extraction(&extraction);

    let result = match session.take() {
        Some(mut existing) => {
            let replaced = existing.replace_tables(extraction.raw_tables());
            *session = Some(existing);
            replaced
        }
        None => Session::new_or_merge(extraction.raw_tables(), choice).map(|(new, reset)| {
            *session = Some(new);
            reset
        }),
    };

    match (result, session.as_ref()) {
        (Err(e), _) => println!("Error: {e}"),
        (Ok(reset), Some(current)) => {
            if let Some(reset) = reset {
                println!("Warning: {reset}");
            }
            if let Some(warning) = current.warning() {
                println!("Warning: {warning}");
            }
            pipeline::print_preview(current);
        }
        (Ok(_), None) => {}
    }
}

fn prompt_delimiter(current: Delimiter) -> Result<Delimiter, dialoguer::Error> {
    let labels: Vec<&str> = Delimiter::ALL.iter().map(|d| d.label()).collect();
    let default = Delimiter::ALL
        .iter()
        .position(|&d| d == current)
        .unwrap_or(0);

    let idx = Select::new()
        .with_prompt("Delimiter")
        .items(&labels)
        .default(default)
        .interact()?;
    Ok(Delimiter::ALL[idx])
}

fn prompt_strategy(current: StrategyKind) -> Result<StrategyKind, dialoguer::Error> {
    let labels: Vec<String> = STRATEGIES
        .iter()
        .map(|&k| format!("{k}: {}", strategy_label(k)))
        .collect();
    let default = STRATEGIES.iter().position(|&k| k == current).unwrap_or(0);

    let idx = Select::new()
        .with_prompt("Extraction strategy")
        .items(&labels)
        .default(default)
        .interact()?;
    Ok(STRATEGIES[idx])
}

fn prompt_output(current: &Path) -> Result<PathBuf, dialoguer::Error> {
    let path: String = Input::new()
        .with_prompt("Output file")
        .default(current.display().to_string())
        .interact_text()?;
    Ok(PathBuf::from(path.trim()))
}

fn select_columns(session: &mut Session) -> Result<(), dialoguer::Error> {
    let select_all = Confirm::new()
        .with_prompt("Select all columns?")
        .default(session.selection().all_selected())
        .interact()?;
    if select_all {
        session.select_all();
        return Ok(());
    }

    let columns = session.selection().columns().to_vec();
    let defaults: Vec<bool> = columns
        .iter()
        .map(|c| session.selection().selected().contains(c))
        .collect();

    let picked = MultiSelect::new()
        .with_prompt("Columns to export (space=toggle, enter=confirm)")
        .items(&columns)
        .defaults(&defaults)
        .max_length(20)
        .interact()?;

    if picked.is_empty() {
        println!("No columns selected; keeping the previous selection.");
        return Ok(());
    }

    let names: Vec<&str> = picked.iter().map(|&i| columns[i].as_str()).collect();
    if let Err(e) = session.select_subset(&names) {
        println!("Error: {e}");
    }
    Ok(())
}

fn reorder_columns(session: &mut Session) -> Result<(), dialoguer::Error> {
    let labels: Vec<&str> = ReorderMode::ALL.iter().map(ReorderMode::label).collect();
    let idx = Select::new()
        .with_prompt("How would you like to reorder?")
        .items(&labels)
        .default(0)
        .interact()?;

    match ReorderMode::ALL[idx] {
        ReorderMode::AssignPositions => assign_positions(session)?,
        ReorderMode::MoveOne => move_one(session)?,
    }

    println!("Column order: {}", session.selection().order().join(", "));
    Ok(())
}

/// Asks for the column at each position in turn. Columns already placed
/// are not offered again, so the last position is filled automatically.
fn assign_positions(session: &mut Session) -> Result<(), dialoguer::Error> {
    let len = session.selection().order().len();
    for position in 0..len.saturating_sub(1) {
        let remaining = unplaced(session.selection().order(), position);
        let name_idx = Select::new()
            .with_prompt(format!("Column {}", position + 1))
            .items(&remaining)
            .default(0)
            .interact()?;
        if let Err(e) = session.set_order(position, &remaining[name_idx]) {
            println!("Error: {e}");
        }
    }
    Ok(())
}

/// Columns not yet fixed when choosing the column for `position`.
fn unplaced(order: &[String], position: usize) -> Vec<String> {
    order.get(position..).unwrap_or_default().to_vec()
}

fn move_one(session: &mut Session) -> Result<(), dialoguer::Error> {
    let order = session.selection().order().to_vec();
    let index = Select::new()
        .with_prompt("Column to move")
        .items(&order)
        .default(0)
        .interact()?;

    let up = Select::new()
        .with_prompt("Direction")
        .items(&["Up", "Down"])
        .default(0)
        .interact()?
        == 0;

    if up {
        session.move_up(index);
    } else {
        session.move_down(index);
    }
    Ok(())
}

fn choose_tables(session: &mut Session) -> Result<(), dialoguer::Error> {
    let mut labels = vec!["Merge all tables".to_owned()];
    labels.extend(session.candidates().iter().enumerate().map(|(i, table)| {
        format!(
            "Table {}: {} row(s), columns: {}",
            i + 1,
            table.len(),
            table.columns.join(", ")
        )
    }));

    let default = match session.table_choice() {
        TableChoice::Merge => 0,
        TableChoice::Single(index) => index + 1,
    };
    let idx = Select::new()
        .with_prompt("Which table should be exported?")
        .items(&labels)
        .default(default)
        .interact()?;

    let choice = match idx {
        0 => TableChoice::Merge,
        n => TableChoice::Single(n - 1),
    };
    match session.set_table_choice(choice) {
        Ok(()) => {
            if let Some(warning) = session.warning() {
                println!("Warning: {warning}");
            }
            pipeline::print_preview(session);
        }
        Err(e) => println!("Error: {e}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pdf2xlsx_table_models::RawTable;

    use super::*;

    fn session() -> Session {
        let columns = ["Name", "Age", "City"].map(str::to_owned).to_vec();
        let rows = vec![["Alice", "30", "Paris"].map(str::to_owned).to_vec()];
        Session::new(vec![RawTable::new(columns, rows)], TableChoice::Merge).unwrap()
    }

    #[test]
    fn placed_columns_are_not_offered_again() {
        let mut session = session();

        let first = unplaced(session.selection().order(), 0);
        assert_eq!(first, ["Name", "Age", "City"]);
        session.set_order(0, "City").unwrap();

        let second = unplaced(session.selection().order(), 1);
        assert_eq!(second, ["Age", "Name"]);
        assert!(!second.contains(&"City".to_owned()));
        session.set_order(1, "Name").unwrap();

        assert_eq!(session.selection().order(), ["City", "Name", "Age"]);
        assert!(unplaced(session.selection().order(), 5).is_empty());
    }
}
