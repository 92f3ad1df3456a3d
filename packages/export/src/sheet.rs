//! Worksheet XML generation.
//!
//! Every cell is written as an inline string (`t="inlineStr"`), so no
//! shared-string table is needed. Row 1 holds the header in bold and is
//! frozen; empty data cells are omitted.

use std::borrow::Cow;
use std::io::Write;

use pdf2xlsx_table_models::ProjectedTable;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::ExportError;
use crate::parts::HEADER_STYLE;

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

/// Spreadsheet column letters for a 0-based index (`0` → `A`, `26` → `AA`).
#[must_use]
pub fn column_letters(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        // rem < 26
        #[allow(clippy::cast_possible_truncation)]
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Drops characters XML 1.0 cannot represent. Text from PDFs sometimes
/// carries stray control codes.
fn xml_safe(text: &str) -> Cow<'_, str> {
    let valid = |c: char| {
        matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}')
    };
    if text.chars().all(valid) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| valid(c)).collect())
    }
}

fn write_row<W: Write>(
    writer: &mut Writer<W>,
    row_number: usize,
    cells: &[String],
    style: Option<&str>,
) -> Result<(), ExportError> {
    let row_ref = row_number.to_string();
    let mut row = BytesStart::new("row");
    row.push_attribute(("r", row_ref.as_str()));
    writer.write_event(Event::Start(row))?;

    for (index, value) in cells.iter().enumerate() {
        if value.is_empty() {
            continue;
        }

        let cell_ref = format!("{}{row_number}", column_letters(index));
        let mut cell = BytesStart::new("c");
        cell.push_attribute(("r", cell_ref.as_str()));
        cell.push_attribute(("t", "inlineStr"));
        if let Some(style) = style {
            cell.push_attribute(("s", style));
        }
        writer.write_event(Event::Start(cell))?;
        writer.write_event(Event::Start(BytesStart::new("is")))?;

        let mut text = BytesStart::new("t");
        text.push_attribute(("xml:space", "preserve"));
        writer.write_event(Event::Start(text))?;
        writer.write_event(Event::Text(BytesText::new(&xml_safe(value))))?;
        writer.write_event(Event::End(BytesEnd::new("t")))?;

        writer.write_event(Event::End(BytesEnd::new("is")))?;
        writer.write_event(Event::End(BytesEnd::new("c")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("row")))?;
    Ok(())
}

/// Writes `xl/worksheets/sheet1.xml` for `table`.
///
/// # Errors
///
/// Returns [`ExportError`] if writing to `out` fails.
pub fn write_sheet<W: Write>(out: W, table: &ProjectedTable) -> Result<(), ExportError> {
    let mut writer = Writer::new(out);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

    let mut worksheet = BytesStart::new("worksheet");
    worksheet.push_attribute(("xmlns", MAIN_NS));
    writer.write_event(Event::Start(worksheet))?;

    if !table.columns.is_empty() {
        let last = format!(
            "{}{}",
            column_letters(table.columns.len() - 1),
            table.rows.len() + 1
        );
        let mut dimension = BytesStart::new("dimension");
        dimension.push_attribute(("ref", format!("A1:{last}").as_str()));
        writer.write_event(Event::Empty(dimension))?;
    }

    writer.write_event(Event::Start(BytesStart::new("sheetViews")))?;
    let mut view = BytesStart::new("sheetView");
    view.push_attribute(("workbookViewId", "0"));
    writer.write_event(Event::Start(view))?;
    let mut pane = BytesStart::new("pane");
    pane.extend_attributes([
        ("ySplit", "1"),
        ("topLeftCell", "A2"),
        ("activePane", "bottomLeft"),
        ("state", "frozen"),
    ]);
    writer.write_event(Event::Empty(pane))?;
    writer.write_event(Event::End(BytesEnd::new("sheetView")))?;
    writer.write_event(Event::End(BytesEnd::new("sheetViews")))?;

    writer.write_event(Event::Start(BytesStart::new("sheetData")))?;
    write_row(&mut writer, 1, &table.columns, Some(HEADER_STYLE))?;
    for (index, row) in table.rows.iter().enumerate() {
        write_row(&mut writer, index + 2, row, None)?;
    }
    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;

    writer.write_event(Event::End(BytesEnd::new("worksheet")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters_roll_over() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(51), "AZ");
        assert_eq!(column_letters(52), "BA");
        assert_eq!(column_letters(701), "ZZ");
        assert_eq!(column_letters(702), "AAA");
    }

    #[test]
    fn control_characters_are_stripped() {
        assert_eq!(xml_safe("a\u{0}b\u{1b}c"), "abc");
        assert!(matches!(xml_safe("tab\tok"), Cow::Borrowed(_)));
    }

    #[test]
    fn cells_are_escaped_and_empty_cells_omitted() {
        let table = ProjectedTable {
            columns: vec!["Company".to_owned(), "Note".to_owned()],
            rows: vec![vec!["AT&T".to_owned(), String::new()]],
        };
        let mut out = Vec::new();
        write_sheet(&mut out, &table).unwrap();
        let xml = String::from_utf8(out).unwrap();

        assert!(xml.contains("AT&amp;T"));
        assert!(xml.contains(r#"<c r="A1" t="inlineStr" s="1">"#));
        assert!(!xml.contains(r#"r="B2""#));
        assert!(xml.contains(r#"<dimension ref="A1:B2"/>"#));
    }
}
