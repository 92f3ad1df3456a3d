//! Table detection from glyph positions.
//!
//! Instead of trusting the order text comes out of the PDF, this strategy
//! records where every glyph is drawn (via [`pdf_extract::OutputDev`]) and
//! rebuilds the layout:
//!
//! 1. glyphs on the same baseline form a text line;
//! 2. wide horizontal gaps split a line into cells;
//! 3. runs of consecutive multi-cell lines form a table region;
//! 4. the x-extents of every cell in a region are merged into column bands,
//!    and each cell is dropped into the band it sits in.
//!
//! The first row of each region is its header. Regions with no surviving
//! data row are skipped with a warning.

use std::cmp::Ordering;

use pdf_extract::{MediaBox, OutputDev, OutputError, Transform};
use pdf2xlsx_table_models::StrategyKind;
use serde::{Deserialize, Serialize};

use crate::grid::table_from_grid;
use crate::{ExtractError, ExtractedTable, Extraction, TableMetadata, guard_pdf};

/// Settings for the geometry strategy. Distances are multiples of the
/// font size, so they scale with the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Horizontal gap that starts a new cell.
    pub column_gap: f64,
    /// Horizontal gap that inserts a space between words of one cell.
    pub word_gap: f64,
    /// Vertical distance between consecutive lines beyond which a table
    /// region ends.
    pub max_line_gap: f64,
    /// Minimum number of cells for a line to count as a table row.
    pub min_columns: usize,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            column_gap: 1.5,
            word_gap: 0.15,
            max_line_gap: 2.5,
            min_columns: 2,
        }
    }
}

/// A single drawn glyph, in top-down page coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    /// Left edge.
    pub x: f64,
    /// Baseline, measured from the top of the page.
    pub y: f64,
    /// Advance width.
    pub width: f64,
    /// Effective font size.
    pub size: f64,
    /// The decoded character(s).
    pub text: String,
}

impl Glyph {
    fn right(&self) -> f64 {
        self.x + self.width
    }
}

/// Every glyph drawn on one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageGlyphs {
    /// 1-based page number.
    pub page: u32,
    /// Glyphs in drawing order.
    pub glyphs: Vec<Glyph>,
}

/// [`OutputDev`] that records glyph positions page by page.
#[derive(Debug, Default)]
struct GlyphCollector {
    pages: Vec<PageGlyphs>,
    page_height: f64,
}

impl OutputDev for GlyphCollector {
    fn begin_page(
        &mut self,
        page_num: u32,
        media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        self.page_height = media_box.ury - media_box.lly;
        self.pages.push(PageGlyphs {
            page: page_num,
            glyphs: Vec::new(),
        });
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        char: &str,
    ) -> Result<(), OutputError> {
        if char.trim().is_empty() {
            return Ok(());
        }

        let scale = trm.m11.mul_add(trm.m22, -(trm.m12 * trm.m21)).abs().sqrt();
        let size = font_size * scale;
        let size = if size.is_finite() && size > 0.0 {
            size
        } else {
            1.0
        };

        if let Some(page) = self.pages.last_mut() {
            page.glyphs.push(Glyph {
                x: trm.m31,
                y: self.page_height - trm.m32,
                width: width * size,
                size,
                text: char.to_owned(),
            });
        }
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

/// A horizontal run of glyphs close enough to belong together.
#[derive(Debug, Clone, PartialEq)]
struct Cell {
    x0: f64,
    x1: f64,
    text: String,
}

impl Cell {
    fn center(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }
}

/// Glyphs sharing a baseline, split into cells.
#[derive(Debug, Clone, PartialEq)]
struct TextLine {
    y: f64,
    size: f64,
    cells: Vec<Cell>,
}

fn by_position(a: &&Glyph, b: &&Glyph) -> Ordering {
    a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x))
}

/// Groups glyphs into lines (top to bottom) and splits each line into
/// cells (left to right).
fn group_lines(glyphs: &[Glyph], config: &GeometryConfig) -> Vec<TextLine> {
    let mut sorted: Vec<&Glyph> = glyphs.iter().collect();
    sorted.sort_by(by_position);

    let mut groups: Vec<Vec<&Glyph>> = Vec::new();
    for glyph in sorted {
        match groups.last_mut() {
            Some(group)
                if (glyph.y - group[0].y).abs() <= 0.5 * glyph.size.max(group[0].size) =>
            {
                group.push(glyph);
            }
            _ => groups.push(vec![glyph]),
        }
    }

    groups
        .into_iter()
        .map(|mut group| {
            group.sort_by(|a, b| a.x.total_cmp(&b.x));
            let size = group.iter().map(|g| g.size).fold(0.0, f64::max);
            TextLine {
                y: group[0].y,
                size,
                cells: split_cells(&group, config),
            }
        })
        .collect()
}

/// Splits one line's glyphs (sorted by x) into cells at wide gaps.
fn split_cells(glyphs: &[&Glyph], config: &GeometryConfig) -> Vec<Cell> {
    let mut cells: Vec<Cell> = Vec::new();
    let mut last: Option<&Glyph> = None;

    for &glyph in glyphs {
        // Some PDFs fake bold text by drawing every glyph twice.
        if last.is_some_and(|l| l.text == glyph.text && (l.x - glyph.x).abs() < 0.01) {
            continue;
        }
        last = Some(glyph);

        match cells.last_mut() {
            Some(cell) if glyph.x - cell.x1 <= config.column_gap * glyph.size => {
                if glyph.x - cell.x1 > config.word_gap * glyph.size {
                    cell.text.push(' ');
                }
                cell.text.push_str(&glyph.text);
                cell.x1 = cell.x1.max(glyph.right());
            }
            _ => cells.push(Cell {
                x0: glyph.x,
                x1: glyph.right(),
                text: glyph.text.clone(),
            }),
        }
    }

    cells
}

/// Finds runs of consecutive lines that look like table rows.
fn find_regions<'a>(lines: &'a [TextLine], config: &GeometryConfig) -> Vec<&'a [TextLine]> {
    let mut regions = Vec::new();
    let mut start: Option<usize> = None;

    for (i, line) in lines.iter().enumerate() {
        let qualifies = line.cells.len() >= config.min_columns;
        let continues = start.is_some() && qualifies && {
            let prev = &lines[i - 1];
            line.y - prev.y <= config.max_line_gap * prev.size.max(line.size)
        };

        if continues {
            continue;
        }
        if let Some(s) = start.take()
            && i - s >= 2
        {
            regions.push(&lines[s..i]);
        }
        if qualifies {
            start = Some(i);
        }
    }

    if let Some(s) = start
        && lines.len() - s >= 2
    {
        regions.push(&lines[s..]);
    }

    regions
}

/// Merges the x-extents of every cell in a region into column bands.
fn column_bands(region: &[TextLine]) -> Vec<(f64, f64)> {
    let mut extents: Vec<(f64, f64)> = region
        .iter()
        .flat_map(|line| line.cells.iter().map(|c| (c.x0, c.x1)))
        .collect();
    extents.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut bands: Vec<(f64, f64)> = Vec::new();
    for (x0, x1) in extents {
        match bands.last_mut() {
            Some(band) if x0 <= band.1 => band.1 = band.1.max(x1),
            _ => bands.push((x0, x1)),
        }
    }
    bands
}

/// Lays a region's cells out on its column bands.
fn region_grid(region: &[TextLine]) -> Vec<Vec<String>> {
    let bands = column_bands(region);

    region
        .iter()
        .map(|line| {
            let mut row = vec![String::new(); bands.len()];
            for cell in &line.cells {
                let center = cell.center();
                let index = bands
                    .iter()
                    .position(|&(x0, x1)| center >= x0 && center <= x1)
                    .unwrap_or(bands.len() - 1);
                if !row[index].is_empty() {
                    row[index].push(' ');
                }
                row[index].push_str(&cell.text);
            }
            row
        })
        .collect()
}

/// Detects table grids among a page's glyphs, top to bottom.
#[must_use]
pub fn detect_grids(glyphs: &[Glyph], config: &GeometryConfig) -> Vec<Vec<Vec<String>>> {
    let lines = group_lines(glyphs, config);
    find_regions(&lines, config)
        .into_iter()
        .map(region_grid)
        .collect()
}

/// Builds tables from every page's glyphs.
///
/// # Errors
///
/// Returns [`ExtractError::NoTableFound`] if no table survives on any
/// page.
pub fn tables_from_pages(
    pages: &[PageGlyphs],
    config: &GeometryConfig,
) -> Result<Extraction, ExtractError> {
    let mut extraction = Extraction::default();

    for page in pages {
        let grids = detect_grids(&page.glyphs, config);
        log::debug!(
            "Page {}: {} glyph(s), {} candidate region(s)",
            page.page,
            page.glyphs.len(),
            grids.len()
        );

        for grid in grids {
            let Some(built) = table_from_grid(grid) else {
                extraction.warnings.push(format!(
                    "Skipped a table region on page {} with no usable data rows",
                    page.page
                ));
                continue;
            };
            if built.dropped_rows > 0 {
                extraction.warnings.push(format!(
                    "Excluded {} malformed row(s) from a table on page {}",
                    built.dropped_rows, page.page
                ));
            }
            extraction.tables.push(ExtractedTable {
                table: built.table,
                metadata: TableMetadata {
                    strategy: StrategyKind::Geometry,
                    page: Some(page.page),
                    dropped_rows: built.dropped_rows,
                },
            });
        }
    }

    if extraction.tables.is_empty() {
        return Err(ExtractError::no_table(format!(
            "no table regions detected on {} page(s)",
            pages.len()
        )));
    }

    Ok(extraction)
}

/// Records glyph positions from a PDF and detects tables from them.
///
/// # Errors
///
/// Returns [`ExtractError::Extraction`] if the PDF cannot be parsed, and
/// [`ExtractError::NoTableFound`] if no table survives.
pub fn extract(bytes: &[u8], config: &GeometryConfig) -> Result<Extraction, ExtractError> {
    let doc = guard_pdf("failed to parse PDF", || pdf_extract::Document::load_mem(bytes))?;

    let mut collector = GlyphCollector::default();
    guard_pdf("failed to read PDF content", || {
        pdf_extract::output_doc(&doc, &mut collector)
    })?;

    log::debug!(
        "Collected {} glyph(s) from {} page(s)",
        collector.pages.iter().map(|p| p.glyphs.len()).sum::<usize>(),
        collector.pages.len()
    );

    if collector.pages.iter().all(|p| p.glyphs.is_empty()) {
        return Err(ExtractError::Extraction(
            "no text could be extracted; the PDF might be image-based or encrypted".to_owned(),
        ));
    }

    tables_from_pages(&collector.pages, config)
}
