//! Finalization: sorting, style resolution, outline grouping, label cleanup
//! and workbook emission.

use std::path::Path;

use indexmap::IndexMap;
use log::{debug, info};
use rust_xlsxwriter::{
    Color, Format, FormatAlign, FormatBorder, Note, Workbook, Worksheet, XlsxError,
};

use crate::error::RenderResult;
use crate::style::{Align, ColorSpec, Style, BG_COLOR_DEFAULT, BG_COLOR_MISSING};
use crate::table::{Cell, Header, ReportTable};
use crate::value::Value;

/// Auto-sized column width cap, in characters.
const MAX_COLUMN_WIDTH: f64 = 25.0;
const WIDTH_PADDING: usize = 2;

// ---------------------------------------------------------------------------
// Resolved layout
// ---------------------------------------------------------------------------

/// A cell with every style decision resolved to concrete values.
#[derive(Debug, Clone)]
pub(crate) struct RenderedCell {
    pub(crate) text: String,
    pub(crate) bold: bool,
    pub(crate) font_name: Option<String>,
    pub(crate) font_size: Option<f64>,
    pub(crate) font_color: Option<String>,
    /// Explicitly resolved background. When `None`, emission falls back to
    /// the default fill unless the cell is odd-parity, which is what
    /// produces the alternating shading.
    pub(crate) fill: Option<String>,
    pub(crate) number_format: Option<String>,
    pub(crate) align: Option<Align>,
    pub(crate) border_bottom: bool,
    /// Row-index parity, resolved for cells that requested it.
    pub(crate) parity: Option<u8>,
    pub(crate) comment: Option<String>,
}

/// A collapsible outline range, in 0-based sheet rows (header is row 0).
///
/// `first_row` is the row after the group's summary row; with summary symbols
/// above, collapsing hides `first_row..=last_row` under the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Outline {
    pub(crate) level: usize,
    pub(crate) first_row: u32,
    pub(crate) last_row: u32,
    pub(crate) collapsed: bool,
}

/// The fully resolved document: everything emission needs, nothing more.
pub(crate) struct Layout {
    pub(crate) title: String,
    pub(crate) header: Vec<RenderedCell>,
    /// Row-major grid aligned with `header`; `None` is a missing cell.
    pub(crate) rows: Vec<Vec<Option<RenderedCell>>>,
    pub(crate) outlines: Vec<Outline>,
    pub(crate) widths: Vec<f64>,
}

impl Layout {
    pub(crate) fn build<K: Ord>(table: ReportTable<K>) -> Layout {
        let ReportTable {
            title,
            headers,
            mut rows,
            group_fields,
            cleanup_fields,
        } = table;

        // Column order: sort key ascending, ties keep first-appearance order.
        let mut columns: Vec<(String, Header)> = headers.into_iter().collect();
        columns.sort_by_key(|(_, header)| header.order);

        // Row order: ascending row key. Grouping and cleanup below assume the
        // caller's keys make hierarchy runs contiguous under this order.
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        let mut rows: Vec<IndexMap<String, Cell>> =
            rows.into_iter().map(|(_, row)| row).collect();

        info!("total rows: {}", rows.len());

        // Alternating-palette counter, resolved in final row order. The
        // counter advances after a row that resolved at least one palette
        // style and resets after a row that resolved none.
        let mut alt = 0usize;
        let row_alt: Vec<Option<usize>> = rows
            .iter()
            .map(|row| {
                let uses_palette = row.values().any(|cell| {
                    matches!(cell.style.color, Some(ColorSpec::Alternating(_)))
                        || matches!(cell.style.background_color, Some(ColorSpec::Alternating(_)))
                });
                if uses_palette {
                    let idx = alt;
                    alt += 1;
                    Some(idx)
                } else {
                    alt = 0;
                    None
                }
            })
            .collect();

        let outlines = compute_outlines(&rows, &group_fields);
        cleanup_labels(&mut rows, &cleanup_fields);

        let header: Vec<RenderedCell> = columns
            .iter()
            .map(|(column_title, header)| {
                resolve_cell(&Value::Text(column_title.clone()), &header.style, None, None)
            })
            .collect();

        let grid: Vec<Vec<Option<RenderedCell>>> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                columns
                    .iter()
                    .map(|(column_title, _)| {
                        row.get(column_title.as_str()).map(|cell| {
                            resolve_cell(&cell.value, &cell.style, Some(i), row_alt[i])
                        })
                    })
                    .collect()
            })
            .collect();

        let widths = column_widths(&header, &grid);

        Layout {
            title,
            header,
            rows: grid,
            outlines,
            widths,
        }
    }
}

// ---------------------------------------------------------------------------
// Layout passes
// ---------------------------------------------------------------------------

/// Collect contiguous equal-value runs of each group field into outline
/// ranges. Level is the field's 1-based position in the configured list; the
/// deepest level is collapsed by default.
///
/// Panics if a group's rows are not contiguous after sorting — a caller bug
/// in row-key construction, checked before anything is written.
fn compute_outlines(rows: &[IndexMap<String, Cell>], group_fields: &[String]) -> Vec<Outline> {
    // (level, value) -> member sheet rows, ascending.
    let mut groups: IndexMap<(usize, String), Vec<u32>> = IndexMap::new();
    for (i, row) in rows.iter().enumerate() {
        for (l, field) in group_fields.iter().enumerate() {
            if let Some(cell) = row.get(field.as_str()) {
                if cell.value.is_present() {
                    groups
                        .entry((l + 1, cell.value.rendered()))
                        .or_default()
                        .push(i as u32 + 1);
                }
            }
        }
    }

    let deepest = group_fields.len();
    let mut outlines = Vec::new();
    for level in 1..=deepest {
        debug!(
            "grouping level {}: {} values",
            level,
            groups.keys().filter(|(l, _)| *l == level).count()
        );
        for ((_, value), members) in groups.iter().filter(|((l, _), _)| *l == level) {
            let first = members[0];
            let last = members[members.len() - 1];
            assert!(
                members.len() as u32 == last - first + 1,
                "group '{value}' at level {level} is not contiguous after row sort; \
                 fix the row key construction"
            );
            if members.len() > 1 {
                outlines.push(Outline {
                    level,
                    first_row: first + 1,
                    last_row: last,
                    collapsed: level == deepest,
                });
            }
        }
    }
    outlines
}

/// Blank repeated hierarchical labels to simulate merged cells: a cell is
/// emptied when it equals the running value at its level, and finer levels'
/// memory resets whenever a coarser level changes.
fn cleanup_labels(rows: &mut [IndexMap<String, Cell>], cleanup_fields: &[String]) {
    let mut running: Vec<Option<Value>> = vec![None; cleanup_fields.len()];
    for row in rows.iter_mut() {
        for (j, field) in cleanup_fields.iter().enumerate() {
            let Some(cell) = row.get_mut(field.as_str()) else {
                continue;
            };
            if !cell.value.is_present() {
                continue;
            }
            if running[j].as_ref() == Some(&cell.value) {
                cell.value = Value::Empty;
            } else {
                running[j] = Some(cell.value.clone());
                for finer in running[j + 1..].iter_mut() {
                    *finer = None;
                }
            }
        }
    }
}

fn resolve_color(spec: &ColorSpec, value: &Value, alt: Option<usize>) -> String {
    match spec {
        ColorSpec::Literal(hex) => hex.clone(),
        ColorSpec::Computed(f) => f(value),
        ColorSpec::Alternating(palette) => {
            assert!(!palette.is_empty(), "alternating palette is empty");
            palette[alt.unwrap_or(0) % palette.len()].clone()
        }
    }
}

/// Resolve one cell: render the value, fix parity, and turn every color spec
/// into a concrete hex string. `row` is `None` for header cells.
fn resolve_cell(
    value: &Value,
    style: &Style,
    row: Option<usize>,
    alt: Option<usize>,
) -> RenderedCell {
    let parity = if style.parity {
        row.map(|i| (i % 2) as u8)
    } else {
        None
    };
    let fill = style
        .background_color
        .as_ref()
        .map(|spec| resolve_color(spec, value, alt));
    let font_color = style
        .color
        .as_ref()
        .map(|spec| resolve_color(spec, value, alt));

    RenderedCell {
        text: value.rendered(),
        bold: style.bold,
        font_name: style.font_name.clone(),
        font_size: style.font_size,
        font_color,
        fill,
        number_format: style.number_format.clone(),
        align: style.align,
        border_bottom: style.border_bottom,
        parity,
        comment: style.comment.clone(),
    }
}

/// Width per column from the rendered string lengths, header included, with
/// padding and a hard cap.
fn column_widths(header: &[RenderedCell], rows: &[Vec<Option<RenderedCell>>]) -> Vec<f64> {
    header
        .iter()
        .enumerate()
        .map(|(c, head)| {
            let mut longest = head.text.chars().count();
            for row in rows {
                if let Some(cell) = &row[c] {
                    longest = longest.max(cell.text.chars().count());
                }
            }
            ((longest + WIDTH_PADDING) as f64).min(MAX_COLUMN_WIDTH)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Emission
// ---------------------------------------------------------------------------

fn parse_hex_color(hex: &str) -> Color {
    let s = hex.strip_prefix('#').unwrap_or(hex);
    match u32::from_str_radix(s, 16) {
        Ok(n) => Color::RGB(n),
        Err(_) => Color::Black,
    }
}

fn map_align(align: Option<Align>) -> FormatAlign {
    match align.unwrap_or(Align::Right) {
        Align::General => FormatAlign::General,
        Align::Left => FormatAlign::Left,
        Align::Center => FormatAlign::Center,
        Align::Right => FormatAlign::Right,
        Align::Justify => FormatAlign::Justify,
    }
}

/// Build a `Format` from a resolved cell.
fn build_format(cell: &RenderedCell) -> Format {
    let mut f = Format::new()
        .set_num_format(cell.number_format.as_deref().unwrap_or("#,##0"))
        .set_align(map_align(cell.align))
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap()
        .set_reading_direction(2);
    if cell.bold {
        f = f.set_bold();
    }
    if let Some(name) = &cell.font_name {
        f = f.set_font_name(name);
    }
    if let Some(size) = cell.font_size {
        f = f.set_font_size(size);
    }
    if let Some(color) = &cell.font_color {
        f = f.set_font_color(parse_hex_color(color));
    }
    if let Some(fill) = &cell.fill {
        f = f.set_background_color(parse_hex_color(fill));
    } else if cell.parity != Some(1) {
        f = f.set_background_color(parse_hex_color(BG_COLOR_DEFAULT));
    }
    if cell.border_bottom {
        f = f.set_border_bottom(FormatBorder::Thin);
    }
    f
}

/// Format for columns absent from a row: neutral fill, otherwise defaults.
fn missing_cell_format() -> Format {
    Format::new()
        .set_num_format("#,##0")
        .set_align(FormatAlign::Right)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap()
        .set_reading_direction(2)
        .set_background_color(parse_hex_color(BG_COLOR_MISSING))
}

fn write_rendered(
    ws: &mut Worksheet,
    row: u32,
    col: u16,
    cell: Option<&RenderedCell>,
) -> Result<(), XlsxError> {
    let Some(cell) = cell else {
        ws.write_blank(row, col, &missing_cell_format())?;
        return Ok(());
    };
    let format = build_format(cell);
    ws.write_string_with_format(row, col, &cell.text, &format)?;
    if let Some(text) = &cell.comment {
        let note = Note::new(text.as_str())
            .set_author("-")
            .add_author_prefix(false);
        ws.insert_note(row, col, &note)?;
    }
    Ok(())
}

pub(crate) fn build_workbook(layout: Layout) -> RenderResult<Workbook> {
    let mut workbook = Workbook::new();
    let mut ws = Worksheet::new();
    ws.set_name(&layout.title)?;
    ws.set_right_to_left(true);
    // Summary rows sit above their groups.
    ws.group_symbols_above(true);

    for (col, cell) in layout.header.iter().enumerate() {
        write_rendered(&mut ws, 0, col as u16, Some(cell))?;
    }
    for (i, row) in layout.rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            write_rendered(&mut ws, i as u32 + 1, col as u16, cell.as_ref())?;
        }
    }

    for (col, width) in layout.widths.iter().enumerate() {
        ws.set_column_width(col as u16, *width)?;
    }

    for outline in &layout.outlines {
        debug!(
            "grouping level {} rows {}..={}",
            outline.level, outline.first_row, outline.last_row
        );
        if outline.collapsed {
            ws.group_rows_collapsed(outline.first_row, outline.last_row)?;
        } else {
            ws.group_rows(outline.first_row, outline.last_row)?;
        }
    }

    ws.set_freeze_panes(1, 0)?;
    workbook.push_worksheet(ws);
    Ok(workbook)
}

impl<K: Ord> ReportTable<K> {
    /// Finalize the table and write the workbook to `path`.
    ///
    /// Consumes the table: columns are ordered by sort key, rows by row key,
    /// parity and palette styles resolved, outline groups computed (a
    /// non-contiguous group panics before anything is written), repeated
    /// hierarchical labels blanked, columns auto-sized, the header row
    /// frozen and the sheet set right-to-left.
    pub fn save(self, path: impl AsRef<Path>) -> RenderResult<()> {
        let layout = Layout::build(self);
        let mut workbook = build_workbook(layout)?;
        workbook.save(path.as_ref())?;
        Ok(())
    }

    /// Like [`save`](Self::save), returning the workbook bytes instead of
    /// writing a file.
    pub fn save_to_buffer(self) -> RenderResult<Vec<u8>> {
        let layout = Layout::build(self);
        let mut workbook = build_workbook(layout)?;
        Ok(workbook.save_to_buffer()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{color_scheme_red_green, BG_COLOR_HEADER, BG_COLOR_NAMES};

    fn text(cell: &Option<RenderedCell>) -> &str {
        cell.as_ref().map(|c| c.text.as_str()).unwrap_or("∅")
    }

    #[test]
    fn rows_sort_by_key_and_columns_by_hint() {
        let mut table: ReportTable<(i32, i32)> = ReportTable::new("t");
        table.new_row((2, 0));
        table.set("b", "row2-b", 20, Style::new());
        table.set("a", "row2-a", 10, Style::new());
        table.new_row((1, 5));
        table.set("a", "row1-a", 10, Style::new());
        table.set("b", "row1-b", 20, Style::new());

        let layout = Layout::build(table);
        assert_eq!(layout.header[0].text, "a");
        assert_eq!(layout.header[1].text, "b");
        assert_eq!(text(&layout.rows[0][0]), "row1-a");
        assert_eq!(text(&layout.rows[1][1]), "row2-b");
    }

    #[test]
    fn column_order_ties_keep_first_appearance() {
        let mut table: ReportTable<i32> = ReportTable::new("t");
        table.new_row(1);
        table.set("z", 1, 5, Style::new());
        table.set("m", 2, 5, Style::new());
        table.set("a", 3, 5, Style::new());
        let layout = Layout::build(table);
        let titles: Vec<&str> = layout.header.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(titles, ["z", "m", "a"]);
    }

    #[test]
    fn header_row_is_bold_with_header_fill() {
        let mut table: ReportTable<i32> = ReportTable::new("t");
        table.new_row(1);
        table.set("col", 1, 0, Style::new().set_background_color(BG_COLOR_NAMES));
        let layout = Layout::build(table);
        let head = &layout.header[0];
        assert!(head.bold);
        assert!(head.border_bottom);
        assert_eq!(head.fill.as_deref(), Some(BG_COLOR_HEADER));
    }

    #[test]
    fn parity_alternates_strictly_in_final_row_order() {
        let mut table: ReportTable<i32> = ReportTable::new("t");
        // Inserted in reverse to prove parity follows the sorted order.
        for key in (0..4).rev() {
            table.new_row(key);
            table.set("v", key, 0, Style::new().set_parity());
        }
        let layout = Layout::build(table);
        let parities: Vec<Option<u8>> = layout
            .rows
            .iter()
            .map(|row| row[0].as_ref().unwrap().parity)
            .collect();
        assert_eq!(parities, [Some(0), Some(1), Some(0), Some(1)]);
    }

    #[test]
    fn missing_columns_render_as_gaps() {
        let mut table: ReportTable<i32> = ReportTable::new("t");
        table.new_row(1);
        table.set("a", 1, 0, Style::new());
        table.set("b", 2, 1, Style::new());
        table.new_row(2);
        table.set("a", 3, 0, Style::new());
        let layout = Layout::build(table);
        assert!(layout.rows[1][1].is_none());
    }

    #[test]
    fn cleanup_blanks_repeated_hierarchical_labels() {
        let mut table: ReportTable<i32> =
            ReportTable::new("t").set_cleanup_fields(["סעיף", "תחום"]);
        for (key, sec, sub) in [(1, "Sec1", "Sub1"), (2, "Sec1", "Sub1"), (3, "Sec1", "Sub2")] {
            table.new_row(key);
            table.set("סעיף", sec, 0, Style::new());
            table.set("תחום", sub, 1, Style::new());
        }
        let layout = Layout::build(table);
        assert_eq!(text(&layout.rows[0][0]), "Sec1");
        assert_eq!(text(&layout.rows[0][1]), "Sub1");
        assert_eq!(text(&layout.rows[1][0]), "");
        assert_eq!(text(&layout.rows[1][1]), "");
        assert_eq!(text(&layout.rows[2][0]), "");
        assert_eq!(text(&layout.rows[2][1]), "Sub2");
    }

    #[test]
    fn coarser_change_resets_finer_memory() {
        let mut table: ReportTable<i32> =
            ReportTable::new("t").set_cleanup_fields(["סעיף", "תחום"]);
        for (key, sec, sub) in [(1, "Sec1", "Sub1"), (2, "Sec2", "Sub1"), (3, "Sec2", "Sub1")] {
            table.new_row(key);
            table.set("סעיף", sec, 0, Style::new());
            table.set("תחום", sub, 1, Style::new());
        }
        let layout = Layout::build(table);
        // Sec changed on row 1, so Sub1 must re-print even though it repeats.
        assert_eq!(text(&layout.rows[1][0]), "Sec2");
        assert_eq!(text(&layout.rows[1][1]), "Sub1");
        assert_eq!(text(&layout.rows[2][1]), "");
    }

    #[test]
    fn contiguous_run_becomes_one_collapsed_outline() {
        let mut table: ReportTable<i32> = ReportTable::new("t").set_group_fields(["g"]);
        for (key, g) in [(1, "A"), (2, "A"), (3, "A"), (4, "B")] {
            table.new_row(key);
            table.set("g", g, 0, Style::new());
        }
        let layout = Layout::build(table);
        // Data rows 0..=2 are sheet rows 1..=3; the summary row is row 1 and
        // rows 2..=3 collapse under it. Single-row "B" produces no outline.
        assert_eq!(
            layout.outlines,
            vec![Outline {
                level: 1,
                first_row: 2,
                last_row: 3,
                collapsed: true,
            }]
        );
    }

    #[test]
    fn only_the_deepest_level_is_collapsed() {
        let mut table: ReportTable<i32> = ReportTable::new("t").set_group_fields(["sec", "dom"]);
        for (key, sec, dom) in [(1, "S", "D1"), (2, "S", "D1"), (3, "S", "D2"), (4, "S", "D2")] {
            table.new_row(key);
            table.set("sec", sec, 0, Style::new());
            table.set("dom", dom, 1, Style::new());
        }
        let layout = Layout::build(table);
        let level1: Vec<&Outline> = layout.outlines.iter().filter(|o| o.level == 1).collect();
        let level2: Vec<&Outline> = layout.outlines.iter().filter(|o| o.level == 2).collect();
        assert_eq!(level1.len(), 1);
        assert!(!level1[0].collapsed);
        assert_eq!(level2.len(), 2);
        assert!(level2.iter().all(|o| o.collapsed));
    }

    #[test]
    #[should_panic(expected = "not contiguous")]
    fn non_contiguous_group_is_fatal() {
        let mut table: ReportTable<i32> = ReportTable::new("t").set_group_fields(["g"]);
        for (key, g) in [(1, "A"), (2, "B"), (3, "A")] {
            table.new_row(key);
            table.set("g", g, 0, Style::new());
        }
        let _ = Layout::build(table);
    }

    #[test]
    fn group_ranges_use_labels_before_cleanup() {
        let mut table: ReportTable<i32> = ReportTable::new("t")
            .set_group_fields(["g"])
            .set_cleanup_fields(["g"]);
        for (key, g) in [(1, "A"), (2, "A"), (3, "B")] {
            table.new_row(key);
            table.set("g", g, 0, Style::new());
        }
        let layout = Layout::build(table);
        // Cleanup blanked the second "A", yet the group still spans both rows.
        assert_eq!(layout.outlines.len(), 1);
        assert_eq!(layout.outlines[0].first_row, 2);
        assert_eq!(layout.outlines[0].last_row, 2);
        assert_eq!(text(&layout.rows[1][0]), "");
    }

    #[test]
    fn computed_background_follows_the_value() {
        let mut table: ReportTable<i32> = ReportTable::new("t");
        for (key, change) in [(1, 0.10), (2, -0.10), (3, 0.02)] {
            table.new_row(key);
            table.set(
                "שינוי",
                change,
                0,
                Style::new().set_background_color(ColorSpec::Computed(color_scheme_red_green)),
            );
        }
        let layout = Layout::build(table);
        let fills: Vec<&str> = layout
            .rows
            .iter()
            .map(|row| row[0].as_ref().unwrap().fill.as_deref().unwrap())
            .collect();
        assert_eq!(fills, ["FF0000", "00FF00", "FFFFFF"]);
    }

    #[test]
    fn alternating_palette_advances_and_resets() {
        let palette = ["0d0f42", "141664"];
        let mut table: ReportTable<i32> = ReportTable::new("t");
        for (key, with_palette) in [(1, true), (2, true), (3, false), (4, true)] {
            table.new_row(key);
            if with_palette {
                table.set("v", "x", 0, Style::new().set_background_color(palette));
            } else {
                table.set("v", "x", 0, Style::new());
            }
        }
        let layout = Layout::build(table);
        let fills: Vec<Option<&str>> = layout
            .rows
            .iter()
            .map(|row| row[0].as_ref().unwrap().fill.as_deref())
            .collect();
        // Row 3 resolved no palette style, so the counter restarts at row 4.
        assert_eq!(
            fills,
            [Some("0d0f42"), Some("141664"), None, Some("0d0f42")]
        );
    }

    #[test]
    fn widths_follow_rendered_lengths_and_cap() {
        let mut table: ReportTable<i32> = ReportTable::new("t");
        table.new_row(1);
        table.set("n", 1234.5, 0, Style::new());
        table.set("long", "א".repeat(60), 1, Style::new());
        let layout = Layout::build(table);
        // "1,234.50" is 8 characters, plus padding.
        assert_eq!(layout.widths[0], 10.0);
        assert_eq!(layout.widths[1], MAX_COLUMN_WIDTH);
    }
}
