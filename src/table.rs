//! Row and column accumulation.

use indexmap::IndexMap;

use crate::style::{Style, BG_COLOR_HEADER};
use crate::value::Value;

/// A value plus its style options.
#[derive(Debug, Clone)]
pub(crate) struct Cell {
    pub(crate) value: Value,
    pub(crate) style: Style,
}

/// Column metadata, registered on the first `set` of its title.
#[derive(Debug, Clone)]
pub(crate) struct Header {
    /// Position hint; ties keep first-appearance order.
    pub(crate) order: i64,
    pub(crate) style: Style,
}

/// Accumulates rows and column metadata, then renders a styled, right-to-left
/// xlsx worksheet with outline row groups and merged-look hierarchical labels.
///
/// `K` is the caller-chosen row key; ascending `K` order is the sole control
/// over output row order, and grouping and label cleanup both assume that
/// rows sharing a hierarchy value are contiguous under that order.
///
/// A table is mutated by repeated [`new_row`](Self::new_row) /
/// [`set`](Self::set) cycles and finalized by a single
/// [`save`](Self::save) call, which consumes it.
pub struct ReportTable<K> {
    pub(crate) title: String,
    pub(crate) headers: IndexMap<String, Header>,
    pub(crate) rows: Vec<(K, IndexMap<String, Cell>)>,
    pub(crate) group_fields: Vec<String>,
    pub(crate) cleanup_fields: Vec<String>,
}

impl<K: Ord> ReportTable<K> {
    /// Create an empty table. `title` becomes the worksheet name.
    pub fn new(title: impl Into<String>) -> ReportTable<K> {
        ReportTable {
            title: title.into(),
            headers: IndexMap::new(),
            rows: Vec::new(),
            group_fields: Vec::new(),
            cleanup_fields: Vec::new(),
        }
    }

    /// Columns whose contiguous equal-value runs become collapsible outline
    /// row ranges, coarsest first. The listed position is the outline level
    /// (1-based); the deepest level is collapsed by default.
    pub fn set_group_fields<I, S>(mut self, fields: I) -> ReportTable<K>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Columns whose repeated values (relative to the previous row) are
    /// blanked to simulate merged hierarchical label cells, coarsest first.
    pub fn set_cleanup_fields<I, S>(mut self, fields: I) -> ReportTable<K>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cleanup_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Start a new row buffer associated with `key` and make it active.
    pub fn new_row(&mut self, key: K) {
        self.rows.push((key, IndexMap::new()));
    }

    /// Write `value` into the active row under the column `title`.
    ///
    /// The first occurrence of a title registers the column with `order` as
    /// its position hint and a header style derived from this call's options,
    /// with forced overrides: bold, bottom border, header fill. Subsequent
    /// calls never move the column.
    ///
    /// # Panics
    ///
    /// Panics if called before the first [`new_row`](Self::new_row).
    pub fn set(&mut self, title: &str, value: impl Into<Value>, order: i64, style: Style) {
        if !self.headers.contains_key(title) {
            let header_style = style
                .clone()
                .set_bold()
                .set_border_bottom()
                .set_background_color(BG_COLOR_HEADER);
            let header = Header {
                order,
                style: header_style,
            };
            self.headers.insert(title.to_string(), header);
        }

        let row = self
            .rows
            .last_mut()
            .map(|(_, row)| row)
            .expect("set() called with no active row; call new_row() first");
        let cell = Cell {
            value: value.into(),
            style,
        };
        row.insert(title.to_string(), cell);
    }

    /// The active row's value for `title`, if set.
    ///
    /// Used to read back derived values for later-column computation (e.g. a
    /// percentage from two cells already set in the same row).
    pub fn get(&self, title: &str) -> Option<&Value> {
        self.rows
            .last()
            .and_then(|(_, row)| row.get(title))
            .map(|cell| &cell.value)
    }

    /// Number of accumulated rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::ColorSpec;

    #[test]
    fn first_set_fixes_column_order() {
        let mut table: ReportTable<i64> = ReportTable::new("t");
        table.new_row(1);
        table.set("a", 1, 10, Style::new());
        table.set("b", 2, 20, Style::new());
        // A later call with a different hint does not move the column.
        table.set("a", 3, 99, Style::new());
        assert_eq!(table.headers.get("a").unwrap().order, 10);
        assert_eq!(table.headers.get("b").unwrap().order, 20);
    }

    #[test]
    fn header_style_forces_bold_border_and_fill() {
        let mut table: ReportTable<i64> = ReportTable::new("t");
        table.new_row(1);
        table.set(
            "שם סעיף",
            "בטחון",
            0,
            Style::new().set_background_color("fabf8f").set_comment("c"),
        );
        let header = table.headers.get("שם סעיף").unwrap();
        assert!(header.style.bold);
        assert!(header.style.border_bottom);
        assert!(matches!(
            header.style.background_color,
            Some(ColorSpec::Literal(ref c)) if c == BG_COLOR_HEADER
        ));
        // Derived from the first call's options, comment included.
        assert_eq!(header.style.comment.as_deref(), Some("c"));
    }

    #[test]
    fn get_round_trips_within_the_active_row() {
        let mut table: ReportTable<i64> = ReportTable::new("t");
        table.new_row(1);
        table.set("2025", 12.5, 0, Style::new());
        assert_eq!(table.get("2025"), Some(&Value::Float(12.5)));
        assert_eq!(table.get("2024"), None);
        table.new_row(2);
        // The sentinel refers to the new active row, not the previous one.
        assert_eq!(table.get("2025"), None);
    }

    #[test]
    fn get_before_any_row_is_absent() {
        let table: ReportTable<i64> = ReportTable::new("t");
        assert_eq!(table.get("x"), None);
    }

    #[test]
    #[should_panic(expected = "no active row")]
    fn set_before_new_row_panics() {
        let mut table: ReportTable<i64> = ReportTable::new("t");
        table.set("a", 1, 0, Style::new());
    }
}
