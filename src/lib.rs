//! Styled xlsx report tables.
//!
//! [`ReportTable`] accumulates heterogeneous rows keyed by composite
//! identifiers and column metadata keyed by title, then renders a single
//! right-to-left worksheet: stable column ordering, per-cell fonts, fills,
//! number formats and notes, alternating-row shading, collapsible outline
//! row groups mirroring a multi-level code hierarchy, and merged-looking
//! hierarchical labels produced by blanking repeated values.
//!
//! Row order is controlled entirely by the caller's row keys; grouping and
//! label cleanup require that rows sharing a hierarchy value sort
//! contiguously.
//!
//! ```no_run
//! use luach::{color_scheme_red_green, ColorSpec, ReportTable, Style, BG_COLOR_NAMES};
//!
//! let mut table = ReportTable::new("השוואת הצעת התקציב")
//!     .set_group_fields(["קוד סעיף"])
//!     .set_cleanup_fields(["קוד סעיף", "שם סעיף"]);
//!
//! table.new_row(("0020".to_string(), 2025));
//! table.set("קוד סעיף", "0020", 0, Style::new().set_background_color(BG_COLOR_NAMES));
//! table.set("שם סעיף", "חינוך", 1, Style::new().set_background_color(BG_COLOR_NAMES));
//! table.set("2025", 1234.5, 10, Style::new().set_parity());
//! table.set(
//!     "שינוי",
//!     0.07,
//!     20,
//!     Style::new()
//!         .set_number_format("0%")
//!         .set_background_color(ColorSpec::Computed(color_scheme_red_green)),
//! );
//! table.save("report.xlsx")?;
//! # Ok::<(), luach::RenderError>(())
//! ```

mod error;
mod render;
mod style;
mod table;
mod value;

pub use error::{RenderError, RenderResult};
pub use style::{
    color_scheme_red_green, Align, ColorSpec, Style, BG_COLOR_DEFAULT, BG_COLOR_HEADER,
    BG_COLOR_MISSING, BG_COLOR_NAMES,
};
pub use table::ReportTable;
pub use value::Value;
