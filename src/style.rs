//! Cell style options and color resolution.

use crate::value::Value;

/// Header row fill.
pub const BG_COLOR_HEADER: &str = "95b3d7";
/// Fill used by the hierarchy name/label columns.
pub const BG_COLOR_NAMES: &str = "fabf8f";
/// Fallback fill for cells with no explicit background and no parity shading.
pub const BG_COLOR_DEFAULT: &str = "CAE9F5";
/// Fill for columns absent from a row.
pub const BG_COLOR_MISSING: &str = "cccccc";

/// A font or fill color.
///
/// Either a literal `RRGGBB` hex string, a pure function of the cell value
/// evaluated at render time, or a palette cycled by the alternating-row
/// counter.
#[derive(Debug, Clone)]
pub enum ColorSpec {
    Literal(String),
    Computed(fn(&Value) -> String),
    Alternating(Vec<String>),
}

impl From<&str> for ColorSpec {
    fn from(hex: &str) -> Self {
        ColorSpec::Literal(hex.to_string())
    }
}

impl From<String> for ColorSpec {
    fn from(hex: String) -> Self {
        ColorSpec::Literal(hex)
    }
}

impl From<fn(&Value) -> String> for ColorSpec {
    fn from(f: fn(&Value) -> String) -> Self {
        ColorSpec::Computed(f)
    }
}

impl From<Vec<String>> for ColorSpec {
    fn from(palette: Vec<String>) -> Self {
        ColorSpec::Alternating(palette)
    }
}

impl<const N: usize> From<[&str; N]> for ColorSpec {
    fn from(palette: [&str; N]) -> Self {
        ColorSpec::Alternating(palette.iter().map(|s| s.to_string()).collect())
    }
}

/// Horizontal cell alignment. The rendered default is [`Align::Right`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    General,
    Left,
    Center,
    Right,
    Justify,
}

/// Style options for a cell, and — on the first `set` of a column — the seed
/// for that column's header style.
///
/// Options left unset fall back at render time: number format `#,##0`,
/// right/vertical-center alignment with wrapping, and the default fill rules
/// described on [`ReportTable::save`](crate::ReportTable::save).
#[derive(Debug, Clone, Default)]
pub struct Style {
    pub(crate) bold: bool,
    pub(crate) color: Option<ColorSpec>,
    pub(crate) background_color: Option<ColorSpec>,
    pub(crate) font_name: Option<String>,
    pub(crate) font_size: Option<f64>,
    pub(crate) number_format: Option<String>,
    pub(crate) align: Option<Align>,
    pub(crate) border_bottom: bool,
    pub(crate) parity: bool,
    pub(crate) comment: Option<String>,
}

impl Style {
    pub fn new() -> Style {
        Style::default()
    }

    pub fn set_bold(mut self) -> Style {
        self.bold = true;
        self
    }

    /// Font color.
    pub fn set_color(mut self, color: impl Into<ColorSpec>) -> Style {
        self.color = Some(color.into());
        self
    }

    pub fn set_background_color(mut self, color: impl Into<ColorSpec>) -> Style {
        self.background_color = Some(color.into());
        self
    }

    pub fn set_font_name(mut self, name: impl Into<String>) -> Style {
        self.font_name = Some(name.into());
        self
    }

    pub fn set_font_size(mut self, size: f64) -> Style {
        self.font_size = Some(size);
        self
    }

    pub fn set_number_format(mut self, format: impl Into<String>) -> Style {
        self.number_format = Some(format.into());
        self
    }

    pub fn set_align(mut self, align: Align) -> Style {
        self.align = Some(align);
        self
    }

    /// Thin border below the cell.
    pub fn set_border_bottom(mut self) -> Style {
        self.border_bottom = true;
        self
    }

    /// Request alternating-row shading: cells flagged with parity and no
    /// explicit background keep the default fill on even rows and render
    /// unfilled on odd rows.
    pub fn set_parity(mut self) -> Style {
        self.parity = true;
        self
    }

    /// Tooltip note attached to the cell.
    pub fn set_comment(mut self, text: impl Into<String>) -> Style {
        self.comment = Some(text.into());
        self
    }
}

/// Stock color scale for percentage-change columns: red above +5%, green
/// below −5%, white otherwise. Absent or non-numeric values map to white.
pub fn color_scheme_red_green(value: &Value) -> String {
    if !value.is_present() {
        return "FFFFFF".to_string();
    }
    let n = match value {
        Value::Empty => return "FFFFFF".to_string(),
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        Value::Text(s) => match s.trim().parse::<f64>() {
            Ok(n) => n,
            Err(_) => return "FFFFFF".to_string(),
        },
    };
    if n > 0.05 {
        "FF0000".to_string()
    } else if n < -0.05 {
        "00FF00".to_string()
    } else {
        "FFFFFF".to_string()
    }
}
