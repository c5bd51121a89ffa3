//! Error types for report rendering.

/// Result type alias for save operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;

/// Errors that can occur while rendering and saving a report.
///
/// Caller-contract violations — `set` outside a row, a group whose rows are
/// not contiguous after sorting — are panics, not errors: they indicate a bug
/// in the data pipeline feeding the table, and generation aborts before any
/// file is written.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The workbook writer rejected the document or failed to persist it.
    #[error("Failed to write workbook: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),
}
