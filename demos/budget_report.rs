//! Builds a small national-budget change report from pipeline-shaped JSON
//! rows and renders it to `budget-report.xlsx`.
//!
//! Run with `cargo run --example budget_report`.

use anyhow::Context;
use serde::Deserialize;

use luach::{color_scheme_red_green, ColorSpec, ReportTable, Style, BG_COLOR_NAMES};

/// One change request, as the upstream pipeline would hand it over.
#[derive(Debug, Deserialize)]
struct ChangeRow {
    committee_id: i64,
    budget_code: String,
    section_name: String,
    program_name: String,
    request_title: String,
    /// Requested net change, in NIS.
    net_expense_diff: f64,
    /// Original allocation for the year, in NIS.
    original_budget: f64,
}

const CHANGES_JSON: &str = r#"[
  {"committee_id": 101, "budget_code": "00200118", "section_name": "חינוך",
   "request_title": "תגבור שעות הוראה", "program_name": "חינוך יסודי",
   "net_expense_diff": 12500000.0, "original_budget": 180000000.0},
  {"committee_id": 101, "budget_code": "00200121", "section_name": "חינוך",
   "request_title": "הצטיידות מעבדות", "program_name": "חינוך על-יסודי",
   "net_expense_diff": -4200000.0, "original_budget": 96000000.0},
  {"committee_id": 102, "budget_code": "00210305", "section_name": "בריאות",
   "request_title": "רכש ציוד רפואי", "program_name": "בתי חולים ממשלתיים",
   "net_expense_diff": 30000000.0, "original_budget": 250000000.0},
  {"committee_id": 103, "budget_code": "00210410", "section_name": "בריאות",
   "request_title": "עדכון תעריפים", "program_name": "בריאות הנפש",
   "net_expense_diff": 1000000.0, "original_budget": 88000000.0}
]"#;

/// White-on-blue scheme cycled across consecutive requests.
const BLUE_SCHEME: [&str; 4] = ["0d0f42", "1b1d85", "282cc7", "7072da"];

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let changes: Vec<ChangeRow> =
        serde_json::from_str(CHANGES_JSON).context("parsing change rows")?;

    let mut table = ReportTable::new("שינויים לשנה השוטפת")
        .set_group_fields(["שם סעיף"])
        .set_cleanup_fields(["שם סעיף"]);

    for row in &changes {
        table.new_row((row.budget_code.clone(), row.committee_id));

        table.set(
            "מספר פנייה",
            row.committee_id,
            0,
            Style::new().set_color("FFFFFF").set_background_color("FF6432"),
        );
        table.set(
            "קוד סעיף",
            &row.budget_code[2..4],
            1,
            Style::new().set_color("FFFFFF").set_background_color(BLUE_SCHEME),
        );
        table.set(
            "שם סעיף",
            row.section_name.as_str(),
            2,
            Style::new().set_color("FFFFFF").set_background_color(BLUE_SCHEME),
        );
        table.set(
            "קוד תכנית",
            row.budget_code.as_str(),
            3,
            Style::new().set_background_color(BG_COLOR_NAMES),
        );
        table.set(
            "שם תכנית",
            row.program_name.as_str(),
            4,
            Style::new().set_background_color(BG_COLOR_NAMES),
        );
        table.set(
            "תיאור בקשה",
            row.request_title.as_str(),
            5,
            Style::new().set_background_color("FBFFF3"),
        );
        table.set(
            "בקשת השינוי נטו במלש\"ח",
            row.net_expense_diff / 1_000_000.0,
            6,
            Style::new().set_number_format("#,##0.0").set_parity(),
        );
        table.set(
            "מקורי 2025 במלש\"ח",
            row.original_budget / 1_000_000.0,
            7,
            Style::new().set_number_format("#,##0.0").set_parity(),
        );

        let change_rate = row.net_expense_diff / row.original_budget;
        table.set(
            "שיעור השינוי המבוקש",
            (change_rate * 100.0).round() / 100.0,
            8,
            Style::new()
                .set_number_format("0%")
                .set_background_color(ColorSpec::Computed(color_scheme_red_green)),
        );
    }

    table
        .save("budget-report.xlsx")
        .context("rendering budget-report.xlsx")?;
    println!("wrote budget-report.xlsx");
    Ok(())
}
