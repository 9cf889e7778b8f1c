//! Client-side CSV report assembly.
//!
//! Built from the cached expense list so export works offline. The format
//! targets spreadsheet apps: UTF-8 BOM, `MM/DD/YYYY` dates, quoted
//! descriptions with embedded quotes doubled.

use chrono::NaiveDate;
use shared::Expense;
use std::path::{Path, PathBuf};

/// A rendered report, ready to hand to the host platform.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvReport {
    pub filename: String,
    pub content: String,
}

impl CsvReport {
    /// Write the report into a directory, returning the full path.
    pub fn write_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.content)?;
        Ok(path)
    }
}

/// Render the expense list to CSV.
pub fn build_csv_report(user_id: &str, expenses: &[Expense], today: NaiveDate) -> CsvReport {
    // BOM so Excel detects UTF-8
    let mut content = String::from("\u{feff}");
    content.push_str("Date,Amount,Category,Description\n");

    for expense in expenses {
        let description = expense
            .description
            .as_deref()
            .unwrap_or("")
            .replace('"', "\"\"");
        content.push_str(&format!(
            "{},{},{},\"{}\"\n",
            expense.date.format("%m/%d/%Y"),
            expense.amount,
            expense.category,
            description
        ));
    }

    CsvReport {
        filename: format!("expense-report-{}-{}.csv", user_id, today.format("%Y-%m-%d")),
        content,
    }
}
