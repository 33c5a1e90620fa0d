//! HTML report writer.
//!
//! Renders the rows as a single `<table>` through the `askama` template in
//! `templates/report.html`. Askama escapes every interpolated value, so
//! paths containing markup characters are safe to embed.

use std::io::Write;

use askama::Template;
use chrono::Local;

use super::{ReportError, ReportRow};

/// Template context for the HTML report.
#[derive(Template)]
#[template(path = "report.html")]
pub struct HtmlReport {
    /// Formatted generation timestamp
    pub timestamp: String,
    /// Application version
    pub version: String,
    /// Table rows, display-ready
    pub rows: Vec<HtmlRow>,
}

/// One table row with every column pre-formatted.
pub struct HtmlRow {
    /// File path
    pub path: String,
    /// Size in bytes
    pub size: u64,
    /// Hex digest or empty
    pub hash: String,
    /// Group ID or empty
    pub group_id: String,
}

impl HtmlReport {
    /// Build the template context from report rows.
    #[must_use]
    pub fn new(rows: &[ReportRow]) -> Self {
        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            rows: rows
                .iter()
                .map(|row| HtmlRow {
                    path: row.path.clone(),
                    size: row.size,
                    hash: row.hash.clone(),
                    group_id: row.group_id.map(|id| id.to_string()).unwrap_or_default(),
                })
                .collect(),
        }
    }

    /// Generate the HTML string.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn to_html(&self) -> Result<String, askama::Error> {
        self.render()
    }

    /// Write the HTML report to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or writing fails.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), ReportError> {
        let html = self.to_html()?;
        writer.write_all(html.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}
