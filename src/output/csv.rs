//! CSV report writer.
//!
//! UTF-8, comma-delimited, one header row. Fields containing commas, quotes
//! or newlines are quoted by the `csv` crate.

use std::io;

use super::{ReportError, ReportRow, REPORT_HEADERS};

/// CSV output formatter.
pub struct CsvReport<'a> {
    rows: &'a [ReportRow],
}

impl<'a> CsvReport<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(rows: &'a [ReportRow]) -> Self {
        Self { rows }
    }

    /// Write the CSV output to the given writer.
    ///
    /// The header row is written even when there are no rows.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), ReportError> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        csv_writer.write_record(REPORT_HEADERS)?;
        for row in self.rows {
            csv_writer.serialize(row)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if serialization fails.
    pub fn to_string(&self) -> Result<String, ReportError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
