//! Result recording to the CSV output sink

use crate::error::{AppError, Result};
use crate::models::LatencyRecord;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Fixed CSV header row
pub const CSV_HEADER: &str = "Time,Src_IP,Dest_IP,Latency (us)";

/// Timestamp format used in every row
pub const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Writes the run's latency records to a CSV file.
///
/// The write truncates any existing file. Zero records is a successful
/// no-op: the file then contains only the header row.
pub struct CsvRecorder;

impl CsvRecorder {
    /// Write header plus one row per record to the given path
    pub fn write_records(path: &Path, records: &[LatencyRecord]) -> Result<()> {
        let file = File::create(path).map_err(|e| {
            AppError::io(format!("cannot write output file {}: {}", path.display(), e))
        })?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "{}", CSV_HEADER)?;
        for record in records {
            writeln!(writer, "{}", Self::format_row(record))?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Format a single record as a CSV row
    fn format_row(record: &LatencyRecord) -> String {
        format!(
            "{},{},{},{}",
            record.timestamp.format(TIMESTAMP_FORMAT),
            record.src_ip,
            record.dest_ip,
            record.latency_us
        )
    }
}
