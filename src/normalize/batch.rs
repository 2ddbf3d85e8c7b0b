//! Batch normalization of uploaded log content (line-oriented or CSV).

use super::{extract, Sequence};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Columns searched, in order, for the event text of a CSV row.
const EVENT_COLUMNS: &[&str] = &["event", "action", "activity", "log", "message"];

/// One line of a plain log file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub original: String,
    pub sequence: Sequence,
}

/// One CSV row; `metadata` is the whole row keyed by header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvEntry {
    pub original: String,
    pub sequence: Sequence,
    pub metadata: BTreeMap<String, String>,
}

/// Split on line breaks, skip blank lines, normalize each line.
pub fn process_log_file(content: &str) -> Vec<LogEntry> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let sequence = extract(line);
            if sequence.is_empty() {
                return None;
            }
            Some(LogEntry {
                original: line.to_string(),
                sequence,
            })
        })
        .collect()
}

/// Parse header-delimited rows and normalize the event column of each.
///
/// The event text is taken from the first of `event, action, activity, log,
/// message` present in the header; if none is present, or its value is blank,
/// all values of the row are joined with spaces. Rows the CSV reader rejects
/// are skipped.
pub fn process_csv(content: &str) -> Vec<CsvEntry> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());

    let headers = match reader.headers() {
        Ok(h) => h.clone(),
        Err(e) => {
            warn!(error = %e, "csv header unreadable");
            return Vec::new();
        }
    };

    let mut out = Vec::new();
    for (row_no, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!(row = row_no + 1, error = %e, "skipping malformed csv row");
                continue;
            }
        };

        let metadata: BTreeMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let event = EVENT_COLUMNS
            .iter()
            .find_map(|col| metadata.get(*col))
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| record.iter().collect::<Vec<_>>().join(" "));

        let sequence = extract(&event);
        if sequence.is_empty() {
            continue;
        }
        out.push(CsvEntry {
            original: event,
            sequence,
            metadata,
        });
    }
    out
}
