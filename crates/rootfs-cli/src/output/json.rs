//! JSON output formatter for machine-readable results.

use super::formatter::OutputFormatter;
use anyhow::Result;
use rootfs_core::ExtractionReport;
use serde::Serialize;
use std::io::Write;
use std::io::{self};

pub struct JsonFormatter;

/// Envelope around every JSON document the CLI prints.
#[derive(Debug, Serialize)]
struct JsonOutput<T> {
    operation: &'static str,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Success,
    Error,
}

impl<T: Serialize> JsonOutput<T> {
    fn success(operation: &'static str, data: T) -> Self {
        Self {
            operation,
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }
}

impl JsonOutput<()> {
    fn error(error: String) -> Self {
        Self {
            operation: "error",
            status: Status::Error,
            data: None,
            error: Some(error),
        }
    }
}

/// Serialized form of an `ExtractionReport`.
#[derive(Debug, Serialize)]
struct ExtractionOutput {
    files_extracted: usize,
    directories_created: usize,
    symlinks_created: usize,
    hardlinks_created: usize,
    devices_created: usize,
    fifos_created: usize,
    entries_skipped: usize,
    hardlinks_deferred: usize,
    bytes_written: u64,
    duration_ms: u128,
}

impl From<&ExtractionReport> for ExtractionOutput {
    fn from(report: &ExtractionReport) -> Self {
        Self {
            files_extracted: report.files_extracted,
            directories_created: report.directories_created,
            symlinks_created: report.symlinks_created,
            hardlinks_created: report.hardlinks_created,
            devices_created: report.devices_created,
            fifos_created: report.fifos_created,
            entries_skipped: report.entries_skipped,
            hardlinks_deferred: report.hardlinks_deferred,
            bytes_written: report.bytes_written,
            duration_ms: report.duration.as_millis(),
        }
    }
}

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_extraction_result(&self, report: &ExtractionReport) -> Result<()> {
        let output = JsonOutput::success("extract", ExtractionOutput::from(report));
        Self::output(&output)
    }

    fn format_error(&self, error: &anyhow::Error) {
        let output = JsonOutput::error(format!("{error:#}"));
        let _ = Self::output(&output);
    }

    fn format_warning(&self, message: &str) {
        #[derive(Serialize)]
        struct WarningData {
            message: String,
        }

        let output = JsonOutput::success(
            "warning",
            WarningData {
                message: message.to_string(),
            },
        );
        let _ = Self::output(&output);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_extraction_output_structure() {
        let report = ExtractionReport {
            files_extracted: 3,
            hardlinks_deferred: 1,
            bytes_written: 42,
            duration: Duration::from_millis(7),
            ..ExtractionReport::default()
        };

        let json = serde_json::to_value(JsonOutput::success(
            "extract",
            ExtractionOutput::from(&report),
        ))
        .unwrap();

        assert_eq!(json["status"], "success");
        assert_eq!(json["data"]["files_extracted"], 3);
        assert_eq!(json["data"]["hardlinks_deferred"], 1);
        assert_eq!(json["data"]["bytes_written"], 42);
        assert_eq!(json["data"]["duration_ms"], 7);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_error_output_structure() {
        let json = serde_json::to_value(JsonOutput::error("boom".into())).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "boom");
        assert!(json.get("data").is_none());
    }
}
