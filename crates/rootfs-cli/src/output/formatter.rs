//! Output formatter trait for CLI results.

use anyhow::Result;
use rootfs_core::ExtractionReport;

/// Renders command results for the selected output mode.
pub trait OutputFormatter {
    /// Prints the counters of a finished extraction.
    fn format_extraction_result(&self, report: &ExtractionReport) -> Result<()>;

    /// Reports a failed command. Shown even in quiet mode.
    fn format_error(&self, error: &anyhow::Error);

    /// Reports a non-fatal condition before the command runs.
    fn format_warning(&self, message: &str);
}
