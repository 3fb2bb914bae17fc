//! Output formatting utilities

use crate::OutputFormat;
use console::style;
use grab_types::TransferOutcome;

/// Print the final outcome in the requested format
pub fn print_outcome(outcome: &TransferOutcome, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(outcome)?);
        }
        OutputFormat::Human => {
            println!("{}", describe(outcome));
        }
    }
    Ok(())
}

fn describe(outcome: &TransferOutcome) -> String {
    if outcome.success {
        let path = outcome
            .saved_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        match outcome.bytes_transferred {
            Some(bytes) => format!(
                "{} Saved {} ({})",
                style("✓").green().bold(),
                path,
                format_bytes(bytes)
            ),
            None => format!("{} Saved {}", style("✓").green().bold(), path),
        }
    } else {
        let reason = outcome
            .error
            .as_ref()
            .map(|e| format!("{} ({:?})", e.message, e.kind))
            .unwrap_or_else(|| "unknown error".to_string());
        format!("{} Failed: {}", style("✗").red().bold(), reason)
    }
}

/// Format bytes as human-readable
pub fn format_bytes(bytes: u64) -> String {
    human_bytes::human_bytes(bytes as f64)
}

/// Format speed as human-readable
pub fn format_speed(bytes_per_sec: u64) -> String {
    format!("{}/s", human_bytes::human_bytes(bytes_per_sec as f64))
}
