pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;
use tracing::warn;

/// Dispatch output to the formatter for `format`.
///
/// Formats that drop the envelope (csv, minimal) still surface its warnings
/// through the log.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv | OutputFormat::Minimal => {
            if let Some(Value::Array(warnings)) = value.get("warnings") {
                for w in warnings.iter().filter_map(Value::as_str) {
                    warn!("{w}");
                }
            }
            if matches!(format, OutputFormat::Csv) {
                csv_out::print_csv(value);
            } else {
                minimal::print_minimal(value);
            }
        }
    }
}
