//! Output formatting.

pub mod pretty;

use crate::cli::OutputFormat;
use serde::Serialize;

/// Prints `value` as compact JSON, or through `pretty` for humans.
pub fn emit<T: Serialize + ?Sized>(
    format: OutputFormat,
    value: &T,
    pretty: impl FnOnce(&T) -> String,
) {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(value).unwrap_or_default()),
        OutputFormat::Pretty => println!("{}", pretty(value)),
    }
}

/// Pretty fallback for values without a dedicated layout.
pub fn as_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}
