//! CLI subcommand implementations for the `mybinlog` binary.
//!
//! Argument parsing uses clap derive macros, with the top-level [`app::Cli`]
//! struct and [`app::Commands`] enum defined in [`app`] and shared between
//! `main.rs` and `build.rs` (for man page generation) via `include!()`.
//!
//! Each subcommand module has an `Options` struct holding the parsed
//! arguments and a `pub fn execute(opts, writer) -> Result<(), BinlogError>`
//! entry point. The `writer: &mut dyn Write` parameter allows output to be
//! captured in tests or redirected to a file via the global `--output` flag.
//!
//! # Subcommands
//!
//! | Command | Module | Purpose |
//! |---------|--------|---------|
//! | `mybinlog events` | [`events`] | Decode every event as tab-separated text or JSON lines |
//! | `mybinlog info` | [`info`] | Format descriptor summary and per-type record counts |
//! | `mybinlog completions` | - | Shell completion scripts |
//!
//! The `wprintln!` and `wprint!` macros wrap `writeln!`/`write!` to convert
//! `io::Error` into `BinlogError`.

pub mod app;
pub mod events;
pub mod info;

/// Write a line to the given writer, converting io::Error to BinlogError.
macro_rules! wprintln {
    ($w:expr) => {
        writeln!($w).map_err(|e| $crate::BinlogError::Io(e.to_string()))
    };
    ($w:expr, $($arg:tt)*) => {
        writeln!($w, $($arg)*).map_err(|e| $crate::BinlogError::Io(e.to_string()))
    };
}

/// Write (without newline) to the given writer, converting io::Error to BinlogError.
macro_rules! wprint {
    ($w:expr, $($arg:tt)*) => {
        write!($w, $($arg)*).map_err(|e| $crate::BinlogError::Io(e.to_string()))
    };
}

pub(crate) use wprint;
pub(crate) use wprintln;

use chrono::DateTime;

/// Render a record timestamp as `YYYY/MM/DD HH:MM:SS UTC`.
///
/// # Examples
///
/// ```
/// use mysqlbinlog::cli::format_timestamp;
///
/// assert_eq!(format_timestamp(0), "1970/01/01 00:00:00 UTC");
/// assert_eq!(format_timestamp(1_434_000_000), "2015/06/11 05:20:00 UTC");
/// ```
pub fn format_timestamp(timestamp: u32) -> String {
    match DateTime::from_timestamp(timestamp as i64, 0) {
        Some(dt) => dt.format("%Y/%m/%d %H:%M:%S UTC").to_string(),
        None => format!("@{}", timestamp),
    }
}

/// Serialize a value to a single JSON line.
pub(crate) fn to_json_line<T: serde::Serialize>(value: &T) -> Result<String, crate::BinlogError> {
    serde_json::to_string(value)
        .map_err(|e| crate::BinlogError::Parse(format!("JSON serialization error: {}", e)))
}
