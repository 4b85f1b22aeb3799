//! MySQL binary log decoding toolkit.
//!
//! The `binlog-utils` crate (library name `mysqlbinlog`) decodes MySQL row-based
//! replication logs (`mysql-bin.000001` and friends) into typed events:
//! statement markers, transaction boundaries, table map descriptors, and
//! row-level insert/update/delete images.
//!
//! # CLI Reference
//!
//! | Command | Purpose |
//! |---------|---------|
//! | [`mybinlog events`](cli::app::Commands::Events) | Decode every event as tab-separated text or JSON lines |
//! | [`mybinlog info`](cli::app::Commands::Info) | Format descriptor summary and per-type event counts |
//! | [`mybinlog completions`](cli::app::Commands::Completions) | Generate shell completion scripts |
//!
//! All subcommands accept `--color <auto|always|never>`, `--output <file>`
//! and `--debug`.
//!
//! # Library API
//!
//! ```no_run
//! use mysqlbinlog::binlog::reader::BinlogReader;
//! use mysqlbinlog::binlog::event::EventData;
//!
//! let mut reader = BinlogReader::open("mysql-bin.000001").unwrap();
//! println!("server {}", reader.format_descriptor().server_version);
//!
//! while let Some(event) = reader.next_event().unwrap() {
//!     if let EventData::WriteRows(rows) = &event.data {
//!         for row in &rows.rows {
//!             println!("{}.{}: {}", rows.database, rows.table, row);
//!         }
//!     }
//! }
//! ```
//!
//! ## Key entry points
//!
//! | Type / Function | Purpose |
//! |-----------------|---------|
//! | [`BinlogReader`](binlog::reader::BinlogReader) | One decoding session: stream + table registry |
//! | [`BinlogFile`](binlog::stream::BinlogFile) | Raw record stream with magic/descriptor validation |
//! | [`decode_event`](binlog::event::decode_event) | Turn one raw record into a [`BinlogEvent`](binlog::event::BinlogEvent) |
//! | [`TableRegistry`](binlog::table_map::TableRegistry) | Table id to table descriptor mapping |
//! | [`column_image_size`](binlog::rows::column_image_size) | Byte length of one column value in a row image |
//! | [`read_packed_int`](binlog::packed::read_packed_int) | Length-encoded integer decoding |
//!
//! ## Feature flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli` | on | The `mybinlog` binary, memory-mapped input, and text/JSON rendering. |

pub mod binlog;
#[cfg(feature = "cli")]
pub mod cli;

use thiserror::Error;

/// Errors returned by `mysqlbinlog` operations.
#[derive(Error, Debug)]
pub enum BinlogError {
    /// The byte source could not be opened, inspected, or positioned.
    #[error("I/O error: {0}")]
    Io(String),

    /// The stream is not a readable binlog (bad magic, bad or short
    /// format descriptor, unsupported format version).
    #[error("Open error: {0}")]
    Open(String),

    /// A record could not be read while advancing through the stream.
    #[error("Read error: {0}")]
    Read(String),

    /// A field inside one event body is malformed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A row event refers to a table id no table map event has declared.
    #[error("Unresolved table reference: table id {0} has no preceding table map event")]
    UnresolvedTable(u64),

    /// A column's metadata word lies outside the table map metadata block.
    #[error(
        "Invalid metadata access: column {column} needs {width} byte(s) at offset {offset}, block is {block_len} byte(s)"
    )]
    MetadataOverrun {
        column: usize,
        offset: usize,
        width: usize,
        block_len: usize,
    },

    /// A row image contains a column type whose size cannot be computed.
    #[error("Unsupported column type: {0}")]
    UnsupportedColumnType(String),

    /// A length-encoded integer violates its discriminator's minimum.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// An invalid argument was supplied.
    #[error("Invalid argument: {0}")]
    Argument(String),
}

impl BinlogError {
    /// Whether the decoding session must stop after this error.
    ///
    /// Only per-event parse failures and unresolved table references leave
    /// the stream positioned at a valid record boundary; the caller may log
    /// them and move on to the next event.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, BinlogError::Parse(_) | BinlogError::UnresolvedTable(_))
    }
}
