//! MySQL binary log format parsing.
//!
//! This module contains types and functions for reading the on-disk layout
//! of MySQL binlog files (format version 4): the magic signature and format
//! descriptor, the fixed record header, the length-encoded integer codec,
//! table map descriptors, and the row images carried by write/update/delete
//! rows events.
//!
//! Start with [`reader::BinlogReader`] to decode a file event by event, or
//! drop down to [`stream::BinlogFile`] plus [`event::decode_event`] to work
//! with raw records.

pub mod column_type;
pub mod constants;
pub mod event;
pub mod event_type;
pub mod packed;
pub mod reader;
pub mod rows;
pub mod stream;
pub mod table_map;
pub mod write;
