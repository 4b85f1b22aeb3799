//! Binlog file structure constants.
//!
//! Offsets and sizes for the v4 binlog layout. Record header fields are
//! little-endian; body offsets are relative to the first byte after the
//! (possibly extended) record header.

// File signature
/// Magic bytes at offset 0 of every binlog file (`\xfebin`).
pub const BINLOG_MAGIC: [u8; 4] = [0xFE, 0x62, 0x69, 0x6E];
/// Size of the magic signature.
pub const BINLOG_MAGIC_LEN: usize = 4;

// Record header (common to every event)
/// Timestamp (seconds since the epoch, 4 bytes).
pub const EVENT_TIMESTAMP: usize = 0;
/// Event type tag (1 byte).
pub const EVENT_TYPE_CODE: usize = 4;
/// Originating server id (4 bytes).
pub const EVENT_SERVER_ID: usize = 5;
/// Total event length including the header (4 bytes).
pub const EVENT_LENGTH: usize = 9;
/// Absolute file position of the next record (4 bytes).
pub const EVENT_NEXT_POSITION: usize = 13;
/// Event flags (2 bytes, consumed but unused).
pub const EVENT_FLAGS: usize = 17;
/// Size of the fixed record header fields.
pub const COMMON_HEADER_LEN: usize = 19;

// Format descriptor body
/// Binlog format version pair (2 bytes).
pub const FDE_BINLOG_VERSION_LEN: usize = 2;
/// Fixed-width, NUL-padded server version text.
pub const FDE_SERVER_VERSION_LEN: usize = 50;
/// Creation timestamp embedded in the descriptor body (ignored).
pub const FDE_CREATE_TIMESTAMP_LEN: usize = 4;
/// Declared header length for every following record (1 byte).
pub const FDE_HEADER_LENGTH_LEN: usize = 1;
/// Bytes of the descriptor body read at open.
pub const FDE_FIXED_BODY_LEN: usize = FDE_BINLOG_VERSION_LEN
    + FDE_SERVER_VERSION_LEN
    + FDE_CREATE_TIMESTAMP_LEN
    + FDE_HEADER_LENGTH_LEN;
/// The only accepted format version bytes (major 4, minor 0).
pub const SUPPORTED_BINLOG_VERSION: [u8; 2] = [0x04, 0x00];

// Query event body
/// Thread id (4) + execution time (4), unused.
pub const QUERY_DB_NAME_LEN: usize = 8;
/// Error code (2 bytes, unused) follows the database name length.
pub const QUERY_ERROR_CODE: usize = 9;
/// Length of the status variable block (2 bytes).
pub const QUERY_STATUS_VARS_LEN: usize = 11;
/// First byte of the status variable block.
pub const QUERY_STATUS_VARS: usize = 13;

// Rotate event body
/// Position in the next file (8 bytes, unused); the file name follows.
pub const ROTATE_NEXT_NAME: usize = 8;

// Table map and rows event bodies
/// Width of the little-endian table identifier at offset 0.
pub const TABLE_ID_LEN: usize = 6;
/// Database name length byte in a table map body (after table id + flags).
pub const TABLE_MAP_DB_NAME_LEN: usize = 8;
/// Column count (length-encoded) in a rows event body.
pub const ROWS_COLUMN_COUNT: usize = 8;
