//! Synthetic binlog construction.
//!
//! Builds byte-exact binlog images and event bodies for tests, benchmarks,
//! and fixtures: [`BinlogBuilder`] lays out the magic, the format
//! description event, and a sequence of records with correct lengths and
//! next-position fields, while the `*_body` functions produce bodies for
//! the individual event types.

use byteorder::{ByteOrder, LittleEndian};

use crate::binlog::column_type::ColumnType;
use crate::binlog::constants::*;
use crate::binlog::packed::write_packed_int;

/// Assembles a complete binlog file image in memory.
///
/// # Examples
///
/// ```
/// use mysqlbinlog::binlog::write::{query_body, BinlogBuilder};
///
/// let mut builder = BinlogBuilder::new("5.6.25-log");
/// builder.push(2, 1_434_000_000, &query_body("test", "BEGIN"));
/// let bytes = builder.finish();
/// assert_eq!(&bytes[..4], &[0xFE, b'b', b'i', b'n']);
/// ```
#[derive(Debug, Clone)]
pub struct BinlogBuilder {
    server_version: String,
    server_id: u32,
    header_length: u8,
    records: Vec<(u8, u32, Vec<u8>)>,
}

impl BinlogBuilder {
    /// Start a binlog written by `server_version` with a 19-byte header.
    pub fn new(server_version: &str) -> Self {
        BinlogBuilder {
            server_version: server_version.to_string(),
            server_id: 1,
            header_length: COMMON_HEADER_LEN as u8,
            records: Vec::new(),
        }
    }

    /// Server id written into every record header.
    pub fn server_id(mut self, server_id: u32) -> Self {
        self.server_id = server_id;
        self
    }

    /// Declared header length; records after the descriptor carry
    /// `header_length - 19` zero bytes of header extension.
    pub fn header_length(mut self, header_length: u8) -> Self {
        self.header_length = header_length;
        self
    }

    /// Append a record with the given type code, timestamp, and body.
    pub fn push(&mut self, type_code: u8, timestamp: u32, body: &[u8]) -> &mut Self {
        self.records.push((type_code, timestamp, body.to_vec()));
        self
    }

    /// Produce the file image.
    pub fn finish(&self) -> Vec<u8> {
        let mut out = BINLOG_MAGIC.to_vec();

        let mut fde = vec![0u8; FDE_FIXED_BODY_LEN];
        fde[..FDE_BINLOG_VERSION_LEN].copy_from_slice(&SUPPORTED_BINLOG_VERSION);
        let version = self.server_version.as_bytes();
        let version_len = version.len().min(FDE_SERVER_VERSION_LEN);
        fde[FDE_BINLOG_VERSION_LEN..FDE_BINLOG_VERSION_LEN + version_len]
            .copy_from_slice(&version[..version_len]);
        fde[FDE_FIXED_BODY_LEN - 1] = self.header_length;
        append_record(&mut out, 15, 0, self.server_id, COMMON_HEADER_LEN, &fde);

        for (type_code, timestamp, body) in &self.records {
            append_record(
                &mut out,
                *type_code,
                *timestamp,
                self.server_id,
                self.header_length as usize,
                body,
            );
        }

        out
    }
}

fn append_record(
    out: &mut Vec<u8>,
    type_code: u8,
    timestamp: u32,
    server_id: u32,
    header_length: usize,
    body: &[u8],
) {
    let start = out.len();
    let event_length = header_length + body.len();
    let mut header = vec![0u8; header_length];
    LittleEndian::write_u32(&mut header[EVENT_TIMESTAMP..], timestamp);
    header[EVENT_TYPE_CODE] = type_code;
    LittleEndian::write_u32(&mut header[EVENT_SERVER_ID..], server_id);
    LittleEndian::write_u32(&mut header[EVENT_LENGTH..], event_length as u32);
    LittleEndian::write_u32(
        &mut header[EVENT_NEXT_POSITION..],
        (start + event_length) as u32,
    );
    out.extend_from_slice(&header);
    out.extend_from_slice(body);
}

/// QUERY_EVENT body with an empty status variable block.
pub fn query_body(database: &str, statement: &str) -> Vec<u8> {
    query_body_with_status(database, &[], statement)
}

/// QUERY_EVENT body carrying the given raw status variables.
pub fn query_body_with_status(database: &str, status_vars: &[u8], statement: &str) -> Vec<u8> {
    let mut body = vec![0u8; QUERY_STATUS_VARS];
    LittleEndian::write_u32(&mut body[0..], 1); // thread id
    body[QUERY_DB_NAME_LEN] = database.len() as u8;
    LittleEndian::write_u16(&mut body[QUERY_STATUS_VARS_LEN..], status_vars.len() as u16);
    body.extend_from_slice(status_vars);
    body.extend_from_slice(database.as_bytes());
    body.push(0);
    body.extend_from_slice(statement.as_bytes());
    body
}

/// ROTATE_EVENT body.
pub fn rotate_body(position: u64, next_file: &str) -> Vec<u8> {
    let mut body = vec![0u8; ROTATE_NEXT_NAME];
    LittleEndian::write_u64(&mut body, position);
    body.extend_from_slice(next_file.as_bytes());
    body
}

/// XID_EVENT body.
pub fn xid_body(xid: u64) -> Vec<u8> {
    let mut body = vec![0u8; 8];
    LittleEndian::write_u64(&mut body, xid);
    body
}

/// TABLE_MAP_EVENT body for the given columns.
///
/// Each column's metadata word is written with the width its type
/// requires; a trailing nullability bitmap marks every column nullable.
pub fn table_map_body(
    table_id: u64,
    database: &str,
    table: &str,
    columns: &[(ColumnType, u16)],
) -> Vec<u8> {
    let mut body = vec![0u8; TABLE_MAP_DB_NAME_LEN];
    LittleEndian::write_u48(&mut body[..TABLE_ID_LEN], table_id);

    body.push(database.len() as u8);
    body.extend_from_slice(database.as_bytes());
    body.push(0);
    body.push(table.len() as u8);
    body.extend_from_slice(table.as_bytes());
    body.push(0);

    body.extend(write_packed_int(columns.len() as u64));
    body.extend(columns.iter().map(|(t, _)| t.as_u8()));

    let mut metadata = Vec::new();
    for (column_type, meta) in columns {
        match column_type.metadata_width() {
            1 => metadata.push(*meta as u8),
            2 => metadata.extend_from_slice(&meta.to_le_bytes()),
            _ => {}
        }
    }
    body.extend(write_packed_int(metadata.len() as u64));
    body.extend_from_slice(&metadata);

    body.extend(bitmap(&vec![true; columns.len()]));
    body
}

/// Rows event body: table id, flags, column count, the columns-present
/// bitmaps (one, or two for updates), then the raw row images.
///
/// The bitmaps follow the column count directly, as a server writes them.
/// [`decode_rows`](crate::binlog::rows::decode_rows) reads the bitmap at
/// `ceil(n / 8)` (updates: twice that) bytes past the count's offset, which
/// is the same place only for tables of at most 8 columns. Use
/// [`rows_body_wide`] to build bodies for wider tables.
pub fn rows_body(
    table_id: u64,
    column_count: u64,
    present_bitmaps: &[Vec<u8>],
    row_images: &[u8],
) -> Vec<u8> {
    let mut body = vec![0u8; ROWS_COLUMN_COUNT];
    LittleEndian::write_u48(&mut body[..TABLE_ID_LEN], table_id);
    body.extend(write_packed_int(column_count));
    for bits in present_bitmaps {
        body.extend_from_slice(bits);
    }
    body.extend_from_slice(row_images);
    body
}

/// Rows event body laid out where [`decode_rows`](crate::binlog::rows::decode_rows)
/// looks for the columns-present bitmap.
///
/// The column count (a one-byte packed integer) is followed by zero
/// padding up to offset `8 + ceil(n / 8)` for write/delete events, or
/// `8 + 2 * ceil(n / 8)` when `is_update`; `present` goes there and the row
/// images follow it. For `n <= 8` a write/delete body is byte-identical to
/// [`rows_body`] with one bitmap.
pub fn rows_body_wide(
    table_id: u64,
    column_count: u8,
    is_update: bool,
    present: &[u8],
    row_images: &[u8],
) -> Vec<u8> {
    let mask_len = (column_count as usize).div_ceil(8);
    let bitmap_at = ROWS_COLUMN_COUNT + if is_update { 2 * mask_len } else { mask_len };
    let mut body = vec![0u8; ROWS_COLUMN_COUNT];
    LittleEndian::write_u48(&mut body[..TABLE_ID_LEN], table_id);
    body.push(column_count);
    body.resize(bitmap_at.max(body.len()), 0);
    body.extend_from_slice(present);
    body.extend_from_slice(row_images);
    body
}

/// Pack booleans into a little-endian-bit-order bitmap (bit 0 of byte 0 first).
///
/// # Examples
///
/// ```
/// use mysqlbinlog::binlog::write::bitmap;
///
/// assert_eq!(bitmap(&[true, false, true]), vec![0b101]);
/// assert_eq!(bitmap(&[false; 9]).len(), 2);
/// ```
pub fn bitmap(bits: &[bool]) -> Vec<u8> {
    let mut out = vec![0u8; bits.len().div_ceil(8)];
    for (i, &set) in bits.iter().enumerate() {
        if set {
            out[i / 8] |= 1 << (i % 8);
        }
    }
    out
}
