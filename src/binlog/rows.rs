//! Row images in WRITE/UPDATE/DELETE rows events.
//!
//! A rows event body holds no column types of its own; every value is
//! sliced out of a flat byte buffer using the types and metadata words of
//! the table map registered for its table id. [`column_image_size`] gives
//! the byte length of one encoded value and [`decode_rows`] walks the body
//! row by row.
//!
//! Rows body layout (after the table id and flags):
//!
//! | Field | Size |
//! |-------|------|
//! | Column count | packed integer at offset 8 |
//! | Columns-present bitmap | `ceil(n / 8)` bytes at offset `8 + ceil(n / 8)` (updates: `8 + 2 * ceil(n / 8)`) |
//! | Per row: null bitmap | `ceil(present / 8)` bytes |
//! | Per row: values | sum of [`column_image_size`] over non-null present columns |
//!
//! Update events alternate before and after images of the same row.
//!
//! # Supported types
//!
//! | Type | Image size |
//! |------|-----------|
//! | TINY, YEAR | 1 |
//! | SHORT | 2 |
//! | INT24, TIME, DATE, NEWDATE | 3 |
//! | LONG, FLOAT, TIMESTAMP | 4 |
//! | LONGLONG, DOUBLE, DATETIME | 8 |
//! | TIME2 / TIMESTAMP2 / DATETIME2 | 3 / 4 / 5 + `(meta + 1) / 2` |
//! | VARCHAR, VAR_STRING, STRING | length byte + 1 (meta < 256) or + 2 |
//! | BIT | `ceil(bits / 8)` |
//! | ENUM | 1 or 2 (meta low byte) |
//! | SET | meta low byte |
//! | BLOB | length byte + meta |
//! | NEWDECIMAL | unsupported |

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;
use std::fmt;

use crate::binlog::column_type::ColumnType;
use crate::binlog::constants::ROWS_COLUMN_COUNT;
use crate::binlog::packed::read_packed_int;
use crate::binlog::table_map::{ColumnDef, TableDescriptor};
use crate::BinlogError;

/// One column slot of a row image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnValue {
    /// A value rendered by the session's [`ValueRenderer`].
    Value(String),
    /// The column is present but SQL NULL.
    Null,
    /// The column is excluded from this event's columns-present bitmap.
    Absent,
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Value(v) => write!(f, "{}", v),
            ColumnValue::Null => write!(f, "null"),
            ColumnValue::Absent => write!(f, "-"),
        }
    }
}

/// All column slots of one row, in table definition order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RowImage {
    pub columns: Vec<ColumnValue>,
}

impl RowImage {
    /// Column slots rendered as text (`null` and `-` for the markers).
    pub fn values(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.to_string()).collect()
    }
}

impl fmt::Display for RowImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", column)?;
        }
        Ok(())
    }
}

/// Turns the raw image of one non-null column into display text.
///
/// The image slice is exactly [`column_image_size`] bytes long. Swap in a
/// richer renderer (floats, temporal types, strings) without touching the
/// row framing.
pub trait ValueRenderer {
    fn render(&self, column: &ColumnDef, image: &[u8]) -> String;
}

/// Renders TINY/SHORT/INT24/LONG as signed decimals and every other type
/// as its lowercase type label.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderRenderer;

impl ValueRenderer for PlaceholderRenderer {
    fn render(&self, column: &ColumnDef, image: &[u8]) -> String {
        if column.column_type.is_integer() && (1..=8).contains(&image.len()) {
            LittleEndian::read_int(image, image.len()).to_string()
        } else {
            column.column_type.name().to_string()
        }
    }
}

/// Byte length of one encoded column value.
///
/// `data` starts at the value; only variable-length types look at it, and
/// only at its first byte.
///
/// # Examples
///
/// ```
/// use mysqlbinlog::binlog::column_type::ColumnType;
/// use mysqlbinlog::binlog::rows::column_image_size;
///
/// assert_eq!(column_image_size(ColumnType::Long, 0, &[]).unwrap(), 4);
/// assert_eq!(column_image_size(ColumnType::Varchar, 255, &[10]).unwrap(), 11);
/// assert_eq!(column_image_size(ColumnType::Varchar, 256, &[10]).unwrap(), 12);
/// ```
pub fn column_image_size(
    column_type: ColumnType,
    metadata: u16,
    data: &[u8],
) -> Result<usize, BinlogError> {
    let meta = metadata as usize;
    let size = match column_type {
        ColumnType::Tiny | ColumnType::Year => 1,
        ColumnType::Short => 2,
        ColumnType::Int24 | ColumnType::Time | ColumnType::Date | ColumnType::NewDate => 3,
        ColumnType::Long | ColumnType::Float | ColumnType::Timestamp => 4,
        ColumnType::LongLong | ColumnType::Double | ColumnType::DateTime => 8,
        ColumnType::Time2 => 3 + (meta + 1) / 2,
        ColumnType::Timestamp2 => 4 + (meta + 1) / 2,
        ColumnType::DateTime2 => 5 + (meta + 1) / 2,
        ColumnType::Varchar | ColumnType::VarString => {
            length_byte(column_type, data)? + if meta < 256 { 1 } else { 2 }
        }
        ColumnType::String => {
            let effective = string_max_length(meta);
            length_byte(column_type, data)? + if effective < 256 { 1 } else { 2 }
        }
        ColumnType::Bit => {
            let bits = (meta >> 8) * 8 + (meta & 0xFF);
            bits.div_ceil(8)
        }
        ColumnType::Enum => match meta & 0xFF {
            1 => 1,
            2 => 2,
            _ => 0,
        },
        ColumnType::Set => meta & 0xFF,
        ColumnType::Blob => length_byte(column_type, data)? + meta,
        ColumnType::NewDecimal => {
            return Err(BinlogError::UnsupportedColumnType(
                column_type.name().to_string(),
            ))
        }
        ColumnType::Decimal
        | ColumnType::Null
        | ColumnType::TinyBlob
        | ColumnType::MediumBlob
        | ColumnType::LongBlob
        | ColumnType::Geometry
        | ColumnType::Unknown(_) => 0,
    };
    Ok(size)
}

/// Maximum byte length of a STRING column from its packed metadata.
///
/// Metadata below 256 is the length itself. Otherwise the high byte holds
/// the real type with two bits of the length folded in (inverted).
fn string_max_length(meta: usize) -> usize {
    if meta < 256 {
        return meta;
    }
    let byte0 = meta >> 8;
    let byte1 = meta & 0xFF;
    if (byte0 & 0x30) != 0x30 {
        byte1 | (((byte0 & 0x30) ^ 0x30) << 4)
    } else {
        byte1
    }
}

fn length_byte(column_type: ColumnType, data: &[u8]) -> Result<usize, BinlogError> {
    data.first().map(|&b| b as usize).ok_or_else(|| {
        BinlogError::Parse(format!(
            "Row image ends before the length prefix of a {} column",
            column_type
        ))
    })
}

fn bit_set(bits: &[u8], index: usize) -> bool {
    bits[index / 8] & (1 << (index % 8)) != 0
}

fn slice<'a>(body: &'a [u8], pos: usize, len: usize, what: &str) -> Result<&'a [u8], BinlogError> {
    body.get(pos..pos.saturating_add(len)).ok_or_else(|| {
        BinlogError::Parse(format!(
            "Rows event {} needs {} bytes at offset {}, body is {} bytes",
            what,
            len,
            pos,
            body.len()
        ))
    })
}

/// Decode every row image in a rows event body.
///
/// `table` must be the descriptor registered for the body's table id. For
/// update events (`is_update`) the result alternates before and after
/// images and always has even length.
///
/// The columns-present bitmap is read `ceil(n / 8)` bytes past the column
/// count offset (twice that for updates), counting from the column count's
/// first byte rather than past its encoded width.
pub fn decode_rows(
    body: &[u8],
    is_update: bool,
    table: &TableDescriptor,
    renderer: &dyn ValueRenderer,
) -> Result<Vec<RowImage>, BinlogError> {
    let count_bytes = body.get(ROWS_COLUMN_COUNT..).ok_or_else(|| {
        BinlogError::Parse(format!(
            "Rows event body is {} bytes, too short for a column count",
            body.len()
        ))
    })?;
    let (column_count, _) = read_packed_int(count_bytes)?;
    let column_count = column_count as usize;

    let mask_len = column_count.div_ceil(8);
    let mut pos = ROWS_COLUMN_COUNT + if is_update { 2 * mask_len } else { mask_len };
    let present_bits = slice(body, pos, mask_len, "columns-present bitmap")?;
    let present: Vec<bool> = (0..column_count).map(|i| bit_set(present_bits, i)).collect();
    pos += mask_len;

    let present_count = present.iter().filter(|&&p| p).count();
    let null_len = present_count.div_ceil(8);

    let mut rows = Vec::new();
    while pos < body.len() {
        let row_start = pos;
        let null_bits = slice(body, pos, null_len, "null bitmap")?;
        pos += null_len;

        let mut columns = Vec::with_capacity(column_count);
        let mut present_index = 0usize;
        for (index, &is_present) in present.iter().enumerate() {
            if !is_present {
                columns.push(ColumnValue::Absent);
                continue;
            }
            let is_null = bit_set(null_bits, present_index);
            present_index += 1;
            if is_null {
                columns.push(ColumnValue::Null);
                continue;
            }

            let column = table.column(index).ok_or_else(|| {
                BinlogError::Parse(format!(
                    "Row has column {} but table map for {}.{} declares {} columns",
                    index,
                    table.database,
                    table.table,
                    table.column_count()
                ))
            })?;
            let size = column_image_size(
                column.column_type,
                column.metadata,
                body.get(pos..).unwrap_or(&[]),
            )?;
            let image = slice(body, pos, size, "column value")?;
            columns.push(ColumnValue::Value(renderer.render(column, image)));
            pos += size;
        }

        if pos == row_start {
            return Err(BinlogError::Parse(format!(
                "Row image at offset {} consumed no bytes",
                row_start
            )));
        }
        rows.push(RowImage { columns });
    }

    if is_update && rows.len() % 2 != 0 {
        return Err(BinlogError::Parse(format!(
            "Update rows event has {} images, expected before/after pairs",
            rows.len()
        )));
    }

    Ok(rows)
}
