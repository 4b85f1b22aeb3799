//! Table map events and the table registry.
//!
//! Rows events do not describe their own columns. Instead, each one names a
//! table id that a preceding TABLE_MAP_EVENT bound to a database, a table,
//! and a list of column types with per-column metadata. [`TableRegistry`]
//! keeps the latest descriptor per table id for the rest of the session.
//!
//! Table map body layout:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 6 | Table id |
//! | 6 | 2 | Flags |
//! | 8 | 1 | Database name length `d` |
//! | 9 | d + 1 | Database name, NUL-terminated |
//! | .. | 1 | Table name length `t` |
//! | .. | t + 1 | Table name, NUL-terminated |
//! | .. | packed | Column count `n` |
//! | .. | n | Column type tags |
//! | .. | packed | Metadata block size `m` |
//! | .. | m | Metadata block |

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::binlog::column_type::ColumnType;
use crate::binlog::constants::{TABLE_ID_LEN, TABLE_MAP_DB_NAME_LEN};
use crate::binlog::packed::read_packed_int;
use crate::BinlogError;

/// One column of a table map: its type and metadata word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    /// Column type tag.
    pub column_type: ColumnType,
    /// Metadata word (0 when the type carries none).
    pub metadata: u16,
}

/// Table definition bound to a table id by a table map event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDescriptor {
    /// Table id; may be reused for another table later in the stream.
    pub table_id: u64,
    /// Database (schema) name.
    pub database: String,
    /// Table name.
    pub table: String,
    /// Columns in table definition order.
    pub columns: Vec<ColumnDef>,
}

impl TableDescriptor {
    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Column definition by index, if it exists.
    pub fn column(&self, index: usize) -> Option<&ColumnDef> {
        self.columns.get(index)
    }
}

/// Read the 6-byte little-endian table id at the start of a table map or rows body.
pub fn read_table_id(body: &[u8]) -> Result<u64, BinlogError> {
    body.get(..TABLE_ID_LEN)
        .map(LittleEndian::read_u48)
        .ok_or_else(|| {
            BinlogError::Parse(format!(
                "Body is {} bytes, too short for a table id",
                body.len()
            ))
        })
}

/// Parse a table map event body into a descriptor.
///
/// # Examples
///
/// ```
/// use mysqlbinlog::binlog::column_type::ColumnType;
/// use mysqlbinlog::binlog::table_map::parse_table_map;
/// use mysqlbinlog::binlog::write::table_map_body;
///
/// let body = table_map_body(7, "shop", "orders", &[(ColumnType::Long, 0), (ColumnType::Varchar, 255)]);
/// let desc = parse_table_map(&body).unwrap();
/// assert_eq!(desc.table_id, 7);
/// assert_eq!(desc.table, "orders");
/// assert_eq!(desc.columns[1].metadata, 255);
/// ```
pub fn parse_table_map(body: &[u8]) -> Result<TableDescriptor, BinlogError> {
    let table_id = read_table_id(body)?;

    let mut pos = TABLE_MAP_DB_NAME_LEN;
    let database = read_terminated_name(body, &mut pos, "database")?;
    let table = read_terminated_name(body, &mut pos, "table")?;

    let (column_count, width) = read_packed_int(tail(body, pos)?)?;
    pos += width;
    let column_count = column_count as usize;
    let type_tags = take(body, pos, column_count, "column types")?;
    pos += column_count;

    let (block_len, width) = read_packed_int(tail(body, pos)?)?;
    pos += width;
    let metadata_block = take(body, pos, block_len as usize, "metadata block")?;

    let columns = column_metadata(type_tags, metadata_block)?;

    Ok(TableDescriptor {
        table_id,
        database,
        table,
        columns,
    })
}

/// Pair each column type tag with its metadata word.
///
/// Words are laid out back to back in the metadata block, each as wide as
/// [`ColumnType::metadata_width`] says. A word that would extend past the
/// block is a [`BinlogError::MetadataOverrun`].
pub fn column_metadata(
    type_tags: &[u8],
    metadata_block: &[u8],
) -> Result<Vec<ColumnDef>, BinlogError> {
    let mut offset = 0usize;
    let mut columns = Vec::with_capacity(type_tags.len());

    for (index, &tag) in type_tags.iter().enumerate() {
        let column_type = ColumnType::from_u8(tag);
        let width = column_type.metadata_width();
        let word = metadata_block
            .get(offset..offset + width)
            .ok_or(BinlogError::MetadataOverrun {
                column: index,
                offset,
                width,
                block_len: metadata_block.len(),
            })?;
        let metadata = match width {
            0 => 0,
            1 => word[0] as u16,
            _ => LittleEndian::read_u16(word),
        };
        columns.push(ColumnDef {
            column_type,
            metadata,
        });
        offset += width;
    }

    Ok(columns)
}

/// Read a 1-byte length followed by that many name bytes and a NUL.
fn read_terminated_name(body: &[u8], pos: &mut usize, what: &str) -> Result<String, BinlogError> {
    let len = *body.get(*pos).ok_or_else(|| {
        BinlogError::Parse(format!("Table map ends before the {} name length", what))
    })? as usize;
    let bytes = take(body, *pos + 1, len + 1, what)?;
    if bytes[len] != 0 {
        return Err(BinlogError::Parse(format!(
            "Table map {} name is not null terminated",
            what
        )));
    }
    *pos += len + 2;
    Ok(String::from_utf8_lossy(&bytes[..len]).into_owned())
}

fn take<'a>(body: &'a [u8], pos: usize, len: usize, what: &str) -> Result<&'a [u8], BinlogError> {
    body.get(pos..pos.saturating_add(len)).ok_or_else(|| {
        BinlogError::Parse(format!(
            "Table map {} needs {} bytes at offset {}, body is {} bytes",
            what,
            len,
            pos,
            body.len()
        ))
    })
}

fn tail(body: &[u8], pos: usize) -> Result<&[u8], BinlogError> {
    body.get(pos..)
        .ok_or_else(|| BinlogError::Parse(format!("Table map truncated at offset {}", pos)))
}

/// Table id to descriptor mapping for one decoding session.
///
/// A later table map with the same id replaces the earlier descriptor
/// wholesale; entries are never removed.
#[derive(Debug, Default, Clone)]
pub struct TableRegistry {
    tables: HashMap<u64, TableDescriptor>,
}

impl TableRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a descriptor under its table id, returning the one it replaced.
    pub fn insert(&mut self, descriptor: TableDescriptor) -> Option<TableDescriptor> {
        let previous = self.tables.insert(descriptor.table_id, descriptor);
        if let Some(prev) = &previous {
            debug!(
                table_id = prev.table_id,
                database = %prev.database,
                table = %prev.table,
                "table id remapped"
            );
        }
        previous
    }

    /// Descriptor for a table id.
    pub fn get(&self, table_id: u64) -> Option<&TableDescriptor> {
        self.tables.get(&table_id)
    }

    /// Descriptor for a table id, or [`BinlogError::UnresolvedTable`].
    pub fn resolve(&self, table_id: u64) -> Result<&TableDescriptor, BinlogError> {
        self.get(table_id)
            .ok_or(BinlogError::UnresolvedTable(table_id))
    }

    /// Number of table ids seen.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether no table map has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
