//! Event body decoding.
//!
//! [`decode_event`] turns one [`RawEvent`] into a typed [`BinlogEvent`],
//! dispatching on the record's type code. Table map events are recorded in
//! the session's [`TableRegistry`]; rows events are resolved against it.
//!
//! Query body layout:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | Thread id |
//! | 4 | 4 | Execution time |
//! | 8 | 1 | Database name length `d` |
//! | 9 | 2 | Error code |
//! | 11 | 2 | Status variable block length `s` |
//! | 13 | s | Status variables |
//! | 13 + s | d + 1 | Database name, NUL-terminated |
//! | .. | rest | Statement text |

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;
use tracing::debug;

use crate::binlog::constants::*;
use crate::binlog::event_type::EventType;
use crate::binlog::rows::{decode_rows, PlaceholderRenderer, RowImage, ValueRenderer};
use crate::binlog::stream::{RawEvent, RecordHeader};
use crate::binlog::table_map::{parse_table_map, read_table_id, TableDescriptor, TableRegistry};
use crate::BinlogError;

/// One decoded binlog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BinlogEvent {
    /// File offset of the record.
    pub position: u64,
    /// Record header as read from the file.
    pub header: RecordHeader,
    /// Type-specific contents.
    pub data: EventData,
}

impl BinlogEvent {
    /// Event type of the record.
    pub fn event_type(&self) -> EventType {
        self.header.event_type()
    }

    /// Record timestamp (seconds since the Unix epoch).
    pub fn timestamp(&self) -> u32 {
        self.header.timestamp
    }
}

/// Contents of a decoded record, by event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventData {
    /// A statement executed on the source server.
    Query { database: String, statement: String },
    /// The server stopped.
    Stop,
    /// The log continues in another file.
    Rotate { next_file: String },
    /// Transaction commit.
    Xid,
    /// A table id was bound to a table definition.
    TableMap(TableDescriptor),
    /// Inserted rows.
    WriteRows(RowsEvent),
    /// Updated rows, as before/after image pairs.
    UpdateRows(RowsEvent),
    /// Deleted rows.
    DeleteRows(RowsEvent),
    /// Any other event type; the body is kept but not interpreted.
    Other {
        type_code: u8,
        #[serde(skip)]
        body: Vec<u8>,
    },
}

/// Rows of one WRITE/UPDATE/DELETE rows event with their table identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowsEvent {
    pub table_id: u64,
    pub database: String,
    pub table: String,
    pub rows: Vec<RowImage>,
}

impl RowsEvent {
    /// Consecutive (before, after) images of an update event.
    pub fn row_pairs(&self) -> impl Iterator<Item = (&RowImage, &RowImage)> {
        self.rows.chunks_exact(2).map(|pair| (&pair[0], &pair[1]))
    }
}

/// Decode a raw record with the placeholder value renderer.
///
/// # Examples
///
/// ```
/// use mysqlbinlog::binlog::event::{decode_event, EventData};
/// use mysqlbinlog::binlog::stream::BinlogFile;
/// use mysqlbinlog::binlog::table_map::TableRegistry;
/// use mysqlbinlog::binlog::write::{query_body, BinlogBuilder};
///
/// let mut builder = BinlogBuilder::new("5.6.25-log");
/// builder.push(2, 1_434_000_000, &query_body("shop", "BEGIN"));
/// let mut file = BinlogFile::from_bytes(builder.finish()).unwrap();
/// let mut tables = TableRegistry::new();
///
/// let raw = file.next_raw().unwrap().unwrap();
/// let event = decode_event(&raw, &mut tables).unwrap();
/// assert_eq!(
///     event.data,
///     EventData::Query { database: "shop".into(), statement: "BEGIN".into() }
/// );
/// ```
pub fn decode_event(
    raw: &RawEvent<'_>,
    tables: &mut TableRegistry,
) -> Result<BinlogEvent, BinlogError> {
    decode_event_with(raw, tables, &PlaceholderRenderer)
}

/// Decode a raw record, rendering row values with `renderer`.
pub fn decode_event_with(
    raw: &RawEvent<'_>,
    tables: &mut TableRegistry,
    renderer: &dyn ValueRenderer,
) -> Result<BinlogEvent, BinlogError> {
    let body = raw.body;
    let data = match raw.event_type() {
        EventType::Query => decode_query(body)?,
        EventType::Stop => EventData::Stop,
        EventType::Rotate => decode_rotate(body)?,
        EventType::Xid => EventData::Xid,
        EventType::TableMap => {
            let descriptor = parse_table_map(body)?;
            debug!(
                table_id = descriptor.table_id,
                database = %descriptor.database,
                table = %descriptor.table,
                columns = descriptor.column_count(),
                "table map"
            );
            tables.insert(descriptor.clone());
            EventData::TableMap(descriptor)
        }
        EventType::WriteRows => {
            EventData::WriteRows(decode_rows_event(body, false, tables, renderer)?)
        }
        EventType::UpdateRows => {
            EventData::UpdateRows(decode_rows_event(body, true, tables, renderer)?)
        }
        EventType::DeleteRows => {
            EventData::DeleteRows(decode_rows_event(body, false, tables, renderer)?)
        }
        EventType::FormatDescription | EventType::Unknown(_) => EventData::Other {
            type_code: raw.header.type_code,
            body: body.to_vec(),
        },
    };

    Ok(BinlogEvent {
        position: raw.position,
        header: raw.header,
        data,
    })
}

fn decode_query(body: &[u8]) -> Result<EventData, BinlogError> {
    if body.len() < QUERY_STATUS_VARS {
        return Err(BinlogError::Parse(format!(
            "Query event body is {} bytes, need at least {}",
            body.len(),
            QUERY_STATUS_VARS
        )));
    }

    let db_len = body[QUERY_DB_NAME_LEN] as usize;
    let status_len = LittleEndian::read_u16(&body[QUERY_STATUS_VARS_LEN..]) as usize;
    let db_start = QUERY_STATUS_VARS + status_len;

    let db_bytes = body.get(db_start..db_start + db_len + 1).ok_or_else(|| {
        BinlogError::Parse(format!(
            "Query event database name ({} bytes after {} status bytes) runs past the {}-byte body",
            db_len,
            status_len,
            body.len()
        ))
    })?;
    if db_bytes[db_len] != 0 {
        return Err(BinlogError::Parse(
            "Query event database name is not null terminated".to_string(),
        ));
    }

    let statement = &body[db_start + db_len + 1..];
    Ok(EventData::Query {
        database: String::from_utf8_lossy(&db_bytes[..db_len]).into_owned(),
        statement: String::from_utf8_lossy(statement).into_owned(),
    })
}

fn decode_rotate(body: &[u8]) -> Result<EventData, BinlogError> {
    let name = body.get(ROTATE_NEXT_NAME..).ok_or_else(|| {
        BinlogError::Parse(format!(
            "Rotate event body is {} bytes, need at least {}",
            body.len(),
            ROTATE_NEXT_NAME
        ))
    })?;
    Ok(EventData::Rotate {
        next_file: String::from_utf8_lossy(name).into_owned(),
    })
}

fn decode_rows_event(
    body: &[u8],
    is_update: bool,
    tables: &TableRegistry,
    renderer: &dyn ValueRenderer,
) -> Result<RowsEvent, BinlogError> {
    let table_id = read_table_id(body)?;
    let table = tables.resolve(table_id)?;
    let rows = decode_rows(body, is_update, table, renderer)?;
    Ok(RowsEvent {
        table_id,
        database: table.database.clone(),
        table: table.table.clone(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binlog::column_type::ColumnType;
    use crate::binlog::stream::BinlogFile;
    use crate::binlog::write::*;

    /// Decode every record of a synthetic binlog, stopping at the first error.
    fn decode_all(builder: &BinlogBuilder) -> Result<Vec<BinlogEvent>, BinlogError> {
        let mut file = BinlogFile::from_bytes(builder.finish())?;
        let mut tables = TableRegistry::new();
        let mut events = Vec::new();
        while let Some(raw) = file.next_raw()? {
            events.push(decode_event(&raw, &mut tables)?);
        }
        Ok(events)
    }

    #[test]
    fn test_query_event() {
        let mut builder = BinlogBuilder::new("5.6.25");
        builder.push(
            2,
            10,
            &query_body_with_status("shop", &[0, 0, 0, 0, 0], "INSERT INTO t VALUES (1)"),
        );
        let events = decode_all(&builder).unwrap();
        assert_eq!(
            events[0].data,
            EventData::Query {
                database: "shop".to_string(),
                statement: "INSERT INTO t VALUES (1)".to_string(),
            }
        );
        assert_eq!(events[0].timestamp(), 10);
        assert_eq!(events[0].event_type(), EventType::Query);
    }

    #[test]
    fn test_query_event_unterminated_db() {
        let mut body = query_body("db", "BEGIN");
        body[QUERY_STATUS_VARS + 2] = b'x';
        let mut builder = BinlogBuilder::new("5.6.25");
        builder.push(2, 1, &body);
        let err = decode_all(&builder).unwrap_err();
        assert!(matches!(err, BinlogError::Parse(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_query_event_short_body() {
        let mut builder = BinlogBuilder::new("5.6.25");
        builder.push(2, 1, &[0u8; 10]);
        assert!(matches!(decode_all(&builder).unwrap_err(), BinlogError::Parse(_)));
    }

    #[test]
    fn test_rotate_stop_xid() {
        let mut builder = BinlogBuilder::new("5.6.25");
        builder
            .push(16, 1, &xid_body(77))
            .push(3, 2, &[])
            .push(4, 3, &rotate_body(4, "mysql-bin.000002"));
        let events = decode_all(&builder).unwrap();
        assert_eq!(events[0].data, EventData::Xid);
        assert_eq!(events[1].data, EventData::Stop);
        assert_eq!(
            events[2].data,
            EventData::Rotate {
                next_file: "mysql-bin.000002".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_and_late_descriptor_are_other() {
        let mut builder = BinlogBuilder::new("5.6.25");
        builder.push(35, 1, &[1, 2, 3]).push(15, 2, &[4, 0]);
        let events = decode_all(&builder).unwrap();
        assert_eq!(
            events[0].data,
            EventData::Other {
                type_code: 35,
                body: vec![1, 2, 3]
            }
        );
        assert!(matches!(events[1].data, EventData::Other { type_code: 15, .. }));
    }

    #[test]
    fn test_write_rows_end_to_end() {
        let mut builder = BinlogBuilder::new("5.6.25");
        builder
            .push(
                19,
                1,
                &table_map_body(7, "test", "t", &[(ColumnType::Tiny, 0), (ColumnType::Tiny, 0)]),
            )
            .push(23, 2, &rows_body(7, 2, &[bitmap(&[true, true])], &[0x00, 5, 0xFD]));
        let events = decode_all(&builder).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0].data, EventData::TableMap(_)));
        match &events[1].data {
            EventData::WriteRows(rows) => {
                assert_eq!(rows.table_id, 7);
                assert_eq!(rows.database, "test");
                assert_eq!(rows.table, "t");
                assert_eq!(rows.rows.len(), 1);
                assert_eq!(rows.rows[0].values(), vec!["5", "-3"]);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_update_rows_pairs() {
        let mut builder = BinlogBuilder::new("5.6.25");
        builder
            .push(19, 1, &table_map_body(3, "db", "u", &[(ColumnType::Short, 0)]))
            .push(
                24,
                2,
                &rows_body(3, 1, &[bitmap(&[true]), bitmap(&[true])], &[0, 1, 0, 0, 2, 0]),
            );
        let events = decode_all(&builder).unwrap();
        match &events[1].data {
            EventData::UpdateRows(rows) => {
                let pairs: Vec<(String, String)> = rows
                    .row_pairs()
                    .map(|(b, a)| (b.to_string(), a.to_string()))
                    .collect();
                assert_eq!(pairs, vec![("1".to_string(), "2".to_string())]);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_delete_rows_unresolved_table() {
        let mut builder = BinlogBuilder::new("5.6.25");
        builder.push(25, 1, &rows_body(99, 1, &[bitmap(&[true])], &[0, 1]));
        let err = decode_all(&builder).unwrap_err();
        assert!(matches!(err, BinlogError::UnresolvedTable(99)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_table_map_overwrite_changes_row_layout() {
        let mut builder = BinlogBuilder::new("5.6.25");
        builder
            .push(19, 1, &table_map_body(5, "db", "old", &[(ColumnType::Long, 0)]))
            .push(19, 2, &table_map_body(5, "db", "new", &[(ColumnType::Tiny, 0)]))
            .push(23, 3, &rows_body(5, 1, &[bitmap(&[true])], &[0, 9]));
        let events = decode_all(&builder).unwrap();
        match &events[2].data {
            EventData::WriteRows(rows) => {
                assert_eq!(rows.table, "new");
                assert_eq!(rows.rows[0].values(), vec!["9"]);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_event_json_shape() {
        let mut builder = BinlogBuilder::new("5.6.25");
        builder.push(4, 1, &rotate_body(4, "next.000002"));
        let events = decode_all(&builder).unwrap();
        let json = serde_json::to_value(&events[0]).unwrap();
        assert_eq!(json["data"]["kind"], "rotate");
        assert_eq!(json["data"]["next_file"], "next.000002");
        assert_eq!(json["header"]["type_code"], 4);
    }
}
