//! Integration tests for binlog-utils.
//!
//! These tests write synthetic binlog files to disk and decode them through
//! the public reader API.

use byteorder::{ByteOrder, LittleEndian};
use std::io::Write;
use tempfile::NamedTempFile;

use mysqlbinlog::binlog::column_type::ColumnType;
use mysqlbinlog::binlog::event::EventData;
use mysqlbinlog::binlog::reader::BinlogReader;
use mysqlbinlog::binlog::stream::{BinlogFile, StreamState};
use mysqlbinlog::binlog::write::*;
use mysqlbinlog::BinlogError;

fn write_binlog(data: &[u8]) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().unwrap();
    tmp.write_all(data).unwrap();
    tmp.flush().unwrap();
    tmp
}

fn open(tmp: &NamedTempFile) -> Result<BinlogReader, BinlogError> {
    BinlogReader::open(tmp.path().to_str().unwrap())
}

/// Hand-assembled record with a 19-byte header.
fn record(type_code: u8, timestamp: u32, position: usize, body: &[u8]) -> Vec<u8> {
    let len = 19 + body.len();
    let mut rec = vec![0u8; 19];
    LittleEndian::write_u32(&mut rec[0..], timestamp);
    rec[4] = type_code;
    LittleEndian::write_u32(&mut rec[5..], 1);
    LittleEndian::write_u32(&mut rec[9..], len as u32);
    LittleEndian::write_u32(&mut rec[13..], (position + len) as u32);
    rec.extend_from_slice(body);
    rec
}

/// Magic plus a format description event, built without the write module.
fn hand_built_header(server_version: &str) -> Vec<u8> {
    let mut fde = vec![0u8; 57];
    fde[0] = 4;
    fde[2..2 + server_version.len()].copy_from_slice(server_version.as_bytes());
    fde[56] = 19;
    let mut out = vec![0xFE, b'b', b'i', b'n'];
    out.extend(record(15, 0, 4, &fde));
    out
}

#[test]
fn test_three_record_stream() {
    let mut data = hand_built_header("5.6.25-log");

    // table map: id 7, test.t, two TINY columns, empty metadata block
    let mut table_map = vec![7, 0, 0, 0, 0, 0, 0, 0];
    table_map.extend_from_slice(&[4, b't', b'e', b's', b't', 0]);
    table_map.extend_from_slice(&[1, b't', 0]);
    table_map.extend_from_slice(&[2, 1, 1, 0]);
    let pos = data.len();
    data.extend(record(19, 1_434_000_000, pos, &table_map));

    // write rows: column count 2, both used, one row 5, -3
    let rows = [7, 0, 0, 0, 0, 0, 0, 0, 2, 0b11, 0x00, 5, 0xFD];
    let pos = data.len();
    data.extend(record(23, 1_434_000_000, pos, &rows));

    let tmp = write_binlog(&data);
    let mut reader = open(&tmp).unwrap();
    assert_eq!(reader.format_descriptor().server_version, "5.6.25-log");

    let first = reader.next_event().unwrap().unwrap();
    match &first.data {
        EventData::TableMap(t) => {
            assert_eq!(t.table_id, 7);
            assert_eq!(t.database, "test");
            assert_eq!(t.table, "t");
            assert_eq!(t.column_count(), 2);
        }
        other => panic!("expected table map, got {:?}", other),
    }

    let second = reader.next_event().unwrap().unwrap();
    match &second.data {
        EventData::WriteRows(rows) => {
            assert_eq!(rows.rows.len(), 1);
            assert_eq!(rows.rows[0].values(), vec!["5", "-3"]);
        }
        other => panic!("expected write rows, got {:?}", other),
    }

    assert!(reader.next_event().unwrap().is_none());
    assert_eq!(reader.state(), StreamState::Streaming);
}

#[test]
fn test_transaction_sequence() {
    let mut builder = BinlogBuilder::new("8.0.36").server_id(5);
    builder
        .push(2, 100, &query_body("shop", "BEGIN"))
        .push(
            19,
            100,
            &table_map_body(
                12,
                "shop",
                "orders",
                &[
                    (ColumnType::Long, 0),
                    (ColumnType::Varchar, 255),
                    (ColumnType::Double, 8),
                ],
            ),
        );

    let mut images = vec![0b100];
    images.extend_from_slice(&42i32.to_le_bytes());
    images.extend_from_slice(&[3, b'a', b'b', b'c']);
    builder
        .push(23, 101, &rows_body(12, 3, &[bitmap(&[true; 3])], &images))
        .push(16, 102, &xid_body(900))
        .push(4, 103, &rotate_body(4, "mysql-bin.000002"));

    let tmp = write_binlog(&builder.finish());
    let reader = open(&tmp).unwrap();
    assert_eq!(reader.format_descriptor().server_id, 5);

    let events: Vec<_> = reader.collect::<Result<_, _>>().unwrap();
    assert_eq!(events.len(), 5);
    assert_eq!(
        events[0].data,
        EventData::Query {
            database: "shop".to_string(),
            statement: "BEGIN".to_string()
        }
    );
    match &events[2].data {
        EventData::WriteRows(rows) => {
            assert_eq!(rows.table, "orders");
            assert_eq!(rows.rows[0].values(), vec!["42", "varchar", "null"]);
        }
        other => panic!("expected write rows, got {:?}", other),
    }
    assert_eq!(events[3].data, EventData::Xid);
    assert_eq!(
        events[4].data,
        EventData::Rotate {
            next_file: "mysql-bin.000002".to_string()
        }
    );
    assert!(events.windows(2).all(|w| w[0].position < w[1].position));
}

#[test]
fn test_not_used_and_null_columns() {
    let mut builder = BinlogBuilder::new("5.6.25");
    builder
        .push(
            19,
            1,
            &table_map_body(3, "db", "t", &[(ColumnType::Tiny, 0), (ColumnType::Tiny, 0)]),
        )
        .push(23, 2, &rows_body(3, 2, &[bitmap(&[false, true])], &[0b1]));

    let tmp = write_binlog(&builder.finish());
    let events: Vec<_> = open(&tmp).unwrap().collect::<Result<_, _>>().unwrap();
    match &events[1].data {
        EventData::WriteRows(rows) => assert_eq!(rows.rows[0].values(), vec!["-", "null"]),
        other => panic!("expected write rows, got {:?}", other),
    }
}

#[test]
fn test_unknown_table_is_reported_not_fatal() {
    let mut builder = BinlogBuilder::new("5.6.25");
    builder
        .push(23, 1, &rows_body(44, 1, &[bitmap(&[true])], &[0, 1]))
        .push(3, 2, &[]);

    let tmp = write_binlog(&builder.finish());
    let mut reader = open(&tmp).unwrap();
    let err = reader.next_event().unwrap_err();
    assert!(matches!(err, BinlogError::UnresolvedTable(44)));
    assert!(!err.is_fatal());
    assert_eq!(reader.next_event().unwrap().unwrap().data, EventData::Stop);
}

#[test]
fn test_table_id_reuse() {
    let mut builder = BinlogBuilder::new("5.6.25");
    builder
        .push(19, 1, &table_map_body(8, "db", "first", &[(ColumnType::Tiny, 0)]))
        .push(
            19,
            2,
            &table_map_body(8, "db", "second", &[(ColumnType::Short, 0)]),
        )
        .push(25, 3, &rows_body(8, 1, &[bitmap(&[true])], &[0, 0x10, 0x27]));

    let tmp = write_binlog(&builder.finish());
    let mut reader = open(&tmp).unwrap();
    let events: Vec<_> = reader.by_ref().collect::<Result<_, _>>().unwrap();
    assert_eq!(reader.tables().len(), 1);
    match &events[2].data {
        EventData::DeleteRows(rows) => {
            assert_eq!(rows.table, "second");
            assert_eq!(rows.rows[0].values(), vec!["10000"]);
        }
        other => panic!("expected delete rows, got {:?}", other),
    }
}

#[test]
fn test_missing_magic() {
    let mut data = BinlogBuilder::new("5.6.25").finish();
    data[1] = b'x';
    let tmp = write_binlog(&data);
    assert!(matches!(open(&tmp).err().unwrap(), BinlogError::Open(_)));
}

#[test]
fn test_truncated_descriptor() {
    let data = BinlogBuilder::new("5.6.25").finish();
    let tmp = write_binlog(&data[..40]);
    assert!(matches!(open(&tmp).err().unwrap(), BinlogError::Open(_)));
}

#[test]
fn test_empty_file() {
    let tmp = write_binlog(&[]);
    assert!(matches!(open(&tmp).err().unwrap(), BinlogError::Open(_)));
}

#[test]
fn test_missing_file() {
    let err = BinlogReader::open("/nonexistent/mysql-bin.000001").err().unwrap();
    assert!(matches!(err, BinlogError::Io(_)));
}

#[test]
fn test_truncated_record_is_fatal() {
    let mut builder = BinlogBuilder::new("5.6.25");
    builder
        .push(16, 1, &xid_body(1))
        .push(2, 2, &query_body("db", "COMMIT"));
    let mut data = builder.finish();
    data.truncate(data.len() - 2);

    let tmp = write_binlog(&data);
    let mut reader = open(&tmp).unwrap();
    assert_eq!(reader.next_event().unwrap().unwrap().data, EventData::Xid);
    let err = reader.next_event().unwrap_err();
    assert!(matches!(err, BinlogError::Read(_)));
    assert!(err.is_fatal());
    assert_eq!(reader.state(), StreamState::Failed);
    assert!(reader.next().is_none());
}

#[test]
fn test_extended_header_length() {
    let mut builder = BinlogBuilder::new("5.1.73").header_length(27);
    builder
        .push(2, 1, &query_body("db", "BEGIN"))
        .push(16, 2, &xid_body(3));

    let tmp = write_binlog(&builder.finish());
    let events: Vec<_> = open(&tmp).unwrap().collect::<Result<_, _>>().unwrap();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0].data, EventData::Query { statement, .. } if statement == "BEGIN"));
}

#[test]
fn test_raw_stream_and_mmap_agree() {
    let mut builder = BinlogBuilder::new("5.6.25");
    builder
        .push(2, 1, &query_body("db", "BEGIN"))
        .push(16, 2, &xid_body(3))
        .push(35, 3, &[9, 9]);
    let tmp = write_binlog(&builder.finish());
    let path = tmp.path().to_str().unwrap();

    let mut buffered = BinlogFile::open(path).unwrap();
    let mut codes = Vec::new();
    while let Some(raw) = buffered.next_raw().unwrap() {
        codes.push((raw.position, raw.header.type_code, raw.body.to_vec()));
    }
    assert_eq!(codes.len(), 3);

    #[cfg(feature = "cli")]
    {
        let mut mapped = BinlogFile::open_mmap(path).unwrap();
        let mut mapped_codes = Vec::new();
        while let Some(raw) = mapped.next_raw().unwrap() {
            mapped_codes.push((raw.position, raw.header.type_code, raw.body.to_vec()));
        }
        assert_eq!(codes, mapped_codes);
    }
}
