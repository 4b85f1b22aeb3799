use std::io::Write;

use serde::Serialize;
use tracing::{debug, warn};

use crate::binlog::event::{BinlogEvent, EventData, RowsEvent};
use crate::binlog::reader::BinlogReader;
use crate::cli::{format_timestamp, to_json_line, wprint, wprintln};
use crate::BinlogError;

/// Options for the `mybinlog events` subcommand.
pub struct EventsOptions {
    /// Path to the binlog file.
    pub file: String,
    /// Emit one JSON object per line instead of tab-separated text.
    pub json: bool,
    /// Stop after this many decoded events.
    pub limit: Option<u64>,
    /// Treat per-event parse failures as fatal.
    pub strict: bool,
}

#[derive(Serialize)]
struct DescriptorJson<'a> {
    binlog_version: String,
    server_version: &'a str,
    server_id: u32,
    header_length: u8,
}

#[derive(Serialize)]
struct EventJson<'a> {
    position: u64,
    time: String,
    event_type: String,
    server_id: u32,
    data: &'a EventData,
}

/// Decode a binlog file and print every event.
///
/// The first two lines are a `server_version,server_id` header and its
/// values. Each event then prints as its UTC timestamp followed by
/// tab-separated fields:
///
/// ```text
/// 2015/06/11 05:20:00 UTC	QUERY_EVENT	shop	BEGIN
/// 2015/06/11 05:20:00 UTC	TABLE_MAP_EVENT	shop	orders	col:2	id:7
/// 2015/06/11 05:20:00 UTC	WRITE_ROWS_EVENT	shop	orders	5,-3
/// 2015/06/11 05:20:01 UTC	UPDATE_ROWS_EVENT	shop	orders	5,-3 => 6,-3
/// 2015/06/11 05:20:01 UTC	XID_EVENT
/// ```
///
/// Rows events print one line per row (one per before/after pair for
/// updates). Events that fail to decode without breaking the record framing
/// are logged and skipped unless `--strict` is given.
pub fn execute(opts: &EventsOptions, writer: &mut dyn Write) -> Result<(), BinlogError> {
    let mut reader = BinlogReader::open_mmap(&opts.file)?;

    let descriptor = reader.format_descriptor();
    if opts.json {
        let line = to_json_line(&DescriptorJson {
            binlog_version: format!("{}.{}", descriptor.version_major, descriptor.version_minor),
            server_version: &descriptor.server_version,
            server_id: descriptor.server_id,
            header_length: descriptor.header_length,
        })?;
        wprintln!(writer, "{}", line)?;
    } else {
        wprintln!(writer, "server_version,server_id")?;
        wprintln!(writer, "{},{}", descriptor.server_version, descriptor.server_id)?;
    }

    let mut decoded = 0u64;
    let mut skipped = 0u64;
    loop {
        if opts.limit.is_some_and(|limit| decoded >= limit) {
            break;
        }

        let position = reader.position();
        match reader.next_event() {
            Ok(Some(event)) => {
                if opts.json {
                    write_event_json(writer, &event)?;
                } else {
                    write_event_text(writer, &event)?;
                }
                decoded += 1;
            }
            Ok(None) => break,
            Err(e) if !e.is_fatal() && !opts.strict => {
                warn!(position, error = %e, "skipping event that failed to decode");
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    debug!(decoded, skipped, "finished decoding");
    Ok(())
}

fn write_event_json(writer: &mut dyn Write, event: &BinlogEvent) -> Result<(), BinlogError> {
    let line = to_json_line(&EventJson {
        position: event.position,
        time: format_timestamp(event.timestamp()),
        event_type: event.event_type().to_string(),
        server_id: event.header.server_id,
        data: &event.data,
    })?;
    wprintln!(writer, "{}", line)
}

fn write_event_text(writer: &mut dyn Write, event: &BinlogEvent) -> Result<(), BinlogError> {
    let time = format_timestamp(event.timestamp());
    let name = event.event_type().to_string();

    match &event.data {
        EventData::Query {
            database,
            statement,
        } => wprintln!(writer, "{}\t{}\t{}\t{}", time, name, database, statement),
        EventData::Rotate { next_file } => wprintln!(writer, "{}\t{}\t{}", time, name, next_file),
        EventData::TableMap(table) => wprintln!(
            writer,
            "{}\t{}\t{}\t{}\tcol:{}\tid:{}",
            time,
            name,
            table.database,
            table.table,
            table.column_count(),
            table.table_id
        ),
        EventData::WriteRows(rows) | EventData::DeleteRows(rows) => {
            if rows.rows.is_empty() {
                return write_rows_prefix(writer, &time, &name, rows).and_then(|_| wprintln!(writer));
            }
            for row in &rows.rows {
                write_rows_prefix(writer, &time, &name, rows)?;
                wprintln!(writer, "\t{}", row)?;
            }
            Ok(())
        }
        EventData::UpdateRows(rows) => {
            if rows.rows.is_empty() {
                return write_rows_prefix(writer, &time, &name, rows).and_then(|_| wprintln!(writer));
            }
            for (before, after) in rows.row_pairs() {
                write_rows_prefix(writer, &time, &name, rows)?;
                wprintln!(writer, "\t{} => {}", before, after)?;
            }
            Ok(())
        }
        EventData::Stop | EventData::Xid | EventData::Other { .. } => {
            wprintln!(writer, "{}\t{}", time, name)
        }
    }
}

fn write_rows_prefix(
    writer: &mut dyn Write,
    time: &str,
    name: &str,
    rows: &RowsEvent,
) -> Result<(), BinlogError> {
    wprint!(writer, "{}\t{}\t{}\t{}", time, name, rows.database, rows.table)
}
