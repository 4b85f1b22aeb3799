use std::collections::BTreeMap;
use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use crate::binlog::event_type::EventType;
use crate::binlog::stream::BinlogFile;
use crate::cli::{format_timestamp, wprintln};
use crate::BinlogError;

/// Options for the `mybinlog info` subcommand.
pub struct InfoOptions {
    /// Path to the binlog file.
    pub file: String,
    /// Emit output as JSON.
    pub json: bool,
}

#[derive(Serialize)]
struct InfoJson {
    file: String,
    file_size: u64,
    binlog_version: String,
    server_version: String,
    server_id: u32,
    header_length: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_event: Option<String>,
    total_events: u64,
    rows_events: u64,
    event_counts: Vec<EventCountJson>,
}

#[derive(Serialize)]
struct EventCountJson {
    event_type: String,
    type_code: u8,
    count: u64,
}

/// Record counts gathered from one pass over the file.
#[derive(Default)]
struct Scan {
    counts: BTreeMap<EventType, u64>,
    first_timestamp: Option<u32>,
    last_timestamp: Option<u32>,
}

impl Scan {
    fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    fn rows_events(&self) -> u64 {
        self.counts
            .iter()
            .filter(|(event_type, _)| event_type.is_rows_event())
            .map(|(_, count)| count)
            .sum()
    }
}

/// Summarize a binlog file: its format descriptor and how many records of
/// each event type follow it.
///
/// Records are only framed, not decoded, so a file whose rows events
/// reference unknown tables still counts cleanly. A record that cannot be
/// read aborts the scan.
pub fn execute(opts: &InfoOptions, writer: &mut dyn Write) -> Result<(), BinlogError> {
    let mut file = BinlogFile::open_mmap(&opts.file)?;

    let mut scan = Scan::default();
    while let Some(raw) = file.next_raw()? {
        *scan.counts.entry(raw.event_type()).or_insert(0) += 1;
        scan.first_timestamp.get_or_insert(raw.timestamp());
        scan.last_timestamp = Some(raw.timestamp());
    }

    if opts.json {
        return execute_json(opts, &file, &scan, writer);
    }

    let d = file.descriptor();
    wprintln!(writer, "{}", "MySQL Binary Log".bold())?;
    wprintln!(writer, "  File:            {}", opts.file)?;
    wprintln!(writer, "  Size:            {} bytes", file.file_size())?;
    wprintln!(writer, "  Binlog version:  {}.{}", d.version_major, d.version_minor)?;
    wprintln!(writer, "  Server version:  {}", d.server_version)?;
    wprintln!(writer, "  Server id:       {}", d.server_id)?;
    wprintln!(writer, "  Header length:   {}", d.header_length)?;
    if d.timestamp != 0 {
        wprintln!(writer, "  Created:         {}", format_timestamp(d.timestamp))?;
    }
    if let (Some(first), Some(last)) = (scan.first_timestamp, scan.last_timestamp) {
        wprintln!(writer, "  First event:     {}", format_timestamp(first))?;
        wprintln!(writer, "  Last event:      {}", format_timestamp(last))?;
    }
    wprintln!(writer)?;

    wprintln!(writer, "{}", "Events".bold())?;
    if scan.counts.is_empty() {
        wprintln!(writer, "  {}", "(no events after the format descriptor)".yellow())?;
    }
    for (event_type, count) in &scan.counts {
        wprintln!(writer, "  {:<28} {:>10}", event_type.to_string(), count)?;
    }
    wprintln!(writer, "  {:<28} {:>10}", "Rows events", scan.rows_events())?;
    wprintln!(writer, "  {:<28} {:>10}", "Total", scan.total())?;

    Ok(())
}

fn execute_json(
    opts: &InfoOptions,
    file: &BinlogFile,
    scan: &Scan,
    writer: &mut dyn Write,
) -> Result<(), BinlogError> {
    let d = file.descriptor();
    let info = InfoJson {
        file: opts.file.clone(),
        file_size: file.file_size(),
        binlog_version: format!("{}.{}", d.version_major, d.version_minor),
        server_version: d.server_version.clone(),
        server_id: d.server_id,
        header_length: d.header_length,
        created: (d.timestamp != 0).then(|| format_timestamp(d.timestamp)),
        first_event: scan.first_timestamp.map(format_timestamp),
        last_event: scan.last_timestamp.map(format_timestamp),
        total_events: scan.total(),
        rows_events: scan.rows_events(),
        event_counts: scan
            .counts
            .iter()
            .map(|(event_type, &count)| EventCountJson {
                event_type: event_type.to_string(),
                type_code: event_type.as_u8(),
                count,
            })
            .collect(),
    };

    let json = serde_json::to_string_pretty(&info)
        .map_err(|e| BinlogError::Parse(format!("JSON serialization error: {}", e)))?;
    wprintln!(writer, "{}", json)?;

    Ok(())
}
