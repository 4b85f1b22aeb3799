//! Binlog record stream.
//!
//! Provides [`BinlogFile`], which validates the magic signature and the
//! leading format description event on open, then walks the file record by
//! record. Each record is a fixed 19-byte header (optionally extended up to
//! the declared header length) followed by a body of
//! `event_length - header_length` bytes:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | Timestamp |
//! | 4 | 1 | Type code |
//! | 5 | 4 | Server id |
//! | 9 | 4 | Event length (header + body) |
//! | 13 | 4 | Next record position |
//! | 17 | 2 | Flags |
//!
//! Records are followed through their next-position field rather than by
//! summing lengths, so padding between records is tolerated.

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;
use std::io::{Cursor, Read, Seek, SeekFrom};
use tracing::debug;

use crate::binlog::constants::*;
use crate::binlog::event_type::EventType;
use crate::BinlogError;

/// Supertrait combining `Read + Seek` for type-erased readers.
trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// Fixed record header present on every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordHeader {
    /// Seconds since the Unix epoch.
    pub timestamp: u32,
    /// Raw event type code.
    pub type_code: u8,
    /// Id of the server that wrote the event.
    pub server_id: u32,
    /// Total length of the record, header included.
    pub event_length: u32,
    /// Absolute file offset of the following record.
    pub next_position: u32,
    /// Event flags.
    pub flags: u16,
}

impl RecordHeader {
    /// Parse the fixed header fields from the first 19 bytes of `buf`.
    ///
    /// # Examples
    ///
    /// ```
    /// use mysqlbinlog::binlog::stream::RecordHeader;
    /// use byteorder::{ByteOrder, LittleEndian};
    ///
    /// let mut buf = vec![0u8; 19];
    /// LittleEndian::write_u32(&mut buf[0..], 1_434_000_000);
    /// buf[4] = 2; // QUERY_EVENT
    /// LittleEndian::write_u32(&mut buf[5..], 1);
    /// LittleEndian::write_u32(&mut buf[9..], 80);
    /// LittleEndian::write_u32(&mut buf[13..], 200);
    ///
    /// let hdr = RecordHeader::parse(&buf).unwrap();
    /// assert_eq!(hdr.type_code, 2);
    /// assert_eq!(hdr.event_length, 80);
    /// assert_eq!(hdr.next_position, 200);
    /// ```
    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < COMMON_HEADER_LEN {
            return None;
        }

        Some(RecordHeader {
            timestamp: LittleEndian::read_u32(&buf[EVENT_TIMESTAMP..]),
            type_code: buf[EVENT_TYPE_CODE],
            server_id: LittleEndian::read_u32(&buf[EVENT_SERVER_ID..]),
            event_length: LittleEndian::read_u32(&buf[EVENT_LENGTH..]),
            next_position: LittleEndian::read_u32(&buf[EVENT_NEXT_POSITION..]),
            flags: LittleEndian::read_u16(&buf[EVENT_FLAGS..]),
        })
    }

    /// Decoded event type.
    pub fn event_type(&self) -> EventType {
        EventType::from_u8(self.type_code)
    }
}

/// Contents of the format description event that opens every binlog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatDescriptor {
    /// Binlog format major version (always 4).
    pub version_major: u8,
    /// Binlog format minor version.
    pub version_minor: u8,
    /// Server version text, e.g. `5.6.25-log`.
    pub server_version: String,
    /// Declared header length for every following record.
    pub header_length: u8,
    /// Server id from the descriptor's own record header.
    pub server_id: u32,
    /// Timestamp from the descriptor's own record header.
    pub timestamp: u32,
}

impl FormatDescriptor {
    /// Parse the fixed part of a format description body.
    ///
    /// `header` is the record header the body was read with; its server id
    /// and timestamp are carried into the descriptor. Only format version 4
    /// is accepted.
    pub fn parse(body: &[u8], header: &RecordHeader) -> Result<Self, BinlogError> {
        if body.len() < FDE_FIXED_BODY_LEN {
            return Err(BinlogError::Open(format!(
                "Format description body is {} bytes, need at least {}",
                body.len(),
                FDE_FIXED_BODY_LEN
            )));
        }

        let version = &body[..FDE_BINLOG_VERSION_LEN];
        if version != SUPPORTED_BINLOG_VERSION {
            return Err(BinlogError::Open(format!(
                "Unsupported binlog version {}.{} (only v4 is supported)",
                version[0], version[1]
            )));
        }

        let text_start = FDE_BINLOG_VERSION_LEN;
        let text = &body[text_start..text_start + FDE_SERVER_VERSION_LEN];
        let text_len = text.iter().position(|&b| b == 0).unwrap_or(text.len());
        let server_version = String::from_utf8_lossy(&text[..text_len]).into_owned();

        let header_length = body[FDE_FIXED_BODY_LEN - FDE_HEADER_LENGTH_LEN];
        if (header_length as usize) < COMMON_HEADER_LEN {
            return Err(BinlogError::Open(format!(
                "Declared header length {} is shorter than the {}-byte common header",
                header_length, COMMON_HEADER_LEN
            )));
        }

        Ok(FormatDescriptor {
            version_major: version[0],
            version_minor: version[1],
            server_version,
            header_length,
            server_id: header.server_id,
            timestamp: header.timestamp,
        })
    }
}

/// Lifecycle of a [`BinlogFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StreamState {
    /// Records can be read.
    Streaming,
    /// The source was released with [`BinlogFile::close`].
    Closed,
    /// A read error occurred; no further records are returned.
    Failed,
}

/// One undecoded record: its header and a view of its body.
#[derive(Debug, Clone, Copy)]
pub struct RawEvent<'a> {
    /// File offset of the record header.
    pub position: u64,
    /// The record header.
    pub header: RecordHeader,
    /// Body bytes (everything after the declared header length).
    pub body: &'a [u8],
}

impl RawEvent<'_> {
    /// Decoded event type.
    pub fn event_type(&self) -> EventType {
        self.header.event_type()
    }

    /// Record timestamp (seconds since the Unix epoch).
    pub fn timestamp(&self) -> u32 {
        self.header.timestamp
    }
}

/// Binlog file reader.
pub struct BinlogFile {
    reader: Box<dyn ReadSeek>,
    file_size: u64,
    descriptor: FormatDescriptor,
    next_position: u64,
    body: Vec<u8>,
    state: StreamState,
}

impl BinlogFile {
    /// Open a binlog file and validate its magic and format descriptor.
    pub fn open(path: &str) -> Result<Self, BinlogError> {
        let file = std::fs::File::open(path)
            .map_err(|e| BinlogError::Io(format!("Cannot open {}: {}", path, e)))?;
        let file_size = file
            .metadata()
            .map_err(|e| BinlogError::Io(format!("Cannot stat {}: {}", path, e)))?
            .len();

        Self::init(Box::new(file), file_size)
    }

    /// Open a binlog file through a read-only memory map.
    ///
    /// Pages are faulted in from the OS page cache as records are read,
    /// which avoids a syscall per record on large files.
    #[cfg(feature = "cli")]
    pub fn open_mmap(path: &str) -> Result<Self, BinlogError> {
        let file = std::fs::File::open(path)
            .map_err(|e| BinlogError::Io(format!("Cannot open {}: {}", path, e)))?;
        // SAFETY: the map is read-only; a concurrent truncation of the file by
        // another process is outside what this reader can guard against.
        let mmap = unsafe { memmap2::Mmap::map(&file) }
            .map_err(|e| BinlogError::Io(format!("Cannot mmap {}: {}", path, e)))?;
        let file_size = mmap.len() as u64;

        Self::init(Box::new(Cursor::new(mmap)), file_size)
    }

    /// Create a reader over an in-memory binlog image.
    ///
    /// # Examples
    ///
    /// ```
    /// use mysqlbinlog::binlog::stream::BinlogFile;
    /// use mysqlbinlog::binlog::write::BinlogBuilder;
    ///
    /// let data = BinlogBuilder::new("8.0.36").server_id(3).finish();
    /// let mut file = BinlogFile::from_bytes(data).unwrap();
    /// assert_eq!(file.descriptor().server_version, "8.0.36");
    /// assert_eq!(file.descriptor().server_id, 3);
    /// assert!(file.next_raw().unwrap().is_none());
    /// ```
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, BinlogError> {
        let file_size = data.len() as u64;
        Self::init(Box::new(Cursor::new(data)), file_size)
    }

    fn init(mut reader: Box<dyn ReadSeek>, file_size: u64) -> Result<Self, BinlogError> {
        let mut magic = [0u8; BINLOG_MAGIC_LEN];
        reader
            .read_exact(&mut magic)
            .map_err(|e| BinlogError::Open(format!("Cannot read magic bytes: {}", e)))?;
        if magic != BINLOG_MAGIC {
            return Err(BinlogError::Open(format!(
                "Not a MySQL binlog (magic bytes {:02x}{:02x}{:02x}{:02x})",
                magic[0], magic[1], magic[2], magic[3]
            )));
        }

        let mut header_buf = [0u8; COMMON_HEADER_LEN];
        reader.read_exact(&mut header_buf).map_err(|e| {
            BinlogError::Open(format!("Cannot read format description event header: {}", e))
        })?;
        let header = RecordHeader::parse(&header_buf).ok_or_else(|| {
            BinlogError::Open("Cannot parse format description event header".to_string())
        })?;
        if header.event_type() != EventType::FormatDescription {
            return Err(BinlogError::Open(format!(
                "First event is {}, expected FORMAT_DESCRIPTION_EVENT",
                header.event_type()
            )));
        }

        let mut body = [0u8; FDE_FIXED_BODY_LEN];
        reader.read_exact(&mut body).map_err(|e| {
            BinlogError::Open(format!("Cannot read format description event body: {}", e))
        })?;
        let descriptor = FormatDescriptor::parse(&body, &header)?;

        debug!(
            server_version = %descriptor.server_version,
            server_id = descriptor.server_id,
            header_length = descriptor.header_length,
            "opened binlog"
        );

        Ok(BinlogFile {
            reader,
            file_size,
            descriptor,
            next_position: header.next_position as u64,
            body: Vec::new(),
            state: StreamState::Streaming,
        })
    }

    /// The format descriptor read at open.
    pub fn descriptor(&self) -> &FormatDescriptor {
        &self.descriptor
    }

    /// File offset the next call to [`next_raw`](Self::next_raw) reads from.
    pub fn position(&self) -> u64 {
        self.next_position
    }

    /// Size of the underlying source in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Read the next record.
    ///
    /// Returns `Ok(None)` once the next position reaches the end of the
    /// source, or after the stream was closed or failed. A short header or
    /// body is a [`BinlogError::Read`] and leaves the stream
    /// [`Failed`](StreamState::Failed). The returned body borrows an internal
    /// buffer reused from record to record.
    pub fn next_raw(&mut self) -> Result<Option<RawEvent<'_>>, BinlogError> {
        if self.state != StreamState::Streaming {
            return Ok(None);
        }

        let position = self.next_position;
        if position >= self.file_size {
            debug!(position, "end of binlog");
            return Ok(None);
        }

        let header = match self.read_record(position) {
            Ok(h) => h,
            Err(e) => {
                self.state = StreamState::Failed;
                return Err(e);
            }
        };

        Ok(Some(RawEvent {
            position,
            header,
            body: &self.body,
        }))
    }

    fn read_record(&mut self, position: u64) -> Result<RecordHeader, BinlogError> {
        self.reader
            .seek(SeekFrom::Start(position))
            .map_err(|e| BinlogError::Read(format!("Seek error at offset {}: {}", position, e)))?;

        let mut header_buf = [0u8; COMMON_HEADER_LEN];
        self.reader.read_exact(&mut header_buf).map_err(|e| {
            BinlogError::Read(format!("Truncated event header at offset {}: {}", position, e))
        })?;
        let header = RecordHeader::parse(&header_buf).ok_or_else(|| {
            BinlogError::Read(format!("Cannot parse event header at offset {}", position))
        })?;

        let header_length = self.descriptor.header_length as usize;
        let extra = header_length - COMMON_HEADER_LEN;
        if extra > 0 {
            self.reader
                .seek(SeekFrom::Current(extra as i64))
                .map_err(|e| BinlogError::Read(format!("Seek error at offset {}: {}", position, e)))?;
        }

        let event_length = header.event_length as usize;
        if event_length < header_length {
            return Err(BinlogError::Read(format!(
                "Event at offset {} has length {}, shorter than its {}-byte header",
                position, event_length, header_length
            )));
        }
        if (header.next_position as u64) <= position {
            return Err(BinlogError::Read(format!(
                "Event at offset {} points back to offset {}",
                position, header.next_position
            )));
        }

        let body_len = event_length - header_length;
        self.body.clear();
        self.body.resize(body_len, 0);
        self.reader.read_exact(&mut self.body).map_err(|e| {
            BinlogError::Read(format!(
                "Truncated {} body at offset {} ({} bytes expected): {}",
                header.event_type(),
                position,
                body_len,
                e
            ))
        })?;

        self.next_position = header.next_position as u64;
        Ok(header)
    }

    /// Stop the stream after a fatal error found past the record framing.
    pub(crate) fn fail(&mut self) {
        self.state = StreamState::Failed;
    }

    /// Release the byte source. Later reads return `Ok(None)`.
    pub fn close(&mut self) {
        self.reader = Box::new(Cursor::new(Vec::new()));
        self.body = Vec::new();
        self.state = StreamState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binlog::write::{rotate_body, BinlogBuilder};

    #[test]
    fn test_open_reads_descriptor() {
        let data = BinlogBuilder::new("5.6.25-log").server_id(42).finish();
        let file = BinlogFile::from_bytes(data).unwrap();
        let d = file.descriptor();
        assert_eq!(d.version_major, 4);
        assert_eq!(d.version_minor, 0);
        assert_eq!(d.server_version, "5.6.25-log");
        assert_eq!(d.header_length, 19);
        assert_eq!(d.server_id, 42);
        assert_eq!(file.state(), StreamState::Streaming);
    }

    #[test]
    fn test_bad_magic() {
        let mut data = BinlogBuilder::new("5.6.25").finish();
        data[0] = 0x00;
        let err = BinlogFile::from_bytes(data).err().unwrap();
        assert!(matches!(err, BinlogError::Open(_)));
    }

    #[test]
    fn test_empty_source() {
        let err = BinlogFile::from_bytes(Vec::new()).err().unwrap();
        assert!(matches!(err, BinlogError::Open(_)));
    }

    #[test]
    fn test_truncated_descriptor() {
        let data = BinlogBuilder::new("5.6.25").finish();
        let err = BinlogFile::from_bytes(data[..30].to_vec()).err().unwrap();
        assert!(matches!(err, BinlogError::Open(_)));
    }

    #[test]
    fn test_first_event_not_descriptor() {
        let mut data = BinlogBuilder::new("5.6.25").finish();
        data[BINLOG_MAGIC_LEN + EVENT_TYPE_CODE] = 2;
        let err = BinlogFile::from_bytes(data).err().unwrap();
        assert!(err.to_string().contains("QUERY_EVENT"));
    }

    #[test]
    fn test_unsupported_version() {
        let mut data = BinlogBuilder::new("5.0.1").finish();
        data[BINLOG_MAGIC_LEN + COMMON_HEADER_LEN] = 3;
        let err = BinlogFile::from_bytes(data).err().unwrap();
        assert!(err.to_string().contains("Unsupported binlog version 3.0"));
    }

    #[test]
    fn test_reads_records_in_order() {
        let mut builder = BinlogBuilder::new("5.6.25");
        builder.push(3, 100, &[]);
        builder.push(4, 200, &rotate_body(4, "mysql-bin.000002"));
        let mut file = BinlogFile::from_bytes(builder.finish()).unwrap();

        let first = file.next_raw().unwrap().unwrap();
        assert_eq!(first.event_type(), EventType::Stop);
        assert_eq!(first.timestamp(), 100);
        assert!(first.body.is_empty());

        let second = file.next_raw().unwrap().unwrap();
        assert_eq!(second.event_type(), EventType::Rotate);
        assert_eq!(&second.body[8..], b"mysql-bin.000002");

        assert!(file.next_raw().unwrap().is_none());
        assert_eq!(file.state(), StreamState::Streaming);
    }

    #[test]
    fn test_extended_header_is_skipped() {
        let mut builder = BinlogBuilder::new("5.6.25").header_length(23);
        builder.push(16, 7, &[1, 2, 3, 4, 5, 6, 7, 8]);
        let mut file = BinlogFile::from_bytes(builder.finish()).unwrap();
        assert_eq!(file.descriptor().header_length, 23);

        let raw = file.next_raw().unwrap().unwrap();
        assert_eq!(raw.event_type(), EventType::Xid);
        assert_eq!(raw.body, &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_truncated_body_fails_stream() {
        let mut builder = BinlogBuilder::new("5.6.25");
        builder.push(16, 7, &[0u8; 8]);
        let mut data = builder.finish();
        data.truncate(data.len() - 3);

        let mut file = BinlogFile::from_bytes(data).unwrap();
        let err = file.next_raw().err().unwrap();
        assert!(matches!(err, BinlogError::Read(_)));
        assert_eq!(file.state(), StreamState::Failed);
        assert!(file.next_raw().unwrap().is_none());
    }

    #[test]
    fn test_close_stops_reading() {
        let mut builder = BinlogBuilder::new("5.6.25");
        builder.push(3, 1, &[]);
        let mut file = BinlogFile::from_bytes(builder.finish()).unwrap();
        file.close();
        assert_eq!(file.state(), StreamState::Closed);
        assert!(file.next_raw().unwrap().is_none());
    }

    #[test]
    fn test_record_header_too_small() {
        assert!(RecordHeader::parse(&[0u8; 18]).is_none());
    }
}
