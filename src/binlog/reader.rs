//! Decoding session over one binlog file.
//!
//! [`BinlogReader`] pairs a [`BinlogFile`] with the [`TableRegistry`] its
//! rows events are resolved against, and yields decoded events in file
//! order. Per-event parse failures ([`BinlogError::is_fatal`] is false) are
//! returned without ending the session: the stream is already positioned on
//! the next record, so the caller may log them and keep reading. Any other
//! error ends the session.

use crate::binlog::event::{decode_event_with, BinlogEvent};
use crate::binlog::rows::{PlaceholderRenderer, ValueRenderer};
use crate::binlog::stream::{BinlogFile, FormatDescriptor, StreamState};
use crate::binlog::table_map::TableRegistry;
use crate::BinlogError;

/// One decoding session: a record stream, its table registry and a value renderer.
///
/// # Examples
///
/// ```
/// use mysqlbinlog::binlog::reader::BinlogReader;
/// use mysqlbinlog::binlog::write::{query_body, xid_body, BinlogBuilder};
///
/// let mut builder = BinlogBuilder::new("5.6.25-log");
/// builder
///     .push(2, 1_434_000_000, &query_body("shop", "BEGIN"))
///     .push(16, 1_434_000_001, &xid_body(12));
///
/// let reader = BinlogReader::from_bytes(builder.finish()).unwrap();
/// let events: Vec<_> = reader.collect::<Result<_, _>>().unwrap();
/// assert_eq!(events.len(), 2);
/// ```
pub struct BinlogReader {
    file: BinlogFile,
    tables: TableRegistry,
    renderer: Box<dyn ValueRenderer>,
}

impl BinlogReader {
    /// Open a binlog file on disk.
    pub fn open(path: &str) -> Result<Self, BinlogError> {
        Ok(Self::new(BinlogFile::open(path)?))
    }

    /// Open a binlog file through a memory map.
    #[cfg(feature = "cli")]
    pub fn open_mmap(path: &str) -> Result<Self, BinlogError> {
        Ok(Self::new(BinlogFile::open_mmap(path)?))
    }

    /// Decode an in-memory binlog image.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, BinlogError> {
        Ok(Self::new(BinlogFile::from_bytes(data)?))
    }

    /// Start a session over an already opened stream.
    pub fn new(file: BinlogFile) -> Self {
        BinlogReader {
            file,
            tables: TableRegistry::new(),
            renderer: Box::new(PlaceholderRenderer),
        }
    }

    /// Replace the renderer used for non-null row values.
    pub fn with_renderer(mut self, renderer: Box<dyn ValueRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Format descriptor read when the file was opened.
    pub fn format_descriptor(&self) -> &FormatDescriptor {
        self.file.descriptor()
    }

    /// Table descriptors seen so far.
    pub fn tables(&self) -> &TableRegistry {
        &self.tables
    }

    /// Lifecycle state of the underlying stream.
    pub fn state(&self) -> StreamState {
        self.file.state()
    }

    /// File offset of the next record.
    pub fn position(&self) -> u64 {
        self.file.position()
    }

    /// Size of the underlying source in bytes.
    pub fn file_size(&self) -> u64 {
        self.file.file_size()
    }

    /// Decode the next event.
    ///
    /// Returns `Ok(None)` at end of stream and after a fatal error.
    pub fn next_event(&mut self) -> Result<Option<BinlogEvent>, BinlogError> {
        let raw = match self.file.next_raw()? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        match decode_event_with(&raw, &mut self.tables, self.renderer.as_ref()) {
            Ok(event) => Ok(Some(event)),
            Err(e) => {
                if e.is_fatal() {
                    self.file.fail();
                }
                Err(e)
            }
        }
    }

    /// Release the byte source.
    pub fn close(&mut self) {
        self.file.close();
    }
}

impl Iterator for BinlogReader {
    type Item = Result<BinlogEvent, BinlogError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}
