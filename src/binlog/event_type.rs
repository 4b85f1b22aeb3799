//! Binlog event type tags.
//!
//! Maps the 1-byte type code at offset 4 of every record header to an
//! [`EventType`]. Only the events a row-based binlog decoder needs are named;
//! every other code is kept verbatim in [`EventType::Unknown`].

use serde::Serialize;
use std::fmt;

/// Event types recognized by the decoder (values from `binlog_event.h`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EventType {
    /// Statement executed on the source (QUERY_EVENT = 2)
    Query,
    /// Server shut down cleanly (STOP_EVENT = 3)
    Stop,
    /// Logging continues in another file (ROTATE_EVENT = 4)
    Rotate,
    /// Describes the layout of the file (FORMAT_DESCRIPTION_EVENT = 15)
    FormatDescription,
    /// Transaction commit (XID_EVENT = 16)
    Xid,
    /// Table id to table definition mapping (TABLE_MAP_EVENT = 19)
    TableMap,
    /// Inserted rows (WRITE_ROWS_EVENT = 23)
    WriteRows,
    /// Before/after row pairs (UPDATE_ROWS_EVENT = 24)
    UpdateRows,
    /// Deleted rows (DELETE_ROWS_EVENT = 25)
    DeleteRows,
    /// Any other type code.
    Unknown(u8),
}

impl EventType {
    /// Map a raw type code to an event type.
    ///
    /// # Examples
    ///
    /// ```
    /// use mysqlbinlog::binlog::event_type::EventType;
    ///
    /// assert_eq!(EventType::from_u8(19), EventType::TableMap);
    /// assert_eq!(EventType::from_u8(35), EventType::Unknown(35));
    /// assert_eq!(EventType::from_u8(35).as_u8(), 35);
    /// ```
    pub fn from_u8(code: u8) -> Self {
        match code {
            2 => EventType::Query,
            3 => EventType::Stop,
            4 => EventType::Rotate,
            15 => EventType::FormatDescription,
            16 => EventType::Xid,
            19 => EventType::TableMap,
            23 => EventType::WriteRows,
            24 => EventType::UpdateRows,
            25 => EventType::DeleteRows,
            other => EventType::Unknown(other),
        }
    }

    /// The on-disk type code.
    pub fn as_u8(self) -> u8 {
        match self {
            EventType::Query => 2,
            EventType::Stop => 3,
            EventType::Rotate => 4,
            EventType::FormatDescription => 15,
            EventType::Xid => 16,
            EventType::TableMap => 19,
            EventType::WriteRows => 23,
            EventType::UpdateRows => 24,
            EventType::DeleteRows => 25,
            EventType::Unknown(code) => code,
        }
    }

    /// MySQL source name of the event type.
    pub fn name(&self) -> &'static str {
        match self {
            EventType::Query => "QUERY_EVENT",
            EventType::Stop => "STOP_EVENT",
            EventType::Rotate => "ROTATE_EVENT",
            EventType::FormatDescription => "FORMAT_DESCRIPTION_EVENT",
            EventType::Xid => "XID_EVENT",
            EventType::TableMap => "TABLE_MAP_EVENT",
            EventType::WriteRows => "WRITE_ROWS_EVENT",
            EventType::UpdateRows => "UPDATE_ROWS_EVENT",
            EventType::DeleteRows => "DELETE_ROWS_EVENT",
            EventType::Unknown(_) => "UNKNOWN_EVENT",
        }
    }

    /// Whether this event carries row images.
    pub fn is_rows_event(&self) -> bool {
        matches!(
            self,
            EventType::WriteRows | EventType::UpdateRows | EventType::DeleteRows
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Unknown(code) => write!(f, "UNKNOWN_EVENT({})", code),
            _ => write!(f, "{}", self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_round_trip() {
        for code in [2u8, 3, 4, 15, 16, 19, 23, 24, 25] {
            let t = EventType::from_u8(code);
            assert!(!matches!(t, EventType::Unknown(_)), "code {}", code);
            assert_eq!(t.as_u8(), code);
        }
    }

    #[test]
    fn test_unknown_code() {
        let t = EventType::from_u8(30);
        assert_eq!(t, EventType::Unknown(30));
        assert_eq!(t.to_string(), "UNKNOWN_EVENT(30)");
    }

    #[test]
    fn test_rows_events() {
        assert!(EventType::WriteRows.is_rows_event());
        assert!(EventType::UpdateRows.is_rows_event());
        assert!(EventType::DeleteRows.is_rows_event());
        assert!(!EventType::TableMap.is_rows_event());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(EventType::Query.to_string(), "QUERY_EVENT");
        assert_eq!(EventType::Xid.to_string(), "XID_EVENT");
    }
}
