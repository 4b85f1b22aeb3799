//! Column type tags carried in table map events.
//!
//! Each column of a table map event is described by a 1-byte type tag
//! (`enum_field_types` in MySQL) plus an optional metadata word whose width
//! depends on the tag.
//!
//! | Metadata width | Types |
//! |----------------|-------|
//! | 1 byte | FLOAT, DOUBLE, BLOB, GEOMETRY |
//! | 2 bytes | VARCHAR, BIT, NEWDECIMAL, VAR_STRING, STRING |
//! | none | everything else |

use serde::Serialize;
use std::fmt;

/// MySQL column types as they appear in table map events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ColumnType {
    /// Pre-5.0 DECIMAL (0)
    Decimal,
    /// TINYINT (1)
    Tiny,
    /// SMALLINT (2)
    Short,
    /// INT (3)
    Long,
    /// FLOAT (4)
    Float,
    /// DOUBLE (5)
    Double,
    /// NULL (6)
    Null,
    /// TIMESTAMP, pre-5.6 encoding (7)
    Timestamp,
    /// BIGINT (8)
    LongLong,
    /// MEDIUMINT (9)
    Int24,
    /// DATE (10)
    Date,
    /// TIME, pre-5.6 encoding (11)
    Time,
    /// DATETIME, pre-5.6 encoding (12)
    DateTime,
    /// YEAR (13)
    Year,
    /// Internal DATE (14)
    NewDate,
    /// VARCHAR (15)
    Varchar,
    /// BIT (16)
    Bit,
    /// TIMESTAMP with fractional seconds (17)
    Timestamp2,
    /// DATETIME with fractional seconds (18)
    DateTime2,
    /// TIME with fractional seconds (19)
    Time2,
    /// DECIMAL (246)
    NewDecimal,
    /// ENUM (247)
    Enum,
    /// SET (248)
    Set,
    /// TINYBLOB / TINYTEXT (249)
    TinyBlob,
    /// MEDIUMBLOB / MEDIUMTEXT (250)
    MediumBlob,
    /// LONGBLOB / LONGTEXT (251)
    LongBlob,
    /// BLOB / TEXT (252)
    Blob,
    /// VARCHAR as written by old servers (253)
    VarString,
    /// CHAR, ENUM and SET share this tag in some servers (254)
    String,
    /// Spatial types (255)
    Geometry,
    /// Any tag not listed above.
    Unknown(u8),
}

impl ColumnType {
    /// Map a raw type tag to a column type.
    pub fn from_u8(tag: u8) -> Self {
        match tag {
            0 => ColumnType::Decimal,
            1 => ColumnType::Tiny,
            2 => ColumnType::Short,
            3 => ColumnType::Long,
            4 => ColumnType::Float,
            5 => ColumnType::Double,
            6 => ColumnType::Null,
            7 => ColumnType::Timestamp,
            8 => ColumnType::LongLong,
            9 => ColumnType::Int24,
            10 => ColumnType::Date,
            11 => ColumnType::Time,
            12 => ColumnType::DateTime,
            13 => ColumnType::Year,
            14 => ColumnType::NewDate,
            15 => ColumnType::Varchar,
            16 => ColumnType::Bit,
            17 => ColumnType::Timestamp2,
            18 => ColumnType::DateTime2,
            19 => ColumnType::Time2,
            246 => ColumnType::NewDecimal,
            247 => ColumnType::Enum,
            248 => ColumnType::Set,
            249 => ColumnType::TinyBlob,
            250 => ColumnType::MediumBlob,
            251 => ColumnType::LongBlob,
            252 => ColumnType::Blob,
            253 => ColumnType::VarString,
            254 => ColumnType::String,
            255 => ColumnType::Geometry,
            other => ColumnType::Unknown(other),
        }
    }

    /// The on-disk type tag.
    pub fn as_u8(self) -> u8 {
        match self {
            ColumnType::Decimal => 0,
            ColumnType::Tiny => 1,
            ColumnType::Short => 2,
            ColumnType::Long => 3,
            ColumnType::Float => 4,
            ColumnType::Double => 5,
            ColumnType::Null => 6,
            ColumnType::Timestamp => 7,
            ColumnType::LongLong => 8,
            ColumnType::Int24 => 9,
            ColumnType::Date => 10,
            ColumnType::Time => 11,
            ColumnType::DateTime => 12,
            ColumnType::Year => 13,
            ColumnType::NewDate => 14,
            ColumnType::Varchar => 15,
            ColumnType::Bit => 16,
            ColumnType::Timestamp2 => 17,
            ColumnType::DateTime2 => 18,
            ColumnType::Time2 => 19,
            ColumnType::NewDecimal => 246,
            ColumnType::Enum => 247,
            ColumnType::Set => 248,
            ColumnType::TinyBlob => 249,
            ColumnType::MediumBlob => 250,
            ColumnType::LongBlob => 251,
            ColumnType::Blob => 252,
            ColumnType::VarString => 253,
            ColumnType::String => 254,
            ColumnType::Geometry => 255,
            ColumnType::Unknown(tag) => tag,
        }
    }

    /// Width in bytes of this column's metadata word in a table map event.
    ///
    /// # Examples
    ///
    /// ```
    /// use mysqlbinlog::binlog::column_type::ColumnType;
    ///
    /// assert_eq!(ColumnType::Double.metadata_width(), 1);
    /// assert_eq!(ColumnType::Varchar.metadata_width(), 2);
    /// assert_eq!(ColumnType::Long.metadata_width(), 0);
    /// ```
    pub fn metadata_width(&self) -> usize {
        match self {
            ColumnType::Float | ColumnType::Double | ColumnType::Blob | ColumnType::Geometry => 1,
            ColumnType::Varchar
            | ColumnType::Bit
            | ColumnType::NewDecimal
            | ColumnType::VarString
            | ColumnType::String => 2,
            _ => 0,
        }
    }

    /// Integer types whose row image is rendered as a decimal number.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::Tiny | ColumnType::Short | ColumnType::Int24 | ColumnType::Long
        )
    }

    /// Short lowercase label, used when a value is not decoded.
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Decimal => "decimal",
            ColumnType::Tiny => "tiny",
            ColumnType::Short => "short",
            ColumnType::Long => "long",
            ColumnType::Float => "float",
            ColumnType::Double => "double",
            ColumnType::Null => "null",
            ColumnType::Timestamp => "timestamp",
            ColumnType::LongLong => "longlong",
            ColumnType::Int24 => "int24",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::DateTime => "datetime",
            ColumnType::Year => "year",
            ColumnType::NewDate => "newdate",
            ColumnType::Varchar => "varchar",
            ColumnType::Bit => "bit",
            ColumnType::Timestamp2 => "timestamp2",
            ColumnType::DateTime2 => "datetime2",
            ColumnType::Time2 => "time2",
            ColumnType::NewDecimal => "newdecimal",
            ColumnType::Enum => "enum",
            ColumnType::Set => "set",
            ColumnType::TinyBlob => "tiny_blob",
            ColumnType::MediumBlob => "medium_blob",
            ColumnType::LongBlob => "long_blob",
            ColumnType::Blob => "blob",
            ColumnType::VarString => "var_string",
            ColumnType::String => "string",
            ColumnType::Geometry => "geometry",
            ColumnType::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
