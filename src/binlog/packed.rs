//! Length-encoded ("packed") integers.
//!
//! The first byte is a discriminator. Values 0-250 stand for themselves;
//! `0xFC`, `0xFD` and `0xFE` introduce a 2-, 3- or 8-byte little-endian
//! value respectively. Each wide form must carry a value that could not
//! have been written in a narrower form.
//!
//! | First byte | Total size | Minimum value |
//! |------------|-----------|---------------|
//! | 0-250 | 1 | - |
//! | `0xFC` | 3 | 251 |
//! | `0xFD` | 4 | `0xFFFF` |
//! | `0xFE` | 9 | `0xFFFFFF` |
//!
//! `0xFB` (SQL NULL in the client protocol) and `0xFF` never appear in the
//! binlog structures decoded here. They are rejected with
//! [`BinlogError::Encoding`] rather than taken as a one-byte value of 251
//! or 255, so a corrupt count stops decoding instead of sizing later reads.

use byteorder::{ByteOrder, LittleEndian};

use crate::BinlogError;

/// Largest value encoded in a single byte.
pub const PACKED_MAX_SINGLE: u8 = 250;
/// Discriminator for a 2-byte value.
pub const PACKED_2_BYTES: u8 = 0xFC;
/// Discriminator for a 3-byte value.
pub const PACKED_3_BYTES: u8 = 0xFD;
/// Discriminator for an 8-byte value.
pub const PACKED_8_BYTES: u8 = 0xFE;

/// Decode one length-encoded integer from the start of `data`.
///
/// Returns the value and the number of bytes it occupied.
///
/// # Examples
///
/// ```
/// use mysqlbinlog::binlog::packed::read_packed_int;
///
/// assert_eq!(read_packed_int(&[42]).unwrap(), (42, 1));
/// assert_eq!(read_packed_int(&[0xFC, 0x00, 0x01]).unwrap(), (256, 3));
/// assert!(read_packed_int(&[0xFC, 0x05, 0x00]).is_err()); // 5 fits in one byte
/// ```
pub fn read_packed_int(data: &[u8]) -> Result<(u64, usize), BinlogError> {
    let first = *data
        .first()
        .ok_or_else(|| BinlogError::Parse("Packed integer: no bytes available".to_string()))?;

    let (width, minimum) = match first {
        0..=PACKED_MAX_SINGLE => return Ok((first as u64, 1)),
        PACKED_2_BYTES => (2, 251u64),
        PACKED_3_BYTES => (3, 0xFFFF),
        PACKED_8_BYTES => (8, 0xFF_FFFF),
        other => {
            return Err(BinlogError::Encoding(format!(
                "Packed integer: reserved discriminator 0x{:02x}",
                other
            )))
        }
    };

    let payload = data.get(1..1 + width).ok_or_else(|| {
        BinlogError::Parse(format!(
            "Packed integer: discriminator 0x{:02x} needs {} more bytes, {} available",
            first,
            width,
            data.len() - 1
        ))
    })?;

    let value = match width {
        2 => LittleEndian::read_u16(payload) as u64,
        3 => LittleEndian::read_u24(payload) as u64,
        _ => LittleEndian::read_u64(payload),
    };

    if value < minimum {
        return Err(BinlogError::Encoding(format!(
            "Packed integer: value {} below minimum {} for discriminator 0x{:02x}",
            value, minimum, first
        )));
    }

    Ok((value, 1 + width))
}

/// Encode `value` in the shortest form [`read_packed_int`] accepts.
///
/// # Examples
///
/// ```
/// use mysqlbinlog::binlog::packed::{read_packed_int, write_packed_int};
///
/// let bytes = write_packed_int(70_000);
/// assert_eq!(bytes, vec![0xFD, 0x70, 0x11, 0x01]);
/// assert_eq!(read_packed_int(&bytes).unwrap(), (70_000, 4));
/// ```
pub fn write_packed_int(value: u64) -> Vec<u8> {
    if value <= PACKED_MAX_SINGLE as u64 {
        vec![value as u8]
    } else if value <= 0xFFFF {
        let mut buf = vec![PACKED_2_BYTES, 0, 0];
        LittleEndian::write_u16(&mut buf[1..], value as u16);
        buf
    } else if value <= 0xFF_FFFF {
        let mut buf = vec![PACKED_3_BYTES, 0, 0, 0];
        LittleEndian::write_u24(&mut buf[1..], value as u32);
        buf
    } else {
        let mut buf = vec![PACKED_8_BYTES; 9];
        LittleEndian::write_u64(&mut buf[1..], value);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_byte_values() {
        for v in 0..=250u8 {
            assert_eq!(read_packed_int(&[v]).unwrap(), (v as u64, 1));
        }
    }

    #[test]
    fn test_two_byte_form_boundaries() {
        assert_eq!(read_packed_int(&[0xFC, 0xFB, 0x00]).unwrap(), (251, 3));
        assert_eq!(read_packed_int(&[0xFC, 0xFF, 0xFF]).unwrap(), (0xFFFF, 3));
        assert_eq!(read_packed_int(&[0xFC, 0x2C, 0x01]).unwrap(), (300, 3));
    }

    #[test]
    fn test_two_byte_form_below_minimum() {
        let err = read_packed_int(&[0xFC, 0xFA, 0x00]).unwrap_err();
        assert!(matches!(err, BinlogError::Encoding(_)));
    }

    #[test]
    fn test_three_byte_form() {
        assert_eq!(read_packed_int(&[0xFD, 0xFF, 0xFF, 0x00]).unwrap(), (0xFFFF, 4));
        assert_eq!(read_packed_int(&[0xFD, 0x00, 0x00, 0x01]).unwrap(), (0x10000, 4));
        let err = read_packed_int(&[0xFD, 0xFE, 0xFF, 0x00]).unwrap_err();
        assert!(matches!(err, BinlogError::Encoding(_)));
    }

    #[test]
    fn test_eight_byte_form() {
        let mut bytes = vec![0xFE, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0, 0];
        assert_eq!(read_packed_int(&bytes).unwrap(), (0xFF_FFFF, 9));
        bytes[4] = 0x01;
        assert_eq!(read_packed_int(&bytes).unwrap(), (0x1FF_FFFF, 9));

        let low = [0xFE, 0xFE, 0xFF, 0xFF, 0, 0, 0, 0, 0];
        assert!(matches!(
            read_packed_int(&low).unwrap_err(),
            BinlogError::Encoding(_)
        ));
    }

    #[test]
    fn test_reserved_discriminators() {
        assert!(matches!(
            read_packed_int(&[0xFB]).unwrap_err(),
            BinlogError::Encoding(_)
        ));
        assert!(matches!(
            read_packed_int(&[0xFF, 0, 0]).unwrap_err(),
            BinlogError::Encoding(_)
        ));
        // not read as a one-byte 251
        assert!(read_packed_int(&[0xFB, 0x01]).unwrap_err().is_fatal());
    }

    #[test]
    fn test_truncated_input() {
        assert!(matches!(read_packed_int(&[]).unwrap_err(), BinlogError::Parse(_)));
        assert!(matches!(
            read_packed_int(&[0xFD, 0x01]).unwrap_err(),
            BinlogError::Parse(_)
        ));
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        assert_eq!(read_packed_int(&[7, 0xAA, 0xBB]).unwrap(), (7, 1));
    }

    #[test]
    fn test_write_uses_shortest_form() {
        assert_eq!(write_packed_int(250), vec![250]);
        assert_eq!(write_packed_int(251), vec![0xFC, 0xFB, 0x00]);
        assert_eq!(write_packed_int(0x1_0000).len(), 4);
        assert_eq!(write_packed_int(0x100_0000).len(), 9);
        for v in [0u64, 250, 251, 0xFFFF, 0x1_0000, 0xFF_FFFF, 0x100_0000, u64::MAX] {
            assert_eq!(read_packed_int(&write_packed_int(v)).unwrap().0, v);
        }
    }
}
