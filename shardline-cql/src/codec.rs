//! Value encodings registered in [`Registry::standard`](crate::registry::Registry::standard).
use std::io;

use crate::{
    cql::{check_size, read_and_advance, ReadCql},
    cql_type::CqlType,
    error::EncodeError,
    registry::Registry,
    utils::invalid_data,
    value::CqlValue,
};

pub mod collection;
pub mod native;

/// Encodes `[bytes]`, i.e. a 4-byte length followed by the value, `-1` for null.
pub fn write_bytes_value(
    registry: &Registry,
    value: Option<&CqlValue>,
    tp: Option<&CqlType>,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    let Some(value) = value else {
        buf.extend_from_slice(&(-1i32).to_be_bytes());
        return Ok(());
    };
    let start = buf.len();
    buf.extend_from_slice(&[0; 4]);
    registry.encode(value, tp, buf)?;
    let size: i32 = check_size(buf.len() - start - 4)?;
    buf[start..start + 4].copy_from_slice(&size.to_be_bytes());
    Ok(())
}

/// Reads `[bytes]`, `None` for null.
pub fn read_bytes_value<'a>(buf: &mut &'a [u8]) -> io::Result<Option<&'a [u8]>> {
    Option::<&[u8]>::read_cql(buf)
}

pub(crate) fn ensure_consumed(buf: &[u8], what: &str) -> io::Result<()> {
    if !buf.is_empty() {
        return Err(invalid_data(format!(
            "{} trailing bytes after {what}",
            buf.len()
        )));
    }
    Ok(())
}

/// Variable length encoding of unsigned integers, the number of leading ones of the first
/// byte being the number of extra bytes.
pub fn write_unsigned_vint(buf: &mut Vec<u8>, value: u64) {
    let size = ((639 - 9 * value.leading_zeros()) >> 6) as usize;
    if size <= 1 {
        buf.push(value as u8);
        return;
    }
    let extra = size - 1;
    let bytes = if extra < 8 {
        (value | ((!(0xFFu8 >> extra)) as u64) << (8 * extra)).to_be_bytes()
    } else {
        buf.push(0xFF);
        value.to_be_bytes()
    };
    buf.extend_from_slice(&bytes[8 - size.min(8)..]);
}

pub fn read_unsigned_vint(buf: &mut &[u8]) -> io::Result<u64> {
    let first = u8::read_cql(buf)?;
    let extra = first.leading_ones() as usize;
    let mut value = if extra < 8 {
        (first & (0xFF >> extra)) as u64
    } else {
        0
    };
    for byte in read_and_advance(buf, extra)? {
        value = (value << 8) | *byte as u64;
    }
    Ok(value)
}

pub fn write_vint(buf: &mut Vec<u8>, value: i64) {
    write_unsigned_vint(buf, ((value >> 63) ^ (value << 1)) as u64);
}

pub fn read_vint(buf: &mut &[u8]) -> io::Result<i64> {
    let value = read_unsigned_vint(buf)?;
    Ok(((value >> 1) as i64) ^ -((value & 1) as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::registry;

    fn unsigned(value: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        write_unsigned_vint(&mut buf, value);
        buf
    }

    #[test]
    fn unsigned_vint_layout() {
        assert_eq!(unsigned(0), [0x00]);
        assert_eq!(unsigned(0x7F), [0x7F]);
        assert_eq!(unsigned(0x80), [0x80, 0x80]);
        assert_eq!(unsigned(0x3FFF), [0xBF, 0xFF]);
        assert_eq!(unsigned(0x4000), [0xC0, 0x40, 0x00]);
        assert_eq!(unsigned(u64::MAX), [0xFF; 9]);
    }

    #[test]
    fn vint_boundaries() {
        for value in [0, 1, -1, 63, -64, 64, 1 << 20, i32::MAX as i64, i64::MIN, i64::MAX] {
            let mut buf = Vec::new();
            write_vint(&mut buf, value);
            let mut slice = &buf[..];
            assert_eq!(read_vint(&mut slice).unwrap(), value);
            assert!(slice.is_empty());
        }
        assert_eq!(read_unsigned_vint(&mut &[0xC0, 0x40][..]).unwrap_err().kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn null_bytes_value() {
        let mut buf = Vec::new();
        write_bytes_value(registry(), None, None, &mut buf).unwrap();
        assert_eq!(buf, [0xFF; 4]);
        assert_eq!(read_bytes_value(&mut &buf[..]).unwrap(), None);
    }

    #[test]
    fn bytes_value_is_length_prefixed() {
        let mut buf = Vec::new();
        write_bytes_value(registry(), Some(&CqlValue::Int(5)), None, &mut buf).unwrap();
        assert_eq!(buf, [0, 0, 0, 4, 0, 0, 0, 5]);
    }
}
