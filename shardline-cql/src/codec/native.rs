//! Scalar codecs.
use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    str,
};

use uuid::Uuid;

use crate::{
    codec::{ensure_consumed, read_vint, write_vint},
    cql_type::{CqlType, TypeCode},
    error::{EncodeError, ValueDecodeError},
    registry::Registry,
    utils::invalid_data,
    value::{CqlDate, CqlDecimal, CqlDuration, CqlTime, CqlTimestamp, CqlValue, CqlVarint},
};

pub(crate) fn mismatch(expected: TypeCode, found: &CqlValue) -> EncodeError {
    EncodeError::TypeMismatch {
        expected,
        found: found.variant_name(),
    }
}

fn exact<const N: usize>(bytes: &[u8], name: &str) -> Result<[u8; N], ValueDecodeError> {
    bytes.try_into().map_err(|_| {
        invalid_data(format!(
            "Expected {N} bytes for {name}, found {}",
            bytes.len()
        ))
        .into()
    })
}

macro_rules! number_codec {
    ($encode:ident, $decode:ident, $code:ident, $tp:ty, $($variant:ident)|+ => $out:ident) => {
        pub fn $encode(
            _: &Registry,
            value: &CqlValue,
            _: Option<&CqlType>,
            buf: &mut Vec<u8>,
        ) -> Result<(), EncodeError> {
            match value {
                $(CqlValue::$variant(v))|+ => {
                    buf.extend_from_slice(&v.to_be_bytes());
                    Ok(())
                }
                other => Err(mismatch(TypeCode::$code, other)),
            }
        }

        pub fn $decode(
            _: &Registry,
            _: Option<&CqlType>,
            bytes: &[u8],
        ) -> Result<CqlValue, ValueDecodeError> {
            Ok(CqlValue::$out(<$tp>::from_be_bytes(exact(bytes, stringify!($code))?)))
        }
    };
}

number_codec!(encode_tinyint, decode_tinyint, TinyInt, i8, TinyInt => TinyInt);
number_codec!(encode_smallint, decode_smallint, SmallInt, i16, SmallInt => SmallInt);
number_codec!(encode_int, decode_int, Int, i32, Int => Int);
number_codec!(encode_bigint, decode_bigint, BigInt, i64, BigInt | Counter => BigInt);
number_codec!(encode_float, decode_float, Float, f32, Float => Float);
number_codec!(encode_double, decode_double, Double, f64, Double => Double);

pub fn decode_counter(
    _: &Registry,
    _: Option<&CqlType>,
    bytes: &[u8],
) -> Result<CqlValue, ValueDecodeError> {
    Ok(CqlValue::Counter(i64::from_be_bytes(exact(bytes, "Counter")?)))
}

pub fn encode_boolean(
    _: &Registry,
    value: &CqlValue,
    _: Option<&CqlType>,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match value {
        CqlValue::Boolean(b) => {
            buf.push(u8::from(*b));
            Ok(())
        }
        other => Err(mismatch(TypeCode::Boolean, other)),
    }
}

pub fn decode_boolean(
    _: &Registry,
    _: Option<&CqlType>,
    bytes: &[u8],
) -> Result<CqlValue, ValueDecodeError> {
    let [byte] = exact::<1>(bytes, "Boolean")?;
    Ok(CqlValue::Boolean(byte != 0))
}

pub fn encode_blob(
    _: &Registry,
    value: &CqlValue,
    _: Option<&CqlType>,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match value {
        CqlValue::Blob(blob) => {
            buf.extend_from_slice(blob);
            Ok(())
        }
        other => Err(mismatch(TypeCode::Blob, other)),
    }
}

pub fn decode_blob(
    _: &Registry,
    _: Option<&CqlType>,
    bytes: &[u8],
) -> Result<CqlValue, ValueDecodeError> {
    Ok(CqlValue::Blob(bytes.to_vec()))
}

pub fn encode_text(
    _: &Registry,
    value: &CqlValue,
    _: Option<&CqlType>,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match value {
        CqlValue::Text(s) | CqlValue::Ascii(s) => {
            buf.extend_from_slice(s.as_bytes());
            Ok(())
        }
        other => Err(mismatch(TypeCode::Text, other)),
    }
}

pub fn decode_text(
    _: &Registry,
    _: Option<&CqlType>,
    bytes: &[u8],
) -> Result<CqlValue, ValueDecodeError> {
    let text = str::from_utf8(bytes).map_err(invalid_data)?;
    Ok(CqlValue::Text(text.into()))
}

pub fn encode_ascii(
    _: &Registry,
    value: &CqlValue,
    _: Option<&CqlType>,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match value {
        CqlValue::Ascii(s) | CqlValue::Text(s) if s.is_ascii() => {
            buf.extend_from_slice(s.as_bytes());
            Ok(())
        }
        other => Err(mismatch(TypeCode::Ascii, other)),
    }
}

pub fn decode_ascii(
    _: &Registry,
    _: Option<&CqlType>,
    bytes: &[u8],
) -> Result<CqlValue, ValueDecodeError> {
    if !bytes.is_ascii() {
        return Err(invalid_data("Non ASCII characters in ascii value").into());
    }
    let text = str::from_utf8(bytes).map_err(invalid_data)?;
    Ok(CqlValue::Ascii(text.into()))
}

pub fn encode_uuid(
    _: &Registry,
    value: &CqlValue,
    _: Option<&CqlType>,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match value {
        CqlValue::Uuid(uuid) | CqlValue::Timeuuid(uuid) => {
            buf.extend_from_slice(uuid.as_bytes());
            Ok(())
        }
        other => Err(mismatch(TypeCode::Uuid, other)),
    }
}

pub fn decode_uuid(
    _: &Registry,
    _: Option<&CqlType>,
    bytes: &[u8],
) -> Result<CqlValue, ValueDecodeError> {
    Ok(CqlValue::Uuid(Uuid::from_bytes(exact(bytes, "Uuid")?)))
}

pub fn decode_timeuuid(
    _: &Registry,
    _: Option<&CqlType>,
    bytes: &[u8],
) -> Result<CqlValue, ValueDecodeError> {
    Ok(CqlValue::Timeuuid(Uuid::from_bytes(exact(bytes, "Timeuuid")?)))
}

pub fn encode_inet(
    _: &Registry,
    value: &CqlValue,
    _: Option<&CqlType>,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match value {
        CqlValue::Inet(IpAddr::V4(ip)) => buf.extend_from_slice(&ip.octets()),
        CqlValue::Inet(IpAddr::V6(ip)) => buf.extend_from_slice(&ip.octets()),
        other => return Err(mismatch(TypeCode::Inet, other)),
    }
    Ok(())
}

pub fn decode_inet(
    _: &Registry,
    _: Option<&CqlType>,
    bytes: &[u8],
) -> Result<CqlValue, ValueDecodeError> {
    let ip = match bytes.len() {
        4 => IpAddr::V4(Ipv4Addr::from(exact::<4>(bytes, "Inet")?)),
        16 => IpAddr::V6(Ipv6Addr::from(exact::<16>(bytes, "Inet")?)),
        len => return Err(invalid_data(format!("Invalid inet length {len}")).into()),
    };
    Ok(CqlValue::Inet(ip))
}

pub fn encode_date(
    _: &Registry,
    value: &CqlValue,
    _: Option<&CqlType>,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match value {
        CqlValue::Date(CqlDate(days)) => {
            buf.extend_from_slice(&days.to_be_bytes());
            Ok(())
        }
        other => Err(mismatch(TypeCode::Date, other)),
    }
}

pub fn decode_date(
    _: &Registry,
    _: Option<&CqlType>,
    bytes: &[u8],
) -> Result<CqlValue, ValueDecodeError> {
    Ok(CqlValue::Date(CqlDate(u32::from_be_bytes(exact(bytes, "Date")?))))
}

fn check_time(nanos: i64) -> bool {
    (0..CqlTime::MAX_NANOS).contains(&nanos)
}

pub fn encode_time(
    _: &Registry,
    value: &CqlValue,
    _: Option<&CqlType>,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match value {
        CqlValue::Time(CqlTime(nanos)) if check_time(*nanos) => {
            buf.extend_from_slice(&nanos.to_be_bytes());
            Ok(())
        }
        other => Err(mismatch(TypeCode::Time, other)),
    }
}

pub fn decode_time(
    _: &Registry,
    _: Option<&CqlType>,
    bytes: &[u8],
) -> Result<CqlValue, ValueDecodeError> {
    let nanos = i64::from_be_bytes(exact(bytes, "Time")?);
    if !check_time(nanos) {
        return Err(invalid_data(format!("Time {nanos} out of range")).into());
    }
    Ok(CqlValue::Time(CqlTime(nanos)))
}

pub fn encode_timestamp(
    _: &Registry,
    value: &CqlValue,
    _: Option<&CqlType>,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match value {
        CqlValue::Timestamp(CqlTimestamp(millis)) => {
            buf.extend_from_slice(&millis.to_be_bytes());
            Ok(())
        }
        other => Err(mismatch(TypeCode::Timestamp, other)),
    }
}

pub fn decode_timestamp(
    _: &Registry,
    _: Option<&CqlType>,
    bytes: &[u8],
) -> Result<CqlValue, ValueDecodeError> {
    let millis = i64::from_be_bytes(exact(bytes, "Timestamp")?);
    Ok(CqlValue::Timestamp(CqlTimestamp(millis)))
}

pub fn encode_varint(
    _: &Registry,
    value: &CqlValue,
    _: Option<&CqlType>,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match value {
        CqlValue::Varint(varint) => {
            buf.extend_from_slice(varint.as_signed_bytes_be());
            Ok(())
        }
        other => Err(mismatch(TypeCode::Varint, other)),
    }
}

pub fn decode_varint(
    _: &Registry,
    _: Option<&CqlType>,
    bytes: &[u8],
) -> Result<CqlValue, ValueDecodeError> {
    if bytes.is_empty() {
        return Err(invalid_data("Empty varint").into());
    }
    Ok(CqlValue::Varint(CqlVarint::from_signed_bytes_be(
        bytes.to_vec(),
    )))
}

pub fn encode_decimal(
    _: &Registry,
    value: &CqlValue,
    _: Option<&CqlType>,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match value {
        CqlValue::Decimal(CqlDecimal { unscaled, scale }) => {
            buf.extend_from_slice(&scale.to_be_bytes());
            buf.extend_from_slice(unscaled.as_signed_bytes_be());
            Ok(())
        }
        other => Err(mismatch(TypeCode::Decimal, other)),
    }
}

pub fn decode_decimal(
    _: &Registry,
    _: Option<&CqlType>,
    bytes: &[u8],
) -> Result<CqlValue, ValueDecodeError> {
    if bytes.len() < 5 {
        return Err(invalid_data(format!("Decimal too short ({} bytes)", bytes.len())).into());
    }
    let (scale, unscaled) = bytes.split_at(4);
    Ok(CqlValue::Decimal(CqlDecimal {
        unscaled: CqlVarint::from_signed_bytes_be(unscaled.to_vec()),
        scale: i32::from_be_bytes(exact(scale, "Decimal scale")?),
    }))
}

pub fn encode_duration(
    _: &Registry,
    value: &CqlValue,
    _: Option<&CqlType>,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match value {
        CqlValue::Duration(CqlDuration {
            months,
            days,
            nanoseconds,
        }) => {
            write_vint(buf, *months as i64);
            write_vint(buf, *days as i64);
            write_vint(buf, *nanoseconds);
            Ok(())
        }
        other => Err(mismatch(TypeCode::Duration, other)),
    }
}

pub fn decode_duration(
    _: &Registry,
    _: Option<&CqlType>,
    mut bytes: &[u8],
) -> Result<CqlValue, ValueDecodeError> {
    let months = read_vint(&mut bytes)?;
    let days = read_vint(&mut bytes)?;
    let nanoseconds = read_vint(&mut bytes)?;
    ensure_consumed(bytes, "duration")?;
    let narrow = |value: i64| i32::try_from(value).map_err(invalid_data);
    Ok(CqlValue::Duration(CqlDuration {
        months: narrow(months)?,
        days: narrow(days)?,
        nanoseconds,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::registry;

    fn encode(value: &CqlValue, tp: &CqlType) -> Vec<u8> {
        let mut buf = Vec::new();
        registry().encode(value, Some(tp), &mut buf).unwrap();
        buf
    }

    fn decode(tp: &CqlType, bytes: &[u8]) -> CqlValue {
        registry().decode(tp, bytes).unwrap()
    }

    #[test]
    fn booleans_are_zero_or_one() {
        assert_eq!(encode(&CqlValue::Boolean(true), &CqlType::Boolean), [1]);
        assert_eq!(encode(&CqlValue::Boolean(false), &CqlType::Boolean), [0]);
        assert_eq!(decode(&CqlType::Boolean, &[0x2A]), CqlValue::Boolean(true));
        assert!(registry().decode(&CqlType::Boolean, &[0, 1]).is_err());
    }

    #[test]
    fn uuid_bytes_are_kept_in_network_order() {
        let bytes: [u8; 16] = std::array::from_fn(|i| i as u8 * 17);
        let value = decode(&CqlType::Uuid, &bytes);
        assert_eq!(value, CqlValue::Uuid(Uuid::from_bytes(bytes)));
        assert_eq!(encode(&value, &CqlType::Uuid), bytes);
        assert_eq!(
            decode(&CqlType::Timeuuid, &bytes),
            CqlValue::Timeuuid(Uuid::from_bytes(bytes))
        );
    }

    #[test]
    fn dates_carry_the_epoch_offset() {
        let epoch = CqlValue::Date(CqlDate::from_days_since_epoch(0));
        assert_eq!(encode(&epoch, &CqlType::Date), [0x80, 0, 0, 0]);
        assert_eq!(decode(&CqlType::Date, &[0x7F, 0xFF, 0xFF, 0xFF]), CqlValue::Date(CqlDate::from_days_since_epoch(-1)));
    }

    #[test]
    fn decimal_is_scale_then_varint() {
        let value = CqlValue::Decimal(CqlDecimal {
            unscaled: CqlVarint::from(-12345i64),
            scale: 2,
        });
        let bytes = encode(&value, &CqlType::Decimal);
        assert_eq!(bytes, [0, 0, 0, 2, 0xCF, 0xC7]);
        assert_eq!(decode(&CqlType::Decimal, &bytes), value);
    }

    #[test]
    fn duration_is_three_zigzag_vints() {
        let value = CqlValue::Duration(CqlDuration {
            months: 1,
            days: -1,
            nanoseconds: 64,
        });
        let bytes = encode(&value, &CqlType::Duration);
        assert_eq!(bytes, [0x02, 0x01, 0x80, 0x80]);
        assert_eq!(decode(&CqlType::Duration, &bytes), value);
        assert!(registry().decode(&CqlType::Duration, &[0x02, 0x01]).is_err());
    }

    #[test]
    fn text_is_validated() {
        assert_eq!(decode(&CqlType::Text, "é".as_bytes()), CqlValue::Text("é".into()));
        assert!(registry().decode(&CqlType::Text, &[0xC3]).is_err());
        assert!(registry().decode(&CqlType::Ascii, "é".as_bytes()).is_err());
        let mut buf = Vec::new();
        assert_eq!(
            registry().encode(&CqlValue::Text("é".into()), Some(&CqlType::Ascii), &mut buf),
            Err(EncodeError::TypeMismatch {
                expected: TypeCode::Ascii,
                found: "text"
            })
        );
    }

    #[test]
    fn inet_lengths() {
        assert_eq!(
            decode(&CqlType::Inet, &[127, 0, 0, 1]),
            CqlValue::Inet(Ipv4Addr::LOCALHOST.into())
        );
        assert_eq!(
            decode(&CqlType::Inet, &Ipv6Addr::LOCALHOST.octets()),
            CqlValue::Inet(Ipv6Addr::LOCALHOST.into())
        );
        assert!(registry().decode(&CqlType::Inet, &[1, 2, 3]).is_err());
    }

    #[test]
    fn integer_widths_are_exact() {
        assert_eq!(decode(&CqlType::SmallInt, &[0xFF, 0xFE]), CqlValue::SmallInt(-2));
        assert_eq!(decode(&CqlType::Counter, &[0; 8]), CqlValue::Counter(0));
        assert!(registry().decode(&CqlType::Int, &[0, 0, 1]).is_err());
        assert_eq!(
            encode(&CqlValue::BigInt(-1), &CqlType::Counter),
            [0xFF; 8]
        );
    }

    #[test]
    fn time_range_is_checked() {
        let mut buf = Vec::new();
        assert!(registry()
            .encode(&CqlValue::Time(CqlTime(-1)), Some(&CqlType::Time), &mut buf)
            .is_err());
        assert!(registry()
            .decode(&CqlType::Time, &CqlTime::MAX_NANOS.to_be_bytes())
            .is_err());
    }

    #[test]
    fn primitives_round_trip_at_bounds() {
        let varint = |bytes: &[u8]| CqlValue::Varint(CqlVarint::from_signed_bytes_be(bytes.to_vec()));
        let decimal = |unscaled: i64, scale| {
            CqlValue::Decimal(CqlDecimal {
                unscaled: unscaled.into(),
                scale,
            })
        };
        let cases = [
            (CqlType::TinyInt, CqlValue::TinyInt(i8::MIN)),
            (CqlType::TinyInt, CqlValue::TinyInt(i8::MAX)),
            (CqlType::SmallInt, CqlValue::SmallInt(i16::MIN)),
            (CqlType::SmallInt, CqlValue::SmallInt(i16::MAX)),
            (CqlType::Int, CqlValue::Int(i32::MIN)),
            (CqlType::Int, CqlValue::Int(i32::MAX)),
            (CqlType::BigInt, CqlValue::BigInt(i64::MIN)),
            (CqlType::BigInt, CqlValue::BigInt(i64::MAX)),
            (CqlType::Counter, CqlValue::Counter(i64::MIN)),
            (CqlType::Float, CqlValue::Float(f32::INFINITY)),
            (CqlType::Float, CqlValue::Float(f32::NEG_INFINITY)),
            (CqlType::Float, CqlValue::Float(f32::MIN_POSITIVE)),
            (CqlType::Double, CqlValue::Double(f64::NEG_INFINITY)),
            (CqlType::Double, CqlValue::Double(-0.0)),
            (CqlType::Boolean, CqlValue::Boolean(true)),
            (CqlType::Ascii, CqlValue::Ascii("".into())),
            (CqlType::Text, CqlValue::Text("\u{1F980}".into())),
            (CqlType::Blob, CqlValue::Blob(vec![0, 0xFF])),
            (CqlType::Varint, varint(&[0x00, 0x80])),
            (CqlType::Varint, varint(&[0xFF, 0x7F])),
            (CqlType::Varint, varint(&[0x01; 20])),
            (CqlType::Decimal, decimal(-3, -3)),
            (CqlType::Decimal, decimal(i64::MIN, i32::MAX)),
            (CqlType::Timestamp, CqlValue::Timestamp(CqlTimestamp(i64::MIN))),
            (CqlType::Date, CqlValue::Date(CqlDate(u32::MAX))),
            (CqlType::Time, CqlValue::Time(CqlTime(CqlTime::MAX_NANOS - 1))),
            (CqlType::Uuid, CqlValue::Uuid(Uuid::from_bytes([0xFF; 16]))),
            (CqlType::Timeuuid, CqlValue::Timeuuid(Uuid::nil())),
            (CqlType::Inet, CqlValue::Inet(Ipv6Addr::UNSPECIFIED.into())),
            (
                CqlType::Duration,
                CqlValue::Duration(CqlDuration {
                    months: i32::MIN,
                    days: i32::MAX,
                    nanoseconds: i64::MIN,
                }),
            ),
        ];
        for (tp, value) in cases {
            let bytes = encode(&value, &tp);
            assert_eq!(decode(&tp, &bytes), value, "{tp:?}");
        }
        assert_eq!(encode(&varint(&[0x00, 0x80]), &CqlType::Varint), [0x00, 0x80]);
        for nan in [CqlValue::Float(f32::NAN), CqlValue::Double(f64::NAN)] {
            let tp = match nan {
                CqlValue::Float(_) => CqlType::Float,
                _ => CqlType::Double,
            };
            match decode(&tp, &encode(&nan, &tp)) {
                CqlValue::Float(f) => assert!(f.is_nan()),
                CqlValue::Double(f) => assert!(f.is_nan()),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn type_mismatch() {
        let mut buf = Vec::new();
        assert_eq!(
            registry().encode(&CqlValue::Text("1".into()), Some(&CqlType::Int), &mut buf),
            Err(EncodeError::TypeMismatch {
                expected: TypeCode::Int,
                found: "text"
            })
        );
    }
}
