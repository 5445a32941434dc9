//! Decoded CQL values.
use std::net::IpAddr;

use uuid::Uuid;

use crate::cql_type::TypeCode;

#[cfg(feature = "chrono")]
mod chrono;
mod convert;
#[cfg(feature = "num-bigint")]
mod num;

pub use convert::{FromCqlValue, FromRow};

/// A bound value, which may also be null or left unset.
///
/// Unset values leave the column untouched on the server side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MaybeValue<T> {
    Value(T),
    #[default]
    Null,
    Unset,
}

impl<T> MaybeValue<T> {
    pub fn as_ref(&self) -> MaybeValue<&T> {
        match self {
            Self::Value(value) => MaybeValue::Value(value),
            Self::Null => MaybeValue::Null,
            Self::Unset => MaybeValue::Unset,
        }
    }

    pub fn value(self) -> Option<T> {
        match self {
            Self::Value(value) => Some(value),
            Self::Null | Self::Unset => None,
        }
    }
}

impl<T> From<Option<T>> for MaybeValue<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Self::Value)
    }
}

/// Arbitrary precision integer, stored as its minimal two's complement big-endian bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CqlVarint(Vec<u8>);

impl CqlVarint {
    /// Normalizes redundant sign bytes away, so equal numbers compare equal.
    pub fn from_signed_bytes_be(mut bytes: Vec<u8>) -> Self {
        let redundant = bytes
            .windows(2)
            .take_while(|w| (w[0] == 0x00 && w[1] & 0x80 == 0) || (w[0] == 0xFF && w[1] & 0x80 != 0))
            .count();
        bytes.drain(..redundant);
        if bytes.is_empty() {
            bytes.push(0);
        }
        Self(bytes)
    }

    pub fn as_signed_bytes_be(&self) -> &[u8] {
        &self.0
    }

    pub fn into_signed_bytes_be(self) -> Vec<u8> {
        self.0
    }
}

impl From<i64> for CqlVarint {
    fn from(value: i64) -> Self {
        Self::from_signed_bytes_be(value.to_be_bytes().to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Varint does not fit in 64 bits")]
pub struct VarintOverflow;

impl TryFrom<&CqlVarint> for i64 {
    type Error = VarintOverflow;
    fn try_from(value: &CqlVarint) -> Result<Self, Self::Error> {
        if value.0.len() > 8 {
            return Err(VarintOverflow);
        }
        let fill = if value.0[0] & 0x80 != 0 { 0xFF } else { 0x00 };
        let mut bytes = [fill; 8];
        bytes[8 - value.0.len()..].copy_from_slice(&value.0);
        Ok(i64::from_be_bytes(bytes))
    }
}

/// Decimal number, `unscaled * 10^-scale`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CqlDecimal {
    pub unscaled: CqlVarint,
    pub scale: i32,
}

/// Days since -5877641-06-23, i.e. the unix epoch is `2^31`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CqlDate(pub u32);

impl CqlDate {
    pub const EPOCH: CqlDate = CqlDate(1 << 31);

    pub fn from_days_since_epoch(days: i32) -> Self {
        Self((days as u32).wrapping_add(1 << 31))
    }

    pub fn days_since_epoch(self) -> i32 {
        self.0.wrapping_sub(1 << 31) as i32
    }
}

/// Nanoseconds since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CqlTime(pub i64);

impl CqlTime {
    pub const MAX_NANOS: i64 = 86_400_000_000_000;
}

/// Milliseconds since the unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CqlTimestamp(pub i64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CqlDuration {
    pub months: i32,
    pub days: i32,
    pub nanoseconds: i64,
}

/// Closed union of every value the registry decodes.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum CqlValue {
    Ascii(String),
    BigInt(i64),
    Blob(Vec<u8>),
    Boolean(bool),
    Counter(i64),
    Date(CqlDate),
    Decimal(CqlDecimal),
    Double(f64),
    Duration(CqlDuration),
    Float(f32),
    Inet(IpAddr),
    Int(i32),
    List(Vec<CqlValue>),
    Map(Vec<(CqlValue, CqlValue)>),
    Set(Vec<CqlValue>),
    SmallInt(i16),
    Text(String),
    Time(CqlTime),
    Timestamp(CqlTimestamp),
    Timeuuid(Uuid),
    TinyInt(i8),
    Tuple(Vec<Option<CqlValue>>),
    Udt {
        keyspace: String,
        type_name: String,
        fields: Vec<(String, Option<CqlValue>)>,
    },
    Uuid(Uuid),
    Varint(CqlVarint),
    Vector(Vec<CqlValue>),
}

impl CqlValue {
    /// Code of the type this value was decoded from, or is naturally encoded as.
    pub fn type_code(&self) -> TypeCode {
        match self {
            Self::Ascii(_) => TypeCode::Ascii,
            Self::BigInt(_) => TypeCode::BigInt,
            Self::Blob(_) => TypeCode::Blob,
            Self::Boolean(_) => TypeCode::Boolean,
            Self::Counter(_) => TypeCode::Counter,
            Self::Date(_) => TypeCode::Date,
            Self::Decimal(_) => TypeCode::Decimal,
            Self::Double(_) => TypeCode::Double,
            Self::Duration(_) => TypeCode::Duration,
            Self::Float(_) => TypeCode::Float,
            Self::Inet(_) => TypeCode::Inet,
            Self::Int(_) => TypeCode::Int,
            Self::List(_) => TypeCode::List,
            Self::Map(_) => TypeCode::Map,
            Self::Set(_) => TypeCode::Set,
            Self::SmallInt(_) => TypeCode::SmallInt,
            Self::Text(_) => TypeCode::Text,
            Self::Time(_) => TypeCode::Time,
            Self::Timestamp(_) => TypeCode::Timestamp,
            Self::Timeuuid(_) => TypeCode::Timeuuid,
            Self::TinyInt(_) => TypeCode::TinyInt,
            Self::Tuple(_) => TypeCode::Tuple,
            Self::Udt { .. } => TypeCode::Udt,
            Self::Uuid(_) => TypeCode::Uuid,
            Self::Varint(_) => TypeCode::Varint,
            Self::Vector(_) => TypeCode::Vector,
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Ascii(_) => "ascii",
            Self::BigInt(_) => "bigint",
            Self::Blob(_) => "blob",
            Self::Boolean(_) => "boolean",
            Self::Counter(_) => "counter",
            Self::Date(_) => "date",
            Self::Decimal(_) => "decimal",
            Self::Double(_) => "double",
            Self::Duration(_) => "duration",
            Self::Float(_) => "float",
            Self::Inet(_) => "inet",
            Self::Int(_) => "int",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Set(_) => "set",
            Self::SmallInt(_) => "smallint",
            Self::Text(_) => "text",
            Self::Time(_) => "time",
            Self::Timestamp(_) => "timestamp",
            Self::Timeuuid(_) => "timeuuid",
            Self::TinyInt(_) => "tinyint",
            Self::Tuple(_) => "tuple",
            Self::Udt { .. } => "udt",
            Self::Uuid(_) => "uuid",
            Self::Varint(_) => "varint",
            Self::Vector(_) => "vector",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Ascii(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bigint(&self) -> Option<i64> {
        match self {
            Self::BigInt(i) | Self::Counter(i) => Some(*i),
            _ => None,
        }
    }

    /// Elements of a list, a set or a vector.
    pub fn as_elements(&self) -> Option<&[CqlValue]> {
        match self {
            Self::List(elems) | Self::Set(elems) | Self::Vector(elems) => Some(elems),
            _ => None,
        }
    }

    /// Value of a UDT field by name.
    pub fn udt_field(&self, name: &str) -> Option<Option<&CqlValue>> {
        match self {
            Self::Udt { fields, .. } => fields
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, value)| value.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_is_offset_by_two_to_the_31() {
        assert_eq!(CqlDate::from_days_since_epoch(0), CqlDate::EPOCH);
        assert_eq!(CqlDate::from_days_since_epoch(-1).0, (1 << 31) - 1);
        assert_eq!(CqlDate(0).days_since_epoch(), i32::MIN);
        assert_eq!(CqlDate(u32::MAX).days_since_epoch(), i32::MAX);
    }

    #[test]
    fn varint_is_normalized() {
        assert_eq!(
            CqlVarint::from_signed_bytes_be(vec![0x00, 0x00, 0x7F]).as_signed_bytes_be(),
            &[0x7F]
        );
        assert_eq!(
            CqlVarint::from_signed_bytes_be(vec![0x00, 0x80]).as_signed_bytes_be(),
            &[0x00, 0x80]
        );
        assert_eq!(
            CqlVarint::from_signed_bytes_be(vec![0xFF, 0xFF, 0x80]).as_signed_bytes_be(),
            &[0x80]
        );
        assert_eq!(CqlVarint::from(-1i64).as_signed_bytes_be(), &[0xFF]);
        assert_eq!(CqlVarint::from(0i64).as_signed_bytes_be(), &[0x00]);
        assert_eq!(CqlVarint::from(256i64).as_signed_bytes_be(), &[0x01, 0x00]);
    }

    #[test]
    fn varint_to_i64() {
        for n in [0, 1, -1, 127, 128, -128, -129, i64::MAX, i64::MIN] {
            assert_eq!(i64::try_from(&CqlVarint::from(n)).unwrap(), n);
        }
        let big = CqlVarint::from_signed_bytes_be(vec![0x01, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert!(i64::try_from(&big).is_err());
    }
}
