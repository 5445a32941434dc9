use std::{
    collections::HashMap,
    hash::Hash,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
};

use uuid::Uuid;

use crate::{
    error::ConversionError,
    utils::tuples,
    value::{CqlDate, CqlDecimal, CqlDuration, CqlTime, CqlTimestamp, CqlValue, CqlVarint},
};

/// Conversion of a possibly null decoded value into a Rust type.
pub trait FromCqlValue: Sized {
    fn from_cql(value: Option<CqlValue>) -> Result<Self, ConversionError>;
}

/// Conversion of a whole decoded row.
pub trait FromRow: Sized {
    fn from_row(values: Vec<Option<CqlValue>>) -> Result<Self, ConversionError>;
}

fn mismatch(expected: &'static str, found: &CqlValue) -> ConversionError {
    ConversionError::TypeMismatch {
        expected,
        found: found.variant_name(),
    }
}

impl FromCqlValue for CqlValue {
    fn from_cql(value: Option<CqlValue>) -> Result<Self, ConversionError> {
        value.ok_or(ConversionError::Null)
    }
}

impl<T> FromCqlValue for Option<T>
where
    T: FromCqlValue,
{
    fn from_cql(value: Option<CqlValue>) -> Result<Self, ConversionError> {
        value.map(|v| T::from_cql(Some(v))).transpose()
    }
}

macro_rules! from_cql {
    ($tp:ty, $name:literal, $($pattern:pat => $expr:expr),+ $(,)?) => {
        impl FromCqlValue for $tp {
            fn from_cql(value: Option<CqlValue>) -> Result<Self, ConversionError> {
                match value.ok_or(ConversionError::Null)? {
                    $($pattern => Ok($expr),)+
                    other => Err(mismatch($name, &other)),
                }
            }
        }
    };
}

from_cql!(bool, "bool", CqlValue::Boolean(b) => b);
from_cql!(i8, "i8", CqlValue::TinyInt(i) => i);
from_cql!(i16, "i16", CqlValue::SmallInt(i) => i);
from_cql!(i32, "i32", CqlValue::Int(i) => i);
from_cql!(i64, "i64", CqlValue::BigInt(i) | CqlValue::Counter(i) => i);
from_cql!(f32, "f32", CqlValue::Float(f) => f);
from_cql!(f64, "f64", CqlValue::Double(f) => f);
from_cql!(String, "String", CqlValue::Text(s) | CqlValue::Ascii(s) => s);
from_cql!(Vec<u8>, "Vec<u8>", CqlValue::Blob(b) => b);
from_cql!(Uuid, "Uuid", CqlValue::Uuid(u) | CqlValue::Timeuuid(u) => u);
from_cql!(IpAddr, "IpAddr", CqlValue::Inet(ip) => ip);
from_cql!(CqlDate, "CqlDate", CqlValue::Date(d) => d);
from_cql!(CqlTime, "CqlTime", CqlValue::Time(t) => t);
from_cql!(CqlTimestamp, "CqlTimestamp", CqlValue::Timestamp(t) => t);
from_cql!(CqlDuration, "CqlDuration", CqlValue::Duration(d) => d);
from_cql!(CqlDecimal, "CqlDecimal", CqlValue::Decimal(d) => d);
from_cql!(CqlVarint, "CqlVarint", CqlValue::Varint(v) => v);

impl<T> FromCqlValue for Vec<T>
where
    T: FromCqlValue,
{
    fn from_cql(value: Option<CqlValue>) -> Result<Self, ConversionError> {
        match value.ok_or(ConversionError::Null)? {
            CqlValue::List(elems) | CqlValue::Set(elems) | CqlValue::Vector(elems) => elems
                .into_iter()
                .map(|elem| T::from_cql(Some(elem)))
                .collect(),
            other => Err(mismatch("Vec", &other)),
        }
    }
}

impl<K, V> FromCqlValue for HashMap<K, V>
where
    K: FromCqlValue + Eq + Hash,
    V: FromCqlValue,
{
    fn from_cql(value: Option<CqlValue>) -> Result<Self, ConversionError> {
        match value.ok_or(ConversionError::Null)? {
            CqlValue::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((K::from_cql(Some(k))?, V::from_cql(Some(v))?)))
                .collect(),
            other => Err(mismatch("HashMap", &other)),
        }
    }
}

macro_rules! from_row_tuple {
    ($($tp:ident/$idx:tt),*;$len:literal) => {
        impl<$($tp,)*> FromRow for ($($tp,)*)
        where
            $($tp: FromCqlValue,)*
        {
            fn from_row(values: Vec<Option<CqlValue>>) -> Result<Self, ConversionError> {
                if values.len() != $len {
                    return Err(ConversionError::ColumnCount {
                        expected: $len,
                        found: values.len(),
                    });
                }
                let mut values = values.into_iter();
                Ok(($($tp::from_cql(values.next().flatten())?,)*))
            }
        }
    };
}
tuples!(from_row_tuple);

macro_rules! into_cql {
    ($($tp:ty => $variant:ident),* $(,)?) => {
        $(
        impl From<$tp> for CqlValue {
            fn from(value: $tp) -> Self {
                Self::$variant(value.into())
            }
        }
        )*
    };
}

into_cql!(
    bool => Boolean,
    i8 => TinyInt,
    i16 => SmallInt,
    i32 => Int,
    i64 => BigInt,
    f32 => Float,
    f64 => Double,
    String => Text,
    &str => Text,
    Vec<u8> => Blob,
    &[u8] => Blob,
    Uuid => Uuid,
    IpAddr => Inet,
    Ipv4Addr => Inet,
    Ipv6Addr => Inet,
    CqlDate => Date,
    CqlTime => Time,
    CqlTimestamp => Timestamp,
    CqlDuration => Duration,
    CqlDecimal => Decimal,
    CqlVarint => Varint,
);
