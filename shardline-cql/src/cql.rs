//! Protocol notation primitives (`[int]`, `[string]`, `[bytes]`, maps...).
//!
//! Requests are written in two passes: `cql_size` first, so the envelope can be allocated
//! once, then `write_cql` into the exactly sized slice.
use std::{collections::HashMap, fmt, io, mem, str};

use bytes::BufMut;
use enumflags2::{BitFlag, BitFlags};
use uuid::Uuid;

use crate::{error::ValueTooLarge, utils::invalid_data};

pub(crate) fn check_size<I>(size: usize) -> Result<I, ValueTooLarge>
where
    I: TryFrom<usize>,
{
    I::try_from(size).map_err(|_| ValueTooLarge(size))
}

// There is no Buf method for this as Buf handle discontinuous buffers
#[inline]
pub(crate) fn read_and_advance<'a>(buf: &mut &'a [u8], len: usize) -> io::Result<&'a [u8]> {
    if len > buf.len() {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    let (head, tail) = buf.split_at(len);
    *buf = tail;
    Ok(head)
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, strum::FromRepr)]
#[repr(u16)]
#[non_exhaustive]
pub enum Consistency {
    Any = 0x0000,
    One = 0x0001,
    Two = 0x0002,
    Three = 0x0003,
    Quorum = 0x0004,
    All = 0x0005,
    #[default]
    LocalQuorum = 0x0006,
    EachQuorum = 0x0007,
    LocalOne = 0x000A,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, strum::FromRepr)]
#[repr(u16)]
#[non_exhaustive]
pub enum SerialConsistency {
    Serial = 0x0008,
    LocalSerial = 0x0009,
}

/// Consistency as found in error bodies, where both kinds share the same field.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LegacyConsistency {
    Regular(Consistency),
    Serial(SerialConsistency),
}

impl From<LegacyConsistency> for u16 {
    fn from(c: LegacyConsistency) -> u16 {
        match c {
            LegacyConsistency::Regular(c) => c as u16,
            LegacyConsistency::Serial(c) => c as u16,
        }
    }
}

impl fmt::Display for LegacyConsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regular(c) => write!(f, "{c:?}"),
            Self::Serial(c) => write!(f, "{c:?}"),
        }
    }
}

pub(crate) trait WriteCql {
    fn cql_size(&self) -> Result<usize, ValueTooLarge>;
    fn write_cql(&self, buf: &mut &mut [u8]);
}

pub(crate) trait ReadCql<'a>: Sized {
    fn read_cql(buf: &mut &'a [u8]) -> io::Result<Self>;
}

macro_rules! int_cql {
    ($($int:ty),*) => {$(
        impl WriteCql for $int {
            fn cql_size(&self) -> Result<usize, ValueTooLarge> {
                Ok(mem::size_of::<$int>())
            }

            fn write_cql(&self, buf: &mut &mut [u8]) {
                buf.put_slice(&self.to_be_bytes());
            }
        }

        impl ReadCql<'_> for $int {
            fn read_cql(buf: &mut &'_ [u8]) -> io::Result<Self> {
                let mut bytes = [0; mem::size_of::<$int>()];
                bytes.copy_from_slice(read_and_advance(buf, mem::size_of::<$int>())?);
                Ok(<$int>::from_be_bytes(bytes))
            }
        }
    )*};
}

int_cql!(u8, i8, u16, i16, u32, i32, u64, i64);

impl WriteCql for bool {
    fn cql_size(&self) -> Result<usize, ValueTooLarge> {
        Ok(1)
    }

    fn write_cql(&self, buf: &mut &mut [u8]) {
        u8::from(*self).write_cql(buf);
    }
}

impl ReadCql<'_> for bool {
    fn read_cql(buf: &mut &'_ [u8]) -> io::Result<Self> {
        Ok(u8::read_cql(buf)? != 0)
    }
}

impl<const N: usize> WriteCql for [u8; N] {
    fn cql_size(&self) -> Result<usize, ValueTooLarge> {
        Ok(N)
    }

    fn write_cql(&self, buf: &mut &mut [u8]) {
        buf.put_slice(self);
    }
}

impl<const N: usize> ReadCql<'_> for [u8; N] {
    fn read_cql(buf: &mut &'_ [u8]) -> io::Result<Self> {
        let mut array = [0; N];
        array.copy_from_slice(read_and_advance(buf, N)?);
        Ok(array)
    }
}

impl ReadCql<'_> for Uuid {
    fn read_cql(buf: &mut &'_ [u8]) -> io::Result<Self> {
        ReadCql::read_cql(buf).map(Uuid::from_bytes)
    }
}

/// `[bytes]`: `[int]` length followed by the bytes, negative length meaning null.
impl WriteCql for &[u8] {
    fn cql_size(&self) -> Result<usize, ValueTooLarge> {
        check_size::<i32>(self.len())?;
        Ok(mem::size_of::<i32>() + self.len())
    }

    fn write_cql(&self, buf: &mut &mut [u8]) {
        (self.len() as i32).write_cql(buf);
        buf.put_slice(self);
    }
}

impl<'a> ReadCql<'a> for Option<&'a [u8]> {
    fn read_cql(buf: &mut &'a [u8]) -> io::Result<Self> {
        match i32::read_cql(buf)? {
            len if len < 0 => Ok(None),
            len => read_and_advance(buf, len as usize).map(Some),
        }
    }
}

impl<'a> ReadCql<'a> for &'a [u8] {
    fn read_cql(buf: &mut &'a [u8]) -> io::Result<Self> {
        Option::<&[u8]>::read_cql(buf)?
            .ok_or("Unexpected null bytes")
            .map_err(invalid_data)
    }
}

/// `[short bytes]`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ShortBytes<'a>(pub &'a [u8]);

impl WriteCql for ShortBytes<'_> {
    fn cql_size(&self) -> Result<usize, ValueTooLarge> {
        check_size::<u16>(self.0.len())?;
        Ok(mem::size_of::<u16>() + self.0.len())
    }

    fn write_cql(&self, buf: &mut &mut [u8]) {
        (self.0.len() as u16).write_cql(buf);
        buf.put_slice(self.0);
    }
}

impl<'a> ReadCql<'a> for ShortBytes<'a> {
    fn read_cql(buf: &mut &'a [u8]) -> io::Result<Self> {
        let len = u16::read_cql(buf)?;
        read_and_advance(buf, len.into()).map(ShortBytes)
    }
}

/// `[string]`.
impl WriteCql for &str {
    fn cql_size(&self) -> Result<usize, ValueTooLarge> {
        ShortBytes(self.as_bytes()).cql_size()
    }

    fn write_cql(&self, buf: &mut &mut [u8]) {
        ShortBytes(self.as_bytes()).write_cql(buf);
    }
}

impl<'a> ReadCql<'a> for &'a str {
    fn read_cql(buf: &mut &'a [u8]) -> io::Result<Self> {
        str::from_utf8(ShortBytes::read_cql(buf)?.0).map_err(invalid_data)
    }
}

impl ReadCql<'_> for String {
    fn read_cql(buf: &mut &'_ [u8]) -> io::Result<Self> {
        <&str>::read_cql(buf).map(Into::into)
    }
}

/// `[long string]`, used for query text.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LongString<'a>(pub &'a str);

impl WriteCql for LongString<'_> {
    fn cql_size(&self) -> Result<usize, ValueTooLarge> {
        self.0.as_bytes().cql_size()
    }

    fn write_cql(&self, buf: &mut &mut [u8]) {
        self.0.as_bytes().write_cql(buf);
    }
}

impl WriteCql for Consistency {
    fn cql_size(&self) -> Result<usize, ValueTooLarge> {
        Ok(mem::size_of::<u16>())
    }

    fn write_cql(&self, buf: &mut &mut [u8]) {
        (*self as u16).write_cql(buf);
    }
}

impl WriteCql for SerialConsistency {
    fn cql_size(&self) -> Result<usize, ValueTooLarge> {
        Ok(mem::size_of::<u16>())
    }

    fn write_cql(&self, buf: &mut &mut [u8]) {
        (*self as u16).write_cql(buf);
    }
}

impl ReadCql<'_> for LegacyConsistency {
    fn read_cql(buf: &mut &'_ [u8]) -> io::Result<Self> {
        let c = u16::read_cql(buf)?;
        Consistency::from_repr(c)
            .map(Self::Regular)
            .or_else(|| SerialConsistency::from_repr(c).map(Self::Serial))
            .ok_or("Invalid consistency")
            .map_err(invalid_data)
    }
}

fn read_collection<'a, T>(
    buf: &mut &'a [u8],
    mut read_elem: impl FnMut(&mut &'a [u8]) -> io::Result<T>,
) -> io::Result<Vec<T>> {
    let len = u16::read_cql(buf)? as usize;
    // the declared length is untrusted, do not preallocate more than the buffer can hold
    let mut vec = Vec::with_capacity(len.min(buf.len()));
    for _ in 0..len {
        vec.push(read_elem(buf)?);
    }
    Ok(vec)
}

/// `[string list]`.
impl ReadCql<'_> for Vec<String> {
    fn read_cql(buf: &mut &'_ [u8]) -> io::Result<Self> {
        read_collection(buf, String::read_cql)
    }
}

/// `[string map]`.
impl WriteCql for HashMap<String, String> {
    fn cql_size(&self) -> Result<usize, ValueTooLarge> {
        check_size::<u16>(self.len())?;
        self.iter().try_fold(mem::size_of::<u16>(), |size, (k, v)| {
            Ok(size + k.as_str().cql_size()? + v.as_str().cql_size()?)
        })
    }

    fn write_cql(&self, buf: &mut &mut [u8]) {
        (self.len() as u16).write_cql(buf);
        for (k, v) in self {
            k.as_str().write_cql(buf);
            v.as_str().write_cql(buf);
        }
    }
}

impl ReadCql<'_> for HashMap<String, String> {
    fn read_cql(buf: &mut &'_ [u8]) -> io::Result<Self> {
        let entries = read_collection(buf, |buf| Ok((String::read_cql(buf)?, String::read_cql(buf)?)))?;
        Ok(entries.into_iter().collect())
    }
}

/// `[string multimap]`.
impl ReadCql<'_> for HashMap<String, Vec<String>> {
    fn read_cql(buf: &mut &'_ [u8]) -> io::Result<Self> {
        let entries = read_collection(buf, |buf| {
            Ok((String::read_cql(buf)?, Vec::<String>::read_cql(buf)?))
        })?;
        Ok(entries.into_iter().collect())
    }
}

/// `[bytes map]`, used for custom payloads.
impl ReadCql<'_> for HashMap<String, Vec<u8>> {
    fn read_cql(buf: &mut &'_ [u8]) -> io::Result<Self> {
        let entries = read_collection(buf, |buf| {
            Ok((String::read_cql(buf)?, <&[u8]>::read_cql(buf)?.to_vec()))
        })?;
        Ok(entries.into_iter().collect())
    }
}

impl<T> WriteCql for BitFlags<T>
where
    T: BitFlag,
    T::Numeric: WriteCql,
{
    fn cql_size(&self) -> Result<usize, ValueTooLarge> {
        self.bits().cql_size()
    }

    fn write_cql(&self, buf: &mut &mut [u8]) {
        self.bits().write_cql(buf);
    }
}

impl<'a, T> ReadCql<'a> for BitFlags<T>
where
    T: BitFlag + fmt::Debug + Send + Sync,
    T::Numeric: ReadCql<'a> + fmt::Debug + Send + Sync,
{
    fn read_cql(buf: &mut &'a [u8]) -> io::Result<Self> {
        BitFlags::from_bits(T::Numeric::read_cql(buf)?).map_err(invalid_data)
    }
}
