//! Codec dispatch table, keyed by [`TypeCode`].
//!
//! The table is filled once and only read afterwards; [`registry`] returns the
//! process-wide standard instance.
use std::fmt;

use once_cell::sync::Lazy;

use crate::{
    codec::{collection, native},
    cql_type::{CqlType, TypeCode},
    error::{EncodeError, RegistryError, ValueDecodeError},
    value::CqlValue,
};

/// Encodes a value without any length prefix.
pub type EncodeFn =
    fn(&Registry, &CqlValue, Option<&CqlType>, &mut Vec<u8>) -> Result<(), EncodeError>;
/// Decodes the bytes of a non-null value.
pub type DecodeFn = fn(&Registry, Option<&CqlType>, &[u8]) -> Result<CqlValue, ValueDecodeError>;

#[derive(Clone, Copy)]
pub struct Codec {
    pub encode: EncodeFn,
    pub decode: DecodeFn,
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec").finish_non_exhaustive()
    }
}

impl Codec {
    pub const fn new(encode: EncodeFn, decode: DecodeFn) -> Self {
        Self { encode, decode }
    }
}

pub struct Registry {
    codecs: [Option<Codec>; TypeCode::ALL.len()],
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered = TypeCode::ALL
            .iter()
            .filter(|code| self.codecs[**code as usize].is_some());
        f.debug_set().entries(registered).finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::standard);

/// The standard registry, built on first use.
pub fn registry() -> &'static Registry {
    &REGISTRY
}

impl Registry {
    pub fn empty() -> Self {
        Self {
            codecs: [None; TypeCode::ALL.len()],
        }
    }

    /// Every native type plus collections, tuples, UDTs and vectors.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        let natives: [(TypeCode, Codec); 21] = [
            (TypeCode::Ascii, Codec::new(native::encode_ascii, native::decode_ascii)),
            (TypeCode::BigInt, Codec::new(native::encode_bigint, native::decode_bigint)),
            (TypeCode::Blob, Codec::new(native::encode_blob, native::decode_blob)),
            (TypeCode::Boolean, Codec::new(native::encode_boolean, native::decode_boolean)),
            (TypeCode::Counter, Codec::new(native::encode_bigint, native::decode_counter)),
            (TypeCode::Decimal, Codec::new(native::encode_decimal, native::decode_decimal)),
            (TypeCode::Double, Codec::new(native::encode_double, native::decode_double)),
            (TypeCode::Float, Codec::new(native::encode_float, native::decode_float)),
            (TypeCode::Int, Codec::new(native::encode_int, native::decode_int)),
            (TypeCode::Varchar, Codec::new(native::encode_text, native::decode_text)),
            (TypeCode::Timestamp, Codec::new(native::encode_timestamp, native::decode_timestamp)),
            (TypeCode::Uuid, Codec::new(native::encode_uuid, native::decode_uuid)),
            (TypeCode::Text, Codec::new(native::encode_text, native::decode_text)),
            (TypeCode::Varint, Codec::new(native::encode_varint, native::decode_varint)),
            (TypeCode::Timeuuid, Codec::new(native::encode_uuid, native::decode_timeuuid)),
            (TypeCode::Inet, Codec::new(native::encode_inet, native::decode_inet)),
            (TypeCode::Date, Codec::new(native::encode_date, native::decode_date)),
            (TypeCode::Time, Codec::new(native::encode_time, native::decode_time)),
            (TypeCode::SmallInt, Codec::new(native::encode_smallint, native::decode_smallint)),
            (TypeCode::TinyInt, Codec::new(native::encode_tinyint, native::decode_tinyint)),
            (TypeCode::Duration, Codec::new(native::encode_duration, native::decode_duration)),
        ];
        for (code, codec) in natives {
            registry.register(code, codec);
        }
        registry.register(
            TypeCode::List,
            Codec::new(collection::encode_list, collection::decode_list),
        );
        registry.register(
            TypeCode::Set,
            Codec::new(collection::encode_set, collection::decode_set),
        );
        registry.register(
            TypeCode::Map,
            Codec::new(collection::encode_map, collection::decode_map),
        );
        registry.register(
            TypeCode::Tuple,
            Codec::new(collection::encode_tuple, collection::decode_tuple),
        );
        registry.register(
            TypeCode::Udt,
            Codec::new(collection::encode_udt, collection::decode_udt),
        );
        registry.register(
            TypeCode::Vector,
            Codec::new(collection::encode_vector, collection::decode_vector),
        );
        registry
    }

    /// Registers a codec, replacing the previous one for this code.
    pub fn register(&mut self, code: TypeCode, codec: Codec) -> &mut Self {
        self.codecs[code as usize] = Some(codec);
        self
    }

    fn codec(&self, code: TypeCode, descriptor: Option<&CqlType>) -> Result<Codec, RegistryError> {
        self.codecs[code as usize].ok_or_else(|| {
            RegistryError::UnsupportedType(match descriptor {
                Some(tp) => tp.to_string(),
                None => format!("{code:?}"),
            })
        })
    }

    pub fn encoder_for(&self, code: TypeCode) -> Result<Encoder<'_>, RegistryError> {
        Ok(Encoder {
            registry: self,
            code,
            encode: self.codec(code, None)?.encode,
        })
    }

    /// Parametric codes need their descriptor to know the element types.
    pub fn decoder_for<'a>(
        &'a self,
        code: TypeCode,
        descriptor: Option<&'a CqlType>,
    ) -> Result<Decoder<'a>, RegistryError> {
        let decode = self.codec(code, descriptor)?.decode;
        if code.is_parametric() && descriptor.is_none() {
            return Err(RegistryError::MissingTypeDescriptor(code));
        }
        Ok(Decoder {
            registry: self,
            descriptor,
            decode,
        })
    }

    pub fn decode(&self, tp: &CqlType, bytes: &[u8]) -> Result<CqlValue, ValueDecodeError> {
        self.decoder_for(tp.type_code(), Some(tp))?.decode(bytes)
    }

    /// Encodes with the codec of `tp`, or the value's own type when unknown.
    pub fn encode(
        &self,
        value: &CqlValue,
        tp: Option<&CqlType>,
        buf: &mut Vec<u8>,
    ) -> Result<(), EncodeError> {
        let code = tp.map_or_else(|| value.type_code(), CqlType::type_code);
        (self.codec(code, tp)?.encode)(self, value, tp, buf)
    }
}

#[derive(Clone, Copy)]
pub struct Encoder<'a> {
    registry: &'a Registry,
    code: TypeCode,
    encode: EncodeFn,
}

impl fmt::Debug for Encoder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoder").field("code", &self.code).finish()
    }
}

impl Encoder<'_> {
    pub fn type_code(&self) -> TypeCode {
        self.code
    }

    pub fn encode(&self, value: &CqlValue, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
        (self.encode)(self.registry, value, None, buf)
    }

    /// Encodes against a descriptor, checking element types and counts.
    pub fn encode_typed(
        &self,
        value: &CqlValue,
        tp: &CqlType,
        buf: &mut Vec<u8>,
    ) -> Result<(), EncodeError> {
        (self.encode)(self.registry, value, Some(tp), buf)
    }
}

#[derive(Clone, Copy)]
pub struct Decoder<'a> {
    registry: &'a Registry,
    descriptor: Option<&'a CqlType>,
    decode: DecodeFn,
}

impl fmt::Debug for Decoder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

impl Decoder<'_> {
    pub fn decode(&self, bytes: &[u8]) -> Result<CqlValue, ValueDecodeError> {
        (self.decode)(self.registry, self.descriptor, bytes)
    }
}
