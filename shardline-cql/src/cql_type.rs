//! CQL type codes and the recursive type descriptors found in column metadata.
use std::{fmt, io};

use crate::{cql::ReadCql, error::MalformedSchema, utils::join_display};

/// Wire type tags, as found in `[option]` type descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[non_exhaustive]
pub enum TypeCode {
    Custom,
    Ascii,
    BigInt,
    Blob,
    Boolean,
    Counter,
    Decimal,
    Double,
    Float,
    Int,
    /// Legacy alias of `Text`, never produced by CQL 3 nodes.
    Varchar,
    Timestamp,
    Uuid,
    Text,
    Varint,
    Timeuuid,
    Inet,
    Date,
    Time,
    SmallInt,
    TinyInt,
    Duration,
    List,
    Map,
    Set,
    Udt,
    Tuple,
    /// Vectors travel as `Custom` on the wire in protocol v4, this code only names
    /// the parsed descriptor.
    Vector,
}

impl TypeCode {
    /// Whether a zero-length value is a valid encoding of this type.
    pub fn has_empty_encoding(self) -> bool {
        matches!(
            self,
            Self::Custom | Self::Ascii | Self::Blob | Self::Varchar | Self::Text
        )
    }

    pub const ALL: [TypeCode; 28] = [
        TypeCode::Custom,
        TypeCode::Ascii,
        TypeCode::BigInt,
        TypeCode::Blob,
        TypeCode::Boolean,
        TypeCode::Counter,
        TypeCode::Decimal,
        TypeCode::Double,
        TypeCode::Float,
        TypeCode::Int,
        TypeCode::Varchar,
        TypeCode::Timestamp,
        TypeCode::Uuid,
        TypeCode::Text,
        TypeCode::Varint,
        TypeCode::Timeuuid,
        TypeCode::Inet,
        TypeCode::Date,
        TypeCode::Time,
        TypeCode::SmallInt,
        TypeCode::TinyInt,
        TypeCode::Duration,
        TypeCode::List,
        TypeCode::Map,
        TypeCode::Set,
        TypeCode::Udt,
        TypeCode::Tuple,
        TypeCode::Vector,
    ];

    pub fn from_wire(code: u16) -> Option<Self> {
        Some(match code {
            0x0000 => Self::Custom,
            0x0001 => Self::Ascii,
            0x0002 => Self::BigInt,
            0x0003 => Self::Blob,
            0x0004 => Self::Boolean,
            0x0005 => Self::Counter,
            0x0006 => Self::Decimal,
            0x0007 => Self::Double,
            0x0008 => Self::Float,
            0x0009 => Self::Int,
            0x000A => Self::Varchar,
            0x000B => Self::Timestamp,
            0x000C => Self::Uuid,
            0x000D => Self::Text,
            0x000E => Self::Varint,
            0x000F => Self::Timeuuid,
            0x0010 => Self::Inet,
            0x0011 => Self::Date,
            0x0012 => Self::Time,
            0x0013 => Self::SmallInt,
            0x0014 => Self::TinyInt,
            0x0015 => Self::Duration,
            0x0020 => Self::List,
            0x0021 => Self::Map,
            0x0022 => Self::Set,
            0x0030 => Self::Udt,
            0x0031 => Self::Tuple,
            _ => return None,
        })
    }

    pub fn wire_code(self) -> u16 {
        match self {
            Self::Custom | Self::Vector => 0x0000,
            Self::Ascii => 0x0001,
            Self::BigInt => 0x0002,
            Self::Blob => 0x0003,
            Self::Boolean => 0x0004,
            Self::Counter => 0x0005,
            Self::Decimal => 0x0006,
            Self::Double => 0x0007,
            Self::Float => 0x0008,
            Self::Int => 0x0009,
            Self::Varchar => 0x000A,
            Self::Timestamp => 0x000B,
            Self::Uuid => 0x000C,
            Self::Text => 0x000D,
            Self::Varint => 0x000E,
            Self::Timeuuid => 0x000F,
            Self::Inet => 0x0010,
            Self::Date => 0x0011,
            Self::Time => 0x0012,
            Self::SmallInt => 0x0013,
            Self::TinyInt => 0x0014,
            Self::Duration => 0x0015,
            Self::List => 0x0020,
            Self::Map => 0x0021,
            Self::Set => 0x0022,
            Self::Udt => 0x0030,
            Self::Tuple => 0x0031,
        }
    }

    /// Parametric codes own child descriptors.
    pub fn is_parametric(self) -> bool {
        matches!(
            self,
            Self::Custom
                | Self::List
                | Self::Map
                | Self::Set
                | Self::Udt
                | Self::Tuple
                | Self::Vector
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CqlType {
    Custom(String),
    Ascii,
    BigInt,
    Blob,
    Boolean,
    Counter,
    Decimal,
    Double,
    Duration,
    Float,
    Int,
    Timestamp,
    Uuid,
    Text,
    Varint,
    Timeuuid,
    Tuple(Vec<CqlType>),
    Inet,
    Date,
    Time,
    SmallInt,
    TinyInt,
    List(Box<CqlType>),
    Map(Box<CqlType>, Box<CqlType>),
    Set(Box<CqlType>),
    Udt {
        keyspace: String,
        type_name: String,
        fields: Vec<(String, CqlType)>,
    },
    Vector {
        element: Box<CqlType>,
        dimensions: u16,
    },
}

impl CqlType {
    /// Parses a type with [`TypeParser::default`].
    pub fn deserialize(buf: &mut &[u8]) -> Result<CqlType, MalformedSchema> {
        TypeParser::default().parse(buf)
    }

    pub fn type_code(&self) -> TypeCode {
        match self {
            Self::Custom(_) => TypeCode::Custom,
            Self::Ascii => TypeCode::Ascii,
            Self::BigInt => TypeCode::BigInt,
            Self::Blob => TypeCode::Blob,
            Self::Boolean => TypeCode::Boolean,
            Self::Counter => TypeCode::Counter,
            Self::Decimal => TypeCode::Decimal,
            Self::Double => TypeCode::Double,
            Self::Duration => TypeCode::Duration,
            Self::Float => TypeCode::Float,
            Self::Int => TypeCode::Int,
            Self::Timestamp => TypeCode::Timestamp,
            Self::Uuid => TypeCode::Uuid,
            Self::Text => TypeCode::Text,
            Self::Varint => TypeCode::Varint,
            Self::Timeuuid => TypeCode::Timeuuid,
            Self::Tuple(_) => TypeCode::Tuple,
            Self::Inet => TypeCode::Inet,
            Self::Date => TypeCode::Date,
            Self::Time => TypeCode::Time,
            Self::SmallInt => TypeCode::SmallInt,
            Self::TinyInt => TypeCode::TinyInt,
            Self::List(_) => TypeCode::List,
            Self::Map(..) => TypeCode::Map,
            Self::Set(_) => TypeCode::Set,
            Self::Udt { .. } => TypeCode::Udt,
            Self::Vector { .. } => TypeCode::Vector,
        }
    }

    /// Descriptor of a non-parametric code, `None` for parametric ones.
    pub fn native(code: TypeCode) -> Option<Self> {
        Some(match code {
            TypeCode::Ascii => Self::Ascii,
            TypeCode::BigInt => Self::BigInt,
            TypeCode::Blob => Self::Blob,
            TypeCode::Boolean => Self::Boolean,
            TypeCode::Counter => Self::Counter,
            TypeCode::Decimal => Self::Decimal,
            TypeCode::Double => Self::Double,
            TypeCode::Duration => Self::Duration,
            TypeCode::Float => Self::Float,
            TypeCode::Int => Self::Int,
            TypeCode::Timestamp => Self::Timestamp,
            TypeCode::Uuid => Self::Uuid,
            TypeCode::Text | TypeCode::Varchar => Self::Text,
            TypeCode::Varint => Self::Varint,
            TypeCode::Timeuuid => Self::Timeuuid,
            TypeCode::Inet => Self::Inet,
            TypeCode::Date => Self::Date,
            TypeCode::Time => Self::Time,
            TypeCode::SmallInt => Self::SmallInt,
            TypeCode::TinyInt => Self::TinyInt,
            _ => return None,
        })
    }

    /// Element type of a list, a set or a vector.
    pub fn element(&self) -> Option<&CqlType> {
        match self {
            Self::List(elem) | Self::Set(elem) | Self::Vector { element: elem, .. } => Some(elem),
            _ => None,
        }
    }

    pub fn map_types(&self) -> Option<(&CqlType, &CqlType)> {
        match self {
            Self::Map(key, value) => Some((key, value)),
            _ => None,
        }
    }

    pub fn tuple_element(&self, index: usize) -> Option<&CqlType> {
        match self {
            Self::Tuple(types) => types.get(index),
            _ => None,
        }
    }

    pub fn udt_field(&self, index: usize) -> Option<(&str, &CqlType)> {
        match self {
            Self::Udt { fields, .. } => fields.get(index).map(|(name, tp)| (name.as_str(), tp)),
            _ => None,
        }
    }

    /// Number of direct children in the descriptor tree.
    pub fn child_count(&self) -> usize {
        match self {
            Self::List(_) | Self::Set(_) | Self::Vector { .. } => 1,
            Self::Map(..) => 2,
            Self::Tuple(types) => types.len(),
            Self::Udt { fields, .. } => fields.len(),
            _ => 0,
        }
    }

    /// Encoded size of every value of this type, if fixed.
    pub fn fixed_size(&self) -> Option<usize> {
        Some(match self {
            Self::Boolean | Self::TinyInt => 1,
            Self::SmallInt => 2,
            Self::Int | Self::Float | Self::Date => 4,
            Self::BigInt | Self::Counter | Self::Double | Self::Time | Self::Timestamp => 8,
            Self::Uuid | Self::Timeuuid => 16,
            Self::Vector {
                element,
                dimensions,
            } => element.fixed_size()? * *dimensions as usize,
            _ => return None,
        })
    }
}

/// Source of type descriptions, consumed one node at a time by [`TypeParser`].
pub trait TypeSource {
    fn type_code(&mut self) -> io::Result<u16>;
    fn string(&mut self) -> io::Result<String>;
    fn count(&mut self) -> io::Result<u16>;
}

impl TypeSource for &[u8] {
    fn type_code(&mut self) -> io::Result<u16> {
        u16::read_cql(self)
    }

    fn string(&mut self) -> io::Result<String> {
        String::read_cql(self)
    }

    fn count(&mut self) -> io::Result<u16> {
        u16::read_cql(self)
    }
}

/// Recursive descent parser of type descriptors, bounded in depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeParser {
    max_depth: usize,
}

impl Default for TypeParser {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_DEPTH)
    }
}

impl TypeParser {
    pub const DEFAULT_MAX_DEPTH: usize = 64;

    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn parse(&self, source: &mut impl TypeSource) -> Result<CqlType, MalformedSchema> {
        self.parse_nested(source, 0)
    }

    fn check_depth(&self, depth: usize) -> Result<(), MalformedSchema> {
        if depth > self.max_depth {
            return Err(MalformedSchema::DepthExceeded(self.max_depth));
        }
        Ok(())
    }

    fn parse_nested(
        &self,
        source: &mut impl TypeSource,
        depth: usize,
    ) -> Result<CqlType, MalformedSchema> {
        self.check_depth(depth)?;
        let raw_code = source.type_code()?;
        let code = TypeCode::from_wire(raw_code).ok_or(MalformedSchema::UnknownTypeCode(raw_code))?;
        let next = depth + 1;
        Ok(match code {
            TypeCode::Custom => self.parse_class(&source.string()?, depth)?,
            TypeCode::List => CqlType::List(Box::new(self.parse_nested(source, next)?)),
            TypeCode::Set => CqlType::Set(Box::new(self.parse_nested(source, next)?)),
            TypeCode::Map => {
                let key = self.parse_nested(source, next)?;
                let value = self.parse_nested(source, next)?;
                CqlType::Map(Box::new(key), Box::new(value))
            }
            TypeCode::Tuple => {
                let count = source.count()?;
                let mut types = Vec::new();
                for _ in 0..count {
                    types.push(self.parse_nested(source, next)?);
                }
                CqlType::Tuple(types)
            }
            TypeCode::Udt => {
                let keyspace = source.string()?;
                let type_name = source.string()?;
                let count = source.count()?;
                let mut fields = Vec::new();
                for _ in 0..count {
                    let name = source.string()?;
                    fields.push((name, self.parse_nested(source, next)?));
                }
                CqlType::Udt {
                    keyspace,
                    type_name,
                    fields,
                }
            }
            native => CqlType::native(native).ok_or(MalformedSchema::UnknownTypeCode(raw_code))?,
        })
    }

    /// Parses a marshal class name, as sent for custom types.
    ///
    /// Only the classes needed to describe vectors are structurally parsed, the other ones
    /// are kept as opaque custom types.
    pub fn parse_class(&self, class: &str, depth: usize) -> Result<CqlType, MalformedSchema> {
        self.check_depth(depth)?;
        let invalid = || MalformedSchema::InvalidCustomType(class.into());
        let name = class.trim();
        let name = name.strip_prefix(MARSHAL_PREFIX).unwrap_or(name);
        let Some((outer, params)) = name.split_once('(') else {
            return Ok(native_class(name).unwrap_or_else(|| CqlType::Custom(class.into())));
        };
        let params = params.strip_suffix(')').ok_or_else(invalid)?;
        let params = split_top_level(params);
        let nested = |param: &str| self.parse_class(param, depth + 1).map(Box::new);
        Ok(match (outer, params.as_slice()) {
            ("VectorType", [element, dimensions]) => CqlType::Vector {
                element: nested(*element)?,
                dimensions: dimensions.trim().parse().map_err(|_| invalid())?,
            },
            ("VectorType", _) => return Err(invalid()),
            ("ListType", [element]) => CqlType::List(nested(*element)?),
            ("SetType", [element]) => CqlType::Set(nested(*element)?),
            ("MapType", [key, value]) => CqlType::Map(nested(*key)?, nested(*value)?),
            ("FrozenType", [inner]) => *nested(*inner)?,
            _ => CqlType::Custom(class.into()),
        })
    }
}

const MARSHAL_PREFIX: &str = "org.apache.cassandra.db.marshal.";

fn native_class(name: &str) -> Option<CqlType> {
    Some(match name {
        "AsciiType" => CqlType::Ascii,
        "BooleanType" => CqlType::Boolean,
        "BytesType" => CqlType::Blob,
        "CounterColumnType" => CqlType::Counter,
        "DecimalType" => CqlType::Decimal,
        "DoubleType" => CqlType::Double,
        "DurationType" => CqlType::Duration,
        "FloatType" => CqlType::Float,
        "InetAddressType" => CqlType::Inet,
        "Int32Type" => CqlType::Int,
        "IntegerType" => CqlType::Varint,
        "LongType" => CqlType::BigInt,
        "SimpleDateType" => CqlType::Date,
        "ShortType" => CqlType::SmallInt,
        "ByteType" => CqlType::TinyInt,
        "UTF8Type" => CqlType::Text,
        "UUIDType" => CqlType::Uuid,
        "TimeUUIDType" => CqlType::Timeuuid,
        "TimeType" => CqlType::Time,
        "TimestampType" | "DateType" => CqlType::Timestamp,
        _ => return None,
    })
}

fn split_top_level(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let (mut depth, mut start) = (0usize, 0);
    for (i, c) in params.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(params[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(params[start..].trim());
    parts
}

impl fmt::Display for CqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(custom) => write!(f, "'{custom}'"),
            Self::Ascii => write!(f, "ascii"),
            Self::BigInt => write!(f, "bigint"),
            Self::Blob => write!(f, "blob"),
            Self::Boolean => write!(f, "boolean"),
            Self::Counter => write!(f, "counter"),
            Self::Decimal => write!(f, "decimal"),
            Self::Double => write!(f, "double"),
            Self::Duration => write!(f, "duration"),
            Self::Float => write!(f, "float"),
            Self::Int => write!(f, "int"),
            Self::Timestamp => write!(f, "timestamp"),
            Self::Uuid => write!(f, "uuid"),
            Self::Text => write!(f, "text"),
            Self::Varint => write!(f, "varint"),
            Self::Timeuuid => write!(f, "timeuuid"),
            Self::Tuple(types) => write!(f, "tuple<{}>", join_display(types)),
            Self::Inet => write!(f, "inet"),
            Self::Date => write!(f, "date"),
            Self::Time => write!(f, "time"),
            Self::SmallInt => write!(f, "smallint"),
            Self::TinyInt => write!(f, "tinyint"),
            Self::List(tp) => write!(f, "list<{tp}>"),
            Self::Map(key, value) => write!(f, "map<{key}, {value}>"),
            Self::Set(tp) => write!(f, "set<{tp}>"),
            Self::Udt {
                keyspace,
                type_name,
                ..
            } => write!(f, "{keyspace}.{type_name}"),
            Self::Vector {
                element,
                dimensions,
            } => write!(f, "vector<{element}, {dimensions}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(code: u16) -> Vec<u8> {
        code.to_be_bytes().to_vec()
    }

    fn string(s: &str) -> Vec<u8> {
        let mut bytes = (s.len() as u16).to_be_bytes().to_vec();
        bytes.extend_from_slice(s.as_bytes());
        bytes
    }

    #[test]
    fn parse_map_of_list() {
        let bytes = [option(0x21), option(0x0D), option(0x20), option(0x09)].concat();
        let tp = CqlType::deserialize(&mut &bytes[..]).unwrap();
        assert_eq!(
            tp,
            CqlType::Map(
                Box::new(CqlType::Text),
                Box::new(CqlType::List(Box::new(CqlType::Int)))
            )
        );
        assert_eq!(tp.to_string(), "map<text, list<int>>");
        assert_eq!(tp.map_types().unwrap().1.element(), Some(&CqlType::Int));
    }

    #[test]
    fn parse_udt_keeps_field_order() {
        let bytes = [
            option(0x30),
            string("ks"),
            string("address"),
            2u16.to_be_bytes().to_vec(),
            string("street"),
            option(0x0D),
            string("zip"),
            option(0x09),
        ]
        .concat();
        let tp = CqlType::deserialize(&mut &bytes[..]).unwrap();
        assert_eq!(tp.child_count(), 2);
        assert_eq!(tp.udt_field(0), Some(("street", &CqlType::Text)));
        assert_eq!(tp.udt_field(1), Some(("zip", &CqlType::Int)));
        assert_eq!(tp.udt_field(2), None);
    }

    #[test]
    fn varchar_is_text() {
        let bytes = option(0x0A);
        assert_eq!(CqlType::deserialize(&mut &bytes[..]).unwrap(), CqlType::Text);
    }

    #[test]
    fn deep_tuple_nesting_is_rejected() {
        let mut bytes = Vec::new();
        for _ in 0..1000 {
            bytes.extend([option(0x31), 1u16.to_be_bytes().to_vec()].concat());
        }
        bytes.extend(option(0x09));
        let err = CqlType::deserialize(&mut &bytes[..]).unwrap_err();
        assert!(matches!(
            err,
            MalformedSchema::DepthExceeded(TypeParser::DEFAULT_MAX_DEPTH)
        ));
    }

    #[test]
    fn nesting_up_to_the_limit_is_accepted() {
        let parser = TypeParser::new(3);
        let bytes = [option(0x20), option(0x20), option(0x20), option(0x09)].concat();
        assert!(parser.parse(&mut &bytes[..]).is_ok());
        let bytes = [option(0x20), option(0x20), option(0x20), option(0x20), option(0x09)].concat();
        assert!(matches!(
            parser.parse(&mut &bytes[..]),
            Err(MalformedSchema::DepthExceeded(3))
        ));
    }

    #[test]
    fn truncated_tuple_is_malformed() {
        let bytes = [option(0x31), 3u16.to_be_bytes().to_vec(), option(0x09)].concat();
        assert!(matches!(
            CqlType::deserialize(&mut &bytes[..]),
            Err(MalformedSchema::Truncated(_))
        ));
    }

    #[test]
    fn unknown_code_is_malformed() {
        let bytes = option(0x00FF);
        assert!(matches!(
            CqlType::deserialize(&mut &bytes[..]),
            Err(MalformedSchema::UnknownTypeCode(0x00FF))
        ));
    }

    #[test]
    fn vector_custom_class() {
        let class = "org.apache.cassandra.db.marshal.VectorType(org.apache.cassandra.db.marshal.FloatType, 3)";
        let bytes = [option(0x00), string(class)].concat();
        let tp = CqlType::deserialize(&mut &bytes[..]).unwrap();
        assert_eq!(
            tp,
            CqlType::Vector {
                element: Box::new(CqlType::Float),
                dimensions: 3
            }
        );
        assert_eq!(tp.type_code(), TypeCode::Vector);
        assert_eq!(tp.fixed_size(), Some(12));
    }

    #[test]
    fn vector_of_lists() {
        let parser = TypeParser::default();
        let tp = parser
            .parse_class(
                "org.apache.cassandra.db.marshal.VectorType(org.apache.cassandra.db.marshal.ListType(org.apache.cassandra.db.marshal.Int32Type), 2)",
                0,
            )
            .unwrap();
        assert_eq!(tp.element(), Some(&CqlType::List(Box::new(CqlType::Int))));
        assert_eq!(tp.fixed_size(), None);
    }

    #[test]
    fn invalid_vector_dimension() {
        let parser = TypeParser::default();
        assert!(matches!(
            parser.parse_class("VectorType(Int32Type, many)", 0),
            Err(MalformedSchema::InvalidCustomType(_))
        ));
    }

    #[test]
    fn unknown_custom_class_is_opaque() {
        let parser = TypeParser::default();
        assert_eq!(
            parser.parse_class("com.example.PointType", 0).unwrap(),
            CqlType::Custom("com.example.PointType".into())
        );
    }

    #[test]
    fn wire_codes_round_trip() {
        for code in TypeCode::ALL {
            if code != TypeCode::Vector {
                assert_eq!(TypeCode::from_wire(code.wire_code()), Some(code));
            }
        }
    }
}
