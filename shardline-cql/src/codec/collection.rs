//! Collections, tuples, UDTs and vectors.
//!
//! Lists, sets and maps are an `[int]` element count followed by `[bytes]` elements,
//! where null is forbidden. Tuples and UDTs are their `[bytes]` fields, which may be null.
//! Vectors have no count, their elements being either raw fixed-size values or
//! unsigned vint prefixed ones.
use crate::{
    codec::{
        ensure_consumed, native::mismatch, read_bytes_value, read_unsigned_vint,
        write_bytes_value, write_unsigned_vint,
    },
    cql::{check_size, read_and_advance, ReadCql},
    cql_type::{CqlType, TypeCode},
    error::{EncodeError, RegistryError, ValueDecodeError},
    registry::Registry,
    utils::invalid_data,
    value::CqlValue,
};

fn descriptor<'a, T>(
    tp: Option<&'a CqlType>,
    code: TypeCode,
    get: impl FnOnce(&'a CqlType) -> Option<T>,
) -> Result<T, ValueDecodeError> {
    Ok(tp
        .and_then(get)
        .ok_or(RegistryError::MissingTypeDescriptor(code))?)
}

fn write_count(count: usize, buf: &mut Vec<u8>) -> Result<(), EncodeError> {
    let count: i32 = check_size(count)?;
    buf.extend_from_slice(&count.to_be_bytes());
    Ok(())
}

fn read_count(buf: &mut &[u8]) -> Result<usize, ValueDecodeError> {
    let count = i32::read_cql(buf)?;
    Ok(usize::try_from(count).map_err(|_| invalid_data(format!("Negative count {count}")))?)
}

fn read_element<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8], ValueDecodeError> {
    read_bytes_value(buf)?.ok_or(ValueDecodeError::NullInCollection)
}

fn encode_elements(
    registry: &Registry,
    elems: &[CqlValue],
    elem_type: Option<&CqlType>,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    write_count(elems.len(), buf)?;
    for elem in elems {
        write_bytes_value(registry, Some(elem), elem_type, buf)?;
    }
    Ok(())
}

fn decode_elements(
    registry: &Registry,
    elem_type: &CqlType,
    mut bytes: &[u8],
) -> Result<Vec<CqlValue>, ValueDecodeError> {
    let count = read_count(&mut bytes)?;
    // a count can be forged, each element is at least 4 bytes
    let mut elems = Vec::with_capacity(count.min(bytes.len() / 4));
    for _ in 0..count {
        elems.push(registry.decode(elem_type, read_element(&mut bytes)?)?);
    }
    ensure_consumed(bytes, "collection")?;
    Ok(elems)
}

pub fn encode_list(
    registry: &Registry,
    value: &CqlValue,
    tp: Option<&CqlType>,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match value {
        CqlValue::List(elems) | CqlValue::Set(elems) => {
            encode_elements(registry, elems, tp.and_then(CqlType::element), buf)
        }
        other => Err(mismatch(TypeCode::List, other)),
    }
}

pub fn decode_list(
    registry: &Registry,
    tp: Option<&CqlType>,
    bytes: &[u8],
) -> Result<CqlValue, ValueDecodeError> {
    let elem_type = descriptor(tp, TypeCode::List, CqlType::element)?;
    Ok(CqlValue::List(decode_elements(registry, elem_type, bytes)?))
}

pub fn encode_set(
    registry: &Registry,
    value: &CqlValue,
    tp: Option<&CqlType>,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match value {
        CqlValue::Set(elems) | CqlValue::List(elems) => {
            encode_elements(registry, elems, tp.and_then(CqlType::element), buf)
        }
        other => Err(mismatch(TypeCode::Set, other)),
    }
}

pub fn decode_set(
    registry: &Registry,
    tp: Option<&CqlType>,
    bytes: &[u8],
) -> Result<CqlValue, ValueDecodeError> {
    let elem_type = descriptor(tp, TypeCode::Set, CqlType::element)?;
    Ok(CqlValue::Set(decode_elements(registry, elem_type, bytes)?))
}

pub fn encode_map(
    registry: &Registry,
    value: &CqlValue,
    tp: Option<&CqlType>,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    let CqlValue::Map(entries) = value else {
        return Err(mismatch(TypeCode::Map, value));
    };
    let (key_type, value_type) = tp.and_then(CqlType::map_types).unzip();
    write_count(entries.len(), buf)?;
    for (k, v) in entries {
        write_bytes_value(registry, Some(k), key_type, buf)?;
        write_bytes_value(registry, Some(v), value_type, buf)?;
    }
    Ok(())
}

pub fn decode_map(
    registry: &Registry,
    tp: Option<&CqlType>,
    mut bytes: &[u8],
) -> Result<CqlValue, ValueDecodeError> {
    let (key_type, value_type) = descriptor(tp, TypeCode::Map, CqlType::map_types)?;
    let count = read_count(&mut bytes)?;
    let mut entries = Vec::with_capacity(count.min(bytes.len() / 8));
    for _ in 0..count {
        let key = registry.decode(key_type, read_element(&mut bytes)?)?;
        let value = registry.decode(value_type, read_element(&mut bytes)?)?;
        entries.push((key, value));
    }
    ensure_consumed(bytes, "map")?;
    Ok(CqlValue::Map(entries))
}

pub fn encode_tuple(
    registry: &Registry,
    value: &CqlValue,
    tp: Option<&CqlType>,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    let CqlValue::Tuple(elems) = value else {
        return Err(mismatch(TypeCode::Tuple, value));
    };
    if let Some(CqlType::Tuple(types)) = tp {
        if types.len() != elems.len() {
            return Err(EncodeError::WrongElementCount {
                expected: types.len(),
                found: elems.len(),
            });
        }
    }
    for (i, elem) in elems.iter().enumerate() {
        let elem_type = tp.and_then(|tp| tp.tuple_element(i));
        write_bytes_value(registry, elem.as_ref(), elem_type, buf)?;
    }
    Ok(())
}

pub fn decode_tuple(
    registry: &Registry,
    tp: Option<&CqlType>,
    mut bytes: &[u8],
) -> Result<CqlValue, ValueDecodeError> {
    let types = descriptor(tp, TypeCode::Tuple, |tp| match tp {
        CqlType::Tuple(types) => Some(types),
        _ => None,
    })?;
    let mut elems = Vec::with_capacity(types.len());
    for elem_type in types {
        let elem = read_bytes_value(&mut bytes)?
            .map(|elem| registry.decode(elem_type, elem))
            .transpose()?;
        elems.push(elem);
    }
    ensure_consumed(bytes, "tuple")?;
    Ok(CqlValue::Tuple(elems))
}

/// With a descriptor, fields are written in declared order, looked up by name; fields
/// absent from the value are null.
pub fn encode_udt(
    registry: &Registry,
    value: &CqlValue,
    tp: Option<&CqlType>,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    let CqlValue::Udt { fields, .. } = value else {
        return Err(mismatch(TypeCode::Udt, value));
    };
    let Some(CqlType::Udt {
        type_name,
        fields: types,
        ..
    }) = tp
    else {
        for (_, field) in fields {
            write_bytes_value(registry, field.as_ref(), None, buf)?;
        }
        return Ok(());
    };
    if let Some((name, _)) = fields
        .iter()
        .find(|(name, _)| !types.iter().any(|(declared, _)| declared == name))
    {
        return Err(EncodeError::UnknownUdtField {
            type_name: type_name.clone(),
            field: name.clone(),
        });
    }
    for (name, field_type) in types {
        let field = fields
            .iter()
            .find(|(field, _)| field == name)
            .and_then(|(_, value)| value.as_ref());
        write_bytes_value(registry, field, Some(field_type), buf)?;
    }
    Ok(())
}

/// Fields missing at the end of the value are null, as UDTs may have been altered
/// after the value was written.
pub fn decode_udt(
    registry: &Registry,
    tp: Option<&CqlType>,
    mut bytes: &[u8],
) -> Result<CqlValue, ValueDecodeError> {
    let (keyspace, type_name, types) = descriptor(tp, TypeCode::Udt, |tp| match tp {
        CqlType::Udt {
            keyspace,
            type_name,
            fields,
        } => Some((keyspace, type_name, fields)),
        _ => None,
    })?;
    let mut fields = Vec::with_capacity(types.len());
    for (name, field_type) in types {
        let field = if bytes.is_empty() {
            None
        } else {
            read_bytes_value(&mut bytes)?
                .map(|field| registry.decode(field_type, field))
                .transpose()?
        };
        fields.push((name.clone(), field));
    }
    ensure_consumed(bytes, "udt")?;
    Ok(CqlValue::Udt {
        keyspace: keyspace.clone(),
        type_name: type_name.clone(),
        fields,
    })
}

pub fn encode_vector(
    registry: &Registry,
    value: &CqlValue,
    tp: Option<&CqlType>,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    let (CqlValue::Vector(elems) | CqlValue::List(elems)) = value else {
        return Err(mismatch(TypeCode::Vector, value));
    };
    let elem_type = match tp {
        Some(CqlType::Vector {
            element,
            dimensions,
        }) => {
            if elems.len() != *dimensions as usize {
                return Err(EncodeError::WrongElementCount {
                    expected: *dimensions as usize,
                    found: elems.len(),
                });
            }
            Some(element.as_ref().clone())
        }
        _ => elems.first().and_then(|elem| CqlType::native(elem.type_code())),
    };
    let fixed_size = elem_type.as_ref().and_then(CqlType::fixed_size);
    let mut elem_buf = Vec::new();
    for elem in elems {
        if let Some(size) = fixed_size {
            let start = buf.len();
            registry.encode(elem, elem_type.as_ref(), buf)?;
            if buf.len() - start != size {
                return Err(mismatch(TypeCode::Vector, elem));
            }
        } else {
            elem_buf.clear();
            registry.encode(elem, elem_type.as_ref(), &mut elem_buf)?;
            write_unsigned_vint(buf, elem_buf.len() as u64);
            buf.extend_from_slice(&elem_buf);
        }
    }
    Ok(())
}

pub fn decode_vector(
    registry: &Registry,
    tp: Option<&CqlType>,
    mut bytes: &[u8],
) -> Result<CqlValue, ValueDecodeError> {
    let (element, dimensions) = descriptor(tp, TypeCode::Vector, |tp| match tp {
        CqlType::Vector {
            element,
            dimensions,
        } => Some((element.as_ref(), *dimensions as usize)),
        _ => None,
    })?;
    let fixed_size = element.fixed_size();
    let mut elems = Vec::with_capacity(dimensions.min(bytes.len()));
    for _ in 0..dimensions {
        let size = match fixed_size {
            Some(size) => size,
            None => usize::try_from(read_unsigned_vint(&mut bytes)?).map_err(invalid_data)?,
        };
        elems.push(registry.decode(element, read_and_advance(&mut bytes, size)?)?);
    }
    ensure_consumed(bytes, "vector")?;
    Ok(CqlValue::Vector(elems))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::registry;

    fn encode(value: &CqlValue, tp: &CqlType) -> Result<Vec<u8>, EncodeError> {
        let mut buf = Vec::new();
        registry().encode(value, Some(tp), &mut buf)?;
        Ok(buf)
    }

    fn list_of_ints() -> CqlType {
        CqlType::List(Box::new(CqlType::Int))
    }

    fn point() -> CqlType {
        CqlType::Udt {
            keyspace: "ks".into(),
            type_name: "point".into(),
            fields: vec![("x".into(), CqlType::Int), ("y".into(), CqlType::Int)],
        }
    }

    #[test]
    fn list_layout() {
        let value = CqlValue::List(vec![CqlValue::Int(1), CqlValue::Int(2), CqlValue::Int(3)]);
        let bytes = encode(&value, &list_of_ints()).unwrap();
        #[rustfmt::skip]
        assert_eq!(
            bytes,
            [
                0, 0, 0, 3,
                0, 0, 0, 4, 0, 0, 0, 1,
                0, 0, 0, 4, 0, 0, 0, 2,
                0, 0, 0, 4, 0, 0, 0, 3,
            ]
        );
        assert_eq!(registry().decode(&list_of_ints(), &bytes).unwrap(), value);
    }

    #[test]
    fn null_list_element_is_rejected() {
        let bytes = [0, 0, 0, 1, 0xFF, 0xFF, 0xFF, 0xFF];
        assert!(matches!(
            registry().decode(&list_of_ints(), &bytes),
            Err(ValueDecodeError::NullInCollection)
        ));
    }

    #[test]
    fn forged_count_does_not_preallocate() {
        let bytes = [0x7F, 0xFF, 0xFF, 0xFF];
        assert!(matches!(
            registry().decode(&list_of_ints(), &bytes),
            Err(ValueDecodeError::Invalid(_))
        ));
    }

    #[test]
    fn map_of_text_to_list() {
        let tp = CqlType::Map(Box::new(CqlType::Text), Box::new(list_of_ints()));
        let value = CqlValue::Map(vec![(
            CqlValue::Text("a".into()),
            CqlValue::List(vec![CqlValue::Int(7)]),
        )]);
        let bytes = encode(&value, &tp).unwrap();
        assert_eq!(registry().decode(&tp, &bytes).unwrap(), value);
        let mut untyped = Vec::new();
        registry().encode(&value, None, &mut untyped).unwrap();
        assert_eq!(untyped, bytes);
    }

    #[test]
    fn tuple_fields_may_be_null() {
        let tp = CqlType::Tuple(vec![CqlType::Int, CqlType::Text]);
        let value = CqlValue::Tuple(vec![Some(CqlValue::Int(1)), None]);
        let bytes = encode(&value, &tp).unwrap();
        assert_eq!(bytes, [0, 0, 0, 4, 0, 0, 0, 1, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(registry().decode(&tp, &bytes).unwrap(), value);
        assert_eq!(
            encode(&CqlValue::Tuple(vec![None]), &tp),
            Err(EncodeError::WrongElementCount {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn udt_missing_trailing_fields_are_null() {
        let tp = CqlType::Udt {
            keyspace: "ks".into(),
            type_name: "point".into(),
            fields: vec![("x".into(), CqlType::Int), ("y".into(), CqlType::Int)],
        };
        let value = registry().decode(&tp, &[0, 0, 0, 4, 0, 0, 0, 3]).unwrap();
        assert_eq!(value.udt_field("x"), Some(Some(&CqlValue::Int(3))));
        assert_eq!(value.udt_field("y"), Some(None));
        assert_eq!(value.udt_field("z"), None);
    }

    #[test]
    fn udt_fields_are_encoded_by_name() {
        let tp = point();
        let value = CqlValue::Udt {
            keyspace: "ks".into(),
            type_name: "point".into(),
            fields: vec![
                ("y".into(), Some(CqlValue::Int(1))),
                ("x".into(), Some(CqlValue::Int(2))),
            ],
        };
        let bytes = encode(&value, &tp).unwrap();
        assert_eq!(bytes, [0, 0, 0, 4, 0, 0, 0, 2, 0, 0, 0, 4, 0, 0, 0, 1]);
        let decoded = registry().decode(&tp, &bytes).unwrap();
        assert_eq!(decoded.udt_field("x"), Some(Some(&CqlValue::Int(2))));
        assert_eq!(decoded.udt_field("y"), Some(Some(&CqlValue::Int(1))));
    }

    #[test]
    fn udt_absent_fields_are_null() {
        let value = CqlValue::Udt {
            keyspace: "ks".into(),
            type_name: "point".into(),
            fields: vec![("y".into(), Some(CqlValue::Int(5)))],
        };
        let bytes = encode(&value, &point()).unwrap();
        assert_eq!(bytes, [0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 4, 0, 0, 0, 5]);
    }

    #[test]
    fn udt_unknown_field_is_rejected() {
        let value = CqlValue::Udt {
            keyspace: "ks".into(),
            type_name: "point".into(),
            fields: vec![
                ("x".into(), Some(CqlValue::Int(1))),
                ("z".into(), Some(CqlValue::Int(2))),
            ],
        };
        assert_eq!(
            encode(&value, &point()),
            Err(EncodeError::UnknownUdtField {
                type_name: "point".into(),
                field: "z".into()
            })
        );
    }

    #[test]
    fn fixed_size_vector_has_no_prefix() {
        let tp = CqlType::Vector {
            element: Box::new(CqlType::Float),
            dimensions: 2,
        };
        let value = CqlValue::Vector(vec![CqlValue::Float(1.0), CqlValue::Float(-2.0)]);
        let bytes = encode(&value, &tp).unwrap();
        assert_eq!(bytes, [0x3F, 0x80, 0, 0, 0xC0, 0, 0, 0]);
        assert_eq!(registry().decode(&tp, &bytes).unwrap(), value);
        assert_eq!(
            encode(&CqlValue::Vector(vec![CqlValue::Float(1.0)]), &tp),
            Err(EncodeError::WrongElementCount {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn variable_size_vector_uses_vints() {
        let tp = CqlType::Vector {
            element: Box::new(CqlType::Text),
            dimensions: 2,
        };
        let value = CqlValue::Vector(vec![CqlValue::Text("ab".into()), CqlValue::Text("".into())]);
        let bytes = encode(&value, &tp).unwrap();
        assert_eq!(bytes, [2, b'a', b'b', 0]);
        assert_eq!(registry().decode(&tp, &bytes).unwrap(), value);
        assert!(registry().decode(&tp, &[2, b'a', b'b', 0, 0]).is_err());
    }
}
