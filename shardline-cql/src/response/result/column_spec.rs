use std::{collections::HashMap, fmt, io, sync::Arc};

use crate::{
    cql::ReadCql,
    cql_type::{CqlType, TypeCode, TypeParser},
    utils::invalid_data,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub keyspace: Arc<str>,
    pub table: Arc<str>,
    pub name: String,
    /// Position in the row, which is also the wire order.
    pub index: usize,
    pub r#type: CqlType,
}

impl ColumnSpec {
    pub fn type_code(&self) -> TypeCode {
        self.r#type.type_code()
    }

    /// Nested types, only for parametric columns.
    pub fn descriptor(&self) -> Option<&CqlType> {
        self.type_code().is_parametric().then_some(&self.r#type)
    }
}

impl fmt::Display for ColumnSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{ks}.{tb}.{name} {tp}",
            ks = self.keyspace,
            tb = self.table,
            name = self.name,
            tp = self.r#type
        )
    }
}

/// Ordered columns of a result set or of bind markers.
///
/// Lookup by index is canonical. Duplicate names are legal on the wire, so the name
/// lookup resolves to the last column carrying that name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSchema {
    columns: Box<[ColumnSpec]>,
    by_name: HashMap<String, usize>,
}

impl RowSchema {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        let by_name = columns
            .iter()
            .map(|col| (col.name.clone(), col.index))
            .collect();
        Self {
            columns: columns.into(),
            by_name,
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&ColumnSpec> {
        self.columns.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn types(&self) -> impl ExactSizeIterator<Item = &CqlType> {
        self.columns.iter().map(|col| &col.r#type)
    }

    /// Calls `f` once per column, in order, with
    /// `(name, keyspace, table, type code, descriptor)`.
    pub fn describe<F>(&self, mut f: F)
    where
        F: FnMut(&str, &str, &str, TypeCode, Option<&CqlType>),
    {
        for col in self.columns.iter() {
            f(
                &col.name,
                &col.keyspace,
                &col.table,
                col.type_code(),
                col.descriptor(),
            );
        }
    }

    /// Reads `<col_spec_i>` entries, the table spec being either global or per column.
    pub fn deserialize(
        parser: &TypeParser,
        columns_count: u32,
        global_table_spec: Option<(&str, &str)>,
        buf: &mut &[u8],
    ) -> io::Result<Self> {
        // the count is bounded by the payload size
        if columns_count as usize > buf.len() {
            return Err(invalid_data(format!(
                "{columns_count} columns announced in {} bytes",
                buf.len()
            )));
        }
        let global_table_spec = global_table_spec.map(|(ks, tb)| (ks.into(), tb.into()));
        let mut columns: Vec<ColumnSpec> = Vec::with_capacity(columns_count as usize);
        for index in 0..columns_count as usize {
            let (keyspace, table) = if let Some(table_spec) = global_table_spec.clone() {
                table_spec
            } else {
                let (keyspace, table) = (<&str>::read_cql(buf)?, <&str>::read_cql(buf)?);
                match columns.first() {
                    Some(col)
                        if keyspace == col.keyspace.as_ref() && table == col.table.as_ref() =>
                    {
                        (col.keyspace.clone(), col.table.clone())
                    }
                    _ => (keyspace.into(), table.into()),
                }
            };
            let name = String::read_cql(buf)?;
            let r#type = parser.parse(buf)?;
            columns.push(ColumnSpec {
                keyspace,
                table,
                name,
                index,
                r#type,
            });
        }
        Ok(Self::new(columns))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::MalformedSchema;

    pub(crate) fn string(s: &str) -> Vec<u8> {
        let mut buf = (s.len() as u16).to_be_bytes().to_vec();
        buf.extend_from_slice(s.as_bytes());
        buf
    }

    pub(crate) fn column(name: &str, code: u16) -> Vec<u8> {
        let mut buf = string(name);
        buf.extend_from_slice(&code.to_be_bytes());
        buf
    }

    #[test]
    fn global_table_spec() {
        let mut body = column("id", 0x0009);
        body.extend(column("tags", 0x0022));
        body.extend_from_slice(&0x000Du16.to_be_bytes());
        let schema =
            RowSchema::deserialize(&TypeParser::default(), 2, Some(("ks", "tb")), &mut &body[..])
                .unwrap();
        assert_eq!(schema.len(), 2);
        let tags = schema.column(1).unwrap();
        assert_eq!(tags.index, 1);
        assert_eq!(&*tags.keyspace, "ks");
        assert_eq!(tags.r#type, CqlType::Set(Box::new(CqlType::Text)));
        assert_eq!(tags.to_string(), "ks.tb.tags set<text>");
        assert_eq!(schema.index_of("tags"), Some(1));
    }

    #[test]
    fn per_column_table_spec() {
        let mut body = string("ks");
        body.extend(string("a"));
        body.extend(column("x", 0x0009));
        body.extend(string("ks"));
        body.extend(string("b"));
        body.extend(column("y", 0x0009));
        let schema =
            RowSchema::deserialize(&TypeParser::default(), 2, None, &mut &body[..]).unwrap();
        assert_eq!(&*schema.columns()[0].table, "a");
        assert_eq!(&*schema.columns()[1].table, "b");
    }

    #[test]
    fn duplicate_names_resolve_to_the_last_column() {
        let mut body = column("v", 0x0009);
        body.extend(column("v", 0x000D));
        let schema =
            RowSchema::deserialize(&TypeParser::default(), 2, Some(("ks", "tb")), &mut &body[..])
                .unwrap();
        assert_eq!(schema.index_of("v"), Some(1));
        assert_eq!(schema.column(0).unwrap().r#type, CqlType::Int);
    }

    #[test]
    fn describe_reports_descriptors_of_parametric_columns() {
        let mut body = column("id", 0x0009);
        body.extend(column("m", 0x0021));
        body.extend_from_slice(&[0, 0x0D, 0, 0x02]);
        let schema =
            RowSchema::deserialize(&TypeParser::default(), 2, Some(("ks", "tb")), &mut &body[..])
                .unwrap();
        let mut described = Vec::new();
        schema.describe(|name, keyspace, table, code, descriptor| {
            described.push((
                format!("{keyspace}.{table}.{name}"),
                code,
                descriptor.map(|tp| (tp.child_count(), tp.map_types().map(|(k, _)| k.clone()))),
            ));
        });
        assert_eq!(
            described,
            [
                ("ks.tb.id".to_string(), TypeCode::Int, None),
                ("ks.tb.m".to_string(), TypeCode::Map, Some((2, Some(CqlType::Text)))),
            ]
        );
    }

    #[test]
    fn declared_count_cannot_be_satisfied() {
        let body = column("id", 0x0009);
        let error =
            RowSchema::deserialize(&TypeParser::default(), 2, Some(("ks", "tb")), &mut &body[..])
                .unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);
        let error = RowSchema::deserialize(
            &TypeParser::default(),
            u32::MAX,
            Some(("ks", "tb")),
            &mut &body[..],
        )
        .unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn deep_nesting_is_malformed() {
        let mut body = string("deep");
        for _ in 0..1000 {
            body.extend_from_slice(&[0x00, 0x31, 0x00, 0x01]);
        }
        body.extend_from_slice(&[0x00, 0x09]);
        let error = RowSchema::deserialize(&TypeParser::new(16), 1, Some(("ks", "tb")), &mut &body[..])
            .unwrap_err();
        assert!(matches!(
            MalformedSchema::from_io(error),
            Ok(MalformedSchema::DepthExceeded(16))
        ));
    }
}
