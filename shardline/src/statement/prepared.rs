use std::sync::Arc;

use shardline_cql::{
    error::SerializeValuesError,
    registry::Registry,
    response::result::{column_spec::RowSchema, prepared::Prepared},
    serialize::SerializedRow,
    CqlValue, MaybeValue,
};

/// Handle of a statement prepared on the connection, cheap to clone.
#[derive(Debug, Clone)]
pub struct PreparedStatement {
    statement: Arc<str>,
    id: Arc<[u8]>,
    pk_indexes: Arc<[u16]>,
    bind_schema: Arc<RowSchema>,
    result_schema: Option<Arc<RowSchema>>,
    is_lwt: bool,
}

impl PreparedStatement {
    pub(crate) fn new(statement: &str, prepared: Prepared) -> Self {
        Self {
            statement: statement.into(),
            id: prepared.id,
            pk_indexes: prepared.pk_indexes.into(),
            bind_schema: prepared.bind_schema,
            result_schema: prepared.result_schema,
            is_lwt: prepared.is_lwt,
        }
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub fn id(&self) -> &[u8] {
        &self.id
    }

    /// Bind markers which make up the partition key, in partition key order.
    pub fn partition_key_indexes(&self) -> &[u16] {
        &self.pk_indexes
    }

    pub fn bind_markers(&self) -> &Arc<RowSchema> {
        &self.bind_schema
    }

    /// `None` when the statement returns no rows.
    pub fn result_schema(&self) -> Option<&Arc<RowSchema>> {
        self.result_schema.as_ref()
    }

    /// Whether the statement is a lightweight transaction, only known when the node
    /// supports the LWT metadata extension.
    pub fn is_lwt(&self) -> bool {
        self.is_lwt
    }

    /// Serializes `values` against the bind marker types.
    pub fn bind(
        &self,
        registry: &Registry,
        values: &[MaybeValue<CqlValue>],
    ) -> Result<SerializedRow, SerializeValuesError> {
        SerializedRow::bind(registry, values, self.bind_schema.types())
    }
}

#[cfg(test)]
mod tests {
    use shardline_cql::{registry::registry, response::result::column_spec::ColumnSpec, CqlType};

    use super::*;

    fn prepared() -> PreparedStatement {
        let column = |name: &str, index, r#type| ColumnSpec {
            keyspace: "ks".into(),
            table: "tb".into(),
            name: name.into(),
            index,
            r#type,
        };
        PreparedStatement::new(
            "INSERT INTO tb (id, name) VALUES (?, ?)",
            Prepared {
                id: Arc::from(&[1, 2][..]),
                pk_indexes: vec![0].into(),
                bind_schema: Arc::new(RowSchema::new(vec![
                    column("id", 0, CqlType::Int),
                    column("name", 1, CqlType::Text),
                ])),
                result_schema: None,
                is_lwt: false,
            },
        )
    }

    #[test]
    fn bind_values() {
        let prepared = prepared();
        assert_eq!(prepared.partition_key_indexes(), [0]);
        let row = prepared
            .bind(
                registry(),
                &[MaybeValue::Value(CqlValue::Int(42)), MaybeValue::Null],
            )
            .unwrap();
        assert_eq!(row.as_bytes(), [0, 2, 0, 0, 0, 4, 0, 0, 0, 42, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn bind_checks_the_marker_count() {
        let error = prepared()
            .bind(registry(), &[MaybeValue::Value(CqlValue::Int(42))])
            .unwrap_err();
        assert_eq!(
            error,
            SerializeValuesError::WrongValueCount {
                expected: 2,
                found: 1
            }
        );
    }
}
