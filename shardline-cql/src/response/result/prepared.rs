use std::{io, sync::Arc};

use crate::{
    cql::{ReadCql, ShortBytes},
    cql_type::TypeParser,
    extensions::ProtocolExtensions,
    response::result::{column_spec::RowSchema, rows::Metadata},
    utils::invalid_data,
};

const GLOBAL_TABLE_SPEC: u32 = 0x0001;

#[derive(Debug)]
pub struct Prepared {
    pub id: Arc<[u8]>,
    pub pk_indexes: Box<[u16]>,
    pub bind_schema: Arc<RowSchema>,
    pub result_schema: Option<Arc<RowSchema>>,
    pub is_lwt: bool,
}

impl Prepared {
    pub fn deserialize(
        extensions: Option<&ProtocolExtensions>,
        parser: &TypeParser,
        mut slice: &[u8],
    ) -> io::Result<Self> {
        let buf = &mut slice;
        let id = ShortBytes::read_cql(buf)?.0.into();
        // unknown bits may carry extensions, like the LWT mark
        let flags = u32::read_cql(buf)?;
        let columns_count = u32::read_cql(buf)?;
        let pk_count = i32::read_cql(buf)?;
        let pk_indexes = (0..pk_count)
            .map(|_| i16::read_cql(buf))
            .map(|pki| pki?.try_into().map_err(invalid_data))
            .collect::<Result<Vec<_>, io::Error>>()?
            .into_boxed_slice();
        let global_table_spec = if flags & GLOBAL_TABLE_SPEC != 0 {
            let keyspace = <&str>::read_cql(buf)?;
            let table = <&str>::read_cql(buf)?;
            Some((keyspace, table))
        } else {
            None
        };
        let bind_schema = RowSchema::deserialize(parser, columns_count, global_table_spec, buf)?;
        let result_schema = Metadata::deserialize(parser, buf)?.schema;
        let is_lwt = extensions
            .and_then(|ext| ext.lwt_metadata_mask)
            .map_or(false, |mask| flags & mask != 0);
        Ok(Self {
            id,
            pk_indexes,
            bind_schema: Arc::new(bind_schema),
            result_schema,
            is_lwt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cql_type::CqlType, response::result::column_spec::tests::column};

    fn body(flags: u32) -> Vec<u8> {
        let mut body = vec![0, 2, 0xAB, 0xCD];
        body.extend_from_slice(&(flags | GLOBAL_TABLE_SPEC).to_be_bytes());
        body.extend_from_slice(&[0, 0, 0, 2]); // columns
        body.extend_from_slice(&[0, 0, 0, 1, 0, 0]); // pk indexes
        body.extend_from_slice(&[0, 2, b'k', b's', 0, 2, b't', b'b']);
        body.extend(column("id", 0x0009));
        body.extend(column("v", 0x000D));
        body.extend_from_slice(&[0, 0, 0, 4, 0, 0, 0, 0]); // no result metadata
        body
    }

    #[test]
    fn prepared_body() {
        let prepared = Prepared::deserialize(None, &TypeParser::default(), &body(0)).unwrap();
        assert_eq!(&*prepared.id, [0xAB, 0xCD]);
        assert_eq!(&*prepared.pk_indexes, [0]);
        assert_eq!(prepared.bind_schema.len(), 2);
        assert_eq!(
            prepared.bind_schema.types().cloned().collect::<Vec<_>>(),
            [CqlType::Int, CqlType::Text]
        );
        assert!(prepared.result_schema.is_none());
        assert!(!prepared.is_lwt);
    }

    #[test]
    fn lwt_mark() {
        let extensions = ProtocolExtensions {
            lwt_metadata_mask: Some(1 << 31),
            ..Default::default()
        };
        let body = body(1 << 31);
        let prepared =
            Prepared::deserialize(Some(&extensions), &TypeParser::default(), &body).unwrap();
        assert!(prepared.is_lwt);
        // without the negotiated extension, the bit means nothing
        let prepared = Prepared::deserialize(None, &TypeParser::default(), &body).unwrap();
        assert!(!prepared.is_lwt);
    }
}
