use std::fmt::{Display, Formatter};

use crate::error::{DbError, DbResult};
use crate::fields::FieldVal;
use crate::heap_page::HeapPageId;
use crate::types::Type;

/// Stable identity of a tuple once it has been read from, or inserted
/// into, a page: the page it lives on plus its slot index.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct RecordId {
    pid: HeapPageId,
    slot: usize,
}

impl RecordId {
    pub fn new(pid: HeapPageId, slot: usize) -> Self {
        RecordId { pid, slot }
    }

    pub fn page_id(&self) -> HeapPageId {
        self.pid
    }

    pub fn slot(&self) -> usize {
        self.slot
    }
}

/// Ordered schema: a `(Type, Option<name>)` per field. Two descriptors
/// compare equal iff they have the same length and pointwise-equal
/// types; field names are not part of equality.
#[derive(Debug, Clone)]
pub struct TupleDesc {
    types: Vec<Type>,
    names: Vec<Option<String>>,
}

impl TupleDesc {
    /// `names[i]` of `None` leaves that field anonymous. Panics if
    /// `types` is empty or the two vectors disagree in length — both are
    /// programmer errors at schema-construction time, not runtime data
    /// errors.
    pub fn new(types: Vec<Type>, names: Vec<Option<String>>) -> Self {
        assert!(!types.is_empty(), "a TupleDesc needs at least one field");
        assert_eq!(types.len(), names.len());
        TupleDesc { types, names }
    }

    /// Convenience constructor for the common all-named case.
    pub fn named(types: Vec<Type>, names: Vec<String>) -> Self {
        Self::new(types, names.into_iter().map(Some).collect())
    }

    /// Concatenates two descriptors: `self`'s fields first, then `other`'s.
    pub fn merge(td1: &TupleDesc, td2: &TupleDesc) -> TupleDesc {
        let mut types = td1.types.clone();
        types.extend(td2.types.clone());
        let mut names = td1.names.clone();
        names.extend(td2.names.clone());
        TupleDesc { types, names }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn field_name(&self, i: usize) -> Option<&str> {
        self.names.get(i).and_then(|n| n.as_deref())
    }

    /// Index of the first field named `name`, per spec's "first match" rule.
    pub fn name_to_index(&self, name: &str) -> Option<usize> {
        self.names
            .iter()
            .position(|n| n.as_deref() == Some(name))
    }

    pub fn field_type(&self, i: usize) -> Option<Type> {
        self.types.get(i).copied()
    }

    /// Total byte size of a tuple conforming to this descriptor.
    pub fn byte_size(&self) -> usize {
        self.types.iter().map(|t| t.len()).sum()
    }

    /// Clones this descriptor with every name prefixed `"{prefix}."`,
    /// for `SeqScan`'s alias-qualified output schema.
    pub fn prefixed(&self, prefix: &str) -> TupleDesc {
        let names = self
            .names
            .iter()
            .map(|n| n.as_ref().map(|n| format!("{}.{}", prefix, n)))
            .collect();
        TupleDesc {
            types: self.types.clone(),
            names,
        }
    }
}

impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.types == other.types
    }
}
impl Eq for TupleDesc {}

/// A row: a schema, its field values, and (once placed on a page) the
/// `RecordId` identifying where it lives.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Tuple {
    fields: Vec<FieldVal>,
    td: TupleDesc,
    rid: Option<RecordId>,
}

impl Display for Tuple {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut s = String::new();
        for (i, field) in self.fields.iter().enumerate() {
            let name = self.td.field_name(i).unwrap_or("?");
            match field {
                FieldVal::Int(v) => s.push_str(&format!("{}: {}", name, v.value())),
                FieldVal::Str(v) => s.push_str(&format!("{}: {}", name, v.value())),
            }
            if i != self.fields.len() - 1 {
                s.push_str(", ");
            }
        }
        write!(f, "{{{}}}", s)
    }
}

impl Tuple {
    pub fn new(fields: Vec<FieldVal>, td: &TupleDesc) -> Self {
        Tuple {
            fields,
            td: td.clone(),
            rid: None,
        }
    }

    pub fn tuple_desc(&self) -> &TupleDesc {
        &self.td
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.rid
    }

    pub fn set_record_id(&mut self, rid: RecordId) {
        self.rid = Some(rid);
    }

    pub fn field(&self, i: usize) -> DbResult<&FieldVal> {
        self.fields.get(i).ok_or(DbError::NoSuchElement)
    }

    pub fn set_field(&mut self, i: usize, field: FieldVal) {
        self.fields[i] = field;
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = vec![];
        for field in self.fields.iter() {
            bytes.extend(field.encode());
        }
        bytes
    }

    pub fn decode(bytes: &[u8], td: &TupleDesc) -> DbResult<Self> {
        let mut offset = 0;
        let mut fields = vec![];
        for i in 0..td.len() {
            let t = td.field_type(i).ok_or(DbError::NoSuchElement)?;
            let field = t.decode(&bytes[offset..])?;
            offset += t.len();
            fields.push(field);
        }
        Ok(Tuple::new(fields, td))
    }

    pub fn fields(&self) -> &[FieldVal] {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{IntField, StringField};
    use crate::types::Type;

    fn sample_desc() -> TupleDesc {
        TupleDesc::named(
            vec![Type::Int, Type::Str],
            vec!["int".to_string(), "string".to_string()],
        )
    }

    #[test]
    fn test_tuple_desc_merge() {
        let td1 = sample_desc();
        let td2 = sample_desc();
        let td3 = TupleDesc::merge(&td1, &td2);
        assert_eq!(td3.len(), 4);
        assert_eq!(td3.field_name(0), Some("int"));
        assert_eq!(td3.field_name(2), Some("int"));
    }

    #[test]
    fn test_tuple_desc_equality_ignores_names() {
        let td1 = sample_desc();
        let td2 = TupleDesc::named(
            vec![Type::Int, Type::Str],
            vec!["a".to_string(), "b".to_string()],
        );
        assert_eq!(td1, td2);
    }

    #[test]
    fn test_tuple_desc_byte_size() {
        let td = sample_desc();
        assert_eq!(td.byte_size(), 4 + crate::types::STRING_SIZE + 4);
    }

    #[test]
    fn test_name_to_index_returns_first_match() {
        let td = TupleDesc::named(
            vec![Type::Int, Type::Int],
            vec!["id".to_string(), "id".to_string()],
        );
        assert_eq!(td.name_to_index("id"), Some(0));
    }

    #[test]
    fn test_tuple_serialize_deserialize() {
        let td = sample_desc();
        let tuple = Tuple::new(
            vec![
                FieldVal::Int(IntField::new(1)),
                FieldVal::Str(StringField::new("hello".to_string())),
            ],
            &td,
        );
        let bytes = tuple.encode();
        let tuple2 = Tuple::decode(&bytes, &td).unwrap();
        assert_eq!(tuple, tuple2);
    }

    #[test]
    fn test_fresh_tuple_has_no_record_id() {
        let td = sample_desc();
        let tuple = Tuple::new(
            vec![
                FieldVal::Int(IntField::new(1)),
                FieldVal::Str(StringField::new("hello".to_string())),
            ],
            &td,
        );
        assert_eq!(tuple.record_id(), None);
    }
}
