use crate::error::{DbError, DbResult};
use crate::types::{Type, STRING_SIZE};

/// Relational comparison operators a predicate can apply to a field.
/// `Like` only applies to strings (spec §3).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

/// Tagged scalar value stored in a tuple.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum FieldVal {
    Int(IntField),
    Str(StringField),
}

impl FieldVal {
    pub fn into_int(self) -> Option<IntField> {
        match self {
            FieldVal::Int(f) => Some(f),
            _ => None,
        }
    }

    pub fn into_str(self) -> Option<StringField> {
        match self {
            FieldVal::Str(f) => Some(f),
            _ => None,
        }
    }

    pub fn field_type(&self) -> Type {
        match self {
            FieldVal::Int(f) => f.field_type(),
            FieldVal::Str(f) => f.field_type(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            FieldVal::Int(f) => f.encode(),
            FieldVal::Str(f) => f.encode(),
        }
    }

    /// Evaluates `self <op> other`, under the total order within each
    /// type. Fails if the two fields are of different types, or if
    /// `Like` is requested on an int field.
    pub fn compare(&self, op: Op, other: &FieldVal) -> DbResult<bool> {
        match (self, other) {
            (FieldVal::Int(a), FieldVal::Int(b)) => {
                let (a, b) = (a.value(), b.value());
                Ok(match op {
                    Op::Eq => a == b,
                    Op::Ne => a != b,
                    Op::Lt => a < b,
                    Op::Le => a <= b,
                    Op::Gt => a > b,
                    Op::Ge => a >= b,
                    Op::Like => {
                        return Err(DbError::Other("LIKE is not defined on int fields".to_string()))
                    }
                })
            }
            (FieldVal::Str(a), FieldVal::Str(b)) => {
                let (a, b) = (a.value(), b.value());
                Ok(match op {
                    Op::Eq => a == b,
                    Op::Ne => a != b,
                    Op::Lt => a < b,
                    Op::Le => a <= b,
                    Op::Gt => a > b,
                    Op::Ge => a >= b,
                    Op::Like => a.contains(b),
                })
            }
            _ => Err(DbError::Other(
                "cannot compare fields of different types".to_string(),
            )),
        }
    }
}

/// Behavior shared by every concrete field type.
pub trait Field {
    fn field_type(&self) -> Type;
    fn encode(&self) -> Vec<u8>;
}

#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct IntField {
    value: i32,
}

impl IntField {
    pub fn new(value: i32) -> Self {
        IntField { value }
    }

    pub fn value(&self) -> i32 {
        self.value
    }
}

impl Field for IntField {
    fn field_type(&self) -> Type {
        Type::Int
    }

    fn encode(&self) -> Vec<u8> {
        self.value.to_be_bytes().to_vec()
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct StringField {
    value: String,
}

impl StringField {
    /// Stores `value` as given; `encode` truncates to `STRING_SIZE` bytes
    /// at serialization time if it is longer, with the length prefix
    /// reflecting the truncated length.
    pub fn new(value: String) -> Self {
        StringField { value }
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl Field for StringField {
    fn field_type(&self) -> Type {
        Type::Str
    }

    fn encode(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; STRING_SIZE + 4];
        let str_bytes = self.value.as_bytes();
        let copy_len = std::cmp::min(str_bytes.len(), STRING_SIZE);
        bytes[0..4].copy_from_slice(&(copy_len as u32).to_be_bytes());
        bytes[4..4 + copy_len].copy_from_slice(&str_bytes[..copy_len]);
        bytes
    }
}
