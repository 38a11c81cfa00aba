use crate::error::{DbError, DbResult};
use crate::fields::{FieldVal, IntField, StringField};

/// Fixed on-disk width of a `Str` field's character payload, not counting
/// its 4-byte length prefix — so a `Str` field occupies `STRING_SIZE + 4`
/// (132) bytes on disk in total. Spec §3 leaves the exact figure
/// "implementation-fixed"; 128 is chosen as a round payload size.
pub const STRING_SIZE: usize = 128;

/// The only scalar types this engine's schema system knows about.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Type {
    Int,
    Str,
}

impl Type {
    /// Fixed byte length of a field of this type, as stored in a tuple slot.
    pub fn len(&self) -> usize {
        match self {
            Type::Int => 4,
            Type::Str => STRING_SIZE + 4,
        }
    }

    /// Decodes one field of this type from the front of `bytes`.
    pub fn decode(&self, bytes: &[u8]) -> DbResult<FieldVal> {
        if bytes.len() < self.len() {
            return Err(DbError::Other("truncated field bytes".to_string()));
        }
        match self {
            Type::Int => {
                let mut int_bytes = [0u8; 4];
                int_bytes.copy_from_slice(&bytes[..4]);
                Ok(FieldVal::Int(IntField::new(i32::from_be_bytes(int_bytes))))
            }
            Type::Str => {
                let mut len_bytes = [0u8; 4];
                len_bytes.copy_from_slice(&bytes[..4]);
                let len = u32::from_be_bytes(len_bytes) as usize;
                if len > STRING_SIZE {
                    return Err(DbError::Other("corrupt string length prefix".to_string()));
                }
                let str_bytes = &bytes[4..4 + len];
                let value = String::from_utf8(str_bytes.to_vec())
                    .map_err(|e| DbError::Other(format!("invalid utf8 in string field: {}", e)))?;
                Ok(FieldVal::Str(StringField::new(value)))
            }
        }
    }
}
