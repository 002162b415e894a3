use crate::artifacts::objects::object_type::ObjectType;
use bytes::Bytes;
use derive_new::new;
use std::io::BufRead;

pub trait Unpackable {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self>
    where
        Self: Sized;
}

/// A fully resolved object body, with any delta chain already replayed
///
/// `content` is an owned, cheaply clonable buffer; nothing in it refers back to
/// the pack the object came from.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct DecodedObject {
    pub object_type: ObjectType,
    pub content: Bytes,
}

impl DecodedObject {
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Parse the body as `T`, failing if the object has a different type
    pub fn parse_as<T: Unpackable>(&self, expected: ObjectType) -> anyhow::Result<T> {
        if self.object_type != expected {
            return Err(anyhow::anyhow!(
                "expected a {expected} object, found a {}",
                self.object_type
            ));
        }
        T::deserialize(&self.content[..])
    }
}
