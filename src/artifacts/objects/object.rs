use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Result;
use bytes::Bytes;
use std::io::BufRead;

/// Encode an object's payload (everything after the `<type> <size>\0` header)
pub trait Packable {
    fn serialize(&self) -> Result<Bytes>;
}

/// Decode an object from its payload
pub trait Unpackable {
    fn deserialize(reader: impl BufRead) -> Result<Self>
    where
        Self: Sized;
}

pub trait Object: Packable {
    fn object_type(&self) -> ObjectType;

    /// Human-readable rendering used by `cat-file -p`
    fn display(&self) -> String;

    fn object_id(&self) -> Result<ObjectId> {
        ObjectId::hash(self.object_type(), &self.serialize()?)
    }
}
