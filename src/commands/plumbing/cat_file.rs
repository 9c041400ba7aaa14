use crate::areas::repository::Repository;
use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::{Object, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use crate::errors::{Error, ErrorContext, ErrorKind, Result};
use std::io::Cursor;

impl Repository {
    /// Pretty-printed content of the object named by a full or abbreviated id
    pub fn cat_file(&self, object_id: &str) -> Result<String> {
        let object_id = self.expand_object_id(object_id)?;
        let (object_type, content) = self.get_object(&object_id)?;
        let reader = Cursor::new(content);

        let display = match object_type {
            ObjectType::Blob => Blob::deserialize(reader).map(|blob| blob.display()),
            ObjectType::Tree => Tree::deserialize(reader).map(|tree| tree.display()),
            ObjectType::Commit => Commit::deserialize(reader).map(|commit| commit.display()),
        }
        .kind_context(ErrorKind::Object, || {
            format!("unable to decode {object_type} {object_id}")
        })?;

        Ok(display)
    }

    fn expand_object_id(&self, object_id: &str) -> Result<ObjectId> {
        if object_id.len() == OBJECT_ID_LENGTH {
            return ObjectId::try_parse(object_id.to_string())
                .kind_context(ErrorKind::UserInput, || format!("invalid object id {object_id}"));
        }

        let matches = self.database().find_by_prefix(object_id)?;
        match matches.as_slice() {
            [oid] => Ok(oid.clone()),
            [] => Err(Error::user_input(format!("object {object_id} not found"))),
            _ => Err(Error::user_input(format!(
                "short object id {object_id} is ambiguous"
            ))),
        }
    }
}
