use crate::areas::repository::Repository;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{ErrorContext, ErrorKind, Result};
use std::path::Path;

impl Repository {
    /// Blob id of the file at `object_path`, stored when `write` is set
    pub fn hash_object(&self, object_path: &Path, write: bool) -> Result<ObjectId> {
        let object_data = self
            .workspace()
            .read_file(object_path)
            .kind_context(ErrorKind::FileSystem, || {
                format!("unable to read {}", object_path.display())
            })?;

        if write {
            return self.store_object(&object_data, ObjectType::Blob);
        }

        ObjectId::hash(ObjectType::Blob, &object_data)
            .kind_context(ErrorKind::Object, || "unable to hash blob")
    }
}
