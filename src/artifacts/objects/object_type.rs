use std::io::{BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
}

impl ObjectType {
    pub fn as_str(&self) -> &str {
        match self {
            ObjectType::Blob => "blob",
            ObjectType::Tree => "tree",
            ObjectType::Commit => "commit",
        }
    }

    /// Prefix the content with its `<type> <size>\0` header
    ///
    /// The framed bytes are what gets hashed and what gets stored on disk.
    pub fn frame(&self, content: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut framed = Vec::with_capacity(content.len() + 16);
        write!(framed, "{} {}\0", self.as_str(), content.len())?;
        framed.write_all(content)?;

        Ok(framed)
    }

    /// Parse the `<type> <size>\0` header, returning the type and declared size
    pub fn parse_header(data_reader: &mut impl BufRead) -> anyhow::Result<(ObjectType, usize)> {
        let mut object_type = Vec::new();
        data_reader.read_until(b' ', &mut object_type)?;
        if object_type.pop() != Some(b' ') {
            anyhow::bail!("unexpected end of object header");
        }

        let object_type = String::from_utf8(object_type)?;
        let object_type = ObjectType::try_from(object_type.as_str())?;

        let mut size = Vec::new();
        data_reader.read_until(b'\0', &mut size)?;
        if size.pop() != Some(b'\0') {
            anyhow::bail!("unexpected end of object header");
        }

        let size = std::str::from_utf8(&size)?
            .parse::<usize>()
            .map_err(|_| anyhow::anyhow!("invalid object size"))?;

        Ok((object_type, size))
    }
}

impl TryFrom<&str> for ObjectType {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> anyhow::Result<Self> {
        match value {
            "blob" => Ok(ObjectType::Blob),
            "tree" => Ok(ObjectType::Tree),
            "commit" => Ok(ObjectType::Commit),
            _ => Err(anyhow::anyhow!("Invalid object type: {value}")),
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
