use crate::artifacts::index::{HEADER_SIZE, SIGNATURE, VERSION};
use crate::artifacts::objects::object::{Packable, Unpackable};
use byteorder::{ByteOrder, NetworkEndian, WriteBytesExt};
use bytes::Bytes;
use std::io::{BufRead, Write};

/// `DIRC`, the format version and the number of entries that follow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    pub entries_count: u32,
}

impl IndexHeader {
    pub fn for_entries(entries_count: usize) -> anyhow::Result<Self> {
        let entries_count = u32::try_from(entries_count)
            .map_err(|_| anyhow::anyhow!("too many index entries: {entries_count}"))?;

        Ok(IndexHeader { entries_count })
    }
}

impl Packable for IndexHeader {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut out = Vec::with_capacity(HEADER_SIZE);
        out.write_all(SIGNATURE.as_bytes())?;
        out.write_u32::<NetworkEndian>(VERSION)?;
        out.write_u32::<NetworkEndian>(self.entries_count)?;

        Ok(Bytes::from(out))
    }
}

impl Unpackable for IndexHeader {
    /// Rejects anything but a version 2 `DIRC` header
    fn deserialize(mut reader: impl BufRead) -> anyhow::Result<Self> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE);
        reader.read_to_end(&mut bytes)?;

        anyhow::ensure!(
            bytes.len() == HEADER_SIZE,
            "index header is {} bytes, expected {HEADER_SIZE}",
            bytes.len()
        );
        anyhow::ensure!(
            &bytes[..4] == SIGNATURE.as_bytes(),
            "index signature is not {SIGNATURE}"
        );

        let version = NetworkEndian::read_u32(&bytes[4..8]);
        anyhow::ensure!(version == VERSION, "unsupported index version {version}");

        Ok(IndexHeader {
            entries_count: NetworkEndian::read_u32(&bytes[8..12]),
        })
    }
}
