use crate::artifacts::index::CHECKSUM_SIZE;
use anyhow::anyhow;
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::io::{Read, Write};

/// Reader/writer adapter that keeps a running SHA-1 of every byte it moves
///
/// The index file ends with the digest of all preceding bytes; reading
/// verifies it and writing appends it.
#[derive(Debug)]
pub struct Checksum<T> {
    inner: T,
    digest: Sha1,
}

impl<T> Checksum<T> {
    pub(crate) fn new(inner: T) -> Self {
        Checksum {
            inner,
            digest: Sha1::new(),
        }
    }

    pub(crate) fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read> Checksum<T> {
    pub(crate) fn read(&mut self, size: usize) -> anyhow::Result<Bytes> {
        let mut buffer = vec![0; size];
        self.inner
            .read_exact(&mut buffer)
            .map_err(|_| anyhow!("Unexpected end-of-file while reading index"))?;

        self.digest.update(&buffer);
        Ok(Bytes::from(buffer))
    }

    pub(crate) fn verify(&mut self) -> anyhow::Result<()> {
        let mut expected_checksum = [0u8; CHECKSUM_SIZE];
        self.inner
            .read_exact(&mut expected_checksum)
            .map_err(|_| anyhow!("Unexpected end-of-file while reading index checksum"))?;

        let actual_checksum = self.digest.clone().finalize();

        if expected_checksum != actual_checksum.as_slice() {
            return Err(anyhow!("Checksum does not match value stored on disk"));
        }

        let mut trailing = [0u8; 1];
        if self.inner.read(&mut trailing)? != 0 {
            return Err(anyhow!("Unexpected data after index checksum"));
        }

        Ok(())
    }
}

impl<T: Write> Checksum<T> {
    pub(crate) fn write(&mut self, data: &[u8]) -> anyhow::Result<()> {
        self.inner.write_all(data)?;
        self.digest.update(data);
        Ok(())
    }

    pub(crate) fn write_checksum(&mut self) -> anyhow::Result<()> {
        let checksum = self.digest.clone().finalize();
        self.inner
            .write_all(checksum.as_slice())
            .map_err(|_| anyhow!("Failed to write checksum to index file"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sealed(payload: &[u8]) -> Vec<u8> {
        let mut writer = Checksum::new(Vec::new());
        writer.write(payload).unwrap();
        writer.write_checksum().unwrap();
        writer.into_inner()
    }

    #[test]
    fn written_checksum_verifies() {
        let data = sealed(b"DIRC payload");

        let mut reader = Checksum::new(Cursor::new(data));
        reader.read(12).unwrap();

        assert!(reader.verify().is_ok());
    }

    #[test]
    fn flipped_byte_fails_verification() {
        let mut data = sealed(b"DIRC payload");
        data[3] ^= 0xff;

        let mut reader = Checksum::new(Cursor::new(data));
        reader.read(12).unwrap();

        assert!(reader.verify().is_err());
    }

    #[test]
    fn short_read_is_an_error() {
        let mut reader = Checksum::new(Cursor::new(b"DI".to_vec()));

        assert!(reader.read(12).is_err());
    }
}
