//! Fixed 40-byte file header.

use super::error::SerializationError;
use super::reader::ByteReader;

/// Magic bytes at offset 0 of every compacted graph file.
pub const MAGIC: [u8; 4] = *b"CGDB";

/// Current on-disk format version.
pub const FORMAT_VERSION: u16 = 1;

/// Encoded header size in bytes.
pub const HEADER_LEN: usize = 40;

/// Header of the compacted graph file.
///
/// | Offset | Size | Field |
/// |--------|------|-------|
/// | 0 | 4 | magic `CGDB` |
/// | 4 | 2 | format version |
/// | 6 | 2 | reserved (zero) |
/// | 8 | 8 | concept count |
/// | 16 | 8 | edge count |
/// | 24 | 8 | last write, epoch millis |
/// | 32 | 8 | last applied log sequence |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileHeader {
    pub concept_count: u64,
    pub edge_count: u64,
    pub last_write_millis: i64,
    pub last_sequence: u64,
}

impl FileHeader {
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&self.concept_count.to_le_bytes());
        out.extend_from_slice(&self.edge_count.to_le_bytes());
        out.extend_from_slice(&self.last_write_millis.to_le_bytes());
        out.extend_from_slice(&self.last_sequence.to_le_bytes());
    }

    pub(crate) fn decode(reader: &mut ByteReader<'_>) -> Result<Self, SerializationError> {
        let found = reader.array::<4>("header")?;
        if found != MAGIC {
            return Err(SerializationError::BadMagic {
                expected: MAGIC,
                found,
            });
        }
        let version = reader.u16("header")?;
        if version != FORMAT_VERSION {
            return Err(SerializationError::UnsupportedVersion(version));
        }
        let _reserved = reader.u16("header")?;
        Ok(Self {
            concept_count: reader.u64("header")?,
            edge_count: reader.u64("header")?,
            last_write_millis: reader.i64("header")?,
            last_sequence: reader.u64("header")?,
        })
    }
}
