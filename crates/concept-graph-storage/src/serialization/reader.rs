//! Bounds-checked cursor over an input buffer.

use super::error::SerializationError;

pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    /// Take the next `n` bytes or fail with `Truncated` naming `section`.
    pub(crate) fn take(
        &mut self,
        n: usize,
        section: &'static str,
    ) -> Result<&'a [u8], SerializationError> {
        if self.remaining() < n {
            return Err(SerializationError::Truncated {
                section,
                needed: n,
                available: self.remaining(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub(crate) fn array<const N: usize>(
        &mut self,
        section: &'static str,
    ) -> Result<[u8; N], SerializationError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, section)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self, section: &'static str) -> Result<u8, SerializationError> {
        Ok(self.array::<1>(section)?[0])
    }

    pub(crate) fn u16(&mut self, section: &'static str) -> Result<u16, SerializationError> {
        Ok(u16::from_le_bytes(self.array(section)?))
    }

    pub(crate) fn u32(&mut self, section: &'static str) -> Result<u32, SerializationError> {
        Ok(u32::from_le_bytes(self.array(section)?))
    }

    pub(crate) fn u64(&mut self, section: &'static str) -> Result<u64, SerializationError> {
        Ok(u64::from_le_bytes(self.array(section)?))
    }

    pub(crate) fn i64(&mut self, section: &'static str) -> Result<i64, SerializationError> {
        Ok(i64::from_le_bytes(self.array(section)?))
    }

    pub(crate) fn f32(&mut self, section: &'static str) -> Result<f32, SerializationError> {
        Ok(f32::from_le_bytes(self.array(section)?))
    }
}
