//! Offset-tracked, bounds-checked reader over an immutable byte buffer.
//!
//! Every read either consumes exactly the bytes it reports or fails with
//! [`CryptoError::BlobFormat`] without advancing the cursor.

use crate::error::CryptoError;

/// Width of a DPAPI length prefix / integer field in bytes.
pub const U32_LEN: usize = 4;

/// Sequential little-endian reader.
#[derive(Clone, Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    /// Start reading at offset 0.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Current offset from the start of the buffer.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    /// Consume `len` bytes and return them as a borrowed slice.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::BlobFormat`] if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CryptoError> {
        let end = self
            .offset
            .checked_add(len)
            .ok_or_else(|| CryptoError::BlobFormat("cursor overflow".into()))?;

        if end > self.data.len() {
            return Err(CryptoError::BlobFormat(format!(
                "truncated blob: need {len} bytes at offset {}, {} available",
                self.offset,
                self.remaining()
            )));
        }

        let slice = &self.data[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    /// Consume exactly `N` bytes into a fixed-size array.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::BlobFormat`] on truncation.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CryptoError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_bytes(N)?);
        Ok(buf)
    }

    /// Consume a little-endian `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::BlobFormat`] on truncation.
    pub fn read_u32_le(&mut self) -> Result<u32, CryptoError> {
        self.read_array::<U32_LEN>().map(u32::from_le_bytes)
    }

    /// Consume a `u32` length prefix followed by that many bytes.
    ///
    /// The cursor is left untouched if the payload is truncated.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::BlobFormat`] if the prefix or payload is truncated
    /// or the prefix does not fit the platform `usize`.
    pub fn read_length_prefixed(&mut self) -> Result<&'a [u8], CryptoError> {
        let start = self.offset;
        let len = self.read_u32_le()?;
        let len = usize::try_from(len)
            .map_err(|_| CryptoError::BlobFormat("length prefix exceeds platform usize".into()))?;

        self.read_bytes(len).inspect_err(|_| self.offset = start)
    }

    /// Raw bytes from `start` (a previously observed offset) to the current offset.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::BlobFormat`] if `start` lies beyond the current offset.
    pub fn slice_from(&self, start: usize) -> Result<&'a [u8], CryptoError> {
        if start > self.offset {
            return Err(CryptoError::BlobFormat(format!(
                "capture start {start} is past cursor offset {}",
                self.offset
            )));
        }
        Ok(&self.data[start..self.offset])
    }
}
