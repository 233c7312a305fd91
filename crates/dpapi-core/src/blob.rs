//! DPAPI blob binary layout and one-shot parser.
//!
//! # Layout (all integers `u32` little-endian)
//!
//! ```text
//! version | provider GUID (16 B)
//! ┌─ integrity region ────────────────────────────────────────────────────┐
//! │ mk count | mk GUID × count | flags | descr len | descr (UTF-16LE)     │
//! │ cipher ALG_ID | key len | data len | data | strong len | strong       │
//! │ hash ALG_ID | hash len | salt len | salt | cipher len | cipher text   │
//! └───────────────────────────────────────────────────────────────────────┘
//! crc len | crc
//! ```
//!
//! The integrity region is kept verbatim: it is the input the integrity code
//! was computed over, so it must never be re-encoded.

use crate::algorithm::{lookup, Algorithm};
use crate::cursor::ByteCursor;
use crate::error::CryptoError;
use crate::guid::{Guid, GUID_LEN};
use data_encoding::HEXLOWER;
use serde::{Serialize, Serializer};
use std::fmt;
use tracing::debug;

/// Smallest possible blob: version, provider, and twelve `u32` fields with
/// every length-prefixed field empty.
pub const MIN_BLOB_LEN: usize = 68;

/// A fully parsed blob. Immutable; decrypt attempts never modify it.
#[derive(Clone, Debug, Serialize)]
pub struct ParsedBlob {
    pub(crate) version: u32,
    pub(crate) provider: Guid,
    pub(crate) master_key_guids: Vec<Guid>,
    pub(crate) flags: u32,
    #[serde(skip)]
    pub(crate) description_raw: Vec<u8>,
    pub(crate) description: String,
    pub(crate) cipher_algorithm: &'static Algorithm,
    pub(crate) key_len: u32,
    #[serde(serialize_with = "as_hex")]
    pub(crate) data: Vec<u8>,
    #[serde(serialize_with = "as_hex")]
    pub(crate) strong: Vec<u8>,
    pub(crate) hash_algorithm: &'static Algorithm,
    pub(crate) hash_len: u32,
    #[serde(serialize_with = "as_hex")]
    pub(crate) salt: Vec<u8>,
    #[serde(serialize_with = "as_hex")]
    pub(crate) cipher_text: Vec<u8>,
    #[serde(skip)]
    pub(crate) integrity_region: Vec<u8>,
    #[serde(serialize_with = "as_hex")]
    pub(crate) crc: Vec<u8>,
}

impl ParsedBlob {
    /// Parse a buffer that holds exactly one blob.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::BlobFormat`] on truncation, a bad description,
    /// or trailing bytes after the crc field.
    /// Returns [`CryptoError::UnknownAlgorithm`] for an unregistered `ALG_ID`.
    pub fn parse(data: &[u8]) -> Result<Self, CryptoError> {
        let (blob, consumed) = Self::parse_prefix(data)?;
        if consumed != data.len() {
            return Err(CryptoError::BlobFormat(format!(
                "{} trailing bytes after blob ({consumed} consumed)",
                data.len().saturating_sub(consumed)
            )));
        }
        Ok(blob)
    }

    /// Parse a blob at the start of `data`, ignoring anything after it.
    ///
    /// Returns the blob and the number of bytes it occupies.
    ///
    /// # Errors
    ///
    /// Same as [`ParsedBlob::parse`], minus the trailing-bytes check.
    pub fn parse_prefix(data: &[u8]) -> Result<(Self, usize), CryptoError> {
        if data.len() < MIN_BLOB_LEN {
            return Err(CryptoError::BlobFormat(format!(
                "truncated blob: {} bytes, minimum is {MIN_BLOB_LEN}",
                data.len()
            )));
        }
        let mut cursor = ByteCursor::new(data);

        let version = cursor.read_u32_le()?;
        let provider = Guid::from_bytes(cursor.read_array()?);

        let region_start = cursor.offset();

        let count = cursor.read_u32_le()?;
        let master_key_guids = read_guids(&mut cursor, count)?;
        let flags = cursor.read_u32_le()?;

        let description_raw = cursor.read_length_prefixed()?.to_vec();
        let description = decode_utf16le(&description_raw)?;

        let cipher_algorithm = resolve(cursor.read_u32_le()?)?;
        let key_len = cursor.read_u32_le()?;
        let data_field = cursor.read_length_prefixed()?.to_vec();
        let strong = cursor.read_length_prefixed()?.to_vec();

        let hash_algorithm = resolve(cursor.read_u32_le()?)?;
        let hash_len = cursor.read_u32_le()?;
        let salt = cursor.read_length_prefixed()?.to_vec();
        let cipher_text = cursor.read_length_prefixed()?.to_vec();

        let integrity_region = cursor.slice_from(region_start)?.to_vec();

        let crc = cursor.read_length_prefixed()?.to_vec();

        debug!(
            version,
            master_keys = master_key_guids.len(),
            cipher = cipher_algorithm.name,
            hash = hash_algorithm.name,
            "parsed DPAPI blob"
        );

        let blob = Self {
            version,
            provider,
            master_key_guids,
            flags,
            description_raw,
            description,
            cipher_algorithm,
            key_len,
            data: data_field,
            strong,
            hash_algorithm,
            hash_len,
            salt,
            cipher_text,
            integrity_region,
            crc,
        };
        Ok((blob, cursor.offset()))
    }

    /// Blob format version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Provider GUID.
    #[must_use]
    pub const fn provider(&self) -> &Guid {
        &self.provider
    }

    /// Master key GUIDs, in stored order.
    #[must_use]
    pub fn master_key_guids(&self) -> &[Guid] {
        &self.master_key_guids
    }

    /// Opaque flags bitfield.
    #[must_use]
    pub const fn flags(&self) -> u32 {
        self.flags
    }

    /// Description as UTF-8, verbatim (including any trailing NUL).
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Description bytes as stored (UTF-16LE).
    #[must_use]
    pub fn description_raw(&self) -> &[u8] {
        &self.description_raw
    }

    /// Cipher descriptor.
    #[must_use]
    pub const fn cipher_algorithm(&self) -> &'static Algorithm {
        self.cipher_algorithm
    }

    /// Hash descriptor.
    #[must_use]
    pub const fn hash_algorithm(&self) -> &'static Algorithm {
        self.hash_algorithm
    }

    /// Declared cipher key length in bits (advisory).
    #[must_use]
    pub const fn key_len(&self) -> u32 {
        self.key_len
    }

    /// Declared hash length in bits (advisory).
    #[must_use]
    pub const fn hash_len(&self) -> u32 {
        self.hash_len
    }

    /// Session key salt.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Optional auxiliary input; empty when absent.
    #[must_use]
    pub fn strong(&self) -> &[u8] {
        &self.strong
    }

    /// Integrity salt.
    #[must_use]
    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// Encrypted payload.
    #[must_use]
    pub fn cipher_text(&self) -> &[u8] {
        &self.cipher_text
    }

    /// Expected integrity code.
    #[must_use]
    pub fn crc(&self) -> &[u8] {
        &self.crc
    }

    /// Raw bytes from the master key count through the end of the cipher text.
    #[must_use]
    pub fn integrity_region(&self) -> &[u8] {
        &self.integrity_region
    }

    /// Render the blob as pretty-printed JSON, byte fields in lowercase hex.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Serialization`] if JSON encoding fails.
    pub fn to_json(&self) -> Result<String, CryptoError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CryptoError::Serialization(format!("blob to JSON failed: {e}")))
    }
}

impl fmt::Display for ParsedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guids: Vec<String> = self.master_key_guids.iter().map(Guid::to_string).collect();
        writeln!(f, "DPAPI BLOB")?;
        writeln!(f, "\tversion     = {}", self.version)?;
        writeln!(f, "\tprovider    = {}", self.provider)?;
        writeln!(f, "\tmkey        = [{}]", guids.join(", "))?;
        writeln!(f, "\tflags       = {:#x}", self.flags)?;
        writeln!(f, "\tdescr       = {}", self.description.trim_end_matches('\0'))?;
        writeln!(f, "\tcipherAlgo  = {}", self.cipher_algorithm)?;
        writeln!(f, "\thashAlgo    = {}", self.hash_algorithm)?;
        writeln!(f, "\tdata        = {}", HEXLOWER.encode(&self.data))?;
        writeln!(f, "\tsalt        = {}", HEXLOWER.encode(&self.salt))?;
        writeln!(f, "\tcipher      = {}", HEXLOWER.encode(&self.cipher_text))?;
        write!(f, "\tcrc         = {}", HEXLOWER.encode(&self.crc))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_guids(cursor: &mut ByteCursor<'_>, count: u32) -> Result<Vec<Guid>, CryptoError> {
    let count = usize::try_from(count)
        .map_err(|_| CryptoError::BlobFormat("master key count exceeds platform usize".into()))?;

    // Reject impossible counts before allocating.
    let needed = count
        .checked_mul(GUID_LEN)
        .ok_or_else(|| CryptoError::BlobFormat("master key count overflow".into()))?;
    if needed > cursor.remaining() {
        return Err(CryptoError::BlobFormat(format!(
            "truncated blob: {count} master key GUIDs need {needed} bytes, {} available",
            cursor.remaining()
        )));
    }

    (0..count)
        .map(|_| cursor.read_array().map(Guid::from_bytes))
        .collect()
}

fn decode_utf16le(raw: &[u8]) -> Result<String, CryptoError> {
    if raw.len() & 1 != 0 {
        return Err(CryptoError::BlobFormat(format!(
            "description has odd UTF-16 length: {} bytes",
            raw.len()
        )));
    }

    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    String::from_utf16(&units)
        .map_err(|e| CryptoError::BlobFormat(format!("description is not valid UTF-16: {e}")))
}

fn resolve(id: u32) -> Result<&'static Algorithm, CryptoError> {
    lookup(id).ok_or(CryptoError::UnknownAlgorithm(id))
}

fn as_hex<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&HEXLOWER.encode(bytes))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
