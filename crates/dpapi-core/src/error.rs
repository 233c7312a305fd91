//! Error types for `dpapi-core`.

use thiserror::Error;

/// Errors produced while parsing or decrypting a DPAPI blob.
///
/// A wrong master secret is *not* an error: [`crate::ParsedBlob::decrypt`]
/// reports it through [`crate::DecryptionOutcome::decrypted`].
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Malformed blob bytes (truncation, bad length prefix, invalid description).
    #[error("blob format error: {0}")]
    BlobFormat(String),

    /// Algorithm identifier not present in the registry.
    #[error("unknown algorithm identifier: {0:#06x}")]
    UnknownAlgorithm(u32),

    /// Algorithm is known but cannot be used for this operation in this build.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Session key or cipher key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Symmetric decryption failed: bad padding or misaligned ciphertext.
    #[error("decryption failed: bad padding or malformed ciphertext")]
    Decryption,

    /// JSON rendering of a parsed blob failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}
