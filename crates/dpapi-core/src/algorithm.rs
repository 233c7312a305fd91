//! CryptoAPI `ALG_ID` registry.
//!
//! This module provides:
//! - [`Algorithm`]: static descriptor (name, kind, key/IV/block/digest lengths)
//! - [`lookup`]: resolve a 32-bit `ALG_ID` to its descriptor
//! - [`REGISTRY`]: the immutable table itself
//!
//! All lengths are in bytes. Presence in the registry means the identifier can
//! be parsed; [`Algorithm::is_supported`] tells whether this build can actually
//! run the primitive.

use serde::Serialize;
use std::fmt;

/// `CALG_DES`
pub const CALG_DES: u32 = 0x6601;
/// `CALG_RC2`
pub const CALG_RC2: u32 = 0x6602;
/// `CALG_3DES`
pub const CALG_3DES: u32 = 0x6603;
/// `CALG_3DES_112`
pub const CALG_3DES_112: u32 = 0x6609;
/// `CALG_AES_128`
pub const CALG_AES_128: u32 = 0x660e;
/// `CALG_AES_192`
pub const CALG_AES_192: u32 = 0x660f;
/// `CALG_AES_256`
pub const CALG_AES_256: u32 = 0x6610;
/// `CALG_RC4`
pub const CALG_RC4: u32 = 0x6801;
/// `CALG_MD5`
pub const CALG_MD5: u32 = 0x8003;
/// `CALG_SHA1`
pub const CALG_SHA1: u32 = 0x8004;
/// `CALG_HMAC`: SHA-1 backed in DPAPI blobs.
pub const CALG_HMAC: u32 = 0x8009;
/// `CALG_SHA_256`
pub const CALG_SHA_256: u32 = 0x800c;
/// `CALG_SHA_384`
pub const CALG_SHA_384: u32 = 0x800d;
/// `CALG_SHA_512`
pub const CALG_SHA_512: u32 = 0x800e;

/// Broad family of an algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    /// Block cipher, used in CBC mode.
    BlockCipher,
    /// Stream cipher.
    StreamCipher,
    /// Hash function.
    Hash,
}

/// Static descriptor for one `ALG_ID`.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Algorithm {
    /// Numeric `ALG_ID` as stored in the blob.
    pub id: u32,
    /// Display name.
    pub name: &'static str,
    /// Cipher or hash.
    pub kind: AlgorithmKind,
    /// Cipher key length; 0 for hashes.
    pub key_len: usize,
    /// Cipher IV length; 0 for hashes and stream ciphers.
    pub iv_len: usize,
    /// Cipher block size, or hash input block size.
    pub block_len: usize,
    /// Hash output length; 0 for ciphers.
    pub digest_len: usize,
}

const fn block_cipher(id: u32, name: &'static str, key_len: usize, block_len: usize) -> Algorithm {
    Algorithm {
        id,
        name,
        kind: AlgorithmKind::BlockCipher,
        key_len,
        iv_len: block_len,
        block_len,
        digest_len: 0,
    }
}

const fn hash(id: u32, name: &'static str, digest_len: usize, block_len: usize) -> Algorithm {
    Algorithm {
        id,
        name,
        kind: AlgorithmKind::Hash,
        key_len: 0,
        iv_len: 0,
        block_len,
        digest_len,
    }
}

/// Every `ALG_ID` this crate can parse.
pub static REGISTRY: &[Algorithm] = &[
    block_cipher(CALG_DES, "DES", 8, 8),
    block_cipher(CALG_RC2, "RC2", 16, 8),
    block_cipher(CALG_3DES, "3DES", 24, 8),
    block_cipher(CALG_3DES_112, "3DES-112", 16, 8),
    block_cipher(CALG_AES_128, "AES-128", 16, 16),
    block_cipher(CALG_AES_192, "AES-192", 24, 16),
    block_cipher(CALG_AES_256, "AES-256", 32, 16),
    Algorithm {
        id: CALG_RC4,
        name: "RC4",
        kind: AlgorithmKind::StreamCipher,
        key_len: 16,
        iv_len: 0,
        block_len: 1,
        digest_len: 0,
    },
    hash(CALG_MD5, "MD5", 16, 64),
    hash(CALG_SHA1, "SHA1", 20, 64),
    hash(CALG_HMAC, "HMAC", 20, 64),
    hash(CALG_SHA_256, "SHA-256", 32, 64),
    hash(CALG_SHA_384, "SHA-384", 48, 128),
    hash(CALG_SHA_512, "SHA-512", 64, 128),
];

/// Resolve an `ALG_ID`. Returns `None` for identifiers outside [`REGISTRY`].
#[must_use]
pub fn lookup(id: u32) -> Option<&'static Algorithm> {
    REGISTRY.iter().find(|algo| algo.id == id)
}

impl Algorithm {
    /// `true` for block and stream ciphers.
    #[must_use]
    pub const fn is_cipher(&self) -> bool {
        matches!(
            self.kind,
            AlgorithmKind::BlockCipher | AlgorithmKind::StreamCipher
        )
    }

    /// `true` for hash functions.
    #[must_use]
    pub const fn is_hash(&self) -> bool {
        matches!(self.kind, AlgorithmKind::Hash)
    }

    /// `true` for the DES family, whose keys carry odd-parity bits.
    #[must_use]
    pub const fn is_des_family(&self) -> bool {
        matches!(self.id, CALG_DES | CALG_3DES | CALG_3DES_112)
    }

    /// Whether this build has a primitive for the algorithm.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        matches!(
            self.id,
            CALG_DES
                | CALG_3DES
                | CALG_3DES_112
                | CALG_AES_128
                | CALG_AES_192
                | CALG_AES_256
                | CALG_SHA1
                | CALG_HMAC
                | CALG_SHA_256
                | CALG_SHA_384
                | CALG_SHA_512
        )
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#06x})", self.name, self.id)
    }
}
