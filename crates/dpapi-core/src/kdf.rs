//! DPAPI session-key derivation.
//!
//! This module provides:
//! - [`SessionKeyDerivation`]: one derivation scheme (strategy seam)
//! - [`Generation`]: the two historical schemes, tried in [`Generation::ORDER`]
//! - [`derive_cipher_key`]: `CryptDeriveKey`-style expansion of a session key
//!
//! # Schemes
//!
//! Both generations first replace a master secret longer than 20 bytes with
//! its SHA-1 digest.
//!
//! - **Legacy**: `H((k ^ opad) || H((k ^ ipad) || salt) || entropy || aux)`.
//!   Entropy and auxiliary input land in the *outer* hash only.
//! - **Modern**: `HMAC_H(k, salt || entropy || aux)`.
//!
//! With no entropy and no auxiliary input the two coincide with plain HMAC.

use crate::algorithm::{Algorithm, CALG_HMAC, CALG_SHA1, CALG_SHA_256, CALG_SHA_384, CALG_SHA_512};
use crate::error::CryptoError;
use ring::{digest, hmac};
use serde::Serialize;
use std::fmt;
use zeroize::Zeroizing;

/// Master secrets longer than this are pre-hashed with SHA-1.
pub const MAX_RAW_MASTER_LEN: usize = 20;

const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5c;

// ---------------------------------------------------------------------------
// Strategy seam
// ---------------------------------------------------------------------------

/// One session-key derivation scheme.
///
/// The same primitive doubles as the blob's integrity function: the decrypt
/// path calls it a second time with the blob's integrity region as
/// `auxiliary` and the blob's HMAC salt as `salt`.
pub trait SessionKeyDerivation {
    /// Short name used in logs and outcomes.
    fn name(&self) -> &'static str;

    /// Derive a session key (or integrity value) from the master secret.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::UnsupportedAlgorithm`] if `hash` has no
    /// primitive in this build.
    fn derive(
        &self,
        master_secret: &[u8],
        salt: &[u8],
        hash: &Algorithm,
        entropy: Option<&[u8]>,
        auxiliary: Option<&[u8]>,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError>;
}

/// Historical DPAPI session-key schemes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Generation {
    /// Pre-Vista construction: hand-rolled ipad/opad with extra inputs in the outer hash.
    Legacy,
    /// Vista and later: straight HMAC over all inputs.
    Modern,
}

impl Generation {
    /// Order in which generations are attempted.
    pub const ORDER: [Self; 2] = [Self::Legacy, Self::Modern];
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl SessionKeyDerivation for Generation {
    fn name(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Modern => "modern",
        }
    }

    fn derive(
        &self,
        master_secret: &[u8],
        salt: &[u8],
        hash: &Algorithm,
        entropy: Option<&[u8]>,
        auxiliary: Option<&[u8]>,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let key = normalize_master(master_secret);
        match self {
            Self::Legacy => derive_legacy(&key, salt, hash, entropy, auxiliary),
            Self::Modern => derive_modern(&key, salt, hash, entropy, auxiliary),
        }
    }
}

// ---------------------------------------------------------------------------
// Generations
// ---------------------------------------------------------------------------

fn derive_legacy(
    key: &[u8],
    salt: &[u8],
    hash: &Algorithm,
    entropy: Option<&[u8]>,
    auxiliary: Option<&[u8]>,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let algorithm = digest_algorithm(hash)?;

    let mut padded = Zeroizing::new(key.to_vec());
    padded.resize(hash.block_len, 0);
    let ipad = xor_pad(&padded, IPAD);
    let opad = xor_pad(&padded, OPAD);

    let mut inner = digest::Context::new(algorithm);
    inner.update(&ipad);
    inner.update(salt);
    let inner = inner.finish();

    let mut outer = digest::Context::new(algorithm);
    outer.update(&opad);
    outer.update(inner.as_ref());
    if let Some(entropy) = entropy {
        outer.update(entropy);
    }
    if let Some(auxiliary) = auxiliary {
        outer.update(auxiliary);
    }

    Ok(Zeroizing::new(outer.finish().as_ref().to_vec()))
}

fn derive_modern(
    key: &[u8],
    salt: &[u8],
    hash: &Algorithm,
    entropy: Option<&[u8]>,
    auxiliary: Option<&[u8]>,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let hmac_key = hmac::Key::new(hmac_algorithm(hash)?, key);

    let mut ctx = hmac::Context::with_key(&hmac_key);
    ctx.update(salt);
    if let Some(entropy) = entropy {
        ctx.update(entropy);
    }
    if let Some(auxiliary) = auxiliary {
        ctx.update(auxiliary);
    }

    Ok(Zeroizing::new(ctx.sign().as_ref().to_vec()))
}

// ---------------------------------------------------------------------------
// Cipher key
// ---------------------------------------------------------------------------

/// Turn a session key into a key of exactly `cipher.key_len` bytes.
///
/// A session key longer than the hash block is hashed first. If the result
/// already covers the cipher key length it is truncated; otherwise it is
/// expanded to `H(k ^ ipad) || H(k ^ opad)` over a zero-padded block, with
/// DES-family parity fixup.
///
/// # Errors
///
/// Returns [`CryptoError::UnsupportedAlgorithm`] if `hash` has no primitive,
/// or [`CryptoError::KeyDerivation`] if the expansion is still too short for
/// the cipher.
pub fn derive_cipher_key(
    session_key: &[u8],
    cipher: &Algorithm,
    hash: &Algorithm,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let algorithm = digest_algorithm(hash)?;

    let mut key = if session_key.len() > hash.block_len {
        Zeroizing::new(digest::digest(algorithm, session_key).as_ref().to_vec())
    } else {
        Zeroizing::new(session_key.to_vec())
    };

    if key.len() < cipher.key_len {
        key.resize(hash.block_len, 0);
        let ipad = xor_pad(&key, IPAD);
        let opad = xor_pad(&key, OPAD);

        let mut expanded = Zeroizing::new(Vec::with_capacity(hash.digest_len.saturating_mul(2)));
        expanded.extend_from_slice(digest::digest(algorithm, &ipad).as_ref());
        expanded.extend_from_slice(digest::digest(algorithm, &opad).as_ref());
        if cipher.is_des_family() {
            set_odd_parity(&mut expanded);
        }
        key = expanded;
    }

    if key.len() < cipher.key_len {
        return Err(CryptoError::KeyDerivation(format!(
            "derived key too short for {}: {} bytes (need {})",
            cipher.name,
            key.len(),
            cipher.key_len
        )));
    }

    key.truncate(cipher.key_len);
    Ok(key)
}

/// Force odd parity on every byte (DES key convention).
pub fn set_odd_parity(key: &mut [u8]) {
    for byte in key.iter_mut() {
        let high = *byte & 0xFE;
        *byte = high | u8::from(high.count_ones() & 1 == 0);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn normalize_master(master_secret: &[u8]) -> Zeroizing<Vec<u8>> {
    if master_secret.len() > MAX_RAW_MASTER_LEN {
        let sha1 = digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, master_secret);
        Zeroizing::new(sha1.as_ref().to_vec())
    } else {
        Zeroizing::new(master_secret.to_vec())
    }
}

fn xor_pad(key: &[u8], pad: u8) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(key.iter().map(|b| b ^ pad).collect())
}

fn digest_algorithm(hash: &Algorithm) -> Result<&'static digest::Algorithm, CryptoError> {
    match hash.id {
        CALG_SHA1 | CALG_HMAC => Ok(&digest::SHA1_FOR_LEGACY_USE_ONLY),
        CALG_SHA_256 => Ok(&digest::SHA256),
        CALG_SHA_384 => Ok(&digest::SHA384),
        CALG_SHA_512 => Ok(&digest::SHA512),
        _ => Err(CryptoError::UnsupportedAlgorithm(format!(
            "{hash} is not an available hash"
        ))),
    }
}

fn hmac_algorithm(hash: &Algorithm) -> Result<hmac::Algorithm, CryptoError> {
    match hash.id {
        CALG_SHA1 | CALG_HMAC => Ok(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY),
        CALG_SHA_256 => Ok(hmac::HMAC_SHA256),
        CALG_SHA_384 => Ok(hmac::HMAC_SHA384),
        CALG_SHA_512 => Ok(hmac::HMAC_SHA512),
        _ => Err(CryptoError::UnsupportedAlgorithm(format!(
            "{hash} is not an available hash"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
