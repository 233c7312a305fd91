//! Blob decryption across key-derivation generations.
//!
//! For each strategy, in order:
//! 1. session key = `derive(master, data, hash, entropy, auxiliary)`
//! 2. cipher key = [`derive_cipher_key`]
//! 3. CBC-decrypt the cipher text; a cipher failure moves on to the next strategy
//! 4. integrity = `derive(master, salt, hash, entropy, integrity region)`
//! 5. stop at the first strategy whose integrity value equals the stored crc
//!
//! A wrong master secret never surfaces as an error, only as
//! `decrypted == false`. Errors are reserved for blobs this build cannot
//! attempt at all.

use crate::blob::ParsedBlob;
use crate::cipher;
use crate::error::CryptoError;
use crate::kdf::{derive_cipher_key, Generation, SessionKeyDerivation};
use data_encoding::HEXLOWER;
use ring::constant_time::verify_slices_are_equal;
use secrecy::{ExposeSecret, SecretSlice};
use std::fmt;
use tracing::{debug, trace};

/// Result of one [`ParsedBlob::decrypt`] call.
///
/// Produced fresh on every call; the blob itself is never mutated.
#[must_use = "check `is_decrypted` before using the outcome"]
#[derive(Debug)]
pub struct DecryptionOutcome {
    decrypted: bool,
    cleartext: Option<SecretSlice<u8>>,
    crc_computed: Option<Vec<u8>>,
    generation: Option<&'static str>,
}

impl DecryptionOutcome {
    const fn failed(crc_computed: Option<Vec<u8>>) -> Self {
        Self {
            decrypted: false,
            cleartext: None,
            crc_computed,
            generation: None,
        }
    }

    /// `true` iff the computed integrity value matched the stored crc.
    #[must_use]
    pub const fn is_decrypted(&self) -> bool {
        self.decrypted
    }

    /// Recovered plaintext; `None` unless [`Self::is_decrypted`].
    #[must_use]
    pub fn cleartext(&self) -> Option<&[u8]> {
        self.cleartext.as_ref().map(|secret| secret.expose_secret())
    }

    /// Take ownership of the recovered plaintext.
    #[must_use]
    pub fn into_cleartext(self) -> Option<SecretSlice<u8>> {
        self.cleartext
    }

    /// Integrity value from the last attempt whose cipher step succeeded.
    #[must_use]
    pub fn crc_computed(&self) -> Option<&[u8]> {
        self.crc_computed.as_deref()
    }

    /// Name of the strategy that produced the plaintext.
    #[must_use]
    pub const fn generation(&self) -> Option<&'static str> {
        self.generation
    }
}

/// Companion to the blob dump. The cleartext is reported by length only.
impl fmt::Display for DecryptionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\tdecrypted   = {}", self.decrypted)?;
        write!(f, "\tgeneration  = {}", self.generation.unwrap_or("-"))?;
        if let Some(crc) = &self.crc_computed {
            write!(f, "\n\tcrcComputed = {}", HEXLOWER.encode(crc))?;
        }
        if let Some(clear) = &self.cleartext {
            write!(f, "\n\tcleartext   = <{} bytes>", clear.expose_secret().len())?;
        }
        Ok(())
    }
}

impl ParsedBlob {
    /// Decrypt with `master_secret`, trying [`Generation::ORDER`].
    ///
    /// `entropy` is the optional application entropy; `auxiliary` the optional
    /// strong-password input. Both default to absent.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::UnsupportedAlgorithm`] if the blob's cipher or
    /// hash cannot run in this build, or [`CryptoError::KeyDerivation`] if a
    /// usable cipher key cannot be produced. A wrong key is `Ok` with
    /// `is_decrypted() == false`.
    pub fn decrypt(
        &self,
        master_secret: &[u8],
        entropy: Option<&[u8]>,
        auxiliary: Option<&[u8]>,
    ) -> Result<DecryptionOutcome, CryptoError> {
        let strategies: Vec<&dyn SessionKeyDerivation> = Generation::ORDER
            .iter()
            .map(|generation| generation as &dyn SessionKeyDerivation)
            .collect();
        self.decrypt_with(&strategies, master_secret, entropy, auxiliary)
    }

    /// Decrypt with an explicit, ordered list of derivation strategies.
    ///
    /// # Errors
    ///
    /// Same as [`ParsedBlob::decrypt`].
    pub fn decrypt_with(
        &self,
        strategies: &[&dyn SessionKeyDerivation],
        master_secret: &[u8],
        entropy: Option<&[u8]>,
        auxiliary: Option<&[u8]>,
    ) -> Result<DecryptionOutcome, CryptoError> {
        self.ensure_supported()?;

        let mut crc_computed = None;

        for strategy in strategies {
            debug!(generation = strategy.name(), "attempting blob decryption");

            let session_key =
                strategy.derive(master_secret, &self.data, self.hash_algorithm, entropy, auxiliary)?;
            let cipher_key =
                derive_cipher_key(&session_key, self.cipher_algorithm, self.hash_algorithm)?;

            let mut plaintext =
                match cipher::decrypt_cbc(self.cipher_algorithm, &cipher_key, &self.cipher_text) {
                    Ok(plaintext) => plaintext,
                    Err(CryptoError::Decryption) => {
                        trace!(generation = strategy.name(), "cipher rejected key");
                        continue;
                    }
                    Err(e) => return Err(e),
                };

            let computed = strategy.derive(
                master_secret,
                &self.salt,
                self.hash_algorithm,
                entropy,
                Some(self.integrity_region.as_slice()),
            )?;
            let matches = verify_slices_are_equal(&computed, &self.crc).is_ok();
            crc_computed = Some(computed.to_vec());

            if matches {
                debug!(generation = strategy.name(), "integrity check passed");
                let cleartext = SecretSlice::from(std::mem::take(&mut *plaintext));
                return Ok(DecryptionOutcome {
                    decrypted: true,
                    cleartext: Some(cleartext),
                    crc_computed,
                    generation: Some(strategy.name()),
                });
            }

            trace!(generation = strategy.name(), "integrity check failed");
        }

        debug!("no generation produced a matching integrity code");
        Ok(DecryptionOutcome::failed(crc_computed))
    }

    fn ensure_supported(&self) -> Result<(), CryptoError> {
        let cipher = self.cipher_algorithm;
        if !cipher.is_cipher() || !cipher.is_supported() {
            return Err(CryptoError::UnsupportedAlgorithm(format!(
                "cannot decrypt with {cipher}"
            )));
        }
        let hash = self.hash_algorithm;
        if !hash.is_hash() || !hash.is_supported() {
            return Err(CryptoError::UnsupportedAlgorithm(format!(
                "cannot derive keys with {hash}"
            )));
        }
        Ok(())
    }
}
