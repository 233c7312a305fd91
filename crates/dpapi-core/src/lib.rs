//! `dpapi-core`: offline parsing and decryption of DPAPI blobs.
//!
//! Given a captured blob and a previously recovered master key, this crate
//! parses the blob's binary layout and recovers its plaintext without the
//! originating Windows host. Pure computation: zero network, zero async,
//! zero file I/O.
//!
//! ```no_run
//! # fn demo(raw: &[u8], master_key: &[u8]) -> Result<(), dpapi_core::CryptoError> {
//! let blob = dpapi_core::ParsedBlob::parse(raw)?;
//! let outcome = blob.decrypt(master_key, None, None)?;
//! if let Some(plaintext) = outcome.cleartext() {
//!     println!("{} bytes recovered", plaintext.len());
//! }
//! # Ok(())
//! # }
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;

pub mod cursor;
pub mod guid;

pub mod algorithm;
pub mod cipher;
pub mod kdf;

pub mod blob;
pub mod decrypt;

pub use algorithm::{lookup, Algorithm, AlgorithmKind, REGISTRY};
pub use blob::{ParsedBlob, MIN_BLOB_LEN};
pub use cursor::ByteCursor;
pub use decrypt::DecryptionOutcome;
pub use error::CryptoError;
pub use guid::{format_guid, Guid, GUID_LEN};
pub use kdf::{derive_cipher_key, Generation, SessionKeyDerivation};
