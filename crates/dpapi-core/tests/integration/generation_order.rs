//! Strategy ordering through `ParsedBlob::decrypt_with`.

use std::cell::RefCell;

use crate::common::{BlobSpec, MASTER_SECRET};
use dpapi_core::algorithm::{CALG_AES_256, CALG_SHA_512};
use dpapi_core::{Algorithm, CryptoError, Generation, ParsedBlob, SessionKeyDerivation};
use zeroize::Zeroizing;

const PLAINTEXT: &[u8] = b"ordered attempts";
const ENTROPY: &[u8] = b"entropy";

/// Delegates to a real generation and records every call.
struct Recording<'a> {
    inner: Generation,
    calls: &'a RefCell<Vec<&'static str>>,
}

impl SessionKeyDerivation for Recording<'_> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn derive(
        &self,
        master_secret: &[u8],
        salt: &[u8],
        hash: &Algorithm,
        entropy: Option<&[u8]>,
        auxiliary: Option<&[u8]>,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        self.calls.borrow_mut().push(self.inner.name());
        self.inner
            .derive(master_secret, salt, hash, entropy, auxiliary)
    }
}

fn sealed_blob(generation: Generation, entropy: Option<&[u8]>) -> ParsedBlob {
    let spec = BlobSpec::with_algorithms(CALG_AES_256, CALG_SHA_512);
    let sealed = spec.seal(&MASTER_SECRET, PLAINTEXT, generation, entropy, None);
    ParsedBlob::parse(&sealed.raw).unwrap()
}

fn run(
    blob: &ParsedBlob,
    master: &[u8],
    entropy: Option<&[u8]>,
) -> (dpapi_core::DecryptionOutcome, Vec<&'static str>) {
    let calls = RefCell::new(Vec::new());
    let legacy = Recording {
        inner: Generation::Legacy,
        calls: &calls,
    };
    let modern = Recording {
        inner: Generation::Modern,
        calls: &calls,
    };
    let strategies: [&dyn SessionKeyDerivation; 2] = [&legacy, &modern];
    let outcome = blob
        .decrypt_with(&strategies, master, entropy, None)
        .unwrap();
    (outcome, calls.into_inner())
}

#[test]
fn default_order_is_legacy_then_modern() {
    assert_eq!(Generation::ORDER, [Generation::Legacy, Generation::Modern]);
}

#[test]
fn legacy_success_skips_modern() {
    let blob = sealed_blob(Generation::Legacy, Some(ENTROPY));
    let (outcome, calls) = run(&blob, &MASTER_SECRET, Some(ENTROPY));

    assert!(outcome.is_decrypted());
    assert_eq!(outcome.generation(), Some("legacy"));
    assert!(calls.iter().all(|name| *name == "legacy"), "{calls:?}");
}

#[test]
fn modern_runs_after_legacy_misses() {
    let blob = sealed_blob(Generation::Modern, Some(ENTROPY));
    let (outcome, calls) = run(&blob, &MASTER_SECRET, Some(ENTROPY));

    assert!(outcome.is_decrypted());
    assert_eq!(outcome.generation(), Some("modern"));
    assert_eq!(calls.first(), Some(&"legacy"));
    assert_eq!(calls.last(), Some(&"modern"));
}

#[test]
fn wrong_key_tries_every_generation() {
    let blob = sealed_blob(Generation::Modern, None);
    let (outcome, calls) = run(&blob, &[0x13; 64], None);

    assert!(!outcome.is_decrypted());
    assert!(calls.contains(&"legacy"));
    assert!(calls.contains(&"modern"));
    let first_modern = calls.iter().position(|name| *name == "modern").unwrap();
    assert!(calls[..first_modern].iter().all(|name| *name == "legacy"));
}
