//! Integrity-code verification: tampering anywhere in the region or crc fails.

use crate::common::{put_field, BlobSpec, MASTER_SECRET, REGION_START};
use dpapi_core::algorithm::{CALG_3DES, CALG_AES_128, CALG_SHA1, CALG_SHA_256};
use dpapi_core::{cipher, derive_cipher_key, Generation, ParsedBlob, SessionKeyDerivation};

const PLAINTEXT: &[u8] = b"integrity protected secret";

#[test]
fn flipped_crc_byte_rejects_correct_key() {
    let spec = BlobSpec::aes128_sha1();
    let sealed = spec.seal(&MASTER_SECRET, PLAINTEXT, Generation::Legacy, None, None);

    let mut raw = sealed.raw.clone();
    let last = raw.len() - 1;
    raw[last] ^= 0x01;
    let blob = ParsedBlob::parse(&raw).unwrap();

    let outcome = blob.decrypt(&MASTER_SECRET, None, None).unwrap();
    assert!(!outcome.is_decrypted());
    assert!(outcome.cleartext().is_none());
    assert_ne!(outcome.crc_computed(), Some(blob.crc()));

    // Both cipher steps succeed here (identical session keys), so the
    // recorded value is the modern one over the untouched region.
    let modern_crc = Generation::Modern
        .derive(
            &MASTER_SECRET,
            blob.salt(),
            blob.hash_algorithm(),
            None,
            Some(blob.integrity_region()),
        )
        .unwrap();
    assert_eq!(outcome.crc_computed(), Some(modern_crc.as_slice()));

    // The legacy value over the same region is the untampered crc.
    let legacy_crc = Generation::Legacy
        .derive(
            &MASTER_SECRET,
            blob.salt(),
            blob.hash_algorithm(),
            None,
            Some(blob.integrity_region()),
        )
        .unwrap();
    assert_eq!(legacy_crc.as_slice(), sealed.crc.as_slice());

    // The cipher step alone would have recovered the plaintext.
    let session = Generation::Legacy
        .derive(
            &MASTER_SECRET,
            blob.data(),
            blob.hash_algorithm(),
            None,
            None,
        )
        .unwrap();
    let key = derive_cipher_key(&session, blob.cipher_algorithm(), blob.hash_algorithm()).unwrap();
    let plaintext = cipher::decrypt_cbc(blob.cipher_algorithm(), &key, blob.cipher_text()).unwrap();
    assert_eq!(plaintext.as_slice(), PLAINTEXT);
}

#[test]
fn tampered_flags_break_integrity() {
    let spec = BlobSpec::with_algorithms(CALG_3DES, CALG_SHA1);
    let sealed = spec.seal(&MASTER_SECRET, PLAINTEXT, Generation::Modern, None, None);

    // flags sit right after the (empty) master key list
    let flags_at = REGION_START + 4;
    let mut raw = sealed.raw.clone();
    raw[flags_at] ^= 0x04;
    let blob = ParsedBlob::parse(&raw).unwrap();
    assert_eq!(blob.flags(), 0x04);

    let outcome = blob.decrypt(&MASTER_SECRET, None, None).unwrap();
    assert!(!outcome.is_decrypted());
    assert_ne!(outcome.crc_computed(), Some(sealed.crc.as_slice()));
}

#[test]
fn tampered_description_breaks_integrity() {
    let mut spec = BlobSpec::with_algorithms(CALG_AES_128, CALG_SHA_256);
    spec.description = "original".to_string();
    let sealed = spec.seal(&MASTER_SECRET, PLAINTEXT, Generation::Modern, None, None);

    let mut forged = spec.clone();
    forged.description = "0riginal".to_string();
    let raw = forged.assemble(&sealed.cipher_text, &sealed.crc);
    let blob = ParsedBlob::parse(&raw).unwrap();
    assert_eq!(blob.description(), "0riginal");

    let outcome = blob.decrypt(&MASTER_SECRET, None, None).unwrap();
    assert!(!outcome.is_decrypted());
}

#[test]
fn region_ends_where_crc_field_begins() {
    let mut spec = BlobSpec::aes128_sha1();
    spec.master_keys = vec![[0x11; 16]];
    spec.strong = vec![0xEE; 8];
    let sealed = spec.seal(&MASTER_SECRET, PLAINTEXT, Generation::Legacy, None, None);
    let blob = ParsedBlob::parse(&sealed.raw).unwrap();

    let crc_field_len = 4 + sealed.crc.len();
    let expected = &sealed.raw[REGION_START..sealed.raw.len() - crc_field_len];
    assert_eq!(blob.integrity_region(), expected);

    let mut tail = Vec::new();
    put_field(&mut tail, blob.crc());
    assert!(sealed.raw.ends_with(&tail));
}

#[test]
fn truncated_crc_is_a_mismatch_not_an_error() {
    let spec = BlobSpec::aes128_sha1();
    let sealed = spec.seal(&MASTER_SECRET, PLAINTEXT, Generation::Legacy, None, None);

    let raw = spec.assemble(&sealed.cipher_text, &sealed.crc[..10]);
    let blob = ParsedBlob::parse(&raw).unwrap();
    let outcome = blob.decrypt(&MASTER_SECRET, None, None).unwrap();
    assert!(!outcome.is_decrypted());
}
