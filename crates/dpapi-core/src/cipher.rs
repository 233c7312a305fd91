//! CBC decryption with a zero IV and PKCS#7 unpadding.
//!
//! DPAPI blobs never carry an IV: every supported block cipher runs in CBC
//! mode with an all-zero IV of the cipher's block length.

use crate::algorithm::{
    Algorithm, AlgorithmKind, CALG_3DES, CALG_3DES_112, CALG_AES_128, CALG_AES_192, CALG_AES_256,
    CALG_DES,
};
use crate::error::CryptoError;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockCipher, BlockDecryptMut, KeyInit, KeyIvInit};
use zeroize::Zeroizing;

/// Decrypt `ciphertext` under `key` with the cipher described by `algorithm`.
///
/// `key` must be exactly `algorithm.key_len` bytes.
///
/// # Errors
///
/// Returns [`CryptoError::UnsupportedAlgorithm`] if `algorithm` is not a block
/// cipher available in this build.
/// Returns [`CryptoError::Decryption`] if the key length is wrong, the
/// ciphertext is not block-aligned, or the padding is invalid.
pub fn decrypt_cbc(
    algorithm: &Algorithm,
    key: &[u8],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if algorithm.kind != AlgorithmKind::BlockCipher {
        return Err(CryptoError::UnsupportedAlgorithm(format!(
            "{algorithm} is not a block cipher"
        )));
    }

    let iv = vec![0u8; algorithm.iv_len];
    match algorithm.id {
        CALG_DES => open::<des::Des>(key, &iv, ciphertext),
        CALG_3DES => open::<des::TdesEde3>(key, &iv, ciphertext),
        CALG_3DES_112 => open::<des::TdesEde2>(key, &iv, ciphertext),
        CALG_AES_128 => open::<aes::Aes128>(key, &iv, ciphertext),
        CALG_AES_192 => open::<aes::Aes192>(key, &iv, ciphertext),
        CALG_AES_256 => open::<aes::Aes256>(key, &iv, ciphertext),
        _ => Err(CryptoError::UnsupportedAlgorithm(format!(
            "no cipher implementation for {algorithm}"
        ))),
    }
}

fn open<C>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError>
where
    C: BlockCipher + BlockDecryptMut + KeyInit,
{
    let decryptor =
        cbc::Decryptor::<C>::new_from_slices(key, iv).map_err(|_| CryptoError::Decryption)?;

    let mut buf = Zeroizing::new(ciphertext.to_vec());
    let plaintext = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|_| CryptoError::Decryption)?;

    Ok(Zeroizing::new(plaintext.to_vec()))
}
