//! Cipher primitives for the envelope scheme
//!
//! The 64-byte data key is split in half: the first 32 bytes key AES-256-CTR, the
//! last 32 bytes key HMAC-SHA256. The counter block starts at 12 zero bytes
//! followed by the big-endian `u32` 1, and the HMAC is taken over ciphertext bytes.

use aes::Aes256;
use ctr::cipher::{InvalidLength, KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type Aes256Ctr = ctr::Ctr128BE<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Size of the plaintext data key requested from the key-management service
pub const DATA_KEY_SIZE: usize = 64;

/// Size of each half of the data key
const HALF_KEY_SIZE: usize = 32;

/// Initial counter value
const INITIAL_COUNTER: u32 = 1;

/// Counter block: 12 zero bytes then the big-endian initial counter
pub fn initial_counter_block() -> [u8; 16] {
    let mut block = [0u8; 16];
    block[12..].copy_from_slice(&INITIAL_COUNTER.to_be_bytes());
    block
}

/// Split a data key into its (AES key, HMAC key) halves
pub fn split_data_key(data_key: &[u8]) -> Option<(&[u8], &[u8])> {
    (data_key.len() == DATA_KEY_SIZE).then(|| data_key.split_at(HALF_KEY_SIZE))
}

/// AES-256-CTR keystream applied to `data`; encryption and decryption are the same
/// operation.
pub fn aes_ctr(key: &[u8], data: &[u8]) -> Result<Vec<u8>, InvalidLength> {
    let counter = initial_counter_block();
    let mut cipher = Aes256Ctr::new_from_slices(key, &counter)?;
    let mut buffer = data.to_vec();
    cipher.apply_keystream(&mut buffer);
    Ok(buffer)
}

/// Hex-encoded HMAC-SHA256 of `data`
pub fn hmac_hex(key: &[u8], data: &[u8]) -> Result<String, hmac::digest::InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(key)?;
    mac.update(data);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time comparison of the HMAC of `data` against a hex tag.
///
/// Only the canonical lowercase form produced by [`hmac_hex`] verifies; padded,
/// uppercase or otherwise malformed tags are treated as corrupt.
pub fn verify_hmac(key: &[u8], data: &[u8], expected_hex: &str) -> bool {
    if !expected_hex
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    {
        return false;
    }
    let Ok(expected) = hex::decode(expected_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        return false;
    };
    mac.update(data);
    mac.verify_slice(&expected).is_ok()
}
