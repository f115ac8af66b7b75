//! Envelope encryption
//!
//! A fresh 64-byte data key is generated by the key-management service for every
//! secret, scoped to the encryption context. Half of it encrypts the secret with
//! AES-256-CTR, the other half authenticates the ciphertext with HMAC-SHA256. Only
//! the wrapped form of the data key is persisted.

pub mod cipher;
mod envelope;
pub mod kms;

pub use envelope::KmsEncryption;
pub use kms::AwsKms;

use crate::security::Secret;
use async_trait::async_trait;
use credstash_core::{Credential, EncryptionContext, Result};
use zeroize::Zeroizing;

/// A data key as returned by the key-management service
pub struct DataKey {
    /// Plaintext key material, wiped on drop
    pub plaintext: Zeroizing<Vec<u8>>,
    /// Opaque wrapped form, safe to persist
    pub ciphertext_blob: Vec<u8>,
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataKey")
            .field("plaintext", &format_args!("[REDACTED {} bytes]", self.plaintext.len()))
            .field("ciphertext_blob_len", &self.ciphertext_blob.len())
            .finish()
    }
}

/// Key-management collaborator.
///
/// Implementations must reject an unwrap whose context differs from the one the key
/// was generated under.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyManagementService: Send + Sync {
    /// Generate a data key of `number_of_bytes` under `key_id`, bound to `context`
    async fn generate_data_key(
        &self,
        key_id: &str,
        context: &EncryptionContext,
        number_of_bytes: usize,
    ) -> Result<DataKey>;

    /// Unwrap a data key previously produced by `generate_data_key`
    async fn decrypt(
        &self,
        key_id: &str,
        ciphertext_blob: &[u8],
        context: &EncryptionContext,
    ) -> Result<Zeroizing<Vec<u8>>>;
}

/// Output of [`EncryptionProvider::encrypt`], before base64 encoding for storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// Wrapped data key
    pub key: Vec<u8>,
    /// Ciphertext bytes
    pub contents: Vec<u8>,
    /// Hex HMAC-SHA256 over `contents`
    pub hmac: String,
}

/// Turns secrets into integrity-tagged ciphertext and back
#[async_trait]
pub trait EncryptionProvider: Send + Sync {
    /// Encrypt `secret` under a fresh data key bound to `context`.
    ///
    /// Fails with `Encryption` when the key-management call or the cipher fails.
    async fn encrypt(&self, secret: &[u8], context: &EncryptionContext)
        -> Result<EncryptedPayload>;

    /// Unwrap the data key, verify the HMAC, then decrypt.
    ///
    /// Fails with `Decryption` when unwrapping or the cipher fails and with
    /// `Integrity` when the HMAC does not match; no plaintext is produced in
    /// either case.
    async fn decrypt(&self, credential: &Credential, context: &EncryptionContext)
        -> Result<Secret>;
}
