//! KMS-backed envelope encryption provider

use super::cipher::{self, DATA_KEY_SIZE};
use super::{EncryptedPayload, EncryptionProvider, KeyManagementService};
use crate::security::Secret;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use credstash_core::{Credential, EncryptionContext, Error, Result};
use std::sync::Arc;
use tracing::debug;

/// Encryption provider using a key-management service for data keys and
/// AES-256-CTR + HMAC-SHA256 for the payload
pub struct KmsEncryption {
    kms: Arc<dyn KeyManagementService>,
    key_id: String,
}

impl KmsEncryption {
    pub fn new(kms: Arc<dyn KeyManagementService>, key_id: impl Into<String>) -> Self {
        Self {
            kms,
            key_id: key_id.into(),
        }
    }

    /// Key id, ARN or alias used for data-key generation
    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}

#[async_trait]
impl EncryptionProvider for KmsEncryption {
    async fn encrypt(
        &self,
        secret: &[u8],
        context: &EncryptionContext,
    ) -> Result<EncryptedPayload> {
        let data_key = self
            .kms
            .generate_data_key(&self.key_id, context, DATA_KEY_SIZE)
            .await
            .map_err(|e| Error::encryption(format!("failed to generate data key: {}", e)))?;

        let (aes_key, hmac_key) = cipher::split_data_key(&data_key.plaintext).ok_or_else(|| {
            Error::encryption(format!(
                "data key must be {} bytes, got {}",
                DATA_KEY_SIZE,
                data_key.plaintext.len()
            ))
        })?;

        let contents = cipher::aes_ctr(aes_key, secret)
            .map_err(|e| Error::encryption(format!("cipher failed: {}", e)))?;
        let hmac = cipher::hmac_hex(hmac_key, &contents)
            .map_err(|e| Error::encryption(format!("HMAC failed: {}", e)))?;

        debug!(
            "Encrypted {} bytes under key {} ({} context pairs)",
            secret.len(),
            self.key_id,
            context.len()
        );

        Ok(EncryptedPayload {
            key: data_key.ciphertext_blob,
            contents,
            hmac,
        })
    }

    async fn decrypt(&self, credential: &Credential, context: &EncryptionContext) -> Result<Secret> {
        let wrapped_key = BASE64.decode(&credential.key).map_err(|e| {
            Error::decryption(format!(
                "wrapped key of {} is not valid base64: {}",
                credential.name, e
            ))
        })?;
        // Undecodable ciphertext is corrupted ciphertext
        let contents = BASE64
            .decode(&credential.contents)
            .map_err(|_| Error::integrity(&credential.name))?;

        let data_key = self
            .kms
            .decrypt(&self.key_id, &wrapped_key, context)
            .await
            .map_err(|e| {
                Error::decryption(format!(
                    "failed to unwrap data key for {}: {}",
                    credential.name, e
                ))
            })?;

        let (aes_key, hmac_key) = cipher::split_data_key(&data_key).ok_or_else(|| {
            Error::decryption(format!(
                "data key must be {} bytes, got {}",
                DATA_KEY_SIZE,
                data_key.len()
            ))
        })?;

        if !cipher::verify_hmac(hmac_key, &contents, &credential.hmac) {
            return Err(Error::integrity(&credential.name));
        }

        let plaintext = cipher::aes_ctr(aes_key, &contents)
            .map_err(|e| Error::decryption(format!("cipher failed: {}", e)))?;

        Ok(Secret::new(plaintext))
    }
}

impl std::fmt::Debug for KmsEncryption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KmsEncryption")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}
