//! AWS KMS key-management backend

use super::{DataKey, KeyManagementService};
use crate::aws;
use async_trait::async_trait;
use aws_sdk_kms::primitives::Blob;
use aws_sdk_kms::Client;
use credstash_core::{EncryptionContext, Error, Result, StashConfig};
use std::collections::HashMap;
use tracing::debug;
use zeroize::Zeroizing;

/// AWS KMS client issuing `GenerateDataKey` and `Decrypt`
pub struct AwsKms {
    client: Client,
}

impl AwsKms {
    /// Create a KMS backend from configuration
    pub async fn new(config: &StashConfig) -> Self {
        let sdk_config = aws::load_sdk_config(config).await;
        let mut builder = aws_sdk_kms::config::Builder::from(&sdk_config);

        if let Some(endpoint_url) = &config.kms_endpoint {
            debug!("Using custom KMS endpoint: {}", endpoint_url);
            builder = builder.endpoint_url(endpoint_url);
        }

        Self {
            client: Client::from_conf(builder.build()),
        }
    }

    /// Wrap an already configured client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

/// KMS treats a missing context and an empty one alike; send none when empty
fn context_param(context: &EncryptionContext) -> Option<HashMap<String, String>> {
    (!context.is_empty()).then(|| context.to_hash_map())
}

#[async_trait]
impl KeyManagementService for AwsKms {
    async fn generate_data_key(
        &self,
        key_id: &str,
        context: &EncryptionContext,
        number_of_bytes: usize,
    ) -> Result<DataKey> {
        let number_of_bytes = i32::try_from(number_of_bytes).map_err(|_| {
            Error::invalid_argument(format!("data key size {} is too large", number_of_bytes))
        })?;

        let resp = self
            .client
            .generate_data_key()
            .key_id(key_id)
            .number_of_bytes(number_of_bytes)
            .set_encryption_context(context_param(context))
            .send()
            .await
            .map_err(|e| {
                Error::key_management(format!(
                    "GenerateDataKey with {} failed: {}",
                    key_id,
                    e.into_service_error()
                ))
            })?;

        let plaintext = resp
            .plaintext
            .ok_or_else(|| Error::key_management("GenerateDataKey returned no plaintext"))?;
        let ciphertext_blob = resp
            .ciphertext_blob
            .ok_or_else(|| Error::key_management("GenerateDataKey returned no ciphertext blob"))?;

        Ok(DataKey {
            plaintext: Zeroizing::new(plaintext.into_inner()),
            ciphertext_blob: ciphertext_blob.into_inner(),
        })
    }

    async fn decrypt(
        &self,
        key_id: &str,
        ciphertext_blob: &[u8],
        context: &EncryptionContext,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let resp = self
            .client
            .decrypt()
            .key_id(key_id)
            .ciphertext_blob(Blob::new(ciphertext_blob))
            .set_encryption_context(context_param(context))
            .send()
            .await
            .map_err(|e| {
                Error::key_management(format!(
                    "Decrypt with {} failed: {}",
                    key_id,
                    e.into_service_error()
                ))
            })?;

        let plaintext = resp
            .plaintext
            .ok_or_else(|| Error::key_management("Decrypt returned no plaintext"))?;

        Ok(Zeroizing::new(plaintext.into_inner()))
    }
}

impl std::fmt::Debug for AwsKms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsKms").finish_non_exhaustive()
    }
}
