//! Configuration for the credential store and its AWS backends

mod loader;

pub use loader::{CONFIG_FILE_NAMES, ENV_KMS_KEY, ENV_REGION, ENV_TABLE};

use crate::error::Result;
use crate::types::EncryptionContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Default DynamoDB table holding credentials
pub const DEFAULT_TABLE: &str = "credential-store";

/// Default KMS key used to generate data keys
pub const DEFAULT_KMS_KEY: &str = "alias/credstash";

/// Store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StashConfig {
    /// DynamoDB table name
    #[serde(default = "default_table")]
    pub table: String,
    /// KMS key id, ARN or alias
    #[serde(default = "default_kms_key_id")]
    pub kms_key_id: String,
    /// AWS region; the SDK default chain decides when unset
    #[serde(default)]
    pub region: Option<String>,
    /// Custom DynamoDB endpoint (e.g. DynamoDB Local)
    #[serde(default)]
    pub dynamodb_endpoint: Option<String>,
    /// Custom KMS endpoint (e.g. a local KMS emulator)
    #[serde(default)]
    pub kms_endpoint: Option<String>,
    /// Retry and timeout policy for backend calls
    #[serde(default)]
    pub retry: RetrySettings,
    /// Global encryption context merged into every call
    #[serde(default)]
    pub context: BTreeMap<String, Value>,
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_kms_key_id() -> String {
    DEFAULT_KMS_KEY.to_string()
}

impl Default for StashConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            kms_key_id: default_kms_key_id(),
            region: None,
            dynamodb_endpoint: None,
            kms_endpoint: None,
            retry: RetrySettings::default(),
            context: BTreeMap::new(),
        }
    }
}

impl StashConfig {
    /// Normalized global encryption context
    pub fn encryption_context(&self) -> Result<EncryptionContext> {
        EncryptionContext::from_values(self.context.iter().map(|(k, v)| (k, v.clone())))
    }
}

/// Retry policy handed to the AWS SDK clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts per backend call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Per-operation timeout in seconds
    #[serde(default)]
    pub operation_timeout_secs: Option<u64>,
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            operation_timeout_secs: None,
        }
    }
}
