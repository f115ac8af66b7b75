//! Versioned secret store with KMS envelope encryption
//!
//! This crate provides:
//! - **Encryption**: per-secret 64-byte data keys from AWS KMS, AES-256-CTR with
//!   HMAC-SHA256 over the ciphertext, bound to an encryption context
//! - **Storage**: DynamoDB table keyed by name and zero-padded version, with
//!   conditional writes so versions are never overwritten
//! - **Service**: auto-incrementing versions, global context merging, glob listing
//!   and bulk search
//! - **Security**: zeroized secrets and data keys, audit events via `tracing`

pub mod aws;
pub mod encryption;
pub mod security;
pub mod service;
pub mod store;

pub use credstash_core::{
    Credential, EncryptionContext, Error, NamePattern, Result, RetrySettings, StashConfig,
};
pub use encryption::{
    AwsKms, DataKey, EncryptedPayload, EncryptionProvider, KeyManagementService, KmsEncryption,
};
pub use security::{AuditEvent, Secret};
pub use service::CredentialService;
pub use store::{CredentialStore, DynamoDbStore, MemoryStore};
