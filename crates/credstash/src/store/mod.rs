//! Credential persistence
//!
//! Stores treat the wrapped key, ciphertext and HMAC as opaque strings and address
//! records by `(name, padded version)`.

pub mod dynamodb;
pub mod memory;

pub use dynamodb::DynamoDbStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use credstash_core::{Credential, Result};
use std::collections::BTreeMap;

/// Persistence for credential records
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// One entry per distinct name, mapped to that name's highest padded version
    async fn list_credentials(&self) -> Result<BTreeMap<String, String>>;

    /// Highest-version record for `name`, or `CredentialNotFound`
    async fn get(&self, name: &str) -> Result<Credential>;

    /// Exact `(name, version)` lookup, or `CredentialNotFound`
    async fn get_at_version(&self, name: &str, version: &str) -> Result<Credential>;

    /// Highest padded version for `name`, or the all-zero version when none exists.
    ///
    /// Must observe the caller's own preceding writes.
    async fn get_highest_version(&self, name: &str) -> Result<String>;

    /// Insert unless `(name, version)` exists, as one atomic conditional write.
    ///
    /// Fails with `DuplicateCredentialVersion` and leaves the existing record
    /// untouched when the key is taken.
    async fn put(&self, credential: &Credential) -> Result<()>;

    /// Remove every version of `name`, returning how many were removed.
    ///
    /// Removal is one delete per version and is not atomic across versions: a
    /// failure part-way leaves the remaining versions in place.
    async fn delete(&self, name: &str) -> Result<usize>;
}
