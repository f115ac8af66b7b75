//! In-process credential store

use super::CredentialStore;
use async_trait::async_trait;
use credstash_core::types::version::{self, ZERO_VERSION};
use credstash_core::{Credential, Error, Result};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Credential store kept in memory, ordered by name then padded version.
///
/// Writes take an exclusive lock, so the absence check and insert of `put` are one
/// atomic step, matching the conditional write of the DynamoDB backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, BTreeMap<String, Credential>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored versions across all names
    pub async fn len(&self) -> usize {
        self.records.read().await.values().map(BTreeMap::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn list_credentials(&self) -> Result<BTreeMap<String, String>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter_map(|(name, versions)| {
                versions
                    .keys()
                    .next_back()
                    .map(|v| (name.clone(), v.clone()))
            })
            .collect())
    }

    async fn get(&self, name: &str) -> Result<Credential> {
        let records = self.records.read().await;
        records
            .get(name)
            .and_then(|versions| versions.values().next_back())
            .cloned()
            .ok_or_else(|| Error::not_found(name))
    }

    async fn get_at_version(&self, name: &str, version: &str) -> Result<Credential> {
        let records = self.records.read().await;
        records
            .get(name)
            .and_then(|versions| versions.get(version))
            .cloned()
            .ok_or_else(|| Error::not_found_at(name, version::unpad(version)))
    }

    async fn get_highest_version(&self, name: &str) -> Result<String> {
        let records = self.records.read().await;
        Ok(records
            .get(name)
            .and_then(|versions| versions.keys().next_back())
            .cloned()
            .unwrap_or_else(|| ZERO_VERSION.to_string()))
    }

    async fn put(&self, credential: &Credential) -> Result<()> {
        let mut records = self.records.write().await;
        let versions = records.entry(credential.name.clone()).or_default();

        if versions.contains_key(&credential.version) {
            return Err(Error::duplicate_version(
                &credential.name,
                credential.unpadded_version(),
            ));
        }

        versions.insert(credential.version.clone(), credential.clone());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<usize> {
        let mut records = self.records.write().await;
        Ok(records.remove(name).map(|versions| versions.len()).unwrap_or(0))
    }
}
