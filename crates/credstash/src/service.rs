//! Credential service
//!
//! Composes an [`EncryptionProvider`] and a [`CredentialStore`]:
//! - resolves explicit versions or auto-increments from the stored highest one
//! - merges the per-call encryption context onto the global context
//! - pads versions on the way in and unpads them on the way out
//!
//! Every operation awaits its collaborator calls in order and performs no retries of
//! its own; a lost conditional write is surfaced as `DuplicateCredentialVersion`.

use crate::encryption::{AwsKms, EncryptionProvider, KmsEncryption};
use crate::security::{AuditEvent, Secret};
use crate::store::{CredentialStore, DynamoDbStore};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use credstash_core::types::version;
use credstash_core::{Credential, EncryptionContext, NamePattern, Result, StashConfig};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Versioned secret store API
#[derive(Clone)]
pub struct CredentialService {
    store: Arc<dyn CredentialStore>,
    encryption: Arc<dyn EncryptionProvider>,
    /// Merged under every per-call context
    context: EncryptionContext,
}

impl CredentialService {
    pub fn new(store: Arc<dyn CredentialStore>, encryption: Arc<dyn EncryptionProvider>) -> Self {
        Self {
            store,
            encryption,
            context: EncryptionContext::new(),
        }
    }

    /// Wire the AWS KMS and DynamoDB backends described by `config`
    pub async fn from_config(config: &StashConfig) -> Result<Self> {
        let context = config.encryption_context()?;
        let kms = Arc::new(AwsKms::new(config).await);
        let encryption = Arc::new(KmsEncryption::new(kms, config.kms_key_id.clone()));
        let store = Arc::new(DynamoDbStore::new(config).await);

        debug!(
            "Using table {} and key {} ({} global context pairs)",
            config.table,
            config.kms_key_id,
            context.len()
        );

        Ok(Self::new(store, encryption).replace_context(context))
    }

    /// Merge `context` into the global context; tombstones remove keys
    pub fn with_context(mut self, context: &EncryptionContext) -> Self {
        self.context = context.merged_onto(&self.context);
        self
    }

    /// Replace the global context; tombstones in `context` are dropped
    pub fn replace_context(mut self, context: EncryptionContext) -> Self {
        self.context = EncryptionContext::new().merged_onto(&context);
        self
    }

    /// The global context
    pub fn context(&self) -> &EncryptionContext {
        &self.context
    }

    fn effective_context(&self, context: &EncryptionContext) -> EncryptionContext {
        context.merged_onto(&self.context)
    }

    /// Decrypt `name` at `version`, or at its highest version when `None`
    pub async fn get(
        &self,
        name: &str,
        context: &EncryptionContext,
        version: Option<u64>,
    ) -> Result<Secret> {
        let event = match version {
            Some(v) => AuditEvent::new("get", name).with_version(v.to_string()),
            None => AuditEvent::new("get", name),
        };
        let result = self.fetch(name, context, version).await;
        event.record(&result);
        result
    }

    async fn fetch(
        &self,
        name: &str,
        context: &EncryptionContext,
        version: Option<u64>,
    ) -> Result<Secret> {
        let credential = match version {
            Some(v) => self.store.get_at_version(name, &version::pad(v)?).await?,
            None => self.store.get(name).await?,
        };

        self.encryption
            .decrypt(&credential, &self.effective_context(context))
            .await
    }

    /// Encrypt and store `secret`, returning the version it was stored under.
    ///
    /// Without an explicit version the stored highest version plus one is used.
    pub async fn put(
        &self,
        name: &str,
        secret: &[u8],
        context: &EncryptionContext,
        version: Option<u64>,
    ) -> Result<u64> {
        let result = self.store_new_version(name, secret, context, version).await;
        let event = match result.as_ref().ok().copied().or(version) {
            Some(v) => AuditEvent::new("put", name).with_version(v.to_string()),
            None => AuditEvent::new("put", name),
        };
        event.record(&result);
        result
    }

    async fn store_new_version(
        &self,
        name: &str,
        secret: &[u8],
        context: &EncryptionContext,
        version: Option<u64>,
    ) -> Result<u64> {
        let version = match version {
            Some(v) => v,
            None => {
                let highest = self.store.get_highest_version(name).await?;
                version::next_version(&highest)?
            }
        };
        let padded = version::pad(version)?;

        let payload = self
            .encryption
            .encrypt(secret, &self.effective_context(context))
            .await?;

        let credential = Credential::new(
            name,
            padded,
            BASE64.encode(&payload.key),
            BASE64.encode(&payload.contents),
            payload.hmac,
        );
        self.store.put(&credential).await?;

        Ok(version)
    }

    /// Remove every version of `name`, returning how many were removed
    pub async fn delete(&self, name: &str) -> Result<usize> {
        let result = self.store.delete(name).await;
        AuditEvent::new("delete", name).record(&result);
        result
    }

    /// Names matching `pattern` mapped to their unpadded highest version
    pub async fn list_credentials(&self, pattern: &str) -> Result<BTreeMap<String, String>> {
        let pattern = NamePattern::new(pattern)?;
        self.list_matching(&pattern).await
    }

    async fn list_matching(&self, pattern: &NamePattern) -> Result<BTreeMap<String, String>> {
        let listed = self.store.list_credentials().await?;
        debug!(
            "Pattern '{}' over {} credentials",
            pattern.as_str(),
            listed.len()
        );

        Ok(listed
            .into_iter()
            .filter(|(name, _)| pattern.is_match(name))
            .map(|(name, v)| (name, version::unpad(&v)))
            .collect())
    }

    /// Decrypt every credential matching `pattern`.
    ///
    /// With `version` set, that version is fetched for every match; otherwise each
    /// credential's highest version. The first failing fetch aborts the search and
    /// its error is returned; no partial result is produced.
    pub async fn search(
        &self,
        pattern: &str,
        context: &EncryptionContext,
        version: Option<u64>,
    ) -> Result<BTreeMap<String, Secret>> {
        let pattern = NamePattern::new(pattern)?;
        self.search_matching(&pattern, context, version).await
    }

    /// Decrypt every stored credential, see [`search`](Self::search)
    pub async fn get_all(
        &self,
        context: &EncryptionContext,
        version: Option<u64>,
    ) -> Result<BTreeMap<String, Secret>> {
        self.search_matching(&NamePattern::any(), context, version)
            .await
    }

    async fn search_matching(
        &self,
        pattern: &NamePattern,
        context: &EncryptionContext,
        version: Option<u64>,
    ) -> Result<BTreeMap<String, Secret>> {
        let mut secrets = BTreeMap::new();
        for name in self.list_matching(pattern).await?.into_keys() {
            let secret = self.get(&name, context, version).await?;
            secrets.insert(name, secret);
        }
        Ok(secrets)
    }

    /// Unpadded highest version of `name`, `"0"` when nothing is stored
    pub async fn highest_version(&self, name: &str) -> Result<String> {
        let highest = self.store.get_highest_version(name).await?;
        Ok(version::unpad(&highest))
    }
}

impl std::fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialService")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::{EncryptedPayload, MockKeyManagementService};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use credstash_core::Error;
    use std::sync::Mutex;

    /// Passes plaintext through and records the context of every call
    #[derive(Default)]
    struct RecordingProvider {
        contexts: Mutex<Vec<EncryptionContext>>,
    }

    impl RecordingProvider {
        fn contexts(&self) -> Vec<EncryptionContext> {
            self.contexts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EncryptionProvider for RecordingProvider {
        async fn encrypt(
            &self,
            secret: &[u8],
            context: &EncryptionContext,
        ) -> Result<EncryptedPayload> {
            self.contexts.lock().unwrap().push(context.clone());
            Ok(EncryptedPayload {
                key: b"wrapped".to_vec(),
                contents: secret.to_vec(),
                hmac: "00".to_string(),
            })
        }

        async fn decrypt(
            &self,
            credential: &Credential,
            context: &EncryptionContext,
        ) -> Result<Secret> {
            self.contexts.lock().unwrap().push(context.clone());
            BASE64
                .decode(&credential.contents)
                .map(Secret::new)
                .map_err(|_| Error::integrity(&credential.name))
        }
    }

    fn service() -> (CredentialService, Arc<MemoryStore>, Arc<RecordingProvider>) {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(RecordingProvider::default());
        let service = CredentialService::new(store.clone(), provider.clone());
        (service, store, provider)
    }

    fn ctx(pairs: &[(&str, &str)]) -> EncryptionContext {
        EncryptionContext::from_pairs(pairs.iter().copied()).unwrap()
    }

    #[tokio::test]
    async fn test_put_auto_increments() {
        let (service, store, _) = service();
        let empty = EncryptionContext::new();

        assert_eq!(service.put("db-pass", b"one", &empty, None).await.unwrap(), 1);
        assert_eq!(service.put("db-pass", b"two", &empty, None).await.unwrap(), 2);

        let stored = store.get("db-pass").await.unwrap();
        assert_eq!(stored.version, "0000000000000000002");
        assert_eq!(stored.contents, BASE64.encode(b"two"));
        assert_eq!(stored.key, BASE64.encode(b"wrapped"));
        assert_eq!(service.highest_version("db-pass").await.unwrap(), "2");
    }

    #[tokio::test]
    async fn test_get_explicit_and_latest_version() {
        let (service, _, _) = service();
        let empty = EncryptionContext::new();
        service.put("db-pass", b"old", &empty, Some(3)).await.unwrap();
        service.put("db-pass", b"new", &empty, Some(12)).await.unwrap();

        let latest = service.get("db-pass", &empty, None).await.unwrap();
        assert_eq!(latest.as_bytes(), b"new");

        let old = service.get("db-pass", &empty, Some(3)).await.unwrap();
        assert_eq!(old.as_bytes(), b"old");

        let err = service.get("db-pass", &empty, Some(4)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_version_out_of_range_rejected_before_encrypting() {
        let (service, _, provider) = service();
        let err = service
            .put("db-pass", b"x", &EncryptionContext::new(), Some(u64::MAX))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert!(provider.contexts().is_empty());
    }

    #[tokio::test]
    async fn test_call_context_merged_onto_global() {
        let (service, _, provider) = service();
        let service = service.replace_context(ctx(&[("env", "prod"), ("team", "core")]));

        let call = ctx(&[("app", "billing")]).remove("team").unwrap();
        service.put("db-pass", b"x", &call, None).await.unwrap();

        let seen = provider.contexts();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], ctx(&[("app", "billing"), ("env", "prod")]));
        assert_eq!(service.context(), &ctx(&[("env", "prod"), ("team", "core")]));
    }

    #[tokio::test]
    async fn test_with_context_tombstone_removes_global_key() {
        let (service, _, _) = service();
        let service = service
            .replace_context(ctx(&[("env", "prod"), ("team", "core")]))
            .with_context(&ctx(&[("env", "null"), ("region", "eu")]));

        assert_eq!(service.context(), &ctx(&[("region", "eu"), ("team", "core")]));
    }

    #[tokio::test]
    async fn test_list_credentials_unpads_and_filters() {
        let (service, _, _) = service();
        let empty = EncryptionContext::new();
        service.put("foobar", b"x", &empty, Some(7)).await.unwrap();
        service.put("barfoo", b"x", &empty, None).await.unwrap();

        let listed = service.list_credentials("foo*").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed["foobar"], "7");

        assert!(matches!(
            service.list_credentials("[foo").await.unwrap_err(),
            Error::InvalidArgument { .. }
        ));
    }

    #[tokio::test]
    async fn test_get_all_decrypts_every_name() {
        let (service, _, _) = service();
        let empty = EncryptionContext::new();
        service.put("a", b"1", &empty, None).await.unwrap();
        service.put("b", b"2", &empty, None).await.unwrap();

        let all = service.get_all(&empty, None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["a"].as_bytes(), b"1");
        assert_eq!(all["b"].as_bytes(), b"2");
    }

    #[tokio::test]
    async fn test_delete_passes_through() {
        let (service, store, _) = service();
        let empty = EncryptionContext::new();
        service.put("db-pass", b"1", &empty, None).await.unwrap();
        service.put("db-pass", b"2", &empty, None).await.unwrap();

        assert_eq!(service.delete("db-pass").await.unwrap(), 2);
        assert!(store.is_empty().await);
        assert_eq!(service.highest_version("db-pass").await.unwrap(), "0");
    }

    #[tokio::test]
    async fn test_kms_failure_surfaces_as_encryption_error() {
        let mut kms = MockKeyManagementService::new();
        kms.expect_generate_data_key()
            .returning(|_, _, _| Err(Error::key_management("access denied")));

        let store = Arc::new(MemoryStore::new());
        let encryption = Arc::new(KmsEncryption::new(Arc::new(kms), "alias/credstash"));
        let service = CredentialService::new(store.clone(), encryption);

        let err = service
            .put("db-pass", b"x", &EncryptionContext::new(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Encryption { .. }));
        assert!(store.is_empty().await);
    }
}
