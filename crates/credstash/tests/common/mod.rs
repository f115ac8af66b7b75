//! Common test helpers for credstash integration tests
//!
//! - `FakeKms`, a deterministic key-management service that binds each wrapped key
//!   to the context it was generated under
//! - Service fixtures over `MemoryStore`

pub mod mocks;

use credstash::{CredentialService, EncryptionContext, KmsEncryption, MemoryStore};
use mocks::FakeKms;
use std::sync::Arc;

pub const KEY_ID: &str = "alias/credstash";

/// Service plus handles on its collaborators for direct inspection
#[allow(dead_code)]
pub struct Fixture {
    pub service: CredentialService,
    pub store: Arc<MemoryStore>,
    pub kms: Arc<FakeKms>,
}

pub fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let kms = Arc::new(FakeKms::new());
    let encryption = Arc::new(KmsEncryption::new(kms.clone(), KEY_ID));
    let service = CredentialService::new(store.clone(), encryption);
    Fixture {
        service,
        store,
        kms,
    }
}

/// Context from string pairs
#[allow(dead_code)]
pub fn ctx(pairs: &[(&str, &str)]) -> EncryptionContext {
    EncryptionContext::from_pairs(pairs.iter().copied()).unwrap()
}
