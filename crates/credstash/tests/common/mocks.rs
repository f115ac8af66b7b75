//! Fake key-management service

use async_trait::async_trait;
use credstash::{DataKey, EncryptionContext, Error, KeyManagementService, Result};
use std::collections::HashMap;
use std::sync::Mutex;
use zeroize::Zeroizing;

#[derive(Default)]
struct State {
    issued: u64,
    /// wrapped blob -> (plaintext, context it is bound to)
    keys: HashMap<Vec<u8>, (Vec<u8>, EncryptionContext)>,
}

/// Issues deterministic data keys and rejects unwraps under a different context,
/// the way KMS does.
#[derive(Default)]
pub struct FakeKms {
    state: Mutex<State>,
}

#[allow(dead_code)]
impl FakeKms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of data keys generated so far
    pub fn issued(&self) -> u64 {
        self.state.lock().unwrap().issued
    }

    /// Context the last generated key was bound to
    pub fn last_context(&self) -> Option<EncryptionContext> {
        let state = self.state.lock().unwrap();
        let wrapped = wrapped_key(state.issued);
        state.keys.get(&wrapped).map(|(_, c)| c.clone())
    }
}

fn wrapped_key(n: u64) -> Vec<u8> {
    format!("wrapped-key-{}", n).into_bytes()
}

#[async_trait]
impl KeyManagementService for FakeKms {
    async fn generate_data_key(
        &self,
        _key_id: &str,
        context: &EncryptionContext,
        number_of_bytes: usize,
    ) -> Result<DataKey> {
        let mut state = self.state.lock().unwrap();
        state.issued += 1;
        let n = state.issued;

        let plaintext: Vec<u8> = (0..number_of_bytes)
            .map(|i| (n as usize * 31 + i * 7) as u8)
            .collect();
        let wrapped = wrapped_key(n);
        state
            .keys
            .insert(wrapped.clone(), (plaintext.clone(), context.clone()));

        Ok(DataKey {
            plaintext: Zeroizing::new(plaintext),
            ciphertext_blob: wrapped,
        })
    }

    async fn decrypt(
        &self,
        _key_id: &str,
        ciphertext_blob: &[u8],
        context: &EncryptionContext,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let state = self.state.lock().unwrap();
        match state.keys.get(ciphertext_blob) {
            Some((plaintext, bound)) if bound == context => {
                Ok(Zeroizing::new(plaintext.clone()))
            }
            Some(_) => Err(Error::key_management(
                "InvalidCiphertextException: encryption context mismatch",
            )),
            None => Err(Error::key_management(
                "InvalidCiphertextException: unknown ciphertext blob",
            )),
        }
    }
}
