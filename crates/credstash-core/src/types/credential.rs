//! Persisted credential record

use super::version;
use serde::{Deserialize, Serialize};

/// A stored credential.
///
/// Written once by `put` and never updated; a new secret value is a new version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Credential name, unique together with `version`
    pub name: String,
    /// Zero-padded 19-digit version
    pub version: String,
    /// Wrapped data key (base64)
    pub key: String,
    /// AES-CTR ciphertext of the secret (base64)
    pub contents: String,
    /// HMAC-SHA256 over the ciphertext bytes (hex)
    pub hmac: String,
}

impl Credential {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        key: impl Into<String>,
        contents: impl Into<String>,
        hmac: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            key: key.into(),
            contents: contents.into(),
            hmac: hmac.into(),
        }
    }

    /// Version with leading zeros stripped
    pub fn unpadded_version(&self) -> String {
        version::unpad(&self.version)
    }
}
