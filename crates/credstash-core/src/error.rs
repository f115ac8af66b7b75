//! Error types for credstash

use thiserror::Error;

/// Result type alias using credstash-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the credential store, the encryption provider and the service
/// composing them.
#[derive(Error, Debug)]
pub enum Error {
    /// No record exists for the name (or the name at the given version)
    #[error("Credential \"{name}\" could not be found in the store{}", version_suffix(.version))]
    CredentialNotFound {
        name: String,
        version: Option<String>,
    },

    /// A conditional write found an existing record with the same key
    #[error("Credential \"{name}\" already has a version {version} in the store")]
    DuplicateCredentialVersion { name: String, version: String },

    /// The stored HMAC does not match the ciphertext
    #[error("Computed HMAC on {name} does not match stored HMAC")]
    Integrity { name: String },

    /// Data-key generation or the cipher failed while encrypting
    #[error("Encryption failed: {message}")]
    Encryption { message: String },

    /// Data-key unwrapping or the cipher failed while decrypting
    #[error("Decryption failed: {message}")]
    Decryption { message: String },

    /// The stored highest version cannot be incremented
    #[error("Version \"{version}\" cannot be auto incremented as it is not numeric")]
    AutoIncrement { version: String },

    /// Caller supplied a malformed argument
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The key-management collaborator rejected or failed a call
    #[error("Key management error: {message}")]
    KeyManagement { message: String },

    /// The storage collaborator failed a call
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration content
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn version_suffix(version: &Option<String>) -> String {
    match version {
        Some(v) => format!(" at version {}", v),
        None => String::new(),
    }
}

impl Error {
    /// Create a not-found error for the latest version of a credential
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::CredentialNotFound {
            name: name.into(),
            version: None,
        }
    }

    /// Create a not-found error for an exact version
    pub fn not_found_at(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::CredentialNotFound {
            name: name.into(),
            version: Some(version.into()),
        }
    }

    /// Create a duplicate version error
    pub fn duplicate_version(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::DuplicateCredentialVersion {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Create an integrity error for the named credential
    pub fn integrity(name: impl Into<String>) -> Self {
        Self::Integrity { name: name.into() }
    }

    pub fn encryption(message: impl Into<String>) -> Self {
        Self::Encryption {
            message: message.into(),
        }
    }

    pub fn decryption(message: impl Into<String>) -> Self {
        Self::Decryption {
            message: message.into(),
        }
    }

    pub fn auto_increment(version: impl Into<String>) -> Self {
        Self::AutoIncrement {
            version: version.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn key_management(message: impl Into<String>) -> Self {
        Self::KeyManagement {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether the error means the credential (or version) is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::CredentialNotFound { .. })
    }
}
