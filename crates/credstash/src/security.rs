//! Security utilities
//!
//! Provides:
//! - `Secret`, a decrypted value zeroed on drop
//! - Audit events (never log secret values)

use credstash_core::{Error, Result};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Decrypted secret bytes, automatically zeroed on drop
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret {
    inner: Vec<u8>,
}

impl Secret {
    pub fn new(value: Vec<u8>) -> Self {
        Self { inner: value }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    /// Borrow as UTF-8 text
    pub fn as_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.inner)
            .map_err(|_| Error::decryption("secret is not valid UTF-8"))
    }

    /// Convert to owned bytes (consumes self)
    pub fn into_bytes(mut self) -> Vec<u8> {
        std::mem::take(&mut self.inner)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl From<Vec<u8>> for Secret {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes().to_vec())
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED {} bytes])", self.len())
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// Audit record for a credential operation
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub operation: &'static str,
    pub name: String,
    pub version: Option<String>,
    pub success: bool,
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(operation: &'static str, name: impl Into<String>) -> Self {
        Self {
            operation,
            name: name.into(),
            version: None,
            success: true,
            error: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_error(mut self, error: &Error) -> Self {
        self.success = false;
        self.error = Some(error.to_string());
        self
    }

    /// Record the outcome of `result` and emit the event
    pub fn record<T>(self, result: &Result<T>) {
        match result {
            Ok(_) => self.log(),
            Err(e) => self.with_error(e).log(),
        }
    }

    /// Emit the event through `tracing`
    pub fn log(&self) {
        let version = self.version.as_deref().unwrap_or("latest");
        if self.success {
            tracing::info!(
                operation = self.operation,
                credential = %self.name,
                version = version,
                "Credential operation succeeded"
            );
        } else {
            tracing::warn!(
                operation = self.operation,
                credential = %self.name,
                version = version,
                error = self.error.as_deref().unwrap_or("unknown"),
                "Credential operation failed"
            );
        }
    }
}
