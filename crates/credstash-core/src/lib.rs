//! # credstash-core
//!
//! Core building blocks for the credstash secret store:
//! - Error taxonomy shared by the store, encryption and service layers
//! - The persisted `Credential` record and fixed-width version encoding
//! - Encryption context normalization and merging
//! - Shell-style name patterns
//! - Configuration file loading

pub mod config;
pub mod error;
pub mod pattern;
pub mod types;

pub use config::{RetrySettings, StashConfig};
pub use error::{Error, Result};
pub use pattern::NamePattern;
pub use types::{Credential, EncryptionContext};
