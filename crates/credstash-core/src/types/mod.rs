//! Type definitions shared by the credstash crates

pub mod context;
pub mod credential;
pub mod version;

pub use context::EncryptionContext;
pub use credential::Credential;
pub use version::{MAX_VERSION, VERSION_WIDTH, ZERO_VERSION};
