//! Configuration file loading and parsing

use super::StashConfig;
use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tracing::debug;

/// Configuration file names to search for in the working directory
pub const CONFIG_FILE_NAMES: &[&str] = &["credstash.yaml", "credstash.yml"];

/// Overrides `table`
pub const ENV_TABLE: &str = "CREDSTASH_TABLE";

/// Overrides `kms_key_id`
pub const ENV_KMS_KEY: &str = "CREDSTASH_KMS_KEY";

/// Overrides `region`
pub const ENV_REGION: &str = "CREDSTASH_REGION";

impl StashConfig {
    /// Load configuration from the specified path or search for it.
    ///
    /// Without an explicit path, the working directory and then
    /// `~/.credstash/config.yaml` are searched; defaults apply when nothing is
    /// found. Environment overrides are applied last.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let content = fs::read_to_string(p).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        Error::config_not_found(p.as_str())
                    } else {
                        Error::Io(e)
                    }
                })?;
                Self::from_yaml(&content)?
            }
            None => match Self::find_config() {
                Some(found) => {
                    debug!("Using configuration file: {}", found);
                    Self::from_yaml(&fs::read_to_string(&found)?)?
                }
                None => {
                    debug!("No configuration file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from YAML content
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: StashConfig = serde_yaml_ng::from_str(content)?;
        Ok(config)
    }

    /// Apply `CREDSTASH_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        if let Some(table) = env_value(ENV_TABLE) {
            self.table = table;
        }
        if let Some(key) = env_value(ENV_KMS_KEY) {
            self.kms_key_id = key;
        }
        if let Some(region) = env_value(ENV_REGION) {
            self.region = Some(region);
        }
    }

    /// Check required fields and the global context
    pub fn validate(&self) -> Result<()> {
        if self.table.trim().is_empty() {
            return Err(Error::invalid_config("table must not be empty"));
        }
        if self.kms_key_id.trim().is_empty() {
            return Err(Error::invalid_config("kms_key_id must not be empty"));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::invalid_config("retry.max_attempts must be at least 1"));
        }
        self.encryption_context()
            .map_err(|e| Error::invalid_config(format!("context: {}", e)))?;
        Ok(())
    }

    fn find_config() -> Option<Utf8PathBuf> {
        for name in CONFIG_FILE_NAMES {
            let candidate = Utf8PathBuf::from(*name);
            if candidate.exists() {
                return Some(candidate);
            }
        }

        let home = dirs::home_dir().and_then(|h| Utf8PathBuf::from_path_buf(h).ok())?;
        let candidate = home.join(".credstash").join("config.yaml");
        candidate.exists().then_some(candidate)
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::from_path_buf(dir.path().join("credstash.yaml")).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn clear_env() {
        std::env::remove_var(ENV_TABLE);
        std::env::remove_var(ENV_KMS_KEY);
        std::env::remove_var(ENV_REGION);
    }

    #[test]
    #[serial]
    fn test_load_explicit_path() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
table: team-secrets
kms_key_id: alias/team
region: eu-west-1
dynamodb_endpoint: http://localhost:8000
retry:
  max_attempts: 5
  operation_timeout_secs: 10
context:
  env: prod
"#,
        );

        let config = StashConfig::load(Some(&path)).unwrap();
        assert_eq!(config.table, "team-secrets");
        assert_eq!(config.kms_key_id, "alias/team");
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.dynamodb_endpoint.as_deref(), Some("http://localhost:8000"));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.operation_timeout_secs, Some(10));
        assert_eq!(config.encryption_context().unwrap().get("env"), Some("prod"));
    }

    #[test]
    #[serial]
    fn test_partial_file_uses_defaults() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "region: us-west-2\n");

        let config = StashConfig::load(Some(&path)).unwrap();
        assert_eq!(config.table, "credential-store");
        assert_eq!(config.kms_key_id, "alias/credstash");
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    #[serial]
    fn test_missing_explicit_path() {
        clear_env();
        let err = StashConfig::load(Some(Utf8Path::new("/nonexistent/credstash.yaml")))
            .unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "table: from-file\n");

        std::env::set_var(ENV_TABLE, "from-env");
        std::env::set_var(ENV_KMS_KEY, "alias/env-key");
        std::env::set_var(ENV_REGION, "ap-south-1");
        let config = StashConfig::load(Some(&path));
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.table, "from-env");
        assert_eq!(config.kms_key_id, "alias/env-key");
        assert_eq!(config.region.as_deref(), Some("ap-south-1"));
    }

    #[test]
    #[serial]
    fn test_invalid_context_rejected() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "context:\n  tags: [a, b]\n");

        let err = StashConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = StashConfig::from_yaml("retry:\n  max_attempts: 0\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(StashConfig::from_yaml("  \n").unwrap(), StashConfig::default());
    }

    #[test]
    fn test_malformed_yaml() {
        assert!(matches!(
            StashConfig::from_yaml("table: [unclosed"),
            Err(Error::YamlParse(_))
        ));
    }
}
