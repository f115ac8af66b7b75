//! Shared AWS SDK configuration
//!
//! Retry and timeout policy live here, at the backend boundary, and are driven by
//! [`StashConfig::retry`]. The core never retries on its own.

use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use credstash_core::StashConfig;
use std::time::Duration;
use tracing::debug;

/// Load the SDK configuration shared by the KMS and DynamoDB clients
pub async fn load_sdk_config(config: &StashConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .retry_config(RetryConfig::standard().with_max_attempts(config.retry.max_attempts));

    if let Some(region) = &config.region {
        debug!("Using AWS region: {}", region);
        loader = loader.region(Region::new(region.clone()));
    }

    if let Some(secs) = config.retry.operation_timeout_secs {
        loader = loader.timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(Duration::from_secs(secs))
                .build(),
        );
    }

    loader.load().await
}
