use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::collections::HashSet;

use super::{types::Config, ConfigError};

static VARIANT_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(msg.into())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }
    if config.server.sse_keepalive_secs == 0 {
        return Err(invalid("server.sse_keepalive_secs cannot be 0"));
    }
    if config.server.max_upload_bytes == 0 {
        return Err(invalid("server.max_upload_bytes cannot be 0"));
    }

    if config.storage.signing_secret.is_empty() {
        return Err(invalid("storage.signing_secret must be set"));
    }
    if config.storage.upload_url_ttl_secs == 0 {
        return Err(invalid("storage.upload_url_ttl_secs cannot be 0"));
    }

    if config.broker.subscriber_capacity == 0 {
        return Err(invalid("broker.subscriber_capacity cannot be 0"));
    }

    validate_renditions(config)
}

fn validate_renditions(config: &Config) -> Result<(), ConfigError> {
    if config.renditions.is_empty() {
        return Err(invalid("at least one rendition must be configured"));
    }

    let mut names = HashSet::new();
    for variant in &config.renditions {
        if !VARIANT_NAME.is_match(&variant.name) {
            return Err(invalid(format!(
                "rendition name '{}' may only contain letters, digits, '-' and '_'",
                variant.name
            )));
        }
        if !names.insert(variant.name.as_str()) {
            return Err(invalid(format!(
                "duplicate rendition name '{}'",
                variant.name
            )));
        }
        if variant.width == 0 || variant.height == 0 {
            return Err(invalid(format!(
                "rendition '{}' must have non-zero dimensions",
                variant.name
            )));
        }
        if variant.width % 2 != 0 || variant.height % 2 != 0 {
            return Err(invalid(format!(
                "rendition '{}' dimensions must be even",
                variant.name
            )));
        }
        if variant.bitrate_kbps == 0 {
            return Err(invalid(format!(
                "rendition '{}' bitrate cannot be 0",
                variant.name
            )));
        }
    }
    Ok(())
}
