// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::CourierConfig;

/// Smallest accepted `session.max_frame_bytes`; a signaling frame must fit.
const MIN_FRAME_BYTES: usize = 512;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first.
pub fn validate_config(config: &CourierConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let host = config.server.host.trim();
    if host.is_empty() {
        fail("server.host must not be empty".to_string());
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':')
    {
        fail(format!(
            "server.host `{host}` is not a valid IP address or hostname"
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let session = &config.session;
    if session.outbound_queue_capacity == 0 {
        fail("session.outbound_queue_capacity must be at least 1".to_string());
    }
    if session.max_frame_bytes < MIN_FRAME_BYTES {
        fail(format!(
            "session.max_frame_bytes must be at least {MIN_FRAME_BYTES}, got {}",
            session.max_frame_bytes
        ));
    }
    if session.ping_interval_secs == 0 {
        fail("session.ping_interval_secs must be greater than 0".to_string());
    }
    if session.read_deadline_secs == 0 {
        fail("session.read_deadline_secs must be greater than 0".to_string());
    }
    if session.ping_interval_secs >= session.read_deadline_secs {
        fail(format!(
            "session.ping_interval_secs ({}) must be shorter than session.read_deadline_secs ({})",
            session.ping_interval_secs, session.read_deadline_secs
        ));
    }

    if config.sequencer.side_effect_retry_base_ms == 0 && config.sequencer.side_effect_retries > 0 {
        fail("sequencer.side_effect_retry_base_ms must be greater than 0 when retries are enabled".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&CourierConfig::default()).is_ok());
    }

    #[test]
    fn ping_must_be_shorter_than_deadline() {
        let mut config = CourierConfig::default();
        config.session.ping_interval_secs = 60;
        config.session.read_deadline_secs = 60;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("ping_interval_secs"));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = CourierConfig::default();
        config.server.host = " ".to_string();
        config.storage.database_path = String::new();
        config.session.outbound_queue_capacity = 0;
        config.session.max_frame_bytes = 10;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn rejects_invalid_host() {
        let mut config = CourierConfig::default();
        config.server.host = "bad host!".to_string();
        assert!(validate_config(&config).is_err());
    }
}
