use std::net::IpAddr;

use crate::settings::Settings;

/// Validation results with specific error messages
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self { is_valid: true, error: None }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self { is_valid: false, error: Some(msg.into()) }
    }

    /// Turn a failed validation into the caller's error type
    pub fn into_result<E>(self, to_error: impl FnOnce(String) -> E) -> Result<(), E> {
        if self.is_valid {
            Ok(())
        } else {
            Err(to_error(self.error.unwrap_or_else(|| "Validation failed".to_string())))
        }
    }
}

const MAX_HOSTNAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 128;

pub const MIN_INTERVAL_SEC: u64 = 1;
pub const MAX_INTERVAL_SEC: u64 = 86_400;
pub const MIN_TIMEOUT_SEC: u64 = 1;
pub const MAX_TIMEOUT_SEC: u64 = 300;
/// Largest echo payload that still fits an IPv4 datagram with headers
pub const MAX_PAYLOAD_SIZE: u32 = 65_500;

/// Validate a probe target: an IP literal or an RFC 1123 hostname
pub fn validate_address(address: &str) -> ValidationResult {
    if address.trim().is_empty() {
        return ValidationResult::err("Address cannot be empty");
    }

    if address.chars().any(char::is_whitespace) {
        return ValidationResult::err("Address cannot contain whitespace");
    }

    if address.parse::<IpAddr>().is_ok() {
        return ValidationResult::ok();
    }

    let host = address.strip_suffix('.').unwrap_or(address);
    if host.len() > MAX_HOSTNAME_LEN {
        return ValidationResult::err(format!(
            "Hostname too long: {} characters (maximum: {MAX_HOSTNAME_LEN})",
            host.len()
        ));
    }

    for label in host.split('.') {
        if label.is_empty() || label.len() > 63 {
            return ValidationResult::err(format!("Invalid hostname label in '{address}'"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return ValidationResult::err(format!(
                "Hostname label '{label}' cannot start or end with '-'"
            ));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return ValidationResult::err(format!("Hostname label '{label}' has invalid characters"));
        }
    }

    ValidationResult::ok()
}

pub fn validate_label(label: &str) -> ValidationResult {
    if label.chars().count() > MAX_LABEL_LEN {
        return ValidationResult::err(format!("Label too long (maximum: {MAX_LABEL_LEN})"));
    }
    ValidationResult::ok()
}

/// Validate probe interval
pub fn validate_check_interval(interval_seconds: u64) -> ValidationResult {
    if interval_seconds < MIN_INTERVAL_SEC {
        return ValidationResult::err(format!(
            "Ping interval too short: {interval_seconds} seconds (minimum: {MIN_INTERVAL_SEC})"
        ));
    }

    if interval_seconds > MAX_INTERVAL_SEC {
        return ValidationResult::err(format!(
            "Ping interval too long: {interval_seconds} seconds (maximum: {MAX_INTERVAL_SEC})"
        ));
    }

    ValidationResult::ok()
}

/// Validate timeout is reasonable
pub fn validate_timeout(timeout_seconds: u64) -> ValidationResult {
    if !(MIN_TIMEOUT_SEC..=MAX_TIMEOUT_SEC).contains(&timeout_seconds) {
        return ValidationResult::err(format!(
            "Ping timeout must be between {MIN_TIMEOUT_SEC} and {MAX_TIMEOUT_SEC} seconds, got {timeout_seconds}"
        ));
    }

    ValidationResult::ok()
}

/// Validate a complete settings record; the first violated bound wins
pub fn validate_settings(settings: &Settings) -> ValidationResult {
    let interval = validate_check_interval(settings.ping_interval_sec);
    if !interval.is_valid {
        return interval;
    }

    let timeout = validate_timeout(settings.ping_timeout_sec);
    if !timeout.is_valid {
        return timeout;
    }

    if settings.icmp_payload_size > MAX_PAYLOAD_SIZE {
        return ValidationResult::err(format!(
            "ICMP payload too large: {} bytes (maximum: {MAX_PAYLOAD_SIZE})",
            settings.icmp_payload_size
        ));
    }

    if !(MIN_INTERVAL_SEC..=MAX_INTERVAL_SEC).contains(&settings.auto_refresh_sec) {
        return ValidationResult::err(format!(
            "Auto refresh must be between {MIN_INTERVAL_SEC} and {MAX_INTERVAL_SEC} seconds, got {}",
            settings.auto_refresh_sec
        ));
    }

    ValidationResult::ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_address() {
        assert!(validate_address("8.8.8.8").is_valid);
        assert!(validate_address("::1").is_valid);
        assert!(validate_address("router.lan").is_valid);
        assert!(validate_address("example.com.").is_valid);
        assert!(validate_address("host-01").is_valid);

        assert!(!validate_address("").is_valid);
        assert!(!validate_address("   ").is_valid);
        assert!(!validate_address("bad host").is_valid);
        assert!(!validate_address("-leading.example").is_valid);
        assert!(!validate_address("double..dot").is_valid);
        assert!(!validate_address("under_score.example").is_valid);
        assert!(!validate_address(&"a".repeat(64)).is_valid);
    }

    #[test]
    fn test_validate_check_interval() {
        assert!(validate_check_interval(1).is_valid);
        assert!(validate_check_interval(60).is_valid);
        assert!(validate_check_interval(86_400).is_valid);

        assert!(!validate_check_interval(0).is_valid);
        assert!(!validate_check_interval(100_000).is_valid);
    }

    #[test]
    fn test_validate_settings() {
        let good = Settings::default();
        assert!(validate_settings(&good).is_valid);

        let zero_timeout = Settings { ping_timeout_sec: 0, ..good };
        let err = validate_settings(&zero_timeout).error.unwrap();
        assert!(err.contains("timeout"), "{err}");

        let huge_payload = Settings { icmp_payload_size: 70_000, ..good };
        assert!(!validate_settings(&huge_payload).is_valid);

        let no_refresh = Settings { auto_refresh_sec: 0, ..good };
        assert!(!validate_settings(&no_refresh).is_valid);
    }

    #[test]
    fn test_into_result_maps_error() {
        let result: Result<(), String> = ValidationResult::err("nope").into_result(|m| m);
        assert_eq!(result, Err("nope".to_string()));
        assert!(ValidationResult::ok().into_result(|m| m).is_ok());
    }
}
