//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate every backend URL before the pool is built
//! - Validate value ranges (intervals > 0, port valid)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use url::Url;

use crate::config::schema::BalancerConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("at least 1 host should be passed")]
    NoHosts,

    #[error("invalid host {host:?}: {reason}")]
    InvalidHost { host: String, reason: String },

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("port must be non-zero")]
    ZeroPort,
}

/// Validate a loaded configuration.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }

    if let Err(e) = validate_hosts(&config.hosts) {
        errors.push(e);
    }

    let ranges = [
        ("health_check.interval_secs", config.health_check.interval_secs),
        ("health_check.timeout_secs", config.health_check.timeout_secs),
        ("load_report.interval_secs", config.load_report.interval_secs),
        ("timeouts.forward_secs", config.timeouts.forward_secs),
    ];
    for (field, value) in ranges {
        if value == 0 {
            errors.push(ValidationError::ZeroValue(field));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check a host list; stops at the first bad entry.
pub fn validate_hosts(hosts: &[String]) -> Result<(), ValidationError> {
    if hosts.is_empty() {
        return Err(ValidationError::NoHosts);
    }
    for host in hosts {
        parse_backend_url(host)?;
    }
    Ok(())
}

/// Parse a backend URL, requiring a plain `http` scheme and a host.
pub fn parse_backend_url(host: &str) -> Result<Url, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidHost {
        host: host.to_string(),
        reason,
    };

    let url = Url::parse(host).map_err(|e| invalid(e.to_string()))?;
    if url.scheme() != "http" {
        return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    if url.port_or_known_default().is_none() {
        return Err(invalid("missing port".to_string()));
    }
    Ok(url)
}
