//! Value Validation
//!
//! An ordered list of independent checks. The first failing check wins.

use url::Url;

use crate::error::{RegistryError, Result};

/// Longest value accepted by [`max_length`].
pub const MAX_VALUE_LENGTH: usize = 2048;

/// A single check: `Err` carries the reason shown to the caller.
pub type Check = fn(&str) -> std::result::Result<(), String>;

// == Validator ==
/// Runs checks in order and stops at the first failure.
#[derive(Debug, Clone)]
pub struct Validator {
    checks: Vec<Check>,
}

impl Validator {
    pub fn new(checks: Vec<Check>) -> Self {
        Self { checks }
    }

    /// Accepts everything.
    pub fn permissive() -> Self {
        Self::new(Vec::new())
    }

    pub fn validate(&self, value: &str) -> Result<()> {
        self.checks
            .iter()
            .try_for_each(|check| check(value))
            .map_err(RegistryError::InvalidValue)
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl Default for Validator {
    /// `not_blank`, `max_length`, `url_format`, then `http_url`.
    fn default() -> Self {
        Self::new(vec![not_blank as Check, max_length, url_format, http_url])
    }
}

// == Checks ==
pub fn not_blank(value: &str) -> std::result::Result<(), String> {
    if value.trim().is_empty() {
        return Err("Value cannot be empty".to_string());
    }
    Ok(())
}

pub fn max_length(value: &str) -> std::result::Result<(), String> {
    if value.chars().count() > MAX_VALUE_LENGTH {
        return Err(format!(
            "Value exceeds maximum length of {} characters",
            MAX_VALUE_LENGTH
        ));
    }
    Ok(())
}

/// Shape check: `http(s)://`, a host of two or more dot-separated labels,
/// an optional numeric port, then an optional path starting with `/`.
pub fn url_format(value: &str) -> std::result::Result<(), String> {
    let invalid = || format!("Invalid URL format: {}", value);

    if value.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (scheme, rest) = value.split_once("://").ok_or_else(invalid)?;
    if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
        return Err(invalid());
    }

    let authority = rest.split('/').next().unwrap_or_default();
    let (host, port) = match authority.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (authority, None),
    };

    let labels: Vec<&str> = host.split('.').collect();
    let host_ok = labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        });
    let port_ok = port.map_or(true, |p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));

    if host_ok && port_ok {
        Ok(())
    } else {
        Err(invalid())
    }
}

/// Parses the value as a URL and requires the `http` or `https` scheme.
pub fn http_url(value: &str) -> std::result::Result<(), String> {
    let url = Url::parse(value).map_err(|e| format!("Malformed URL: {} ({})", value, e))?;

    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(()),
        "http" | "https" => Err(format!("Malformed URL: {} (missing host)", value)),
        _ => Err("Only HTTP and HTTPS URLs are supported".to_string()),
    }
}
