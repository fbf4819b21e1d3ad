//! Mapping changed paths to service names and their webhook secrets.

use crate::error::{RedeployError, Result};
use regex::Regex;

/// Matches paths of the form `<services_dir>/<name>/<compose_file>` where
/// `<name>` is a single path segment.
pub struct ServiceMatcher {
    pattern: Regex,
}

impl ServiceMatcher {
    pub fn new(services_dir: &str, compose_file: &str) -> Result<Self> {
        let pattern = Regex::new(&format!(
            "^{}/([^/]+)/{}$",
            regex::escape(services_dir),
            regex::escape(compose_file)
        ))
        .map_err(|e| RedeployError::ConfigError(format!("Invalid service path pattern: {}", e)))?;
        Ok(Self { pattern })
    }

    /// Extract the distinct service names whose compose file appears in `paths`.
    /// Non-matching paths are ignored; order of the result is first-seen order.
    pub fn extract_service_names(&self, paths: &[String]) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for path in paths {
            if let Some(caps) = self.pattern.captures(path) {
                let name = caps[1].to_string();
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }
}

/// Environment variable name holding the webhook URL for `service`:
/// uppercase, hyphens replaced with underscores, prefixed.
pub fn secret_key_for(prefix: &str, service: &str) -> String {
    format!("{}{}", prefix, service.to_uppercase().replace('-', "_"))
}

/// Resolve the webhook URL for `service` from the process environment.
pub fn resolve_webhook(prefix: &str, service: &str) -> Result<String> {
    let var = secret_key_for(prefix, service);
    let url = std::env::var(&var).unwrap_or_default();
    if url.is_empty() {
        return Err(RedeployError::MissingSecret { var });
    }
    if !url.starts_with("https://") {
        return Err(RedeployError::InvalidWebhookScheme { var });
    }
    Ok(url)
}
