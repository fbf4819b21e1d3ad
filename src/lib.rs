pub mod changes;
pub mod deploy;
pub mod error;
pub mod services;
pub mod webhook;

use serde::Deserialize;
use std::time::Duration;

const DEFAULT_SERVICES_DIR: &str = "services";
const DEFAULT_COMPOSE_FILE: &str = "compose.yaml";
const DEFAULT_SECRET_PREFIX: &str = "PORTAINER_WEBHOOK_";

#[derive(Debug, Deserialize, Clone)]
pub struct DeployConfig {
    /// Directory the deployable service stacks live under.
    #[serde(default = "default_services_dir")]
    pub services_dir: String,
    /// Compose file name that marks a service as changed (exact filename, no subdirectories).
    #[serde(default = "default_compose_file")]
    pub compose_file: String,
    /// Prefix of the environment variable holding each service's webhook URL.
    #[serde(default = "default_secret_prefix")]
    pub secret_prefix: String,
    /// Whether to append `?action=redeploy` to the webhook URL.
    #[serde(default = "default_append_action")]
    pub append_action: bool,
    /// Repository to diff for changed paths.
    #[serde(default = "default_repo_path")]
    pub repo_path: String,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            services_dir: default_services_dir(),
            compose_file: default_compose_file(),
            secret_prefix: default_secret_prefix(),
            append_action: default_append_action(),
            repo_path: default_repo_path(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Bounded retry settings for webhook dispatch.
#[derive(Debug, Deserialize, Clone)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl RetryPolicy {
    /// Fixed delay applied before each retry, never after the final attempt.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_services_dir() -> String {
    DEFAULT_SERVICES_DIR.to_string()
}

fn default_compose_file() -> String {
    DEFAULT_COMPOSE_FILE.to_string()
}

fn default_secret_prefix() -> String {
    DEFAULT_SECRET_PREFIX.to_string()
}

fn default_append_action() -> bool {
    true
}

fn default_repo_path() -> String {
    ".".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    5_000
}

fn default_request_timeout_secs() -> u64 {
    10
}
