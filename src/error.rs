use std::io;

/// Custom error type for compose_redeploy operations
#[derive(Debug, thiserror::Error)]
pub enum RedeployError {
    #[error("Git operation failed: {operation}\n{message}")]
    GitOperationFailed { operation: String, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(
        "Missing webhook secret: environment variable '{var}' is unset or empty.\n\
         To fix this:\n\
         \x20 1. enable the redeploy webhook for the service upstream\n\
         \x20 2. store the webhook URL as the '{var}' secret\n\
         \x20 3. pass the secret through to the deploy job's environment"
    )]
    MissingSecret { var: String },

    #[error("Webhook URL in '{var}' must start with https://")]
    InvalidWebhookScheme { var: String },

    #[error("Webhook returned HTTP {status}")]
    HttpFailure { status: u16 },

    #[error("Network error calling webhook: {0}")]
    NetworkError(String),

    #[error("Webhook request timed out")]
    Timeout,

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

/// Helper type for Results that use RedeployError
pub type Result<T> = std::result::Result<T, RedeployError>;
