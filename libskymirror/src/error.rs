//! Error types for Skymirror

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MirrorError>;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Source timeline error: {0}")]
    Source(#[from] SourceError),

    #[error("Link preview error: {0}")]
    Preview(#[from] PreviewError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl MirrorError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            MirrorError::InvalidInput(_) => 3,
            MirrorError::Platform(PlatformError::Authentication(_)) => 2,
            _ => 1,
        }
    }

    /// True for errors that abandon the current poll cycle rather than the
    /// whole process: timeline fetch/parse failures and link-preview
    /// fetch failures.
    pub fn is_cycle_transient(&self) -> bool {
        matches!(self, MirrorError::Source(_) | MirrorError::Preview(_))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Errors from the source timeline endpoint (fetch or decode).
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Timeline request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors while resolving a link preview (redirects, page body, image bytes).
#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("Preview fetch failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Content validation failed: {0}")]
    Validation(String),

    #[error("Posting failed: {0}")]
    Posting(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Invalid mailbox address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP transport failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_input() {
        let error = MirrorError::InvalidInput("Empty content".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_authentication_error() {
        let error = MirrorError::Platform(PlatformError::Authentication("bad creds".to_string()));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_other_platform_errors() {
        for error in [
            PlatformError::Posting("timeout".to_string()),
            PlatformError::Validation("too long".to_string()),
            PlatformError::Network("refused".to_string()),
            PlatformError::RateLimit("slow down".to_string()),
        ] {
            assert_eq!(MirrorError::Platform(error).exit_code(), 1);
        }
    }

    #[test]
    fn test_exit_code_config_error() {
        let error = MirrorError::Config(ConfigError::MissingField("bluesky.handle".to_string()));
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_cycle_transient_classification() {
        let config = MirrorError::Config(ConfigError::MissingField("x".to_string()));
        assert!(!config.is_cycle_transient());

        let platform = MirrorError::Platform(PlatformError::Posting("x".to_string()));
        assert!(!platform.is_cycle_transient());

        let invalid = MirrorError::InvalidInput("x".to_string());
        assert!(!invalid.is_cycle_transient());
    }

    #[test]
    fn test_error_message_formatting() {
        let error = MirrorError::Platform(PlatformError::Authentication(
            "Keys rejected".to_string(),
        ));
        assert_eq!(
            format!("{}", error),
            "Platform error: Authentication failed: Keys rejected"
        );

        let error = MirrorError::InvalidInput("Content cannot be empty".to_string());
        assert_eq!(format!("{}", error), "Invalid input: Content cannot be empty");

        let error = ConfigError::MissingField("source.api_key".to_string());
        assert_eq!(
            format!("{}", error),
            "Missing required field: source.api_key"
        );
    }

    #[test]
    fn test_error_conversion_from_platform_error() {
        let platform_error = PlatformError::Posting("test".to_string());
        let mirror_error: MirrorError = platform_error.into();
        assert!(matches!(mirror_error, MirrorError::Platform(_)));
    }

    #[test]
    fn test_error_conversion_from_config_error() {
        let config_error = ConfigError::MissingField("test".to_string());
        let mirror_error: MirrorError = config_error.into();
        assert!(matches!(mirror_error, MirrorError::Config(_)));
    }

    #[test]
    fn test_platform_error_clone() {
        let original = PlatformError::Network("Connection failed".to_string());
        let cloned = original.clone();
        assert_eq!(format!("{}", original), format!("{}", cloned));
    }
}
