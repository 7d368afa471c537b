use thiserror::Error;

/// Top-level error type for the Shopmate service.
///
/// Subsystem crates define their own error types; this one covers the
/// cross-cutting concerns (configuration, I/O, serialization, serving) that
/// the binary and the config layer deal with directly.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ShopmateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Shutdown in progress")]
    ShuttingDown,
}

impl From<toml::de::Error> for ShopmateError {
    fn from(err: toml::de::Error) -> Self {
        ShopmateError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ShopmateError {
    fn from(err: toml::ser::Error) -> Self {
        ShopmateError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ShopmateError {
    fn from(err: serde_json::Error) -> Self {
        ShopmateError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Shopmate operations.
pub type Result<T> = std::result::Result<T, ShopmateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ShopmateError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(ShopmateError, &str)> = vec![
            (
                ShopmateError::Config("bad key".to_string()),
                "Configuration error: bad key",
            ),
            (
                ShopmateError::Provider("search down".to_string()),
                "Provider error: search down",
            ),
            (
                ShopmateError::Session("evicted".to_string()),
                "Session error: evicted",
            ),
            (
                ShopmateError::Api("bind failed".to_string()),
                "API error: bind failed",
            ),
            (
                ShopmateError::Serialization("invalid json".to_string()),
                "Serialization error: invalid json",
            ),
            (ShopmateError::ShuttingDown, "Shutdown in progress"),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ShopmateError = io_err.into();
        assert!(matches!(err, ShopmateError::Io(_)));
        assert!(err.to_string().starts_with("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let err: ShopmateError = err.unwrap_err().into();
        assert!(matches!(err, ShopmateError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let err: ShopmateError = err.unwrap_err().into();
        assert!(matches!(err, ShopmateError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
