//! Error types for qawolf-ci-core

use thiserror::Error;

/// Result type alias for qawolf-ci operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for qawolf-ci operations
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing configuration input
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required remote entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// GitHub API error
    #[error("GitHub API error: {0}")]
    Github(String),

    /// QA Wolf API error (transport failure or error payload)
    #[error("QA Wolf API error: {0}")]
    Api(String),

    /// Remote response missing data the flow depends on
    #[error("API contract violation: {0}")]
    Contract(String),
}

impl Error {
    /// Borrow the error message without the category prefix.
    #[inline]
    pub fn message(&self) -> &str {
        match self {
            Error::Config(msg)
            | Error::NotFound(msg)
            | Error::Github(msg)
            | Error::Api(msg)
            | Error::Contract(msg) => msg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_category_prefix() {
        let err = Error::Config("missing required input: operation".to_string());
        assert_eq!(
            format!("{}", err),
            "Configuration error: missing required input: operation"
        );
    }

    #[test]
    fn test_error_message_borrows() {
        let err = Error::NotFound("no branch found for SHA or PR ref: abc123".to_string());
        let msg: &str = err.message();
        assert_eq!(msg, "no branch found for SHA or PR ref: abc123");
    }

    #[test]
    fn test_error_messages_never_contain_token_patterns() {
        // Verify that error variant messages don't accidentally include
        // API key or token patterns
        let token_patterns = ["qawolf_", "ghp_", "github_pat_", "Bearer "];
        let errors: Vec<Error> = vec![
            Error::Config("config error".into()),
            Error::NotFound("not found".into()),
            Error::Github("github error".into()),
            Error::Api("api error".into()),
            Error::Contract("contract error".into()),
        ];

        for err in &errors {
            let display = format!("{}", err);
            let debug = format!("{:?}", err);
            for pattern in &token_patterns {
                assert!(
                    !display.contains(pattern),
                    "Error Display contains token pattern '{}': {}",
                    pattern,
                    display
                );
                assert!(
                    !debug.contains(pattern),
                    "Error Debug contains token pattern '{}': {}",
                    pattern,
                    debug
                );
            }
        }
    }
}
