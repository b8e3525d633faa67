use thiserror::Error;

/// Top-level error type for the Tingxie system.
///
/// Subsystem crates define their own error types and implement
/// `From<TingxieError>` so that the `?` operator works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TingxieError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Word list error: {0}")]
    WordList(String),

    #[error("Pagination error: {0}")]
    Pagination(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for TingxieError {
    fn from(err: toml::de::Error) -> Self {
        TingxieError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for TingxieError {
    fn from(err: toml::ser::Error) -> Self {
        TingxieError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for TingxieError {
    fn from(err: serde_json::Error) -> Self {
        TingxieError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Tingxie operations.
pub type Result<T> = std::result::Result<T, TingxieError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TingxieError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "wordlist.txt");
        let err: TingxieError = io_err.into();
        assert!(matches!(err, TingxieError::Io(_)));
        assert!(err.to_string().contains("wordlist.txt"));
    }

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(TingxieError, &str)> = vec![
            (
                TingxieError::WordList("no header".into()),
                "Word list error: no header",
            ),
            (
                TingxieError::Pagination("page size".into()),
                "Pagination error: page size",
            ),
            (
                TingxieError::Translation("upstream 404".into()),
                "Translation error: upstream 404",
            ),
            (
                TingxieError::Transport("closed".into()),
                "Transport error: closed",
            ),
            (TingxieError::Api("bind".into()), "API error: bind"),
            (
                TingxieError::Serialization("eof".into()),
                "Serialization error: eof",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_toml_error_conversion() {
        let parse_err = toml::from_str::<toml::Value>("= broken").unwrap_err();
        let err: TingxieError = parse_err.into();
        assert!(matches!(err, TingxieError::Config(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: TingxieError = parse_err.into();
        assert!(matches!(err, TingxieError::Serialization(_)));
    }
}
