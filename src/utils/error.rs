use thiserror::Error;

/// Failure raised by the browser-automation collaborator, classified once at the
/// adapter boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScrapeError {
    /// The renderer behind the session died; the session is unusable.
    #[error("browser session crashed: {0}")]
    SessionCrash(String),

    #[error("browser operation timed out: {0}")]
    Timeout(String),

    #[error("browser operation failed: {0}")]
    Other(String),
}

impl ScrapeError {
    pub fn is_session_crash(&self) -> bool {
        matches!(self, ScrapeError::SessionCrash(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("extraction service error: {0}")]
    ServiceError(String),

    #[error("extraction service returned malformed data: {raw_text:?}")]
    MalformedResponse { raw_text: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("resume signal source closed while waiting: {reason}")]
    Closed { reason: String },
}

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("Sheet error: {message}")]
    SheetError { message: String },

    #[error("Registry error: {message}")]
    RegistryError { message: String },
}

/// Error families the pipeline distinguishes when deciding how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    CollaboratorUnavailable,
    MalformedResponse,
    SessionCrash,
    NotFound,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EnrichError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EnrichError::Scrape(ScrapeError::SessionCrash(_)) => ErrorCategory::SessionCrash,
            EnrichError::Extraction(ExtractionError::MalformedResponse { .. })
            | EnrichError::SerializationError(_)
            | EnrichError::CsvError(_) => ErrorCategory::MalformedResponse,
            EnrichError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
                ErrorCategory::NotFound
            }
            EnrichError::ConfigError { .. }
            | EnrichError::InvalidConfigValueError { .. }
            | EnrichError::MissingConfigError { .. } => ErrorCategory::Configuration,
            _ => ErrorCategory::CollaboratorUnavailable,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::NotFound => ErrorSeverity::Low,
            ErrorCategory::SessionCrash | ErrorCategory::MalformedResponse => ErrorSeverity::Medium,
            ErrorCategory::CollaboratorUnavailable => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "Check the TOML config file and the environment variables it references",
            ErrorCategory::SessionCrash => "Restart the browser sidecar and re-run the affected rows",
            ErrorCategory::MalformedResponse => "Inspect the raw payload in the logs; the input sheet or service output may be malformed",
            ErrorCategory::NotFound => "Verify that the input file or sheet range exists",
            ErrorCategory::CollaboratorUnavailable => "Check network access and that every external service endpoint is reachable",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            EnrichError::ConfigError { message } => format!("Configuration problem: {}", message),
            EnrichError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            EnrichError::MissingConfigError { field } => {
                format!("Setting '{}' is required but missing", field)
            }
            EnrichError::SheetError { message } => format!("Spreadsheet access failed: {}", message),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EnrichError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_crash_category() {
        let err = EnrichError::from(ScrapeError::SessionCrash("Target crashed".into()));
        assert_eq!(err.category(), ErrorCategory::SessionCrash);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
    }

    #[test]
    fn test_config_errors_are_critical() {
        let err = EnrichError::MissingConfigError {
            field: "sheet.path".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.user_friendly_message().contains("sheet.path"));
    }

    #[test]
    fn test_malformed_extraction_category() {
        let err = EnrichError::from(ExtractionError::MalformedResponse {
            raw_text: "{oops".into(),
        });
        assert_eq!(err.category(), ErrorCategory::MalformedResponse);
        assert!(err.to_string().contains("{oops"));
    }
}
