use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned {status} for {url}")]
    HttpStatusError { url: String, status: u16 },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] tokio_rusqlite::Error),

    #[error("Spreadsheet error: {message}")]
    SpreadsheetError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("No API client for marketplace '{0}'")]
    UnknownMarketplace(String),

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn spreadsheet(message: impl Into<String>) -> Self {
        EtlError::SpreadsheetError {
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        EtlError::ProcessingError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_) | EtlError::HttpStatusError { .. } => ErrorCategory::Network,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::UnknownMarketplace(_) => ErrorCategory::Configuration,
            EtlError::ZipError(_)
            | EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::SpreadsheetError { .. }
            | EtlError::ProcessingError { .. }
            | EtlError::ValidationError { .. } => ErrorCategory::Data,
            EtlError::IoError(_) | EtlError::DatabaseError(_) => ErrorCategory::Storage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::ApiError(_) | EtlError::HttpStatusError { .. } => ErrorSeverity::Medium,
            EtlError::ValidationError { .. } => ErrorSeverity::Low,
            EtlError::IoError(_) | EtlError::DatabaseError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::ApiError(_) => "Check network connectivity and the marketplace base URL",
            EtlError::HttpStatusError { status, .. } if *status == 401 || *status == 403 => {
                "Check the marketplace API key and shop id"
            }
            EtlError::HttpStatusError { .. } => "Retry later or narrow the date range",
            EtlError::ZipError(_) | EtlError::SpreadsheetError { .. } => {
                "Make sure the file is a valid .xlsx workbook"
            }
            EtlError::CsvError(_) | EtlError::SerializationError(_) => {
                "Inspect the payload for unexpected formatting"
            }
            EtlError::IoError(_) => "Check that the path exists and is readable/writable",
            EtlError::DatabaseError(_) => "Check the database path or remove a corrupted file",
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. } => "Fix the configuration file and retry",
            EtlError::MissingConfigError { .. } => {
                "Add the missing key to the configuration file or environment"
            }
            EtlError::UnknownMarketplace(_) => "Use one of: Worten, Leroy Merlin",
            EtlError::ProcessingError { .. } | EtlError::ValidationError { .. } => {
                "Review the input data"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Marketplace API unreachable: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Data => format!("Could not process input data: {}", self),
            ErrorCategory::Storage => format!("Storage failure: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_and_severity() {
        let err = EtlError::HttpStatusError {
            url: "https://example.com".to_string(),
            status: 401,
        };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(
            err.recovery_suggestion(),
            "Check the marketplace API key and shop id"
        );

        let err = EtlError::UnknownMarketplace("Amazon".to_string());
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.user_friendly_message().contains("Amazon"));
    }
}
