use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("API request failed: {0}")]
    TransportError(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    #[error("Session expired ({code})")]
    SessionExpired { code: String },

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid schedule record {record}: {reason}")]
    InvalidScheduleError { record: String, reason: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Authentication,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::TransportError(_) | AppError::HttpError { .. } => ErrorCategory::Network,
            AppError::SessionExpired { .. } | AppError::NotAuthenticated => {
                ErrorCategory::Authentication
            }
            AppError::ConfigError { .. }
            | AppError::MissingConfigError { .. }
            | AppError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            AppError::CsvError(_)
            | AppError::SerializationError(_)
            | AppError::InvalidScheduleError { .. }
            | AppError::ValidationError { .. } => ErrorCategory::Data,
            AppError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單筆排程記錄壞掉只會被略過
            AppError::InvalidScheduleError { .. } => ErrorSeverity::Low,
            AppError::TransportError(_)
            | AppError::SessionExpired { .. }
            | AppError::NotAuthenticated => ErrorSeverity::Medium,
            AppError::HttpError { status, .. } if *status >= 500 => ErrorSeverity::Medium,
            AppError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// HTTP 狀態碼（如果有）
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::HttpError { status, .. } => Some(*status),
            AppError::SessionExpired { .. } => Some(401),
            AppError::TransportError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AppError::TransportError(_) => "Could not reach the backend API".to_string(),
            AppError::HttpError { status, body } if body.is_empty() => {
                format!("The backend rejected the request (HTTP {})", status)
            }
            AppError::HttpError { status, body } => {
                format!("The backend rejected the request (HTTP {}): {}", status, body)
            }
            AppError::SessionExpired { .. } => "Your session has expired".to_string(),
            AppError::NotAuthenticated => "You are not logged in".to_string(),
            AppError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid setting '{}': {}", field, reason)
            }
            AppError::MissingConfigError { field } => {
                format!("Missing required setting '{}'", field)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check the API base URL and that the backend is running",
            ErrorCategory::Authentication => "Run `contract-invoicer login` to sign in again",
            ErrorCategory::Configuration => "Review the configuration file and command-line flags",
            ErrorCategory::Data => "Check the input data for malformed fields",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    pub fn requires_login(&self) -> bool {
        self.category() == ErrorCategory::Authentication
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
