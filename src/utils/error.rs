use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Connection failed: {message}")]
    Connection { message: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

/// Two categories reach the user as distinct failures: store connectivity and
/// everything unforeseen. Validation and configuration are refused up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Connection,
    Validation,
    Configuration,
    Unexpected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ReportError {
    pub fn connection(message: impl Into<String>) -> Self {
        ReportError::Connection {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ReportError::ValidationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ReportError::Connection { .. } | ReportError::Database(_) => ErrorCategory::Connection,
            ReportError::ValidationError { .. } => ErrorCategory::Validation,
            ReportError::ConfigError { .. }
            | ReportError::MissingConfigError { .. }
            | ReportError::InvalidConfigValueError { .. }
            | ReportError::CsvError(_) => ErrorCategory::Configuration,
            ReportError::Workbook(_) | ReportError::IoError(_) => ErrorCategory::Unexpected,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Connection => ErrorSeverity::Medium,
            ErrorCategory::Unexpected => ErrorSeverity::Critical,
        }
    }

    pub fn is_connection_error(&self) -> bool {
        self.category() == ErrorCategory::Connection
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Connection => format!("Erro relacionado ao banco de dados: {}", self),
            ErrorCategory::Validation => match self {
                ReportError::ValidationError { message } => message.clone(),
                other => other.to_string(),
            },
            ErrorCategory::Configuration => format!("Configuração inválida: {}", self),
            ErrorCategory::Unexpected => format!("Erro inesperado: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ReportError::Connection { .. } => {
                "Check that database.path points to a readable database file"
            }
            ReportError::Database(_) => {
                "Check that the store exposes the expected views and columns"
            }
            ReportError::ValidationError { .. } => "Choose a start date on or before the end date",
            ReportError::MissingConfigError { .. } => {
                "Set the missing field in the config file or export the referenced variable"
            }
            ReportError::InvalidConfigValueError { .. } | ReportError::ConfigError { .. } => {
                "Fix the configuration value and run again"
            }
            ReportError::CsvError(_) => "Lookup files need a header row and two columns",
            ReportError::IoError(_) => "Check permissions on the output directory",
            ReportError::Workbook(_) => "Run again with --verbose and report the log",
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
