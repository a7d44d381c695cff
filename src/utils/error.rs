use crate::core::failure::ValidationFailure;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Schema error: {message}")]
    SchemaError { message: String },

    #[error("Invalid date pattern '{pattern}': {reason}")]
    InvalidDatePattern { pattern: String, reason: String },

    #[error("Unparseable date '{input}' for pattern '{pattern}': {reason}")]
    DateParseError {
        input: String,
        pattern: String,
        reason: String,
    },

    #[error("Unable to format date with pattern '{pattern}': {reason}")]
    DateFormatError { pattern: String, reason: String },

    #[error("Record error: {message}")]
    RecordError { message: String },

    #[error("Errors were encountered during validation. {}", join_failures(.failures))]
    ValidationFailed { failures: Vec<ValidationFailure> },

    #[error("Source field: {field} must be of type string or long. It is type: {found}")]
    UnsupportedSourceType { field: String, found: String },

    #[error("Cannot parse value {value} of field '{field}' for format {format}. {cause}.")]
    ConversionError {
        field: String,
        value: String,
        format: String,
        cause: String,
    },
}

fn join_failures(failures: &[ValidationFailure]) -> String {
    failures
        .iter()
        .map(|f| f.full_message())
        .collect::<Vec<_>>()
        .join(" ")
}

impl TransformError {
    pub(crate) fn record(message: impl Into<String>) -> Self {
        TransformError::RecordError {
            message: message.into(),
        }
    }

    pub(crate) fn schema(message: impl Into<String>) -> Self {
        TransformError::SchemaError {
            message: message.into(),
        }
    }

    /// Failures raised by a [`crate::core::failure::FailureCollector`], empty for any other error.
    pub fn failures(&self) -> &[ValidationFailure] {
        match self {
            TransformError::ValidationFailed { failures } => failures,
            _ => &[],
        }
    }

    /// True for errors that abort a single record rather than the whole stage.
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            TransformError::UnsupportedSourceType { .. }
                | TransformError::ConversionError { .. }
                | TransformError::RecordError { .. }
        )
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            TransformError::IoError(_) => "Check that the file exists and is readable",
            TransformError::SerializationError(_) => "Check that every input line is a JSON object",
            TransformError::ConfigError { .. }
            | TransformError::InvalidConfigValueError { .. } => {
                "Review the [transform] section of the configuration file"
            }
            TransformError::MissingConfigError { .. } => {
                "Provide the missing property or add the macro to the [macros] table"
            }
            TransformError::SchemaError { .. } => {
                "Schemas must be JSON records: {\"type\":\"record\",\"name\":..,\"fields\":[..]}"
            }
            TransformError::InvalidDatePattern { .. } => {
                "Use letter based date patterns such as 'yyyy-MM-dd HH:mm:ss'"
            }
            TransformError::DateParseError { .. } | TransformError::ConversionError { .. } => {
                "Make sure sourceFormat matches the values of the source fields"
            }
            TransformError::DateFormatError { .. } => "Simplify targetFormat",
            TransformError::RecordError { .. } => {
                "Make sure records match the declared input and output schemas"
            }
            TransformError::ValidationFailed { .. } => "Fix every listed validation failure",
            TransformError::UnsupportedSourceType { .. } => {
                "Source fields must be of type 'string' or 'long'"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, TransformError>;
