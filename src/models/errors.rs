use thiserror::Error;

/// Service-level errors that can occur in business logic
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A failure whose message is safe to show to the user as-is
    #[error("{message}")]
    Display { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Repository error: {source}")]
    Repository { source: RepositoryError },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("External service error: {service}: {message}")]
    ExternalService { service: String, message: String },

    #[error("Template error: {source}")]
    Template {
        #[from]
        source: askama::Error,
    },
}

impl ServiceError {
    pub fn display(message: impl Into<String>) -> Self {
        ServiceError::Display {
            message: message.into(),
        }
    }

    pub fn external(service: &str, error: impl std::fmt::Display) -> Self {
        ServiceError::ExternalService {
            service: service.to_string(),
            message: error.to_string(),
        }
    }

    /// The message to show in the error page, if this error may be shown at all
    pub fn display_message(&self) -> Option<&str> {
        match self {
            ServiceError::Display { message } => Some(message),
            _ => None,
        }
    }
}

/// Repository-level errors for data access operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    AlreadyExists { message: String },

    #[error(transparent)]
    InvalidKey {
        #[from]
        source: KeyError,
    },

    #[error("Invalid item: {message}")]
    InvalidItem { message: String },

    #[error("AWS SDK error: {message}")]
    AwsSdk { message: String },

    #[error("DynamoDB table not found: {table_name}. Ensure the table exists and IAM permissions are correct.")]
    TableNotFound { table_name: String },

    #[error("Transaction failed: {message}")]
    TransactionFailed { message: String },
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { message } | RepositoryError::AlreadyExists { message } => {
                ServiceError::Display { message }
            }
            RepositoryError::InvalidKey { source } => ServiceError::Display {
                message: source.to_string(),
            },
            source => ServiceError::Repository { source },
        }
    }
}

/// Failures decoding an opaque external ID
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("Invalid Passport ID")]
    InvalidPassportId,

    #[error("Invalid notification endpoint")]
    InvalidEndpointId,
}

/// Validation errors for submitted forms
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid passport request")]
    IncompletePassport,

    #[error("Invalid form submission: {reason}")]
    InvalidForm { reason: String },

    #[error("Invalid user attribute value {value}")]
    InvalidAttributeValue { value: String },

    #[error("Invalid attribute {attribute}")]
    InvalidAttribute { attribute: String },
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Display {
            message: err.to_string(),
        }
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;
