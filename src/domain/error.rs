use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("`{field}` is required")]
    MissingIdentifier { field: &'static str },
    #[error("`{field}` must be a positive integer, got `{value}`")]
    InvalidIdentifier { field: &'static str, value: String },
    #[error("catalog payload is malformed: {message}")]
    MalformedPayload { message: String },
}

impl DomainError {
    pub fn missing(field: &'static str) -> Self {
        Self::MissingIdentifier { field }
    }

    pub fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            field,
            value: value.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }
}
