use std::collections::BTreeMap;

use thiserror::Error;

use crate::domain::NormalizationError;

/// Field name → messages, as reported by the server for a rejected write.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Failure of a cached read or a mutation.
///
/// `Clone` so that every caller joined on one in-flight fetch receives the
/// same error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CacheError {
    #[error("network error: {message}")]
    Network { message: String },
    #[error("validation failed ({status}): {message}")]
    Validation {
        status: u16,
        message: String,
        fields: FieldErrors,
    },
    #[error(transparent)]
    Normalization(#[from] NormalizationError),
    #[error("not found: {message}")]
    NotFound { message: String },
    #[error("not authenticated: {message}")]
    Unauthenticated { message: String },
}

impl CacheError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn validation(status: u16, message: impl Into<String>, fields: FieldErrors) -> Self {
        Self::Validation {
            status,
            message: message.into(),
            fields,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::Validation { .. } => "validation",
            Self::Normalization(_) => "normalization",
            Self::NotFound { .. } => "not_found",
            Self::Unauthenticated { .. } => "unauthenticated",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_errors_convert_transparently() {
        let err: CacheError = NormalizationError::missing("categories", "id").into();
        assert_eq!(err.kind(), "normalization");
        assert_eq!(
            err.to_string(),
            NormalizationError::missing("categories", "id").to_string()
        );
    }

    #[test]
    fn validation_display_carries_status() {
        let mut fields = FieldErrors::new();
        fields.insert("name".into(), vec!["required".into()]);
        let err = CacheError::validation(422, "invalid payload", fields);
        assert_eq!(err.to_string(), "validation failed (422): invalid payload");
        assert!(!err.is_not_found());
        assert!(CacheError::not_found("categories/7").is_not_found());
    }
}
