use thiserror::Error;

/// A raw payload could not be mapped onto its canonical shape.
///
/// Signals drift between the server contract and this client; callers must
/// surface it instead of rendering a partially populated entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot normalize {resource}: field `{field}` {reason}")]
pub struct NormalizationError {
    pub resource: &'static str,
    pub field: String,
    pub reason: String,
}

impl NormalizationError {
    pub fn new(resource: &'static str, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            resource,
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(resource: &'static str, field: impl Into<String>) -> Self {
        Self::new(resource, field, "is missing")
    }

    pub fn not_an_object(resource: &'static str, field: impl Into<String>) -> Self {
        Self::new(resource, field, "is not an object")
    }

    /// Re-anchor a nested error under `prefix`, e.g. `articles[0]`.
    pub fn nested(self, resource: &'static str, prefix: &str) -> Self {
        let field = if self.field.is_empty() || self.field == "<root>" {
            prefix.to_string()
        } else {
            format!("{prefix}.{}", self.field)
        };
        Self {
            resource,
            field,
            reason: self.reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_resource_and_field() {
        let err = NormalizationError::missing("categories", "id");
        assert_eq!(err.to_string(), "cannot normalize categories: field `id` is missing");
    }

    #[test]
    fn nested_prefixes_field_path() {
        let err = NormalizationError::missing("articles", "title").nested("collections", "articles[0]");
        assert_eq!(err.resource, "collections");
        assert_eq!(err.field, "articles[0].title");

        let root = NormalizationError::not_an_object("articles", "<root>")
            .nested("collections", "articles[2]");
        assert_eq!(root.field, "articles[2]");
    }
}
