use thiserror::Error;

use crate::cascade::CascadeReport;
use crate::store::StoreError;

/// Errors that can occur while computing, persisting or cascading billings.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BillingError {
    /// One or more validation rules failed. Raised before any store call.
    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    /// A call to the billing store failed.
    #[error("network error: {0}")]
    Network(#[from] StoreError),

    /// Billable waybills could not be resolved.
    #[error("resolver error: {0}")]
    Resolver(String),

    /// Some dependent updates of a status cascade failed. The succeeded ones
    /// are not rolled back.
    #[error(
        "status cascade for {} partially failed: {} of {} updates failed",
        .0.billing_id,
        .0.failures().count(),
        .0.len()
    )]
    PartialCascade(Box<CascadeReport>),

    /// A referenced entity does not exist in the store.
    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    /// Billing ID sequencing error.
    #[error("numbering error: {0}")]
    Numbering(String),

    /// Invoice document composition or rendering error.
    #[error("document error: {0}")]
    Document(String),

    /// Settings could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl BillingError {
    /// Shorthand for a single validation failure.
    pub fn invalid(field: impl Into<String>, code: &str, message: impl Into<String>) -> Self {
        Self::Validation(vec![ValidationError::with_code(field, message, code)])
    }

    /// Validation errors carried by this error, if any.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            Self::Validation(errors) => errors,
            _ => &[],
        }
    }

    /// True if any carried validation error has the given code.
    pub fn has_code(&self, code: &str) -> bool {
        self.validation_errors()
            .iter()
            .any(|e| e.code.as_deref() == Some(code))
    }

    pub(crate) fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A single validation error with field path and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dot-separated path to the invalid field (e.g. "customer.store_name").
    pub field: String,
    /// Human-readable error description.
    pub message: String,
    /// Stable machine-readable code (e.g. "balance-not-zero").
    pub code: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(code) = &self.code {
            write!(f, "[{}] {}: {}", code, self.field, self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

impl ValidationError {
    /// Create a validation error without a code.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: None,
        }
    }

    /// Create a validation error with a machine-readable code.
    pub fn with_code(
        field: impl Into<String>,
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: Some(code.into()),
        }
    }
}

impl From<ValidationError> for BillingError {
    fn from(error: ValidationError) -> Self {
        Self::Validation(vec![error])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_code() {
        let e = ValidationError::with_code("actual_amount_paid", "balance is 82.14", "balance-not-zero");
        assert_eq!(
            e.to_string(),
            "[balance-not-zero] actual_amount_paid: balance is 82.14"
        );
    }

    #[test]
    fn validation_error_joins_messages() {
        let err = BillingError::Validation(vec![
            ValidationError::new("si_number", "must not be empty"),
            ValidationError::new("store_name", "must not be empty"),
        ]);
        assert_eq!(
            err.to_string(),
            "validation failed: si_number: must not be empty; store_name: must not be empty"
        );
    }

    #[test]
    fn has_code_checks_only_validation() {
        let err = BillingError::invalid("details", "no-details", "no billing details");
        assert!(err.has_code("no-details"));
        assert!(!err.has_code("balance-not-zero"));
        assert!(!BillingError::Resolver("down".into()).has_code("no-details"));
    }
}
