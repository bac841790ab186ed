use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Subsystem errors (`SchemaError`, `ExpansionError`, `QueryError`,
/// `CacheError`, `WorkspaceError`) all funnel into this type.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Construct a cache-origin invariant violation.
    pub(crate) fn cache_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Cache,
            message.into(),
        )
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::NotFound)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// Caller input failed validation (bad expansion text, unknown field).
    Invalid,
    NotFound,
    Internal,
    Unsupported,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Invalid => "invalid",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Subsystem that raised the error.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Schema,
    Expansion,
    Query,
    Cache,
    Workspace,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Schema => "schema",
            Self::Expansion => "expansion",
            Self::Query => "query",
            Self::Cache => "cache",
            Self::Workspace => "workspace",
        };
        write!(f, "{label}")
    }
}
