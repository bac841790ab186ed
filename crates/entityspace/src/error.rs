use crate::loader::LoadError;
use derive_more::Display;
use entityspace_core::{
    error::{ErrorClass, ErrorOrigin as CoreErrorOrigin, InternalError},
    expansion::ExpansionError,
    model::SchemaError,
    query::QueryError,
    workspace::WorkspaceError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        let kind = match (err.class, err.origin) {
            (ErrorClass::Invalid, _) => ErrorKind::Query(QueryErrorKind::Invalid),
            (ErrorClass::Unsupported, _) => ErrorKind::Query(QueryErrorKind::Unsupported),
            (ErrorClass::NotFound, CoreErrorOrigin::Schema) => {
                ErrorKind::Store(StoreErrorKind::NotFound)
            }
            (ErrorClass::NotFound, _) => ErrorKind::Query(QueryErrorKind::NotFound),
            (ErrorClass::InvariantViolation, _) => ErrorKind::Store(StoreErrorKind::Corrupt),
            (ErrorClass::Internal, _) => ErrorKind::Internal,
        };

        Self::new(kind, err.origin.into(), err.message)
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        InternalError::from(err).into()
    }
}

impl From<ExpansionError> for Error {
    fn from(err: ExpansionError) -> Self {
        InternalError::from(err).into()
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        InternalError::from(err).into()
    }
}

impl From<WorkspaceError> for Error {
    fn from(err: WorkspaceError) -> Self {
        InternalError::from(err).into()
    }
}

impl From<LoadError> for Error {
    fn from(err: LoadError) -> Self {
        Self::new(ErrorKind::Load, ErrorOrigin::Loader, err.to_string())
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    Query(QueryErrorKind),
    Store(StoreErrorKind),

    /// The loader could not produce data for a cache miss.
    Load,

    /// The caller cannot remediate this.
    Internal,
}

///
/// QueryErrorKind
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum QueryErrorKind {
    /// Request shape is invalid (bad expansion, unknown index field).
    Invalid,

    Unsupported,

    /// Named index or row does not exist.
    NotFound,
}

///
/// StoreErrorKind
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum StoreErrorKind {
    /// Entity type is not registered.
    NotFound,

    /// Stored rows and indexes disagree.
    Corrupt,
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Schema,
    Expansion,
    Query,
    Cache,
    Workspace,
    Loader,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Schema => Self::Schema,
            CoreErrorOrigin::Expansion => Self::Expansion,
            CoreErrorOrigin::Query => Self::Query,
            CoreErrorOrigin::Cache => Self::Cache,
            CoreErrorOrigin::Workspace => Self::Workspace,
        }
    }
}
