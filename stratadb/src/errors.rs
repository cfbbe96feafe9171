use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for stratadb operations.
///
/// Each kind is a failure domain with a stable numeric code, so callers can
/// branch on the category without parsing messages.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    /// Malformed scope/collection/index name, rejected timestamp, or an
    /// attempt to re-create the deleted default collection.
    InvalidParameter,
    /// Operation invoked on an invalidated handle: the owning database was
    /// closed or deleted, or the collection itself was deleted.
    NotOpen,
    /// A conflict-handler save observed a fresh conflicting revision on
    /// every retry and gave up.
    ConflictExhausted,
    /// Failure reported by the underlying storage engine, propagated
    /// opaquely.
    StorageFailure,
    /// Error in the change-notification machinery.
    EventError,
    /// Internal error (usually indicates a bug).
    InternalError,
}

impl ErrorKind {
    /// Stable numeric code of this failure domain.
    pub fn code(&self) -> u32 {
        match self {
            ErrorKind::NotOpen => 6,
            ErrorKind::ConflictExhausted => 8,
            ErrorKind::InvalidParameter => 9,
            ErrorKind::InternalError => 10,
            ErrorKind::StorageFailure => 12,
            ErrorKind::EventError => 21,
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidParameter => write!(f, "Invalid parameter"),
            ErrorKind::NotOpen => write!(f, "Not open"),
            ErrorKind::ConflictExhausted => write!(f, "Conflict retries exhausted"),
            ErrorKind::StorageFailure => write!(f, "Storage failure"),
            ErrorKind::EventError => write!(f, "Event error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom stratadb error type.
///
/// `StrataError` encapsulates the error message, kind, and optional cause.
/// It supports error chaining and captures a backtrace for debugging.
///
/// The `StrataResult<T>` alias is used throughout the codebase for
/// operations that can fail.
#[derive(Clone)]
pub struct StrataError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<StrataError>>,
    backtrace: Atomic<Backtrace>,
}

impl StrataError {
    /// Creates a new `StrataError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        StrataError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `StrataError` with a cause error, preserving the chain
    /// for debugging.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: StrataError) -> Self {
        StrataError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    /// Numeric code of the failure domain, stable across releases.
    pub fn code(&self) -> u32 {
        self.error_kind.code()
    }

    pub fn cause(&self) -> Option<&Box<StrataError>> {
        self.cause.as_ref()
    }
}

impl Display for StrataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for StrataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for StrataError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for stratadb operations.
pub type StrataResult<T> = Result<T, StrataError>;

// From trait implementations for automatic error conversion
impl From<std::io::Error> for StrataError {
    fn from(err: std::io::Error) -> Self {
        StrataError::new(&format!("IO error: {}", err), ErrorKind::StorageFailure)
    }
}

impl From<String> for StrataError {
    fn from(msg: String) -> Self {
        StrataError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for StrataError {
    fn from(msg: &str) -> Self {
        StrataError::new(msg, ErrorKind::InternalError)
    }
}
