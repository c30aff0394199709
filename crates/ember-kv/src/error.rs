use std::{io, result::Result as StdResult, sync::PoisonError};
use std::fmt::{Display, Formatter, Result as FmtResult};

use thiserror::Error;


pub type Result<T> = StdResult<T, Error>;


/// A user-facing error: a stable [`ErrorCode`] plus a human-readable message.
///
/// Cheap to clone because any I/O source has already been flattened into `msg`.
#[derive(Error, Debug, Clone)]
#[error("{code:?}: {msg}")]
pub struct Error {
    pub code: ErrorCode,
    pub msg:  String,
}

impl Error {
    #[inline]
    pub fn new(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self { code, msg: msg.into() }
    }

    #[inline]
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, msg)
    }

    #[inline]
    pub fn corruption(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Corruption, msg)
    }

    #[inline]
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgument, msg)
    }

    /// Whether this error kind belongs in the process-wide background-error cell
    /// (see `crate::inner_leveldb`'s write path, which consults it on entry).
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self.code, ErrorCode::IOError | ErrorCode::Corruption)
    }
}

impl From<io::Error> for Error {
    #[inline]
    fn from(err: io::Error) -> Self {
        Self::new(ErrorCode::IOError, err.to_string())
    }
}

impl<T> From<PoisonError<T>> for Error {
    #[inline]
    fn from(_err: PoisonError<T>) -> Self {
        Self::new(ErrorCode::IOError, "a lock used internally by the database was poisoned")
    }
}

/// Kinds of errors a caller might need to match on. See the crate's error-handling docs for
/// the propagation policy (local recovery / surfaced / fatal) associated with each kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCode {
    /// The requested key does not exist (or was shadowed by a tombstone) at the read sequence.
    NotFound,
    /// On-disk data failed a checksum or structural validity check.
    Corruption,
    /// A caller-supplied argument violates a documented precondition.
    InvalidArgument,
    /// The underlying filesystem returned an error.
    IOError,
    /// The database handle has been closed.
    ClosedError,
    /// The operation requires write access but the database was opened read-only.
    ReadOnlyError,
    /// A lock request exceeded its configured timeout.
    LockTimeout,
    /// The lock manager's wait-for graph detected a cycle including the requester.
    Deadlock,
    /// `unlock` was called for a key the transaction does not hold.
    LockNotHeld,
    /// A pessimistic transaction's snapshot validation found the key modified concurrently.
    WriteConflict,
    /// The transaction has already committed or rolled back.
    TransactionClosed,
    /// The transaction's expiration deadline has passed.
    TransactionExpired,
    /// No column family with the given name is open.
    ColumnFamilyNotFound,
    /// A column family with the given name already exists.
    ColumnFamilyExists,
    /// The default column family cannot be dropped.
    CannotDropDefault,
}

#[derive(Debug, Clone, Copy)]
pub struct MutexPoisoned;

impl Display for MutexPoisoned {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "A mutex used by an ArcMutexContainer was poisoned")
    }
}

impl std::error::Error for MutexPoisoned {}

impl<T> From<PoisonError<T>> for MutexPoisoned {
    #[inline]
    fn from(_err: PoisonError<T>) -> Self {
        Self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_has_expected_code() {
        let err = Error::not_found("missing key");
        assert_eq!(err.code, ErrorCode::NotFound);
        assert!(!err.is_fatal());
    }

    #[test]
    fn io_error_is_fatal() {
        let err: Error = io::Error::new(io::ErrorKind::Other, "disk full").into();
        assert_eq!(err.code, ErrorCode::IOError);
        assert!(err.is_fatal());
    }
}
