use std::error;
use std::io;
use thiserror::Error;

/// Classified errors returned by maildrop session operations.
///
/// The protocol layer is expected to translate these into negative
/// responses for the client. Each `Session` method documents the subset
/// it can produce.
#[derive(Debug, Error)]
pub enum Error {
    /// The inbox could not be resolved for an already authenticated
    /// session
    #[error("no such inbox")]
    NoSuchInbox,
    /// Another session currently holds the mailbox
    #[error("[IN-USE] Do you have another POP session running?")]
    InUse,
    /// Unknown user or wrong password, deliberately not distinguished
    #[error("invalid user or password")]
    InvalidCredentials,
    /// A message number was used before the maildrop was listed
    #[error("maildrop has not been listed")]
    NotListed,
    /// The message number was not assigned at listing time
    #[error("no such message: {0}")]
    SequenceNotFound(u32),
    /// The message disappeared from the backend after listing
    #[error("message no longer in maildrop")]
    MessageGone,
    /// The storage backend reported a failure
    #[error("backend: {0}")]
    Backend(#[from] BackendError),
}

/// A failure reported by a storage driver.
///
/// Driver implementations wrap whatever went wrong in a message and an
/// optional underlying error.
#[derive(Debug, Error)]
#[error("{msg}")]
pub struct BackendError {
    msg: String,
    source: Option<Box<dyn error::Error + Send + Sync + 'static>>,
}

impl BackendError {
    /// A backend error carrying a message only
    pub fn new<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            msg: msg.into(),
            source: None,
        }
    }

    /// A backend error wrapping the error that caused it
    pub fn with_source<S, E>(msg: S, source: E) -> Self
    where
        S: Into<String>,
        E: error::Error + Send + Sync + 'static,
    {
        Self {
            msg: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Shorthand for failing a driver call
    pub fn bail<T, S>(msg: S) -> Result<T, Self>
    where
        S: Into<String>,
    {
        Err(Self::new(msg))
    }
}

impl From<io::Error> for BackendError {
    fn from(error: io::Error) -> Self {
        let msg = format!("{}", error);
        Self {
            msg,
            source: Some(Box::new(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn in_use_explains_itself() {
        let msg = format!("{}", Error::InUse);
        assert!(msg.contains("IN-USE"));
    }

    #[test]
    fn backend_error_keeps_its_source() {
        let io = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let err = BackendError::with_source("cannot reach store", io);
        assert_eq!(format!("{}", err), "cannot reach store");
        assert!(err.source().is_some());

        let wrapped = Error::from(err);
        assert_eq!(format!("{}", wrapped), "backend: cannot reach store");
    }

    #[test]
    fn bail_builds_an_err() {
        let res: Result<(), BackendError> = BackendError::bail("no table");
        assert_eq!(format!("{}", res.unwrap_err()), "no table");
    }
}
