//! Server error types.

use std::fmt;

use crate::{platform::PlatformError, roster::RosterError, store::StoreError};

/// Errors that can occur in the server.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration error (unreadable roster, bad arguments).
    ///
    /// Fatal at startup. Fix configuration and restart.
    Config(String),

    /// Staff store error.
    ///
    /// Fatal at startup (records cannot be loaded). At runtime a failed write
    /// is logged and the record is written again on its next change.
    Store(StoreError),

    /// Platform error.
    ///
    /// Fatal at startup (membership unavailable). At runtime platform
    /// failures are logged or reported back to the core as failed moves.
    Platform(PlatformError),

    /// Internal error (runtime stopped, logic bug).
    ///
    /// Should never happen in a correct implementation.
    Internal(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Store(err) => write!(f, "store error: {err}"),
            Self::Platform(err) => write!(f, "platform error: {err}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Platform(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<PlatformError> for ServerError {
    fn from(err: PlatformError) -> Self {
        Self::Platform(err)
    }
}

impl From<RosterError> for ServerError {
    fn from(err: RosterError) -> Self {
        Self::Config(err.to_string())
    }
}
