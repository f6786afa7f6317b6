//! Staff store errors.

/// Errors from a [`super::StaffStore`] backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A record could not be encoded or decoded.
    ///
    /// Fatal for that record: the stored bytes are not a valid `StaffRecord`.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The backend failed to read or write.
    ///
    /// May be transient (disk full, lock contention).
    #[error("I/O error: {0}")]
    Io(String),
}
