//! Error handling types for the allocation candidate engine.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boundary error taxonomy for the allocation candidate engine.
///
/// Variants map directly onto the error codes in spec §6/§7: input errors
/// fail fast before any storage write, concurrency errors signal a retry of
/// the whole logical operation, and `Internal` denotes an invariant
/// violation rather than a recoverable state.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input (negative amount, empty required trait set, etc.)
    /// detected before any storage read.
    #[error("bad request: {message}")]
    BadRequest {
        /// Description of what was malformed.
        message: String,
    },

    /// A required or forbidden trait name does not resolve to a known
    /// standard or custom trait.
    #[error("trait not found: {name}")]
    TraitNotFound {
        /// The trait name that failed to resolve.
        name: String,
    },

    /// A resource class name does not resolve to a known standard or
    /// custom resource class.
    #[error("resource class not found: {name}")]
    ResourceClassNotFound {
        /// The resource class name that failed to resolve.
        name: String,
    },

    /// An optimistic-concurrency write was rejected because the observed
    /// `generation` no longer matches the stored value. Retryable by the
    /// caller; the engine never retries silently.
    #[error("concurrent update detected on provider {provider_id}")]
    ConcurrentUpdateDetected {
        /// The provider whose generation no longer matched.
        provider_id: i64,
    },

    /// The caller's deadline elapsed before the operation completed.
    /// Partial results are never returned alongside this error.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// An invariant violation: duplicate inventory rows, negative
    /// quantities in stored data, or any other state that should be
    /// unreachable given a correct storage backend. These are bugs, not
    /// recoverable states.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the invariant that was violated.
        message: String,
    },

    /// Backend I/O failure surfaced unchanged.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
        /// Underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Build a [`Error::BadRequest`].
    #[must_use]
    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Build a [`Error::TraitNotFound`].
    #[must_use]
    pub fn trait_not_found<S: Into<String>>(name: S) -> Self {
        Self::TraitNotFound { name: name.into() }
    }

    /// Build a [`Error::ResourceClassNotFound`].
    #[must_use]
    pub fn resource_class_not_found<S: Into<String>>(name: S) -> Self {
        Self::ResourceClassNotFound { name: name.into() }
    }

    /// Build an [`Error::Internal`].
    #[must_use]
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Build a [`Error::Storage`] wrapping a source error.
    pub fn storage<S: Into<String>>(
        message: S,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
