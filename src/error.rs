use thiserror::Error;

/// Unified error type for release-tagger operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Malformed tag '{tag}': {reason}")]
    MalformedTag { tag: String, reason: String },

    #[error("Build descriptor not found: {path}")]
    DescriptorNotFound { path: String },

    #[error("Property '{key}' not found in build descriptor {path}")]
    PropertyNotFound { path: String, key: String },

    #[error("Push to '{remote}' rejected: {reason}")]
    PushRejected { remote: String, reason: String },

    #[error("HEAD is on branch '{actual}', expected '{expected}'")]
    BranchMismatch { expected: String, actual: String },

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tag error: {0}")]
    Tag(String),

    #[error("Remote operation failed: {0}")]
    Remote(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in release-tagger
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create a malformed tag error for `tag`
    pub fn malformed_tag(tag: impl Into<String>, reason: impl Into<String>) -> Self {
        ReleaseError::MalformedTag {
            tag: tag.into(),
            reason: reason.into(),
        }
    }

    /// Create a descriptor-not-found error
    pub fn descriptor_not_found(path: impl Into<String>) -> Self {
        ReleaseError::DescriptorNotFound { path: path.into() }
    }

    /// Create a property-not-found error
    pub fn property_not_found(path: impl Into<String>, key: impl Into<String>) -> Self {
        ReleaseError::PropertyNotFound {
            path: path.into(),
            key: key.into(),
        }
    }

    /// Create a push rejection error
    pub fn push_rejected(remote: impl Into<String>, reason: impl Into<String>) -> Self {
        ReleaseError::PushRejected {
            remote: remote.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Create a tag error with context
    pub fn tag(msg: impl Into<String>) -> Self {
        ReleaseError::Tag(msg.into())
    }

    /// Create a remote error with context
    pub fn remote(msg: impl Into<String>) -> Self {
        ReleaseError::Remote(msg.into())
    }

    /// True when the error happened before any version-control mutation
    pub fn is_pre_mutation(&self) -> bool {
        matches!(
            self,
            ReleaseError::MalformedTag { .. }
                | ReleaseError::DescriptorNotFound { .. }
                | ReleaseError::PropertyNotFound { .. }
                | ReleaseError::BranchMismatch { .. }
                | ReleaseError::Config(_)
        )
    }
}
