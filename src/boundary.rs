use std::fmt;

/// Warnings raised at the edges of the release protocol.
/// These are non-fatal conditions that should be reported to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryWarning {
    /// No tag is reachable from HEAD; versioning starts from the initial tag
    NoReleaseHistory { initial: String },
    /// The descriptor already carries the new version, nothing to commit
    DescriptorAlreadyCurrent { path: String, version: String },
    /// The new tag already exists and is about to be moved to HEAD
    RetaggingExisting { tag: String },
    /// Pushing is disabled; the tag only exists locally
    PushSkipped { tag: String, remote: String },
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::NoReleaseHistory { initial } => {
                write!(f, "No release tag reachable from HEAD, starting from {}", initial)
            }
            BoundaryWarning::DescriptorAlreadyCurrent { path, version } => {
                write!(f, "'{}' already declares version {}", path, version)
            }
            BoundaryWarning::RetaggingExisting { tag } => {
                write!(f, "Tag '{}' already exists and will be moved to HEAD", tag)
            }
            BoundaryWarning::PushSkipped { tag, remote } => {
                write!(
                    f,
                    "Push disabled, tag '{}' was not sent to '{}'",
                    tag, remote
                )
            }
        }
    }
}
