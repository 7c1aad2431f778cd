//! Version-control abstraction layer
//!
//! The release protocol only needs a handful of operations on the repository
//! it releases from: read the tag history, read and write files in the work
//! tree, commit, tag and push. The [Repository] trait captures exactly those
//! so the protocol can run against a real checkout or an in-memory double.
//!
//! - [repository::Git2Repository]: a real implementation using the `git2` crate
//! - [mock::MockRepository]: an in-memory implementation for testing
//!
//! ```rust
//! # use release_tagger::git::Repository;
//! # fn example<R: Repository>(repo: &R) -> release_tagger::Result<()> {
//! let history = repo.tag_history()?;
//! if let Some(latest) = history.first() {
//!     println!("latest release: {}", latest);
//! }
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;

use crate::domain::Tag;
use crate::error::Result;

/// Name and email that automated commits and tags are attributed to
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Default for Identity {
    fn default() -> Self {
        Identity {
            name: "github-actions[bot]".to_string(),
            email: "github-actions[bot]@users.noreply.github.com".to_string(),
        }
    }
}

/// What to send to the remote at the end of a release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushRequest {
    /// Remote name (e.g. "origin")
    pub remote: String,
    /// Branch pushed alongside the tags
    pub branch: String,
    /// Tag pushed with force, so a re-created tag replaces the remote one
    pub forced_tag: Option<String>,
}

/// Repository operations used by the release protocol
///
/// File paths are relative to the root of the work tree. Mutating operations
/// take `&mut self`; a repository handle is owned by exactly one run.
pub trait Repository {
    /// Name of the branch HEAD points to
    fn current_branch(&self) -> Result<String>;

    /// Tags reachable from HEAD, most recent first
    ///
    /// Tags on the same commit are ordered highest version first.
    fn tag_history(&self) -> Result<Vec<String>>;

    /// Whether `path` exists in the work tree
    fn file_exists(&self, path: &Path) -> bool;

    /// Read a work-tree file as UTF-8
    fn read_file(&self, path: &Path) -> Result<String>;

    /// Overwrite a work-tree file
    fn write_file(&mut self, path: &Path, contents: &str) -> Result<()>;

    /// Whether any tracked file differs from HEAD (untracked files are ignored)
    fn has_tracked_changes(&self) -> Result<bool>;

    /// Stage every tracked change and commit it; returns the new commit id
    fn commit_tracked(&mut self, message: &str, identity: &Identity) -> Result<String>;

    /// Whether a tag named `name` exists locally
    fn tag_exists(&self, name: &str) -> Result<bool>;

    /// Create an annotated tag at HEAD
    ///
    /// With `force`, an existing tag of the same name is replaced; otherwise
    /// an existing tag is an error.
    fn create_annotated_tag(
        &mut self,
        name: &str,
        message: &str,
        identity: &Identity,
        force: bool,
    ) -> Result<()>;

    /// Push the branch and all local tags
    ///
    /// Fails with `PushRejected` when the remote refuses any reference.
    fn push(&mut self, request: &PushRequest) -> Result<()>;
}

/// Orders tag names that share a commit: release tags by descending version,
/// then anything else by descending name.
pub(crate) fn sort_tags_desc(tags: &mut [String]) {
    tags.sort_by(|a, b| match (Tag::parse(a), Tag::parse(b)) {
        (Ok(a), Ok(b)) => b.cmp(&a),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => b.cmp(a),
    });
}
