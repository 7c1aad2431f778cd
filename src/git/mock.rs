use crate::error::{ReleaseError, Result};
use crate::git::{sort_tags_desc, Identity, PushRequest, Repository};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// A commit recorded by [MockRepository]
#[derive(Debug, Clone, PartialEq)]
pub struct MockCommit {
    pub id: String,
    pub message: String,
    pub author: String,
}

/// An annotated tag recorded by [MockRepository]
#[derive(Debug, Clone, PartialEq)]
pub struct MockTag {
    /// Index into the commit list
    pub target: usize,
    pub message: String,
}

/// Mock repository for testing without actual git operations
///
/// Starts with a single root commit on `main`. Files added with
/// [add_committed_file](MockRepository::add_committed_file) are part of HEAD;
/// later writes make the work tree differ until the next commit.
pub struct MockRepository {
    branch: String,
    commits: Vec<MockCommit>,
    tags: BTreeMap<String, MockTag>,
    head_files: HashMap<PathBuf, String>,
    work_files: HashMap<PathBuf, String>,
    pushes: Vec<PushRequest>,
    remote_tags: BTreeMap<String, usize>,
    reject_push: Option<String>,
}

impl MockRepository {
    /// Create a mock repository with one root commit on `main`
    pub fn new() -> Self {
        MockRepository {
            branch: "main".to_string(),
            commits: vec![MockCommit {
                id: commit_id(0),
                message: "Initial commit".to_string(),
                author: "Test User".to_string(),
            }],
            tags: BTreeMap::new(),
            head_files: HashMap::new(),
            work_files: HashMap::new(),
            pushes: Vec::new(),
            remote_tags: BTreeMap::new(),
            reject_push: None,
        }
    }

    /// Set the branch HEAD points to
    pub fn set_branch(&mut self, branch: impl Into<String>) {
        self.branch = branch.into();
    }

    /// Add a file that is already committed at HEAD
    pub fn add_committed_file(&mut self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        let path = path.into();
        let contents = contents.into();
        self.head_files.insert(path.clone(), contents.clone());
        self.work_files.insert(path, contents);
    }

    /// Add an untracked file to the work tree
    pub fn add_untracked_file(&mut self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.work_files.insert(path.into(), contents.into());
    }

    /// Record a commit on top of HEAD without touching files
    pub fn add_commit(&mut self, message: impl Into<String>) -> String {
        let id = commit_id(self.commits.len());
        self.commits.push(MockCommit {
            id: id.clone(),
            message: message.into(),
            author: "Test User".to_string(),
        });
        id
    }

    /// Tag the current HEAD commit
    pub fn add_tag(&mut self, name: impl Into<String>) {
        let target = self.head_index();
        self.tags.insert(
            name.into(),
            MockTag {
                target,
                message: String::new(),
            },
        );
    }

    /// Make every following push fail as if the remote had diverged
    pub fn reject_pushes(&mut self, reason: impl Into<String>) {
        self.reject_push = Some(reason.into());
    }

    pub fn commits(&self) -> &[MockCommit] {
        &self.commits
    }

    pub fn head(&self) -> &MockCommit {
        &self.commits[self.head_index()]
    }

    pub fn tag(&self, name: &str) -> Option<&MockTag> {
        self.tags.get(name)
    }

    /// Commit id a tag points to
    pub fn tag_target_id(&self, name: &str) -> Option<&str> {
        self.tags
            .get(name)
            .map(|tag| self.commits[tag.target].id.as_str())
    }

    pub fn pushes(&self) -> &[PushRequest] {
        &self.pushes
    }

    /// Tags the remote received, with the commit index each points to
    pub fn remote_tags(&self) -> &BTreeMap<String, usize> {
        &self.remote_tags
    }

    fn head_index(&self) -> usize {
        self.commits.len() - 1
    }
}

fn commit_id(index: usize) -> String {
    format!("{:040x}", index + 1)
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for MockRepository {
    fn current_branch(&self) -> Result<String> {
        Ok(self.branch.clone())
    }

    fn tag_history(&self) -> Result<Vec<String>> {
        let mut history = Vec::new();

        for index in (0..self.commits.len()).rev() {
            let mut on_commit: Vec<String> = self
                .tags
                .iter()
                .filter(|(_, tag)| tag.target == index)
                .map(|(name, _)| name.clone())
                .collect();
            sort_tags_desc(&mut on_commit);
            history.extend(on_commit);
        }

        Ok(history)
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.work_files.contains_key(path)
    }

    fn read_file(&self, path: &Path) -> Result<String> {
        self.work_files.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
            .into()
        })
    }

    fn write_file(&mut self, path: &Path, contents: &str) -> Result<()> {
        self.work_files
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn has_tracked_changes(&self) -> Result<bool> {
        Ok(self
            .head_files
            .iter()
            .any(|(path, committed)| self.work_files.get(path) != Some(committed)))
    }

    fn commit_tracked(&mut self, message: &str, identity: &Identity) -> Result<String> {
        for (path, committed) in self.head_files.iter_mut() {
            match self.work_files.get(path) {
                Some(current) => *committed = current.clone(),
                None => committed.clear(),
            }
        }

        let id = commit_id(self.commits.len());
        self.commits.push(MockCommit {
            id: id.clone(),
            message: message.to_string(),
            author: identity.name.clone(),
        });
        Ok(id)
    }

    fn tag_exists(&self, name: &str) -> Result<bool> {
        Ok(self.tags.contains_key(name))
    }

    fn create_annotated_tag(
        &mut self,
        name: &str,
        message: &str,
        _identity: &Identity,
        force: bool,
    ) -> Result<()> {
        if !force && self.tags.contains_key(name) {
            return Err(ReleaseError::tag(format!("Tag '{}' already exists", name)));
        }

        let target = self.head_index();
        self.tags.insert(
            name.to_string(),
            MockTag {
                target,
                message: message.to_string(),
            },
        );
        Ok(())
    }

    fn push(&mut self, request: &PushRequest) -> Result<()> {
        if let Some(reason) = &self.reject_push {
            return Err(ReleaseError::push_rejected(&request.remote, reason.as_str()));
        }

        for (name, tag) in &self.tags {
            let forced = request.forced_tag.as_deref() == Some(name.as_str());
            match self.remote_tags.get(name) {
                Some(&remote_target) if remote_target != tag.target && !forced => {
                    return Err(ReleaseError::push_rejected(
                        &request.remote,
                        format!("refs/tags/{}: already exists", name),
                    ));
                }
                _ => {}
            }
        }

        for (name, tag) in &self.tags {
            self.remote_tags.insert(name.clone(), tag.target);
        }
        self.pushes.push(request.clone());
        Ok(())
    }
}
