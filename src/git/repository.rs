use crate::error::{ReleaseError, Result};
use crate::git::{sort_tags_desc, Identity, PushRequest};
use git2::{
    Cred, CredentialType, ErrorClass, Oid, PushOptions, RemoteCallbacks,
    Repository as Git2Repo, Signature, Sort, StatusOptions,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Credential attempts before giving up, libgit2 retries the callback on failure
const MAX_CREDENTIAL_ATTEMPTS: usize = 4;

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;

        Ok(Git2Repository { repo })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository { repo }
    }

    /// Root of the work tree
    pub fn workdir(&self) -> Result<&Path> {
        self.repo
            .workdir()
            .ok_or_else(|| ReleaseError::config("Repository has no work tree (bare repository)"))
    }

    /// Path of `dir` relative to the work tree root (empty for the root itself)
    pub fn relative_to_workdir(&self, dir: &Path) -> Result<PathBuf> {
        let workdir = self.workdir()?.canonicalize()?;
        let dir = dir.canonicalize()?;

        dir.strip_prefix(&workdir)
            .map(Path::to_path_buf)
            .map_err(|_| {
                ReleaseError::config(format!(
                    "{} is outside the repository at {}",
                    dir.display(),
                    workdir.display()
                ))
            })
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf> {
        Ok(self.workdir()?.join(path))
    }

    fn head_oid(&self) -> Result<Oid> {
        Ok(self.repo.head()?.peel_to_commit()?.id())
    }

    /// Map every tagged commit to the names of the tags pointing at it.
    /// Handles both lightweight and annotated tags.
    fn tags_by_commit(&self) -> Result<HashMap<Oid, Vec<String>>> {
        let mut by_commit: HashMap<Oid, Vec<String>> = HashMap::new();
        let tags = self.repo.tag_names(None)?;

        for tag_name in tags.iter().flatten() {
            let reference = match self.repo.find_reference(&format!("refs/tags/{}", tag_name)) {
                Ok(reference) => reference,
                Err(_) => continue,
            };
            // Tags on trees or blobs are not part of any history
            if let Ok(commit) = reference.peel_to_commit() {
                by_commit
                    .entry(commit.id())
                    .or_default()
                    .push(tag_name.to_string());
            }
        }

        Ok(by_commit)
    }

    fn remote_callbacks<'a>(&self, rejected: &'a RefCell<Vec<String>>) -> Result<RemoteCallbacks<'a>> {
        let config = self.repo.config()?;
        let mut attempts = 0;

        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |url, username_from_url, allowed_types| {
            attempts += 1;
            if attempts > MAX_CREDENTIAL_ATTEMPTS {
                return Err(git2::Error::from_str("authentication failed"));
            }

            let username = username_from_url.unwrap_or("git");

            if allowed_types.contains(CredentialType::SSH_KEY) {
                if let Ok(cred) = Cred::ssh_key_from_agent(username) {
                    if attempts == 1 {
                        return Ok(cred);
                    }
                }

                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                    let path = Path::new(&home).join(".ssh").join(key);
                    if path.exists() {
                        if let Ok(cred) = Cred::ssh_key(username, None, &path, None) {
                            return Ok(cred);
                        }
                    }
                }
            }

            if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
                if let Ok(cred) = Cred::credential_helper(&config, url, username_from_url) {
                    return Ok(cred);
                }
            }

            Cred::default()
        });

        callbacks.push_update_reference(move |refname, status| {
            if let Some(status) = status {
                tracing::warn!("remote refused {}: {}", refname, status);
                rejected
                    .borrow_mut()
                    .push(format!("{}: {}", refname, status));
            }
            Ok(())
        });

        Ok(callbacks)
    }
}

impl super::Repository for Git2Repository {
    fn current_branch(&self) -> Result<String> {
        let head = self.repo.head()?;

        if !head.is_branch() {
            return Err(ReleaseError::config("HEAD is detached, check out a branch first"));
        }

        head.shorthand()
            .map(|name| name.to_string())
            .ok_or_else(|| ReleaseError::config("Branch name is not valid UTF-8"))
    }

    fn tag_history(&self) -> Result<Vec<String>> {
        let tags_by_commit = self.tags_by_commit()?;

        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push(self.head_oid()?)?;

        let mut history = Vec::new();
        for oid in revwalk {
            let oid = oid?;
            if let Some(names) = tags_by_commit.get(&oid) {
                let mut names = names.clone();
                sort_tags_desc(&mut names);
                history.extend(names);
            }
        }

        tracing::debug!("{} tags reachable from HEAD", history.len());
        Ok(history)
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.resolve(path).map(|p| p.is_file()).unwrap_or(false)
    }

    fn read_file(&self, path: &Path) -> Result<String> {
        Ok(fs::read_to_string(self.resolve(path)?)?)
    }

    fn write_file(&mut self, path: &Path, contents: &str) -> Result<()> {
        fs::write(self.resolve(path)?, contents)?;
        Ok(())
    }

    fn has_tracked_changes(&self) -> Result<bool> {
        let mut options = StatusOptions::new();
        options
            .include_untracked(false)
            .include_ignored(false)
            .exclude_submodules(true);

        let statuses = self.repo.statuses(Some(&mut options))?;
        Ok(statuses
            .iter()
            .any(|entry| !entry.status().is_empty() && !entry.status().is_wt_new()))
    }

    fn commit_tracked(&mut self, message: &str, identity: &Identity) -> Result<String> {
        let mut index = self.repo.index()?;
        // Like `git commit -a`: only paths already in the index are staged
        index.update_all(["*"].iter(), None)?;
        index.write()?;

        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let parent = self.repo.head()?.peel_to_commit()?;
        let signature = Signature::now(&identity.name, &identity.email)?;

        let oid = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &[&parent],
        )?;

        tracing::debug!(commit = %oid, "committed as {}", identity.name);
        Ok(oid.to_string())
    }

    fn tag_exists(&self, name: &str) -> Result<bool> {
        match self.repo.find_reference(&format!("refs/tags/{}", name)) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(false),
            Err(e) => Err(ReleaseError::tag(format!("Cannot look up tag '{}': {}", name, e))),
        }
    }

    fn create_annotated_tag(
        &mut self,
        name: &str,
        message: &str,
        identity: &Identity,
        force: bool,
    ) -> Result<()> {
        let head = self.repo.head()?.peel_to_commit()?;
        let tagger = Signature::now(&identity.name, &identity.email)?;

        self.repo
            .tag(name, head.as_object(), &tagger, message, force)
            .map_err(|e| ReleaseError::tag(format!("Cannot create tag '{}': {}", name, e)))?;

        Ok(())
    }

    fn push(&mut self, request: &PushRequest) -> Result<()> {
        let mut remote = self.repo.find_remote(&request.remote).map_err(|_| {
            ReleaseError::remote(format!("No remote named '{}' found", request.remote))
        })?;

        let mut refspecs = vec![format!(
            "refs/heads/{0}:refs/heads/{0}",
            request.branch
        )];
        let tags = self.repo.tag_names(None)?;
        for tag in tags.iter().flatten() {
            let force = if request.forced_tag.as_deref() == Some(tag) {
                "+"
            } else {
                ""
            };
            refspecs.push(format!("{0}refs/tags/{1}:refs/tags/{1}", force, tag));
        }

        let rejected = RefCell::new(Vec::new());
        let mut push_options = PushOptions::new();
        push_options.remote_callbacks(self.remote_callbacks(&rejected)?);

        tracing::debug!(remote = %request.remote, "pushing {} refs", refspecs.len());

        if let Err(e) = remote.push(refspecs.as_slice(), Some(&mut push_options)) {
            let message = e.message().to_lowercase();
            return Err(
                if e.class() == ErrorClass::Reference
                    || message.contains("non-fast-forward")
                    || message.contains("rejected")
                {
                    ReleaseError::push_rejected(&request.remote, e.message())
                } else if e.class() == ErrorClass::Net {
                    ReleaseError::remote(format!("Network error during push: {}", e))
                } else {
                    ReleaseError::remote(format!(
                        "Failed to push to '{}': {}",
                        request.remote, e
                    ))
                },
            );
        }
        drop(push_options);

        let rejected = rejected.into_inner();
        if !rejected.is_empty() {
            return Err(ReleaseError::push_rejected(
                &request.remote,
                rejected.join("; "),
            ));
        }

        Ok(())
    }
}
