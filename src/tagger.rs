//! The release protocol.
//!
//! A run walks `START -> TAG_COMPUTED -> DESCRIPTOR_UPDATED ->
//! {COMMITTED | UNCHANGED} -> TAGGED -> PUSHED -> DONE` strictly in order.
//! Each step depends on the side effects of the previous one. A failing step
//! moves the run to `FAILED` and nothing already done is rolled back.

use std::path::{Path, PathBuf};

use crate::boundary::BoundaryWarning;
use crate::config::Config;
use crate::descriptor;
use crate::domain::{compute_next_tag, CommitResult, ReleaseContext, ReleaseState, Tag};
use crate::error::{ReleaseError, Result};
use crate::git::{Identity, PushRequest, Repository};

/// Settings for a single run, usually derived from [Config]
#[derive(Debug, Clone, PartialEq)]
pub struct TaggerOptions {
    pub root_folder: PathBuf,
    /// Descriptor path relative to the work tree root
    pub descriptor: PathBuf,
    pub version_key: String,
    pub remote: String,
    pub expected_branch: Option<String>,
    pub force_tag: bool,
    pub push: bool,
    pub tag_message: String,
    pub identity: Identity,
    pub dry_run: bool,
}

impl From<&Config> for TaggerOptions {
    fn from(config: &Config) -> Self {
        TaggerOptions {
            root_folder: config.root_folder.clone(),
            descriptor: config.descriptor.clone(),
            version_key: config.version_key.clone(),
            remote: config.remote.clone(),
            expected_branch: config.branch.clone(),
            force_tag: config.force_tag,
            push: config.push,
            tag_message: config.tag_message.clone(),
            identity: config.identity.clone(),
            dry_run: false,
        }
    }
}

impl Default for TaggerOptions {
    fn default() -> Self {
        TaggerOptions::from(&Config::default())
    }
}

/// Result of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseOutcome {
    pub context: ReleaseContext,
    /// `None` when the run stopped before committing (dry run)
    pub commit: Option<CommitResult>,
    pub pushed: bool,
    pub state: ReleaseState,
}

impl ReleaseOutcome {
    pub fn committed(&self) -> bool {
        self.commit.as_ref().is_some_and(CommitResult::is_committed)
    }
}

/// Commits tracked changes as `identity` with message `Version <new_tag>`.
///
/// A clean work tree is not an error: the result is `Unchanged` and no commit
/// is made, so calling this twice in a row commits at most once.
pub fn commit_if_changed<R: Repository + ?Sized>(
    repo: &mut R,
    context: &ReleaseContext,
    identity: &Identity,
) -> Result<CommitResult> {
    if !repo.has_tracked_changes()? {
        tracing::debug!("work tree clean, nothing to commit");
        return Ok(CommitResult::Unchanged);
    }

    let id = repo.commit_tracked(&context.commit_message(), identity)?;
    Ok(CommitResult::Committed { id })
}

/// Creates the annotated release tag at HEAD.
///
/// With `force`, an existing tag of the same name is replaced.
pub fn create_release_tag<R: Repository + ?Sized>(
    repo: &mut R,
    tag: &Tag,
    message: &str,
    identity: &Identity,
    force: bool,
) -> Result<()> {
    repo.create_annotated_tag(&tag.to_string(), message, identity, force)
}

/// Pushes the branch and every tag, forcing `tag` when it was force-created.
pub fn push_release<R: Repository + ?Sized>(
    repo: &mut R,
    remote: &str,
    branch: &str,
    tag: &Tag,
    force: bool,
) -> Result<()> {
    let request = PushRequest {
        remote: remote.to_string(),
        branch: branch.to_string(),
        forced_tag: force.then(|| tag.to_string()),
    };
    repo.push(&request)
}

/// Tags HEAD and, unless pushing is disabled, pushes the branch with all tags.
///
/// `on_step` is called with `Tagged` once the local tag exists and with
/// `Pushed` once the remote accepted it. Returns whether a push happened.
///
/// # Errors
/// `PushRejected` when the remote has diverged; the local tag stays in place.
pub fn tag_and_push<R, F>(
    repo: &mut R,
    context: &ReleaseContext,
    options: &TaggerOptions,
    mut on_step: F,
) -> Result<bool>
where
    R: Repository + ?Sized,
    F: FnMut(ReleaseState),
{
    let message = context.tag_message(&options.tag_message);
    create_release_tag(
        repo,
        &context.new_tag,
        &message,
        &options.identity,
        options.force_tag,
    )?;
    on_step(ReleaseState::Tagged);

    if !options.push {
        return Ok(false);
    }

    push_release(
        repo,
        &options.remote,
        &context.branch_name,
        &context.new_tag,
        options.force_tag,
    )?;
    on_step(ReleaseState::Pushed);
    Ok(true)
}

/// Drives one release run against a repository handle
pub struct VersionTagger {
    options: TaggerOptions,
    state: ReleaseState,
    warnings: Vec<BoundaryWarning>,
}

impl VersionTagger {
    pub fn new(options: TaggerOptions) -> Self {
        VersionTagger {
            options,
            state: ReleaseState::Start,
            warnings: Vec::new(),
        }
    }

    pub fn state(&self) -> ReleaseState {
        self.state
    }

    /// Non-fatal conditions met so far
    pub fn warnings(&self) -> &[BoundaryWarning] {
        &self.warnings
    }

    pub fn options(&self) -> &TaggerOptions {
        &self.options
    }

    /// Runs the protocol to completion or to the first failure.
    ///
    /// A tagger is single-use: running it again after it reached a terminal
    /// state is a configuration error.
    pub fn run<R: Repository + ?Sized>(&mut self, repo: &mut R) -> Result<ReleaseOutcome> {
        if self.state != ReleaseState::Start {
            return Err(ReleaseError::config(format!(
                "Release run already finished in state {}",
                self.state
            )));
        }

        let result = self.run_steps(repo);
        if let Err(e) = &result {
            self.state = self.state.fail();
            tracing::error!(state = %self.state, "release failed: {}", e);
        }
        result
    }

    fn run_steps<R: Repository + ?Sized>(&mut self, repo: &mut R) -> Result<ReleaseOutcome> {
        let context = self.compute(repo)?;
        self.advance(ReleaseState::TagComputed);

        if self.options.dry_run {
            self.advance(ReleaseState::Done);
            return Ok(self.outcome(context, None, false));
        }

        self.update_descriptor(repo, &context)?;
        self.advance(ReleaseState::DescriptorUpdated);

        let commit = commit_if_changed(repo, &context, &self.options.identity)?;
        match &commit {
            CommitResult::Committed { id } => {
                tracing::info!(commit = %id, "{}", context.commit_message());
                self.advance(ReleaseState::Committed);
            }
            CommitResult::Unchanged => self.advance(ReleaseState::Unchanged),
        }

        let tag_name = context.new_tag.to_string();
        if repo.tag_exists(&tag_name)? && self.options.force_tag {
            self.warn(BoundaryWarning::RetaggingExisting {
                tag: tag_name.clone(),
            });
        }
        let options = self.options.clone();
        let pushed = tag_and_push(repo, &context, &options, |step| self.advance(step))?;

        if !pushed {
            self.warn(BoundaryWarning::PushSkipped {
                tag: tag_name,
                remote: options.remote,
            });
        }
        self.advance(ReleaseState::Done);

        Ok(self.outcome(context, Some(commit), pushed))
    }

    fn compute<R: Repository + ?Sized>(&mut self, repo: &R) -> Result<ReleaseContext> {
        let branch = repo.current_branch()?;
        if let Some(expected) = &self.options.expected_branch {
            if *expected != branch {
                return Err(ReleaseError::BranchMismatch {
                    expected: expected.clone(),
                    actual: branch,
                });
            }
        }

        let history = repo.tag_history()?;
        let latest_tag = history.first().map(|name| Tag::parse(name)).transpose()?;
        if latest_tag.is_none() {
            self.warn(BoundaryWarning::NoReleaseHistory {
                initial: Tag::initial().to_string(),
            });
        }

        let new_tag = compute_next_tag(history.as_slice())?;
        tracing::info!(
            branch = %branch,
            latest = %latest_tag.as_ref().map(Tag::to_string).unwrap_or_default(),
            "next tag is {}",
            new_tag
        );

        Ok(ReleaseContext::new(
            latest_tag,
            new_tag,
            self.options.root_folder.clone(),
            branch,
        ))
    }

    fn update_descriptor<R: Repository + ?Sized>(
        &mut self,
        repo: &mut R,
        context: &ReleaseContext,
    ) -> Result<()> {
        let path: &Path = &self.options.descriptor;
        let changed =
            descriptor::apply_version(repo, path, &self.options.version_key, &context.new_tag)?;

        if !changed {
            let warning = BoundaryWarning::DescriptorAlreadyCurrent {
                path: path.display().to_string(),
                version: context.new_tag.version_str(),
            };
            self.warn(warning);
        }
        Ok(())
    }

    fn advance(&mut self, next: ReleaseState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        tracing::info!("{} -> {}", self.state, next);
        self.state = next;
    }

    fn warn(&mut self, warning: BoundaryWarning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    fn outcome(
        &self,
        context: ReleaseContext,
        commit: Option<CommitResult>,
        pushed: bool,
    ) -> ReleaseOutcome {
        ReleaseOutcome {
            context,
            commit,
            pushed,
            state: self.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FailedAt;
    use crate::git::MockRepository;

    fn repo_with(descriptor: &str) -> MockRepository {
        let mut repo = MockRepository::new();
        repo.add_committed_file("build.properties", descriptor);
        repo
    }

    fn read_descriptor(repo: &MockRepository) -> String {
        repo.read_file(Path::new("build.properties")).unwrap()
    }

    #[test]
    fn test_end_to_end_bumps_existing_tag() {
        let mut repo = repo_with("version=1.2.3\n");
        repo.add_tag("v1.2.3");

        let mut tagger = VersionTagger::new(TaggerOptions::default());
        let outcome = tagger.run(&mut repo).unwrap();

        assert_eq!(outcome.context.new_tag.to_string(), "v1.2.4");
        assert_eq!(outcome.context.latest_tag, Some(Tag::new(1, 2, 3)));
        assert_eq!(read_descriptor(&repo), "version=1.2.4\n");
        assert!(outcome.committed());
        assert!(outcome.pushed);
        assert_eq!(outcome.state, ReleaseState::Done);

        assert_eq!(repo.head().message, "Version v1.2.4");
        assert_eq!(repo.tag_target_id("v1.2.4"), Some(repo.head().id.as_str()));
        assert_eq!(repo.tag("v1.2.4").unwrap().message, "Release v1.2.4");
    }

    #[test]
    fn test_end_to_end_first_release() {
        let mut repo = repo_with("version=0.0.0\n");

        let mut tagger = VersionTagger::new(TaggerOptions::default());
        let outcome = tagger.run(&mut repo).unwrap();

        assert_eq!(outcome.context.new_tag.to_string(), "v0.0.1");
        assert_eq!(outcome.context.latest_tag, None);
        assert_eq!(read_descriptor(&repo), "version=0.0.1\n");
        assert!(tagger
            .warnings()
            .iter()
            .any(|w| matches!(w, BoundaryWarning::NoReleaseHistory { .. })));
    }

    #[test]
    fn test_commit_if_changed_commits_once() {
        let mut repo = repo_with("version=1.0.0\n");
        repo.write_file(Path::new("build.properties"), "version=1.0.1\n")
            .unwrap();
        let context = ReleaseContext::new(None, Tag::new(1, 0, 1), ".", "main");
        let identity = Identity::default();

        let first = commit_if_changed(&mut repo, &context, &identity).unwrap();
        let second = commit_if_changed(&mut repo, &context, &identity).unwrap();

        assert!(first.is_committed());
        assert_eq!(second, CommitResult::Unchanged);
        assert_eq!(repo.commits().len(), 2);
        assert_eq!(repo.head().author, identity.name);
    }

    #[test]
    fn test_descriptor_already_current_skips_commit() {
        let mut repo = repo_with("version=1.2.4\n");
        repo.add_tag("v1.2.3");

        let mut tagger = VersionTagger::new(TaggerOptions::default());
        let outcome = tagger.run(&mut repo).unwrap();

        assert_eq!(outcome.commit, Some(CommitResult::Unchanged));
        assert_eq!(repo.commits().len(), 1);
        assert_eq!(repo.tag_target_id("v1.2.4"), Some(repo.head().id.as_str()));
    }

    #[test]
    fn test_malformed_tag_halts_before_mutation() {
        let mut repo = repo_with("version=1.0.0\n");
        repo.add_tag("release-1");

        let mut tagger = VersionTagger::new(TaggerOptions::default());
        let err = tagger.run(&mut repo).unwrap_err();

        assert!(matches!(err, ReleaseError::MalformedTag { .. }));
        assert_eq!(tagger.state(), ReleaseState::Failed { at: FailedAt::Start });
        assert_eq!(read_descriptor(&repo), "version=1.0.0\n");
        assert_eq!(repo.tag_history().unwrap(), vec!["release-1"]);
    }

    #[test]
    fn test_missing_descriptor_halts_before_commit() {
        let mut repo = MockRepository::new();

        let mut tagger = VersionTagger::new(TaggerOptions::default());
        let err = tagger.run(&mut repo).unwrap_err();

        assert!(matches!(err, ReleaseError::DescriptorNotFound { .. }));
        assert_eq!(
            tagger.state(),
            ReleaseState::Failed {
                at: FailedAt::TagComputed
            }
        );
        assert_eq!(repo.commits().len(), 1);
        assert!(repo.tag_history().unwrap().is_empty());
    }

    #[test]
    fn test_missing_property_halts() {
        let mut repo = repo_with("name=app\n");
        let mut tagger = VersionTagger::new(TaggerOptions::default());
        assert!(matches!(
            tagger.run(&mut repo),
            Err(ReleaseError::PropertyNotFound { .. })
        ));
        assert!(repo.tag_history().unwrap().is_empty());
    }

    #[test]
    fn test_push_rejected_keeps_local_tag() {
        let mut repo = repo_with("version=2.0.0\n");
        repo.add_tag("v2.0.0");
        repo.reject_pushes("refs/heads/main: non-fast-forward");

        let mut tagger = VersionTagger::new(TaggerOptions::default());
        let err = tagger.run(&mut repo).unwrap_err();

        assert!(matches!(err, ReleaseError::PushRejected { .. }));
        assert_eq!(
            tagger.state(),
            ReleaseState::Failed {
                at: FailedAt::Tagged
            }
        );
        assert!(repo.tag_exists("v2.0.1").unwrap());
        assert_eq!(repo.head().message, "Version v2.0.1");
    }

    #[test]
    fn test_branch_mismatch() {
        let mut repo = repo_with("version=1.0.0\n");
        repo.set_branch("feature/x");

        let options = TaggerOptions {
            expected_branch: Some("main".to_string()),
            ..TaggerOptions::default()
        };
        let err = VersionTagger::new(options).run(&mut repo).unwrap_err();
        assert!(matches!(err, ReleaseError::BranchMismatch { .. }));
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let mut repo = repo_with("version=1.2.3\n");
        repo.add_tag("v1.2.3");

        let options = TaggerOptions {
            dry_run: true,
            ..TaggerOptions::default()
        };
        let outcome = VersionTagger::new(options).run(&mut repo).unwrap();

        assert_eq!(outcome.context.new_tag, Tag::new(1, 2, 4));
        assert_eq!(outcome.commit, None);
        assert_eq!(read_descriptor(&repo), "version=1.2.3\n");
        assert!(!repo.tag_exists("v1.2.4").unwrap());
        assert!(repo.pushes().is_empty());
    }

    #[test]
    fn test_push_disabled_stops_after_tag() {
        let mut repo = repo_with("version=0.3.0\n");
        repo.add_tag("v0.3.0");

        let options = TaggerOptions {
            push: false,
            ..TaggerOptions::default()
        };
        let mut tagger = VersionTagger::new(options);
        let outcome = tagger.run(&mut repo).unwrap();

        assert!(!outcome.pushed);
        assert!(repo.tag_exists("v0.3.1").unwrap());
        assert!(repo.pushes().is_empty());
        assert!(tagger
            .warnings()
            .iter()
            .any(|w| matches!(w, BoundaryWarning::PushSkipped { .. })));
    }

    #[test]
    fn test_push_sends_branch_and_forced_tag() {
        let mut repo = repo_with("version=1.0.0\n");
        repo.add_tag("v1.0.0");

        VersionTagger::new(TaggerOptions::default())
            .run(&mut repo)
            .unwrap();

        let push = &repo.pushes()[0];
        assert_eq!(push.remote, "origin");
        assert_eq!(push.branch, "main");
        assert_eq!(push.forced_tag.as_deref(), Some("v1.0.1"));
        assert!(repo.remote_tags().contains_key("v1.0.0"));
        assert!(repo.remote_tags().contains_key("v1.0.1"));
    }

    #[test]
    fn test_tagger_is_single_use() {
        let mut repo = repo_with("version=1.0.0\n");
        let mut tagger = VersionTagger::new(TaggerOptions::default());
        tagger.run(&mut repo).unwrap();
        assert!(matches!(tagger.run(&mut repo), Err(ReleaseError::Config(_))));
    }

    #[test]
    fn test_tag_and_push_retags_with_force() {
        let mut repo = repo_with("version=1.0.0\n");
        repo.add_tag("v1.0.1");
        repo.add_commit("hotfix");
        let context = ReleaseContext::new(None, Tag::new(1, 0, 1), ".", "main");

        let mut steps = Vec::new();
        let pushed = tag_and_push(&mut repo, &context, &TaggerOptions::default(), |step| {
            steps.push(step)
        })
        .unwrap();

        assert!(pushed);
        assert_eq!(steps, vec![ReleaseState::Tagged, ReleaseState::Pushed]);
        assert_eq!(repo.tag_target_id("v1.0.1"), Some(repo.head().id.as_str()));
        assert_eq!(repo.tag("v1.0.1").unwrap().message, "Release v1.0.1");
        assert_eq!(repo.pushes().len(), 1);
    }

    #[test]
    fn test_tag_and_push_without_push_reports_tagged_only() {
        let mut repo = repo_with("version=1.0.0\n");
        let context = ReleaseContext::new(None, Tag::new(1, 0, 1), ".", "main");
        let options = TaggerOptions {
            push: false,
            ..TaggerOptions::default()
        };

        let mut steps = Vec::new();
        let pushed = tag_and_push(&mut repo, &context, &options, |step| steps.push(step)).unwrap();

        assert!(!pushed);
        assert_eq!(steps, vec![ReleaseState::Tagged]);
        assert!(repo.tag_exists("v1.0.1").unwrap());
        assert!(repo.pushes().is_empty());
    }

    #[test]
    fn test_tag_and_push_rejected_after_tagging() {
        let mut repo = repo_with("version=1.0.0\n");
        repo.reject_pushes("refs/heads/main: non-fast-forward");
        let context = ReleaseContext::new(None, Tag::new(1, 0, 1), ".", "main");

        let mut steps = Vec::new();
        let err = tag_and_push(&mut repo, &context, &TaggerOptions::default(), |step| {
            steps.push(step)
        })
        .unwrap_err();

        assert!(matches!(err, ReleaseError::PushRejected { .. }));
        assert_eq!(steps, vec![ReleaseState::Tagged]);
        assert!(repo.tag_exists("v1.0.1").unwrap());
    }

    #[test]
    fn test_existing_tag_without_force_fails_after_commit() {
        // v1.0.1 sits on an older commit than the latest tag v1.0.0
        let mut repo = repo_with("version=1.0.0\n");
        repo.add_tag("v1.0.1");
        repo.add_commit("revert");
        repo.add_tag("v1.0.0");

        let options = TaggerOptions {
            force_tag: false,
            ..TaggerOptions::default()
        };
        let mut tagger = VersionTagger::new(options);
        let err = tagger.run(&mut repo).unwrap_err();

        assert!(matches!(err, ReleaseError::Tag(_)), "got {}", err);
        assert_eq!(
            tagger.state(),
            ReleaseState::Failed {
                at: FailedAt::Committed
            }
        );
        assert_eq!(repo.tag_target_id("v1.0.1"), Some(repo.commits()[0].id.as_str()));
        assert!(repo.pushes().is_empty());
    }
}
