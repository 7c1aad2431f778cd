use crate::domain::tag::Tag;
use std::fmt;
use std::path::PathBuf;

/// Run-scoped state of a single release
///
/// Created once the next tag is known and dropped when the run ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseContext {
    pub latest_tag: Option<Tag>,
    pub new_tag: Tag,
    pub root_folder: PathBuf,
    pub branch_name: String,
}

impl ReleaseContext {
    pub fn new(
        latest_tag: Option<Tag>,
        new_tag: Tag,
        root_folder: impl Into<PathBuf>,
        branch_name: impl Into<String>,
    ) -> Self {
        ReleaseContext {
            latest_tag,
            new_tag,
            root_folder: root_folder.into(),
            branch_name: branch_name.into(),
        }
    }

    /// Commit message recorded when the descriptor changes
    pub fn commit_message(&self) -> String {
        format!("Version {}", self.new_tag)
    }

    /// Annotated tag message, `{tag}` is replaced by the new tag
    pub fn tag_message(&self, template: &str) -> String {
        template.replace("{tag}", &self.new_tag.to_string())
    }
}

/// Outcome of the commit step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitResult {
    /// A commit was created; holds its id
    Committed { id: String },
    /// Nothing tracked differed from HEAD
    Unchanged,
}

impl CommitResult {
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitResult::Committed { .. })
    }
}

/// Steps of a release run, in the order they are reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseState {
    Start,
    TagComputed,
    DescriptorUpdated,
    Committed,
    Unchanged,
    Tagged,
    Pushed,
    Done,
    /// A step failed; `at` is the last state successfully reached
    Failed { at: FailedAt },
}

/// The state a failed run had reached (a `ReleaseState` minus `Failed`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedAt {
    Start,
    TagComputed,
    DescriptorUpdated,
    Committed,
    Unchanged,
    Tagged,
    Pushed,
}

impl ReleaseState {
    /// Whether `next` is a legal successor of `self`
    pub fn can_transition_to(self, next: ReleaseState) -> bool {
        use ReleaseState::*;

        match (self, next) {
            (Failed { .. }, _) | (Done, _) => false,
            (_, Failed { .. }) => true,
            (Start, TagComputed)
            | (TagComputed, DescriptorUpdated)
            | (TagComputed, Done)
            | (DescriptorUpdated, Committed)
            | (DescriptorUpdated, Unchanged)
            | (Committed, Tagged)
            | (Unchanged, Tagged)
            | (Tagged, Pushed)
            | (Tagged, Done)
            | (Pushed, Done) => true,
            _ => false,
        }
    }

    /// The failed state reached from `self`
    pub fn fail(self) -> ReleaseState {
        let at = match self {
            ReleaseState::Start => FailedAt::Start,
            ReleaseState::TagComputed => FailedAt::TagComputed,
            ReleaseState::DescriptorUpdated => FailedAt::DescriptorUpdated,
            ReleaseState::Committed => FailedAt::Committed,
            ReleaseState::Unchanged => FailedAt::Unchanged,
            ReleaseState::Tagged => FailedAt::Tagged,
            ReleaseState::Pushed | ReleaseState::Done => FailedAt::Pushed,
            ReleaseState::Failed { at } => at,
        };
        ReleaseState::Failed { at }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ReleaseState::Done | ReleaseState::Failed { .. })
    }
}

impl fmt::Display for ReleaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseState::Start => write!(f, "START"),
            ReleaseState::TagComputed => write!(f, "TAG_COMPUTED"),
            ReleaseState::DescriptorUpdated => write!(f, "DESCRIPTOR_UPDATED"),
            ReleaseState::Committed => write!(f, "COMMITTED"),
            ReleaseState::Unchanged => write!(f, "UNCHANGED"),
            ReleaseState::Tagged => write!(f, "TAGGED"),
            ReleaseState::Pushed => write!(f, "PUSHED"),
            ReleaseState::Done => write!(f, "DONE"),
            ReleaseState::Failed { at } => write!(f, "FAILED (after {:?})", at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ReleaseContext {
        ReleaseContext::new(Some(Tag::new(1, 2, 3)), Tag::new(1, 2, 4), ".", "main")
    }

    #[test]
    fn test_commit_message() {
        assert_eq!(context().commit_message(), "Version v1.2.4");
    }

    #[test]
    fn test_tag_message_template() {
        assert_eq!(context().tag_message("Release {tag}"), "Release v1.2.4");
        assert_eq!(context().tag_message("fixed text"), "fixed text");
    }

    #[test]
    fn test_happy_path_transitions() {
        use ReleaseState::*;
        let path = [Start, TagComputed, DescriptorUpdated, Committed, Tagged, Pushed, Done];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(DescriptorUpdated.can_transition_to(Unchanged));
        assert!(Unchanged.can_transition_to(Tagged));
    }

    #[test]
    fn test_illegal_transitions() {
        use ReleaseState::*;
        assert!(!Start.can_transition_to(Tagged));
        assert!(!Committed.can_transition_to(Unchanged));
        assert!(!Done.can_transition_to(Start));
        assert!(!Start.fail().can_transition_to(TagComputed));
    }

    #[test]
    fn test_fail_records_last_state() {
        assert_eq!(
            ReleaseState::Tagged.fail(),
            ReleaseState::Failed { at: FailedAt::Tagged }
        );
        assert!(ReleaseState::Tagged.fail().is_terminal());
        assert!(ReleaseState::Done.is_terminal());
        assert!(!ReleaseState::Pushed.is_terminal());
    }

    #[test]
    fn test_commit_result() {
        assert!(CommitResult::Committed { id: "abc".into() }.is_committed());
        assert!(!CommitResult::Unchanged.is_committed());
    }
}
