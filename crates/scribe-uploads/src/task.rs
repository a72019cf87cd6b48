//! The upload task state machine.

use smol_str::SmolStr;

use crate::candidate::SourceChannel;

/// Identifier of one upload task, unique within a coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "upload-{}", self.0)
    }
}

/// Lifecycle states of an upload task.
///
/// `Validating -> Uploading -> Inserting -> Done` on the happy path; any
/// state can step to `Failed`, which is terminal. There are no other
/// transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadState {
    Validating,
    Uploading,
    Inserting,
    Done,
    Failed,
}

impl UploadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Done | UploadState::Failed)
    }
}

/// Observable snapshot of one upload task.
///
/// Each task owns its own progress value; nothing here is shared between
/// tasks.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadTask {
    pub id: TaskId,
    /// Original filename of the candidate.
    pub file_name: SmolStr,
    pub source_channel: SourceChannel,
    pub state: UploadState,
    /// Integer percent, 0..=100.
    pub progress_percent: u8,
    /// Set when `state == Failed`.
    pub error: Option<String>,
}

impl UploadTask {
    pub(crate) fn new(id: TaskId, file_name: SmolStr, source_channel: SourceChannel) -> Self {
        Self {
            id,
            file_name,
            source_channel,
            state: UploadState::Validating,
            progress_percent: 0,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!UploadState::Validating.is_terminal());
        assert!(!UploadState::Uploading.is_terminal());
        assert!(!UploadState::Inserting.is_terminal());
        assert!(UploadState::Done.is_terminal());
        assert!(UploadState::Failed.is_terminal());
    }

    #[test]
    fn test_task_id_display() {
        assert_eq!(TaskId(7).to_string(), "upload-7");
    }
}
