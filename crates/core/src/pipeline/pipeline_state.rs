use std::fmt;

/// Lifecycle of a single redaction run.
///
/// `Idle → Running → (Completed | Failed)`. Both end states are terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PipelineState {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Running => "running",
            PipelineState::Completed => "completed",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}
