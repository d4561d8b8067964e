use crate::CoreError;

/// Host-observable execution state of the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Ready to execute the next instruction.
    #[default]
    Running,
    /// Stopped by a host-fatal error; only a reset resumes execution.
    Halted(CoreError),
}

impl RunState {
    /// Returns the error that halted the core, if any.
    #[must_use]
    pub const fn halt_reason(self) -> Option<CoreError> {
        match self {
            Self::Halted(error) => Some(error),
            Self::Running => None,
        }
    }
}
