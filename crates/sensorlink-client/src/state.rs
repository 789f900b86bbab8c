//! Session state machine.

/// Running state of a sensor session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Not delivering samples. Settings are cached until the next start.
    #[default]
    Stopped,
    /// Started; settings apply live and the data channel is read.
    Running,
}

impl SessionState {
    pub fn is_running(self) -> bool {
        self == Self::Running
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "Stopped"),
            Self::Running => write!(f, "Running"),
        }
    }
}
