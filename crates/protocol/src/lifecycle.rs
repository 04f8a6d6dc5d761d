use std::fmt;

/// Install progress of the tracked product, as reported by the client log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Nothing observed yet. Initial, never re-entered.
    #[default]
    Unknown,
    OutOfDate,
    Updating,
    UpToDate,
}

impl LifecycleState {
    /// Maps a log label to a recognized state.
    ///
    /// Only the three labels the watcher acts on are recognized; every other
    /// label (including `Unknown`) returns `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "OutOfDate" => Some(LifecycleState::OutOfDate),
            "Updating" => Some(LifecycleState::Updating),
            "UpToDate" => Some(LifecycleState::UpToDate),
            _ => None,
        }
    }

    /// The label used for this state in the client log.
    pub fn label(&self) -> &'static str {
        match self {
            LifecycleState::Unknown => "Unknown",
            LifecycleState::OutOfDate => "OutOfDate",
            LifecycleState::Updating => "Updating",
            LifecycleState::UpToDate => "UpToDate",
        }
    }

    /// Whether reaching this state ends the watch.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::UpToDate)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A state change parsed from a single log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub previous: String,
    pub next: String,
}

impl Transition {
    pub fn new(previous: impl Into<String>, next: impl Into<String>) -> Self {
        Self {
            previous: previous.into(),
            next: next.into(),
        }
    }

    /// The recognized target state, if any.
    pub fn next_state(&self) -> Option<LifecycleState> {
        LifecycleState::from_label(&self.next)
    }
}
