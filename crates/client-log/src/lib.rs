//! Riot Client log watcher.
//!
//! Tails the most recently modified client log, follows it across rotation,
//! and turns patch state lines into at-most-once lifecycle actions.

mod locator;
mod matcher;
mod state;
mod tailer;
mod watcher;

pub use locator::{GlobDirectory, LogDirectory, LogPattern, find_latest_log};
pub use matcher::match_transition;
pub use state::{PatchAction, PatchStateMachine};
pub use tailer::{FileIdentity, FileKey, LogPosition, MAX_READ_BYTES, TailError, TailReader};
pub use watcher::{
    DEFAULT_POLL_INTERVAL, LineSource, LogWatcher, MAX_CONSECUTIVE_FAILURES, Tick, WatchError,
    WatchOutcome,
};

/// Default glob for client log files.
pub const DEFAULT_LOG_PATTERN: &str = "*.log";
