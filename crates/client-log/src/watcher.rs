//! Rotation-aware log poll loop.
//!
//! Every tick re-resolves the latest log file instead of trusting the open
//! handle, which is what makes rotation by the client transparent. When a
//! newer file shows up, whatever is left in the old one is drained first and
//! the new file is read within the same tick: from offset 0 if it was never
//! read, otherwise from where reading stopped.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::locator::LogDirectory;
use crate::tailer::{TailError, TailReader};

/// Default interval between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Consecutive failed reads after which the watcher gives up.
pub const MAX_CONSECUTIVE_FAILURES: u32 = 30;

/// Errors that end the watch.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("log file {} unreadable for {ticks} consecutive polls: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        ticks: u32,
        #[source]
        source: TailError,
    },
}

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// No log file exists yet.
    NoLog,
    /// This many lines were delivered.
    Read(usize),
    /// The line sink asked to stop.
    Stopped,
    /// A transient read failure; try again next tick.
    Retry,
}

/// How [`LogWatcher::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The line sink asked to stop.
    Stopped,
    /// The cancellation token fired.
    Cancelled,
}

/// A readable, rebindable line source. Implemented by [`TailReader`].
pub trait LineSource {
    fn bound_path(&self) -> Option<&Path>;
    /// Binds to `path`. A file read before resumes after its consumed lines.
    fn rebind(&mut self, path: &Path) -> Result<(), TailError>;
    /// Drops the binding and anything remembered about that file.
    fn unbind(&mut self);
    fn read_new(&mut self) -> Result<Vec<String>, TailError>;
}

impl LineSource for TailReader {
    fn bound_path(&self) -> Option<&Path> {
        TailReader::bound_path(self)
    }

    fn rebind(&mut self, path: &Path) -> Result<(), TailError> {
        TailReader::rebind(self, path)
    }

    fn unbind(&mut self) {
        TailReader::unbind(self)
    }

    fn read_new(&mut self) -> Result<Vec<String>, TailError> {
        TailReader::read_new(self)
    }
}

/// Polls a log directory and forwards new lines in order.
pub struct LogWatcher<D, S = TailReader> {
    dir: D,
    source: S,
    poll_interval: Duration,
    failures: u32,
    waiting_logged: bool,
}

impl<D: LogDirectory, S: LineSource> LogWatcher<D, S> {
    pub fn new(dir: D, source: S) -> Self {
        Self {
            dir,
            source,
            poll_interval: DEFAULT_POLL_INTERVAL,
            failures: 0,
            waiting_logged: false,
        }
    }

    /// Sets the interval between ticks in [`run`](Self::run).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// The underlying line source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Runs one poll step.
    ///
    /// `on_line` receives each new line; returning `Break` stops delivery and
    /// makes the tick report [`Tick::Stopped`].
    pub fn tick<F>(&mut self, on_line: &mut F) -> Result<Tick, WatchError>
    where
        F: FnMut(&str) -> ControlFlow<()>,
    {
        let Some(latest) = self.dir.latest() else {
            if !self.waiting_logged {
                tracing::info!("waiting for the client to write a log file");
                self.waiting_logged = true;
            }
            return Ok(Tick::NoLog);
        };

        if self.source.bound_path() != Some(latest.as_path()) {
            if let Some(old) = self.source.bound_path().map(Path::to_path_buf) {
                // Best effort: a rotated-away file may already be gone.
                // Each read is bounded, so keep reading until it is dry.
                loop {
                    match self.source.read_new() {
                        Ok(lines) if lines.is_empty() => break,
                        Ok(lines) => {
                            if deliver(&lines, on_line) == Tick::Stopped {
                                return Ok(Tick::Stopped);
                            }
                        }
                        Err(e) => {
                            tracing::debug!(file = %old.display(), error = %e, "could not drain rotated log");
                            break;
                        }
                    }
                }
                tracing::info!(
                    from = %old.display(),
                    to = %latest.display(),
                    "log rotated"
                );
            }

            if let Err(e) = self.source.rebind(&latest) {
                return self.transient(&latest, e);
            }
            tracing::info!(file = %latest.display(), "tailing log file");
        }

        match self.source.read_new() {
            Ok(lines) => {
                self.failures = 0;
                Ok(deliver(&lines, on_line))
            }
            Err(e) => self.transient(&latest, e),
        }
    }

    /// Ticks every poll interval until `on_line` breaks or `cancel` fires.
    pub async fn run<F>(
        &mut self,
        cancel: &CancellationToken,
        mut on_line: F,
    ) -> Result<WatchOutcome, WatchError>
    where
        F: FnMut(&str) -> ControlFlow<()>,
    {
        let mut poll = tokio::time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(WatchOutcome::Cancelled),
                _ = poll.tick() => {
                    if self.tick(&mut on_line)? == Tick::Stopped {
                        return Ok(WatchOutcome::Stopped);
                    }
                }
            }
        }
    }

    fn transient(&mut self, path: &Path, error: TailError) -> Result<Tick, WatchError> {
        if matches!(error, TailError::Gone(_)) {
            // Forget the handle so the next tick rebinds to whatever is latest.
            self.source.unbind();
        }

        self.failures += 1;
        if self.failures >= MAX_CONSECUTIVE_FAILURES {
            return Err(WatchError::Unreadable {
                path: path.to_path_buf(),
                ticks: self.failures,
                source: error,
            });
        }

        tracing::warn!(
            file = %path.display(),
            error = %error,
            failures = self.failures,
            "log read failed, retrying"
        );
        Ok(Tick::Retry)
    }
}

fn deliver<F>(lines: &[String], on_line: &mut F) -> Tick
where
    F: FnMut(&str) -> ControlFlow<()>,
{
    for line in lines {
        if on_line(line).is_break() {
            return Tick::Stopped;
        }
    }
    Tick::Read(lines.len())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};
    use std::io::Write;
    use std::rc::Rc;

    use super::*;
    use crate::locator::{GlobDirectory, LogPattern};
    use crate::state::{PatchAction, PatchStateMachine};

    /// Directory whose latest file is set by the test.
    #[derive(Clone, Default)]
    struct ScriptedDir(Rc<RefCell<Option<PathBuf>>>);

    impl ScriptedDir {
        fn set(&self, path: &str) {
            *self.0.borrow_mut() = Some(PathBuf::from(path));
        }
    }

    impl LogDirectory for ScriptedDir {
        fn latest(&self) -> Option<PathBuf> {
            self.0.borrow().clone()
        }
    }

    /// In-memory files: each path holds a queue of pending lines.
    #[derive(Clone, Default)]
    struct ScriptedFiles {
        pending: Rc<RefCell<HashMap<PathBuf, VecDeque<String>>>>,
        fail_reads: Rc<RefCell<u32>>,
        /// Lines handed out per read; 0 means all pending.
        batch: Rc<RefCell<usize>>,
    }

    impl ScriptedFiles {
        fn append(&self, path: &str, line: &str) {
            self.pending
                .borrow_mut()
                .entry(PathBuf::from(path))
                .or_default()
                .push_back(line.to_string());
        }
    }

    struct ScriptedSource {
        files: ScriptedFiles,
        bound: Option<PathBuf>,
        rebinds: Vec<PathBuf>,
    }

    impl LineSource for ScriptedSource {
        fn bound_path(&self) -> Option<&Path> {
            self.bound.as_deref()
        }

        fn rebind(&mut self, path: &Path) -> Result<(), TailError> {
            if !self.files.pending.borrow().contains_key(path) {
                return Err(TailError::Gone(path.to_path_buf()));
            }
            self.bound = Some(path.to_path_buf());
            self.rebinds.push(path.to_path_buf());
            Ok(())
        }

        fn unbind(&mut self) {
            self.bound = None;
        }

        fn read_new(&mut self) -> Result<Vec<String>, TailError> {
            let Some(path) = self.bound.clone() else {
                return Err(TailError::Unbound);
            };
            let mut fails = self.files.fail_reads.borrow_mut();
            if *fails > 0 {
                *fails -= 1;
                return Err(TailError::Io {
                    path,
                    source: std::io::Error::other("locked"),
                });
            }
            let mut pending = self.files.pending.borrow_mut();
            let batch = *self.files.batch.borrow();
            Ok(pending
                .get_mut(&path)
                .map(|q| {
                    let n = if batch == 0 { q.len() } else { batch.min(q.len()) };
                    q.drain(..n).collect()
                })
                .unwrap_or_default())
        }
    }

    fn scripted() -> (ScriptedDir, ScriptedFiles, LogWatcher<ScriptedDir, ScriptedSource>) {
        let dir = ScriptedDir::default();
        let files = ScriptedFiles::default();
        let source = ScriptedSource {
            files: files.clone(),
            bound: None,
            rebinds: Vec::new(),
        };
        let watcher = LogWatcher::new(dir.clone(), source);
        (dir, files, watcher)
    }

    fn collect_into(seen: &mut Vec<String>) -> impl FnMut(&str) -> ControlFlow<()> + '_ {
        move |line| {
            seen.push(line.to_string());
            ControlFlow::Continue(())
        }
    }

    fn transition(prev: &str, next: &str) -> String {
        format!(
            "1.0| ALWAYS| rnet-product-registry: TransitionToCombinedPatchState: install 'valorant.live' switching states '{prev}' -> '{next}' because 'statusPatchPlugin'"
        )
    }

    #[test]
    fn no_log_yet() {
        let (_dir, _files, mut watcher) = scripted();
        let mut seen = Vec::new();
        assert_eq!(watcher.tick(&mut collect_into(&mut seen)).unwrap(), Tick::NoLog);
        assert!(seen.is_empty());
    }

    #[test]
    fn binds_first_file_and_reads_in_same_tick() {
        let (dir, files, mut watcher) = scripted();
        files.append("a.log", "one");
        files.append("a.log", "two");
        dir.set("a.log");

        let mut seen = Vec::new();
        assert_eq!(watcher.tick(&mut collect_into(&mut seen)).unwrap(), Tick::Read(2));
        assert_eq!(seen, vec!["one", "two"]);
        assert_eq!(watcher.source().bound_path(), Some(Path::new("a.log")));
    }

    #[test]
    fn rotation_drains_old_then_reads_new() {
        let (dir, files, mut watcher) = scripted();
        files.append("a.log", "a1");
        dir.set("a.log");

        let mut seen = Vec::new();
        watcher.tick(&mut collect_into(&mut seen)).unwrap();

        // Late write to A, then B appears.
        files.append("a.log", "a2");
        files.append("b.log", "b1");
        files.append("b.log", "b2");
        dir.set("b.log");

        assert_eq!(watcher.tick(&mut collect_into(&mut seen)).unwrap(), Tick::Read(2));
        assert_eq!(seen, vec!["a1", "a2", "b1", "b2"]);
        assert_eq!(
            watcher.source().rebinds,
            vec![PathBuf::from("a.log"), PathBuf::from("b.log")]
        );

        // Nothing re-delivered.
        assert_eq!(watcher.tick(&mut collect_into(&mut seen)).unwrap(), Tick::Read(0));
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn stop_during_drain_skips_rebind() {
        let (dir, files, mut watcher) = scripted();
        files.append("a.log", "start");
        dir.set("a.log");
        watcher.tick(&mut |_: &str| ControlFlow::Continue(())).unwrap();

        files.append("a.log", "stop here");
        files.append("b.log", "never read");
        dir.set("b.log");

        let mut seen = Vec::new();
        let tick = watcher
            .tick(&mut |line: &str| {
                seen.push(line.to_string());
                ControlFlow::Break(())
            })
            .unwrap();

        assert_eq!(tick, Tick::Stopped);
        assert_eq!(seen, vec!["stop here"]);
        assert_eq!(watcher.source().bound_path(), Some(Path::new("a.log")));
    }

    #[test]
    fn transient_failures_retry_then_recover() {
        let (dir, files, mut watcher) = scripted();
        files.append("a.log", "x");
        dir.set("a.log");
        *files.fail_reads.borrow_mut() = 2;

        let mut seen = Vec::new();
        assert_eq!(watcher.tick(&mut collect_into(&mut seen)).unwrap(), Tick::Retry);
        assert_eq!(watcher.tick(&mut collect_into(&mut seen)).unwrap(), Tick::Retry);
        assert_eq!(watcher.tick(&mut collect_into(&mut seen)).unwrap(), Tick::Read(1));
        assert_eq!(seen, vec!["x"]);
    }

    #[test]
    fn persistent_failure_is_unrecoverable() {
        let (dir, files, mut watcher) = scripted();
        files.append("a.log", "x");
        dir.set("a.log");
        *files.fail_reads.borrow_mut() = MAX_CONSECUTIVE_FAILURES + 5;

        let mut sink = |_: &str| ControlFlow::Continue(());
        for _ in 1..MAX_CONSECUTIVE_FAILURES {
            assert_eq!(watcher.tick(&mut sink).unwrap(), Tick::Retry);
        }
        let err = watcher.tick(&mut sink).unwrap_err();
        assert!(matches!(
            err,
            WatchError::Unreadable { ticks, .. } if ticks == MAX_CONSECUTIVE_FAILURES
        ));
    }

    #[test]
    fn gone_latest_is_retried() {
        let (dir, _files, mut watcher) = scripted();
        dir.set("vanished.log");

        let mut sink = |_: &str| ControlFlow::Continue(());
        assert_eq!(watcher.tick(&mut sink).unwrap(), Tick::Retry);
        assert!(watcher.source().bound_path().is_none());
    }

    fn append_file(path: &Path, text: &str) {
        let mut f = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .unwrap();
        f.write_all(text.as_bytes()).unwrap();
    }

    fn set_mtime(path: &Path, secs: u64) {
        let mtime = std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(secs);
        std::fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_times(std::fs::FileTimes::new().set_modified(mtime))
            .unwrap();
    }

    #[test]
    fn real_files_rotation_without_loss_or_duplicates() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("client_a.log");
        let b = tmp.path().join("client_b.log");

        append_file(&a, "a1\na2\n");
        set_mtime(&a, 1_000);

        let dir = GlobDirectory::new(tmp.path(), LogPattern::default());
        let mut watcher = LogWatcher::new(dir, TailReader::new());
        let mut seen = Vec::new();
        watcher.tick(&mut collect_into(&mut seen)).unwrap();
        assert_eq!(seen, vec!["a1", "a2"]);

        append_file(&a, "a3\n");
        set_mtime(&a, 1_001);
        append_file(&b, "b1\nb2\n");
        set_mtime(&b, 2_000);

        watcher.tick(&mut collect_into(&mut seen)).unwrap();
        assert_eq!(seen, vec!["a1", "a2", "a3", "b1", "b2"]);
        assert_eq!(watcher.source().bound_path(), Some(b.as_path()));

        append_file(&b, "b3\n");
        set_mtime(&b, 2_001);
        watcher.tick(&mut collect_into(&mut seen)).unwrap();
        assert_eq!(seen, vec!["a1", "a2", "a3", "b1", "b2", "b3"]);
    }

    #[test]
    fn out_of_date_scenario_fires_once() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("log_1.log");
        append_file(&log, &format!("{}\n", transition("UpToDate", "OutOfDate")));

        let mut machine = PatchStateMachine::new();
        let mut actions = Vec::new();
        let dir = GlobDirectory::new(tmp.path(), LogPattern::default());
        let mut watcher = LogWatcher::new(dir, TailReader::new());

        let mut sink = |line: &str| {
            if let Some(action) = machine.feed_line(line) {
                actions.push(action);
            }
            ControlFlow::Continue(())
        };
        watcher.tick(&mut sink).unwrap();
        watcher.tick(&mut sink).unwrap();

        assert_eq!(actions, vec![PatchAction::UpdateAvailable]);
        assert_eq!(
            machine.current(),
            valtext_protocol::LifecycleState::OutOfDate
        );
    }

    #[test]
    fn flip_back_to_older_file_resumes_where_it_stopped() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a.log");
        let b = tmp.path().join("b.log");

        append_file(&a, "a1\na2\n");
        set_mtime(&a, 1_000);

        let dir = GlobDirectory::new(tmp.path(), LogPattern::default());
        let mut watcher = LogWatcher::new(dir, TailReader::new());
        let mut seen = Vec::new();
        watcher.tick(&mut collect_into(&mut seen)).unwrap();

        append_file(&b, "b1\n");
        set_mtime(&b, 2_000);
        watcher.tick(&mut collect_into(&mut seen)).unwrap();

        // A late write makes the old file the newest again.
        append_file(&a, "a3\n");
        set_mtime(&a, 3_000);
        watcher.tick(&mut collect_into(&mut seen)).unwrap();
        assert_eq!(watcher.source().bound_path(), Some(a.as_path()));

        append_file(&b, "b2\n");
        set_mtime(&b, 4_000);
        watcher.tick(&mut collect_into(&mut seen)).unwrap();

        assert_eq!(seen, vec!["a1", "a2", "b1", "a3", "b2"]);
    }

    #[test]
    fn rotation_drains_beyond_one_read() {
        let (dir, files, mut watcher) = scripted();
        files.append("a.log", "a1");
        dir.set("a.log");
        let mut seen = Vec::new();
        watcher.tick(&mut collect_into(&mut seen)).unwrap();

        // Each read hands out one line; the backlog takes several.
        *files.batch.borrow_mut() = 1;
        for line in ["a2", "a3", "a4"] {
            files.append("a.log", line);
        }
        files.append("b.log", "b1");
        dir.set("b.log");

        watcher.tick(&mut collect_into(&mut seen)).unwrap();
        assert_eq!(seen, vec!["a1", "a2", "a3", "a4", "b1"]);
    }

    #[tokio::test]
    async fn run_stops_on_break() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("log_1.log");
        append_file(
            &log,
            &format!(
                "{}\n{}\n",
                transition("UpToDate", "OutOfDate"),
                transition("Updating", "UpToDate")
            ),
        );

        let dir = GlobDirectory::new(tmp.path(), LogPattern::default());
        let mut watcher =
            LogWatcher::new(dir, TailReader::new()).with_poll_interval(Duration::from_millis(10));
        let mut machine = PatchStateMachine::new();
        let cancel = CancellationToken::new();

        let outcome = watcher
            .run(&cancel, |line| match machine.feed_line(line) {
                Some(PatchAction::UpdateComplete) => ControlFlow::Break(()),
                _ => ControlFlow::Continue(()),
            })
            .await
            .unwrap();

        assert_eq!(outcome, WatchOutcome::Stopped);
        assert!(machine.is_finished());
    }

    #[tokio::test]
    async fn run_honors_cancellation() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = GlobDirectory::new(tmp.path(), LogPattern::default());
        let mut watcher =
            LogWatcher::new(dir, TailReader::new()).with_poll_interval(Duration::from_millis(10));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let outcome = watcher
            .run(&cancel, |_| ControlFlow::Continue(()))
            .await
            .unwrap();
        assert_eq!(outcome, WatchOutcome::Cancelled);
    }
}
