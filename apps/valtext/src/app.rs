//! Application orchestrator: the fail-fast run from voice swap to game launch.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use valtext_client_log::{
    GlobDirectory, LogWatcher, PatchAction, PatchStateMachine, TailReader, WatchError,
    WatchOutcome,
};
use valtext_file_ops::{LanguageAsset, StageError, SwapError};
use valtext_protocol::Role;
use valtext_riot::{Launcher, ProcessLauncher, RiotError};

use crate::config::Settings;

/// A failed run. Each variant names the step that failed.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("setup failed: {0}")]
    Setup(#[source] StageError),

    #[error("voice swap failed: {0}")]
    VoiceSwap(#[source] SwapError),

    #[error("could not start the Riot Client: {0}")]
    ClientLaunch(#[source] RiotError),

    #[error("log watcher stopped: {0}")]
    Watch(#[source] WatchError),

    #[error("text swap failed, game not started: {0}")]
    TextSwap(#[source] SwapError),

    #[error("could not start the game: {0}")]
    GameLaunch(#[source] RiotError),

    #[error("cancelled")]
    Cancelled,
}

impl RunError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Setup(_) => 2,
            RunError::VoiceSwap(_) => 3,
            RunError::ClientLaunch(_) => 4,
            RunError::Watch(_) => 5,
            RunError::TextSwap(_) => 6,
            RunError::GameLaunch(_) => 7,
            RunError::Cancelled => 130,
        }
    }

    /// What the operator can do about it, if anything obvious.
    pub fn hint(&self) -> Option<String> {
        match self {
            RunError::Setup(StageError::NotStaged { language, dir, .. }) => Some(format!(
                "Copy the {language} .pak and .sig files into {}, or set the game to {language}, \
                 let it patch, and run `valtext stage`.",
                dir.display()
            )),
            RunError::VoiceSwap(SwapError::MissingDestination(dir))
            | RunError::TextSwap(SwapError::MissingDestination(dir)) => Some(format!(
                "Game assets not found at {}. Check install_root in the configuration.",
                dir.display()
            )),
            RunError::ClientLaunch(RiotError::ClientNotFound(_)) => {
                Some("Check install_root in the configuration (`valtext config`).".into())
            }
            RunError::Watch(_) => Some(
                "Check log_dir in the configuration; the game was not started.".into(),
            ),
            _ => None,
        }
    }
}

/// Runs the full flow with real processes until done, failed or Ctrl+C.
pub async fn run(settings: &Settings) -> Result<(), RunError> {
    let cancel = CancellationToken::new();

    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("SIGINT received, shutting down");
            on_signal.cancel();
        }
    });

    let launcher = ProcessLauncher::new(settings.riot.client_exe());
    Orchestrator::new(settings, &launcher, cancel).run().await
}

/// Copies the game's current asset pair of `role`'s language into the store.
pub fn stage(settings: &Settings, role: Role) -> Result<LanguageAsset, StageError> {
    let language = settings.language(role);
    settings.store.ensure_dirs(&[settings.text, settings.voice])?;
    settings
        .store
        .stage_from_game(language, &settings.riot.paks_dir())
}

/// Sequences setup, swaps, launches and the watcher for one run.
pub struct Orchestrator<'a, L> {
    settings: &'a Settings,
    launcher: &'a L,
    cancel: CancellationToken,
}

impl<'a, L: Launcher> Orchestrator<'a, L> {
    pub fn new(settings: &'a Settings, launcher: &'a L, cancel: CancellationToken) -> Self {
        Self {
            settings,
            launcher,
            cancel,
        }
    }

    pub async fn run(&self) -> Result<(), RunError> {
        self.prepare()?;

        let report = self
            .settings
            .swapper()
            .swap(Role::Voice)
            .map_err(RunError::VoiceSwap)?;
        tracing::debug!(files = ?report.files, "voice assets placed");

        self.launcher
            .start_client()
            .map_err(RunError::ClientLaunch)?;
        println!("Riot Client started. Waiting for VALORANT to be up to date...");

        if !self.pause(self.settings.client_grace).await {
            return Err(RunError::Cancelled);
        }

        self.watch().await?;
        self.finish().await
    }

    /// Creates working folders and checks both asset pairs are staged.
    fn prepare(&self) -> Result<(), RunError> {
        let store = &self.settings.store;
        let (text, voice) = (self.settings.text, self.settings.voice);

        store.ensure_dirs(&[text, voice]).map_err(RunError::Setup)?;
        store.verify(text).map_err(RunError::Setup)?;
        store.verify(voice).map_err(RunError::Setup)?;

        tracing::info!(%text, %voice, store = %store.root().display(), "language assets ready");
        Ok(())
    }

    /// Watches the client logs until the patch reaches `UpToDate`.
    async fn watch(&self) -> Result<(), RunError> {
        let dir = GlobDirectory::new(&self.settings.log_dir, self.settings.log_pattern.clone());
        let mut watcher = LogWatcher::new(dir, TailReader::new())
            .with_poll_interval(self.settings.poll_interval);
        let mut machine = PatchStateMachine::new();

        tracing::info!(dir = %self.settings.log_dir.display(), "watching client logs");

        let outcome = watcher
            .run(&self.cancel, |line| match machine.feed_line(line) {
                Some(action) => {
                    announce(action);
                    if action == PatchAction::UpdateComplete {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    }
                }
                None => ControlFlow::Continue(()),
            })
            .await
            .map_err(RunError::Watch)?;

        match outcome {
            WatchOutcome::Stopped => Ok(()),
            WatchOutcome::Cancelled => Err(RunError::Cancelled),
        }
    }

    /// Terminal action: text swap, then the game only if the swap succeeded.
    async fn finish(&self) -> Result<(), RunError> {
        if !self.pause(self.settings.settle_delay).await {
            return Err(RunError::Cancelled);
        }

        self.settings
            .swapper()
            .swap(Role::Text)
            .map_err(RunError::TextSwap)?;

        self.launcher.start_game().map_err(RunError::GameLaunch)?;
        println!(
            "VALORANT started with {} text and {} voice.",
            self.settings.text, self.settings.voice
        );

        // Cancelling here only shortens the goodbye.
        self.pause(self.settings.exit_delay).await;
        Ok(())
    }

    /// Sleeps for `duration`. Returns `false` if cancelled first.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}

fn announce(action: PatchAction) {
    match action {
        PatchAction::UpdateAvailable => {
            tracing::info!("update available");
            println!("An update is available. Start it in the Riot Client; ValText will wait.");
        }
        PatchAction::UpdateInProgress => {
            tracing::info!("update in progress");
            println!("Updating...");
        }
        PatchAction::UpdateComplete => {
            tracing::info!("game is up to date");
            println!("VALORANT is up to date. Applying text language...");
        }
    }
}
