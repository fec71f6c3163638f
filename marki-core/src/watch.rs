//! Watch an input root and rebuild on change.
//!
//! Notifications from the OS are classified into [`ChangeKind`]s, filtered,
//! and pushed onto a bounded queue. The loop takes one event at a time and
//! runs the rebuild to completion before reading the next, so at most one
//! rebuild is ever in flight.

use crate::rebuild::{RebuildError, SiteRebuilder};
use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("failed to watch for changes: {0}")]
    Subscribe(#[source] notify::Error),

    #[error("change notification failed: {0}")]
    Notify(#[source] notify::Error),

    #[error("change notification channel closed")]
    Closed,

    #[error("rebuild failed: {0}")]
    Rebuild(#[from] RebuildError),

    #[error("rebuild task panicked: {0}")]
    RebuildPanicked(String),
}

/// Classified file-system change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// File content was written
    Write,
    Create,
    Remove,
    Rename,
    /// Metadata, access, and anything unrecognised
    Other,
}

impl From<&EventKind> for ChangeKind {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Rename,
            EventKind::Modify(ModifyKind::Metadata(_)) => ChangeKind::Other,
            EventKind::Modify(_) => ChangeKind::Write,
            EventKind::Create(_) => ChangeKind::Create,
            EventKind::Remove(_) => ChangeKind::Remove,
            EventKind::Access(_) | EventKind::Any | EventKind::Other => ChangeKind::Other,
        }
    }
}

/// A change somewhere under the watched root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub paths: Vec<PathBuf>,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, paths: Vec<PathBuf>) -> Self {
        Self { kind, paths }
    }
}

impl From<notify::Event> for ChangeEvent {
    fn from(event: notify::Event) -> Self {
        Self {
            kind: ChangeKind::from(&event.kind),
            paths: event.paths,
        }
    }
}

/// Change kinds that start a rebuild. Defaults to content writes only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RebuildTriggers(Vec<ChangeKind>);

impl RebuildTriggers {
    pub fn new(kinds: impl IntoIterator<Item = ChangeKind>) -> Self {
        Self(kinds.into_iter().collect())
    }

    /// Writes, creations, removals, and renames
    pub fn all() -> Self {
        Self::new([
            ChangeKind::Write,
            ChangeKind::Create,
            ChangeKind::Remove,
            ChangeKind::Rename,
        ])
    }

    pub fn accepts(&self, kind: ChangeKind) -> bool {
        self.0.contains(&kind)
    }
}

impl Default for RebuildTriggers {
    fn default() -> Self {
        Self::new([ChangeKind::Write])
    }
}

/// What the notification thread does when the queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backpressure {
    /// Drop the event; a rebuild is already pending and will pick it up
    #[default]
    Coalesce,
    /// Wait for room in the queue
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchOptions {
    pub triggers: RebuildTriggers,
    /// Pending events held while a rebuild runs (minimum 1)
    pub queue_capacity: usize,
    pub backpressure: Backpressure,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            triggers: RebuildTriggers::default(),
            queue_capacity: 1,
            backpressure: Backpressure::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Watching,
    Rebuilding,
    Stopped,
    Crashed,
}

type Notification = Result<ChangeEvent, notify::Error>;

/// Decides whether a change should start a rebuild
#[derive(Debug, Clone)]
struct ChangeFilter {
    triggers: RebuildTriggers,
    output_root: PathBuf,
}

impl ChangeFilter {
    fn qualifies(&self, change: &ChangeEvent) -> bool {
        if !self.triggers.accepts(change.kind) {
            return false;
        }
        // our own writes when the output root sits inside the input root
        let only_output = !change.paths.is_empty()
            && change
                .paths
                .iter()
                .all(|p| p.starts_with(&self.output_root));
        !only_output
    }
}

/// Runs on the notifier's thread, feeding the queue
struct Forwarder {
    tx: mpsc::Sender<Notification>,
    filter: ChangeFilter,
    backpressure: Backpressure,
}

impl Forwarder {
    fn forward(&self, res: notify::Result<notify::Event>) {
        let change = match res {
            Ok(event) => ChangeEvent::from(event),
            Err(err) => {
                let _ = self.tx.blocking_send(Err(err));
                return;
            }
        };

        if !self.filter.qualifies(&change) {
            return;
        }

        match self.backpressure {
            Backpressure::Coalesce => match self.tx.try_send(Ok(change)) {
                Ok(()) | Err(TrySendError::Closed(_)) => {}
                Err(TrySendError::Full(dropped)) => {
                    tracing::trace!("Rebuild already pending, coalescing {:?}", dropped);
                }
            },
            Backpressure::Block => {
                let _ = self.tx.blocking_send(Ok(change));
            }
        }
    }
}

/// Long-running watch-and-rebuild loop
pub struct WatchLoop {
    rebuilder: Arc<SiteRebuilder>,
    options: WatchOptions,
    state: WatchState,
    rebuilds: usize,
}

impl WatchLoop {
    pub fn new(rebuilder: Arc<SiteRebuilder>, options: WatchOptions) -> Self {
        Self {
            rebuilder,
            options,
            state: WatchState::Idle,
            rebuilds: 0,
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Number of rebuilds started, including the initial one
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    /// Subscribe to the input root and rebuild until an error occurs.
    pub async fn run(&mut self) -> Result<(), WatchError> {
        let (_watcher, rx) = self.subscribe()?;
        self.run_with_events(rx).await
    }

    /// Like [`WatchLoop::run`], but returns `Ok` once `shutdown` completes.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<(), WatchError>
    where
        F: Future<Output = ()>,
    {
        let (_watcher, rx) = self.subscribe()?;
        let outcome = tokio::select! {
            res = self.run_with_events(rx) => Some(res),
            _ = shutdown => None,
        };

        match outcome {
            Some(res) => res,
            None => {
                self.transition(WatchState::Stopped);
                Ok(())
            }
        }
    }

    fn subscribe(
        &self,
    ) -> Result<(RecommendedWatcher, mpsc::Receiver<Notification>), WatchError> {
        let (tx, rx) = mpsc::channel(self.options.queue_capacity.max(1));
        let forwarder = Forwarder {
            tx,
            filter: self.filter(),
            backpressure: self.options.backpressure,
        };

        let mut watcher = RecommendedWatcher::new(
            move |res| forwarder.forward(res),
            notify::Config::default(),
        )
        .map_err(WatchError::Subscribe)?;

        let input_root = self.rebuilder.input_root();
        watcher
            .watch(input_root, RecursiveMode::Recursive)
            .map_err(WatchError::Subscribe)?;

        tracing::info!("Watching {:?} for changes", input_root);
        Ok((watcher, rx))
    }

    /// Drive the loop from an existing notification queue.
    ///
    /// Performs one rebuild immediately, then one per qualifying event.
    /// Returns when the queue closes, a notification error arrives, or a
    /// rebuild fails for a reason other than individual documents.
    pub async fn run_with_events(
        &mut self,
        mut rx: mpsc::Receiver<Notification>,
    ) -> Result<(), WatchError> {
        self.transition(WatchState::Watching);
        self.rebuild_now().await?;

        let filter = self.filter();
        loop {
            let change = match rx.recv().await {
                Some(Ok(change)) => change,
                Some(Err(err)) => {
                    self.transition(WatchState::Crashed);
                    return Err(WatchError::Notify(err));
                }
                None => {
                    self.transition(WatchState::Crashed);
                    return Err(WatchError::Closed);
                }
            };

            if !filter.qualifies(&change) {
                tracing::debug!("Ignoring {:?} on {:?}", change.kind, change.paths);
                continue;
            }

            tracing::info!("Change detected ({:?}), rebuilding", change.kind);
            self.rebuild_now().await?;
        }
    }

    async fn rebuild_now(&mut self) -> Result<(), WatchError> {
        self.transition(WatchState::Rebuilding);
        self.rebuilds += 1;

        let rebuilder = Arc::clone(&self.rebuilder);
        let result = tokio::task::spawn_blocking(move || rebuilder.rebuild()).await;

        match result {
            Ok(Ok(_)) => {}
            Ok(Err(RebuildError::Partial { failures, written })) => {
                tracing::warn!(
                    "Rebuild finished with {} failed documents ({} written)",
                    failures.len(),
                    written
                );
                for failure in &failures {
                    tracing::warn!("  {}", failure);
                }
            }
            Ok(Err(err)) => {
                self.transition(WatchState::Crashed);
                return Err(WatchError::Rebuild(err));
            }
            Err(join) => {
                self.transition(WatchState::Crashed);
                return Err(WatchError::RebuildPanicked(join.to_string()));
            }
        }

        self.transition(WatchState::Watching);
        Ok(())
    }

    fn filter(&self) -> ChangeFilter {
        ChangeFilter {
            triggers: self.options.triggers.clone(),
            output_root: self.rebuilder.output_root().to_path_buf(),
        }
    }

    fn transition(&mut self, next: WatchState) {
        if self.state != next {
            tracing::debug!("Watch state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}
