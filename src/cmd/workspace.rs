//! Loaded record plus the store that edits it.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;

use mjop::config::MjopConfig;
use mjop::errors::SyncError;
use mjop::store::{Action, Dispatched, State, Store};
use mjop::sync::{BackgroundSaver, Snapshot, SyncBackend, SyncNotice};

pub struct Workspace {
    pub config: MjopConfig,
    store: Store,
    notices: UnboundedReceiver<SyncNotice>,
}

impl Workspace {
    /// Load the configured record from the local data directory. A record
    /// that does not exist yet starts empty.
    pub async fn open(config: MjopConfig) -> Result<Self> {
        let backend = config.local_backend();
        let record_id = config.record_id();

        let state = match backend.fetch(&record_id).await {
            Ok(snapshot) => snapshot.into_state(),
            Err(SyncError::RecordNotFound { .. }) => {
                tracing::info!(record_id = %record_id, "No local record yet, starting empty");
                State::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to load record '{}'", record_id));
            }
        };

        let (saver, notices) = BackgroundSaver::new(Arc::new(backend), &record_id, Handle::current());
        let store = Store::from_state(state).with_save_hook(Arc::new(saver));
        Ok(Self {
            config,
            store,
            notices,
        })
    }

    pub fn state(&self) -> Arc<State> {
        self.store.state()
    }

    /// Dispatch and print any warnings the store raised.
    pub fn dispatch(&mut self, action: Action) -> Result<Dispatched> {
        let outcome = self.store.dispatch(action)?;
        for warning in &outcome.warnings {
            eprintln!("{} {}", console::style("warning:").yellow().bold(), warning);
        }
        Ok(outcome)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from(self.store.state().as_ref())
    }

    /// Wait for every save started by this workspace. Fails if any of them
    /// did; the in-memory edits are not rolled back either way.
    pub async fn close(self) -> Result<()> {
        let Self {
            store, mut notices, ..
        } = self;
        drop(store);

        let mut failures = Vec::new();
        while let Some(notice) = notices.recv().await {
            match notice {
                SyncNotice::Saved { record_id, entities } => {
                    tracing::debug!(record_id = %record_id, entities, "Save confirmed");
                }
                SyncNotice::Failed { record_id, error } => {
                    failures.push(format!("{}: {}", record_id, error));
                }
            }
        }
        if !failures.is_empty() {
            anyhow::bail!("Failed to save record ({})", failures.join("; "));
        }
        Ok(())
    }
}
