use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{Snapshot, SyncBackend};
use crate::store::SaveHook;

/// Outcome of one background save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncNotice {
    Saved { record_id: String, entities: usize },
    Failed { record_id: String, error: String },
}

/// Fire-and-forget persistence for store snapshots.
///
/// Each save runs as its own task; a slow save never holds up the next
/// dispatch and saves are neither coalesced nor cancelled. The receiver
/// returned by [`BackgroundSaver::new`] yields one notice per save and
/// closes once the saver and every in-flight save are gone.
pub struct BackgroundSaver {
    backend: Arc<dyn SyncBackend>,
    record_id: String,
    runtime: Handle,
    notices: mpsc::UnboundedSender<SyncNotice>,
}

impl BackgroundSaver {
    pub fn new(
        backend: Arc<dyn SyncBackend>,
        record_id: &str,
        runtime: Handle,
    ) -> (Self, mpsc::UnboundedReceiver<SyncNotice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let saver = Self {
            backend,
            record_id: record_id.to_string(),
            runtime,
            notices: tx,
        };
        (saver, rx)
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn spawn_save(&self, snapshot: Snapshot) -> JoinHandle<()> {
        let backend = Arc::clone(&self.backend);
        let record_id = self.record_id.clone();
        let notices = self.notices.clone();

        self.runtime.spawn(async move {
            let entities = snapshot.entity_count();
            let notice = match backend.save(&record_id, &snapshot, None).await {
                Ok(()) => {
                    tracing::info!(record_id = %record_id, entities, target = %backend.describe(), "Snapshot saved");
                    SyncNotice::Saved {
                        record_id,
                        entities,
                    }
                }
                Err(e) => {
                    tracing::warn!(record_id = %record_id, error = %e, "Snapshot save failed");
                    SyncNotice::Failed {
                        record_id,
                        error: e.to_string(),
                    }
                }
            };
            // Nobody listening is fine.
            let _ = notices.send(notice);
        })
    }
}

impl SaveHook for BackgroundSaver {
    fn save_requested(&self, snapshot: Snapshot) {
        self.spawn_save(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SyncError;
    use crate::model::Element;
    use crate::store::{Action, Store};
    use crate::sync::Attachment;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        saved: Mutex<Vec<usize>>,
        fail: bool,
    }

    #[async_trait]
    impl SyncBackend for Recording {
        async fn fetch(&self, record_id: &str) -> Result<Snapshot, SyncError> {
            Err(SyncError::RecordNotFound {
                record_id: record_id.to_string(),
            })
        }

        async fn save(
            &self,
            record_id: &str,
            snapshot: &Snapshot,
            _attachment: Option<Attachment>,
        ) -> Result<(), SyncError> {
            if self.fail {
                return Err(SyncError::Status {
                    status: 503,
                    record_id: record_id.to_string(),
                });
            }
            self.saved
                .lock()
                .unwrap()
                .push(snapshot.global_elements.len());
            Ok(())
        }

        fn describe(&self) -> String {
            "recording".into()
        }
    }

    #[tokio::test]
    async fn test_each_dispatch_produces_a_notice() {
        let backend = Arc::new(Recording::default());
        let (saver, mut rx) = BackgroundSaver::new(backend.clone(), "r1", Handle::current());
        let mut store = Store::new().with_save_hook(Arc::new(saver));

        store.dispatch(Action::AddElement(Element::new("a"))).unwrap();
        store.dispatch(Action::AddElement(Element::new("b"))).unwrap();
        drop(store);

        let mut notices = Vec::new();
        while let Some(notice) = rx.recv().await {
            notices.push(notice);
        }
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| matches!(n, SyncNotice::Saved { .. })));

        let mut saved = backend.saved.lock().unwrap().clone();
        saved.sort();
        assert_eq!(saved, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_state() {
        let backend = Arc::new(Recording {
            fail: true,
            ..Default::default()
        });
        let (saver, mut rx) = BackgroundSaver::new(backend, "r1", Handle::current());
        let mut store = Store::new().with_save_hook(Arc::new(saver));

        store.dispatch(Action::AddElement(Element::new("a"))).unwrap();
        assert_eq!(store.state().elements().len(), 1);

        match rx.recv().await {
            Some(SyncNotice::Failed { record_id, error }) => {
                assert_eq!(record_id, "r1");
                assert!(error.contains("503"));
            }
            other => panic!("expected failure notice, got {:?}", other),
        }
        assert_eq!(store.state().elements().len(), 1);
    }
}
