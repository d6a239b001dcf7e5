//! Per-document locking for indexing runs
//!
//! At most one run touches a document at a time. A second caller for the
//! same document subscribes to the running operation's broadcast, waits for
//! it to finish, then takes its own turn. A guard dropped before `release`
//! (panic, cancelled future) rolls the document back in a spawned task and
//! only frees the document once the rollback is done. Clearing the whole
//! index is exclusive with every run, rollbacks included.

use crate::types::{Document, DocumentStatus, IndexDocumentResponse};
use crate::vector_db::VectorStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedRwLockReadGuard, RwLock, RwLockWriteGuard, broadcast};

type RunMap = HashMap<String, broadcast::Sender<IndexDocumentResponse>>;

/// Registry of documents with a run in progress
#[derive(Clone, Default)]
pub(crate) struct DocumentLocks {
    runs: Arc<Mutex<RunMap>>,
    /// Shared by runs, taken exclusively by index-wide operations
    gate: Arc<RwLock<()>>,
}

impl DocumentLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Whether a run currently holds `document_id`
    pub(crate) fn is_locked(&self, document_id: &str) -> bool {
        self.runs
            .lock()
            .map(|runs| runs.contains_key(document_id))
            .unwrap_or(false)
    }

    /// Wait until no run is in progress anywhere, then keep new runs out
    /// while the returned guard lives
    pub(crate) async fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write().await
    }

    /// Wait until no other run holds `document_id`, then take it
    pub(crate) async fn acquire(&self, document_id: &str) -> anyhow::Result<DocumentLockGuard> {
        let gate = self.gate.clone().read_owned().await;
        loop {
            let mut receiver = {
                let mut runs = self
                    .runs
                    .lock()
                    .map_err(|e| anyhow::anyhow!("Document lock map poisoned: {}", e))?;

                match runs.get(document_id) {
                    Some(running) => running.subscribe(),
                    None => {
                        // One result is ever sent per run
                        let (result_tx, _) = broadcast::channel(1);
                        runs.insert(document_id.to_string(), result_tx.clone());
                        return Ok(DocumentLockGuard {
                            document_id: document_id.to_string(),
                            runs: self.runs.clone(),
                            result_tx,
                            rollback: None,
                            released: false,
                            gate: Some(gate),
                        });
                    }
                }
            };

            tracing::info!(
                "Indexing already in progress for '{}', waiting for it to finish",
                document_id
            );

            // Closed means the holder went away without a result; either way
            // the entry is gone (or about to be) and we try again
            match receiver.recv().await {
                Ok(previous) => tracing::debug!(
                    "Previous run for '{}' finished with status {}",
                    document_id,
                    previous.status
                ),
                Err(e) => tracing::debug!("Previous run for '{}' ended: {}", document_id, e),
            }
        }
    }
}

/// What to undo if a run is abandoned after it started writing
pub(crate) struct Rollback {
    store: Arc<dyn VectorStore>,
    document: Document,
}

impl Rollback {
    /// Remove partial chunks and record the document as failed
    pub(crate) async fn run(mut self, reason: &str) -> anyhow::Result<()> {
        self.store
            .delete_chunks_by_document(&self.document.id)
            .await?;

        // The stored record may still be pending; an abandoned run is failed either way
        self.document.status = DocumentStatus::Processing;
        self.document.mark_failed(reason)?;
        self.store.upsert_document(&self.document).await
    }
}

/// Exclusive hold on one document's indexing
pub(crate) struct DocumentLockGuard {
    document_id: String,
    runs: Arc<Mutex<RunMap>>,
    result_tx: broadcast::Sender<IndexDocumentResponse>,
    rollback: Option<Rollback>,
    released: bool,
    gate: Option<OwnedRwLockReadGuard<()>>,
}

impl DocumentLockGuard {
    /// From here on, dropping the guard rolls `document` back
    pub(crate) fn arm(&mut self, store: Arc<dyn VectorStore>, document: Document) {
        self.rollback = Some(Rollback { store, document });
    }

    /// The run reached a consistent state; nothing to undo
    pub(crate) fn disarm(&mut self) {
        self.rollback = None;
    }

    /// Free the document and hand `result` to anyone waiting for it
    pub(crate) fn release(mut self, result: Option<&IndexDocumentResponse>) {
        self.rollback = None;
        remove_entry(&self.runs, &self.document_id);
        if let Some(result) = result {
            // No receivers is fine
            let _ = self.result_tx.send(result.clone());
        }
        self.released = true;
    }
}

fn remove_entry(runs: &Mutex<RunMap>, document_id: &str) {
    match runs.lock() {
        Ok(mut runs) => {
            runs.remove(document_id);
        }
        Err(e) => tracing::error!("Document lock map poisoned: {}", e),
    }
}

impl Drop for DocumentLockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let Some(rollback) = self.rollback.take() else {
            remove_entry(&self.runs, &self.document_id);
            return;
        };

        let document_id = self.document_id.clone();
        let runs = self.runs.clone();
        let gate = self.gate.take();

        tracing::warn!(
            "Indexing of '{}' was interrupted - rolling back partial chunks",
            document_id
        );

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = rollback.run("indexing was interrupted").await {
                        tracing::error!("Rollback of '{}' failed: {:#}", document_id, e);
                    }
                    remove_entry(&runs, &document_id);
                    drop(gate);
                });
            }
            Err(_) => {
                tracing::error!(
                    "No runtime to roll back '{}'; partial chunks may remain",
                    document_id
                );
                remove_entry(&runs, &document_id);
            }
        }
    }
}
