//! The upload coordinator: validation, task tracking, and insertion.
//!
//! `submit` is synchronous and returns immediately; the network transfer
//! runs as a spawned task. Every task is observable two ways: a per-task
//! `watch` channel (subscribe by id) and one merged `updates` stream that
//! the shell drains for progress UI and persistence hand-off.
//!
//! Tasks are fully independent: no queue, no concurrency cap, no shared
//! mutable state between them. The only shared resource is the document
//! itself, and the insertion rule for it is fixed: the cursor is read at
//! completion time, under the document lock, never captured at submission.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::{mpsc, watch};

use scribe_common::{ComposerConfig, StoreOptions};
use scribe_editor_core::{Block, Command, Document, ImageAttrs};

use crate::candidate::FileCandidate;
use crate::key::KeyTicker;
use crate::store::{AssetStore, ProgressFn, UploadOptions};
use crate::task::{TaskId, UploadState, UploadTask};
use crate::validate::validate;

/// A user-visible message from the upload pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }
}

/// Receivers for the coordinator's outbound streams.
pub struct CoordinatorEvents {
    /// User-visible notices (validation and gateway failures).
    pub notices: mpsc::UnboundedReceiver<Notice>,
    /// Every task state change and progress tick, merged across tasks.
    pub updates: mpsc::UnboundedReceiver<UploadTask>,
}

pub struct UploadCoordinator<S: AssetStore> {
    store: Arc<S>,
    document: Arc<Mutex<Document>>,
    config: ComposerConfig,
    tasks: Arc<Mutex<HashMap<TaskId, watch::Receiver<UploadTask>>>>,
    notices: mpsc::UnboundedSender<Notice>,
    updates: mpsc::UnboundedSender<UploadTask>,
    ticker: KeyTicker,
    next_id: AtomicU64,
}

impl<S: AssetStore> UploadCoordinator<S> {
    pub fn new(
        store: Arc<S>,
        document: Arc<Mutex<Document>>,
        config: ComposerConfig,
    ) -> (Self, CoordinatorEvents) {
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let coordinator = Self {
            store,
            document,
            config,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            notices: notice_tx,
            updates: update_tx,
            ticker: KeyTicker::new(),
            next_id: AtomicU64::new(1),
        };
        let events = CoordinatorEvents {
            notices: notice_rx,
            updates: update_rx,
        };
        (coordinator, events)
    }

    /// The shared document handle uploads insert into.
    pub fn document(&self) -> Arc<Mutex<Document>> {
        self.document.clone()
    }

    /// Accept a candidate and start its upload.
    ///
    /// Validation runs synchronously before any gateway call: a rejected
    /// candidate fails its task immediately, emits a notice, and never
    /// touches the network. Accepted candidates start uploading right away;
    /// the transfer is spawned onto the current async runtime and `submit`
    /// returns without waiting for it.
    pub fn submit(&self, candidate: FileCandidate) -> TaskId {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut task = UploadTask::new(id, candidate.name.clone(), candidate.source_channel);
        let (state_tx, state_rx) = watch::channel(task.clone());
        self.tasks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(id, state_rx);
        let _ = self.updates.send(task.clone());

        if let Err(err) = validate(&candidate, &self.config.limits) {
            task.state = UploadState::Failed;
            task.error = Some(err.to_string());
            tracing::warn!(task = %id, file = %task.file_name, error = %err, "candidate rejected");
            let _ = state_tx.send(task.clone());
            let _ = self.updates.send(task);
            let _ = self.notices.send(Notice::error(err.to_string()));
            return id;
        }

        task.state = UploadState::Uploading;
        let _ = state_tx.send(task.clone());
        let _ = self.updates.send(task.clone());

        let key = self.ticker.storage_key(&candidate.name);
        tracing::debug!(task = %id, key = %key, size = candidate.size_bytes, "upload started");

        let handle = n0_future::task::spawn(run_upload(
            self.store.clone(),
            self.document.clone(),
            self.config.store.clone(),
            state_tx,
            self.updates.clone(),
            self.notices.clone(),
            task,
            key,
            candidate.blob,
        ));
        drop(handle);
        id
    }

    /// Current snapshot of a task.
    pub fn snapshot(&self, id: TaskId) -> Option<UploadTask> {
        self.tasks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(&id)
            .map(|rx| rx.borrow().clone())
    }

    /// Watch a task's state changes.
    pub fn subscribe(&self, id: TaskId) -> Option<watch::Receiver<UploadTask>> {
        self.tasks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(&id)
            .cloned()
    }

    /// Snapshots of every known task.
    pub fn tasks(&self) -> Vec<UploadTask> {
        self.tasks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .values()
            .map(|rx| rx.borrow().clone())
            .collect()
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_upload<S: AssetStore>(
    store: Arc<S>,
    document: Arc<Mutex<Document>>,
    options: StoreOptions,
    state_tx: watch::Sender<UploadTask>,
    updates: mpsc::UnboundedSender<UploadTask>,
    notices: mpsc::UnboundedSender<Notice>,
    mut task: UploadTask,
    key: String,
    blob: Bytes,
) {
    let progress_state = state_tx.clone();
    let progress_updates = updates.clone();
    let on_progress: ProgressFn = Box::new(move |loaded, total| {
        let percent = progress_percent(loaded, total);
        progress_state.send_modify(|t| t.progress_percent = percent);
        let _ = progress_updates.send(progress_state.borrow().clone());
    });

    let result = store
        .upload(
            &key,
            blob,
            UploadOptions {
                store: options,
                on_progress: Some(on_progress),
            },
        )
        .await;

    match result {
        Ok(stored) => {
            task.state = UploadState::Inserting;
            task.progress_percent = 100;
            let _ = state_tx.send(task.clone());
            let _ = updates.send(task.clone());

            let url = store.get_public_url(stored.key.as_str());
            tracing::debug!(task = %task.id, url = %url, "upload stored, inserting node");
            {
                // Cursor read at completion time, under the lock.
                let mut doc = document.lock().unwrap_or_else(|p| p.into_inner());
                let attrs = ImageAttrs::new(
                    url.as_str(),
                    task.file_name.as_str(),
                    task.file_name.as_str(),
                );
                doc.apply(Command::InsertNode(Block::Image(attrs)));
            }

            task.state = UploadState::Done;
            let _ = state_tx.send(task.clone());
            let _ = updates.send(task);
        }
        Err(err) => {
            task.state = UploadState::Failed;
            task.error = Some(err.to_string());
            tracing::warn!(task = %task.id, error = %err, "upload failed");
            let _ = state_tx.send(task.clone());
            let _ = updates.send(task.clone());
            let _ = notices.send(Notice::error(format!(
                "Failed to upload {}: {}",
                task.file_name, err
            )));
        }
    }
}

/// Integer percent, rounded half-up. A zero-length transfer is complete.
fn progress_percent(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((loaded.min(total) * 100 + total / 2) / total) as u8
}
