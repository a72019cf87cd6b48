//! The asset store gateway boundary.
//!
//! [`AssetStore`] is the only thing this core knows about the remote object
//! store: push bytes under a key, get a public URL back. The store's own
//! protocol (auth, retries, wire format) stays behind the trait.
//! [`MemoryStore`] is the in-process implementation used by tests and local
//! previews.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use smol_str::SmolStr;
use url::Url;

use scribe_common::{StoreError, StoreOptions};

/// Progress callback: `(bytes transferred, total bytes)`.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Per-upload options handed to the gateway.
pub struct UploadOptions {
    pub store: StoreOptions,
    /// Invoked on every transfer progress event.
    pub on_progress: Option<ProgressFn>,
}

/// Receipt for a stored object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub key: SmolStr,
    pub size_bytes: u64,
}

/// Remote object store able to persist blobs and serve them publicly.
pub trait AssetStore: Send + Sync + 'static {
    /// Upload bytes under a key. Emits progress through
    /// `options.on_progress` while the transfer runs.
    fn upload(
        &self,
        key: &str,
        blob: Bytes,
        options: UploadOptions,
    ) -> impl Future<Output = Result<StoredObject, StoreError>> + Send;

    /// Public URL a stored object is served under.
    fn get_public_url(&self, key: &str) -> Url;
}

/// In-memory asset store.
///
/// Emits progress in fixed-size steps and supports two failure modes for
/// exercising the pipeline: scripted errors and stalling (an upload that
/// never resolves, for observing the no-timeout behavior).
pub struct MemoryStore {
    base_url: Url,
    objects: Mutex<HashMap<SmolStr, Bytes>>,
    fail_with: Mutex<Option<StoreError>>,
    stalled: AtomicBool,
    progress_steps: u64,
}

impl MemoryStore {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            objects: Mutex::new(HashMap::new()),
            fail_with: Mutex::new(None),
            stalled: AtomicBool::new(false),
            progress_steps: 4,
        }
    }

    /// Fail the next uploads with the given error.
    pub fn fail_with(&self, err: StoreError) {
        *self.fail_with.lock().unwrap_or_else(|p| p.into_inner()) = Some(err);
    }

    /// When stalled, uploads never resolve.
    pub fn set_stalled(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::Relaxed);
    }

    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(key)
            .cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .len()
    }
}

impl AssetStore for MemoryStore {
    async fn upload(
        &self,
        key: &str,
        blob: Bytes,
        options: UploadOptions,
    ) -> Result<StoredObject, StoreError> {
        if self.stalled.load(Ordering::Relaxed) {
            std::future::pending::<()>().await;
        }
        if let Some(err) = self
            .fail_with
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
        {
            return Err(err);
        }

        let key = SmolStr::from(key);
        {
            let objects = self.objects.lock().unwrap_or_else(|p| p.into_inner());
            if !options.store.overwrite && objects.contains_key(&key) {
                return Err(StoreError::Rejected(format!(
                    "object '{key}' already exists"
                )));
            }
        }

        let total = blob.len() as u64;
        if let Some(on_progress) = &options.on_progress {
            for step in 1..=self.progress_steps {
                on_progress(total * step / self.progress_steps, total);
            }
        }

        let size_bytes = total;
        self.objects
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(key.clone(), blob);
        Ok(StoredObject { key, size_bytes })
    }

    fn get_public_url(&self, key: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(key);
        }
        url
    }
}
