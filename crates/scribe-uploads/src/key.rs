//! Storage key derivation.
//!
//! Keys are `{millis}-{sanitized name}`: a monotonic millisecond timestamp
//! keeps concurrent uploads of identically-named files from colliding, and
//! sanitization keeps the key safe for URL paths and object-store APIs.

use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

use regex_lite::Regex;

/// Everything that is not alphanumeric or a dot gets replaced.
static SANITIZE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9.]").unwrap());

/// Replace unsafe filename characters with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    SANITIZE_REGEX.replace_all(name, "_").into_owned()
}

/// Issues strictly increasing millisecond timestamps.
///
/// Wall-clock time can repeat within a millisecond (or step backwards); the
/// ticker bumps past the last issued value so every key is unique even when
/// several uploads start in the same instant.
#[derive(Debug, Default)]
pub struct KeyTicker {
    last_ms: AtomicU64,
}

impl KeyTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next unique millisecond value.
    pub fn next_millis(&self) -> u64 {
        let now = web_time::SystemTime::now()
            .duration_since(web_time::SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let mut prev = self.last_ms.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self.last_ms.compare_exchange_weak(
                prev,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }

    /// Derive the storage key for a filename.
    pub fn storage_key(&self, file_name: &str) -> String {
        format!("{}-{}", self.next_millis(), sanitize_file_name(file_name))
    }
}
