//! Locally addressable handles for fetched songs.
//!
//! A [`ResourceHandle`] is what the player and the download link point at.
//! The bytes live in a [`HandleRegistry`], which keeps at most `max_live`
//! entries and releases the oldest when a new one would exceed the bound.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;

/// URL prefix of every handle.
pub const HANDLE_SCHEME: &str = "blob:aisong/";

/// Reference to bytes held by a [`HandleRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    url: String,
    mime_type: String,
    size: usize,
    digest: String,
}

impl ResourceHandle {
    /// `blob:aisong/<uuid>`, unique per created handle.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// BLAKE3 of the content, truncated to 128 bits, as hex.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

fn content_digest(data: &[u8]) -> String {
    hex::encode(&blake3::hash(data).as_bytes()[..16])
}

struct Entry {
    handle: ResourceHandle,
    bytes: Bytes,
}

/// Bounded set of live handles, oldest first.
pub struct HandleRegistry {
    max_live: usize,
    entries: Mutex<VecDeque<Entry>>,
}

impl HandleRegistry {
    /// A `max_live` of zero is treated as one.
    pub fn new(max_live: usize) -> Self {
        Self {
            max_live: max_live.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub fn max_live(&self) -> usize {
        self.max_live
    }

    fn entries(&self) -> MutexGuard<'_, VecDeque<Entry>> {
        // Entries are only ever pushed or removed whole.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register `bytes` and return a fresh handle.
    ///
    /// When the registry is full the oldest handles are released first, so
    /// with the default bound of one the previous song is gone before the
    /// new handle exists.
    pub fn create(&self, bytes: Bytes, mime_type: &str) -> ResourceHandle {
        let handle = ResourceHandle {
            url: format!("{}{}", HANDLE_SCHEME, uuid::Uuid::new_v4()),
            mime_type: mime_type.to_string(),
            size: bytes.len(),
            digest: content_digest(&bytes),
        };

        let mut entries = self.entries();
        while entries.len() >= self.max_live {
            if let Some(evicted) = entries.pop_front() {
                tracing::debug!(handle = %evicted.handle, "releasing oldest handle");
            }
        }
        entries.push_back(Entry {
            handle: handle.clone(),
            bytes,
        });
        tracing::debug!(handle = %handle, size = handle.size, live = entries.len(), "handle created");

        handle
    }

    pub fn resolve(&self, handle: &ResourceHandle) -> Option<Bytes> {
        self.resolve_url(handle.url())
    }

    /// Look a handle up by URL, as a player or link would.
    pub fn resolve_url(&self, url: &str) -> Option<Bytes> {
        self.entries()
            .iter()
            .find(|e| e.handle.url == url)
            .map(|e| e.bytes.clone())
    }

    /// Release a handle. Returns false if it was already gone.
    pub fn release(&self, handle: &ResourceHandle) -> bool {
        let mut entries = self.entries();
        match entries.iter().position(|e| e.handle.url == handle.url) {
            Some(idx) => {
                entries.remove(idx);
                tracing::debug!(handle = %handle, "handle released");
                true
            }
            None => false,
        }
    }

    pub fn live_count(&self) -> usize {
        self.entries().len()
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new(1)
    }
}
