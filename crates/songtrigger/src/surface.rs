//! The UI the trigger drives.
//!
//! The trigger never looks anything up on its own; it is handed a surface
//! and only talks to it through these methods.

use std::sync::{Mutex, MutexGuard};

use crate::handle::ResourceHandle;

/// Trigger button, player, download link and status text.
pub trait TriggerSurface: Send + Sync {
    fn set_trigger_enabled(&self, enabled: bool);

    fn set_trigger_label(&self, label: &str);

    fn set_status(&self, text: &str);

    fn set_player_source(&self, handle: &ResourceHandle);

    /// Point the download link at `handle`, saved as `file_name`.
    fn set_download(&self, handle: &ResourceHandle, file_name: &str);

    /// Visual enabled state of the download link.
    fn set_download_enabled(&self, enabled: bool);
}

/// Current values of every element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurfaceSnapshot {
    pub trigger_enabled: bool,
    pub trigger_label: String,
    pub status: String,
    pub player_source: Option<String>,
    pub download_href: Option<String>,
    pub download_name: Option<String>,
    pub download_enabled: bool,
}

/// One call made on a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceChange {
    TriggerEnabled(bool),
    TriggerLabel(String),
    Status(String),
    PlayerSource(String),
    Download { href: String, file_name: String },
    DownloadEnabled(bool),
}

#[derive(Default)]
struct Recorded {
    snapshot: SurfaceSnapshot,
    history: Vec<SurfaceChange>,
}

/// In-memory surface that keeps the current values and every change.
#[derive(Default)]
pub struct RecordingSurface {
    inner: Mutex<Recorded>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> SurfaceSnapshot {
        self.inner().snapshot.clone()
    }

    pub fn history(&self) -> Vec<SurfaceChange> {
        self.inner().history.clone()
    }

    fn record(&self, change: SurfaceChange) {
        let mut inner = self.inner();
        let snapshot = &mut inner.snapshot;
        match &change {
            SurfaceChange::TriggerEnabled(enabled) => snapshot.trigger_enabled = *enabled,
            SurfaceChange::TriggerLabel(label) => snapshot.trigger_label = label.clone(),
            SurfaceChange::Status(text) => snapshot.status = text.clone(),
            SurfaceChange::PlayerSource(url) => snapshot.player_source = Some(url.clone()),
            SurfaceChange::Download { href, file_name } => {
                snapshot.download_href = Some(href.clone());
                snapshot.download_name = Some(file_name.clone());
            }
            SurfaceChange::DownloadEnabled(enabled) => snapshot.download_enabled = *enabled,
        }
        inner.history.push(change);
    }
}

impl TriggerSurface for RecordingSurface {
    fn set_trigger_enabled(&self, enabled: bool) {
        self.record(SurfaceChange::TriggerEnabled(enabled));
    }

    fn set_trigger_label(&self, label: &str) {
        self.record(SurfaceChange::TriggerLabel(label.to_string()));
    }

    fn set_status(&self, text: &str) {
        self.record(SurfaceChange::Status(text.to_string()));
    }

    fn set_player_source(&self, handle: &ResourceHandle) {
        self.record(SurfaceChange::PlayerSource(handle.url().to_string()));
    }

    fn set_download(&self, handle: &ResourceHandle, file_name: &str) {
        self.record(SurfaceChange::Download {
            href: handle.url().to_string(),
            file_name: file_name.to_string(),
        });
    }

    fn set_download_enabled(&self, enabled: bool) {
        self.record(SurfaceChange::DownloadEnabled(enabled));
    }
}
