//! One button, one request, one song.

use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;

use crate::endpoint::{HttpEndpoint, MidiEndpoint};
use crate::error::{GenerationError, FAILURE_MESSAGE};
use crate::handle::{HandleRegistry, ResourceHandle};
use crate::naming::DownloadNamer;
use crate::state::{UiEvent, UiState};
use crate::surface::TriggerSurface;

pub const MIDI_MIME_TYPE: &str = "audio/midi";

pub const LABEL_IDLE: &str = "Generate New Song";
pub const LABEL_BUSY: &str = "Generating...";
pub const STATUS_BUSY: &str = "Consulting the AI model...";
pub const STATUS_READY: &str = "Song generated successfully!";
pub const STATUS_FAILED: &str = FAILURE_MESSAGE;

/// How an activation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The song is published under this handle.
    Ready(ResourceHandle),
    /// The request failed. The user saw only the generic status message.
    Failed(GenerationError),
    /// A request was already in flight; nothing was sent.
    Ignored,
}

#[derive(Default)]
struct Inner {
    state: UiState,
    current: Option<ResourceHandle>,
}

/// Binds a trigger on a [`TriggerSurface`] to a [`MidiEndpoint`].
pub struct GenerationTrigger {
    endpoint: Arc<dyn MidiEndpoint>,
    surface: Arc<dyn TriggerSurface>,
    registry: Arc<HandleRegistry>,
    namer: DownloadNamer,
    inner: Mutex<Inner>,
}

impl GenerationTrigger {
    /// Wire up the surface in its idle state: trigger enabled with the idle
    /// label, download disabled.
    pub fn new(endpoint: Arc<dyn MidiEndpoint>, surface: Arc<dyn TriggerSurface>) -> Self {
        surface.set_trigger_enabled(true);
        surface.set_trigger_label(LABEL_IDLE);
        surface.set_download_enabled(false);

        Self {
            endpoint,
            surface,
            registry: Arc::new(HandleRegistry::default()),
            namer: DownloadNamer::default(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// HTTP endpoint and handle bound taken from the client config.
    pub fn from_config(config: &songconf::ClientConfig, surface: Arc<dyn TriggerSurface>) -> Self {
        Self::new(Arc::new(HttpEndpoint::from_config(config)), surface)
            .with_registry(Arc::new(HandleRegistry::new(config.max_live_handles)))
    }

    pub fn with_registry(mut self, registry: Arc<HandleRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_namer(mut self, namer: DownloadNamer) -> Self {
        self.namer = namer;
        self
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> UiState {
        self.inner().state
    }

    /// The handle the player and download link point at, if any.
    pub fn current_handle(&self) -> Option<ResourceHandle> {
        self.inner().current.clone()
    }

    pub fn resolve(&self, handle: &ResourceHandle) -> Option<Bytes> {
        self.registry.resolve(handle)
    }

    pub fn registry(&self) -> &Arc<HandleRegistry> {
        &self.registry
    }

    /// Run one generation cycle.
    ///
    /// Returns [`TriggerOutcome::Ignored`] without touching the surface if a
    /// request is already in flight. Otherwise the trigger is disabled for
    /// the duration of the request and re-enabled afterwards, including when
    /// the returned future is dropped before completion.
    #[tracing::instrument(skip(self))]
    pub async fn activate(&self) -> TriggerOutcome {
        {
            let mut inner = self.inner();
            match inner.state.transition(UiEvent::Trigger) {
                Ok(next) => inner.state = next,
                Err(e) => {
                    tracing::debug!(error = %e, "activation ignored");
                    return TriggerOutcome::Ignored;
                }
            }
        }

        let _restore = RestoreOnExit { trigger: self };

        self.surface.set_trigger_enabled(false);
        self.surface.set_trigger_label(LABEL_BUSY);
        self.surface.set_status(STATUS_BUSY);
        self.surface.set_download_enabled(false);

        match self.endpoint.fetch().await {
            Ok(bytes) => {
                let handle = self.publish(bytes);
                TriggerOutcome::Ready(handle)
            }
            Err(err) => {
                tracing::warn!(error = %err, "song generation failed");
                self.surface.set_status(err.user_message());
                self.finish(UiEvent::Failed);
                TriggerOutcome::Failed(err)
            }
        }
    }

    fn publish(&self, bytes: Bytes) -> ResourceHandle {
        let handle = self.registry.create(bytes, MIDI_MIME_TYPE);
        let file_name = self.namer.next_name();

        self.surface.set_player_source(&handle);
        self.surface.set_download(&handle, &file_name);
        self.surface.set_download_enabled(true);
        self.surface.set_status(STATUS_READY);

        tracing::info!(
            handle = %handle,
            size = handle.size(),
            digest = handle.digest(),
            file_name = %file_name,
            "song ready"
        );

        let mut inner = self.inner();
        inner.current = Some(handle.clone());
        Self::advance(&mut inner, UiEvent::Succeeded);
        handle
    }

    fn finish(&self, event: UiEvent) {
        Self::advance(&mut self.inner(), event);
    }

    fn advance(inner: &mut Inner, event: UiEvent) {
        match inner.state.transition(event) {
            Ok(next) => inner.state = next,
            Err(e) => tracing::error!(error = %e, "trigger state out of step"),
        }
    }
}

/// Re-enables the trigger however `activate` exits. A cycle abandoned
/// mid-request counts as failed.
struct RestoreOnExit<'a> {
    trigger: &'a GenerationTrigger,
}

impl Drop for RestoreOnExit<'_> {
    fn drop(&mut self) {
        let trigger = self.trigger;
        let abandoned = {
            let mut inner = trigger.inner();
            let abandoned = inner.state.is_busy();
            if abandoned {
                GenerationTrigger::advance(&mut inner, UiEvent::Failed);
            }
            abandoned
        };
        if abandoned {
            tracing::warn!("generation abandoned before completion");
            trigger.surface.set_status(STATUS_FAILED);
        }
        trigger.surface.set_trigger_enabled(true);
        trigger.surface.set_trigger_label(LABEL_IDLE);
    }
}
