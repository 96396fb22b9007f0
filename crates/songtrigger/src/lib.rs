//! Client side of aisong: a trigger that fetches a generated song and
//! publishes it to a player and a download link.
//!
//! # Flow
//!
//! [`GenerationTrigger::activate`] moves the [`UiState`] to `Generating`,
//! disables the trigger, and issues one `GET` through a [`MidiEndpoint`].
//! On success the body becomes a [`ResourceHandle`] in a bounded
//! [`HandleRegistry`] and both the player and the download link are pointed
//! at it under an `ai-song-<epoch-millis>.mid` name. On failure the user
//! sees a single generic message while the caller gets the structured
//! [`GenerationError`]. Either way the trigger is re-enabled afterwards.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use songtrigger::{GenerationTrigger, RecordingSurface, TriggerOutcome};
//!
//! # async fn run() {
//! let config = songconf::ClientConfig::default();
//! let surface = Arc::new(RecordingSurface::new());
//! let trigger = GenerationTrigger::from_config(&config, surface.clone());
//!
//! if let TriggerOutcome::Ready(handle) = trigger.activate().await {
//!     let bytes = trigger.resolve(&handle).unwrap_or_default();
//!     println!("{} bytes at {}", bytes.len(), handle);
//! }
//! # }
//! ```

pub mod endpoint;
pub mod error;
pub mod handle;
pub mod naming;
pub mod state;
pub mod surface;
pub mod trigger;

pub use endpoint::{HttpEndpoint, MidiEndpoint};
pub use error::{GenerationError, GenerationErrorKind, TriggerError, FAILURE_MESSAGE};
pub use handle::{HandleRegistry, ResourceHandle, HANDLE_SCHEME};
pub use naming::{parse_stamp, Clock, DownloadNamer, SystemClock};
pub use state::{UiEvent, UiState};
pub use surface::{RecordingSurface, SurfaceChange, SurfaceSnapshot, TriggerSurface};
pub use trigger::{
    GenerationTrigger, TriggerOutcome, LABEL_BUSY, LABEL_IDLE, MIDI_MIME_TYPE, STATUS_BUSY,
    STATUS_FAILED, STATUS_READY,
};
