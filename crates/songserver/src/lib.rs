//! HTTP surface for aisong.
//!
//! Serves the player page and composes a new MIDI file for every
//! `GET /generate-midi`.

pub mod serve;
pub mod telemetry;
pub mod web;

pub use web::{router, AppState, DOWNLOAD_NAME};
