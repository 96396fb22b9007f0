//! Song generation for aisong.
//!
//! Composes a sequence of pitch and duration tokens one step at a time and
//! renders the result as a Standard MIDI File.
//!
//! The pipeline:
//!
//! 1. [`Corpus`] loads the token corpus and builds the pitch and duration
//!    vocabularies.
//! 2. A [`SequenceModel`] scores the next token of each head given the
//!    preceding window. [`MarkovModel`] is trained directly from the corpus.
//! 3. [`Generator`] seeds the window from a random slice of the corpus,
//!    scales the scores by temperature, and draws each token with nucleus
//!    sampling.
//! 4. [`render_midi`] turns the tokens into notes and chords.
//!
//! ```rust,no_run
//! use songgen::Generator;
//!
//! let config = songconf::GenerationConfig::default();
//! let generator = Generator::from_config(&config)?;
//! let song = generator.generate(&mut rand::thread_rng())?;
//! std::fs::write("song.mid", &song.midi.bytes)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod corpus;
pub mod error;
pub mod generator;
pub mod midi;
pub mod model;
pub mod sampling;
pub mod token;

pub use corpus::{Corpus, CorpusFile, Vocab};
pub use error::GenerateError;
pub use generator::{write_song, GeneratedSong, GenerationParams, Generator, Song};
pub use midi::{render_midi, MidiOptions, RenderedMidi, MIDI_MIME_TYPE};
pub use model::{Logits, MarkovModel, SequenceModel};
pub use sampling::{apply_temperature, nucleus_sample, softmax};
pub use token::{parse_duration, parse_pitch, PitchToken, TokenError};
