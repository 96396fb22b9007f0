use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading a corpus or composing a song.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("corpus file {path} not found; prepare the corpus before generating")]
    CorpusNotFound { path: PathBuf },

    #[error("failed to read corpus {path}: {source}")]
    CorpusRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse corpus {path}: {source}")]
    CorpusParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid corpus: {0}")]
    InvalidCorpus(String),

    #[error("corpus has {len} tokens but seeding needs more than {needed}")]
    CorpusTooShort { len: usize, needed: usize },

    #[error("{head} head returned {got} scores for a vocabulary of {expected}")]
    ModelShape {
        head: &'static str,
        got: usize,
        expected: usize,
    },

    #[error("failed to encode MIDI: {0}")]
    Midi(String),

    #[error("failed to write {path}: {source}")]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },
}
