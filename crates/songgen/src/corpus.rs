//! Token corpus and vocabularies.
//!
//! The corpus file is JSON with two parallel token lists:
//!
//! ```json
//! { "pitches": ["C4", "E4.G4", "D4"], "durs": ["1.0", "0.5", "1/3"] }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::error::GenerateError;

/// On-disk corpus layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusFile {
    pub pitches: Vec<String>,
    pub durs: Vec<String>,
}

/// Bidirectional token ↔ id mapping. Ids follow sorted token order so the
/// same corpus always yields the same ids.
#[derive(Debug, Clone, Default)]
pub struct Vocab {
    tokens: Vec<String>,
    ids: HashMap<String, usize>,
}

impl Vocab {
    pub fn from_tokens<'a>(tokens: impl IntoIterator<Item = &'a String>) -> Self {
        let tokens: Vec<String> = tokens
            .into_iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let ids = tokens
            .iter()
            .enumerate()
            .map(|(id, token)| (token.clone(), id))
            .collect();
        Self { tokens, ids }
    }

    pub fn id(&self, token: &str) -> Option<usize> {
        self.ids.get(token).copied()
    }

    pub fn token(&self, id: usize) -> Option<&str> {
        self.tokens.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// A loaded corpus: vocabularies plus the id sequences they encode.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub pitch_vocab: Vocab,
    pub dur_vocab: Vocab,
    pub pitch_ids: Vec<usize>,
    pub dur_ids: Vec<usize>,
}

impl Corpus {
    /// Load and index a corpus file.
    #[tracing::instrument(skip(path), fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, GenerateError> {
        if !path.exists() {
            return Err(GenerateError::CorpusNotFound {
                path: path.to_path_buf(),
            });
        }

        let contents = std::fs::read(path).map_err(|source| GenerateError::CorpusRead {
            path: path.to_path_buf(),
            source,
        })?;
        let file: CorpusFile =
            serde_json::from_slice(&contents).map_err(|source| GenerateError::CorpusParse {
                path: path.to_path_buf(),
                source,
            })?;

        let corpus = Self::from_file(file)?;
        tracing::info!(
            tokens = corpus.len(),
            pitch_vocab = corpus.pitch_vocab.len(),
            dur_vocab = corpus.dur_vocab.len(),
            "corpus loaded"
        );
        Ok(corpus)
    }

    pub fn from_file(file: CorpusFile) -> Result<Self, GenerateError> {
        if file.pitches.len() != file.durs.len() {
            return Err(GenerateError::InvalidCorpus(format!(
                "{} pitch tokens but {} duration tokens",
                file.pitches.len(),
                file.durs.len()
            )));
        }
        if file.pitches.is_empty() {
            return Err(GenerateError::InvalidCorpus("no tokens".into()));
        }

        let pitch_vocab = Vocab::from_tokens(&file.pitches);
        let dur_vocab = Vocab::from_tokens(&file.durs);

        // Every token is in its vocabulary by construction.
        let pitch_ids = file
            .pitches
            .iter()
            .filter_map(|p| pitch_vocab.id(p))
            .collect();
        let dur_ids = file.durs.iter().filter_map(|d| dur_vocab.id(d)).collect();

        Ok(Self {
            pitch_vocab,
            dur_vocab,
            pitch_ids,
            dur_ids,
        })
    }

    /// Number of (pitch, duration) steps.
    pub fn len(&self) -> usize {
        self.pitch_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pitch_ids.is_empty()
    }
}
