//! The generation loop: seed, predict, sample, slide.

use rand::Rng;
use std::path::Path;
use std::sync::Arc;

use crate::corpus::Corpus;
use crate::error::GenerateError;
use crate::midi::{render_midi, MidiOptions, RenderedMidi};
use crate::model::{MarkovModel, SequenceModel};
use crate::sampling::{apply_temperature, nucleus_sample};

/// Sampling parameters for one song.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub num_notes: usize,
    pub sequence_length: usize,
    pub temperature_pitch: f32,
    pub temperature_dur: f32,
    pub top_p: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::from(&songconf::GenerationConfig::default())
    }
}

impl From<&songconf::GenerationConfig> for GenerationParams {
    fn from(config: &songconf::GenerationConfig) -> Self {
        Self {
            num_notes: config.num_notes,
            sequence_length: config.sequence_length,
            temperature_pitch: config.temperature_pitch,
            temperature_dur: config.temperature_dur,
            top_p: config.top_p,
        }
    }
}

/// Decoded tokens of a generated song.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedSong {
    pub pitches: Vec<String>,
    pub durs: Vec<String>,
}

/// Tokens plus their MIDI rendering.
#[derive(Debug, Clone)]
pub struct Song {
    pub tokens: GeneratedSong,
    pub midi: RenderedMidi,
}

/// Composes songs from a corpus and a sequence model.
///
/// Shared read-only across requests; each call brings its own RNG.
pub struct Generator {
    corpus: Arc<Corpus>,
    model: Arc<dyn SequenceModel>,
    params: GenerationParams,
    midi: MidiOptions,
}

impl Generator {
    pub fn new(
        corpus: Arc<Corpus>,
        model: Arc<dyn SequenceModel>,
        params: GenerationParams,
        midi: MidiOptions,
    ) -> Result<Self, GenerateError> {
        if model.pitch_vocab_size() != corpus.pitch_vocab.len() {
            return Err(GenerateError::ModelShape {
                head: "pitch",
                got: model.pitch_vocab_size(),
                expected: corpus.pitch_vocab.len(),
            });
        }
        if model.dur_vocab_size() != corpus.dur_vocab.len() {
            return Err(GenerateError::ModelShape {
                head: "duration",
                got: model.dur_vocab_size(),
                expected: corpus.dur_vocab.len(),
            });
        }

        Ok(Self {
            corpus,
            model,
            params,
            midi,
        })
    }

    /// Load the configured corpus and train a Markov model on it.
    pub fn from_config(config: &songconf::GenerationConfig) -> Result<Self, GenerateError> {
        let corpus = Arc::new(Corpus::load(&config.corpus_file)?);
        let model = Arc::new(MarkovModel::train(&corpus, config.model_order));
        Self::new(corpus, model, config.into(), config.into())
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// Sample `num_notes` token pairs.
    #[tracing::instrument(skip_all, fields(model = self.model.name(), notes = self.params.num_notes))]
    pub fn compose<R: Rng>(&self, rng: &mut R) -> Result<GeneratedSong, GenerateError> {
        let len = self.corpus.len();
        let window = self.params.sequence_length;
        // The start index is drawn from [0, len - window - 1).
        if len <= window + 1 {
            return Err(GenerateError::CorpusTooShort {
                len,
                needed: window + 1,
            });
        }
        let start = rng.gen_range(0..len - window - 1);
        tracing::debug!(start, window, "seeding from corpus");

        let mut pitch_ctx = self.corpus.pitch_ids[start..start + window].to_vec();
        let mut dur_ctx = self.corpus.dur_ids[start..start + window].to_vec();
        let mut song = GeneratedSong::default();

        for _ in 0..self.params.num_notes {
            let mut logits = self.model.predict(&pitch_ctx, &dur_ctx);
            self.check_shape(&logits.pitch, &logits.dur)?;

            apply_temperature(&mut logits.pitch, self.params.temperature_pitch);
            apply_temperature(&mut logits.dur, self.params.temperature_dur);

            let (Some(p), Some(d)) = (
                nucleus_sample(&logits.pitch, self.params.top_p, rng),
                nucleus_sample(&logits.dur, self.params.top_p, rng),
            ) else {
                break;
            };

            if let (Some(pitch), Some(dur)) =
                (self.corpus.pitch_vocab.token(p), self.corpus.dur_vocab.token(d))
            {
                song.pitches.push(pitch.to_string());
                song.durs.push(dur.to_string());
            }

            pitch_ctx.remove(0);
            pitch_ctx.push(p);
            dur_ctx.remove(0);
            dur_ctx.push(d);
        }

        Ok(song)
    }

    /// Compose a song and render it to MIDI.
    pub fn generate<R: Rng>(&self, rng: &mut R) -> Result<Song, GenerateError> {
        let tokens = self.compose(rng)?;
        let midi = render_midi(&tokens.pitches, &tokens.durs, &self.midi)?;
        tracing::info!(
            elements = midi.elements,
            skipped = midi.skipped,
            bytes = midi.bytes.len(),
            "song generated"
        );
        Ok(Song { tokens, midi })
    }

    fn check_shape(&self, pitch: &[f32], dur: &[f32]) -> Result<(), GenerateError> {
        if pitch.len() != self.corpus.pitch_vocab.len() {
            return Err(GenerateError::ModelShape {
                head: "pitch",
                got: pitch.len(),
                expected: self.corpus.pitch_vocab.len(),
            });
        }
        if dur.len() != self.corpus.dur_vocab.len() {
            return Err(GenerateError::ModelShape {
                head: "duration",
                got: dur.len(),
                expected: self.corpus.dur_vocab.len(),
            });
        }
        Ok(())
    }
}

/// Write rendered MIDI to `path`, creating parent directories.
pub fn write_song(path: &Path, bytes: &[u8]) -> Result<(), GenerateError> {
    let output_err = |source| GenerateError::Output {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(output_err)?;
    }
    std::fs::write(path, bytes).map_err(output_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusFile;
    use crate::model::Logits;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scale_corpus(repeats: usize) -> Corpus {
        let pitches = ["C4", "D4", "E4", "F4", "G4", "E4.G4"];
        let durs = ["1.0", "0.5", "0.5", "1/3", "1.0", "2.0"];
        let mut file = CorpusFile::default();
        for _ in 0..repeats {
            file.pitches.extend(pitches.iter().map(|s| s.to_string()));
            file.durs.extend(durs.iter().map(|s| s.to_string()));
        }
        Corpus::from_file(file).unwrap()
    }

    fn params(num_notes: usize, sequence_length: usize) -> GenerationParams {
        GenerationParams {
            num_notes,
            sequence_length,
            ..Default::default()
        }
    }

    fn markov_generator(corpus: Corpus, params: GenerationParams) -> Generator {
        let corpus = Arc::new(corpus);
        let model = Arc::new(MarkovModel::train(&corpus, 2));
        Generator::new(corpus, model, params, MidiOptions::default()).unwrap()
    }

    #[test]
    fn composes_requested_number_of_notes() {
        let generator = markov_generator(scale_corpus(10), params(16, 8));
        let mut rng = StdRng::seed_from_u64(11);
        let song = generator.compose(&mut rng).unwrap();
        assert_eq!(song.pitches.len(), 16);
        assert_eq!(song.durs.len(), 16);
        for p in &song.pitches {
            assert!(generator.corpus().pitch_vocab.id(p).is_some());
        }
    }

    #[test]
    fn same_seed_same_song() {
        let generator = markov_generator(scale_corpus(10), params(24, 8));
        let a = generator.compose(&mut StdRng::seed_from_u64(5)).unwrap();
        let b = generator.compose(&mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn corpus_must_exceed_window() {
        // 6 tokens, window 5: needs more than 6.
        let generator = markov_generator(scale_corpus(1), params(4, 5));
        let err = generator
            .compose(&mut StdRng::seed_from_u64(1))
            .unwrap_err();
        assert!(matches!(err, GenerateError::CorpusTooShort { len: 6, needed: 6 }));

        let generator = markov_generator(scale_corpus(1), params(4, 4));
        assert!(generator.compose(&mut StdRng::seed_from_u64(1)).is_ok());
    }

    #[test]
    fn generate_renders_midi() {
        let generator = markov_generator(scale_corpus(10), params(8, 4));
        let song = generator.generate(&mut StdRng::seed_from_u64(9)).unwrap();
        assert!(song.midi.bytes.starts_with(b"MThd"));
        assert_eq!(song.midi.elements + song.midi.skipped, 8);
        assert_eq!(song.midi.skipped, 0);
    }

    struct BrokenModel;

    impl SequenceModel for BrokenModel {
        fn name(&self) -> &str {
            "broken"
        }
        fn pitch_vocab_size(&self) -> usize {
            6
        }
        fn dur_vocab_size(&self) -> usize {
            4
        }
        fn predict(&self, _: &[usize], _: &[usize]) -> Logits {
            Logits {
                pitch: vec![0.0; 2],
                dur: vec![0.0; 4],
            }
        }
    }

    #[test]
    fn model_shape_is_checked() {
        let corpus = Arc::new(scale_corpus(4));
        let generator = Generator::new(
            corpus,
            Arc::new(BrokenModel),
            params(4, 4),
            MidiOptions::default(),
        )
        .unwrap();
        let err = generator
            .compose(&mut StdRng::seed_from_u64(2))
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::ModelShape { head: "pitch", got: 2, expected: 6 }
        ));
    }

    #[test]
    fn mismatched_model_is_rejected_up_front() {
        let corpus = Arc::new(scale_corpus(4));
        let tiny = Corpus::from_file(CorpusFile {
            pitches: vec!["C4".into()],
            durs: vec!["1.0".into()],
        })
        .unwrap();
        let model = Arc::new(MarkovModel::train(&tiny, 1));

        let result = Generator::new(corpus, model, params(4, 4), MidiOptions::default());
        assert!(matches!(result, Err(GenerateError::ModelShape { head: "pitch", .. })));
    }

    #[test]
    fn write_song_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output/nested/song.mid");
        write_song(&path, b"MThd").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"MThd");
    }
}
