//! Generation configuration - how the server composes a song.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::PathBuf;

use crate::ConfigError;

/// Parameters for the token sampler and MIDI writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// JSON corpus of pitch/duration tokens the model is trained on.
    /// Default: output/processed_midi.json
    #[serde(default = "GenerationConfig::default_corpus_file")]
    pub corpus_file: PathBuf,

    /// Where the last generated song is also written. An empty string
    /// disables it.
    /// Default: output/output.mid
    #[serde(
        default = "GenerationConfig::default_output_file",
        with = "optional_path"
    )]
    pub output_file: Option<PathBuf>,

    /// Number of notes/chords per song.
    #[serde(default = "GenerationConfig::default_num_notes")]
    pub num_notes: usize,

    /// Length of the seed window taken from the corpus.
    #[serde(default = "GenerationConfig::default_sequence_length")]
    pub sequence_length: usize,

    /// Pitch temperature. Higher is riskier.
    #[serde(default = "GenerationConfig::default_temperature_pitch")]
    pub temperature_pitch: f32,

    /// Duration temperature. Higher is less repetitive rhythm.
    #[serde(default = "GenerationConfig::default_temperature_dur")]
    pub temperature_dur: f32,

    /// Nucleus sampling threshold.
    #[serde(default = "GenerationConfig::default_top_p")]
    pub top_p: f32,

    /// How many previous tokens the sequence model conditions on.
    #[serde(default = "GenerationConfig::default_model_order")]
    pub model_order: usize,

    #[serde(default = "GenerationConfig::default_ticks_per_quarter")]
    pub ticks_per_quarter: u16,

    #[serde(default = "GenerationConfig::default_tempo_bpm")]
    pub tempo_bpm: u32,

    #[serde(default = "GenerationConfig::default_velocity")]
    pub velocity: u8,
}

/// `Option<PathBuf>` as a TOML string, with `""` standing for `None`.
mod optional_path {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<PathBuf>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(path) => path.serialize(s),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<PathBuf>, D::Error> {
        let path = PathBuf::deserialize(d)?;
        Ok(if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        })
    }
}

impl GenerationConfig {
    fn default_corpus_file() -> PathBuf {
        PathBuf::from("output/processed_midi.json")
    }

    fn default_output_file() -> Option<PathBuf> {
        Some(PathBuf::from("output/output.mid"))
    }

    fn default_num_notes() -> usize {
        64
    }

    fn default_sequence_length() -> usize {
        128
    }

    fn default_temperature_pitch() -> f32 {
        1.0
    }

    fn default_temperature_dur() -> f32 {
        1.1
    }

    fn default_top_p() -> f32 {
        0.9
    }

    fn default_model_order() -> usize {
        2
    }

    fn default_ticks_per_quarter() -> u16 {
        480
    }

    fn default_tempo_bpm() -> u32 {
        120
    }

    fn default_velocity() -> u8 {
        90
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "generation.top_p",
                message: format!("{} is outside (0, 1]", self.top_p),
            });
        }
        if !(self.temperature_pitch > 0.0) {
            return Err(ConfigError::Invalid {
                field: "generation.temperature_pitch",
                message: format!("{} must be positive", self.temperature_pitch),
            });
        }
        if !(self.temperature_dur > 0.0) {
            return Err(ConfigError::Invalid {
                field: "generation.temperature_dur",
                message: format!("{} must be positive", self.temperature_dur),
            });
        }
        if self.num_notes == 0 {
            return Err(ConfigError::Invalid {
                field: "generation.num_notes",
                message: "must be at least 1".into(),
            });
        }
        if self.sequence_length == 0 {
            return Err(ConfigError::Invalid {
                field: "generation.sequence_length",
                message: "must be at least 1".into(),
            });
        }
        if self.model_order == 0 {
            return Err(ConfigError::Invalid {
                field: "generation.model_order",
                message: "must be at least 1".into(),
            });
        }
        if self.ticks_per_quarter == 0 || self.ticks_per_quarter > 0x7fff {
            return Err(ConfigError::Invalid {
                field: "generation.ticks_per_quarter",
                message: format!("{} is outside 1..=32767", self.ticks_per_quarter),
            });
        }
        if self.tempo_bpm == 0 {
            return Err(ConfigError::Invalid {
                field: "generation.tempo_bpm",
                message: "must be at least 1".into(),
            });
        }
        if self.velocity > 127 {
            return Err(ConfigError::Invalid {
                field: "generation.velocity",
                message: format!("{} is above 127", self.velocity),
            });
        }
        Ok(())
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            corpus_file: Self::default_corpus_file(),
            output_file: Self::default_output_file(),
            num_notes: Self::default_num_notes(),
            sequence_length: Self::default_sequence_length(),
            temperature_pitch: Self::default_temperature_pitch(),
            temperature_dur: Self::default_temperature_dur(),
            top_p: Self::default_top_p(),
            model_order: Self::default_model_order(),
            ticks_per_quarter: Self::default_ticks_per_quarter(),
            tempo_bpm: Self::default_tempo_bpm(),
            velocity: Self::default_velocity(),
        }
    }
}
