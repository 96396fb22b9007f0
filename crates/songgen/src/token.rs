//! Pitch and duration token parsing.
//!
//! Pitch tokens are note names (`C4`, `F#3`, `E-5`, `Bb2`) or chords whose
//! members are joined by `.` (`E4.G4.B4`, `0.4.7`). A bare integer below 12
//! inside a chord is a pitch class in octave 4; anything from 12 up is a MIDI
//! key. Duration tokens are quarter lengths written as decimals (`0.5`) or
//! fractions (`1/3`).

use thiserror::Error;
use winnow::combinator::repeat;
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

type PResult<T> = winnow::ModalResult<T>;

const DEFAULT_OCTAVE: i32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("empty token")]
    Empty,

    #[error("unparseable pitch {0:?}")]
    Pitch(String),

    #[error("pitch {token:?} maps to key {key}, outside 0..=127")]
    OutOfRange { token: String, key: i32 },

    #[error("unparseable duration {0:?}")]
    Duration(String),

    #[error("duration {0:?} is not a positive length")]
    NonPositiveDuration(String),
}

/// A decoded pitch token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PitchToken {
    Note(u8),
    Chord(Vec<u8>),
}

impl PitchToken {
    /// MIDI keys sounded by this token, lowest first, without duplicates.
    pub fn keys(&self) -> Vec<u8> {
        match self {
            PitchToken::Note(key) => vec![*key],
            PitchToken::Chord(keys) => {
                let mut keys = keys.clone();
                keys.sort_unstable();
                keys.dedup();
                keys
            }
        }
    }
}

/// Letter, accidentals, octave digits.
fn note_parts<'i>(input: &mut &'i str) -> PResult<(char, Vec<char>, &'i str)> {
    (
        one_of(|c: char| matches!(c.to_ascii_uppercase(), 'A'..='G')),
        repeat(0.., one_of(['#', '-', 'b'])),
        take_while(0.., |c: char| c.is_ascii_digit()),
    )
        .parse_next(input)
}

fn pitch_class(letter: char) -> i32 {
    match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        _ => 11,
    }
}

fn parse_note_name(token: &str) -> Result<u8, TokenError> {
    let (letter, accidentals, octave) = note_parts
        .parse(token)
        .map_err(|_| TokenError::Pitch(token.to_string()))?;

    let alteration: i32 = accidentals
        .iter()
        .map(|c| if *c == '#' { 1 } else { -1 })
        .sum();
    let octave = if octave.is_empty() {
        DEFAULT_OCTAVE
    } else {
        octave
            .parse::<i32>()
            .map_err(|_| TokenError::Pitch(token.to_string()))?
    };

    to_key(token, (octave + 1) * 12 + pitch_class(letter) + alteration)
}

fn to_key(token: &str, key: i32) -> Result<u8, TokenError> {
    u8::try_from(key)
        .ok()
        .filter(|k| *k <= 127)
        .ok_or_else(|| TokenError::OutOfRange {
            token: token.to_string(),
            key,
        })
}

fn parse_chord_member(member: &str) -> Result<u8, TokenError> {
    if !member.is_empty() && member.chars().all(|c| c.is_ascii_digit()) {
        let value: i32 = member
            .parse()
            .map_err(|_| TokenError::Pitch(member.to_string()))?;
        if value < 12 {
            return to_key(member, (DEFAULT_OCTAVE + 1) * 12 + value);
        }
        return to_key(member, value);
    }
    parse_note_name(member)
}

/// Parse a pitch token into a note or chord.
pub fn parse_pitch(token: &str) -> Result<PitchToken, TokenError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(TokenError::Empty);
    }

    if token.contains('.') {
        let keys = token
            .split('.')
            .map(parse_chord_member)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(PitchToken::Chord(keys));
    }

    if token.chars().all(|c| c.is_ascii_digit()) {
        let value: i32 = token
            .parse()
            .map_err(|_| TokenError::Pitch(token.to_string()))?;
        return to_key(token, value).map(PitchToken::Note);
    }

    parse_note_name(token).map(PitchToken::Note)
}

/// Parse a duration token into a quarter length.
pub fn parse_duration(token: &str) -> Result<f64, TokenError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(TokenError::Empty);
    }

    let value = match token.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num
                .trim()
                .parse()
                .map_err(|_| TokenError::Duration(token.to_string()))?;
            let den: f64 = den
                .trim()
                .parse()
                .map_err(|_| TokenError::Duration(token.to_string()))?;
            if den == 0.0 {
                return Err(TokenError::Duration(token.to_string()));
            }
            num / den
        }
        None => token
            .parse()
            .map_err(|_| TokenError::Duration(token.to_string()))?,
    };

    if !value.is_finite() || value <= 0.0 {
        return Err(TokenError::NonPositiveDuration(token.to_string()));
    }
    Ok(value)
}
