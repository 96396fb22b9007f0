//! Render generated tokens as a Standard MIDI File.
//!
//! Writes SMF format 0 (single track): tempo, then each note or chord in
//! sequence on one channel.

use midly::num::{u15, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

use crate::error::GenerateError;
use crate::token::{parse_duration, parse_pitch};

pub const MIDI_MIME_TYPE: &str = "audio/midi";

const MICROS_PER_MINUTE: u32 = 60_000_000;
const MAX_TEMPO_MICROS: u32 = 0x00ff_ffff;

/// Options for MIDI export.
#[derive(Debug, Clone, PartialEq)]
pub struct MidiOptions {
    pub ticks_per_quarter: u16,
    pub tempo_bpm: u32,
    pub velocity: u8,
    pub channel: u8,
}

impl Default for MidiOptions {
    fn default() -> Self {
        Self {
            ticks_per_quarter: 480,
            tempo_bpm: 120,
            velocity: 90,
            channel: 0,
        }
    }
}

impl From<&songconf::GenerationConfig> for MidiOptions {
    fn from(config: &songconf::GenerationConfig) -> Self {
        Self {
            ticks_per_quarter: config.ticks_per_quarter,
            tempo_bpm: config.tempo_bpm,
            velocity: config.velocity,
            channel: 0,
        }
    }
}

/// Encoded file plus a tally of what made it in.
#[derive(Debug, Clone)]
pub struct RenderedMidi {
    pub bytes: Vec<u8>,
    /// Notes and chords written.
    pub elements: usize,
    /// Token pairs dropped because they did not parse.
    pub skipped: usize,
}

fn tempo_micros(bpm: u32) -> u32 {
    (MICROS_PER_MINUTE / bpm.max(1)).min(MAX_TEMPO_MICROS)
}

/// Encode `(pitch, duration)` token pairs. Pairs that fail to parse are
/// skipped and counted, they never fail the whole render.
pub fn render_midi<P, D>(
    pitches: &[P],
    durs: &[D],
    options: &MidiOptions,
) -> Result<RenderedMidi, GenerateError>
where
    P: AsRef<str>,
    D: AsRef<str>,
{
    let tpq = options.ticks_per_quarter.clamp(1, 0x7fff);
    let channel = options.channel.min(15);
    let velocity = options.velocity.min(127);

    let mut events: Vec<TrackEvent<'static>> = vec![
        TrackEvent {
            delta: 0.into(),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(b"aisong")),
        },
        TrackEvent {
            delta: 0.into(),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(tempo_micros(options.tempo_bpm).into())),
        },
    ];

    let mut elements = 0;
    let mut skipped = 0;

    for (pitch, dur) in pitches.iter().zip(durs) {
        let (pitch, dur) = (pitch.as_ref(), dur.as_ref());
        let parsed = parse_pitch(pitch).and_then(|p| Ok((p, parse_duration(dur)?)));
        let (token, quarters) = match parsed {
            Ok(ok) => ok,
            Err(e) => {
                tracing::debug!(pitch, dur, error = %e, "skipping token");
                skipped += 1;
                continue;
            }
        };

        let ticks = (quarters * f64::from(tpq)).round();
        if ticks < 1.0 || ticks > f64::from(0x0fff_ffffu32) {
            tracing::debug!(pitch, dur, ticks, "skipping token with unrepresentable length");
            skipped += 1;
            continue;
        }
        let ticks = ticks as u32;

        let keys = token.keys();
        for key in &keys {
            events.push(TrackEvent {
                delta: 0.into(),
                kind: TrackEventKind::Midi {
                    channel: channel.into(),
                    message: MidiMessage::NoteOn {
                        key: (*key).into(),
                        vel: velocity.into(),
                    },
                },
            });
        }
        for (i, key) in keys.iter().enumerate() {
            events.push(TrackEvent {
                delta: if i == 0 { ticks.into() } else { 0.into() },
                kind: TrackEventKind::Midi {
                    channel: channel.into(),
                    message: MidiMessage::NoteOff {
                        key: (*key).into(),
                        vel: u7::new(0),
                    },
                },
            });
        }
        elements += 1;
    }

    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let smf = Smf {
        header: Header::new(Format::SingleTrack, Timing::Metrical(u15::new(tpq))),
        tracks: vec![events],
    };

    let mut bytes = Vec::new();
    smf.write(&mut bytes)
        .map_err(|e| GenerateError::Midi(e.to_string()))?;

    Ok(RenderedMidi {
        bytes,
        elements,
        skipped,
    })
}
