// MIDI export: CompositionResult to Standard MIDI File bytes.
//
// Writes format 1 at 480 ticks per quarter note. Every audible role track
// becomes one MIDI track carrying its name, the tempo, a program change and
// then note-on/note-off pairs for each pitch or drum hit. Drums go out on
// channel 10.
//
// Seconds are converted to ticks here, which is where rounding can collapse
// neighbouring starts. The encoder repairs that per track: event starts are
// forced strictly increasing with a one-tick nudge, a note is cut short when
// the same key strikes again, and at any tick note-offs are written before
// note-ons.
//
// `encode_data_uri` is the outward boundary: it never fails, substituting a
// minimal one-note file (and logging why) if encoding does.

use crate::score::{CompositionResult, EventKind, ScheduledEvent, Track};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use midly::num::{u4, u7, u15, u24, u28};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::collections::HashMap;

/// Pulses per quarter note.
pub const TICKS_PER_QUARTER: u16 = 480;

/// Largest delta a variable-length quantity can carry.
const MAX_DELTA: u64 = 0x0FFF_FFFF;

/// Largest tempo value (microseconds per quarter) a tempo meta event holds.
const MAX_TEMPO_MICROS: f64 = 0xFF_FFFF as f64;

pub const DATA_URI_PREFIX: &str = "data:audio/midi;base64,";

/// One-track file: tempo 120, piano, a single quarter-note middle C.
pub const FALLBACK_SMF: &[u8] = &[
    b'M', b'T', b'h', b'd', 0x00, 0x00, 0x00, 0x06, // header chunk
    0x00, 0x01, 0x00, 0x01, 0x01, 0xE0, // format 1, one track, 480 ppq
    b'M', b'T', b'r', b'k', 0x00, 0x00, 0x00, 0x17, // track chunk
    0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, // tempo 500000
    0x00, 0xC0, 0x00, // program 0
    0x00, 0x90, 0x3C, 0x50, // note on C4
    0x83, 0x60, 0x80, 0x3C, 0x00, // note off after 480 ticks
    0x00, 0xFF, 0x2F, 0x00, // end of track
];

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("composition has no audible tracks")]
    Empty,
    #[error("tempo {0} bpm cannot be encoded")]
    InvalidTempo(f64),
    #[error("resolution of {0} ticks per quarter is out of range")]
    InvalidResolution(u16),
    #[error("delta of {delta} ticks in track {track} overflows")]
    DeltaOverflow { track: &'static str, delta: u64 },
    #[error("writing SMF: {0}")]
    Io(#[from] std::io::Error),
}

/// Encoder knobs. The defaults are what every caller uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderConfig {
    pub ticks_per_quarter: u16,
    /// Forward nudge for a start tick that doesn't exceed its predecessor.
    pub tie_nudge_ticks: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig {
            ticks_per_quarter: TICKS_PER_QUARTER,
            tie_nudge_ticks: 1,
        }
    }
}

/// Seconds to ticks at a constant tempo. Negative and non-finite times
/// map to tick 0.
pub fn seconds_to_ticks(seconds: f64, tempo_bpm: f64, ticks_per_quarter: u16) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * tempo_bpm / 60.0 * ticks_per_quarter as f64).round() as u64
}

/// A sounding key between two ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NoteSpan {
    start: u64,
    end: u64,
    key: u8,
    velocity: u8,
}

/// Turn one track's events into tick spans, applying the tie nudge and the
/// same-key overlap cut. Events are taken in time order; equal times keep
/// their stored order.
fn track_spans(track: &Track, tempo_bpm: f64, config: &EncoderConfig) -> Vec<NoteSpan> {
    let tpq = config.ticks_per_quarter;
    let nudge = config.tie_nudge_ticks.max(1) as u64;
    let mut spans: Vec<NoteSpan> = Vec::new();
    let mut latest: HashMap<u8, usize> = HashMap::new();
    let mut last_start: Option<u64> = None;

    let mut ordered: Vec<&ScheduledEvent> = track.events.iter().collect();
    ordered.sort_by(|a, b| a.time.total_cmp(&b.time));

    for event in ordered {
        let mut start = seconds_to_ticks(event.time, tempo_bpm, tpq);
        if let Some(prev) = last_start {
            if start <= prev {
                start = prev + nudge;
            }
        }
        last_start = Some(start);
        let end = seconds_to_ticks(event.end(), tempo_bpm, tpq).max(start + 1);

        let keys: Vec<(u8, u8)> = match &event.kind {
            EventKind::Note { pitch } => vec![(*pitch, event.velocity)],
            EventKind::Chord { pitches } => pitches.iter().map(|&p| (p, event.velocity)).collect(),
            EventKind::Percussion { hits } => hits.iter().map(|h| (h.key, h.velocity)).collect(),
        };
        let mut struck: Vec<u8> = Vec::with_capacity(keys.len());
        for (key, velocity) in keys {
            let key = key.min(127);
            if struck.contains(&key) {
                continue;
            }
            struck.push(key);
            if let Some(&i) = latest.get(&key) {
                if spans[i].end > start {
                    spans[i].end = start;
                }
            }
            latest.insert(key, spans.len());
            spans.push(NoteSpan {
                start,
                end,
                key,
                velocity: velocity.clamp(1, 127),
            });
        }
    }
    spans
}

fn encode_track(
    track: &Track,
    tempo_bpm: f64,
    tempo_micros: u32,
    config: &EncoderConfig,
) -> Result<Vec<TrackEvent<'static>>, EncodeError> {
    let channel = u4::new(track.channel());
    let mut events = vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(track.role.name().as_bytes())),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_micros))),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange {
                    program: u7::new(track.program.min(127)),
                },
            },
        },
    ];

    // (tick, 0 = off / 1 = on, key, velocity)
    let mut messages: Vec<(u64, u8, u8, u8)> = Vec::new();
    for span in track_spans(track, tempo_bpm, config) {
        messages.push((span.start, 1, span.key, span.velocity));
        messages.push((span.end, 0, span.key, 0));
    }
    messages.sort_by_key(|&(tick, order, key, _)| (tick, order, key));

    let mut current = 0u64;
    for (tick, order, key, velocity) in messages {
        let delta = tick - current;
        if delta > MAX_DELTA {
            return Err(EncodeError::DeltaOverflow {
                track: track.role.name(),
                delta,
            });
        }
        current = tick;
        let message = if order == 1 {
            MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(velocity),
            }
        } else {
            MidiMessage::NoteOff {
                key: u7::new(key),
                vel: u7::new(0),
            }
        };
        events.push(TrackEvent {
            delta: u28::new(delta as u32),
            kind: TrackEventKind::Midi { channel, message },
        });
    }

    events.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    Ok(events)
}

/// Encode a composition as SMF bytes.
pub fn encode_smf(result: &CompositionResult, config: &EncoderConfig) -> Result<Vec<u8>, EncodeError> {
    let tempo = result.tempo_bpm;
    if !tempo.is_finite() || tempo <= 0.0 {
        return Err(EncodeError::InvalidTempo(tempo));
    }
    let micros = (60_000_000.0 / tempo).round();
    if !(1.0..=MAX_TEMPO_MICROS).contains(&micros) {
        return Err(EncodeError::InvalidTempo(tempo));
    }
    if config.ticks_per_quarter == 0 || config.ticks_per_quarter > 0x7FFF {
        return Err(EncodeError::InvalidResolution(config.ticks_per_quarter));
    }

    let tracks: Vec<&Track> = result.audible_tracks().collect();
    if tracks.is_empty() {
        return Err(EncodeError::Empty);
    }

    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(config.ticks_per_quarter)),
    ));
    for track in tracks {
        smf.tracks
            .push(encode_track(track, tempo, micros as u32, config)?);
    }

    let mut bytes = Vec::new();
    smf.write_std(&mut bytes)?;
    Ok(bytes)
}

/// Wrap SMF bytes as a base64 data URI.
pub fn data_uri(bytes: &[u8]) -> String {
    format!("{DATA_URI_PREFIX}{}", STANDARD.encode(bytes))
}

/// Encode a composition, substituting the fallback file (with a warning)
/// if the encoder refuses it.
pub fn encode_or_fallback(result: &CompositionResult, config: &EncoderConfig) -> Vec<u8> {
    match encode_smf(result, config) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "MIDI encoding failed, using fallback file");
            FALLBACK_SMF.to_vec()
        }
    }
}

/// Encode a composition straight to a data URI. Never fails.
pub fn encode_data_uri(result: &CompositionResult, config: &EncoderConfig) -> String {
    data_uri(&encode_or_fallback(result, config))
}
