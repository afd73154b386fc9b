// Note-value arithmetic: symbolic durations to seconds.
//
// Generators think in note values ("an eighth", "a dotted quarter") and the
// score stores seconds. This is the single place that converts between them,
// including swing: a swung pair of eighths (or sixteenths) keeps its total
// length but gives the on-beat note more of it. `swung_beats` applies the
// same feel to a position on a straight grid.

use crate::params::{MAX_TEMPO_BPM, MIN_TEMPO_BPM};
use serde::{Deserialize, Serialize};

/// Beats per measure. Everything is generated in 4/4.
pub const BEATS_PER_MEASURE: u32 = 4;

/// Symbolic note lengths, measured in quarter-note beats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteValue {
    Whole,
    DottedHalf,
    Half,
    DottedQuarter,
    Quarter,
    DottedEighth,
    Eighth,
    TripletEighth,
    Sixteenth,
}

impl NoteValue {
    pub fn beats(self) -> f64 {
        match self {
            NoteValue::Whole => 4.0,
            NoteValue::DottedHalf => 3.0,
            NoteValue::Half => 2.0,
            NoteValue::DottedQuarter => 1.5,
            NoteValue::Quarter => 1.0,
            NoteValue::DottedEighth => 0.75,
            NoteValue::Eighth => 0.5,
            NoteValue::TripletEighth => 1.0 / 3.0,
            NoteValue::Sixteenth => 0.25,
        }
    }

    /// Only straight subdivisions of the beat take swing.
    pub fn swings(self) -> bool {
        matches!(self, NoteValue::Eighth | NoteValue::Sixteenth)
    }
}

/// Clamp a tempo into the renderable range.
pub fn clamp_tempo(tempo_bpm: f64) -> f64 {
    if tempo_bpm.is_finite() {
        tempo_bpm.clamp(MIN_TEMPO_BPM as f64, MAX_TEMPO_BPM as f64)
    } else {
        120.0
    }
}

/// Length of one quarter-note beat in seconds.
pub fn beat_seconds(tempo_bpm: f64) -> f64 {
    60.0 / clamp_tempo(tempo_bpm)
}

/// Length of one 4/4 measure in seconds.
pub fn measure_seconds(tempo_bpm: f64) -> f64 {
    BEATS_PER_MEASURE as f64 * beat_seconds(tempo_bpm)
}

/// Seconds for a note value at a tempo.
///
/// `swing` runs 0 (straight) to 1 (full triplet feel) and only affects
/// swingable values. The result is the length of the long, on-beat member
/// of a swung pair; see [`swing_pair`] for both halves.
pub fn note_seconds(value: NoteValue, tempo_bpm: f64, swing: f64) -> f64 {
    let straight = value.beats() * beat_seconds(tempo_bpm);
    if value.swings() {
        straight * (1.0 + swing_amount(swing) / 3.0)
    } else {
        straight
    }
}

/// (on-beat, off-beat) lengths of a swung pair. They always sum to two
/// straight notes of the same value.
pub fn swing_pair(value: NoteValue, tempo_bpm: f64, swing: f64) -> (f64, f64) {
    let straight = value.beats() * beat_seconds(tempo_bpm);
    let long = note_seconds(value, tempo_bpm, swing);
    (long, 2.0 * straight - long)
}

/// Where a straight position (in beats) lands once eighths are swung.
/// Beat starts stay put and the off-beat eighth moves late by the same
/// amount as in [`swing_pair`]; positions in between scale with their half
/// of the beat.
pub fn swung_beats(position: f64, swing: f64) -> f64 {
    let beat = position.floor();
    let within = position - beat;
    let long = NoteValue::Eighth.beats() * (1.0 + swing_amount(swing) / 3.0);
    let shifted = if within <= 0.5 {
        within * 2.0 * long
    } else {
        long + (within - 0.5) * 2.0 * (1.0 - long)
    };
    beat + shifted
}

fn swing_amount(swing: f64) -> f64 {
    if swing.is_finite() {
        swing.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_straight_values() {
        assert!(approx(note_seconds(NoteValue::Quarter, 120.0, 0.0), 0.5));
        assert!(approx(note_seconds(NoteValue::Eighth, 120.0, 0.0), 0.25));
        assert!(approx(note_seconds(NoteValue::Whole, 60.0, 0.0), 4.0));
        assert!(approx(note_seconds(NoteValue::DottedQuarter, 90.0, 0.0), 1.0));
        assert!(approx(measure_seconds(120.0), 2.0));
    }

    #[test]
    fn test_swing_only_touches_subdivisions() {
        assert!(approx(note_seconds(NoteValue::Quarter, 120.0, 1.0), 0.5));
        let (long, short) = swing_pair(NoteValue::Eighth, 120.0, 1.0);
        assert!(approx(long, 1.0 / 3.0));
        assert!(approx(short, 1.0 / 6.0));
        assert!(approx(long + short, 0.5));
    }

    #[test]
    fn test_swung_positions_follow_the_pair() {
        let (long, _) = swing_pair(NoteValue::Eighth, 60.0, 0.6);
        assert!(approx(swung_beats(0.5, 0.6), long));
        assert!(approx(swung_beats(3.5, 0.6), 3.0 + long));
        assert!(approx(swung_beats(2.0, 0.6), 2.0));
        assert!(approx(swung_beats(1.25, 0.0), 1.25));
        // Two swung eighths still fill exactly one beat.
        assert!(approx(swung_beats(1.0, 0.6) - swung_beats(0.0, 0.6), 1.0));
        assert!(swung_beats(0.75, 1.0) > swung_beats(0.5, 1.0));
    }

    #[test]
    fn test_tempo_is_clamped() {
        assert!(approx(beat_seconds(1000.0), 60.0 / 300.0));
        assert!(approx(beat_seconds(0.0), 2.0));
        assert!(approx(beat_seconds(f64::NAN), 0.5));
    }
}
