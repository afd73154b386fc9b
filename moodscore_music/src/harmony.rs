// Chord/pad track: the progression voiced as block chords.
//
// One voicing per measure from the plan, rhythmically realized per style:
// held pads (Sustain), an eighth-note strum that always hits the beat and
// sometimes the off-beat (Strum), off-beat chops (Skank) or short
// sixteenth-grid stabs (Stabs). Sevenths come from the key context, which
// already knows about jazz, blues and high complexity.
//
// The outro is the root-position tonic triad.

use crate::compose::GenContext;
use crate::score::{GeneratedTrack, Role, ScheduledEvent};
use crate::style::ChordPattern;
use crate::timing::{NoteValue, swing_pair};
use rand::Rng;

/// Sustained pads leave a sliver before the next measure.
const SUSTAIN_FRACTION: f64 = 0.98;

/// Stab odds per sixteenth step, before density.
const STAB_GRID: [f64; 16] = [
    0.9, 0.0, 0.2, 0.5, 0.0, 0.3, 0.6, 0.0, 0.4, 0.0, 0.3, 0.6, 0.0, 0.4, 0.5, 0.2,
];

/// (offset in beats, length in beats, accent) for one measure.
type Hit = (f64, f64, bool);

fn measure_rhythm(pattern: ChordPattern, density: f64, swing_long: f64, rng: &mut impl Rng) -> Vec<Hit> {
    match pattern {
        ChordPattern::Sustain => vec![(0.0, 4.0 * SUSTAIN_FRACTION, true)],
        ChordPattern::Strum => {
            let off_beat = 0.25 + 0.6 * density;
            let mut hits = Vec::new();
            for beat in 0..4 {
                let at = beat as f64;
                let keep_off = rng.random_bool(off_beat.min(1.0));
                let on_length = if keep_off { swing_long * 0.9 } else { 0.9 };
                hits.push((at, on_length, beat == 0));
                if keep_off {
                    hits.push((at + swing_long, (1.0 - swing_long) * 0.9, false));
                }
            }
            hits
        }
        ChordPattern::Skank => (0..4)
            .map(|beat| (beat as f64 + swing_long, 0.25, beat == 1 || beat == 3))
            .collect(),
        ChordPattern::Stabs => {
            let scale = 0.4 + density;
            let mut hits = Vec::new();
            for (step, &odds) in STAB_GRID.iter().enumerate() {
                if rng.random_bool((odds * scale).min(1.0)) {
                    hits.push((step as f64 * 0.25, 0.2, step == 0));
                }
            }
            if hits.is_empty() {
                hits.push((0.0, 0.2, true));
            }
            hits
        }
    }
}

pub fn generate_chords(ctx: &GenContext, octave: i32, rng: &mut impl Rng) -> GeneratedTrack {
    let mut builder = ctx.builder(Role::Chords);
    let beat = ctx.beat();
    // On-beat share of a beat under swing, in beats.
    let (long, _) = swing_pair(NoteValue::Eighth, ctx.tempo(), ctx.style.swing);
    let swing_long = long / beat;

    for slot in ctx.plan.measures() {
        let chord = ctx.chord(slot.degree, octave);
        for (offset, length, accent) in measure_rhythm(ctx.style.chords, ctx.density(), swing_long, rng) {
            let velocity = ctx.velocity(Role::Chords, accent, rng);
            builder.push(
                ScheduledEvent::chord(slot.start + offset * beat, length * beat, chord.clone(), velocity)
                    .accented(accent),
            );
        }
    }

    let tonic_triad: Vec<u8> = ctx.key.chord_for_degree(1, octave, false).into_iter().take(3).collect();
    let velocity = ctx.velocity(Role::Chords, true, rng);
    builder.push_outro(ScheduledEvent::chord(0.0, ctx.measure(), tonic_triad, velocity).accented(true));
    builder.finish()
}
