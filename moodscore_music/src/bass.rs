// Bass line generation, one measure at a time from the progression plan.
//
// The style picks one of five patterns:
//
//   Walking     quarters: root, third, fifth, chromatic approach to next root
//   Syncopated  sixteenth grid, probabilistic hits, occasional octave leaps
//   RootHalves  root on beats 1 and 3 (kids)
//   RootFifth   root, fifth, root, fifth
//   DoubleTime  root eighths
//
// The line is monophonic and ends on a one-measure tonic outro.

use crate::compose::GenContext;
use crate::score::{GeneratedTrack, Role, ScheduledEvent};
use crate::style::BassPattern;
use rand::Rng;

/// Hit odds per sixteenth step for the syncopated pattern, before density.
const SYNCOPATION: [f64; 16] = [
    1.0, 0.0, 0.3, 0.5, 0.2, 0.0, 0.6, 0.3, 0.8, 0.0, 0.3, 0.5, 0.2, 0.4, 0.6, 0.3,
];

/// Chance a syncopated hit jumps up an octave.
const OCTAVE_LEAP: f64 = 0.2;

/// (offset in beats, pitch, length in beats) for one measure.
type BassNote = (f64, u8, f64);

fn measure_notes(
    pattern: BassPattern,
    chord: &[u8],
    next_root: u8,
    density: f64,
    rng: &mut impl Rng,
) -> Vec<BassNote> {
    let root = chord.first().copied().unwrap_or(36);
    let third = chord.get(1).copied().unwrap_or(root + 4);
    let fifth = chord.get(2).copied().unwrap_or(root + 7);

    match pattern {
        BassPattern::RootHalves => vec![(0.0, root, 1.8), (2.0, root, 1.8)],
        BassPattern::RootFifth => vec![
            (0.0, root, 0.9),
            (1.0, fifth, 0.9),
            (2.0, root, 0.9),
            (3.0, fifth, 0.9),
        ],
        BassPattern::DoubleTime => (0..8).map(|i| (i as f64 * 0.5, root, 0.4)).collect(),
        BassPattern::Walking => {
            let approach = if rng.random_bool(0.5) {
                next_root.saturating_sub(1)
            } else {
                next_root.saturating_add(1)
            };
            vec![
                (0.0, root, 0.95),
                (1.0, third, 0.95),
                (2.0, fifth, 0.95),
                (3.0, approach, 0.95),
            ]
        }
        BassPattern::Syncopated => {
            let scale = 0.5 + density;
            let mut notes = Vec::new();
            for (step, &odds) in SYNCOPATION.iter().enumerate() {
                if step > 0 && !rng.random_bool((odds * scale).min(1.0)) {
                    continue;
                }
                let pitch = if step > 0 && rng.random_bool(OCTAVE_LEAP) {
                    root.saturating_add(12)
                } else {
                    root
                };
                notes.push((step as f64 * 0.25, pitch, 0.22));
            }
            notes
        }
    }
}

pub fn generate_bass(ctx: &GenContext, octave: i32, rng: &mut impl Rng) -> GeneratedTrack {
    let mut builder = ctx.builder(Role::Bass);
    let beat = ctx.beat();

    for slot in ctx.plan.measures() {
        let chord = ctx.chord(slot.degree, octave);
        let next_root = ctx
            .chord(slot.next_degree, octave)
            .first()
            .copied()
            .unwrap_or(36);
        for (offset, pitch, length) in
            measure_notes(ctx.style.bass, &chord, next_root, ctx.density(), rng)
        {
            let accent = offset == 0.0;
            let velocity = ctx.velocity(Role::Bass, accent, rng);
            builder.push_monophonic(
                ScheduledEvent::note(slot.start + offset * beat, length * beat, pitch, velocity)
                    .accented(accent),
            );
        }
    }

    let tonic = ctx.key.tonic_pitch(octave);
    ctx.push_tonic_outro(&mut builder, tonic, rng);
    builder.finish()
}
