// Melody generation: a single monophonic line over the progression.
//
// Walks the timeline note by note. Each step draws a note value from the
// style's duration table (reweighted by rhythmic density so sparse requests
// lean on long notes), decides whether to breathe, then picks a pitch with
// one of three weighted strategies:
//
// - chord tone: move to the nearest tone of the chord sounding right now
// - step: one or two scale steps up or down
// - jump: three to five scale steps, weighted up by harmonic complexity
//
// All pitches come from the in-scale pitches of the style's melody range, so
// the line can't leave the key or the register (kids mode keeps to 60-83).
// Phrases run 3-5 notes; rests get likelier at a phrase boundary and the
// first note after one is accented.
//
// Time advances on a straight beat grid. Onsets and ends are then mapped
// through the style's swing, so off-beat eighths land where the chords and
// drums put theirs.

use crate::compose::GenContext;
use crate::score::{GeneratedTrack, Role, ScheduledEvent};
use crate::style::pick_weighted;
use crate::theory::nearest_index;
use crate::timing::{NoteValue, swung_beats};
use rand::Rng;

/// Fraction of each note's slot that actually sounds.
const ARTICULATION: f64 = 0.92;

/// Absolute melody limits (A0 to C8).
const MELODY_FLOOR: u8 = 21;
const MELODY_CEILING: u8 = 108;

/// Extra rest chance at a phrase boundary, before density scaling.
const PHRASE_BREATH: f64 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    ChordTone,
    Step,
    Jump,
}

/// Style durations reweighted by density: long values fade as density
/// rises, short values grow.
fn density_weighted(durations: &[(NoteValue, f64)], density: f64) -> Vec<(NoteValue, f64)> {
    durations
        .iter()
        .map(|&(value, weight)| {
            let factor = if value.beats() >= 1.0 {
                1.6 - density
            } else {
                0.4 + 1.4 * density
            };
            (value, weight * factor)
        })
        .collect()
}

/// Move `delta` scale steps from `index`, reflecting off either end.
fn step_index(index: usize, delta: i32, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let max = len as i32 - 1;
    let mut target = index as i32 + delta;
    if target < 0 {
        target = -target;
    }
    if target > max {
        target = 2 * max - target;
    }
    target.clamp(0, max) as usize
}

/// Index of the in-range pitch closest to `from` whose pitch class belongs
/// to the chord. Stays put if no chord tone is in range.
fn chord_tone_index(scale: &[u8], chord: &[u8], from: usize) -> usize {
    let classes: Vec<u8> = chord.iter().map(|p| p % 12).collect();
    scale
        .iter()
        .enumerate()
        .filter(|&(_, p)| classes.contains(&(p % 12)))
        .min_by_key(|&(i, _)| (i as i64 - from as i64).unsigned_abs())
        .map(|(i, _)| i)
        .unwrap_or(from)
}

pub fn generate_melody(ctx: &GenContext, octave: i32, rng: &mut impl Rng) -> GeneratedTrack {
    let style = ctx.style;
    let mut builder = ctx.builder(Role::Melody);

    let (low, high) = style.melody_range;
    let scale = ctx
        .key
        .scale_span(low.max(MELODY_FLOOR), high.min(MELODY_CEILING));
    if scale.is_empty() {
        return builder.finish();
    }

    let density = ctx.density();
    let durations = density_weighted(&style.melody_durations, density);
    let weights = [
        (Strategy::ChordTone, style.strategies.chord_tone),
        (Strategy::Step, style.strategies.step),
        (Strategy::Jump, style.strategies.jump * (0.5 + ctx.complexity())),
    ];
    let base_rest = style.rest_probability * (1.3 - density);
    let (phrase_min, phrase_max) = style.phrase_length;
    let measure = ctx.measure();
    let boundary = ctx.boundary();

    let mut index = nearest_index(&scale, ctx.key.tonic_pitch(octave));
    let mut phrase_left = rng.random_range(phrase_min..=phrase_max);
    let mut phrase_start = true;
    let beat = ctx.beat();
    let at = |position: f64| swung_beats(position, style.swing) * beat;
    let mut position = 0.0;

    loop {
        let time = at(position);
        if time >= boundary {
            break;
        }
        let value = pick_weighted(&durations, rng).unwrap_or(NoteValue::Quarter);
        let next = position + value.beats();
        let length = at(next) - time;

        let at_phrase_end = phrase_left == 0;
        let mut rest = base_rest;
        if at_phrase_end {
            rest += PHRASE_BREATH * (1.0 - 0.5 * density);
            phrase_left = rng.random_range(phrase_min..=phrase_max);
            phrase_start = true;
        }
        if rng.random_bool(rest.clamp(0.0, 0.9)) {
            position = next;
            continue;
        }

        index = match pick_weighted(&weights, rng).unwrap_or(Strategy::Step) {
            Strategy::ChordTone => {
                let chord = ctx.chord(ctx.plan.chord_degree_at(time), octave);
                chord_tone_index(&scale, &chord, index)
            }
            Strategy::Step => {
                let size = rng.random_range(1..=2);
                let delta = if rng.random_bool(0.5) { size } else { -size };
                step_index(index, delta, scale.len())
            }
            Strategy::Jump => {
                let size = rng.random_range(3..=5);
                let delta = if rng.random_bool(0.5) { size } else { -size };
                step_index(index, delta, scale.len())
            }
        };

        let downbeat = (time / measure).fract() < 1e-6;
        let accent = phrase_start || downbeat;
        let velocity = ctx.velocity(Role::Melody, accent, rng);
        let note = ScheduledEvent::note(time, length * ARTICULATION, scale[index], velocity)
            .accented(accent);
        if builder.push_monophonic(note) {
            phrase_start = false;
            phrase_left = phrase_left.saturating_sub(1);
        }
        position = next;
    }

    // Resolve to the tonic nearest where the line ended.
    let tonic_pc = ctx.key.tonic_pc;
    let ending = scale
        .iter()
        .enumerate()
        .filter(|&(_, p)| p % 12 == tonic_pc)
        .min_by_key(|&(i, _)| (i as i64 - index as i64).unsigned_abs())
        .map(|(_, &p)| p)
        .unwrap_or(scale[index]);
    ctx.push_tonic_outro(&mut builder, ending, rng);
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_index_reflects() {
        assert_eq!(step_index(0, -2, 8), 2);
        assert_eq!(step_index(7, 2, 8), 5);
        assert_eq!(step_index(3, 1, 8), 4);
        assert_eq!(step_index(0, 5, 1), 0);
    }

    #[test]
    fn test_chord_tone_index() {
        // C major scale C4..C5, C major triad.
        let scale = [60, 62, 64, 65, 67, 69, 71, 72];
        let chord = [48, 52, 55];
        assert_eq!(chord_tone_index(&scale, &chord, 1), 0);
        assert_eq!(chord_tone_index(&scale, &chord, 3), 2);
        assert_eq!(chord_tone_index(&scale, &[61], 3), 3);
    }

    #[test]
    fn test_density_reweighting() {
        let table = [(NoteValue::Half, 1.0), (NoteValue::Eighth, 1.0)];
        let sparse = density_weighted(&table, 0.0);
        assert!(sparse[0].1 > sparse[1].1);
        let busy = density_weighted(&table, 1.0);
        assert!(busy[1].1 > busy[0].1);
    }
}
