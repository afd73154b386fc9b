// Arpeggio track: the current chord broken into a repeating index pattern.
//
// Plays 0,1,2,1 over triads and 0,1,2,3,2,1 over seventh chords, an octave
// above the pad, at the style's subdivision (eighths or sixteenths). Pairs of
// notes take the style's swing. Its dynamics profile keeps it under the
// melody.
//
// Styles without an arpeggio get an empty track.

use crate::compose::GenContext;
use crate::score::{GeneratedTrack, Role, ScheduledEvent};
use crate::timing::swing_pair;
use rand::Rng;

const TRIAD_PATTERN: &[usize] = &[0, 1, 2, 1];
const SEVENTH_PATTERN: &[usize] = &[0, 1, 2, 3, 2, 1];

/// Fraction of each slot that sounds.
const ARTICULATION: f64 = 0.85;

pub fn pattern_for(chord: &[u8]) -> &'static [usize] {
    if chord.len() >= 4 {
        SEVENTH_PATTERN
    } else {
        TRIAD_PATTERN
    }
}

pub fn generate_arpeggio(ctx: &GenContext, octave: i32, rng: &mut impl Rng) -> GeneratedTrack {
    let mut builder = ctx.builder(Role::Arpeggio);
    let Some(style) = ctx.style.arpeggio else {
        return builder.finish();
    };

    let (long, short) = swing_pair(style.subdivision, ctx.tempo(), ctx.style.swing);
    let pair = long + short;
    let steps = (ctx.measure() / pair).round() as usize * 2;

    for slot in ctx.plan.measures() {
        let chord = ctx.chord(slot.degree, octave);
        if chord.is_empty() {
            continue;
        }
        let pattern = pattern_for(&chord);
        for step in 0..steps {
            let pitch = chord[pattern[step % pattern.len()].min(chord.len() - 1)];
            let off = step % 2 == 1;
            let time = slot.start + (step / 2) as f64 * pair + if off { long } else { 0.0 };
            let length = if off { short } else { long } * ARTICULATION;
            let accent = step == 0;
            let velocity = ctx.velocity(Role::Arpeggio, accent, rng);
            builder.push(ScheduledEvent::note(time, length, pitch, velocity).accented(accent));
        }
    }

    let tonic = ctx.key.tonic_pitch(octave);
    ctx.push_tonic_outro(&mut builder, tonic, rng);
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_choice() {
        assert_eq!(pattern_for(&[60, 64, 67]), TRIAD_PATTERN);
        assert_eq!(pattern_for(&[60, 64, 67, 70]), SEVENTH_PATTERN);
        assert!(SEVENTH_PATTERN.iter().all(|&i| i < 4));
    }
}
