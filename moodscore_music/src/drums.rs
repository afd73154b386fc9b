// Drum track: General MIDI kit on channel 10.
//
// Each beat of each measure is filled from the style's feel table (which kit
// pieces land on which beat, with their offsets inside the beat), plus a
// hi-hat layer of round(density x 4) evenly spaced hits per beat for the
// feels that use one. Tambourine and shaker only join when the hints ask
// for them.
//
// Hits that land on the same instant are merged into one percussion event;
// an open hat in a group chokes the closed hat. Off-beat eighths take the
// style's swing. Kids mode always keeps at least a kick on every downbeat.
//
// The outro is crash plus kick at the boundary.

use crate::compose::GenContext;
use crate::dynamics::scaled;
use crate::score::{DrumHit, GeneratedTrack, Role, ScheduledEvent};
use crate::style::DrumFeel;
use crate::timing::{NoteValue, swing_pair};
use rand::Rng;

// General MIDI percussion keys.
pub const KICK: u8 = 36;
pub const SIDE_STICK: u8 = 37;
pub const SNARE: u8 = 38;
pub const CLAP: u8 = 39;
pub const CLOSED_HAT: u8 = 42;
pub const PEDAL_HAT: u8 = 44;
pub const OPEN_HAT: u8 = 46;
pub const CRASH: u8 = 49;
pub const RIDE: u8 = 51;
pub const TAMBOURINE: u8 = 54;
pub const SHAKER: u8 = 70;

/// Relative loudness of each kit piece against the role velocity.
fn piece_level(key: u8) -> f64 {
    match key {
        KICK | CRASH => 1.0,
        SNARE | CLAP => 0.95,
        SIDE_STICK => 0.8,
        OPEN_HAT => 0.75,
        RIDE => 0.7,
        CLOSED_HAT | PEDAL_HAT => 0.6,
        TAMBOURINE => 0.55,
        SHAKER => 0.5,
        _ => 0.8,
    }
}

/// Position inside a beat where a hit lands.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Offset {
    On,
    /// The swung "and".
    And,
    /// An even fraction of the beat, for hat layers.
    At(f64),
}

/// Feel-table pieces for one beat (0-3) of a measure.
fn feel_hits(feel: DrumFeel, beat: usize, density: f64, rng: &mut impl Rng) -> Vec<(Offset, u8)> {
    let backbeat = beat == 1 || beat == 3;
    let mut hits = Vec::new();
    match feel {
        DrumFeel::Backbeat => {
            if beat == 0 || beat == 2 {
                hits.push((Offset::On, KICK));
            } else {
                hits.push((Offset::On, SNARE));
            }
            if beat == 2 && rng.random_bool(0.3 * density) {
                hits.push((Offset::And, KICK));
            }
        }
        DrumFeel::FourOnFloor => {
            hits.push((Offset::On, KICK));
            hits.push((Offset::And, OPEN_HAT));
            if backbeat {
                hits.push((Offset::On, CLAP));
            }
        }
        DrumFeel::OneDrop => {
            if beat == 2 {
                hits.push((Offset::On, KICK));
                hits.push((Offset::On, SNARE));
            }
            if backbeat {
                hits.push((Offset::On, SIDE_STICK));
            }
        }
        DrumFeel::Shuffle => {
            hits.push((Offset::On, RIDE));
            hits.push((Offset::And, RIDE));
            if beat == 0 || beat == 2 {
                hits.push((Offset::On, KICK));
            }
            if backbeat {
                hits.push((Offset::On, PEDAL_HAT));
                if rng.random_bool(0.5) {
                    hits.push((Offset::On, SIDE_STICK));
                }
            }
        }
        DrumFeel::Gentle => {
            if beat == 0 || (beat == 2 && rng.random_bool(density)) {
                hits.push((Offset::On, KICK));
            }
            if backbeat {
                hits.push((Offset::On, SIDE_STICK));
            }
        }
        DrumFeel::Sparse => {
            if beat == 0 {
                hits.push((Offset::On, KICK));
            }
            if beat == 0 || beat == 2 {
                hits.push((Offset::On, RIDE));
            }
        }
        DrumFeel::Silent => {}
    }
    hits
}

/// Whether the feel carries a closed-hat layer.
fn has_hat_layer(feel: DrumFeel) -> bool {
    matches!(
        feel,
        DrumFeel::Backbeat | DrumFeel::FourOnFloor | DrumFeel::OneDrop | DrumFeel::Gentle
    )
}

/// Hat hits per beat: round(density x 4), at most four.
pub fn hats_per_beat(density: f64) -> usize {
    (density.clamp(0.0, 1.0) * 4.0).round() as usize
}

/// Group (seconds, hit) pairs by start time and apply the hat choke.
fn merge_hits(mut hits: Vec<(f64, DrumHit)>) -> Vec<(f64, Vec<DrumHit>)> {
    hits.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut groups: Vec<(f64, Vec<DrumHit>)> = Vec::new();
    for (time, hit) in hits {
        match groups.last_mut() {
            Some((t, group)) if (time - *t).abs() < 1e-9 => {
                if !group.iter().any(|h| h.key == hit.key) {
                    group.push(hit);
                }
            }
            _ => groups.push((time, vec![hit])),
        }
    }
    for (_, group) in &mut groups {
        if group.iter().any(|h| h.key == OPEN_HAT) {
            group.retain(|h| h.key != CLOSED_HAT);
        }
    }
    groups
}

fn place<R: Rng>(
    hits: &mut Vec<(f64, DrumHit)>,
    ctx: &GenContext,
    time: f64,
    key: u8,
    accent: bool,
    rng: &mut R,
) {
    let velocity = scaled(ctx.velocity(Role::Drums, accent, rng), piece_level(key));
    hits.push((time, DrumHit { key, velocity }));
}

pub fn generate_drums<R: Rng>(ctx: &GenContext, rng: &mut R) -> GeneratedTrack {
    let mut builder = ctx.builder(Role::Drums);
    let feel = ctx.style.drums;
    if feel == DrumFeel::Silent {
        return builder.finish();
    }

    let beat = ctx.beat();
    let density = ctx.density();
    let (long, _) = swing_pair(NoteValue::Eighth, ctx.tempo(), ctx.style.swing);
    let hit_length = beat / 4.0;
    let hats = if has_hat_layer(feel) { hats_per_beat(density) } else { 0 };
    let tambourine = ctx.hints.has_any_word(&["tambourine", "tambourines"]);
    let shaker = ctx.hints.has_any_word(&["shaker", "shakers", "maracas"]);

    for slot in ctx.plan.measures() {
        let at = |b: usize, offset: Offset| {
            let within = match offset {
                Offset::On => 0.0,
                Offset::And => long,
                Offset::At(fraction) => fraction * beat,
            };
            slot.start + b as f64 * beat + within
        };
        let mut hits: Vec<(f64, DrumHit)> = Vec::new();

        for b in 0..4 {
            let accent = b == 0;
            for (offset, key) in feel_hits(feel, b, density, rng) {
                place(&mut hits, ctx, at(b, offset), key, accent, rng);
            }
            for h in 0..hats {
                let offset = match (hats, h) {
                    (_, 0) => Offset::On,
                    (2, 1) => Offset::And,
                    (n, h) => Offset::At(h as f64 / n as f64),
                };
                place(&mut hits, ctx, at(b, offset), CLOSED_HAT, false, rng);
            }
            if tambourine && (b == 1 || b == 3) {
                place(&mut hits, ctx, at(b, Offset::On), TAMBOURINE, false, rng);
            }
            if shaker {
                place(&mut hits, ctx, at(b, Offset::On), SHAKER, false, rng);
                place(&mut hits, ctx, at(b, Offset::And), SHAKER, false, rng);
            }
        }
        if ctx.kids() && !hits.iter().any(|(_, h)| h.key == KICK) {
            place(&mut hits, ctx, slot.start, KICK, true, rng);
        }

        for (time, group) in merge_hits(hits) {
            let accent = (time - slot.start).abs() < 1e-9;
            builder.push(ScheduledEvent::percussion(time, hit_length, group).accented(accent));
        }
    }

    let velocity = ctx.velocity(Role::Drums, true, rng);
    builder.push_outro(
        ScheduledEvent::percussion(
            0.0,
            ctx.measure(),
            vec![
                DrumHit { key: CRASH, velocity },
                DrumHit { key: KICK, velocity },
            ],
        )
        .accented(true),
    );
    builder.finish()
}
