// Dynamics model: MIDI velocity from role and affect.
//
// Each role has a tuned level and range. Valence nudges loudness a little,
// arousal a lot; accents (downbeats, phrase starts) add a bonus; a small
// uniform jitter humanizes repeated notes. Kids mode lowers the ceiling so
// nothing gets shrill.

use crate::score::Role;
use rand::Rng;

/// Per-role velocity tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicsProfile {
    pub base: f64,
    pub min: u8,
    pub max: u8,
    /// Maximum jitter either side of the computed level.
    pub jitter: f64,
    pub valence_gain: f64,
    pub arousal_gain: f64,
    pub accent_bonus: f64,
}

/// Velocity ceiling in kids mode.
const KIDS_MAX_VELOCITY: u8 = 96;

impl DynamicsProfile {
    pub fn for_role(role: Role, kids: bool) -> Self {
        let profile = match role {
            Role::Melody => DynamicsProfile {
                base: 82.0,
                min: 50,
                max: 118,
                jitter: 6.0,
                valence_gain: 8.0,
                arousal_gain: 18.0,
                accent_bonus: 10.0,
            },
            Role::Bass => DynamicsProfile {
                base: 80.0,
                min: 55,
                max: 112,
                jitter: 5.0,
                valence_gain: 4.0,
                arousal_gain: 14.0,
                accent_bonus: 8.0,
            },
            Role::Chords => DynamicsProfile {
                base: 66.0,
                min: 40,
                max: 100,
                jitter: 5.0,
                valence_gain: 6.0,
                arousal_gain: 12.0,
                accent_bonus: 6.0,
            },
            Role::Arpeggio => DynamicsProfile {
                base: 52.0,
                min: 30,
                max: 80,
                jitter: 4.0,
                valence_gain: 4.0,
                arousal_gain: 10.0,
                accent_bonus: 5.0,
            },
            Role::Drums => DynamicsProfile {
                base: 84.0,
                min: 40,
                max: 124,
                jitter: 8.0,
                valence_gain: 2.0,
                arousal_gain: 22.0,
                accent_bonus: 14.0,
            },
        };
        if kids {
            DynamicsProfile {
                base: profile.base - 6.0,
                max: profile.max.min(KIDS_MAX_VELOCITY),
                min: profile.min.min(KIDS_MAX_VELOCITY),
                ..profile
            }
        } else {
            profile
        }
    }
}

/// Velocity with an explicit jitter draw in [-1, 1].
pub fn velocity_with_jitter(
    role: Role,
    valence: f64,
    arousal: f64,
    kids: bool,
    accent: bool,
    jitter: f64,
) -> u8 {
    let profile = DynamicsProfile::for_role(role, kids);
    let finite = |v: f64, lo: f64, hi: f64| if v.is_finite() { v.clamp(lo, hi) } else { 0.0 };
    let mut level = profile.base
        + finite(valence, -1.0, 1.0) * profile.valence_gain
        + finite(arousal, -1.0, 1.0) * profile.arousal_gain
        + finite(jitter, -1.0, 1.0) * profile.jitter;
    if accent {
        level += profile.accent_bonus;
    }
    level.round().clamp(profile.min as f64, profile.max as f64) as u8
}

/// Velocity for one note, drawing its own jitter.
pub fn velocity(
    role: Role,
    valence: f64,
    arousal: f64,
    kids: bool,
    accent: bool,
    rng: &mut impl Rng,
) -> u8 {
    let jitter = rng.random_range(-1.0..=1.0);
    velocity_with_jitter(role, valence, arousal, kids, accent, jitter)
}

/// Scale a velocity by a kit-piece or articulation factor, keeping it audible.
pub fn scaled(velocity: u8, factor: f64) -> u8 {
    (velocity as f64 * factor).round().clamp(1.0, 127.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_velocity_stays_in_role_range() {
        let mut rng = rand::rng();
        for role in Role::ALL {
            let profile = DynamicsProfile::for_role(role, false);
            for _ in 0..500 {
                let valence = rng.random_range(-1.0..=1.0);
                let arousal = rng.random_range(-1.0..=1.0);
                let v = velocity(role, valence, arousal, false, rng.random_bool(0.5), &mut rng);
                assert!(v >= profile.min && v <= profile.max, "{role:?} gave {v}");
                assert!(v <= 127);
            }
        }
    }

    #[test]
    fn test_extremes_clamp() {
        assert_eq!(velocity_with_jitter(Role::Drums, 1.0, 1.0, false, true, 1.0), 124);
        assert_eq!(velocity_with_jitter(Role::Arpeggio, -1.0, -1.0, false, false, -1.0), 34);
        assert_eq!(velocity_with_jitter(Role::Melody, f64::NAN, f64::NAN, false, false, 0.0), 82);
    }

    #[test]
    fn test_arousal_and_accent_raise_velocity() {
        let calm = velocity_with_jitter(Role::Bass, 0.0, -0.8, false, false, 0.0);
        let excited = velocity_with_jitter(Role::Bass, 0.0, 0.8, false, false, 0.0);
        assert!(excited > calm);
        let plain = velocity_with_jitter(Role::Melody, 0.0, 0.0, false, false, 0.0);
        let accented = velocity_with_jitter(Role::Melody, 0.0, 0.0, false, true, 0.0);
        assert_eq!(accented, plain + 10);
    }

    #[test]
    fn test_kids_ceiling() {
        for role in Role::ALL {
            assert!(velocity_with_jitter(role, 1.0, 1.0, true, true, 1.0) <= 96);
        }
    }

    #[test]
    fn test_scaled() {
        assert_eq!(scaled(100, 0.5), 50);
        assert_eq!(scaled(1, 0.1), 1);
        assert_eq!(scaled(120, 2.0), 127);
    }
}
