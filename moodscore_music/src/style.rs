// Style profiles: every genre- and kids-dependent generator constant.
//
// Generators never branch on genre or kids mode directly. Instead
// `StyleProfile::select` looks up (genre, kids, density, complexity) once and
// hands the generators a flat table of registers, duration weights, rest
// odds, pitch-strategy weights and accompaniment patterns. Kids mode is just
// another row of data here.
//
// Also home to `pick_weighted`, the roulette-wheel draw every generator uses
// for its weighted choices.

use crate::params::Genre;
use crate::timing::NoteValue;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Relative weights of the three melodic pitch strategies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyWeights {
    /// Snap to the nearest tone of the current chord.
    pub chord_tone: f64,
    /// Move one or two scale steps.
    pub step: f64,
    /// Leap three to five scale steps.
    pub jump: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BassPattern {
    /// Quarter-note walk with a chromatic approach into the next root.
    Walking,
    /// Sixteenth-grid hits with occasional octave leaps.
    Syncopated,
    /// Root on beats 1 and 3.
    RootHalves,
    /// Root, fifth, root, fifth in quarters.
    RootFifth,
    /// Driving root eighths.
    DoubleTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChordPattern {
    /// One held chord per measure.
    Sustain,
    /// Eighth-note strum: every downbeat, some off-beats.
    Strum,
    /// Short syncopated stabs on a sixteenth grid.
    Stabs,
    /// Off-beat chops only.
    Skank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrumFeel {
    Backbeat,
    FourOnFloor,
    OneDrop,
    Shuffle,
    Gentle,
    Sparse,
    /// No drum track at all.
    Silent,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArpeggioStyle {
    pub subdivision: NoteValue,
}

/// All style-dependent constants for one composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleProfile {
    /// Octave the melody starts from.
    pub melody_octave: i32,
    /// Lowest and highest melody pitch.
    pub melody_range: (u8, u8),
    pub bass_octave: i32,
    pub chord_octave: i32,
    /// Weighted melody note values before density reweighting.
    pub melody_durations: Vec<(NoteValue, f64)>,
    pub rest_probability: f64,
    /// Notes per phrase, inclusive range.
    pub phrase_length: (u32, u32),
    pub strategies: StrategyWeights,
    pub bass: BassPattern,
    pub chords: ChordPattern,
    pub drums: DrumFeel,
    /// Chords always carry sevenths regardless of complexity.
    pub always_sevenths: bool,
    pub arpeggio: Option<ArpeggioStyle>,
    /// 0 straight to 1 full triplet swing.
    pub swing: f64,
}

const KIDS_DURATIONS: &[(NoteValue, f64)] = &[
    (NoteValue::Quarter, 5.0),
    (NoteValue::Half, 3.0),
    (NoteValue::Eighth, 2.0),
];

const SWING_DURATIONS: &[(NoteValue, f64)] = &[
    (NoteValue::Eighth, 6.0),
    (NoteValue::Quarter, 3.0),
    (NoteValue::DottedQuarter, 1.0),
    (NoteValue::Half, 1.0),
];

const SLOW_DURATIONS: &[(NoteValue, f64)] = &[
    (NoteValue::Half, 4.0),
    (NoteValue::Whole, 2.0),
    (NoteValue::DottedHalf, 2.0),
    (NoteValue::Quarter, 3.0),
];

const GROOVE_DURATIONS: &[(NoteValue, f64)] = &[
    (NoteValue::Sixteenth, 3.0),
    (NoteValue::Eighth, 4.0),
    (NoteValue::DottedEighth, 2.0),
    (NoteValue::Quarter, 2.0),
];

const DEFAULT_DURATIONS: &[(NoteValue, f64)] = &[
    (NoteValue::Eighth, 3.0),
    (NoteValue::Quarter, 4.0),
    (NoteValue::DottedQuarter, 2.0),
    (NoteValue::Half, 2.0),
    (NoteValue::Sixteenth, 1.0),
];

impl StyleProfile {
    /// Look up the profile for a request. `density` and `complexity` are
    /// expected already clamped to [0, 1].
    pub fn select(genre: Genre, kids: bool, density: f64, complexity: f64) -> StyleProfile {
        use Genre::*;

        let slow = matches!(genre, Ambient | Classical | Cinematic);
        let groove = matches!(genre, Funk | Electronic | House | HipHop);

        let melody_durations = if kids {
            KIDS_DURATIONS
        } else if matches!(genre, Jazz | Blues) {
            SWING_DURATIONS
        } else if slow {
            SLOW_DURATIONS
        } else if groove {
            GROOVE_DURATIONS
        } else {
            DEFAULT_DURATIONS
        };

        let melody_range = if kids {
            (60, 83)
        } else if genre == Ambient {
            (57, 79)
        } else {
            (55, 86)
        };

        let rest_probability = if kids {
            0.08
        } else {
            match genre {
                Ambient => 0.2,
                Funk => 0.18,
                _ => 0.12,
            }
        };

        let strategies = if kids {
            StrategyWeights { chord_tone: 0.6, step: 0.35, jump: 0.05 }
        } else {
            match genre {
                Jazz => StrategyWeights { chord_tone: 0.3, step: 0.35, jump: 0.35 },
                Classical => StrategyWeights { chord_tone: 0.35, step: 0.5, jump: 0.15 },
                _ => StrategyWeights { chord_tone: 0.45, step: 0.4, jump: 0.15 },
            }
        };

        let bass = if kids {
            BassPattern::RootHalves
        } else {
            match genre {
                Jazz => BassPattern::Walking,
                Funk | Soul => BassPattern::Syncopated,
                Electronic | House if density >= 0.6 => BassPattern::DoubleTime,
                _ => BassPattern::RootFifth,
            }
        };

        let chords = if kids {
            ChordPattern::Sustain
        } else {
            match genre {
                Ambient | Classical | Cinematic | HipHop | LoFi => ChordPattern::Sustain,
                Funk | Electronic | House | Jazz | Soul => ChordPattern::Stabs,
                Reggae => ChordPattern::Skank,
                _ => ChordPattern::Strum,
            }
        };

        let drums = if kids {
            DrumFeel::Gentle
        } else {
            match genre {
                Electronic | House => DrumFeel::FourOnFloor,
                Reggae => DrumFeel::OneDrop,
                Jazz | Blues => DrumFeel::Shuffle,
                Ambient | Classical | Cinematic if density >= 0.5 => DrumFeel::Sparse,
                Ambient | Classical | Cinematic => DrumFeel::Silent,
                _ => DrumFeel::Backbeat,
            }
        };

        let arpeggio_active = if kids {
            density >= 0.7
        } else {
            complexity >= 0.45 || matches!(genre, Electronic | House | Classical | Ambient | Cinematic)
        };
        let arpeggio = arpeggio_active.then(|| ArpeggioStyle {
            subdivision: if density > 0.6 || matches!(genre, Electronic | House) {
                NoteValue::Sixteenth
            } else {
                NoteValue::Eighth
            },
        });

        let swing = if kids {
            0.0
        } else {
            match genre {
                Jazz | Blues => 0.6,
                LoFi | HipHop => 0.3,
                _ => 0.0,
            }
        };

        StyleProfile {
            melody_octave: 4,
            melody_range,
            bass_octave: 2,
            chord_octave: if kids { 4 } else { 3 },
            melody_durations: melody_durations.to_vec(),
            rest_probability,
            phrase_length: (3, 5),
            strategies,
            bass,
            chords,
            drums,
            always_sevenths: !kids && matches!(genre, Jazz | LoFi),
            arpeggio,
            swing,
        }
    }
}

/// Roulette-wheel pick. Non-positive and non-finite weights never win;
/// returns `None` when nothing has positive weight.
pub fn pick_weighted<T: Copy>(choices: &[(T, f64)], rng: &mut impl Rng) -> Option<T> {
    let weight = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
    let total: f64 = choices.iter().map(|&(_, w)| weight(w)).sum();
    if total <= 0.0 {
        return None;
    }
    let mut r = rng.random::<f64>() * total;
    let mut last = None;
    for &(item, w) in choices {
        let w = weight(w);
        if w <= 0.0 {
            continue;
        }
        if r < w {
            return Some(item);
        }
        r -= w;
        last = Some(item);
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_kids_profile() {
        for genre in Genre::ALL {
            let style = StyleProfile::select(genre, true, 0.5, 0.9);
            assert_eq!(style.bass, BassPattern::RootHalves);
            assert_eq!(style.drums, DrumFeel::Gentle);
            assert_eq!(style.melody_range, (60, 83));
            assert!(style.arpeggio.is_none());
            assert!(!style.always_sevenths);
        }
        assert!(StyleProfile::select(Genre::Pop, true, 0.8, 0.0).arpeggio.is_some());
    }

    #[test]
    fn test_genre_patterns() {
        let jazz = StyleProfile::select(Genre::Jazz, false, 0.5, 0.3);
        assert_eq!(jazz.bass, BassPattern::Walking);
        assert_eq!(jazz.drums, DrumFeel::Shuffle);
        assert!(jazz.always_sevenths);
        assert!(jazz.swing > 0.0);

        let funk = StyleProfile::select(Genre::Funk, false, 0.5, 0.3);
        assert_eq!(funk.bass, BassPattern::Syncopated);
        assert_eq!(funk.chords, ChordPattern::Stabs);

        let reggae = StyleProfile::select(Genre::Reggae, false, 0.5, 0.3);
        assert_eq!(reggae.chords, ChordPattern::Skank);
        assert_eq!(reggae.drums, DrumFeel::OneDrop);
    }

    #[test]
    fn test_density_thresholds() {
        let busy = StyleProfile::select(Genre::House, false, 0.8, 0.0);
        assert_eq!(busy.bass, BassPattern::DoubleTime);
        assert_eq!(busy.drums, DrumFeel::FourOnFloor);
        assert_eq!(busy.arpeggio.map(|a| a.subdivision), Some(NoteValue::Sixteenth));
        let calm = StyleProfile::select(Genre::House, false, 0.4, 0.0);
        assert_eq!(calm.bass, BassPattern::RootFifth);

        assert_eq!(StyleProfile::select(Genre::Ambient, false, 0.3, 0.0).drums, DrumFeel::Silent);
        assert_eq!(StyleProfile::select(Genre::Ambient, false, 0.6, 0.0).drums, DrumFeel::Sparse);
    }

    #[test]
    fn test_arpeggio_gating() {
        assert!(StyleProfile::select(Genre::Pop, false, 0.5, 0.3).arpeggio.is_none());
        let complex = StyleProfile::select(Genre::Pop, false, 0.5, 0.5).arpeggio;
        assert_eq!(complex.map(|a| a.subdivision), Some(NoteValue::Eighth));
        assert!(StyleProfile::select(Genre::Classical, false, 0.2, 0.0).arpeggio.is_some());
    }

    #[test]
    fn test_pick_weighted() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(pick_weighted::<u8>(&[], &mut rng), None);
        assert_eq!(pick_weighted(&[(1, 0.0), (2, -1.0)], &mut rng), None);
        for _ in 0..100 {
            assert_eq!(pick_weighted(&[(1, 0.0), (2, 3.0), (3, f64::NAN)], &mut rng), Some(2));
        }
        let mut counts = [0usize; 2];
        for _ in 0..2000 {
            let i = pick_weighted(&[(0usize, 1.0), (1, 3.0)], &mut rng).unwrap();
            counts[i] += 1;
        }
        assert!(counts[1] > counts[0] * 2);
    }
}
