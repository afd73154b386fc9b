// Progression planning: the harmonic skeleton and the length of the piece.
//
// Before any notes are generated, the planner picks one chord-degree cycle
// and a repeat count from (mode family, genre, kids flag). The plan fixes the
// whole timeline: one chord per 4/4 measure, `cycles` passes through the
// cycle, and therefore the total body duration every generator must respect.
//
// Planning is deterministic: the same inputs always give the same plan. All
// the randomness lives in the generators that realize it.

use crate::params::Genre;
use crate::theory::ScaleMode;
use crate::timing::{beat_seconds, clamp_tempo, measure_seconds};
use serde::{Deserialize, Serialize};

/// Kids progressions: I-IV-V-I.
const KIDS_CYCLE: &[u8] = &[1, 4, 5, 1];
/// Twelve-bar blues with a V turnaround.
const TWELVE_BAR_BLUES: &[u8] = &[1, 1, 1, 1, 4, 4, 1, 1, 5, 4, 1, 5];
/// ii-V-I with the tonic held for a second bar.
const JAZZ_CYCLE: &[u8] = &[2, 5, 1, 1];
/// I-V-vi-IV.
const MAJOR_CYCLE: &[u8] = &[1, 5, 6, 4];
/// i-VI-III-VII.
const MINOR_CYCLE: &[u8] = &[1, 6, 3, 7];

/// One measure of the plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasureSlot {
    pub index: usize,
    /// Chord degree (1-7) held for this measure.
    pub degree: u8,
    /// Degree of the following measure; wraps to the first at the end.
    pub next_degree: u8,
    /// Start in seconds.
    pub start: f64,
    /// Length in seconds.
    pub duration: f64,
}

/// The harmonic plan for a piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionPlan {
    /// One chord degree per measure for a single pass.
    pub degrees: Vec<u8>,
    /// Number of passes through `degrees`.
    pub cycles: usize,
    pub tempo_bpm: f64,
}

impl ProgressionPlan {
    pub fn beat_seconds(&self) -> f64 {
        beat_seconds(self.tempo_bpm)
    }

    pub fn measure_seconds(&self) -> f64 {
        measure_seconds(self.tempo_bpm)
    }

    pub fn measure_count(&self) -> usize {
        self.degrees.len() * self.cycles
    }

    /// cycles x cycle length x measure length.
    pub fn total_duration(&self) -> f64 {
        self.measure_count() as f64 * self.measure_seconds()
    }

    /// Every measure of the piece, in order.
    pub fn measures(&self) -> Vec<MeasureSlot> {
        let measure = self.measure_seconds();
        let count = self.measure_count();
        (0..count)
            .map(|index| MeasureSlot {
                index,
                degree: self.degree_of_measure(index),
                next_degree: self.degree_of_measure((index + 1) % count.max(1)),
                start: index as f64 * measure,
                duration: measure,
            })
            .collect()
    }

    fn degree_of_measure(&self, index: usize) -> u8 {
        if self.degrees.is_empty() {
            return 1;
        }
        self.degrees[index % self.degrees.len()]
    }

    /// Degree sounding at a time. Times past the end read the last measure.
    pub fn chord_degree_at(&self, time: f64) -> u8 {
        let count = self.measure_count();
        if count == 0 || !time.is_finite() {
            return 1;
        }
        let index = (time.max(0.0) / self.measure_seconds()) as usize;
        self.degree_of_measure(index.min(count - 1))
    }

    /// The full degree sequence, all cycles unrolled.
    pub fn degree_sequence(&self) -> Vec<u8> {
        (0..self.measure_count())
            .map(|i| self.degree_of_measure(i))
            .collect()
    }
}

/// The canonical cycle and repeat count for a combination. Kids mode
/// overrides genre entirely.
pub fn cycle_for(mode: ScaleMode, genre: Genre, kids: bool) -> (&'static [u8], usize) {
    if kids {
        return (KIDS_CYCLE, 2);
    }
    let cycle = match genre {
        Genre::Blues => return (TWELVE_BAR_BLUES, 1),
        Genre::Jazz => JAZZ_CYCLE,
        _ if mode.is_minor_family() => MINOR_CYCLE,
        _ => MAJOR_CYCLE,
    };
    let cycles = if genre == Genre::Ambient { 3 } else { 4 };
    (cycle, cycles)
}

/// Plan a piece.
pub fn plan_progression(mode: ScaleMode, genre: Genre, kids: bool, tempo_bpm: f64) -> ProgressionPlan {
    let (cycle, cycles) = cycle_for(mode, genre, kids);
    ProgressionPlan {
        degrees: cycle.to_vec(),
        cycles,
        tempo_bpm: clamp_tempo(tempo_bpm),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_plan_durations() {
        let plan = plan_progression(ScaleMode::Major, Genre::Pop, false, 120.0);
        assert_eq!(plan.degrees, vec![1, 5, 6, 4]);
        assert_eq!(plan.cycles, 4);
        assert_eq!(plan.measure_seconds(), 2.0);
        assert_eq!(plan.total_duration(), 32.0);
    }

    #[test]
    fn test_kids_override_genre() {
        for genre in Genre::ALL {
            let plan = plan_progression(ScaleMode::Minor, genre, true, 100.0);
            assert_eq!(plan.degrees, vec![1, 4, 5, 1]);
            assert_eq!(plan.cycles, 2);
        }
    }

    #[test]
    fn test_genre_cycles() {
        let blues = plan_progression(ScaleMode::Major, Genre::Blues, false, 100.0);
        assert_eq!(blues.degrees.len(), 12);
        assert_eq!(blues.cycles, 1);
        let jazz = plan_progression(ScaleMode::Major, Genre::Jazz, false, 100.0);
        assert_eq!(jazz.degrees, vec![2, 5, 1, 1]);
        let ambient = plan_progression(ScaleMode::Major, Genre::Ambient, false, 70.0);
        assert_eq!(ambient.cycles, 3);
        let minor = plan_progression(ScaleMode::Dorian, Genre::Rock, false, 140.0);
        assert_eq!(minor.degrees, vec![1, 6, 3, 7]);
    }

    #[test]
    fn test_planning_is_deterministic() {
        for genre in Genre::ALL {
            for kids in [false, true] {
                let a = plan_progression(ScaleMode::Major, genre, kids, 110.0);
                let b = plan_progression(ScaleMode::Major, genre, kids, 110.0);
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn test_measures_and_lookup() {
        let plan = plan_progression(ScaleMode::Major, Genre::Pop, false, 120.0);
        let measures = plan.measures();
        assert_eq!(measures.len(), 16);
        assert_eq!(measures[1].degree, 5);
        assert_eq!(measures[1].next_degree, 6);
        assert_eq!(measures[15].next_degree, 1);
        assert_eq!(measures[3].start, 6.0);
        assert_eq!(plan.chord_degree_at(4.5), 6);
        assert_eq!(plan.chord_degree_at(1000.0), 4);
        assert_eq!(plan.degree_sequence()[4..8], [1, 5, 6, 4]);
    }
}
