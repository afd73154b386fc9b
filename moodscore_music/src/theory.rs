// Music theory kernel: pitch spelling, scales, and diatonic chords.
//
// Everything downstream speaks MIDI note numbers (`u8`, 0-127). This module
// turns the loose text the parameter step hands us ("F# minor", "Bb3",
// "dorian") into pitches, and builds scales and chords from a tonic plus a
// mode. Scale and chord construction share one interval table per mode;
// chord qualities for a degree come from stacking diatonic thirds in the
// mode's parent seven-note scale, then applying genre overrides.
//
// Every public function here is total. A bad spelling or an unknown mode
// resolves to a documented default (C4 / major) so a single bad lookup never
// aborts composition.
//
// Used by progression.rs (mode family), all the track generators (scales,
// chord tones, snapping), and compose.rs (KeyContext construction).

use crate::params::Genre;
use serde::{Deserialize, Serialize};

/// Pitch returned for any spelling that cannot be parsed (C4).
pub const DEFAULT_PITCH: u8 = 60;

/// Octave assumed when a note name has no octave number.
pub const DEFAULT_OCTAVE: i32 = 4;

const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Parse a note name such as `"C4"`, `"Bb3"`, `"F##2"`, `"E♭"` or `"C-1"`.
///
/// Accidentals may repeat: `#`, `♯`, `s` and `x` (double sharp) raise,
/// `b` and `♭` lower. A missing octave means octave 4. Enharmonic spellings
/// cross octave lines the way they sound (`B#3` is 60, `Cb4` is 59).
/// Anything unparseable or outside 0-127 returns [`DEFAULT_PITCH`].
pub fn note_to_midi(name: &str) -> u8 {
    parse_note(name).unwrap_or(DEFAULT_PITCH)
}

fn parse_note(name: &str) -> Option<u8> {
    let (pitch_class, rest) = parse_spelling(name.trim())?;
    let octave: i32 = if rest.is_empty() {
        DEFAULT_OCTAVE
    } else {
        rest.parse().ok()?
    };
    let midi = octave
        .checked_add(1)?
        .checked_mul(12)?
        .checked_add(pitch_class)?;
    u8::try_from(midi).ok().filter(|&p| p <= 127)
}

/// Split a spelling into (letter + accidental offset, remainder).
/// The offset is not folded into 0-11 so enharmonic edges keep their octave.
fn parse_spelling(text: &str) -> Option<(i32, &str)> {
    let mut chars = text.char_indices();
    let (_, letter) = chars.next()?;
    let base = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let mut offset: i32 = 0;
    let mut rest_start = text.len();
    for (i, c) in chars {
        match c {
            '#' | '♯' | 's' => offset += 1,
            'x' => offset += 2,
            'b' | '♭' => offset -= 1,
            _ => {
                rest_start = i;
                break;
            }
        }
        if offset.abs() > 24 {
            return None;
        }
    }
    Some((base + offset, &text[rest_start..]))
}

/// Spell a MIDI pitch with sharps only, e.g. 61 -> `"C#4"`.
///
/// Input is clamped to 0-127 first, so `note_to_midi(&midi_to_note_name(p))`
/// returns `p` for every valid pitch.
pub fn midi_to_note_name(pitch: i32) -> String {
    let p = pitch.clamp(0, 127);
    format!("{}{}", SHARP_NAMES[(p % 12) as usize], p / 12 - 1)
}

/// Tonic pitch class (0 = C) of a key signature like `"C"`, `"F# minor"`,
/// `"Bbm"`. Unparseable keys resolve to C.
pub fn pitch_class_of_key(key_signature: &str) -> u8 {
    parse_spelling(key_signature.trim())
        .map(|(pc, _)| pc.rem_euclid(12) as u8)
        .unwrap_or(0)
}

/// Whether a key signature string itself says "minor" (`"Am"`, `"C# min"`,
/// `"E minor"`). Used only when the mode field is unrecognized.
pub fn key_implies_minor(key_signature: &str) -> bool {
    let Some((_, rest)) = parse_spelling(key_signature.trim()) else {
        return false;
    };
    let rest = rest.trim().to_ascii_lowercase();
    rest == "m" || rest.starts_with("min") || rest.starts_with("m ")
}

/// Scale modes the kernel knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScaleMode {
    Major,
    Minor,
    HarmonicMinor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Locrian,
    Blues,
    MajorPentatonic,
    MinorPentatonic,
}

impl ScaleMode {
    /// Semitone offsets from the tonic, ascending, without the octave.
    pub fn intervals(self) -> &'static [u8] {
        match self {
            ScaleMode::Major => &[0, 2, 4, 5, 7, 9, 11],
            ScaleMode::Minor => &[0, 2, 3, 5, 7, 8, 10],
            ScaleMode::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
            ScaleMode::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            ScaleMode::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            ScaleMode::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            ScaleMode::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            ScaleMode::Locrian => &[0, 1, 3, 5, 6, 8, 10],
            ScaleMode::Blues => &[0, 3, 5, 6, 7, 10],
            ScaleMode::MajorPentatonic => &[0, 2, 4, 7, 9],
            ScaleMode::MinorPentatonic => &[0, 3, 5, 7, 10],
        }
    }

    /// Parse a mode name. Case, spaces, `-` and `_` are ignored.
    /// Returns `None` for names we don't recognize; callers default to major.
    pub fn parse(name: &str) -> Option<ScaleMode> {
        let normalized: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let mode = match normalized.as_str() {
            "major" | "maj" | "ionian" => ScaleMode::Major,
            "minor" | "min" | "aeolian" | "naturalminor" => ScaleMode::Minor,
            "harmonicminor" => ScaleMode::HarmonicMinor,
            "dorian" => ScaleMode::Dorian,
            "phrygian" => ScaleMode::Phrygian,
            "lydian" => ScaleMode::Lydian,
            "mixolydian" => ScaleMode::Mixolydian,
            "locrian" => ScaleMode::Locrian,
            "blues" => ScaleMode::Blues,
            "pentatonic" | "majorpentatonic" => ScaleMode::MajorPentatonic,
            "minorpentatonic" => ScaleMode::MinorPentatonic,
            _ => return None,
        };
        Some(mode)
    }

    /// True for modes whose third is minor.
    pub fn is_minor_family(self) -> bool {
        matches!(
            self,
            ScaleMode::Minor
                | ScaleMode::HarmonicMinor
                | ScaleMode::Dorian
                | ScaleMode::Phrygian
                | ScaleMode::Locrian
                | ScaleMode::Blues
                | ScaleMode::MinorPentatonic
        )
    }

    /// The seven-note mode used to stack chords. Gapped scales borrow
    /// the harmony of the scale they are carved from.
    pub fn parent_heptatonic(self) -> ScaleMode {
        match self {
            ScaleMode::MajorPentatonic => ScaleMode::Major,
            ScaleMode::MinorPentatonic => ScaleMode::Minor,
            ScaleMode::Blues => ScaleMode::Mixolydian,
            other => other,
        }
    }
}

/// Optional context that bends scale and chord choices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HarmonyHints {
    pub genre: Option<Genre>,
    /// Harmonic complexity in [0, 1].
    pub complexity: Option<f64>,
    pub kids: bool,
}

impl HarmonyHints {
    fn forces_seventh(&self) -> bool {
        self.complexity.is_some_and(|c| c >= 0.6)
    }
}

/// Apply genre/kids substitutions to a requested mode.
///
/// Kids mode collapses to the pentatonic of the same family, blues (at
/// moderate complexity and up) uses the blues scale, and minor jazz is
/// played dorian.
pub fn resolve_scale_mode(base: ScaleMode, hints: &HarmonyHints) -> ScaleMode {
    if hints.kids {
        return if base.is_minor_family() {
            ScaleMode::MinorPentatonic
        } else {
            ScaleMode::MajorPentatonic
        };
    }
    match hints.genre {
        Some(Genre::Blues) if hints.complexity.unwrap_or(0.5) >= 0.4 => ScaleMode::Blues,
        Some(Genre::Jazz) if base == ScaleMode::Minor => ScaleMode::Dorian,
        _ => base,
    }
}

/// MIDI pitch of a pitch class in a given octave (C4 = 60), clamped.
pub fn pitch_in_octave(pitch_class: u8, octave: i32) -> u8 {
    ((octave + 1) * 12 + pitch_class as i32).clamp(0, 127) as u8
}

/// Build one register of a scale: tonic up to the tonic an octave higher.
/// Yields 6-8 pitches depending on the mode.
pub fn scale_notes(key: &str, mode: &str, octave: i32, hints: &HarmonyHints) -> Vec<u8> {
    let base = ScaleMode::parse(mode).unwrap_or(ScaleMode::Major);
    let resolved = resolve_scale_mode(base, hints);
    scale_from(pitch_class_of_key(key), resolved, octave)
}

fn scale_from(tonic_pc: u8, mode: ScaleMode, octave: i32) -> Vec<u8> {
    let root = (octave + 1) * 12 + tonic_pc as i32;
    mode.intervals()
        .iter()
        .map(|&iv| root + iv as i32)
        .chain(std::iter::once(root + 12))
        .map(|p| p.clamp(0, 127) as u8)
        .collect()
}

/// Chord qualities, each a fixed interval stack above the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChordQuality {
    Major,
    Minor,
    Diminished,
    Augmented,
    Major7,
    Dominant7,
    Minor7,
    MinorMajor7,
    HalfDiminished7,
    Diminished7,
    AugmentedMajor7,
}

impl ChordQuality {
    pub fn intervals(self) -> &'static [u8] {
        match self {
            ChordQuality::Major => &[0, 4, 7],
            ChordQuality::Minor => &[0, 3, 7],
            ChordQuality::Diminished => &[0, 3, 6],
            ChordQuality::Augmented => &[0, 4, 8],
            ChordQuality::Major7 => &[0, 4, 7, 11],
            ChordQuality::Dominant7 => &[0, 4, 7, 10],
            ChordQuality::Minor7 => &[0, 3, 7, 10],
            ChordQuality::MinorMajor7 => &[0, 3, 7, 11],
            ChordQuality::HalfDiminished7 => &[0, 3, 6, 10],
            ChordQuality::Diminished7 => &[0, 3, 6, 9],
            ChordQuality::AugmentedMajor7 => &[0, 4, 8, 11],
        }
    }

    pub fn is_seventh(self) -> bool {
        self.intervals().len() == 4
    }

    /// The four-note extension of a triad. Major triads take a major
    /// seventh here; dominant function is decided by degree, not quality.
    pub fn with_seventh(self) -> ChordQuality {
        match self {
            ChordQuality::Major => ChordQuality::Major7,
            ChordQuality::Minor => ChordQuality::Minor7,
            ChordQuality::Diminished => ChordQuality::HalfDiminished7,
            ChordQuality::Augmented => ChordQuality::AugmentedMajor7,
            seventh => seventh,
        }
    }

    /// Parse a chord symbol suffix (`""`, `"m"`, `"dim"`, `"7"`, `"maj7"`,
    /// `"m7b5"`, ...). Unknown suffixes return `None`.
    pub fn parse(symbol: &str) -> Option<ChordQuality> {
        let quality = match symbol.trim() {
            "" | "M" | "maj" | "major" => ChordQuality::Major,
            "m" | "min" | "minor" | "-" => ChordQuality::Minor,
            "dim" | "°" | "o" => ChordQuality::Diminished,
            "aug" | "+" => ChordQuality::Augmented,
            "maj7" | "M7" | "Δ" => ChordQuality::Major7,
            "7" | "dom7" => ChordQuality::Dominant7,
            "m7" | "min7" | "-7" => ChordQuality::Minor7,
            "mM7" | "mmaj7" => ChordQuality::MinorMajor7,
            "m7b5" | "ø" | "ø7" => ChordQuality::HalfDiminished7,
            "dim7" | "°7" | "o7" => ChordQuality::Diminished7,
            "augmaj7" | "+M7" => ChordQuality::AugmentedMajor7,
            _ => return None,
        };
        Some(quality)
    }

    fn classify(third: u8, fifth: u8, seventh: Option<u8>) -> ChordQuality {
        match (third, fifth, seventh) {
            (4, 7, None) => ChordQuality::Major,
            (3, 7, None) => ChordQuality::Minor,
            (3, 6, None) => ChordQuality::Diminished,
            (4, 8, None) => ChordQuality::Augmented,
            (4, 7, Some(11)) => ChordQuality::Major7,
            (4, 7, Some(10)) => ChordQuality::Dominant7,
            (3, 7, Some(10)) => ChordQuality::Minor7,
            (3, 7, Some(11)) => ChordQuality::MinorMajor7,
            (3, 6, Some(10)) => ChordQuality::HalfDiminished7,
            (3, 6, Some(9)) => ChordQuality::Diminished7,
            (4, 8, Some(11)) => ChordQuality::AugmentedMajor7,
            (_, _, None) => ChordQuality::Major,
            (_, _, Some(_)) => ChordQuality::Dominant7,
        }
    }
}

fn chord_pitches(root: i32, quality: ChordQuality) -> Vec<u8> {
    quality
        .intervals()
        .iter()
        .map(|&iv| (root + iv as i32).clamp(0, 127) as u8)
        .collect()
}

/// Build a chord from a root spelling and a quality, in root position.
///
/// A seventh is added when `add_seventh` is set or the hints carry a
/// complexity of 0.6 or more. Unparseable roots resolve to C.
pub fn chord_notes(
    root: &str,
    quality: ChordQuality,
    octave: i32,
    add_seventh: bool,
    hints: &HarmonyHints,
) -> Vec<u8> {
    let quality = if add_seventh || hints.forces_seventh() {
        quality.with_seventh()
    } else {
        quality
    };
    let root_pitch = pitch_in_octave(pitch_class_of_key(root), octave);
    chord_pitches(root_pitch as i32, quality)
}

/// Fold any degree into 1-7 (0 -> 7, 8 -> 1).
pub fn fold_degree(degree: i32) -> u8 {
    ((degree - 1).rem_euclid(7) + 1) as u8
}

/// A resolved key: tonic, the mode as requested, and the mode actually
/// played after genre/kids substitution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyContext {
    pub tonic_pc: u8,
    /// Mode as requested, before substitution. Decides progression family.
    pub base_mode: ScaleMode,
    /// Mode used for melodic material.
    pub mode: ScaleMode,
    pub hints: HarmonyHints,
}

impl KeyContext {
    /// Resolve a key signature and mode name. An unknown mode falls back to
    /// what the key string implies (`"Am"`), then to major.
    pub fn new(key_signature: &str, mode: &str, hints: HarmonyHints) -> Self {
        let base_mode = ScaleMode::parse(mode).unwrap_or(if key_implies_minor(key_signature) {
            ScaleMode::Minor
        } else {
            ScaleMode::Major
        });
        KeyContext {
            tonic_pc: pitch_class_of_key(key_signature),
            base_mode,
            mode: resolve_scale_mode(base_mode, &hints),
            hints,
        }
    }

    pub fn tonic_pitch(&self, octave: i32) -> u8 {
        pitch_in_octave(self.tonic_pc, octave)
    }

    /// One register of the played scale, tonic to octave.
    pub fn scale(&self, octave: i32) -> Vec<u8> {
        scale_from(self.tonic_pc, self.mode, octave)
    }

    pub fn is_in_scale(&self, pitch: u8) -> bool {
        let pc = (pitch % 12 + 12 - self.tonic_pc) % 12;
        self.mode.intervals().contains(&pc)
    }

    /// Every in-scale pitch in `low..=high`.
    pub fn scale_span(&self, low: u8, high: u8) -> Vec<u8> {
        (low..=high.min(127)).filter(|&p| self.is_in_scale(p)).collect()
    }

    /// Snap a pitch to the nearest in-scale pitch, preferring downward.
    pub fn snap_to_scale(&self, pitch: u8) -> u8 {
        if self.is_in_scale(pitch) {
            return pitch;
        }
        for offset in 1u8..=6 {
            if pitch >= offset && self.is_in_scale(pitch - offset) {
                return pitch - offset;
            }
            if pitch <= 127 - offset && self.is_in_scale(pitch + offset) {
                return pitch + offset;
            }
        }
        pitch
    }

    /// Chord quality for a degree: diatonic thirds stacked in the parent
    /// mode, then genre overrides.
    pub fn degree_quality(&self, degree: i32, add_seventh: bool) -> ChordQuality {
        let degree = fold_degree(degree);
        let add_seventh = add_seventh || self.hints.forces_seventh();
        let genre = self.hints.genre;

        if genre == Some(Genre::Blues) && !self.hints.kids && matches!(degree, 1 | 4 | 5) {
            return ChordQuality::Dominant7;
        }
        if degree == 5
            && self.base_mode.is_minor_family()
            && matches!(genre, Some(Genre::Jazz) | Some(Genre::Classical))
        {
            return if add_seventh {
                ChordQuality::Dominant7
            } else {
                ChordQuality::Major
            };
        }

        let parent = self.mode.parent_heptatonic().intervals();
        let d = (degree - 1) as usize;
        let tone = |k: usize| parent[(d + k) % 7] as i32 + 12 * ((d + k) / 7) as i32;
        let root = tone(0);
        let third = (tone(2) - root) as u8;
        let fifth = (tone(4) - root) as u8;
        let seventh = add_seventh.then(|| (tone(6) - root) as u8);
        ChordQuality::classify(third, fifth, seventh)
    }

    /// Root-position chord for a degree (1-7, folded) in the given octave.
    pub fn chord_for_degree(&self, degree: i32, octave: i32, add_seventh: bool) -> Vec<u8> {
        let folded = fold_degree(degree);
        let parent = self.mode.parent_heptatonic().intervals();
        let root = (octave + 1) * 12
            + self.tonic_pc as i32
            + parent[(folded - 1) as usize] as i32;
        chord_pitches(root, self.degree_quality(folded as i32, add_seventh))
    }
}

/// Index of the scale pitch closest to `pitch` (ties go low).
/// Returns 0 for an empty scale.
pub fn nearest_index(scale: &[u8], pitch: u8) -> usize {
    scale
        .iter()
        .enumerate()
        .min_by_key(|&(_, &p)| (p as i16 - pitch as i16).unsigned_abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}
