// Instrument/voice mapper: General MIDI programs for the four pitched roles.
//
// Assignment is one pass over data: start from a baseline, overlay the
// genre's row, then apply the hint rule table in order. Each rule tests the
// tokenized hint text (instrument hints plus the user's idea text) and, on a
// match, sets one or more slots; a later match on the same slot wins.
//
// Kids mode swaps the baseline for a toy palette (xylophone, toy piano as
// music box, ukulele as nylon guitar, recorder) and uses its own smaller rule
// table so hints can only pick between kid-friendly timbres. Genre is ignored
// in kids mode.
//
// Drums are not a slot: they always play on channel 10 with program 0.

use crate::params::Genre;
use crate::score::Role;
use serde::{Deserialize, Serialize};

// General MIDI program numbers (0-based).
pub const ACOUSTIC_GRAND: u8 = 0;
pub const BRIGHT_PIANO: u8 = 1;
pub const ELECTRIC_PIANO: u8 = 4;
pub const GLOCKENSPIEL: u8 = 9;
pub const MUSIC_BOX: u8 = 10;
pub const VIBRAPHONE: u8 = 11;
pub const MARIMBA: u8 = 12;
pub const XYLOPHONE: u8 = 13;
pub const DRAWBAR_ORGAN: u8 = 16;
pub const ROCK_ORGAN: u8 = 18;
pub const NYLON_GUITAR: u8 = 24;
pub const STEEL_GUITAR: u8 = 25;
pub const JAZZ_GUITAR: u8 = 26;
pub const CLEAN_GUITAR: u8 = 27;
pub const MUTED_GUITAR: u8 = 28;
pub const OVERDRIVE_GUITAR: u8 = 29;
pub const DISTORTION_GUITAR: u8 = 30;
pub const ACOUSTIC_BASS: u8 = 32;
pub const FINGER_BASS: u8 = 33;
pub const PICK_BASS: u8 = 34;
pub const FRETLESS_BASS: u8 = 35;
pub const SLAP_BASS: u8 = 36;
pub const SYNTH_BASS: u8 = 38;
pub const VIOLIN: u8 = 40;
pub const CELLO: u8 = 42;
pub const HARP: u8 = 46;
pub const STRINGS: u8 = 48;
pub const SLOW_STRINGS: u8 = 49;
pub const CHOIR: u8 = 52;
pub const TRUMPET: u8 = 56;
pub const FRENCH_HORN: u8 = 60;
pub const BRASS: u8 = 61;
pub const ALTO_SAX: u8 = 65;
pub const TENOR_SAX: u8 = 66;
pub const OBOE: u8 = 68;
pub const CLARINET: u8 = 71;
pub const FLUTE: u8 = 73;
pub const RECORDER: u8 = 74;
pub const PAN_FLUTE: u8 = 75;
pub const SQUARE_LEAD: u8 = 80;
pub const SAW_LEAD: u8 = 81;
pub const WARM_PAD: u8 = 89;
pub const HALO_PAD: u8 = 94;
pub const SITAR: u8 = 104;
pub const BANJO: u8 = 105;
pub const KALIMBA: u8 = 108;
pub const STEEL_DRUMS: u8 = 114;

/// The instrument-bearing slots a hint rule can set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    Melody,
    Bass,
    Chords,
    Arpeggio,
}

/// One program per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramMap {
    pub melody: u8,
    pub bass: u8,
    pub chords: u8,
    pub arpeggio: u8,
    /// Always 0; the drum channel ignores it.
    pub drums: u8,
}

impl ProgramMap {
    const fn new(melody: u8, bass: u8, chords: u8, arpeggio: u8) -> Self {
        ProgramMap {
            melody,
            bass,
            chords,
            arpeggio,
            drums: 0,
        }
    }

    pub fn program_for(&self, role: Role) -> u8 {
        match role {
            Role::Melody => self.melody,
            Role::Bass => self.bass,
            Role::Chords => self.chords,
            Role::Arpeggio => self.arpeggio,
            Role::Drums => self.drums,
        }
    }

    fn set(&mut self, slot: Slot, program: u8) {
        let target = match slot {
            Slot::Melody => &mut self.melody,
            Slot::Bass => &mut self.bass,
            Slot::Chords => &mut self.chords,
            Slot::Arpeggio => &mut self.arpeggio,
        };
        *target = program.min(127);
    }
}

const BASELINE: ProgramMap = ProgramMap::new(ACOUSTIC_GRAND, FINGER_BASS, ACOUSTIC_GRAND, HARP);

/// Kids toy palette: xylophone lead, ukulele chords, toy-piano arpeggio.
const KIDS_PALETTE: ProgramMap = ProgramMap::new(XYLOPHONE, ACOUSTIC_BASS, NYLON_GUITAR, MUSIC_BOX);

fn genre_programs(genre: Genre) -> ProgramMap {
    match genre {
        Genre::Pop => ProgramMap {
            melody: BRIGHT_PIANO,
            ..BASELINE
        },
        Genre::Rock => ProgramMap::new(OVERDRIVE_GUITAR, PICK_BASS, DISTORTION_GUITAR, CLEAN_GUITAR),
        Genre::Jazz => ProgramMap::new(TENOR_SAX, ACOUSTIC_BASS, ELECTRIC_PIANO, VIBRAPHONE),
        Genre::Blues => ProgramMap::new(JAZZ_GUITAR, FINGER_BASS, DRAWBAR_ORGAN, ELECTRIC_PIANO),
        Genre::Funk => ProgramMap::new(CLEAN_GUITAR, SLAP_BASS, ELECTRIC_PIANO, MUTED_GUITAR),
        Genre::Soul => ProgramMap::new(ALTO_SAX, FINGER_BASS, ELECTRIC_PIANO, STRINGS),
        Genre::Reggae => ProgramMap::new(ROCK_ORGAN, FINGER_BASS, CLEAN_GUITAR, DRAWBAR_ORGAN),
        Genre::Electronic => ProgramMap::new(SAW_LEAD, SYNTH_BASS, WARM_PAD, SQUARE_LEAD),
        Genre::House => ProgramMap::new(SQUARE_LEAD, SYNTH_BASS, ELECTRIC_PIANO, SAW_LEAD),
        Genre::HipHop => ProgramMap::new(ELECTRIC_PIANO, SYNTH_BASS, ELECTRIC_PIANO, VIBRAPHONE),
        Genre::LoFi => ProgramMap {
            melody: ELECTRIC_PIANO,
            chords: ELECTRIC_PIANO,
            arpeggio: VIBRAPHONE,
            ..BASELINE
        },
        Genre::Ambient => ProgramMap::new(PAN_FLUTE, FRETLESS_BASS, HALO_PAD, HARP),
        Genre::Classical => ProgramMap::new(VIOLIN, CELLO, STRINGS, HARP),
        Genre::Cinematic => ProgramMap::new(FRENCH_HORN, CELLO, SLOW_STRINGS, HARP),
        Genre::Folk => ProgramMap::new(FLUTE, ACOUSTIC_BASS, STEEL_GUITAR, BANJO),
    }
}

/// Hint text normalized for matching: lowercase alphanumeric words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HintText {
    words: Vec<String>,
    /// Words joined with single spaces and padded, for phrase lookups.
    joined: String,
}

impl HintText {
    pub fn new<'a>(hints: impl IntoIterator<Item = &'a str>) -> Self {
        let words: Vec<String> = hints
            .into_iter()
            .flat_map(|h| h.split(|c: char| !c.is_alphanumeric()))
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();
        let joined = format!(" {} ", words.join(" "));
        HintText { words, joined }
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn has_word(&self, word: &str) -> bool {
        self.words.iter().any(|w| w == word)
    }

    pub fn has_any_word(&self, words: &[&str]) -> bool {
        words.iter().any(|w| self.has_word(w))
    }

    /// Whole-word phrase match ("electric piano" matches, "electric pianos"
    /// does not).
    pub fn has_phrase(&self, phrase: &str) -> bool {
        self.joined.contains(&format!(" {phrase} "))
    }
}

/// When a hint rule fires.
#[derive(Debug, Clone, Copy)]
pub enum HintPredicate {
    /// Any of these words appears.
    Word(&'static [&'static str]),
    /// This exact word sequence appears.
    Phrase(&'static str),
}

impl HintPredicate {
    fn matches(&self, text: &HintText) -> bool {
        match self {
            HintPredicate::Word(words) => text.has_any_word(words),
            HintPredicate::Phrase(phrase) => text.has_phrase(phrase),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HintRule {
    pub when: HintPredicate,
    pub set: &'static [(Slot, u8)],
}

const fn word(words: &'static [&'static str], set: &'static [(Slot, u8)]) -> HintRule {
    HintRule {
        when: HintPredicate::Word(words),
        set,
    }
}

const fn phrase(phrase: &'static str, set: &'static [(Slot, u8)]) -> HintRule {
    HintRule {
        when: HintPredicate::Phrase(phrase),
        set,
    }
}

// Broad families first, specific phrases after, so the specific one wins.
pub const HINT_RULES: &[HintRule] = &[
    word(&["piano", "keys"], &[(Slot::Melody, ACOUSTIC_GRAND), (Slot::Chords, ACOUSTIC_GRAND)]),
    word(&["rhodes", "epiano", "wurlitzer"], &[(Slot::Chords, ELECTRIC_PIANO)]),
    phrase("electric piano", &[(Slot::Chords, ELECTRIC_PIANO)]),
    word(&["guitar", "guitars"], &[(Slot::Chords, STEEL_GUITAR)]),
    phrase("electric guitar", &[(Slot::Melody, CLEAN_GUITAR), (Slot::Chords, OVERDRIVE_GUITAR)]),
    phrase("classical guitar", &[(Slot::Chords, NYLON_GUITAR)]),
    word(&["nylon", "ukulele", "uke"], &[(Slot::Chords, NYLON_GUITAR)]),
    word(&["distorted", "distortion", "heavy"], &[(Slot::Chords, DISTORTION_GUITAR)]),
    phrase("upright bass", &[(Slot::Bass, ACOUSTIC_BASS)]),
    phrase("double bass", &[(Slot::Bass, ACOUSTIC_BASS)]),
    phrase("synth bass", &[(Slot::Bass, SYNTH_BASS)]),
    word(&["slap"], &[(Slot::Bass, SLAP_BASS)]),
    word(&["fretless"], &[(Slot::Bass, FRETLESS_BASS)]),
    word(&["strings", "orchestra", "orchestral"], &[(Slot::Chords, STRINGS)]),
    word(&["violin", "fiddle"], &[(Slot::Melody, VIOLIN)]),
    word(&["cello"], &[(Slot::Bass, CELLO)]),
    word(&["harp"], &[(Slot::Arpeggio, HARP)]),
    word(&["flute"], &[(Slot::Melody, FLUTE)]),
    phrase("pan flute", &[(Slot::Melody, PAN_FLUTE)]),
    word(&["oboe"], &[(Slot::Melody, OBOE)]),
    word(&["clarinet"], &[(Slot::Melody, CLARINET)]),
    word(&["sax", "saxophone"], &[(Slot::Melody, ALTO_SAX)]),
    phrase("tenor sax", &[(Slot::Melody, TENOR_SAX)]),
    word(&["trumpet"], &[(Slot::Melody, TRUMPET)]),
    word(&["brass", "horns"], &[(Slot::Chords, BRASS)]),
    phrase("french horn", &[(Slot::Melody, FRENCH_HORN)]),
    word(&["organ"], &[(Slot::Chords, DRAWBAR_ORGAN)]),
    word(&["synth", "synths", "synthesizer"], &[(Slot::Melody, SAW_LEAD), (Slot::Chords, WARM_PAD)]),
    word(&["pad", "pads"], &[(Slot::Chords, WARM_PAD)]),
    word(&["choir", "vocal", "vocals", "voices"], &[(Slot::Chords, CHOIR)]),
    word(&["bells", "glockenspiel"], &[(Slot::Arpeggio, GLOCKENSPIEL)]),
    word(&["vibes", "vibraphone"], &[(Slot::Arpeggio, VIBRAPHONE)]),
    word(&["marimba"], &[(Slot::Arpeggio, MARIMBA)]),
    phrase("music box", &[(Slot::Arpeggio, MUSIC_BOX)]),
    word(&["kalimba"], &[(Slot::Melody, KALIMBA)]),
    word(&["banjo"], &[(Slot::Arpeggio, BANJO)]),
    word(&["sitar"], &[(Slot::Melody, SITAR)]),
    phrase("steel drums", &[(Slot::Melody, STEEL_DRUMS)]),
    word(&["steelpan"], &[(Slot::Melody, STEEL_DRUMS)]),
];

pub const KIDS_HINT_RULES: &[HintRule] = &[
    word(&["xylophone"], &[(Slot::Melody, XYLOPHONE)]),
    word(&["piano"], &[(Slot::Melody, MUSIC_BOX)]),
    phrase("toy piano", &[(Slot::Melody, MUSIC_BOX), (Slot::Arpeggio, MUSIC_BOX)]),
    word(&["recorder", "flute", "whistle"], &[(Slot::Melody, RECORDER)]),
    word(&["ukulele", "uke", "guitar"], &[(Slot::Chords, NYLON_GUITAR)]),
    word(&["bells", "glockenspiel"], &[(Slot::Arpeggio, GLOCKENSPIEL)]),
    phrase("music box", &[(Slot::Arpeggio, MUSIC_BOX)]),
    word(&["marimba"], &[(Slot::Arpeggio, MARIMBA)]),
];

/// Apply rules in order; a later match on a slot overrides an earlier one.
pub fn apply_rules(mut programs: ProgramMap, rules: &[HintRule], text: &HintText) -> ProgramMap {
    for rule in rules.iter().filter(|r| r.when.matches(text)) {
        for &(slot, program) in rule.set {
            programs.set(slot, program);
        }
    }
    programs
}

/// Pick programs for a request.
pub fn assign_programs(
    instrument_hints: &[String],
    genre: Genre,
    kids: bool,
    idea_text: Option<&str>,
) -> ProgramMap {
    let text = HintText::new(instrument_hints.iter().map(String::as_str).chain(idea_text));
    if kids {
        apply_rules(KIDS_PALETTE, KIDS_HINT_RULES, &text)
    } else {
        apply_rules(genre_programs(genre), HINT_RULES, &text)
    }
}
