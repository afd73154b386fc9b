// Affective input record and the genre vocabulary.
//
// The parameter step upstream (an LLM call over the user's text, image or
// drawing) produces one `AffectiveParameters` record per request. We treat it
// as opaque and already validated, but still clamp every numeric field on the
// way in: `normalized()` returns a fresh copy so the caller's value is never
// touched.
//
// Genres arrive as free text ("Lo-Fi Hip Hop", "EDM", "r&b"). `Genre::parse`
// folds them onto the fixed set of genres the style tables know about; an
// empty or unknown genre plays as pop.

use serde::{Deserialize, Serialize};

/// Slowest tempo we will render.
pub const MIN_TEMPO_BPM: u32 = 30;
/// Fastest tempo we will render.
pub const MAX_TEMPO_BPM: u32 = 300;

/// Musical genres the style, drum, and instrument tables are keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Genre {
    Pop,
    Rock,
    Jazz,
    Blues,
    Funk,
    Soul,
    Reggae,
    Electronic,
    House,
    HipHop,
    LoFi,
    Ambient,
    Classical,
    Cinematic,
    Folk,
}

impl Genre {
    pub const ALL: [Genre; 15] = [
        Genre::Pop,
        Genre::Rock,
        Genre::Jazz,
        Genre::Blues,
        Genre::Funk,
        Genre::Soul,
        Genre::Reggae,
        Genre::Electronic,
        Genre::House,
        Genre::HipHop,
        Genre::LoFi,
        Genre::Ambient,
        Genre::Classical,
        Genre::Cinematic,
        Genre::Folk,
    ];

    /// Fold free-text genre names onto a `Genre`.
    ///
    /// Exact names and aliases are tried first, then substring matches in a
    /// fixed order (so "indie rock" is rock and "lofi hip hop" is lo-fi).
    /// `None`, empty, or unrecognized text resolves to `Genre::Pop`.
    pub fn parse(name: Option<&str>) -> Genre {
        let Some(name) = name else {
            return Genre::Pop;
        };
        let key: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if key.is_empty() {
            return Genre::Pop;
        }
        if let Some(&(_, genre)) = GENRE_ALIASES.iter().find(|(alias, _)| *alias == key) {
            return genre;
        }
        GENRE_FRAGMENTS
            .iter()
            .find(|(fragment, _)| key.contains(fragment))
            .map(|&(_, genre)| genre)
            .unwrap_or(Genre::Pop)
    }

    pub fn name(self) -> &'static str {
        match self {
            Genre::Pop => "pop",
            Genre::Rock => "rock",
            Genre::Jazz => "jazz",
            Genre::Blues => "blues",
            Genre::Funk => "funk",
            Genre::Soul => "soul",
            Genre::Reggae => "reggae",
            Genre::Electronic => "electronic",
            Genre::House => "house",
            Genre::HipHop => "hip-hop",
            Genre::LoFi => "lo-fi",
            Genre::Ambient => "ambient",
            Genre::Classical => "classical",
            Genre::Cinematic => "cinematic",
            Genre::Folk => "folk",
        }
    }
}

const GENRE_ALIASES: &[(&str, Genre)] = &[
    ("pop", Genre::Pop),
    ("rock", Genre::Rock),
    ("jazz", Genre::Jazz),
    ("blues", Genre::Blues),
    ("funk", Genre::Funk),
    ("soul", Genre::Soul),
    ("rnb", Genre::Soul),
    ("rb", Genre::Soul),
    ("reggae", Genre::Reggae),
    ("dub", Genre::Reggae),
    ("ska", Genre::Reggae),
    ("electronic", Genre::Electronic),
    ("edm", Genre::Electronic),
    ("techno", Genre::Electronic),
    ("trance", Genre::Electronic),
    ("synthwave", Genre::Electronic),
    ("dance", Genre::Electronic),
    ("house", Genre::House),
    ("hiphop", Genre::HipHop),
    ("rap", Genre::HipHop),
    ("trap", Genre::HipHop),
    ("lofi", Genre::LoFi),
    ("chillhop", Genre::LoFi),
    ("ambient", Genre::Ambient),
    ("newage", Genre::Ambient),
    ("classical", Genre::Classical),
    ("baroque", Genre::Classical),
    ("cinematic", Genre::Cinematic),
    ("orchestral", Genre::Cinematic),
    ("soundtrack", Genre::Cinematic),
    ("folk", Genre::Folk),
    ("country", Genre::Folk),
    ("acoustic", Genre::Folk),
    ("metal", Genre::Rock),
    ("punk", Genre::Rock),
];

// Order matters: more specific fragments first.
const GENRE_FRAGMENTS: &[(&str, Genre)] = &[
    ("lofi", Genre::LoFi),
    ("chill", Genre::LoFi),
    ("hiphop", Genre::HipHop),
    ("house", Genre::House),
    ("techno", Genre::Electronic),
    ("electro", Genre::Electronic),
    ("synth", Genre::Electronic),
    ("jazz", Genre::Jazz),
    ("blues", Genre::Blues),
    ("funk", Genre::Funk),
    ("soul", Genre::Soul),
    ("reggae", Genre::Reggae),
    ("ambient", Genre::Ambient),
    ("classical", Genre::Classical),
    ("orchestr", Genre::Cinematic),
    ("cinema", Genre::Cinematic),
    ("film", Genre::Cinematic),
    ("folk", Genre::Folk),
    ("country", Genre::Folk),
    ("rock", Genre::Rock),
    ("metal", Genre::Rock),
    ("pop", Genre::Pop),
];

/// The affective descriptors for one composition request.
///
/// Field names follow the camelCase JSON the parameter step emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectiveParameters {
    pub key_signature: String,
    pub mode: String,
    pub tempo_bpm: u32,
    #[serde(default)]
    pub mood_tags: Vec<String>,
    /// Free-text instrument hints, in the order the user gave them.
    #[serde(default)]
    pub instrument_hints: Vec<String>,
    /// 0 = sparse, 1 = busy.
    pub rhythmic_density: f64,
    /// 0 = plain triads, 1 = extended harmony.
    pub harmonic_complexity: f64,
    /// -1 = negative, 1 = positive.
    pub target_valence: f64,
    /// -1 = calm, 1 = energetic.
    pub target_arousal: f64,
    #[serde(default)]
    pub selected_genre: Option<String>,
    #[serde(default)]
    pub is_kids_mode: bool,
    /// The user's original idea text, if the caller has it. Only the
    /// instrument mapper reads it.
    #[serde(default)]
    pub idea_text: Option<String>,
}

impl Default for AffectiveParameters {
    fn default() -> Self {
        AffectiveParameters {
            key_signature: "C".to_string(),
            mode: "major".to_string(),
            tempo_bpm: 120,
            mood_tags: Vec::new(),
            instrument_hints: Vec::new(),
            rhythmic_density: 0.5,
            harmonic_complexity: 0.3,
            target_valence: 0.0,
            target_arousal: 0.0,
            selected_genre: None,
            is_kids_mode: false,
            idea_text: None,
        }
    }
}

impl AffectiveParameters {
    /// Parse the JSON record produced by the parameter step.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// A copy with every numeric field clamped into its documented range.
    /// Non-finite values fall back to the neutral default.
    pub fn normalized(&self) -> AffectiveParameters {
        AffectiveParameters {
            tempo_bpm: self.tempo_bpm.clamp(MIN_TEMPO_BPM, MAX_TEMPO_BPM),
            rhythmic_density: unit(self.rhythmic_density, 0.5),
            harmonic_complexity: unit(self.harmonic_complexity, 0.3),
            target_valence: signed_unit(self.target_valence),
            target_arousal: signed_unit(self.target_arousal),
            ..self.clone()
        }
    }

    pub fn genre(&self) -> Genre {
        Genre::parse(self.selected_genre.as_deref())
    }

    pub fn tempo(&self) -> f64 {
        self.tempo_bpm.clamp(MIN_TEMPO_BPM, MAX_TEMPO_BPM) as f64
    }
}

fn unit(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

fn signed_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genre_parse_aliases() {
        assert_eq!(Genre::parse(Some("Pop")), Genre::Pop);
        assert_eq!(Genre::parse(Some("EDM")), Genre::Electronic);
        assert_eq!(Genre::parse(Some("R&B")), Genre::Soul);
        assert_eq!(Genre::parse(Some("Lo-Fi Hip Hop")), Genre::LoFi);
        assert_eq!(Genre::parse(Some("indie rock")), Genre::Rock);
        assert_eq!(Genre::parse(Some("Deep House")), Genre::House);
        assert_eq!(Genre::parse(Some("Hip-Hop")), Genre::HipHop);
    }

    #[test]
    fn test_genre_parse_defaults_to_pop() {
        assert_eq!(Genre::parse(None), Genre::Pop);
        assert_eq!(Genre::parse(Some("")), Genre::Pop);
        assert_eq!(Genre::parse(Some("!!!")), Genre::Pop);
        assert_eq!(Genre::parse(Some("gregorian polka")), Genre::Pop);
    }

    #[test]
    fn test_every_genre_name_parses_back() {
        for genre in Genre::ALL {
            assert_eq!(Genre::parse(Some(genre.name())), genre);
        }
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "keySignature": "A",
            "mode": "minor",
            "tempoBpm": 90,
            "moodTags": ["wistful"],
            "instrumentHints": ["cello", "soft piano"],
            "rhythmicDensity": 0.4,
            "harmonicComplexity": 0.7,
            "targetValence": -0.3,
            "targetArousal": 0.1,
            "selectedGenre": "Classical",
            "isKidsMode": false
        }"#;
        let params = AffectiveParameters::from_json(json).unwrap();
        assert_eq!(params.key_signature, "A");
        assert_eq!(params.tempo_bpm, 90);
        assert_eq!(params.instrument_hints, vec!["cello", "soft piano"]);
        assert_eq!(params.genre(), Genre::Classical);
        assert_eq!(params.idea_text, None);
    }

    #[test]
    fn test_from_json_optional_fields() {
        let json = r#"{
            "keySignature": "C", "mode": "major", "tempoBpm": 120,
            "rhythmicDensity": 0.5, "harmonicComplexity": 0.3,
            "targetValence": 0.5, "targetArousal": 0.2
        }"#;
        let params = AffectiveParameters::from_json(json).unwrap();
        assert!(params.mood_tags.is_empty());
        assert!(!params.is_kids_mode);
        assert_eq!(params.genre(), Genre::Pop);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(AffectiveParameters::from_json("{not json").is_err());
    }

    #[test]
    fn test_normalized_clamps_without_mutating() {
        let params = AffectiveParameters {
            tempo_bpm: 999,
            rhythmic_density: 3.0,
            harmonic_complexity: f64::NAN,
            target_valence: -7.0,
            target_arousal: f64::INFINITY,
            ..Default::default()
        };
        let normalized = params.normalized();
        assert_eq!(normalized.tempo_bpm, MAX_TEMPO_BPM);
        assert_eq!(normalized.rhythmic_density, 1.0);
        assert_eq!(normalized.harmonic_complexity, 0.3);
        assert_eq!(normalized.target_valence, -1.0);
        assert_eq!(normalized.target_arousal, 0.0);
        assert_eq!(params.tempo_bpm, 999);
    }
}
