// Moodscore Music Generator
//
// Turns a small set of affective descriptors (key, mode, tempo, rhythmic
// density, harmonic complexity, valence, arousal, genre, instrument hints,
// kids flag) into a short multi-track composition and encodes it as a
// Standard MIDI File. Everything is rule-based and procedural: a planner
// fixes the chord progression and length, then one generator per role fills
// in notes around it.
//
// Architecture:
// - params.rs: The input record (camelCase JSON) and the genre vocabulary
// - theory.rs: Note spelling, scales and modes, chord qualities, key context
// - timing.rs: Note values to seconds, including swing
// - progression.rs: Chord-degree cycle and repeat count, the piece's timeline
// - style.rs: Genre/kids style profiles that parameterize every generator
// - score.rs: Scheduled events, role tracks, and the invariant-keeping builder
// - dynamics.rs: Per-role velocity from valence, arousal and accents
// - melody.rs / bass.rs / harmony.rs / arpeggio.rs / drums.rs: The generators
// - instruments.rs: General MIDI program selection from genre and hints
// - midi.rs: SMF encoding, the base64 data URI, and the fallback file
// - compose.rs: The pipeline tying it together
//
// Composition is deterministic given a seed (`compose_seeded`).

pub mod arpeggio;
pub mod bass;
pub mod compose;
pub mod drums;
pub mod dynamics;
pub mod harmony;
pub mod instruments;
pub mod melody;
pub mod midi;
pub mod params;
pub mod progression;
pub mod score;
pub mod style;
pub mod theory;
pub mod timing;

pub use compose::{compose, compose_seeded, compose_with_rng, render_data_uri, render_midi};
pub use midi::{EncodeError, EncoderConfig, encode_data_uri, encode_smf};
pub use params::{AffectiveParameters, Genre};
pub use score::{CompositionResult, Role, ScheduledEvent, Track};
