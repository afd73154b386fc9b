// Top-level composition pipeline.
//
// Takes one `AffectiveParameters` record and produces a `CompositionResult`:
//
//   normalize -> genre -> StyleProfile -> KeyContext -> ProgressionPlan
//             -> melody / bass / chords / arpeggio / drums -> programs
//
// Every generator reads the same `GenContext` and owns nothing but the RNG it
// is handed, so a seeded RNG reproduces a composition exactly. The rendering
// helpers at the bottom chain composition into the MIDI encoder for callers
// that only want bytes or a data URI.

use crate::arpeggio::generate_arpeggio;
use crate::bass::generate_bass;
use crate::drums::generate_drums;
use crate::dynamics;
use crate::harmony::generate_chords;
use crate::instruments::{HintText, assign_programs};
use crate::melody::generate_melody;
use crate::midi::{EncoderConfig, encode_data_uri, encode_or_fallback};
use crate::params::{AffectiveParameters, Genre};
use crate::progression::{ProgressionPlan, plan_progression};
use crate::score::{CompositionResult, Role, ScheduledEvent, Track, TrackBuilder, TrackState};
use crate::style::StyleProfile;
use crate::theory::{HarmonyHints, KeyContext};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Everything a generator reads. Built once per composition.
pub struct GenContext<'a> {
    pub params: &'a AffectiveParameters,
    pub genre: Genre,
    pub plan: &'a ProgressionPlan,
    pub style: &'a StyleProfile,
    pub key: &'a KeyContext,
    /// Instrument hints and idea text, tokenized.
    pub hints: &'a HintText,
}

impl GenContext<'_> {
    pub fn kids(&self) -> bool {
        self.params.is_kids_mode
    }

    pub fn density(&self) -> f64 {
        self.params.rhythmic_density
    }

    pub fn complexity(&self) -> f64 {
        self.params.harmonic_complexity
    }

    pub fn tempo(&self) -> f64 {
        self.plan.tempo_bpm
    }

    /// Where every body must end and every outro starts.
    pub fn boundary(&self) -> f64 {
        self.plan.total_duration()
    }

    pub fn beat(&self) -> f64 {
        self.plan.beat_seconds()
    }

    pub fn measure(&self) -> f64 {
        self.plan.measure_seconds()
    }

    /// Chord voicing for a degree; sevenths per style, complexity and genre.
    pub fn chord(&self, degree: u8, octave: i32) -> Vec<u8> {
        self.key
            .chord_for_degree(degree as i32, octave, self.style.always_sevenths)
    }

    pub fn velocity(&self, role: Role, accent: bool, rng: &mut impl Rng) -> u8 {
        dynamics::velocity(
            role,
            self.params.target_valence,
            self.params.target_arousal,
            self.kids(),
            accent,
            rng,
        )
    }

    /// A fresh builder for a role bounded by the plan.
    pub fn builder(&self, role: Role) -> TrackBuilder {
        TrackBuilder::new(role, self.boundary(), TrackState::default())
    }

    /// One-measure tonic note at the boundary, shared by the single-line
    /// roles.
    pub fn push_tonic_outro(&self, builder: &mut TrackBuilder, pitch: u8, rng: &mut impl Rng) {
        let velocity = self.velocity(builder.role(), true, rng);
        builder.push_outro(ScheduledEvent::note(0.0, self.measure(), pitch, velocity).accented(true));
    }
}

/// Compose with a thread-local RNG.
pub fn compose(params: &AffectiveParameters) -> CompositionResult {
    compose_with_rng(params, &mut rand::rng())
}

/// Compose reproducibly from a seed.
pub fn compose_seeded(params: &AffectiveParameters, seed: u64) -> CompositionResult {
    compose_with_rng(params, &mut StdRng::seed_from_u64(seed))
}

pub fn compose_with_rng(params: &AffectiveParameters, rng: &mut impl Rng) -> CompositionResult {
    let params = params.normalized();
    let genre = params.genre();
    let kids = params.is_kids_mode;
    let style = StyleProfile::select(
        genre,
        kids,
        params.rhythmic_density,
        params.harmonic_complexity,
    );
    let key = KeyContext::new(
        &params.key_signature,
        &params.mode,
        HarmonyHints {
            genre: Some(genre),
            complexity: Some(params.harmonic_complexity),
            kids,
        },
    );
    let plan = plan_progression(key.base_mode, genre, kids, params.tempo());
    let hints = HintText::new(
        params
            .instrument_hints
            .iter()
            .map(String::as_str)
            .chain(params.idea_text.as_deref()),
    );
    tracing::debug!(
        genre = genre.name(),
        kids,
        mode = ?key.mode,
        measures = plan.measure_count(),
        duration = plan.total_duration(),
        "planned composition"
    );

    let ctx = GenContext {
        params: &params,
        genre,
        plan: &plan,
        style: &style,
        key: &key,
        hints: &hints,
    };

    let generated = [
        generate_melody(&ctx, style.melody_octave, rng),
        generate_bass(&ctx, style.bass_octave, rng),
        generate_chords(&ctx, style.chord_octave, rng),
        generate_arpeggio(&ctx, style.chord_octave + 1, rng),
        generate_drums(&ctx, rng),
    ];

    let programs = assign_programs(
        &params.instrument_hints,
        genre,
        kids,
        params.idea_text.as_deref(),
    );
    let tracks: Vec<Track> = generated
        .into_iter()
        .map(|g| {
            let mut track = g.track;
            track.program = programs.program_for(track.role);
            tracing::debug!(
                role = track.role.name(),
                program = track.program,
                events = track.events.len(),
                last_start = ?g.state.last_start,
                last_end = g.state.last_end,
                "generated track"
            );
            track
        })
        .collect();

    CompositionResult {
        tempo_bpm: plan.tempo_bpm,
        genre,
        is_kids_mode: kids,
        total_duration: plan.total_duration(),
        outro_duration: plan.measure_seconds(),
        plan,
        tracks,
    }
}

/// Compose and encode to Standard MIDI File bytes. Falls back to the
/// minimal one-note file if encoding fails.
pub fn render_midi(params: &AffectiveParameters) -> Vec<u8> {
    encode_or_fallback(&compose(params), &EncoderConfig::default())
}

/// Compose and encode to a `data:audio/midi;base64,...` URI.
pub fn render_data_uri(params: &AffectiveParameters) -> String {
    encode_data_uri(&compose(params), &EncoderConfig::default())
}
