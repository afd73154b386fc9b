// The score model: scheduled events, per-role tracks, and the track builder.
//
// A composition is five role tracks (melody, bass, chords, arpeggio, drums),
// each a list of events with absolute start times in seconds. Every generator
// emits through a `TrackBuilder`, which is where the track invariants live:
//
// - start times strictly increase (ties are nudged forward by TIE_EPSILON)
// - pitches and velocities are clamped to 0-127
// - nothing starts at or after the plan boundary; an event running past it
//   is clipped, or dropped if what's left is shorter than MIN_AUDIBLE
// - exactly one outro event may sit at the boundary itself
//
// Monotonicity state (`TrackState`) is owned by the builder and handed back
// with the finished track, so generators carry no hidden trackers.
//
// MIDI is derived from this model (midi.rs), never the other way around.

use crate::params::Genre;
use crate::progression::ProgressionPlan;
use serde::{Deserialize, Serialize};

/// Forward nudge applied to a start time that doesn't exceed its predecessor.
pub const TIE_EPSILON: f64 = 0.001;

/// Clipped events shorter than this are dropped instead.
pub const MIN_AUDIBLE: f64 = 0.04;

/// MIDI channel index reserved for percussion (channel 10).
pub const DRUM_CHANNEL: u8 = 9;

/// The five musical roles, in track order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Melody = 0,
    Bass = 1,
    Chords = 2,
    Arpeggio = 3,
    Drums = 4,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Melody,
        Role::Bass,
        Role::Chords,
        Role::Arpeggio,
        Role::Drums,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::Melody => "Melody",
            Role::Bass => "Bass",
            Role::Chords => "Chords",
            Role::Arpeggio => "Arpeggio",
            Role::Drums => "Drums",
        }
    }

    /// Zero-based MIDI channel. Drums always use channel 10.
    pub fn channel(self) -> u8 {
        match self {
            Role::Drums => DRUM_CHANNEL,
            other => other as u8,
        }
    }
}

/// One struck percussion instrument inside a percussion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrumHit {
    /// General MIDI percussion key (35-81).
    pub key: u8,
    pub velocity: u8,
}

/// What an event sounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// A single pitch (melody, bass, arpeggio).
    Note { pitch: u8 },
    /// Several pitches struck together (chord stab or pad).
    Chord { pitches: Vec<u8> },
    /// Drum-kit pieces struck together.
    Percussion { hits: Vec<DrumHit> },
}

impl EventKind {
    /// Every MIDI key this event sounds, pitches or percussion keys alike.
    pub fn keys(&self) -> Vec<u8> {
        match self {
            EventKind::Note { pitch } => vec![*pitch],
            EventKind::Chord { pitches } => pitches.clone(),
            EventKind::Percussion { hits } => hits.iter().map(|h| h.key).collect(),
        }
    }

    fn clamp(&mut self) {
        match self {
            EventKind::Note { pitch } => *pitch = (*pitch).min(127),
            EventKind::Chord { pitches } => {
                for p in pitches.iter_mut() {
                    *p = (*p).min(127);
                }
                pitches.dedup();
            }
            EventKind::Percussion { hits } => {
                for h in hits.iter_mut() {
                    h.key = h.key.min(127);
                    h.velocity = h.velocity.min(127);
                }
            }
        }
    }

    fn is_silent(&self) -> bool {
        match self {
            EventKind::Note { .. } => false,
            EventKind::Chord { pitches } => pitches.is_empty(),
            EventKind::Percussion { hits } => hits.is_empty(),
        }
    }
}

/// A single event on a track's timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    /// Start, in seconds from the top of the piece.
    pub time: f64,
    /// Length in seconds.
    pub duration: f64,
    pub velocity: u8,
    /// Metrically or phrase-accented.
    pub accent: bool,
    /// The closing cadence event placed at the plan boundary.
    pub outro: bool,
    pub kind: EventKind,
}

impl ScheduledEvent {
    pub fn note(time: f64, duration: f64, pitch: u8, velocity: u8) -> Self {
        ScheduledEvent {
            time,
            duration,
            velocity,
            accent: false,
            outro: false,
            kind: EventKind::Note { pitch },
        }
    }

    pub fn chord(time: f64, duration: f64, pitches: Vec<u8>, velocity: u8) -> Self {
        ScheduledEvent {
            time,
            duration,
            velocity,
            accent: false,
            outro: false,
            kind: EventKind::Chord { pitches },
        }
    }

    /// A percussion event; its velocity is the loudest hit's.
    pub fn percussion(time: f64, duration: f64, hits: Vec<DrumHit>) -> Self {
        let velocity = hits.iter().map(|h| h.velocity).max().unwrap_or(0);
        ScheduledEvent {
            time,
            duration,
            velocity,
            accent: false,
            outro: false,
            kind: EventKind::Percussion { hits },
        }
    }

    pub fn accented(mut self, accent: bool) -> Self {
        self.accent = accent;
        self
    }

    pub fn end(&self) -> f64 {
        self.time + self.duration
    }
}

/// One role's finished event list plus its General MIDI program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub role: Role,
    /// GM program number (0-127). Ignored on the drum channel.
    pub program: u8,
    pub events: Vec<ScheduledEvent>,
}

impl Track {
    pub fn new(role: Role) -> Self {
        Track {
            role,
            program: 0,
            events: Vec::new(),
        }
    }

    pub fn channel(&self) -> u8 {
        self.role.channel()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The events before the outro.
    pub fn body(&self) -> impl Iterator<Item = &ScheduledEvent> {
        self.events.iter().filter(|e| !e.outro)
    }

    pub fn outro(&self) -> Option<&ScheduledEvent> {
        self.events.iter().find(|e| e.outro)
    }
}

/// Monotonicity bookkeeping threaded through a generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackState {
    /// Start of the most recent accepted event.
    pub last_start: Option<f64>,
    /// Latest end time of any accepted event.
    pub last_end: f64,
}

/// A generator's output: the track and the state it finished in.
#[derive(Debug, Clone)]
pub struct GeneratedTrack {
    pub track: Track,
    pub state: TrackState,
}

/// Accumulates one track's events while enforcing the track invariants.
pub struct TrackBuilder {
    track: Track,
    boundary: f64,
    state: TrackState,
    outro_placed: bool,
}

impl TrackBuilder {
    /// Start a track whose body must end by `boundary` seconds.
    pub fn new(role: Role, boundary: f64, state: TrackState) -> Self {
        TrackBuilder {
            track: Track::new(role),
            boundary,
            state,
            outro_placed: false,
        }
    }

    pub fn role(&self) -> Role {
        self.track.role
    }

    pub fn boundary(&self) -> f64 {
        self.boundary
    }

    /// Add a body event. Returns false if it was dropped.
    pub fn push(&mut self, event: ScheduledEvent) -> bool {
        self.accept(event, false)
    }

    /// Add a body event for a monophonic line: the start is also pushed
    /// past the previous event's end so notes never overlap.
    pub fn push_monophonic(&mut self, event: ScheduledEvent) -> bool {
        self.accept(event, true)
    }

    fn accept(&mut self, mut event: ScheduledEvent, monophonic: bool) -> bool {
        if self.outro_placed
            || !event.time.is_finite()
            || !event.duration.is_finite()
            || event.duration <= 0.0
            || event.kind.is_silent()
        {
            return false;
        }

        let mut time = event.time.max(0.0);
        if monophonic && self.state.last_start.is_some() && time <= self.state.last_end {
            time = self.state.last_end + TIE_EPSILON;
        }
        if let Some(last) = self.state.last_start {
            if time <= last {
                time = last + TIE_EPSILON;
            }
        }
        if time >= self.boundary {
            return false;
        }

        let duration = event.duration.min(self.boundary - time);
        if duration < MIN_AUDIBLE {
            return false;
        }

        event.time = time;
        event.duration = duration;
        event.velocity = event.velocity.min(127);
        event.outro = false;
        event.kind.clamp();
        self.record(event);
        true
    }

    /// Place the closing event exactly at the boundary. Only the first call
    /// per track is accepted; body pushes are refused afterwards.
    pub fn push_outro(&mut self, mut event: ScheduledEvent) -> bool {
        if self.outro_placed || !event.duration.is_finite() || event.duration <= 0.0 {
            return false;
        }
        if self.state.last_start.is_some_and(|last| last >= self.boundary) {
            return false;
        }
        event.time = self.boundary;
        event.velocity = event.velocity.min(127);
        event.outro = true;
        event.kind.clamp();
        self.outro_placed = true;
        self.record(event);
        true
    }

    fn record(&mut self, event: ScheduledEvent) {
        self.state.last_start = Some(event.time);
        self.state.last_end = self.state.last_end.max(event.end());
        self.track.events.push(event);
    }

    pub fn finish(self) -> GeneratedTrack {
        GeneratedTrack {
            track: self.track,
            state: self.state,
        }
    }
}

/// Everything one request produces, ready for the MIDI encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionResult {
    pub tempo_bpm: f64,
    pub genre: Genre,
    pub is_kids_mode: bool,
    pub plan: ProgressionPlan,
    /// Length of the body in seconds; outro events start exactly here.
    pub total_duration: f64,
    /// Length of the outro (one measure).
    pub outro_duration: f64,
    /// All five role tracks in `Role::ALL` order. Some may be empty.
    pub tracks: Vec<Track>,
}

impl CompositionResult {
    pub fn track(&self, role: Role) -> Option<&Track> {
        self.tracks.iter().find(|t| t.role == role)
    }

    /// Tracks with at least one event, in role order.
    pub fn audible_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(|t| !t.is_empty())
    }

    /// Wall-clock length including the outro.
    pub fn end_time(&self) -> f64 {
        self.total_duration + self.outro_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> TrackBuilder {
        TrackBuilder::new(Role::Melody, 4.0, TrackState::default())
    }

    #[test]
    fn test_ties_are_nudged_forward() {
        let mut b = builder();
        assert!(b.push(ScheduledEvent::note(1.0, 0.5, 60, 80)));
        assert!(b.push(ScheduledEvent::note(1.0, 0.5, 64, 80)));
        assert!(b.push(ScheduledEvent::note(0.5, 0.5, 67, 80)));
        let track = b.finish().track;
        assert_eq!(track.events.len(), 3);
        assert!(track.events[1].time > track.events[0].time);
        assert!(track.events[2].time > track.events[1].time);
        assert!((track.events[1].time - 1.0 - TIE_EPSILON).abs() < 1e-12);
    }

    #[test]
    fn test_monophonic_push_clears_previous_end() {
        let mut b = builder();
        assert!(b.push_monophonic(ScheduledEvent::note(0.0, 1.0, 60, 80)));
        assert!(b.push_monophonic(ScheduledEvent::note(0.5, 0.5, 62, 80)));
        let track = b.finish().track;
        assert!(track.events[1].time > track.events[0].end());
    }

    #[test]
    fn test_boundary_clip_and_drop() {
        let mut b = builder();
        assert!(b.push(ScheduledEvent::note(3.5, 2.0, 60, 80)));
        assert!(!b.push(ScheduledEvent::note(3.99, 1.0, 62, 80)));
        assert!(!b.push(ScheduledEvent::note(4.0, 1.0, 64, 80)));
        let track = b.finish().track;
        assert_eq!(track.events.len(), 1);
        assert!((track.events[0].end() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_outro_sits_on_boundary_once() {
        let mut b = builder();
        b.push(ScheduledEvent::note(0.0, 1.0, 60, 80));
        assert!(b.push_outro(ScheduledEvent::note(0.0, 2.0, 60, 80)));
        assert!(!b.push_outro(ScheduledEvent::note(0.0, 2.0, 60, 80)));
        assert!(!b.push(ScheduledEvent::note(3.0, 0.5, 60, 80)));
        let track = b.finish().track;
        let outro = track.outro().unwrap();
        assert_eq!(outro.time, 4.0);
        assert_eq!(track.body().count(), 1);
    }

    #[test]
    fn test_values_are_clamped() {
        let mut b = builder();
        b.push(ScheduledEvent::note(0.0, 1.0, 200, 255));
        b.push(ScheduledEvent::chord(1.0, 1.0, vec![130, 130, 64], 90));
        let track = b.finish().track;
        assert_eq!(track.events[0].kind, EventKind::Note { pitch: 127 });
        assert_eq!(track.events[0].velocity, 127);
        assert_eq!(track.events[1].kind.keys(), vec![127, 64]);
    }

    #[test]
    fn test_rejects_degenerate_events() {
        let mut b = builder();
        assert!(!b.push(ScheduledEvent::note(f64::NAN, 1.0, 60, 80)));
        assert!(!b.push(ScheduledEvent::note(0.0, 0.0, 60, 80)));
        assert!(!b.push(ScheduledEvent::chord(0.0, 1.0, Vec::new(), 80)));
        assert!(b.finish().track.is_empty());
    }

    #[test]
    fn test_finished_state_resumes_monotonic() {
        let mut b = builder();
        b.push(ScheduledEvent::note(0.5, 2.0, 60, 80));
        b.push(ScheduledEvent::note(1.0, 0.5, 62, 80));
        let state = b.finish().state;
        assert_eq!(state.last_start, Some(1.0));
        assert_eq!(state.last_end, 2.5);

        let mut resumed = TrackBuilder::new(Role::Melody, 4.0, state);
        assert!(resumed.push_monophonic(ScheduledEvent::note(1.0, 0.5, 64, 80)));
        let track = resumed.finish().track;
        assert!(track.events[0].time > 2.5);
    }

    #[test]
    fn test_drum_channel() {
        assert_eq!(Role::Drums.channel(), 9);
        assert_eq!(Role::Melody.channel(), 0);
        assert_eq!(Role::Arpeggio.channel(), 3);
    }
}
