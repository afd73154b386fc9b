// End-to-end composition scenarios.
//
// Each test builds an input record the way the parameter step would, runs
// the full pipeline with a fixed seed, and checks the musical outcome:
// progression, length, registers, chord qualities, and the encoded file.

use midly::{MidiMessage, Smf, TrackEventKind};
use moodscore_music::compose::compose_seeded;
use moodscore_music::drums::KICK;
use moodscore_music::midi::{EncoderConfig, encode_smf};
use moodscore_music::progression::plan_progression;
use moodscore_music::score::{CompositionResult, EventKind, Role, ScheduledEvent, Track};
use moodscore_music::theory::ScaleMode;
use moodscore_music::timing::{NoteValue, swing_pair};
use moodscore_music::{AffectiveParameters, Genre};
use pretty_assertions::assert_eq;

fn pop_request() -> AffectiveParameters {
    AffectiveParameters {
        key_signature: "C".to_string(),
        mode: "major".to_string(),
        tempo_bpm: 120,
        rhythmic_density: 0.5,
        harmonic_complexity: 0.3,
        target_valence: 0.5,
        target_arousal: 0.2,
        selected_genre: Some("Pop".to_string()),
        is_kids_mode: false,
        ..Default::default()
    }
}

fn chord_at(track: &Track, time: f64) -> Option<Vec<u8>> {
    track
        .body()
        .find(|e| (e.time - time).abs() < 1e-9)
        .and_then(|e| match &e.kind {
            EventKind::Chord { pitches } => Some(pitches.clone()),
            _ => None,
        })
}

#[test]
fn pop_in_c_plays_one_five_six_four() {
    let result = compose_seeded(&pop_request(), 11);
    assert_eq!(result.genre, Genre::Pop);
    assert_eq!(result.plan.degrees, vec![1, 5, 6, 4]);
    assert_eq!(result.plan.cycles, 4);
    assert_eq!(result.total_duration, 32.0);

    let chords = result.track(Role::Chords).unwrap();
    let expected = [
        vec![48, 52, 55], // C
        vec![55, 59, 62], // G
        vec![57, 60, 64], // Am
        vec![53, 57, 60], // F
    ];
    for slot in result.plan.measures() {
        let voicing = chord_at(chords, slot.start).expect("downbeat chord");
        assert_eq!(voicing, expected[slot.index % 4]);
    }
}

#[test]
fn pop_body_ends_before_outro() {
    let result = compose_seeded(&pop_request(), 12);
    for track in result.audible_tracks() {
        for event in track.body() {
            assert!(event.time < 32.0);
            assert!(event.end() <= 32.0 + 1e-9, "{:?} runs past the boundary", track.role);
        }
        assert_eq!(track.outro().map(|e| e.time), Some(32.0));
    }
}

#[test]
fn kids_mode_is_simple_and_always_drummed() {
    for (i, genre) in ["Rock", "Jazz", "Ambient", "Classical", "Blues"].iter().enumerate() {
        let params = AffectiveParameters {
            selected_genre: Some(genre.to_string()),
            is_kids_mode: true,
            rhythmic_density: 0.1,
            key_signature: "A".to_string(),
            ..pop_request()
        };
        let result = compose_seeded(&params, 100 + i as u64);
        assert_eq!(result.plan.degrees, vec![1, 4, 5, 1]);
        assert_eq!(result.plan.cycles, 2);

        let melody = result.track(Role::Melody).unwrap();
        assert!(!melody.is_empty());
        for event in &melody.events {
            for pitch in event.kind.keys() {
                assert!((60..=83).contains(&pitch), "kids melody pitch {pitch}");
            }
        }

        let drums = result.track(Role::Drums).unwrap();
        assert!(!drums.is_empty(), "{genre} kids track has no drums");
        for slot in result.plan.measures() {
            let kicked = drums.body().any(|e| {
                e.time >= slot.start
                    && e.time < slot.start + slot.duration
                    && e.kind.keys().contains(&KICK)
            });
            assert!(kicked, "measure {} has no kick", slot.index);
        }
    }
}

#[test]
fn blues_tonic_subdominant_dominant_are_dominant_sevenths() {
    let params = AffectiveParameters {
        selected_genre: Some("Blues".to_string()),
        mode: "major".to_string(),
        ..pop_request()
    };
    for seed in 0..5 {
        let result = compose_seeded(&params, seed);
        assert_eq!(result.plan.degrees.len(), 12);
        let chords = result.track(Role::Chords).unwrap();
        assert!(chords.body().count() > 0);
        for event in chords.body() {
            let EventKind::Chord { pitches } = &event.kind else {
                panic!("chord track holds a non-chord event");
            };
            assert_eq!(pitches.len(), 4);
            let root = pitches[0];
            let shape: Vec<u8> = pitches.iter().map(|p| p - root).collect();
            assert_eq!(shape, vec![0, 4, 7, 10]);
        }
    }
}

#[test]
fn same_timestamp_events_encode_with_distinct_ticks() {
    let plan = plan_progression(ScaleMode::Major, Genre::Pop, false, 120.0);
    let result = CompositionResult {
        tempo_bpm: 120.0,
        genre: Genre::Pop,
        is_kids_mode: false,
        total_duration: plan.total_duration(),
        outro_duration: plan.measure_seconds(),
        plan,
        tracks: vec![Track {
            role: Role::Melody,
            program: 0,
            events: vec![
                ScheduledEvent::note(1.0, 0.5, 60, 90),
                ScheduledEvent::note(1.0, 0.5, 64, 90),
            ],
        }],
    };
    let bytes = encode_smf(&result, &EncoderConfig::default()).unwrap();
    let smf = Smf::parse(&bytes).unwrap();
    assert_eq!(smf.tracks.len(), 1);

    let mut tick = 0u32;
    let mut on_ticks = Vec::new();
    for event in &smf.tracks[0] {
        tick += event.delta.as_int();
        if let TrackEventKind::Midi {
            message: MidiMessage::NoteOn { key, .. },
            ..
        } = event.kind
        {
            on_ticks.push((tick, key.as_int()));
        }
    }
    assert_eq!(on_ticks, vec![(960, 60), (961, 64)]);
}

#[test]
fn swung_melodies_stay_on_the_swung_eighth_grid() {
    for (i, genre) in ["Jazz", "Blues"].iter().enumerate() {
        let params = AffectiveParameters {
            selected_genre: Some(genre.to_string()),
            rhythmic_density: 0.8,
            ..pop_request()
        };
        for seed in 0..10 {
            let result = compose_seeded(&params, 200 + 10 * i as u64 + seed);
            let beat = result.plan.beat_seconds();
            let (long, short) = swing_pair(NoteValue::Eighth, result.tempo_bpm, 0.6);
            assert!(long > short);

            let melody = result.track(Role::Melody).unwrap();
            assert!(melody.body().count() > 0);
            for event in melody.body() {
                let within = event.time - (event.time / beat).floor() * beat;
                let on_grid = within.abs() < 1e-6
                    || (within - long).abs() < 1e-6
                    || (beat - within).abs() < 1e-6;
                assert!(on_grid, "{genre} melody onset {} is off the swing grid", event.time);
            }
        }
    }
}
