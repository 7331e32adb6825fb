//! End-to-end playback scenarios with sessions persisted to SQLite.

use std::path::PathBuf;
use std::sync::Arc;

use intervals_core::sound::{RecordingPlayer, SoundEffect};
use intervals_core::storage::{session_updater, PlaybackSettings, SessionFilter, SessionStore};
use intervals_core::{
    Database, Event, ManualClock, PlayState, PlaybackEngine, SoundCue, SoundPool, SubPhase, Training,
};
use tempfile::TempDir;

const T0: u64 = 1_700_000_000_000;

struct Fixture {
    _dir: TempDir,
    path: PathBuf,
    /// Reader connection; the engine writes sessions through its own.
    db: Database,
    training: Training,
    clock: Arc<ManualClock>,
}

fn fixture(exercises: &[(&str, u32, u32)]) -> Fixture {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("intervals.db");
    let db = Database::open_at(&path).unwrap();
    let training = db.save_training(&Training::new_draft("Scenario", 30, 10)).unwrap();
    for (name, time, rest) in exercises {
        let mut exercise = training.new_exercise(*name);
        exercise.time_secs = *time;
        exercise.rest_secs = *rest;
        db.add_exercise(&exercise).unwrap();
    }
    Fixture {
        _dir: dir,
        path,
        db,
        training,
        clock: Arc::new(ManualClock::new(T0)),
    }
}

impl Fixture {
    fn engine(&self, settings: PlaybackSettings) -> PlaybackEngine {
        PlaybackEngine::new(
            self.training.id,
            self.db.exercises(self.training.id).unwrap(),
            settings,
            self.clock.clone(),
        )
        .on_session_update(session_updater(Database::open_at(&self.path).unwrap()))
    }

    fn at(&self, engine: &mut PlaybackEngine, ms: u64) -> Vec<SoundCue> {
        self.clock.set(T0 + ms);
        engine.tick().iter().filter_map(Event::cue).collect()
    }
}

fn no_delay() -> PlaybackSettings {
    PlaybackSettings {
        training_start_delay_secs: 0,
        ..PlaybackSettings::default()
    }
}

#[test]
fn two_short_exercises_play_through() {
    let f = fixture(&[("A", 2, 1), ("B", 2, 1)]);
    let settings = PlaybackSettings {
        countdown_to_change: 0,
        ..no_delay()
    };
    let mut engine = f.engine(settings);

    let cues: Vec<SoundCue> = engine.start().iter().filter_map(Event::cue).collect();
    assert_eq!(cues, [SoundCue::TrainingStart, SoundCue::ExerciseStart]);
    assert_eq!(engine.state(), PlayState::Running);

    assert!(f.at(&mut engine, 1_999).is_empty());
    assert_eq!(engine.index(), 0);
    assert_eq!(engine.sub_phase(), Some(SubPhase::Work));

    assert_eq!(f.at(&mut engine, 2_000), [SoundCue::RestStart]);
    assert_eq!(engine.sub_phase(), Some(SubPhase::Rest));
    assert!(f.at(&mut engine, 2_500).is_empty());

    assert!(f.at(&mut engine, 2_999).is_empty());
    assert_eq!(engine.index(), 0);
    assert_eq!(f.at(&mut engine, 3_000), [SoundCue::ExerciseStart]);
    assert_eq!(engine.index(), 1);
    assert_eq!(engine.current_exercise().unwrap().name, "B");

    assert_eq!(f.at(&mut engine, 5_000), [SoundCue::RestStart]);
    assert_eq!(f.at(&mut engine, 6_000), [SoundCue::TrainingEnd]);
    assert_eq!(engine.state(), PlayState::Complete);
    assert_eq!(engine.index(), 2);

    let sessions = f.db.list(&SessionFilter::for_training(f.training.id)).unwrap();
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0].complete);
    assert_eq!(sessions[0].duration_secs(), 6);
}

#[test]
fn start_delay_counts_down_before_first_exercise() {
    let f = fixture(&[("A", 4, 0)]);
    let mut engine = f.engine(PlaybackSettings::default());

    let cues: Vec<SoundCue> = engine.start().iter().filter_map(Event::cue).collect();
    assert_eq!(cues, [SoundCue::TrainingStart]);
    assert_eq!(engine.state(), PlayState::Starting);

    // Delay 5 with threshold 3: remaining 3, 2, 1 and 0 tick.
    assert!(f.at(&mut engine, 1_000).is_empty());
    assert_eq!(f.at(&mut engine, 2_000), [SoundCue::Countdown]);
    assert_eq!(f.at(&mut engine, 4_999), [SoundCue::Countdown, SoundCue::Countdown]);
    assert_eq!(engine.state(), PlayState::Starting);
    assert_eq!(f.at(&mut engine, 5_000), [SoundCue::Countdown, SoundCue::ExerciseStart]);
    assert_eq!(engine.state(), PlayState::Running);

    // Work of 4s: remaining 3, 2, 1 and 0, then the training ends at 4s.
    assert_eq!(f.at(&mut engine, 6_000), [SoundCue::Countdown]);
    assert_eq!(
        f.at(&mut engine, 9_000),
        [
            SoundCue::Countdown,
            SoundCue::Countdown,
            SoundCue::Countdown,
            SoundCue::TrainingEnd
        ]
    );
}

#[test]
fn rest_shorter_than_threshold_beeps_as_it_starts() {
    let f = fixture(&[("A", 4, 2)]);
    let mut engine = f.engine(no_delay());
    engine.start();

    assert_eq!(f.at(&mut engine, 3_990), [SoundCue::Countdown; 3]);
    assert_eq!(f.at(&mut engine, 4_000), [SoundCue::RestStart, SoundCue::Countdown]);
    assert_eq!(engine.sub_phase(), Some(SubPhase::Rest));
    assert_eq!(f.at(&mut engine, 5_000), [SoundCue::Countdown]);
    assert_eq!(f.at(&mut engine, 6_000), [SoundCue::Countdown, SoundCue::TrainingEnd]);
    assert_eq!(engine.state(), PlayState::Complete);
}

#[test]
fn session_tracks_progress_and_restart_opens_new_one() {
    let f = fixture(&[("A", 1, 1), ("B", 1, 1)]);
    let mut engine = f.engine(no_delay());
    engine.start();
    let first = engine.session().unwrap().id;

    f.at(&mut engine, 2_000);
    let stored = f.db.get(first).unwrap().unwrap();
    assert!(!stored.complete);
    assert_eq!(stored.duration_secs(), 2);

    f.at(&mut engine, 4_000);
    assert!(f.db.get(first).unwrap().unwrap().complete);

    engine.restart();
    assert_eq!(engine.state(), PlayState::Ready);
    engine.start();
    let second = engine.session().unwrap().id;
    assert_ne!(first, second);

    let totals = f.db.totals(&SessionFilter::for_training(f.training.id)).unwrap();
    assert_eq!(totals.sessions, 2);
    assert_eq!(totals.completed, 1);
}

#[test]
fn empty_training_stays_ready() {
    let f = fixture(&[]);
    let mut engine = f.engine(no_delay());
    assert!(engine.start().is_empty());
    assert_eq!(engine.state(), PlayState::Ready);
    assert!(f.at(&mut engine, 10_000).is_empty());
    assert!(engine.session().is_none());
    assert!(engine.skip(3).is_empty());
}

#[test]
fn sound_pool_follows_enabled_cues() {
    let f = fixture(&[("A", 1, 1)]);
    let player = RecordingPlayer::new();
    let mut settings = no_delay();
    settings.countdown_to_change = 0;
    settings.sounds.rest_start = false;

    let mut engine = f
        .engine(settings)
        .with_sounds(SoundPool::acquire(Box::new(player.clone())).unwrap());
    engine.start();
    f.at(&mut engine, 2_000);
    assert_eq!(
        player.log().played,
        [SoundEffect::Whistle, SoundEffect::Bell, SoundEffect::Fanfare]
    );

    drop(engine);
    assert!(player.log().released);
}
