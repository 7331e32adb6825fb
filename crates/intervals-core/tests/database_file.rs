//! SQLite persistence across connections to the same file.

use chrono::{Duration, SubsecRound, Utc};
use intervals_core::storage::{SessionFilter, SessionStore};
use intervals_core::{Database, ExerciseIcon, Session, Training};
use tempfile::TempDir;

#[test]
fn data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("intervals.db");

    let start = (Utc::now() - Duration::minutes(10)).trunc_subsecs(3);
    let (training, session) = {
        let db = Database::open_at(&path).unwrap();
        let training = db.save_training(&Training::new_draft("Stored", 20, 10)).unwrap();
        db.add_exercise(&training.new_exercise("Jacks").with_icon(ExerciseIcon::Jump))
            .unwrap();
        db.add_exercise(&training.new_exercise("Lunges")).unwrap();

        let mut session = Session::begin(training.id, start);
        session.finish(start + Duration::seconds(60));
        db.upsert(&session).unwrap();
        (training, session)
    };

    let db = Database::open_at(&path).unwrap();
    let loaded = db.training(training.id).unwrap().unwrap();
    assert_eq!(loaded.total_time_secs, 60);
    let exercises = db.exercises(training.id).unwrap();
    assert_eq!(exercises.len(), 2);
    assert_eq!(exercises[0].icon, ExerciseIcon::Jump);

    assert_eq!(db.get(session.id).unwrap(), Some(session.clone()));
    let day = SessionFilter::default().between(start - Duration::hours(1), start + Duration::hours(1));
    assert_eq!(db.list(&day).unwrap(), vec![session]);
}

#[test]
fn upsert_never_duplicates() {
    let dir = TempDir::new().unwrap();
    let db = Database::open_at(&dir.path().join("intervals.db")).unwrap();
    let start = Utc::now().trunc_subsecs(3);
    let mut session = Session::begin(uuid::Uuid::new_v4(), start);
    for secs in [10, 20, 30] {
        session.extend_to(start + Duration::seconds(secs));
        db.upsert(&session).unwrap();
    }
    let all = db.list(&SessionFilter::default()).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].duration_secs(), 30);
}

#[test]
fn open_fails_on_unwritable_path() {
    let dir = TempDir::new().unwrap();
    let err = Database::open_at(&dir.path().join("missing").join("intervals.db")).unwrap_err();
    assert!(err.to_string().contains("Failed to open database"), "{err}");
}
