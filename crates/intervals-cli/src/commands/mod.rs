pub mod config;
pub mod exercise;
pub mod play;
pub mod stats;
pub mod training;

use intervals_core::{Database, Exercise, Training};
use uuid::Uuid;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Find a training by id, id prefix or exact name.
pub fn resolve_training(db: &Database, key: &str) -> Result<Training, Box<dyn std::error::Error>> {
    if let Ok(id) = Uuid::parse_str(key) {
        return db
            .training(id)?
            .ok_or_else(|| format!("no training with id {id}").into());
    }
    let trainings = db.trainings()?;
    if let Some(found) = trainings.iter().find(|t| t.name == key) {
        return Ok(found.clone());
    }
    let mut matches = trainings
        .into_iter()
        .filter(|t| t.id.to_string().starts_with(key));
    match (matches.next(), matches.next()) {
        (Some(found), None) => Ok(found),
        (Some(_), Some(_)) => Err(format!("'{key}' matches more than one training").into()),
        (None, _) => Err(format!("no training named '{key}'").into()),
    }
}

/// Find an exercise by 1-based position, id or id prefix.
pub fn resolve_exercise(exercises: &[Exercise], key: &str) -> Result<Exercise, Box<dyn std::error::Error>> {
    if let Ok(position) = key.parse::<usize>() {
        return position
            .checked_sub(1)
            .and_then(|i| exercises.get(i))
            .cloned()
            .ok_or_else(|| format!("no exercise at position {position}").into());
    }
    let mut matches = exercises
        .iter()
        .filter(|e| e.id.to_string().starts_with(key));
    match (matches.next(), matches.next()) {
        (Some(found), None) => Ok(found.clone()),
        (Some(_), Some(_)) => Err(format!("'{key}' matches more than one exercise").into()),
        (None, _) => Err(format!("no exercise '{key}'").into()),
    }
}

/// `mm:ss`, or `h:mm:ss` past the hour.
pub fn format_duration(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, secs % 3600 / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}
