use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Exercise;

/// A named, ordered collection of exercises.
///
/// Exercises are not embedded; they refer back through `Exercise::training`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Training {
    pub id: Uuid,
    pub name: String,
    pub default_time_secs: u32,
    pub default_rest_secs: u32,
    pub last_used: DateTime<Utc>,
    /// Cached sum of the exercises' work and rest.
    #[serde(default)]
    pub total_time_secs: u64,
    /// Not yet persisted.
    #[serde(default)]
    pub draft: bool,
}

impl Training {
    /// A fresh, unsaved training.
    pub fn new_draft(name: impl Into<String>, default_time_secs: u32, default_rest_secs: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            default_time_secs,
            default_rest_secs,
            last_used: Utc::now(),
            total_time_secs: 0,
            draft: true,
        }
    }

    /// Build an exercise using this training's default timing.
    pub fn new_exercise(&self, name: impl Into<String>) -> Exercise {
        Exercise::new(self.id, name, self.default_time_secs, self.default_rest_secs)
    }

    pub fn recompute_total(&mut self, exercises: &[Exercise]) {
        self.total_time_secs = exercises
            .iter()
            .filter(|e| e.training == self.id)
            .map(Exercise::total_secs)
            .sum();
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_used = now;
    }
}
