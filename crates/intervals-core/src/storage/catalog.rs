//! Observable in-memory source of trainings and their exercises.
//!
//! Every edit is pushed to subscribers through `tokio::sync::watch`, so a
//! playback screen sees out-of-band changes without polling.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::watch;
use uuid::Uuid;

use crate::error::{DatabaseError, Result, ValidationError};
use crate::model::{Exercise, Training};

struct Entry {
    training: watch::Sender<Option<Training>>,
    exercises: watch::Sender<Vec<Exercise>>,
}

impl Entry {
    fn new() -> Self {
        let (training, _) = watch::channel(None);
        let (exercises, _) = watch::channel(Vec::new());
        Self {
            training,
            exercises,
        }
    }
}

#[derive(Default)]
pub struct TrainingCatalog {
    entries: Mutex<HashMap<Uuid, Entry>>,
}

impl TrainingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a training. The cached total is recomputed from the
    /// exercises already in the catalog.
    pub fn put_training(&self, mut training: Training) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| DatabaseError::Poisoned)?;
        let entry = entries.entry(training.id).or_insert_with(Entry::new);
        training.recompute_total(&entry.exercises.borrow());
        entry.training.send_replace(Some(training));
        Ok(())
    }

    /// Replace a training's ordered exercise list.
    ///
    /// # Errors
    /// Returns `ValidationError::InvalidValue` if an exercise belongs to
    /// another training.
    pub fn put_exercises(&self, training: Uuid, exercises: Vec<Exercise>) -> Result<()> {
        if let Some(stray) = exercises.iter().find(|e| e.training != training) {
            return Err(ValidationError::InvalidValue {
                field: "exercise.training".into(),
                message: format!("exercise {} belongs to {}", stray.id, stray.training),
            }
            .into());
        }

        let mut entries = self.entries.lock().map_err(|_| DatabaseError::Poisoned)?;
        let entry = entries.entry(training).or_insert_with(Entry::new);
        entry.training.send_if_modified(|t| match t {
            Some(t) => {
                let before = t.total_time_secs;
                t.recompute_total(&exercises);
                before != t.total_time_secs
            }
            None => false,
        });
        entry.exercises.send_replace(exercises);
        Ok(())
    }

    /// Remove a training. Subscribers observe `None` and an empty list.
    pub fn remove_training(&self, id: Uuid) -> Result<bool> {
        let mut entries = self.entries.lock().map_err(|_| DatabaseError::Poisoned)?;
        match entries.remove(&id) {
            Some(entry) => {
                entry.exercises.send_replace(Vec::new());
                entry.training.send_replace(None);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn training(&self, id: Uuid) -> Option<Training> {
        let entries = self.entries.lock().ok()?;
        entries.get(&id).and_then(|e| e.training.borrow().clone())
    }

    pub fn exercises(&self, id: Uuid) -> Vec<Exercise> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(&id).map(|e| e.exercises.borrow().clone()))
            .unwrap_or_default()
    }

    /// Subscribe to a training. Unknown ids yield `None` until one is put.
    pub fn training_flow(&self, id: Uuid) -> Result<watch::Receiver<Option<Training>>> {
        let mut entries = self.entries.lock().map_err(|_| DatabaseError::Poisoned)?;
        Ok(entries.entry(id).or_insert_with(Entry::new).training.subscribe())
    }

    /// Subscribe to a training's exercise list.
    pub fn exercises_flow(&self, id: Uuid) -> Result<watch::Receiver<Vec<Exercise>>> {
        let mut entries = self.entries.lock().map_err(|_| DatabaseError::Poisoned)?;
        Ok(entries.entry(id).or_insert_with(Entry::new).exercises.subscribe())
    }
}
