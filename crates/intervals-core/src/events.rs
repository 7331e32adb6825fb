use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::player::PlayState;
use crate::sound::SoundCue;

/// Every playback state change produces an Event.
/// Renderers and the CLI consume them; the sound cue, if any, rides along.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Pre-training countdown began.
    TrainingStarted {
        session_id: Uuid,
        training_id: Uuid,
        exercise_count: usize,
        start_delay_secs: u32,
        at: DateTime<Utc>,
    },
    ExerciseStarted {
        index: usize,
        name: String,
        at: DateTime<Utc>,
    },
    RestStarted {
        index: usize,
        at: DateTime<Utc>,
    },
    /// A whole second passed inside the countdown window.
    CountdownTick {
        index: usize,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TrainingCompleted {
        session_id: Uuid,
        at: DateTime<Utc>,
    },
    Paused {
        from: PlayState,
        current_time_ms: u64,
        at: DateTime<Utc>,
    },
    Resumed {
        to: PlayState,
        current_time_ms: u64,
        at: DateTime<Utc>,
    },
    Skipped {
        from_index: usize,
        to_index: usize,
        at: DateTime<Utc>,
    },
    /// Back to `Ready`; the next start opens a new session.
    Restarted {
        at: DateTime<Utc>,
    },
    /// The exercise list changed underneath playback.
    ExercisesReplaced {
        exercise_count: usize,
        index: usize,
        state: PlayState,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// The sound cue this event stands for, if any.
    pub fn cue(&self) -> Option<SoundCue> {
        match self {
            Event::TrainingStarted { .. } => Some(SoundCue::TrainingStart),
            Event::ExerciseStarted { .. } => Some(SoundCue::ExerciseStart),
            Event::RestStarted { .. } => Some(SoundCue::RestStart),
            Event::CountdownTick { .. } => Some(SoundCue::Countdown),
            Event::TrainingCompleted { .. } => Some(SoundCue::TrainingEnd),
            Event::Paused { .. }
            | Event::Resumed { .. }
            | Event::Skipped { .. }
            | Event::Restarted { .. }
            | Event::ExercisesReplaced { .. } => None,
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::TrainingStarted { at, .. }
            | Event::ExerciseStarted { at, .. }
            | Event::RestStarted { at, .. }
            | Event::CountdownTick { at, .. }
            | Event::TrainingCompleted { at, .. }
            | Event::Paused { at, .. }
            | Event::Resumed { at, .. }
            | Event::Skipped { at, .. }
            | Event::Restarted { at }
            | Event::ExercisesReplaced { at, .. } => *at,
        }
    }
}
