//! Render data derived from a playback snapshot.
//!
//! Everything here is a pure function of its inputs: no clock, no state
//! kept between calls.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::engine::{PlayState, PlaybackSnapshot, SubPhase};
use crate::model::Exercise;

/// Where a row sits relative to the current exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowPosition {
    Past,
    Current,
    Future,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowProgress {
    pub position: RowPosition,
    /// 0.0 ..= 1.0
    pub fraction: f64,
}

/// Headline of the big player view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum PhaseLabel {
    Ready,
    Starting,
    Exercise(String),
    Rest(String),
    Paused,
    Complete,
}

impl PhaseLabel {
    pub fn text(&self) -> &str {
        match self {
            PhaseLabel::Ready => "Ready",
            PhaseLabel::Starting => "Get ready",
            PhaseLabel::Exercise(name) => name,
            PhaseLabel::Rest(label) => label,
            PhaseLabel::Paused => "Paused",
            PhaseLabel::Complete => "Done!",
        }
    }
}

/// The big number on the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Readout {
    /// Seconds left in the current sub-phase.
    Remaining(u64),
    /// Seconds elapsed in the pre-training countdown.
    Elapsed(u64),
}

impl Readout {
    pub fn secs(&self) -> u64 {
        match self {
            Readout::Remaining(s) | Readout::Elapsed(s) => *s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub label: PhaseLabel,
    pub sub_phase: Option<SubPhase>,
    pub readout: Readout,
    /// Progress through the current sub-phase, 0.0 ..= 1.0.
    pub local_progress: f64,
    /// Progress through the whole exercise (or countdown), 0.0 ..= 1.0.
    pub total_progress: f64,
}

const REST_LABELS: [&str; 8] = [
    "Rest",
    "Breathe",
    "Catch your breath",
    "Shake it out",
    "Recover",
    "Easy now",
    "Hydrate",
    "Relax",
];

/// Rest headline for an exercise, stable for a given name.
pub fn rest_label(exercise_name: &str) -> &'static str {
    let digest = Sha256::digest(exercise_name.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let hash = u64::from_be_bytes(head);
    REST_LABELS[(hash % REST_LABELS.len() as u64) as usize]
}

fn fraction(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64).clamp(0.0, 1.0)
}

/// Per-row progress for the exercise list.
pub fn row_progress(snapshot: &PlaybackSnapshot, exercises: &[Exercise]) -> Vec<RowProgress> {
    let running = snapshot.timing_state() == PlayState::Running;
    exercises
        .iter()
        .enumerate()
        .map(|(i, exercise)| {
            if i < snapshot.index {
                RowProgress {
                    position: RowPosition::Past,
                    fraction: 1.0,
                }
            } else if i > snapshot.index {
                RowProgress {
                    position: RowPosition::Future,
                    fraction: 0.0,
                }
            } else {
                let elapsed = if running { snapshot.current_time_ms } else { 0 };
                RowProgress {
                    position: RowPosition::Current,
                    fraction: fraction(elapsed, exercise.total_ms()),
                }
            }
        })
        .collect()
}

/// Data for the central player.
pub fn player_view(snapshot: &PlaybackSnapshot, exercises: &[Exercise]) -> PlayerView {
    let paused = snapshot.state == PlayState::Paused;
    let mut view = match snapshot.timing_state() {
        PlayState::Starting => {
            let delay_ms = u64::from(snapshot.start_delay_secs) * 1000;
            let progress = fraction(snapshot.start_elapsed_ms, delay_ms);
            PlayerView {
                label: PhaseLabel::Starting,
                sub_phase: None,
                readout: Readout::Elapsed(snapshot.start_elapsed_ms / 1000),
                local_progress: progress,
                total_progress: progress,
            }
        }
        PlayState::Running => match exercises.get(snapshot.index) {
            Some(exercise) => running_view(exercise, snapshot.current_time_ms),
            None => idle_view(None),
        },
        PlayState::Complete => PlayerView {
            label: PhaseLabel::Complete,
            sub_phase: None,
            readout: Readout::Remaining(0),
            local_progress: 1.0,
            total_progress: 1.0,
        },
        PlayState::Ready | PlayState::Paused => idle_view(exercises.get(snapshot.index)),
    };
    if paused {
        view.label = PhaseLabel::Paused;
    }
    view
}

fn idle_view(next: Option<&Exercise>) -> PlayerView {
    PlayerView {
        label: PhaseLabel::Ready,
        sub_phase: None,
        readout: Readout::Remaining(next.map_or(0, |e| u64::from(e.time_secs))),
        local_progress: 0.0,
        total_progress: 0.0,
    }
}

fn running_view(exercise: &Exercise, elapsed_ms: u64) -> PlayerView {
    let elapsed_secs = elapsed_ms / 1000;
    let time_secs = u64::from(exercise.time_secs);
    let work_ms = exercise.work_ms();
    let total_progress = fraction(elapsed_ms, exercise.total_ms());

    match SubPhase::at(exercise, elapsed_ms) {
        SubPhase::Work => PlayerView {
            label: PhaseLabel::Exercise(exercise.name.clone()),
            sub_phase: Some(SubPhase::Work),
            readout: Readout::Remaining(time_secs.saturating_sub(elapsed_secs)),
            local_progress: fraction(elapsed_ms, work_ms),
            total_progress,
        },
        SubPhase::Rest => PlayerView {
            label: PhaseLabel::Rest(rest_label(&exercise.name).to_string()),
            sub_phase: Some(SubPhase::Rest),
            readout: Readout::Remaining(exercise.total_secs().saturating_sub(elapsed_secs)),
            local_progress: fraction(
                elapsed_ms.saturating_sub(work_ms),
                u64::from(exercise.rest_secs) * 1000,
            ),
            total_progress,
        },
    }
}
