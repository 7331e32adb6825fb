//! Sound cues.
//!
//! Maps playback cues to the effect the audio player should play, gated by
//! the user's per-cue switches. Decoding and output belong to the
//! [`SoundEffectPlayer`] implementation; this module only decides *whether*
//! and *which*.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::{PlaybackSettings, SoundFlags};

/// Moments in a training that can make a sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCue {
    TrainingStart,
    ExerciseStart,
    RestStart,
    Countdown,
    TrainingEnd,
}

/// Effects the audio player knows how to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundEffect {
    Whistle,
    Bell,
    Chime,
    Beep,
    Fanfare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CueInfo {
    pub effect: SoundEffect,
    pub label: &'static str,
}

impl SoundCue {
    pub const ALL: [SoundCue; 5] = [
        SoundCue::TrainingStart,
        SoundCue::ExerciseStart,
        SoundCue::RestStart,
        SoundCue::Countdown,
        SoundCue::TrainingEnd,
    ];

    pub const fn info(self) -> CueInfo {
        match self {
            SoundCue::TrainingStart => CueInfo { effect: SoundEffect::Whistle, label: "training start" },
            SoundCue::ExerciseStart => CueInfo { effect: SoundEffect::Bell, label: "exercise start" },
            SoundCue::RestStart => CueInfo { effect: SoundEffect::Chime, label: "rest start" },
            SoundCue::Countdown => CueInfo { effect: SoundEffect::Beep, label: "countdown" },
            SoundCue::TrainingEnd => CueInfo { effect: SoundEffect::Fanfare, label: "training end" },
        }
    }

    pub fn effect(self) -> SoundEffect {
        self.info().effect
    }

    pub fn is_enabled(self, flags: &SoundFlags) -> bool {
        match self {
            SoundCue::TrainingStart => flags.training_start,
            SoundCue::ExerciseStart => flags.exercise_start,
            SoundCue::RestStart => flags.rest_start,
            SoundCue::Countdown => flags.countdown,
            SoundCue::TrainingEnd => flags.training_end,
        }
    }
}

/// Whether `cue` should be heard under `settings`.
///
/// The countdown additionally needs a non-zero threshold.
pub fn should_play(cue: SoundCue, settings: &PlaybackSettings) -> bool {
    cue.is_enabled(&settings.sounds)
        && (cue != SoundCue::Countdown || settings.countdown_to_change > 0)
}

/// Audio output capability.
pub trait SoundEffectPlayer: Send {
    /// Prepare the effects for playback.
    fn build(&mut self) -> Result<()>;

    fn play_sound(&mut self, effect: SoundEffect);

    fn release(&mut self);
}

/// A built sound player, released when dropped.
///
/// Owned by one playback screen; never shared between trainings.
pub struct SoundPool {
    player: Box<dyn SoundEffectPlayer>,
}

impl SoundPool {
    /// Build `player` and take ownership of it.
    pub fn acquire(mut player: Box<dyn SoundEffectPlayer>) -> Result<Self> {
        player.build()?;
        tracing::debug!("sound pool acquired");
        Ok(Self { player })
    }

    pub fn play(&mut self, effect: SoundEffect) {
        self.player.play_sound(effect);
    }
}

impl Drop for SoundPool {
    fn drop(&mut self) {
        self.player.release();
        tracing::debug!("sound pool released");
    }
}

/// Routes cues to the sound pool.
pub struct SoundDispatcher {
    pool: Option<SoundPool>,
    settings: PlaybackSettings,
}

impl SoundDispatcher {
    pub fn new(pool: SoundPool, settings: PlaybackSettings) -> Self {
        Self {
            pool: Some(pool),
            settings,
        }
    }

    /// A dispatcher with no audio output.
    pub fn muted(settings: PlaybackSettings) -> Self {
        Self {
            pool: None,
            settings,
        }
    }

    pub fn set_settings(&mut self, settings: PlaybackSettings) {
        self.settings = settings;
    }

    /// Play the cue's effect if enabled. Returns whether it was requested.
    pub fn dispatch(&mut self, cue: SoundCue) -> bool {
        if !should_play(cue, &self.settings) {
            return false;
        }
        match self.pool.as_mut() {
            Some(pool) => {
                pool.play(cue.effect());
                true
            }
            None => false,
        }
    }
}

/// Lifecycle and playback log of a [`RecordingPlayer`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PlayerLog {
    pub built: bool,
    pub released: bool,
    pub played: Vec<SoundEffect>,
}

/// Player that records what it was asked to do. Useful in tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct RecordingPlayer {
    log: Arc<Mutex<PlayerLog>>,
}

impl RecordingPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the log so far.
    pub fn log(&self) -> PlayerLog {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl SoundEffectPlayer for RecordingPlayer {
    fn build(&mut self) -> Result<()> {
        if let Ok(mut log) = self.log.lock() {
            log.built = true;
        }
        Ok(())
    }

    fn play_sound(&mut self, effect: SoundEffect) {
        if let Ok(mut log) = self.log.lock() {
            log.played.push(effect);
        }
    }

    fn release(&mut self) {
        if let Ok(mut log) = self.log.lock() {
            log.released = true;
        }
    }
}
