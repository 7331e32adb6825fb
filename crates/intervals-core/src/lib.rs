//! # Intervals Core Library
//!
//! Core logic for an interval-training timer: trainings made of timed
//! exercises, each followed by a rest, played back with sound cues and
//! recorded as sessions.
//!
//! ## Architecture
//!
//! - **Playback**: a wall-clock-based state machine ([`PlaybackEngine`]) that
//!   the caller ticks, plus an async driver that owns it on a tokio task
//! - **Storage**: SQLite persistence for trainings, exercises and sessions,
//!   TOML configuration, and an observable in-memory catalog
//! - **Sound**: cue gating and a pluggable audio output
//!
//! ## Key Components
//!
//! - [`PlaybackEngine`]: playback state machine
//! - [`PlaybackDriver`]: tick loop on a tokio task
//! - [`Database`]: training and session persistence
//! - [`Config`]: application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod model;
pub mod player;
pub mod sound;
pub mod storage;

pub use clock::{Clock, ManualClock, MonotonicClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, Result, ValidationError};
pub use events::Event;
pub use model::{Exercise, ExerciseIcon, Session, Training};
pub use player::{
    PlayState, PlaybackDriver, PlaybackEngine, PlaybackHandle, PlaybackSnapshot, PlayerFrame,
    SubPhase,
};
pub use sound::{SoundCue, SoundDispatcher, SoundEffect, SoundEffectPlayer, SoundPool};
pub use storage::{Config, Database, MemorySessionStore, SessionFilter, SessionStore, TrainingCatalog};
