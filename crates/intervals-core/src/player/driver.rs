//! Async tick loop for one playback screen.
//!
//! A single task owns the [`PlaybackEngine`]. User input arrives as
//! [`Command`]s on a channel and is applied between ticks, so a pause can
//! never land in the middle of a tick. An interval exists only while the
//! engine is `Starting` or `Running`; any other state drops it.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

use super::engine::{PlaybackEngine, PlaybackSnapshot};
use super::progress::{player_view, row_progress, PlayerView, RowProgress};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::model::{Exercise, Session};
use crate::storage::PlaybackSettings;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub enum Command {
    Start,
    Pause,
    Resume,
    Skip(i64),
    Restart,
    SetExercises(Vec<Exercise>),
    SetSettings(PlaybackSettings),
    Shutdown,
}

/// Everything a renderer needs, published atomically after each step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerFrame {
    pub snapshot: PlaybackSnapshot,
    pub view: PlayerView,
    pub rows: Vec<RowProgress>,
    pub session: Option<Session>,
}

impl PlayerFrame {
    pub fn of(engine: &PlaybackEngine) -> Self {
        let snapshot = engine.snapshot();
        Self {
            view: player_view(&snapshot, engine.exercises()),
            rows: row_progress(&snapshot, engine.exercises()),
            session: engine.session().cloned(),
            snapshot,
        }
    }
}

pub struct PlaybackDriver;

impl PlaybackDriver {
    /// Spawn the loop on the current tokio runtime.
    pub fn spawn(engine: PlaybackEngine, tick_interval: Duration) -> PlaybackHandle {
        Self::spawn_inner(engine, tick_interval, None)
    }

    /// Spawn the loop and follow out-of-band edits to the exercise list.
    pub fn spawn_with_exercises(
        engine: PlaybackEngine,
        tick_interval: Duration,
        exercises: watch::Receiver<Vec<Exercise>>,
    ) -> PlaybackHandle {
        Self::spawn_inner(engine, tick_interval, Some(exercises))
    }

    fn spawn_inner(
        engine: PlaybackEngine,
        tick_interval: Duration,
        exercises: Option<watch::Receiver<Vec<Exercise>>>,
    ) -> PlaybackHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (frame_tx, frame_rx) = watch::channel(PlayerFrame::of(&engine));
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);

        let task = tokio::spawn(run(
            engine,
            tick_interval,
            command_rx,
            frame_tx,
            event_tx.clone(),
            exercises,
        ));

        PlaybackHandle {
            commands: command_tx,
            frames: frame_rx,
            events: event_tx,
            task: Some(task),
        }
    }
}

/// Owner-side handle. Dropping it stops the loop.
pub struct PlaybackHandle {
    commands: mpsc::UnboundedSender<Command>,
    frames: watch::Receiver<PlayerFrame>,
    events: broadcast::Sender<Event>,
    task: Option<JoinHandle<()>>,
}

impl PlaybackHandle {
    pub fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| CoreError::Custom("playback loop has stopped".into()))
    }

    pub fn start(&self) -> Result<()> {
        self.send(Command::Start)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.send(Command::Resume)
    }

    pub fn skip(&self, to_index: i64) -> Result<()> {
        self.send(Command::Skip(to_index))
    }

    pub fn restart(&self) -> Result<()> {
        self.send(Command::Restart)
    }

    /// Swap the settings snapshot; the next cue uses it.
    pub fn set_settings(&self, settings: PlaybackSettings) -> Result<()> {
        self.send(Command::SetSettings(settings))
    }

    /// Latest published frame.
    pub fn frame(&self) -> PlayerFrame {
        self.frames.borrow().clone()
    }

    /// Subscribe to frames.
    pub fn frames(&self) -> watch::Receiver<PlayerFrame> {
        self.frames.clone()
    }

    /// Subscribe to engine events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Stop the loop and wait for it to finish.
    pub async fn shutdown(mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("playback loop ended abnormally: {e}");
            }
        }
    }
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run(
    mut engine: PlaybackEngine,
    tick_interval: Duration,
    mut commands: mpsc::UnboundedReceiver<Command>,
    frames: watch::Sender<PlayerFrame>,
    events: broadcast::Sender<Event>,
    mut exercises: Option<watch::Receiver<Vec<Exercise>>>,
) {
    let mut ticker: Option<Interval> = None;
    loop {
        sync_ticker(&engine, &mut ticker, tick_interval);

        let emitted = tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Shutdown) | None => break,
                Some(command) => apply(&mut engine, command),
            },
            _ = next_tick(&mut ticker), if ticker.is_some() => engine.tick(),
            changed = next_exercises(&mut exercises), if exercises.is_some() => match changed {
                Some(list) => engine.set_exercises(list),
                None => {
                    exercises = None;
                    Vec::new()
                }
            },
        };

        for event in emitted {
            // No subscribers is fine.
            let _ = events.send(event);
        }
        frames.send_replace(PlayerFrame::of(&engine));
    }
    tracing::debug!(training = %engine.training_id(), "playback loop stopped");
}

fn apply(engine: &mut PlaybackEngine, command: Command) -> Vec<Event> {
    match command {
        Command::Start => engine.start(),
        Command::Pause => engine.pause(),
        Command::Resume => engine.resume(),
        Command::Skip(to) => engine.skip(to),
        Command::Restart => engine.restart(),
        Command::SetExercises(list) => engine.set_exercises(list),
        Command::SetSettings(settings) => {
            engine.set_settings(settings);
            Vec::new()
        }
        Command::Shutdown => Vec::new(),
    }
}

/// Keep exactly one interval while the engine needs ticks, none otherwise.
fn sync_ticker(engine: &PlaybackEngine, ticker: &mut Option<Interval>, period: Duration) {
    match (engine.is_ticking(), ticker.is_some()) {
        (true, false) => {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            *ticker = Some(interval);
        }
        (false, true) => *ticker = None,
        _ => {}
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn next_exercises(rx: &mut Option<watch::Receiver<Vec<Exercise>>>) -> Option<Vec<Exercise>> {
    let rx = rx.as_mut()?;
    rx.changed().await.ok()?;
    let list = rx.borrow_and_update().clone();
    Some(list)
}
