//! Playback engine implementation.
//!
//! The engine is a wall-clock-based state machine. It does not use internal
//! threads - the caller is responsible for calling `tick()` periodically
//! (see [`PlaybackDriver`](super::PlaybackDriver) for the async loop).
//!
//! ## State Transitions
//!
//! ```text
//! Ready -> Starting -> Running <-> Paused -> Complete -> (restart) Ready
//!             ^ |
//!             | v
//!           Paused
//! ```
//!
//! Elapsed time is measured from a phase origin, never accumulated per tick,
//! and every comparison uses whole seconds (`elapsed_ms / 1000`). Each
//! whole-second boundary inside a phase is evaluated exactly once, so cues
//! are identical whatever the tick interval.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = PlaybackEngine::new(training_id, exercises, settings, clock);
//! engine.start();
//! // In a loop:
//! for event in engine.tick() { /* render */ }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::{datetime_from_ms, Clock};
use crate::events::Event;
use crate::model::{Exercise, Session};
use crate::sound::{SoundDispatcher, SoundPool};
use crate::storage::PlaybackSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayState {
    Ready,
    /// Pre-training countdown.
    Starting,
    Running,
    Paused,
    Complete,
}

/// Work or rest part of the current exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubPhase {
    Work,
    Rest,
}

impl SubPhase {
    /// Sub-phase of `exercise` after `elapsed_ms` of it.
    pub fn at(exercise: &Exercise, elapsed_ms: u64) -> Self {
        if elapsed_ms / 1000 < u64::from(exercise.time_secs) {
            SubPhase::Work
        } else {
            SubPhase::Rest
        }
    }
}

/// Receives the session record every time the engine changes it.
pub type SessionCallback = Box<dyn FnMut(&Session) + Send>;

/// Consistent copy of the engine's volatile state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub state: PlayState,
    /// State `resume()` returns to, while paused.
    pub resume_state: Option<PlayState>,
    pub index: usize,
    pub exercise_count: usize,
    /// Elapsed time in the current exercise.
    pub current_time_ms: u64,
    /// Elapsed time in the pre-training countdown.
    pub start_elapsed_ms: u64,
    pub start_delay_secs: u32,
}

impl PlaybackSnapshot {
    /// The state whose timing applies: the paused-from state while paused.
    pub fn timing_state(&self) -> PlayState {
        match (self.state, self.resume_state) {
            (PlayState::Paused, Some(state)) => state,
            (state, _) => state,
        }
    }
}

/// Core playback engine.
///
/// Operates on wall-clock deltas -- no internal thread.
/// The caller is responsible for calling `tick()` periodically.
pub struct PlaybackEngine {
    clock: Arc<dyn Clock>,
    settings: PlaybackSettings,
    sounds: SoundDispatcher,
    on_session: Option<SessionCallback>,
    training_id: Uuid,
    exercises: Vec<Exercise>,
    state: PlayState,
    resume_state: Option<PlayState>,
    index: usize,
    current_time_ms: u64,
    start_elapsed_ms: u64,
    /// Timestamp (ms since epoch) the current phase's elapsed time counts from.
    origin_ms: u64,
    /// Next whole-second boundary of the current phase to evaluate.
    next_second: u64,
    session: Option<Session>,
}

impl PlaybackEngine {
    /// Create a new engine in the `Ready` state with no audio output.
    pub fn new(
        training_id: Uuid,
        exercises: Vec<Exercise>,
        settings: PlaybackSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            clock,
            settings,
            sounds: SoundDispatcher::muted(settings),
            on_session: None,
            training_id,
            exercises,
            state: PlayState::Ready,
            resume_state: None,
            index: 0,
            current_time_ms: 0,
            start_elapsed_ms: 0,
            origin_ms: 0,
            next_second: 1,
            session: None,
        }
    }

    /// Route cues to `pool`. The pool is released when the engine drops.
    pub fn with_sounds(mut self, pool: SoundPool) -> Self {
        self.sounds = SoundDispatcher::new(pool, self.settings);
        self
    }

    /// Register the `updateSession` callback.
    pub fn on_session_update(mut self, callback: SessionCallback) -> Self {
        self.on_session = Some(callback);
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current_time_ms(&self) -> u64 {
        self.current_time_ms
    }

    pub fn training_id(&self) -> Uuid {
        self.training_id
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn current_exercise(&self) -> Option<&Exercise> {
        self.exercises.get(self.index)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    /// Work/rest while an exercise is running or paused mid-exercise.
    pub fn sub_phase(&self) -> Option<SubPhase> {
        let snapshot = self.snapshot();
        if snapshot.timing_state() != PlayState::Running {
            return None;
        }
        self.current_exercise()
            .map(|ex| SubPhase::at(ex, self.current_time_ms))
    }

    /// Whether a tick loop should be driving the engine.
    pub fn is_ticking(&self) -> bool {
        matches!(self.state, PlayState::Starting | PlayState::Running)
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: self.state,
            resume_state: self.resume_state,
            index: self.index,
            exercise_count: self.exercises.len(),
            current_time_ms: self.current_time_ms,
            start_elapsed_ms: self.start_elapsed_ms,
            start_delay_secs: self.settings.training_start_delay_secs,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Open a session and begin the pre-training countdown.
    ///
    /// Ignored unless `Ready`. An empty training stays `Ready`.
    pub fn start(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if self.state != PlayState::Ready {
            return events;
        }
        if self.exercises.is_empty() {
            tracing::warn!(training = %self.training_id, "cannot start a training without exercises");
            return events;
        }

        let now = self.clock.now_ms();
        let at = datetime_from_ms(now);
        self.index = self.index.min(self.exercises.len() - 1);
        let session = Session::begin(self.training_id, at);
        let session_id = session.id;
        self.session = Some(session);

        self.state = PlayState::Starting;
        self.current_time_ms = 0;
        self.start_elapsed_ms = 0;
        self.origin_ms = now;
        self.next_second = 1;
        tracing::info!(
            training = %self.training_id,
            session = %session_id,
            exercises = self.exercises.len(),
            "training started"
        );

        self.emit(
            Event::TrainingStarted {
                session_id,
                training_id: self.training_id,
                exercise_count: self.exercises.len(),
                start_delay_secs: self.settings.training_start_delay_secs,
                at,
            },
            &mut events,
        );
        self.publish_session();
        self.advance(now, &mut events);
        events
    }

    /// Bring the engine up to the current time.
    pub fn tick(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if self.is_ticking() {
            let now = self.clock.now_ms();
            self.advance(now, &mut events);
        }
        events
    }

    /// Freeze elapsed time. Applies while `Starting` or `Running`.
    pub fn pause(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if !self.is_ticking() {
            return events;
        }
        // Flush elapsed time first.
        let now = self.clock.now_ms();
        self.advance(now, &mut events);
        if !self.is_ticking() {
            return events;
        }

        let from = self.state;
        self.resume_state = Some(from);
        self.state = PlayState::Paused;
        tracing::debug!(?from, current_time_ms = self.current_time_ms, "playback paused");
        self.emit(
            Event::Paused {
                from,
                current_time_ms: self.frozen_ms(from),
                at: datetime_from_ms(now),
            },
            &mut events,
        );
        events
    }

    /// Continue from the frozen elapsed time; the paused span is not counted.
    pub fn resume(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if self.state != PlayState::Paused {
            return events;
        }
        let now = self.clock.now_ms();
        let to = self.resume_state.take().unwrap_or(PlayState::Running);
        let frozen = self.frozen_ms(to);
        self.origin_ms = now.saturating_sub(frozen);
        self.state = to;
        tracing::debug!(?to, current_time_ms = frozen, "playback resumed");
        self.emit(
            Event::Resumed {
                to,
                current_time_ms: frozen,
                at: datetime_from_ms(now),
            },
            &mut events,
        );
        events
    }

    /// Jump to exercise `to_index`, clamped into the list.
    ///
    /// The play state is kept. A running exercise restarts from zero; during
    /// the pre-training countdown only the first exercise changes. Ignored
    /// once complete or when there are no exercises.
    pub fn skip(&mut self, to_index: i64) -> Vec<Event> {
        let mut events = Vec::new();
        if self.exercises.is_empty() || self.state == PlayState::Complete {
            return events;
        }
        let last = self.exercises.len() - 1;
        let to = usize::try_from(to_index.max(0)).unwrap_or(usize::MAX).min(last);
        let from = self.index;
        let now = self.clock.now_ms();

        self.index = to;
        self.current_time_ms = 0;
        if self.snapshot().timing_state() != PlayState::Starting {
            self.next_second = 1;
            self.origin_ms = now;
        }
        tracing::debug!(from, to, "skipped to exercise");
        self.emit(
            Event::Skipped {
                from_index: from,
                to_index: to,
                at: datetime_from_ms(now),
            },
            &mut events,
        );
        events
    }

    /// Leave `Complete` for `Ready`. The next start opens a new session.
    pub fn restart(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if self.state != PlayState::Complete {
            return events;
        }
        self.reset_to_ready();
        tracing::info!(training = %self.training_id, "playback restarted");
        self.emit(
            Event::Restarted {
                at: datetime_from_ms(self.clock.now_ms()),
            },
            &mut events,
        );
        events
    }

    /// Swap in an edited exercise list without faulting on stale indices.
    ///
    /// An active playback whose list becomes empty drops back to `Ready`.
    pub fn set_exercises(&mut self, exercises: Vec<Exercise>) -> Vec<Event> {
        let mut events = Vec::new();
        self.exercises = exercises;
        let len = self.exercises.len();
        match self.state {
            PlayState::Complete => self.index = len,
            PlayState::Ready => self.index = self.index.min(len.saturating_sub(1)),
            PlayState::Starting | PlayState::Running | PlayState::Paused => {
                if len == 0 {
                    tracing::warn!(training = %self.training_id, "exercises removed during playback");
                    self.reset_to_ready();
                } else if self.index >= len {
                    self.index = len - 1;
                }
            }
        }
        self.emit(
            Event::ExercisesReplaced {
                exercise_count: len,
                index: self.index,
                state: self.state,
                at: datetime_from_ms(self.clock.now_ms()),
            },
            &mut events,
        );
        events
    }

    pub fn set_settings(&mut self, settings: PlaybackSettings) {
        self.settings = settings;
        self.sounds.set_settings(settings);
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn advance(&mut self, now: u64, events: &mut Vec<Event>) {
        if self.state == PlayState::Starting {
            let delay_secs = u64::from(self.settings.training_start_delay_secs);
            let elapsed = now.saturating_sub(self.origin_ms);
            let upto = (elapsed / 1000).min(delay_secs);
            while self.next_second <= upto {
                let remaining = delay_secs - self.next_second;
                self.countdown(remaining, now, events);
                self.next_second += 1;
            }
            if elapsed < delay_secs * 1000 {
                self.start_elapsed_ms = elapsed;
                return;
            }
            // Anchor on the boundary itself so tick jitter does not drift.
            self.origin_ms += delay_secs * 1000;
            self.start_elapsed_ms = delay_secs * 1000;
            self.state = PlayState::Running;
            self.begin_exercise(now, events);
        }
        if self.state == PlayState::Running {
            self.advance_running(now, events);
        }
    }

    fn advance_running(&mut self, now: u64, events: &mut Vec<Event>) {
        loop {
            let dims = self
                .exercises
                .get(self.index)
                .map(|ex| (u64::from(ex.time_secs), ex.total_secs(), ex.total_ms()));
            let Some((time_secs, total_secs, total_ms)) = dims else {
                self.finish(now, events);
                return;
            };

            let elapsed = now.saturating_sub(self.origin_ms);
            let upto = (elapsed / 1000).min(total_secs);
            // The final second counts down to 0 ahead of the transition cue.
            while self.next_second <= upto {
                let second = self.next_second;
                if second == time_secs && second < total_secs {
                    let at = datetime_from_ms(self.origin_ms + second * 1000);
                    self.emit(Event::RestStarted { index: self.index, at }, events);
                }
                let remaining = if second < time_secs {
                    time_secs - second
                } else {
                    total_secs - second
                };
                self.countdown(remaining, now, events);
                self.next_second += 1;
            }

            if elapsed < total_ms {
                self.current_time_ms = elapsed;
                return;
            }

            self.origin_ms += total_ms;
            self.index += 1;
            self.current_time_ms = 0;
            if self.index >= self.exercises.len() {
                self.finish(now, events);
                return;
            }
            self.begin_exercise(now, events);
            if let Some(session) = self.session.as_mut() {
                session.extend_to(datetime_from_ms(now));
            }
            self.publish_session();
        }
    }

    fn begin_exercise(&mut self, now: u64, events: &mut Vec<Event>) {
        self.current_time_ms = 0;
        self.next_second = 1;
        let Some(name) = self.current_exercise().map(|ex| ex.name.clone()) else {
            return;
        };
        tracing::debug!(index = self.index, %name, "exercise started");
        self.emit(
            Event::ExerciseStarted {
                index: self.index,
                name,
                at: datetime_from_ms(now),
            },
            events,
        );
    }

    fn countdown(&mut self, remaining: u64, now: u64, events: &mut Vec<Event>) {
        let threshold = u64::from(self.settings.countdown_to_change);
        if threshold > 0 && remaining <= threshold {
            self.emit(
                Event::CountdownTick {
                    index: self.index,
                    remaining_secs: remaining,
                    at: datetime_from_ms(now),
                },
                events,
            );
        }
    }

    fn finish(&mut self, now: u64, events: &mut Vec<Event>) {
        let at = datetime_from_ms(now);
        self.state = PlayState::Complete;
        self.resume_state = None;
        self.index = self.exercises.len();
        self.current_time_ms = 0;
        let session_id = match self.session.as_mut() {
            Some(session) => {
                session.finish(at);
                session.id
            }
            None => Uuid::nil(),
        };
        tracing::info!(training = %self.training_id, session = %session_id, "training complete");
        self.emit(Event::TrainingCompleted { session_id, at }, events);
        self.publish_session();
    }

    fn reset_to_ready(&mut self) {
        self.state = PlayState::Ready;
        self.resume_state = None;
        self.index = 0;
        self.current_time_ms = 0;
        self.start_elapsed_ms = 0;
        self.next_second = 1;
        self.session = None;
    }

    /// Elapsed time that `state` measures.
    fn frozen_ms(&self, state: PlayState) -> u64 {
        match state {
            PlayState::Starting => self.start_elapsed_ms,
            _ => self.current_time_ms,
        }
    }

    fn emit(&mut self, event: Event, events: &mut Vec<Event>) {
        if let Some(cue) = event.cue() {
            self.sounds.dispatch(cue);
        }
        events.push(event);
    }

    fn publish_session(&mut self) {
        if let (Some(callback), Some(session)) = (self.on_session.as_mut(), self.session.as_ref()) {
            callback(session);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::sound::{RecordingPlayer, SoundCue, SoundEffect};
    use std::sync::Mutex;

    const T0: u64 = 1_700_000_000_000;

    fn exercises(training: Uuid, timings: &[(&str, u32, u32)]) -> Vec<Exercise> {
        timings.iter()
            .map(|(name, time, rest)| Exercise::new(training, *name, *time, *rest))
            .collect()
    }

    fn settings(delay: u32, countdown: u32) -> PlaybackSettings {
        PlaybackSettings {
            training_start_delay_secs: delay,
            countdown_to_change: countdown,
            ..PlaybackSettings::default()
        }
    }

    fn engine(timings: &[(&str, u32, u32)], settings: PlaybackSettings) -> (PlaybackEngine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(T0));
        let training = Uuid::new_v4();
        let engine = PlaybackEngine::new(training, exercises(training, timings), settings, clock.clone());
        (engine, clock)
    }

    fn cues(events: &[Event]) -> Vec<SoundCue> {
        events.iter().filter_map(Event::cue).collect()
    }

    /// Advance in `step` ms ticks up to `until` ms after T0, collecting events.
    fn run_until(engine: &mut PlaybackEngine, clock: &ManualClock, step: u64, until: u64) -> Vec<Event> {
        let mut events = Vec::new();
        while clock.now_ms() - T0 < until {
            let next = (clock.now_ms() - T0 + step).min(until);
            clock.set(T0 + next);
            events.extend(engine.tick());
        }
        events
    }

    #[test]
    fn start_enters_starting_with_delay() {
        let (mut e, _) = engine(&[("A", 10, 5)], settings(5, 3));
        let events = e.start();
        assert_eq!(e.state(), PlayState::Starting);
        assert_eq!(cues(&events), vec![SoundCue::TrainingStart]);
        let session = e.session().unwrap();
        assert_eq!(session.date_time_start, session.date_time_end);
        assert!(!session.complete);
    }

    #[test]
    fn zero_delay_goes_straight_to_running() {
        let (mut e, _) = engine(&[("A", 2, 1)], settings(0, 0));
        let events = e.start();
        assert_eq!(e.state(), PlayState::Running);
        assert_eq!(
            cues(&events),
            vec![SoundCue::TrainingStart, SoundCue::ExerciseStart]
        );
    }

    #[test]
    fn starting_countdown_fires_once_per_second() {
        let (mut e, clock) = engine(&[("A", 10, 5)], settings(5, 3));
        e.start();
        let events = run_until(&mut e, &clock, 25, 5_000);
        let remaining: Vec<u64> = events
            .iter()
            .filter_map(|ev| match ev {
                Event::CountdownTick { remaining_secs, .. } => Some(*remaining_secs),
                _ => None,
            })
            .collect();
        assert_eq!(remaining, vec![3, 2, 1, 0]);
        assert_eq!(e.state(), PlayState::Running);
        assert_eq!(cues(&events).last(), Some(&SoundCue::ExerciseStart));
    }

    #[test]
    fn empty_training_stays_ready() {
        let (mut e, _) = engine(&[], settings(0, 3));
        assert!(e.start().is_empty());
        assert_eq!(e.state(), PlayState::Ready);
        assert!(e.session().is_none());
        assert!(e.tick().is_empty());
        assert!(e.skip(3).is_empty());
    }

    #[test]
    fn boundary_is_exact() {
        let (mut e, clock) = engine(&[("A", 4, 2), ("B", 3, 3)], settings(0, 0));
        e.start();
        clock.set(T0 + 5_999);
        e.tick();
        assert_eq!(e.index(), 0);
        assert_eq!(e.current_time_ms(), 5_999);
        clock.set(T0 + 6_000);
        e.tick();
        assert_eq!(e.index(), 1);
        assert_eq!(e.current_time_ms(), 0);
    }

    #[test]
    fn work_then_rest_sub_phases() {
        let (mut e, clock) = engine(&[("A", 2, 1), ("B", 2, 1)], settings(0, 0));
        e.start();
        clock.set(T0 + 1_999);
        e.tick();
        assert_eq!(e.sub_phase(), Some(SubPhase::Work));
        clock.set(T0 + 2_000);
        let events = e.tick();
        assert_eq!(e.sub_phase(), Some(SubPhase::Rest));
        assert_eq!(cues(&events), vec![SoundCue::RestStart]);
        clock.set(T0 + 2_500);
        assert!(e.tick().is_empty());
    }

    #[test]
    fn countdown_window_inside_work_and_rest() {
        let (mut e, clock) = engine(&[("A", 6, 4)], settings(0, 2));
        e.start();
        let events = run_until(&mut e, &clock, 25, 10_000);
        let ticks: Vec<u64> = events
            .iter()
            .filter_map(|ev| match ev {
                Event::CountdownTick { remaining_secs, .. } => Some(*remaining_secs),
                _ => None,
            })
            .collect();
        // Work: seconds 4 and 5 leave 2 and 1. Rest: seconds 8, 9 and 10 leave 2, 1 and 0.
        assert_eq!(ticks, vec![2, 1, 2, 1, 0]);
        assert_eq!(e.state(), PlayState::Complete);
    }

    #[test]
    fn completes_and_marks_session() {
        let (mut e, clock) = engine(&[("A", 1, 1)], settings(0, 0));
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&recorded);
        e = e.on_session_update(Box::new(move |s: &Session| sink.lock().unwrap().push(s.clone())));
        e.start();
        clock.set(T0 + 2_000);
        let events = e.tick();

        assert_eq!(e.state(), PlayState::Complete);
        assert_eq!(e.index(), 1);
        assert_eq!(cues(&events), vec![SoundCue::RestStart, SoundCue::TrainingEnd]);
        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.len(), 2);
        assert!(recorded.iter().all(|s| s.id == recorded[0].id));
        let last = recorded.last().unwrap();
        assert!(last.complete);
        assert_eq!(last.duration_secs(), 2);
    }

    #[test]
    fn pause_freezes_and_resume_continues() {
        let (mut e, clock) = engine(&[("A", 30, 10)], settings(0, 0));
        e.start();
        clock.set(T0 + 12_340);
        e.pause();
        assert_eq!(e.state(), PlayState::Paused);
        assert_eq!(e.current_time_ms(), 12_340);

        clock.advance(60_000);
        assert!(e.tick().is_empty());
        assert_eq!(e.current_time_ms(), 12_340);

        e.resume();
        assert_eq!(e.state(), PlayState::Running);
        clock.advance(1_000);
        e.tick();
        assert_eq!(e.current_time_ms(), 13_340);
    }

    #[test]
    fn pause_during_starting_resumes_countdown() {
        let (mut e, clock) = engine(&[("A", 30, 10)], settings(5, 0));
        e.start();
        clock.set(T0 + 2_000);
        e.pause();
        assert_eq!(e.snapshot().resume_state, Some(PlayState::Starting));
        clock.advance(30_000);
        e.resume();
        assert_eq!(e.state(), PlayState::Starting);
        clock.advance(2_999);
        e.tick();
        assert_eq!(e.state(), PlayState::Starting);
        clock.advance(1);
        e.tick();
        assert_eq!(e.state(), PlayState::Running);
        assert_eq!(e.current_time_ms(), 0);
    }

    #[test]
    fn pause_is_ignored_outside_playback() {
        let (mut e, _) = engine(&[("A", 3, 3)], settings(0, 0));
        assert!(e.pause().is_empty());
        assert!(e.resume().is_empty());
        assert_eq!(e.state(), PlayState::Ready);
    }

    #[test]
    fn skip_clamps_and_restarts_exercise() {
        let (mut e, clock) = engine(&[("A", 5, 5), ("B", 5, 5), ("C", 5, 5)], settings(0, 0));
        e.start();
        clock.set(T0 + 3_000);
        e.tick();

        e.skip(99);
        assert_eq!(e.index(), 2);
        assert_eq!(e.current_time_ms(), 0);
        assert_eq!(e.state(), PlayState::Running);

        clock.advance(1_500);
        e.tick();
        assert_eq!(e.current_time_ms(), 1_500);

        e.skip(-4);
        assert_eq!(e.index(), 0);
        assert_eq!(e.current_time_ms(), 0);
    }

    #[test]
    fn skip_while_paused_starts_fresh_on_resume() {
        let (mut e, clock) = engine(&[("A", 5, 5), ("B", 5, 5)], settings(0, 0));
        e.start();
        clock.set(T0 + 4_000);
        e.pause();
        e.skip(1);
        assert_eq!(e.state(), PlayState::Paused);
        clock.advance(10_000);
        e.resume();
        clock.advance(700);
        e.tick();
        assert_eq!(e.index(), 1);
        assert_eq!(e.current_time_ms(), 700);
    }

    #[test]
    fn restart_only_from_complete() {
        let (mut e, clock) = engine(&[("A", 1, 0)], settings(0, 0));
        assert!(e.restart().is_empty());
        e.start();
        let first = e.session().unwrap().id;
        clock.advance(1_000);
        e.tick();
        assert_eq!(e.state(), PlayState::Complete);
        assert!(e.skip(0).is_empty());

        e.restart();
        assert_eq!(e.state(), PlayState::Ready);
        assert_eq!(e.index(), 0);
        assert!(e.session().is_none());
        e.start();
        assert_ne!(e.session().unwrap().id, first);
    }

    #[test]
    fn large_gap_catches_up_every_transition() {
        let (mut e, clock) = engine(&[("A", 2, 1), ("B", 2, 1), ("C", 2, 1)], settings(0, 0));
        e.start();
        clock.set(T0 + 7_500);
        let events = e.tick();
        assert_eq!(
            cues(&events),
            vec![
                SoundCue::RestStart,
                SoundCue::ExerciseStart,
                SoundCue::RestStart,
                SoundCue::ExerciseStart,
            ]
        );
        assert_eq!(e.index(), 2);
        assert_eq!(e.current_time_ms(), 1_500);
    }

    #[test]
    fn zero_length_exercises_do_not_stall() {
        let (mut e, clock) = engine(&[("A", 0, 0), ("B", 0, 0), ("C", 1, 0)], settings(0, 0));
        e.start();
        assert_eq!(e.index(), 2);
        clock.advance(1_000);
        e.tick();
        assert_eq!(e.state(), PlayState::Complete);
    }

    #[test]
    fn exercises_emptied_mid_playback_returns_to_ready() {
        let (mut e, clock) = engine(&[("A", 5, 5), ("B", 5, 5)], settings(0, 0));
        e.start();
        clock.advance(11_000);
        e.tick();
        assert_eq!(e.index(), 1);

        let training = e.training_id();
        e.set_exercises(exercises(training, &[("Only", 5, 5)]));
        assert_eq!(e.index(), 0);
        assert_eq!(e.state(), PlayState::Running);

        e.set_exercises(Vec::new());
        assert_eq!(e.state(), PlayState::Ready);
        assert!(e.tick().is_empty());
    }

    #[test]
    fn sounds_follow_settings() {
        let player = RecordingPlayer::new();
        let pool = SoundPool::acquire(Box::new(player.clone())).unwrap();
        let mut quiet = settings(0, 1);
        quiet.sounds.rest_start = false;
        let (e, clock) = engine(&[("A", 2, 2)], quiet);
        let mut e = e.with_sounds(pool);
        e.start();
        clock.advance(4_000);
        let events = e.tick();

        // Semantic events still report the rest start.
        assert!(cues(&events).contains(&SoundCue::RestStart));
        assert_eq!(
            player.log().played,
            vec![
                SoundEffect::Whistle,
                SoundEffect::Bell,
                SoundEffect::Beep,
                SoundEffect::Beep,
                SoundEffect::Beep,
                SoundEffect::Fanfare,
            ]
        );
        drop(e);
        assert!(player.log().released);
    }

    fn labels(events: &[Event]) -> Vec<String> {
        events
            .iter()
            .filter_map(|ev| match ev {
                Event::ExerciseStarted { .. } => Some("ex".to_string()),
                Event::RestStarted { .. } => Some("rest".to_string()),
                Event::CountdownTick { remaining_secs, .. } => Some(format!("cd{remaining_secs}")),
                Event::TrainingCompleted { .. } => Some("end".to_string()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn short_rest_counts_down_from_its_first_second() {
        let (mut e, clock) = engine(&[("A", 4, 2)], settings(0, 3));
        let mut events = e.start();
        events.extend(run_until(&mut e, &clock, 10, 6_000));
        assert_eq!(
            labels(&events),
            ["ex", "cd3", "cd2", "cd1", "rest", "cd2", "cd1", "cd0", "end"]
        );
    }

    #[test]
    fn zero_remaining_fires_before_the_transition() {
        let (mut e, clock) = engine(&[("A", 1, 0), ("B", 2, 0)], settings(2, 1));
        let mut events = e.start();
        events.extend(run_until(&mut e, &clock, 25, 5_000));
        assert_eq!(
            labels(&events),
            ["cd1", "cd0", "ex", "cd0", "ex", "cd1", "cd0", "end"]
        );
    }

    #[test]
    fn zero_threshold_never_counts_down() {
        let (mut e, clock) = engine(&[("A", 2, 1)], settings(2, 0));
        let mut events = e.start();
        events.extend(run_until(&mut e, &clock, 25, 5_000));
        assert_eq!(labels(&events), ["ex", "rest", "end"]);
    }

    #[test]
    fn settings_change_applies_to_the_next_cue() {
        let player = RecordingPlayer::new();
        let pool = SoundPool::acquire(Box::new(player.clone())).unwrap();
        let (e, clock) = engine(&[("A", 2, 2), ("B", 2, 2)], settings(0, 0));
        let mut e = e.with_sounds(pool);
        e.start();
        clock.set(T0 + 2_000);
        e.tick();

        let mut quiet = settings(0, 1);
        quiet.sounds.rest_start = false;
        e.set_settings(quiet);
        assert_eq!(e.settings().countdown_to_change, 1);
        let events = run_until(&mut e, &clock, 25, 8_000);

        assert!(cues(&events).contains(&SoundCue::RestStart));
        assert_eq!(
            player.log().played,
            vec![
                SoundEffect::Whistle,
                SoundEffect::Bell,
                SoundEffect::Chime,
                // From here on the new settings apply.
                SoundEffect::Beep,
                SoundEffect::Beep,
                SoundEffect::Bell,
                SoundEffect::Beep,
                SoundEffect::Beep,
                SoundEffect::Beep,
                SoundEffect::Fanfare,
            ]
        );
    }
}
