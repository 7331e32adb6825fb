//! Session sink contract and its in-memory reference implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::model::Session;
use crate::player::SessionCallback;

/// Narrows session queries by training and start date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFilter {
    pub training: Option<Uuid>,
    /// Inclusive lower bound on `date_time_start`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `date_time_start`.
    pub to: Option<DateTime<Utc>>,
}

impl SessionFilter {
    pub fn for_training(training: Uuid) -> Self {
        Self {
            training: Some(training),
            ..Self::default()
        }
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn matches(&self, session: &Session) -> bool {
        self.training.map_or(true, |t| t == session.training)
            && self.from.map_or(true, |from| session.date_time_start >= from)
            && self.to.map_or(true, |to| session.date_time_start < to)
    }
}

/// Aggregated totals over a set of sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTotals {
    pub sessions: u64,
    pub completed: u64,
    pub total_secs: u64,
}

impl SessionTotals {
    pub fn add(&mut self, session: &Session) {
        self.sessions += 1;
        if session.complete {
            self.completed += 1;
        }
        self.total_secs += session.duration_secs();
    }
}

impl<'a> FromIterator<&'a Session> for SessionTotals {
    fn from_iter<I: IntoIterator<Item = &'a Session>>(iter: I) -> Self {
        let mut totals = Self::default();
        for session in iter {
            totals.add(session);
        }
        totals
    }
}

/// Where session records end up.
///
/// `upsert` overwrites by id: calling it repeatedly for one session keeps a
/// single record.
pub trait SessionStore {
    fn upsert(&self, session: &Session) -> Result<()>;

    fn get(&self, id: Uuid) -> Result<Option<Session>>;

    /// Matching sessions, newest first.
    fn list(&self, filter: &SessionFilter) -> Result<Vec<Session>>;

    fn totals(&self, filter: &SessionFilter) -> Result<SessionTotals> {
        Ok(self.list(filter)?.iter().collect())
    }
}

impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    fn upsert(&self, session: &Session) -> Result<()> {
        (**self).upsert(session)
    }

    fn get(&self, id: Uuid) -> Result<Option<Session>> {
        (**self).get(id)
    }

    fn list(&self, filter: &SessionFilter) -> Result<Vec<Session>> {
        (**self).list(filter)
    }

    fn totals(&self, filter: &SessionFilter) -> Result<SessionTotals> {
        (**self).totals(filter)
    }
}

/// Mutex-guarded map of sessions keyed by id.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<Uuid, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemorySessionStore {
    fn upsert(&self, session: &Session) -> Result<()> {
        let mut sessions = self.sessions.lock().map_err(|_| DatabaseError::Poisoned)?;
        sessions.insert(session.id, session.clone());
        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<Option<Session>> {
        let sessions = self.sessions.lock().map_err(|_| DatabaseError::Poisoned)?;
        Ok(sessions.get(&id).cloned())
    }

    fn list(&self, filter: &SessionFilter) -> Result<Vec<Session>> {
        let sessions = self.sessions.lock().map_err(|_| DatabaseError::Poisoned)?;
        let mut out: Vec<Session> = sessions
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.date_time_start.cmp(&a.date_time_start));
        Ok(out)
    }
}

/// Build the engine's session callback on top of a store.
///
/// Write failures are logged and dropped; playback carries on and nothing
/// is retried here.
pub fn session_updater<S>(store: S) -> SessionCallback
where
    S: SessionStore + Send + 'static,
{
    Box::new(move |session: &Session| {
        if let Err(e) = store.upsert(session) {
            tracing::warn!(session = %session.id, "failed to record session: {e}");
        }
    })
}
