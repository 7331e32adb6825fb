//! SQLite-based storage for trainings, exercises and sessions.
//!
//! Provides persistent storage for:
//! - Trainings and their ordered exercise lists
//! - Playback sessions (upserted by id while a training plays)
//! - Session totals per training and date range

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::data_dir;
use super::sessions::{SessionFilter, SessionStore};
use crate::error::{DatabaseError, Result, ValidationError};
use crate::model::{Exercise, ExerciseIcon, Session, Training};

/// SQLite database for trainings and sessions.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

type TrainingRow = (String, String, u32, u32, String, u64);
type ExerciseRow = (String, String, String, String, u32, u32);
type SessionRow = (String, String, String, String, bool);

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/intervals/intervals.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("intervals.db"))
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS trainings (
                id                TEXT PRIMARY KEY,
                name              TEXT NOT NULL,
                default_time_secs INTEGER NOT NULL,
                default_rest_secs INTEGER NOT NULL,
                last_used         TEXT NOT NULL,
                total_time_secs   INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS exercises (
                id        TEXT PRIMARY KEY,
                training  TEXT NOT NULL,
                position  INTEGER NOT NULL,
                name      TEXT NOT NULL,
                icon      TEXT NOT NULL DEFAULT 'none',
                time_secs INTEGER NOT NULL,
                rest_secs INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                id         TEXT PRIMARY KEY,
                training   TEXT NOT NULL,
                started_at TEXT NOT NULL,
                ended_at   TEXT NOT NULL,
                complete   INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_exercises_training ON exercises(training, position);
            CREATE INDEX IF NOT EXISTS idx_sessions_training_started ON sessions(training, started_at);
            CREATE INDEX IF NOT EXISTS idx_sessions_started ON sessions(started_at);",
        )?;
        Ok(())
    }

    // ── Trainings ────────────────────────────────────────────────────

    /// Insert or update a training. Returns the stored copy, no longer a
    /// draft and with its total recomputed from the stored exercises.
    pub fn save_training(&self, training: &Training) -> Result<Training> {
        require_name("training name", &training.name)?;
        let mut stored = training.clone();
        stored.draft = false;
        stored.recompute_total(&self.exercises(training.id)?);
        self.conn.execute(
            "INSERT INTO trainings (id, name, default_time_secs, default_rest_secs, last_used, total_time_secs)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                default_time_secs = excluded.default_time_secs,
                default_rest_secs = excluded.default_rest_secs,
                last_used = excluded.last_used,
                total_time_secs = excluded.total_time_secs",
            params![
                stored.id.to_string(),
                stored.name,
                stored.default_time_secs,
                stored.default_rest_secs,
                fmt_time(stored.last_used),
                stored.total_time_secs,
            ],
        )?;
        Ok(stored)
    }

    pub fn training(&self, id: Uuid) -> Result<Option<Training>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, default_time_secs, default_rest_secs, last_used, total_time_secs
                 FROM trainings WHERE id = ?1",
                params![id.to_string()],
                training_row,
            )
            .optional()?;
        row.map(decode_training).transpose()
    }

    /// All trainings, most recently used first.
    pub fn trainings(&self) -> Result<Vec<Training>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, default_time_secs, default_rest_secs, last_used, total_time_secs
             FROM trainings ORDER BY last_used DESC, name",
        )?;
        let rows = stmt
            .query_map([], training_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(decode_training).collect()
    }

    /// Delete a training and its exercises. Sessions are kept for history.
    pub fn delete_training(&self, id: Uuid) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM exercises WHERE training = ?1",
            params![id.to_string()],
        )?;
        let deleted = tx.execute("DELETE FROM trainings WHERE id = ?1", params![id.to_string()])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    /// Mark a training as just used.
    pub fn touch_training(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE trainings SET last_used = ?2 WHERE id = ?1",
            params![id.to_string(), fmt_time(at)],
        )?;
        if updated == 0 {
            return Err(ValidationError::TrainingNotFound(id).into());
        }
        Ok(())
    }

    /// Copy a training and all its exercises under a new name.
    pub fn duplicate_training(&self, id: Uuid, name: &str) -> Result<Training> {
        let source = self
            .training(id)?
            .ok_or(ValidationError::TrainingNotFound(id))?;
        let copy = Training::new_draft(name, source.default_time_secs, source.default_rest_secs);
        let exercises: Vec<Exercise> = self
            .exercises(id)?
            .iter()
            .map(|e| Exercise {
                training: copy.id,
                ..e.duplicate()
            })
            .collect();
        self.write_exercises(copy.id, &exercises)?;
        self.save_training(&copy)
    }

    // ── Exercises ────────────────────────────────────────────────────

    /// A training's exercises in playback order.
    pub fn exercises(&self, training: Uuid) -> Result<Vec<Exercise>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, training, name, icon, time_secs, rest_secs
             FROM exercises WHERE training = ?1 ORDER BY position",
        )?;
        let rows = stmt
            .query_map(params![training.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, u32>(4)?,
                    row.get::<_, u32>(5)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<ExerciseRow>>>()?;
        rows.into_iter().map(decode_exercise).collect()
    }

    /// Append an exercise to the end of its training.
    pub fn add_exercise(&self, exercise: &Exercise) -> Result<()> {
        require_name("exercise name", &exercise.name)?;
        if self.training(exercise.training)?.is_none() {
            return Err(ValidationError::TrainingNotFound(exercise.training).into());
        }
        let mut exercises = self.exercises(exercise.training)?;
        exercises.push(exercise.clone());
        self.write_exercises(exercise.training, &exercises)
    }

    /// Replace an exercise in place, keeping its position.
    pub fn update_exercise(&self, exercise: &Exercise) -> Result<()> {
        require_name("exercise name", &exercise.name)?;
        let mut exercises = self.exercises(exercise.training)?;
        let slot = exercises
            .iter_mut()
            .find(|e| e.id == exercise.id)
            .ok_or(ValidationError::ExerciseNotFound(exercise.id))?;
        *slot = exercise.clone();
        self.write_exercises(exercise.training, &exercises)
    }

    pub fn remove_exercise(&self, training: Uuid, id: Uuid) -> Result<bool> {
        let mut exercises = self.exercises(training)?;
        let before = exercises.len();
        exercises.retain(|e| e.id != id);
        if exercises.len() == before {
            return Ok(false);
        }
        self.write_exercises(training, &exercises)?;
        Ok(true)
    }

    /// Insert a copy right after the original.
    pub fn duplicate_exercise(&self, training: Uuid, id: Uuid) -> Result<Exercise> {
        let mut exercises = self.exercises(training)?;
        let index = exercises
            .iter()
            .position(|e| e.id == id)
            .ok_or(ValidationError::ExerciseNotFound(id))?;
        let copy = exercises[index].duplicate();
        exercises.insert(index + 1, copy.clone());
        self.write_exercises(training, &exercises)?;
        Ok(copy)
    }

    /// Move an exercise to position `to`.
    pub fn move_exercise(&self, training: Uuid, id: Uuid, to: usize) -> Result<()> {
        let mut exercises = self.exercises(training)?;
        if to >= exercises.len() {
            return Err(ValidationError::OutOfBounds {
                collection: "exercises".into(),
                index: to,
                len: exercises.len(),
            }
            .into());
        }
        let from = exercises
            .iter()
            .position(|e| e.id == id)
            .ok_or(ValidationError::ExerciseNotFound(id))?;
        let exercise = exercises.remove(from);
        exercises.insert(to, exercise);
        self.write_exercises(training, &exercises)
    }

    /// Rewrite a training's exercise list and refresh its cached total.
    fn write_exercises(&self, training: Uuid, exercises: &[Exercise]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM exercises WHERE training = ?1",
            params![training.to_string()],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO exercises (id, training, position, name, icon, time_secs, rest_secs)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for (position, e) in exercises.iter().enumerate() {
                insert.execute(params![
                    e.id.to_string(),
                    training.to_string(),
                    position as i64,
                    e.name,
                    e.icon.key(),
                    e.time_secs,
                    e.rest_secs,
                ])?;
            }
        }
        let total: u64 = exercises.iter().map(Exercise::total_secs).sum();
        tx.execute(
            "UPDATE trainings SET total_time_secs = ?2 WHERE id = ?1",
            params![training.to_string(), total],
        )?;
        tx.commit()?;
        Ok(())
    }
}

impl SessionStore for Database {
    fn upsert(&self, session: &Session) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sessions (id, training, started_at, ended_at, complete)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                ended_at = excluded.ended_at,
                complete = excluded.complete",
            params![
                session.id.to_string(),
                session.training.to_string(),
                fmt_time(session.date_time_start),
                fmt_time(session.date_time_end),
                session.complete,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<Option<Session>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, training, started_at, ended_at, complete FROM sessions WHERE id = ?1",
                params![id.to_string()],
                session_row,
            )
            .optional()?;
        row.map(decode_session).transpose()
    }

    fn list(&self, filter: &SessionFilter) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, training, started_at, ended_at, complete FROM sessions
             WHERE (?1 IS NULL OR training = ?1)
               AND (?2 IS NULL OR started_at >= ?2)
               AND (?3 IS NULL OR started_at < ?3)
             ORDER BY started_at DESC",
        )?;
        let rows = stmt
            .query_map(
                params![
                    filter.training.map(|t| t.to_string()),
                    filter.from.map(fmt_time),
                    filter.to.map(fmt_time),
                ],
                session_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(decode_session).collect()
    }
}

fn require_name(field: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: field.into(),
            message: "must not be blank".into(),
        }
        .into());
    }
    Ok(())
}

/// Fixed-width UTC timestamps, so text comparison orders correctly.
fn fmt_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_time(table: &str, raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptRow {
            table: table.into(),
            message: format!("bad timestamp '{raw}': {e}"),
        })
}

fn parse_id(table: &str, raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|e| DatabaseError::CorruptRow {
        table: table.into(),
        message: format!("bad id '{raw}': {e}"),
    })
}

fn training_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TrainingRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn session_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn decode_training(row: TrainingRow) -> Result<Training> {
    let (id, name, default_time_secs, default_rest_secs, last_used, total_time_secs) = row;
    Ok(Training {
        id: parse_id("trainings", &id)?,
        name,
        default_time_secs,
        default_rest_secs,
        last_used: parse_time("trainings", &last_used)?,
        total_time_secs,
        draft: false,
    })
}

fn decode_exercise(row: ExerciseRow) -> Result<Exercise> {
    let (id, training, name, icon, time_secs, rest_secs) = row;
    Ok(Exercise {
        id: parse_id("exercises", &id)?,
        training: parse_id("exercises", &training)?,
        name,
        icon: ExerciseIcon::from_key(&icon).unwrap_or_default(),
        time_secs,
        rest_secs,
    })
}

fn decode_session(row: SessionRow) -> Result<Session> {
    let (id, training, started_at, ended_at, complete) = row;
    Ok(Session {
        id: parse_id("sessions", &id)?,
        training: parse_id("sessions", &training)?,
        date_time_start: parse_time("sessions", &started_at)?,
        date_time_end: parse_time("sessions", &ended_at)?,
        complete,
    })
}
