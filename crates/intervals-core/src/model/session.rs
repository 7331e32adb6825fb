use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One playback attempt of a training.
///
/// `date_time_end` is advanced at every exercise transition so an
/// interrupted session still records how far it got.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub training: Uuid,
    pub date_time_start: DateTime<Utc>,
    pub date_time_end: DateTime<Utc>,
    pub complete: bool,
}

impl Session {
    pub fn begin(training: Uuid, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            training,
            date_time_start: at,
            date_time_end: at,
            complete: false,
        }
    }

    /// Move the end mark forward. Never moves before the start.
    pub fn extend_to(&mut self, at: DateTime<Utc>) {
        self.date_time_end = at.max(self.date_time_start).max(self.date_time_end);
    }

    /// Mark finished. Completion is sticky.
    pub fn finish(&mut self, at: DateTime<Utc>) {
        self.extend_to(at);
        self.complete = true;
    }

    pub fn duration_secs(&self) -> u64 {
        (self.date_time_end - self.date_time_start)
            .num_seconds()
            .max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn end_never_precedes_start() {
        let start = Utc::now();
        let mut s = Session::begin(Uuid::new_v4(), start);
        s.extend_to(start - Duration::seconds(30));
        assert_eq!(s.date_time_end, start);
        assert_eq!(s.duration_secs(), 0);
    }

    #[test]
    fn finish_sets_complete_and_end() {
        let start = Utc::now();
        let mut s = Session::begin(Uuid::new_v4(), start);
        s.finish(start + Duration::seconds(95));
        assert!(s.complete);
        assert_eq!(s.duration_secs(), 95);
    }
}
