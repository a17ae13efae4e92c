//! Progress backend seam and the local implementation.
//!
//! [`ProgressBackend`] is the interface the outcome dispatcher talks to:
//! the four stats-service operations, independent of whether they run
//! against the local store or a remote service. [`LocalService`] is the
//! server-side logic itself - record the interval, recompute the streak
//! from the day's cumulative total, persist - run against the local store.

use chrono::{DateTime, Utc};

use crate::api::types::{DailyCount, OutcomeRequest, StatsSummary};
use crate::error::{CoreError, ValidationError};
use crate::storage::database::{month_start, week_start_sunday};
use crate::storage::{Database, TaskRecord};
use crate::streak::{compute_next_state, SessionOutcome, StreakState};

/// The stats-service operations as seen by the dispatcher and the CLI.
pub trait ProgressBackend {
    /// Record an interval outcome and apply the resulting streak update.
    /// Returns the updated progress state.
    fn record_outcome(&mut self, req: &OutcomeRequest) -> Result<StreakState, CoreError>;

    /// Aggregate minutes over day/week/month/all-time plus streaks.
    fn fetch_summary(&self) -> Result<StatsSummary, CoreError>;

    /// Trailing 7 calendar days of minutes, oldest first, zero-filled.
    fn daily_history(&self) -> Result<Vec<DailyCount>, CoreError>;

    /// Credit one completed focus interval to a task.
    fn add_task_pomodoro(
        &mut self,
        task_id: &str,
        duration_min: Option<u32>,
    ) -> Result<TaskRecord, CoreError>;
}

impl<T: ProgressBackend + ?Sized> ProgressBackend for Box<T> {
    fn record_outcome(&mut self, req: &OutcomeRequest) -> Result<StreakState, CoreError> {
        (**self).record_outcome(req)
    }

    fn fetch_summary(&self) -> Result<StatsSummary, CoreError> {
        (**self).fetch_summary()
    }

    fn daily_history(&self) -> Result<Vec<DailyCount>, CoreError> {
        (**self).daily_history()
    }

    fn add_task_pomodoro(
        &mut self,
        task_id: &str,
        duration_min: Option<u32>,
    ) -> Result<TaskRecord, CoreError> {
        (**self).add_task_pomodoro(task_id, duration_min)
    }
}

/// [`ProgressBackend`] over the local SQLite store.
pub struct LocalService {
    db: Database,
    daily_goal_min: u32,
}

impl LocalService {
    pub fn new(db: Database, daily_goal_min: u32) -> Self {
        Self { db, daily_goal_min }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// `record_outcome` with an explicit clock, for determinism.
    ///
    /// The append and the progress read-modify-write run in one
    /// transaction, so concurrent writers cannot interleave between the
    /// streak read and its write-back.
    pub fn record_outcome_at(
        &mut self,
        req: &OutcomeRequest,
        now: DateTime<Utc>,
    ) -> Result<StreakState, CoreError> {
        // Validation rejects before any state mutation.
        if let Some(0) = req.duration {
            return Err(ValidationError::InvalidDuration { minutes: 0 }.into());
        }
        let outcome = if req.completed {
            SessionOutcome::Completed
        } else {
            SessionOutcome::Interrupted
        };
        let token = match outcome {
            SessionOutcome::Completed => req.reward.as_deref(),
            SessionOutcome::Interrupted => req.punishment.as_deref(),
        };

        let tx = self.db.conn().unchecked_transaction()?;
        if let Some(duration) = req.duration {
            self.db
                .append_interval(req.task_id.as_deref(), req.completed, duration, now)?;
        }
        let today = now.date_naive();
        // Goal attainment is cumulative: the whole day's total, including
        // the interval just appended.
        let today_total = self.db.minutes_on_day(today)?;
        let prev = self.db.load_progress()?;
        let next = compute_next_state(&prev, today, today_total, self.daily_goal_min, outcome, token);
        self.db.save_progress(&next)?;
        tx.commit().map_err(crate::error::StorageError::from)?;
        Ok(next)
    }

    /// `fetch_summary` with an explicit clock, for determinism.
    pub fn fetch_summary_at(&self, now: DateTime<Utc>) -> Result<StatsSummary, CoreError> {
        let today = now.date_naive();
        let daily = self.db.minutes_on_day(today)?;
        let progress = self.db.load_progress()?;
        Ok(StatsSummary {
            daily,
            weekly: self.db.minutes_since(week_start_sunday(today))?,
            monthly: self.db.minutes_since(month_start(today))?,
            all_time: self.db.minutes_all_time()?,
            current_streak: progress.current_streak,
            longest_streak: progress.longest_streak,
            daily_goal: self.daily_goal_min,
            today_focus_time: daily,
        })
    }

    pub fn daily_history_at(&self, now: DateTime<Utc>) -> Result<Vec<DailyCount>, CoreError> {
        let history = self.db.daily_history(now.date_naive())?;
        Ok(history
            .into_iter()
            .map(|(date, count)| DailyCount { date, count })
            .collect())
    }
}

impl ProgressBackend for LocalService {
    fn record_outcome(&mut self, req: &OutcomeRequest) -> Result<StreakState, CoreError> {
        self.record_outcome_at(req, Utc::now())
    }

    fn fetch_summary(&self) -> Result<StatsSummary, CoreError> {
        self.fetch_summary_at(Utc::now())
    }

    fn daily_history(&self) -> Result<Vec<DailyCount>, CoreError> {
        self.daily_history_at(Utc::now())
    }

    fn add_task_pomodoro(
        &mut self,
        task_id: &str,
        duration_min: Option<u32>,
    ) -> Result<TaskRecord, CoreError> {
        self.db
            .add_task_pomodoro(task_id, duration_min)?
            .ok_or_else(|| ValidationError::UnknownTask(task_id.to_string()).into())
    }
}
