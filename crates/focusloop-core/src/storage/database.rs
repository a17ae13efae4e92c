//! SQLite-backed interval log and progress store.
//!
//! Provides persistent storage for:
//! - The append-only log of completed/interrupted focus intervals
//! - The single-row user progress state (counters + streaks)
//! - Task records with pomodoro counts
//! - A key-value store for transient application state
//!
//! All calendar boundaries (day, week, month) are evaluated in UTC.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::data_dir;
use crate::error::StorageError;
use crate::streak::StreakState;

/// One appended row of the interval log. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalRecord {
    pub id: i64,
    pub task_id: Option<String>,
    pub completed: bool,
    pub duration_min: u32,
    pub completed_at: DateTime<Utc>,
}

/// A task with its accumulated pomodoro count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    pub estimated_pomodoros: u32,
    pub completed_pomodoros: u32,
    pub spent_min: u32,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// SQLite store for the interval log, progress state, and tasks.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the store at `~/.config/focusloop/focusloop.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let path = data_dir()?.join("focusloop.db");
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory store (for tests).
    #[cfg(test)]
    pub fn open_memory() -> Result<Self, Box<dyn std::error::Error>> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS intervals (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id      TEXT,
                completed    INTEGER NOT NULL,
                duration_min INTEGER NOT NULL CHECK (duration_min > 0),
                completed_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS progress (
                id              INTEGER PRIMARY KEY CHECK (id = 1),
                completed_count INTEGER NOT NULL DEFAULT 0,
                skipped_count   INTEGER NOT NULL DEFAULT 0,
                current_streak  INTEGER NOT NULL DEFAULT 0,
                longest_streak  INTEGER NOT NULL DEFAULT 0,
                last_update     TEXT,
                last_reward     TEXT,
                last_punishment TEXT
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id                  TEXT PRIMARY KEY,
                title               TEXT NOT NULL,
                estimated_pomodoros INTEGER NOT NULL,
                completed_pomodoros INTEGER NOT NULL DEFAULT 0,
                spent_min           INTEGER NOT NULL DEFAULT 0,
                completed           INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            INSERT OR IGNORE INTO progress (id) VALUES (1);

            CREATE INDEX IF NOT EXISTS idx_intervals_completed_at ON intervals(completed_at);
            CREATE INDEX IF NOT EXISTS idx_intervals_task_id ON intervals(task_id);",
        )?;
        Ok(())
    }

    // ── Interval log ─────────────────────────────────────────────────

    /// Append one interval to the log. The log is append-only; nothing in
    /// this store updates or deletes interval rows.
    ///
    /// # Errors
    /// Returns an error if the insert fails (including duration_min = 0,
    /// which the schema rejects).
    pub fn append_interval(
        &self,
        task_id: Option<&str>,
        completed: bool,
        duration_min: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO intervals (task_id, completed, duration_min, completed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![task_id, completed, duration_min, completed_at.to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recently logged intervals, newest first.
    pub fn recent_intervals(&self, limit: u32) -> Result<Vec<IntervalRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, task_id, completed, duration_min, completed_at
             FROM intervals ORDER BY completed_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(IntervalRecord {
                id: row.get(0)?,
                task_id: row.get(1)?,
                completed: row.get(2)?,
                duration_min: row.get(3)?,
                completed_at: row
                    .get::<_, String>(4)?
                    .parse::<DateTime<Utc>>()
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;
        let mut intervals = Vec::new();
        for row in rows {
            intervals.push(row?);
        }
        Ok(intervals)
    }

    /// Sum of logged minutes on one UTC calendar day.
    pub fn minutes_on_day(&self, day: NaiveDate) -> Result<u32, StorageError> {
        let start = day_start(day);
        let end = day_start(day + Duration::days(1));
        let total = self.conn.query_row(
            "SELECT COALESCE(SUM(duration_min), 0) FROM intervals
             WHERE completed_at >= ?1 AND completed_at < ?2",
            params![start, end],
            |row| row.get::<_, u32>(0),
        )?;
        Ok(total)
    }

    /// Sum of logged minutes since a UTC calendar day (inclusive).
    pub fn minutes_since(&self, day: NaiveDate) -> Result<u32, StorageError> {
        let start = day_start(day);
        let total = self.conn.query_row(
            "SELECT COALESCE(SUM(duration_min), 0) FROM intervals
             WHERE completed_at >= ?1",
            params![start],
            |row| row.get::<_, u32>(0),
        )?;
        Ok(total)
    }

    /// Sum of all logged minutes.
    pub fn minutes_all_time(&self) -> Result<u32, StorageError> {
        let total = self.conn.query_row(
            "SELECT COALESCE(SUM(duration_min), 0) FROM intervals",
            [],
            |row| row.get::<_, u32>(0),
        )?;
        Ok(total)
    }

    /// Per-day minute totals for the trailing 7 calendar days ending on
    /// `today`, oldest first. Days without intervals are zero-filled, so
    /// the result always has exactly 7 entries with strictly increasing
    /// dates.
    pub fn daily_history(&self, today: NaiveDate) -> Result<Vec<(NaiveDate, u32)>, StorageError> {
        let window_start = today - Duration::days(6);
        let start = day_start(window_start);
        let end = day_start(today + Duration::days(1));

        let mut stmt = self.conn.prepare(
            "SELECT substr(completed_at, 1, 10), COALESCE(SUM(duration_min), 0)
             FROM intervals
             WHERE completed_at >= ?1 AND completed_at < ?2
             GROUP BY substr(completed_at, 1, 10)",
        )?;
        let rows = stmt.query_map(params![start, end], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
        })?;

        let mut by_day = std::collections::HashMap::new();
        for row in rows {
            let (day, minutes) = row?;
            by_day.insert(day, minutes);
        }

        let mut history = Vec::with_capacity(7);
        for offset in 0..7 {
            let day = window_start + Duration::days(offset);
            let key = day.format("%Y-%m-%d").to_string();
            history.push((day, by_day.get(&key).copied().unwrap_or(0)));
        }
        Ok(history)
    }

    // ── Progress state ───────────────────────────────────────────────

    /// Load the single-row user progress state.
    pub fn load_progress(&self) -> Result<StreakState, StorageError> {
        let state = self.conn.query_row(
            "SELECT completed_count, skipped_count, current_streak, longest_streak,
                    last_update, last_reward, last_punishment
             FROM progress WHERE id = 1",
            [],
            |row| {
                Ok(StreakState {
                    completed_count: row.get(0)?,
                    skipped_count: row.get(1)?,
                    current_streak: row.get(2)?,
                    longest_streak: row.get(3)?,
                    last_update: row
                        .get::<_, Option<String>>(4)?
                        .and_then(|d| d.parse().ok()),
                    last_reward: row.get(5)?,
                    last_punishment: row.get(6)?,
                })
            },
        )?;
        Ok(state)
    }

    /// Overwrite the single-row user progress state.
    pub fn save_progress(&self, state: &StreakState) -> Result<(), StorageError> {
        self.conn.execute(
            "UPDATE progress SET
                completed_count = ?1, skipped_count = ?2,
                current_streak = ?3, longest_streak = ?4,
                last_update = ?5, last_reward = ?6, last_punishment = ?7
             WHERE id = 1",
            params![
                state.completed_count,
                state.skipped_count,
                state.current_streak,
                state.longest_streak,
                state.last_update.map(|d| d.format("%Y-%m-%d").to_string()),
                state.last_reward,
                state.last_punishment,
            ],
        )?;
        Ok(())
    }

    // ── Tasks ────────────────────────────────────────────────────────

    /// Create a task with a fresh id.
    pub fn insert_task(
        &self,
        title: &str,
        estimated_pomodoros: u32,
    ) -> Result<TaskRecord, StorageError> {
        let task = TaskRecord {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            estimated_pomodoros,
            completed_pomodoros: 0,
            spent_min: 0,
            completed: false,
            created_at: Utc::now(),
        };
        self.conn.execute(
            "INSERT INTO tasks (id, title, estimated_pomodoros, completed_pomodoros,
                                spent_min, completed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                task.id,
                task.title,
                task.estimated_pomodoros,
                task.completed_pomodoros,
                task.spent_min,
                task.completed,
                task.created_at.to_rfc3339(),
            ],
        )?;
        Ok(task)
    }

    pub fn get_task(&self, id: &str) -> Result<Option<TaskRecord>, StorageError> {
        let task = self
            .conn
            .query_row(
                "SELECT id, title, estimated_pomodoros, completed_pomodoros,
                        spent_min, completed, created_at
                 FROM tasks WHERE id = ?1",
                params![id],
                row_to_task,
            )
            .optional()?;
        Ok(task)
    }

    pub fn list_tasks(&self) -> Result<Vec<TaskRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, estimated_pomodoros, completed_pomodoros,
                    spent_min, completed, created_at
             FROM tasks ORDER BY created_at",
        )?;
        let rows = stmt.query_map([], row_to_task)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    /// Credit one completed focus interval to a task, marking the task
    /// complete when its accumulated count reaches its estimate. Returns
    /// the updated record.
    pub fn add_task_pomodoro(
        &self,
        id: &str,
        duration_min: Option<u32>,
    ) -> Result<Option<TaskRecord>, StorageError> {
        let Some(task) = self.get_task(id)? else {
            return Ok(None);
        };
        let completed_pomodoros = task.completed_pomodoros.saturating_add(1);
        let spent_min = task.spent_min.saturating_add(duration_min.unwrap_or(0));
        let completed = task.completed || completed_pomodoros >= task.estimated_pomodoros;
        self.conn.execute(
            "UPDATE tasks SET completed_pomodoros = ?2, spent_min = ?3, completed = ?4
             WHERE id = ?1",
            params![id, completed_pomodoros, spent_min, completed],
        )?;
        Ok(Some(TaskRecord {
            completed_pomodoros,
            spent_min,
            completed,
            ..task
        }))
    }

    pub fn mark_task_done(&self, id: &str) -> Result<bool, StorageError> {
        let changed = self.conn.execute(
            "UPDATE tasks SET completed = 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(changed > 0)
    }

    // ── KV store ─────────────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt
            .query_row(params![key], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(result)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskRecord> {
    Ok(TaskRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        estimated_pomodoros: row.get(2)?,
        completed_pomodoros: row.get(3)?,
        spent_min: row.get(4)?,
        completed: row.get(5)?,
        created_at: row
            .get::<_, String>(6)?
            .parse::<DateTime<Utc>>()
            .unwrap_or_else(|_| Utc::now()),
    })
}

/// RFC3339 string for 00:00:00 UTC on the given day; sorts correctly
/// against stored `to_rfc3339()` timestamps.
fn day_start(day: NaiveDate) -> String {
    format!("{}T00:00:00+00:00", day.format("%Y-%m-%d"))
}

/// First day of the week containing `day`, with weeks starting on Sunday.
pub fn week_start_sunday(day: NaiveDate) -> NaiveDate {
    day - Duration::days(day.weekday().num_days_from_sunday() as i64)
}

/// First day of the month containing `day`.
pub fn month_start(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: &str, hm: &str) -> DateTime<Utc> {
        format!("{day}T{hm}:00+00:00").parse().unwrap()
    }

    #[test]
    fn append_and_sum_by_day() {
        let db = Database::open_memory().unwrap();
        db.append_interval(None, true, 25, at("2026-08-30", "09:00"))
            .unwrap();
        db.append_interval(None, false, 10, at("2026-08-30", "15:30"))
            .unwrap();
        db.append_interval(None, true, 25, at("2026-08-29", "23:59"))
            .unwrap();

        let today = "2026-08-30".parse().unwrap();
        assert_eq!(db.minutes_on_day(today).unwrap(), 35);
        assert_eq!(db.minutes_since(today).unwrap(), 35);
        assert_eq!(db.minutes_all_time().unwrap(), 60);
    }

    #[test]
    fn recent_intervals_newest_first() {
        let db = Database::open_memory().unwrap();
        db.append_interval(Some("t1"), true, 25, at("2026-08-29", "09:00"))
            .unwrap();
        db.append_interval(None, false, 5, at("2026-08-30", "09:00"))
            .unwrap();
        let recent = db.recent_intervals(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert!(!recent[0].completed);
        assert_eq!(recent[1].task_id.as_deref(), Some("t1"));
        assert_eq!(db.recent_intervals(1).unwrap().len(), 1);
    }

    #[test]
    fn zero_duration_interval_is_rejected() {
        let db = Database::open_memory().unwrap();
        assert!(db
            .append_interval(None, false, 0, at("2026-08-30", "09:00"))
            .is_err());
    }

    #[test]
    fn daily_history_zero_fills_seven_days() {
        let db = Database::open_memory().unwrap();
        let today: NaiveDate = "2026-08-30".parse().unwrap();
        let history = db.daily_history(today).unwrap();
        assert_eq!(history.len(), 7);
        assert!(history.iter().all(|(_, count)| *count == 0));
        assert_eq!(history[6].0, today);
        for pair in history.windows(2) {
            assert_eq!(pair[1].0 - pair[0].0, Duration::days(1));
        }
    }

    #[test]
    fn daily_history_places_minutes_on_their_day() {
        let db = Database::open_memory().unwrap();
        db.append_interval(None, true, 25, at("2026-08-28", "10:00"))
            .unwrap();
        db.append_interval(None, true, 30, at("2026-08-30", "10:00"))
            .unwrap();
        // Outside the window, must not appear.
        db.append_interval(None, true, 99, at("2026-08-20", "10:00"))
            .unwrap();

        let today: NaiveDate = "2026-08-30".parse().unwrap();
        let history = db.daily_history(today).unwrap();
        assert_eq!(history[4], ("2026-08-28".parse().unwrap(), 25));
        assert_eq!(history[6], (today, 30));
        let total: u32 = history.iter().map(|(_, c)| c).sum();
        assert_eq!(total, 55);
    }

    #[test]
    fn progress_roundtrip() {
        let db = Database::open_memory().unwrap();
        let fresh = db.load_progress().unwrap();
        assert_eq!(fresh, StreakState::default());

        let state = StreakState {
            completed_count: 12,
            skipped_count: 3,
            current_streak: 4,
            longest_streak: 9,
            last_update: Some("2026-08-30".parse().unwrap()),
            last_reward: Some("coffee".into()),
            last_punishment: None,
        };
        db.save_progress(&state).unwrap();
        assert_eq!(db.load_progress().unwrap(), state);
    }

    #[test]
    fn task_pomodoro_count_completes_at_estimate() {
        let db = Database::open_memory().unwrap();
        let task = db.insert_task("Write report", 2).unwrap();
        assert!(!task.completed);

        let task = db.add_task_pomodoro(&task.id, Some(25)).unwrap().unwrap();
        assert_eq!(task.completed_pomodoros, 1);
        assert_eq!(task.spent_min, 25);
        assert!(!task.completed);

        let task = db.add_task_pomodoro(&task.id, Some(25)).unwrap().unwrap();
        assert_eq!(task.completed_pomodoros, 2);
        assert!(task.completed);
    }

    #[test]
    fn add_pomodoro_to_unknown_task() {
        let db = Database::open_memory().unwrap();
        assert!(db.add_task_pomodoro("nope", None).unwrap().is_none());
    }

    #[test]
    fn week_starts_on_sunday() {
        // 2026-08-30 is a Sunday.
        let sunday: NaiveDate = "2026-08-30".parse().unwrap();
        assert_eq!(week_start_sunday(sunday), sunday);
        let wednesday: NaiveDate = "2026-09-02".parse().unwrap();
        assert_eq!(week_start_sunday(wednesday), sunday);
    }

    #[test]
    fn month_start_clamps_to_first() {
        let day: NaiveDate = "2026-08-30".parse().unwrap();
        assert_eq!(month_start(day), "2026-08-01".parse().unwrap());
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
    }
}
