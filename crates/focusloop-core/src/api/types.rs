//! Wire types for the stats service surface.
//!
//! Field names follow the service's JSON (camelCase); the same types are
//! used by the local backend so both sides of the seam speak one shape.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::streak::StreakState;

/// Record-interval-outcome request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeRequest {
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub punishment: Option<String>,
    /// Interval length in whole minutes. When present an interval record
    /// is appended; when absent only counters and the streak move (the
    /// attempt lasted under a minute).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

/// The user's pomodoro counters as the service reports them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroStats {
    pub completed_count: u32,
    pub skipped_count: u32,
    #[serde(default)]
    pub last_reward_text: Option<String>,
    #[serde(default)]
    pub last_punishment_text: Option<String>,
}

/// Updated user object returned by the record-outcome operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSnapshot {
    pub pomodoro_stats: PomodoroStats,
    pub current_streak: u32,
    pub longest_streak: u32,
    #[serde(default)]
    pub last_streak_update_date: Option<NaiveDate>,
}

impl From<StreakState> for UserSnapshot {
    fn from(state: StreakState) -> Self {
        Self {
            pomodoro_stats: PomodoroStats {
                completed_count: state.completed_count,
                skipped_count: state.skipped_count,
                last_reward_text: state.last_reward,
                last_punishment_text: state.last_punishment,
            },
            current_streak: state.current_streak,
            longest_streak: state.longest_streak,
            last_streak_update_date: state.last_update,
        }
    }
}

impl From<UserSnapshot> for StreakState {
    fn from(user: UserSnapshot) -> Self {
        Self {
            completed_count: user.pomodoro_stats.completed_count,
            skipped_count: user.pomodoro_stats.skipped_count,
            current_streak: user.current_streak,
            longest_streak: user.longest_streak,
            last_update: user.last_streak_update_date,
            last_reward: user.pomodoro_stats.last_reward_text,
            last_punishment: user.pomodoro_stats.last_punishment_text,
        }
    }
}

/// Aggregate stats over the interval log.
///
/// `weekly` is bounded by a fixed week start (Sunday, UTC) while the daily
/// history endpoint uses a rolling trailing-7-day window; the two windows
/// coincide only when today is the last day of the fixed week.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub daily: u32,
    pub weekly: u32,
    pub monthly: u32,
    pub all_time: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub daily_goal: u32,
    pub today_focus_time: u32,
}

/// One day of the trailing-7-day history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    /// Focus minutes logged on that day.
    pub count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_request_wire_shape() {
        let req = OutcomeRequest {
            completed: true,
            reward: Some("coffee".into()),
            punishment: None,
            duration: Some(25),
            task_id: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["completed"], true);
        assert_eq!(json["reward"], "coffee");
        assert_eq!(json["duration"], 25);
        assert!(json.get("punishment").is_none());
    }

    #[test]
    fn user_snapshot_roundtrips_streak_state() {
        let state = StreakState {
            completed_count: 8,
            skipped_count: 1,
            current_streak: 3,
            longest_streak: 6,
            last_update: Some("2026-08-30".parse().unwrap()),
            last_reward: Some("walk".into()),
            last_punishment: None,
        };
        let back: StreakState = UserSnapshot::from(state.clone()).into();
        assert_eq!(back, state);
    }

    #[test]
    fn summary_uses_camel_case() {
        let summary = StatsSummary {
            all_time: 1200,
            today_focus_time: 40,
            ..StatsSummary::default()
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["allTime"], 1200);
        assert_eq!(json["todayFocusTime"], 40);
        assert!(json.get("all_time").is_none());
    }

    #[test]
    fn daily_count_serializes_date_as_iso() {
        let entry = DailyCount {
            date: "2026-08-30".parse().unwrap(),
            count: 25,
        };
        let json = serde_json::to_value(entry).unwrap();
        assert_eq!(json["date"], "2026-08-30");
    }
}
