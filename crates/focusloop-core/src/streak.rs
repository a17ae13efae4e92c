//! Streak and daily-goal calculation.
//!
//! Pure function over a user's prior streak state and today's cumulative
//! focus minutes. No I/O, deterministic given its inputs: callers pass
//! "today" explicitly, normalized to a UTC calendar day.
//!
//! A streak is a run of consecutive calendar days on which the daily
//! focus-minutes goal was met. Goal attainment is cumulative over the whole
//! day, so the caller must pass the day's *total* minutes, not just the
//! interval that triggered the update.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Terminal result of a focus interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionOutcome {
    Completed,
    Interrupted,
}

/// A user's progress counters and streak state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreakState {
    pub completed_count: u32,
    pub skipped_count: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Calendar day (UTC) of the last streak-counting update.
    pub last_update: Option<NaiveDate>,
    pub last_reward: Option<String>,
    pub last_punishment: Option<String>,
}

/// Apply one interval outcome to the streak state.
///
/// `today_focus_min` is the day's cumulative total including the interval
/// being applied; `token` is the reward or punishment text selected for
/// this outcome, recorded on the state as the last one shown.
///
/// Rules:
/// - completed + goal met: no prior date => streak starts at 1; gap of one
///   day => streak extends; gap over one day => streak restarts at 1 (the
///   goal *was* met today); same day => idempotent.
/// - completed without the goal, or interrupted: the streak never grows,
///   and a gap of two or more days since the last update zeroes it.
/// - `longest_streak` = max of itself and `current_streak`, always.
/// - a `last_update` in the future is treated as "no prior streak" rather
///   than raised, so clock skew cannot corrupt a user's progress.
pub fn compute_next_state(
    prev: &StreakState,
    today: NaiveDate,
    today_focus_min: u32,
    daily_goal_min: u32,
    outcome: SessionOutcome,
    token: Option<&str>,
) -> StreakState {
    let mut next = prev.clone();

    // Day gap since the last update; a future date counts as no history.
    let gap = prev
        .last_update
        .filter(|d| *d <= today)
        .map(|d| (today - d).num_days());

    match outcome {
        SessionOutcome::Completed => {
            next.completed_count = prev.completed_count.saturating_add(1);
            next.last_reward = token.map(str::to_owned);

            let goal_met = today_focus_min >= daily_goal_min;
            if goal_met {
                match gap {
                    None => next.current_streak = 1,
                    Some(0) => {} // Same day, already counted.
                    Some(1) => next.current_streak = prev.current_streak.saturating_add(1),
                    Some(_) => next.current_streak = 1,
                }
                next.last_update = Some(today);
            } else if matches!(gap, Some(g) if g >= 2) {
                next.current_streak = 0;
            }
        }
        SessionOutcome::Interrupted => {
            next.skipped_count = prev.skipped_count.saturating_add(1);
            next.last_punishment = token.map(str::to_owned);
            if matches!(gap, Some(g) if g >= 2) {
                next.current_streak = 0;
            }
        }
    }

    next.longest_streak = next.longest_streak.max(next.current_streak);
    next
}
