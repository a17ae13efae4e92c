use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{Phase, SessionState};

/// Every state change in the engine produces an Event.
/// The CLI prints them as JSON; a GUI would poll for them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        phase: Phase,
        duration_secs: u32,
        session_index: u32,
        at: DateTime<Utc>,
    },
    SessionPaused {
        phase: Phase,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    SessionResumed {
        phase: Phase,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    /// A phase counted down to zero. For FOCUS the machine is now suspended
    /// in AwaitingOutcome until the outcome is resolved.
    PhaseCompleted {
        phase: Phase,
        session_index: u32,
        duration_min: u32,
        at: DateTime<Utc>,
    },
    /// The outcome write finished (or was degraded to a no-op on failure)
    /// and any reward was acknowledged; the machine moved to the next phase.
    OutcomeResolved {
        next_phase: Phase,
        at: DateTime<Utc>,
    },
    /// A focus attempt was cut short. `recorded_min` is the floor of the
    /// elapsed seconds; None means under a minute, nothing to record.
    SessionInterrupted {
        elapsed_secs: u32,
        recorded_min: Option<u32>,
        at: DateTime<Utc>,
    },
    SessionReset {
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: Phase,
        state: SessionState,
        remaining_secs: u32,
        total_secs: u32,
        session_index: u32,
        selected_task: Option<String>,
        at: DateTime<Utc>,
    },
}
