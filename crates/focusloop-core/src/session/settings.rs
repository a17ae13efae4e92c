use serde::{Deserialize, Serialize};

/// Which half of the work/break cycle the machine is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Focus,
    Break,
}

/// Durations and entry rules for a session.
///
/// Applied on phase entry only: changing these while a countdown is
/// running never retroactively alters the in-flight remaining time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Focus phase length in minutes.
    #[serde(default = "default_focus_minutes")]
    pub focus_minutes: u32,
    /// Break phase length in minutes.
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u32,
    /// Whether entering FOCUS requires a selected task.
    #[serde(default)]
    pub require_task: bool,
}

fn default_focus_minutes() -> u32 {
    25
}
fn default_break_minutes() -> u32 {
    5
}

impl SessionSettings {
    /// Configured duration for `phase`, in seconds.
    ///
    /// Uses saturating arithmetic to prevent overflow with large values.
    pub fn phase_secs(&self, phase: Phase) -> u32 {
        self.phase_min(phase).saturating_mul(60)
    }

    /// Configured duration for `phase`, in minutes.
    pub fn phase_min(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Focus => self.focus_minutes,
            Phase::Break => self.break_minutes,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            focus_minutes: default_focus_minutes(),
            break_minutes: default_break_minutes(),
            require_task: false,
        }
    }
}
