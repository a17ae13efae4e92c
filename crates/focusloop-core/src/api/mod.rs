mod client;
pub mod types;

pub use client::RemoteClient;
pub use types::{DailyCount, OutcomeRequest, PomodoroStats, StatsSummary, UserSnapshot};
