mod machine;
mod settings;

pub use machine::{InterruptReport, SessionMachine, SessionState, TickToken};
pub use settings::{Phase, SessionSettings};
