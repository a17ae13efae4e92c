//! # Focusloop Core Library
//!
//! This library provides the core business logic for Focusloop, a personal
//! productivity tracker built around focus/break cycles, a reward and
//! punishment incentive loop, and streak/daily-goal reporting. All
//! operations are available via a standalone CLI binary; a GUI would be a
//! thin layer over the same core library.
//!
//! ## Architecture
//!
//! - **Session State Machine**: a logical-tick countdown driven by the
//!   caller invoking `tick()` once per elapsed second
//! - **Streak & Goal Calculator**: pure streak arithmetic over calendar
//!   days in UTC
//! - **Outcome Dispatcher**: records terminal outcomes, draws incentive
//!   tokens, and gates the focus-to-break transition on acknowledgment
//! - **Storage**: SQLite interval log and TOML-based configuration
//! - **API**: the same four stats operations against a remote service
//!
//! ## Key Components
//!
//! - [`SessionMachine`]: core session state machine
//! - [`compute_next_state`]: streak and daily-goal computation
//! - [`OutcomeDispatcher`]: outcome recording and incentive selection
//! - [`Database`]: interval log and progress persistence
//! - [`Config`]: application configuration management

pub mod api;
pub mod error;
pub mod events;
pub mod outcome;
pub mod service;
pub mod session;
pub mod storage;
pub mod streak;

pub use api::{DailyCount, OutcomeRequest, RemoteClient, StatsSummary};
pub use error::{ApiError, ConfigError, CoreError, StorageError, ValidationError};
pub use events::Event;
pub use outcome::{DispatchReport, OutcomeDispatcher, TokenSelector, UniformSelector};
pub use service::{LocalService, ProgressBackend};
pub use session::{Phase, SessionMachine, SessionSettings, SessionState, TickToken};
pub use storage::{Config, Database, TaskRecord};
pub use streak::{compute_next_state, SessionOutcome, StreakState};
