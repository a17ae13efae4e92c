//! Outcome dispatch: the glue between a terminal session event and the
//! stats backend.
//!
//! On a completed focus phase the dispatcher draws a reward, records the
//! interval, and keeps the machine suspended until the reward presentation
//! is acknowledged. On an interrupt it draws a punishment and records the
//! elapsed time without ever blocking the machine. A failed backend write
//! degrades to a no-op continuation: the token was selected locally and is
//! still surfaced, and the machine is always released.

use serde::Serialize;

use crate::api::types::OutcomeRequest;
use crate::events::Event;
use crate::service::ProgressBackend;
use crate::session::{SessionMachine, SessionState};
use crate::storage::{IncentivesConfig, TaskRecord};
use crate::streak::{SessionOutcome, StreakState};

use super::selector::TokenSelector;

/// What the dispatcher did with one terminal outcome.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub outcome: SessionOutcome,
    /// Reward or punishment drawn for this outcome, if any.
    pub token: Option<String>,
    /// Updated progress state; None when the backend write failed and the
    /// update was degraded to a no-op.
    pub progress: Option<StreakState>,
    /// Updated task record when a selected task was credited.
    pub task: Option<TaskRecord>,
    /// True when the machine stays suspended until [`OutcomeDispatcher::acknowledge`].
    pub needs_ack: bool,
}

pub struct OutcomeDispatcher<B, S> {
    backend: B,
    selector: S,
    incentives: IncentivesConfig,
}

impl<B: ProgressBackend, S: TokenSelector> OutcomeDispatcher<B, S> {
    pub fn new(backend: B, selector: S, incentives: IncentivesConfig) -> Self {
        Self {
            backend,
            selector,
            incentives,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Handle a focus phase that counted down to zero.
    ///
    /// The machine must be suspended in `AwaitingOutcome`. When no reward
    /// applies (empty list or incentives disabled) the machine proceeds to
    /// the break immediately; otherwise it stays suspended until
    /// [`acknowledge`](Self::acknowledge).
    pub fn handle_focus_complete(&mut self, machine: &mut SessionMachine) -> Option<DispatchReport> {
        if machine.state() != SessionState::AwaitingOutcome {
            return None;
        }
        let token = self.draw(SessionOutcome::Completed);
        // Floors to whole minutes; a sub-minute completion counts but
        // appends no interval record, same as a sub-minute interrupt.
        let duration_min = machine.elapsed_secs() / 60;
        let recorded_min = (duration_min >= 1).then_some(duration_min);
        let task_id = machine.selected_task().map(str::to_owned);

        let req = OutcomeRequest {
            completed: true,
            reward: token.clone(),
            punishment: None,
            duration: recorded_min,
            task_id: task_id.clone(),
        };
        let progress = match self.backend.record_outcome(&req) {
            Ok(state) => Some(state),
            Err(e) => {
                eprintln!("warning: outcome write failed, continuing without stats update: {e}");
                None
            }
        };

        // One task credit per completed focus interval.
        let task = task_id.and_then(|id| {
            match self.backend.add_task_pomodoro(&id, recorded_min) {
                Ok(task) => Some(task),
                Err(e) => {
                    eprintln!("warning: failed to credit task '{id}': {e}");
                    None
                }
            }
        });

        let needs_ack = token.is_some();
        if !needs_ack {
            machine.resolve_outcome();
        }
        Some(DispatchReport {
            outcome: SessionOutcome::Completed,
            token,
            progress,
            task,
            needs_ack,
        })
    }

    /// The caller has presented the reward; release the machine into the
    /// break phase.
    pub fn acknowledge(&self, machine: &mut SessionMachine) -> Option<Event> {
        machine.resolve_outcome()
    }

    /// Interrupt a running or paused focus attempt.
    ///
    /// Drives `machine.interrupt()`, records the elapsed duration (when it
    /// floors to at least a minute), and never suspends the machine - the
    /// punishment does not gate the reset.
    pub fn handle_interrupt(&mut self, machine: &mut SessionMachine) -> Option<DispatchReport> {
        let task_id = machine.selected_task().map(str::to_owned);
        let (_event, report) = machine.interrupt()?;
        let token = self.draw(SessionOutcome::Interrupted);

        let req = OutcomeRequest {
            completed: false,
            reward: None,
            punishment: token.clone(),
            duration: report.recorded_min,
            task_id,
        };
        let progress = match self.backend.record_outcome(&req) {
            Ok(state) => Some(state),
            Err(e) => {
                eprintln!("warning: outcome write failed, continuing without stats update: {e}");
                None
            }
        };

        Some(DispatchReport {
            outcome: SessionOutcome::Interrupted,
            token,
            progress,
            task: None,
            needs_ack: false,
        })
    }

    fn draw(&mut self, outcome: SessionOutcome) -> Option<String> {
        if !self.incentives.enabled {
            return None;
        }
        let options = match outcome {
            SessionOutcome::Completed => &self.incentives.rewards,
            SessionOutcome::Interrupted => &self.incentives.punishments,
        };
        self.selector.select(options)
    }
}
