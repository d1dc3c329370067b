//! Per-employee shift state machine: at most one open shift.

use chrono::{DateTime, Utc};
use common::EntityId;
use fabric::events::EmployeeEvent;
use fabric::events::staff::{ShiftClosedData, ShiftOpenedData};
use fabric::{EventPayload, EventSource, StreamEvent};
use runtime::{ActorBehavior, Applied, CommandContext, ErrorCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shift that has been opened but not closed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenShift {
    pub role: String,
    pub clock_in: DateTime<Utc>,
}

/// A finished shift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedShift {
    pub role: String,
    pub clock_in: DateTime<Utc>,
    pub clock_out: DateTime<Utc>,
    pub minutes: i64,
}

/// Time clock for one employee.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeClock {
    pub(crate) employee_id: Option<EntityId>,
    pub(crate) open_shift: Option<OpenShift>,
    pub(crate) completed_shifts: Vec<CompletedShift>,
    pub(crate) total_minutes: i64,
}

impl TimeClock {
    pub fn employee_id(&self) -> Option<EntityId> {
        self.employee_id
    }

    pub fn open_shift(&self) -> Option<&OpenShift> {
        self.open_shift.as_ref()
    }

    pub fn completed_shifts(&self) -> &[CompletedShift] {
        &self.completed_shifts
    }

    pub fn total_minutes(&self) -> i64 {
        self.total_minutes
    }

    pub fn is_clocked_in(&self) -> bool {
        self.open_shift.is_some()
    }
}

/// Commands accepted by the time clock actor.
#[derive(Debug, Clone)]
pub enum TimeClockCommand {
    ClockIn { at: DateTime<Utc>, role: String },
    ClockOut { at: DateTime<Utc> },
    GetTimesheet,
}

/// Responses from the time clock actor.
#[derive(Debug, Clone)]
pub enum TimeClockResponse {
    ClockedIn,
    ClockedOut { minutes: i64, total_minutes: i64 },
    Timesheet {
        open_shift: Option<OpenShift>,
        completed: Vec<CompletedShift>,
        total_minutes: i64,
    },
}

/// Errors produced by time clock commands.
#[derive(Debug, Error)]
pub enum TimeClockError {
    #[error("employee is already clocked in")]
    AlreadyClockedIn,

    #[error("employee is not clocked in")]
    NotClockedIn,

    #[error("clock-out precedes clock-in")]
    ClockOutBeforeClockIn,
}

impl ErrorCode for TimeClockError {
    fn error_code(&self) -> &'static str {
        match self {
            TimeClockError::AlreadyClockedIn => "already_clocked_in",
            TimeClockError::NotClockedIn => "not_clocked_in",
            TimeClockError::ClockOutBeforeClockIn => "clock_out_before_clock_in",
        }
    }

    fn retryable(&self) -> bool {
        false
    }
}

impl ActorBehavior for TimeClock {
    type Command = TimeClockCommand;
    type Response = TimeClockResponse;
    type Error = TimeClockError;

    fn actor_type() -> &'static str {
        "time_clock"
    }

    fn handle(
        &self,
        ctx: &CommandContext,
        command: Self::Command,
    ) -> Result<Applied<Self>, Self::Error> {
        match command {
            TimeClockCommand::ClockIn { at, role } => {
                if self.open_shift.is_some() {
                    return Err(TimeClockError::AlreadyClockedIn);
                }

                let mut next = self.clone();
                next.employee_id = Some(ctx.key.entity);
                next.open_shift = Some(OpenShift {
                    role: role.clone(),
                    clock_in: at,
                });

                let event = employee_event(
                    ctx,
                    EmployeeEvent::ShiftOpened(ShiftOpenedData {
                        employee_id: ctx.key.entity,
                        role,
                        clock_in: at,
                    }),
                );
                Ok(Applied::new(next, TimeClockResponse::ClockedIn).with_events(vec![event]))
            }

            TimeClockCommand::ClockOut { at } => {
                let open = self.open_shift.as_ref().ok_or(TimeClockError::NotClockedIn)?;
                if at < open.clock_in {
                    return Err(TimeClockError::ClockOutBeforeClockIn);
                }

                let minutes = (at - open.clock_in).num_minutes();
                let mut next = self.clone();
                let open = next.open_shift.take().ok_or(TimeClockError::NotClockedIn)?;
                next.completed_shifts.push(CompletedShift {
                    role: open.role,
                    clock_in: open.clock_in,
                    clock_out: at,
                    minutes,
                });
                next.total_minutes += minutes;

                let event = employee_event(
                    ctx,
                    EmployeeEvent::ShiftClosed(ShiftClosedData {
                        employee_id: ctx.key.entity,
                        clock_in: open.clock_in,
                        clock_out: at,
                        minutes,
                    }),
                );
                let total_minutes = next.total_minutes;
                Ok(Applied::new(
                    next,
                    TimeClockResponse::ClockedOut {
                        minutes,
                        total_minutes,
                    },
                )
                .with_events(vec![event]))
            }

            TimeClockCommand::GetTimesheet => Ok(Applied::read_only(
                self.clone(),
                TimeClockResponse::Timesheet {
                    open_shift: self.open_shift.clone(),
                    completed: self.completed_shifts.clone(),
                    total_minutes: self.total_minutes,
                },
            )),
        }
    }
}

fn employee_event(ctx: &CommandContext, event: EmployeeEvent) -> StreamEvent {
    StreamEvent::new(
        ctx.key.tenant,
        EventSource::new(ctx.key.actor_type, ctx.key.entity),
        EventPayload::Employee(event),
    )
}
