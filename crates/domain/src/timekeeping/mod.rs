//! Employee time-tracking actor.

mod time_clock;

pub use time_clock::{
    CompletedShift, OpenShift, TimeClock, TimeClockCommand, TimeClockError, TimeClockResponse,
};
