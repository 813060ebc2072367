use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{GroupedTimers, TimerWithStatus};

/// Every state change in the store produces an Event.
/// The view layer subscribes to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Event {
    TimerStarted {
        timer_id: String,
        remaining_time: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        timer_id: String,
        remaining_time: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        timer_id: String,
        duration: u64,
        at: DateTime<Utc>,
    },
    TimerTicked {
        timer_id: String,
        remaining_time: u64,
        at: DateTime<Utc>,
    },
    /// Carries the final state of the timer, already removed from the view.
    TimerCompleted {
        timer: TimerWithStatus,
        at: DateTime<Utc>,
    },
    /// Full snapshot after any change to the grouped view.
    ViewChanged {
        view: GroupedTimers,
    },
    /// A write to storage failed; in-memory state is still authoritative.
    StorageFailed {
        key: String,
        message: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Id of the timer this event concerns, if any.
    pub fn timer_id(&self) -> Option<&str> {
        match self {
            Event::TimerStarted { timer_id, .. }
            | Event::TimerPaused { timer_id, .. }
            | Event::TimerReset { timer_id, .. }
            | Event::TimerTicked { timer_id, .. } => Some(timer_id),
            Event::TimerCompleted { timer, .. } => Some(timer.id()),
            Event::ViewChanged { .. } | Event::StorageFailed { .. } => None,
        }
    }
}
