//! Timer records and their runtime projection.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A named countdown with a fixed total duration and a category.
///
/// This is the persisted shape stored under `@timers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timer {
    pub id: String,
    pub name: String,
    /// Total length in seconds.
    pub duration: u64,
    pub category: String,
    /// Epoch milliseconds.
    pub created_at: i64,
}

impl Timer {
    /// Build a timer from a validated draft, stamping id and creation time.
    pub fn from_draft(draft: NewTimer) -> Result<Self, ValidationError> {
        draft.validate()?;
        let created_at = now_ms();
        Ok(Self {
            id: next_id(),
            name: draft.name.trim().to_string(),
            duration: draft.duration,
            category: draft.category.trim().to_string(),
            created_at,
        })
    }
}

/// User input for a new timer, checked by [`NewTimer::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTimer {
    pub name: String,
    pub duration: u64,
    pub category: String,
}

impl NewTimer {
    pub fn new(name: impl Into<String>, duration: u64, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            duration,
            category: category.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.duration == 0 {
            return Err(ValidationError::NonPositiveDuration);
        }
        if self.category.trim().is_empty() {
            return Err(ValidationError::EmptyCategory);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerStatus {
    Running,
    Paused,
    Completed,
}

impl std::fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TimerStatus::Running => "Running",
            TimerStatus::Paused => "Paused",
            TimerStatus::Completed => "Completed",
        };
        f.write_str(label)
    }
}

/// Live view of a timer: the base record plus its countdown state.
///
/// Only exists in memory. `status` and `remaining_time` are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerWithStatus {
    #[serde(flatten)]
    pub timer: Timer,
    pub status: TimerStatus,
    /// Seconds left, `0 ..= timer.duration`.
    pub remaining_time: u64,
}

impl TimerWithStatus {
    /// Fresh projection: paused with the full duration remaining.
    pub fn paused(timer: Timer) -> Self {
        let remaining_time = timer.duration;
        Self {
            timer,
            status: TimerStatus::Paused,
            remaining_time,
        }
    }

    pub fn id(&self) -> &str {
        &self.timer.id
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    /// Fraction of the duration still remaining, 0.0 ..= 1.0.
    pub fn progress(&self) -> f64 {
        if self.timer.duration == 0 {
            return 0.0;
        }
        (self.remaining_time as f64 / self.timer.duration as f64).clamp(0.0, 1.0)
    }

    pub fn progress_percent(&self) -> u8 {
        (self.progress() * 100.0).round() as u8
    }
}

/// Render seconds as `MM:SS`, or `H:MM:SS` from one hour up.
pub fn format_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

static LAST_ID_MS: AtomicI64 = AtomicI64::new(0);

/// Timestamp-derived id, strictly increasing within the process.
pub(crate) fn next_id() -> String {
    let now = now_ms();
    let mut prev = LAST_ID_MS.load(Ordering::Relaxed);
    loop {
        let candidate = if now > prev { now } else { prev + 1 };
        match LAST_ID_MS.compare_exchange_weak(prev, candidate, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return candidate.to_string(),
            Err(actual) => prev = actual,
        }
    }
}

pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
