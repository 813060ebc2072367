//! Per-timer countdown signals.
//!
//! Each running timer gets its own tokio task holding a repeating interval.
//! The task only sends `(timer id, generation)` over a channel; it never sees
//! the view. The driver yields a signal only while the registration that
//! produced it is still live, so once `cancel` returns no further tick for
//! that registration is observed, even one that was already queued.

use std::collections::HashMap;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::CountdownError;

pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct Signal {
    timer_id: String,
    generation: u64,
}

#[derive(Debug)]
struct Countdown {
    generation: u64,
    task: JoinHandle<()>,
}

/// Owns the timer id -> countdown handle registry.
#[derive(Debug)]
pub struct CountdownDriver {
    period: Duration,
    tx: mpsc::UnboundedSender<Signal>,
    rx: mpsc::UnboundedReceiver<Signal>,
    active: HashMap<String, Countdown>,
    next_generation: u64,
}

impl CountdownDriver {
    pub fn new(period: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            period,
            tx,
            rx,
            active: HashMap::new(),
            next_generation: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Begin signalling `timer_id` once per period.
    ///
    /// Returns `Ok(false)` without touching anything if the id already has a
    /// live countdown.
    pub fn register(&mut self, timer_id: &str) -> Result<bool, CountdownError> {
        if self.active.contains_key(timer_id) {
            return Ok(false);
        }
        let handle = Handle::try_current().map_err(|_| CountdownError::NoRuntime {
            timer_id: timer_id.to_string(),
        })?;

        self.next_generation += 1;
        let generation = self.next_generation;
        let period = self.period;
        let first = Instant::now() + period;
        let tx = self.tx.clone();
        let id = timer_id.to_string();

        let task = handle.spawn(async move {
            let mut interval = tokio::time::interval_at(first, period);
            loop {
                interval.tick().await;
                let signal = Signal {
                    timer_id: id.clone(),
                    generation,
                };
                if tx.send(signal).is_err() {
                    break;
                }
            }
        });

        debug!(timer_id, generation, "countdown registered");
        self.active
            .insert(timer_id.to_string(), Countdown { generation, task });
        Ok(true)
    }

    /// Stop signalling `timer_id`. Returns whether a countdown was live.
    pub fn cancel(&mut self, timer_id: &str) -> bool {
        match self.active.remove(timer_id) {
            Some(countdown) => {
                countdown.task.abort();
                debug!(timer_id, "countdown cancelled");
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        if self.active.is_empty() {
            return;
        }
        debug!(count = self.active.len(), "cancelling all countdowns");
        for (_, countdown) in self.active.drain() {
            countdown.task.abort();
        }
    }

    pub fn is_active(&self, timer_id: &str) -> bool {
        self.active.contains_key(timer_id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn active_ids(&self) -> impl Iterator<Item = &str> {
        self.active.keys().map(String::as_str)
    }

    /// Wait for the next signal from a live countdown.
    ///
    /// Returns `None` immediately when nothing is registered.
    pub async fn next_tick(&mut self) -> Option<String> {
        loop {
            if self.active.is_empty() {
                return None;
            }
            let signal = self.rx.recv().await?;
            let live = self
                .active
                .get(&signal.timer_id)
                .is_some_and(|c| c.generation == signal.generation);
            if live {
                return Some(signal.timer_id);
            }
            trace!(
                timer_id = %signal.timer_id,
                generation = signal.generation,
                "dropping stale countdown signal"
            );
        }
    }
}

impl Default for CountdownDriver {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_PERIOD)
    }
}

impl Drop for CountdownDriver {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
