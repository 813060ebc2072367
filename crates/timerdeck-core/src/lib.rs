//! # timerdeck Core Library
//!
//! Named, categorized countdown timers that run concurrently, with a
//! history of completed timers. State is kept as two JSON arrays in a
//! key-value store. The `timerdeck` CLI is a thin view layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer Store**: the category-grouped live view and every mutation of it
//! - **Countdown Driver**: one cancellable one-second signal per running timer
//! - **History Log**: append-only record of completions, newest first
//! - **Persistence Gateway**: JSON encoding of both records over a
//!   [`KeyValueStore`]
//!
//! ## Key Components
//!
//! - [`TimerStore`]: timer lifecycle and grouped view model
//! - [`CountdownDriver`]: per-timer tick signals on tokio
//! - [`HistoryLog`]: completion log
//! - [`PersistenceGateway`]: `@timers` / `@timer_history` records
//! - [`Database`]: SQLite-backed key-value store
//! - [`Config`]: application configuration

pub mod error;
pub mod events;
pub mod history;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, CountdownError, StorageError, ValidationError};
pub use events::Event;
pub use history::{HistoryEntry, HistoryLog};
pub use storage::{Config, Database, KeyValueStore, MemoryStore, PersistenceGateway};
pub use timer::{
    format_time, BulkAction, CountdownDriver, GroupedTimers, NewTimer, Timer, TimerStatus,
    TimerStore, TimerWithStatus,
};
