pub mod countdown;
mod grouped;
pub(crate) mod model;
mod store;

pub use countdown::{CountdownDriver, DEFAULT_TICK_PERIOD};
pub use grouped::GroupedTimers;
pub use model::{format_time, NewTimer, Timer, TimerStatus, TimerWithStatus};
pub use store::{BulkAction, TimerStore};
