pub mod config;
pub mod history;
pub mod timer;

use timerdeck_core::{Config, Database, PersistenceGateway, TimerStore};

/// Open the configured database and build a store over it.
pub fn open_store(config: &Config) -> Result<TimerStore<Database>, Box<dyn std::error::Error>> {
    let db = Database::open_path(config.database_path()?)?;
    Ok(TimerStore::with_tick_period(
        PersistenceGateway::new(db),
        config.tick_period(),
    ))
}
