use chrono::DateTime;
use clap::Subcommand;
use timerdeck_core::{format_time, Config, HistoryEntry};

use super::open_store;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List completed timers, newest first
    List {
        /// Print entries as JSON
        #[arg(long)]
        json: bool,
        /// Show at most this many entries
        #[arg(long)]
        limit: Option<usize>,
    },
}

pub fn run(action: HistoryAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(config)?;

    match action {
        HistoryAction::List { json, limit } => {
            let mut entries = store.history().load_all();
            if let Some(limit) = limit {
                entries.truncate(limit);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No completed timers yet");
            } else {
                for entry in &entries {
                    println!("{}", history_line(entry));
                }
            }
        }
    }
    Ok(())
}

fn history_line(entry: &HistoryEntry) -> String {
    let completed = DateTime::from_timestamp_millis(entry.completed_at)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| entry.completed_at.to_string());
    format!(
        "{completed}  [{}] {}  {}",
        entry.category,
        entry.timer_name,
        format_time(entry.duration)
    )
}
