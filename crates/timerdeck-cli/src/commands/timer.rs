use clap::{Subcommand, ValueEnum};
use timerdeck_core::{
    format_time, BulkAction, Config, Database, Event, KeyValueStore, NewTimer, TimerStore,
    TimerWithStatus,
};
use tracing::{info, warn};

use super::open_store;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Create a new timer
    Create {
        /// Display name
        #[arg(long)]
        name: String,
        /// Duration in seconds
        #[arg(long)]
        duration: u64,
        /// Category used for grouping and bulk actions
        #[arg(long)]
        category: String,
    },
    /// List timers grouped by category
    List {
        /// Print the grouped view as JSON
        #[arg(long)]
        json: bool,
        /// Collapse these categories in the listing
        #[arg(long)]
        collapse: Vec<String>,
    },
    /// Run countdowns in the foreground until they complete or Ctrl-C
    Run {
        /// Apply a bulk action to this category
        #[arg(long)]
        category: Option<String>,
        /// Bulk action applied to --category
        #[arg(long, value_enum, default_value_t = BulkArg::StartAll)]
        action: BulkArg,
        /// Individual timer ids to start
        ids: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum BulkArg {
    StartAll,
    PauseAll,
    ResetAll,
}

impl From<BulkArg> for BulkAction {
    fn from(arg: BulkArg) -> Self {
        match arg {
            BulkArg::StartAll => BulkAction::StartAll,
            BulkArg::PauseAll => BulkAction::PauseAll,
            BulkArg::ResetAll => BulkAction::ResetAll,
        }
    }
}

enum Step {
    Event(Option<Event>),
    Interrupted,
}

pub fn run(action: TimerAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = open_store(config)?;

    match action {
        TimerAction::Create {
            name,
            duration,
            category,
        } => {
            let timer = store.create(NewTimer::new(name, duration, category))?;
            println!("{}", serde_json::to_string_pretty(&timer)?);
        }
        TimerAction::List { json, collapse } => {
            store.load();
            for category in &collapse {
                store.toggle_category(category);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(store.grouped())?);
            } else {
                print_view(&store, config.display.show_collapsed);
            }
        }
        TimerAction::Run {
            category,
            action,
            ids,
        } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(run_countdowns(&mut store, category, action.into(), ids))?;
        }
    }
    Ok(())
}

async fn run_countdowns(
    store: &mut TimerStore<Database>,
    category: Option<String>,
    action: BulkAction,
    ids: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    store.load();

    if let Some(category) = &category {
        store.bulk_action(category, action)?;
    }
    for id in &ids {
        store.start(id)?;
    }
    if category.is_none() && ids.is_empty() {
        let categories: Vec<String> = store.grouped().categories().map(str::to_string).collect();
        for category in categories {
            store.start_all(&category)?;
        }
    }

    if store.active_countdowns() == 0 {
        println!("no timers running");
        return Ok(());
    }

    info!(
        running = store.active_countdowns(),
        period_ms = store.tick_period().as_millis() as u64,
        "countdowns started"
    );
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut notices = store.subscribe();

    loop {
        let step = tokio::select! {
            event = store.next_event() => Step::Event(event),
            _ = &mut ctrl_c => Step::Interrupted,
        };

        while let Ok(notice) = notices.try_recv() {
            if let Event::StorageFailed { key, message, .. } = notice {
                eprintln!("warning: could not save {key}: {message}");
            }
        }

        match step {
            Step::Event(Some(Event::TimerTicked { timer_id, .. })) => {
                if let Some(timer) = store.get(&timer_id) {
                    println!("{}", progress_line(timer));
                }
            }
            Step::Event(Some(Event::TimerCompleted { timer, .. })) => {
                println!(
                    "completed: {} [{}] after {}",
                    timer.timer.name,
                    timer.timer.category,
                    format_time(timer.timer.duration)
                );
            }
            Step::Event(Some(_)) => {}
            Step::Event(None) => break,
            Step::Interrupted => {
                warn!(running = store.active_countdowns(), "interrupted, cancelling countdowns");
                store.shutdown();
                println!("interrupted");
                break;
            }
        }
    }
    Ok(())
}

fn progress_line(timer: &TimerWithStatus) -> String {
    format!(
        "[{}] {}  {}  {:>3}%  {}",
        timer.timer.category,
        timer.timer.name,
        format_time(timer.remaining_time),
        timer.progress_percent(),
        timer.status
    )
}

fn print_view<S: KeyValueStore>(store: &TimerStore<S>, show_collapsed: bool) {
    let view = store.grouped();
    if view.is_empty() {
        println!("No timers created yet");
        return;
    }
    for (category, timers) in view.iter() {
        let expanded = store.is_expanded(category);
        let marker = if expanded { "▼" } else { "▶" };
        println!("{category} ({}) {marker}", timers.len());
        if expanded || show_collapsed {
            for timer in timers {
                println!("  {}  {}", timer.id(), progress_line(timer));
            }
        }
    }
}
