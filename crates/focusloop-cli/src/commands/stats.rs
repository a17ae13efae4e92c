use clap::Subcommand;
use focusloop_core::{Config, Database};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Aggregate focus minutes: today, this week, this month, all time
    Summary,
    /// Per-day focus minutes for the trailing seven days
    History,
    /// Most recent interval records from the local log
    Recent {
        /// Number of records to show
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    let _guard = rt.enter();

    let config = Config::load_or_default();
    match action {
        StatsAction::Summary => {
            let backend = super::open_backend(&config)?;
            let summary = backend.fetch_summary()?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        StatsAction::History => {
            let backend = super::open_backend(&config)?;
            let history = backend.daily_history()?;
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
        StatsAction::Recent { limit } => {
            // Interval records only exist in the local log.
            let db = Database::open()?;
            let records = db.recent_intervals(limit)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
    }
    Ok(())
}
