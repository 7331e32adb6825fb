use chrono::{DateTime, Days, NaiveDate, Utc};
use clap::Args;
use intervals_core::storage::{SessionTotals, SessionStore};
use intervals_core::{Database, SessionFilter};
use serde::Serialize;

use super::{format_duration, resolve_training, CliResult};

#[derive(Args)]
pub struct StatsArgs {
    /// Only sessions of this training
    #[arg(long)]
    training: Option<String>,
    /// First day to include (YYYY-MM-DD, UTC)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Last day to include (YYYY-MM-DD, UTC)
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct StatsReport {
    #[serde(flatten)]
    totals: SessionTotals,
    filter: SessionFilter,
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Build a filter covering whole days, `to` included.
fn day_filter(from: Option<NaiveDate>, to: Option<NaiveDate>) -> SessionFilter {
    SessionFilter {
        training: None,
        from: from.map(start_of_day),
        to: to
            .and_then(|day| day.checked_add_days(Days::new(1)))
            .map(start_of_day),
    }
}

pub fn run(args: StatsArgs) -> CliResult {
    let db = Database::open()?;
    let mut filter = day_filter(args.from, args.to);
    if let Some(key) = &args.training {
        filter.training = Some(resolve_training(&db, key)?.id);
    }
    let totals = db.totals(&filter)?;

    if args.json {
        let report = StatsReport { totals, filter };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("sessions:  {}", totals.sessions);
        println!("completed: {}", totals.completed);
        println!("time:      {}", format_duration(totals.total_secs));
    }
    Ok(())
}
