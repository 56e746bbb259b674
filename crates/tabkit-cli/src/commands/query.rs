//! Query command implementation.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::Args;
use colored::Colorize;

use tabkit_core::entity::sample::{self, NEXT_DATE};
use tabkit_core::{Filter, Query, StorageConfig, TableStore};

use crate::output;
use crate::store::CliStore;

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Only records whose NextDate is after this date (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_date)]
    pub after: Option<DateTime<Utc>>,

    /// Only records whose NextDate is before this date (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_date)]
    pub before: Option<DateTime<Utc>>,

    /// Maximum entities requested per segment
    #[arg(long)]
    pub take: Option<u32>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

pub async fn run(store: &CliStore, config: &StorageConfig, args: QueryArgs) -> Result<()> {
    let query = build_query(config, &args);

    let entities = store
        .execute_query(&query)
        .await
        .context("Failed to query records")?;

    if entities.is_empty() {
        eprintln!("{}", "No records found.".dimmed());
        return Ok(());
    }

    let count = entities.len();
    for entity in entities {
        let record = sample::decode(entity);
        if args.pretty {
            output::json_pretty(&record)?;
        } else {
            output::json(&record)?;
        }
    }

    eprintln!();
    eprintln!("{}: {}", "Records".dimmed(), count);

    Ok(())
}

fn build_query(config: &StorageConfig, args: &QueryArgs) -> Query {
    let after = args.after.map(|date| Filter::gt(NEXT_DATE, date));
    let before = args.before.map(|date| Filter::lt(NEXT_DATE, date));

    let filter = match (after, before) {
        (Some(after), Some(before)) => Some(after.and(before)),
        (after, before) => after.or(before),
    };

    let mut query = Query::new(config.table.clone());
    if let Some(filter) = filter {
        query = query.with_filter(filter);
    }
    if let Some(take) = args.take {
        query = query.with_take(take);
    }
    query
}

fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected YYYY-MM-DD or an RFC 3339 timestamp: {}", e))
}
