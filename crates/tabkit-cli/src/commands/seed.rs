//! Seed command implementation.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use clap::Args;
use colored::Colorize;
use rand::Rng;
use tracing::{debug, warn};

use tabkit_core::entity::sample::{self, SampleRecord};
use tabkit_core::{StorageConfig, TableStore};

use crate::output;
use crate::store::CliStore;

/// Largest number of records one seed run writes.
pub const MAX_SEED_COUNT: u32 = 100;

const DEFAULT_SEED_COUNT: u32 = 99;
const NAME_RANGE: std::ops::Range<u32> = 0..500;
const DAY_OFFSET_RANGE: std::ops::Range<i64> = -10_000..10_000;

#[derive(Args, Debug)]
pub struct SeedArgs {
    /// Number of records to write (at most 100)
    #[arg(long, default_value_t = DEFAULT_SEED_COUNT)]
    pub count: u32,
}

pub async fn run(store: &CliStore, config: &StorageConfig, args: SeedArgs) -> Result<()> {
    let count = if args.count > MAX_SEED_COUNT {
        warn!(requested = args.count, max = MAX_SEED_COUNT, "Clamping seed count");
        MAX_SEED_COUNT
    } else {
        args.count
    };

    store
        .create_if_not_exists(&config.table)
        .await
        .context("Failed to create table")?;

    let records = sample_records(count, today(), &mut rand::rng());

    eprintln!("{}", format!("Writing {} records...", records.len()).dimmed());

    for mut record in records {
        let entity = sample::encode(&mut record).context("Failed to encode record")?;
        store
            .insert_or_merge(&config.table, &entity)
            .await
            .with_context(|| format!("Failed to write record {}", record.row_key))?;
        debug!(row_key = %record.row_key, names = ?record.names, "Wrote record");
    }

    output::success(&format!("Seeded {} records into {}", count, config.table));

    Ok(())
}

/// Midnight UTC of the current day.
fn today() -> DateTime<Utc> {
    Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Build `count` records with two random names and a date around `today`.
fn sample_records<R: Rng>(count: u32, today: DateTime<Utc>, rng: &mut R) -> Vec<SampleRecord> {
    (0..count)
        .map(|_| {
            let names = [
                format!("Test{}", rng.random_range(NAME_RANGE)),
                format!("Test2{}", rng.random_range(NAME_RANGE)),
            ];
            let offset = Duration::days(rng.random_range(DAY_OFFSET_RANGE));
            SampleRecord::new()
                .with_names(names)
                .with_next_date(today + offset)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    #[test]
    fn builds_records_within_ranges() {
        let today = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let records = sample_records(50, today, &mut rand::rng());

        assert_eq!(records.len(), 50);
        for record in &records {
            assert_eq!(record.partition_key, "Sample");
            assert_eq!(record.names.len(), 2);

            let first: u32 = record.names[0].strip_prefix("Test").unwrap().parse().unwrap();
            let second: u32 = record.names[1].strip_prefix("Test2").unwrap().parse().unwrap();
            assert!(NAME_RANGE.contains(&first));
            assert!(NAME_RANGE.contains(&second));

            let days = (record.next_date - today).num_days();
            assert!(DAY_OFFSET_RANGE.contains(&days));
        }
    }

    #[test]
    fn records_get_distinct_row_keys() {
        let records = sample_records(20, today(), &mut rand::rng());
        let keys: HashSet<_> = records.iter().map(|r| r.row_key.as_str()).collect();
        assert_eq!(keys.len(), 20);
    }

    #[test]
    fn today_is_midnight() {
        let today = today();
        assert_eq!(today.time(), NaiveTime::MIN);
    }
}
