use std::{collections::BTreeSet, fs};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;
use stationkey::{decode_cellarea, MemoryStore, ShardFamily, ShardRouter, Submission};

use crate::config::Config;

pub fn run(config: &Config, submissions: Vec<Submission>) -> Result<()> {
    let (store, reports) = load(config, submissions);

    for (table, count) in store.tables() {
        println!("{table},{count}");
    }

    if let Some(stats_config) = &config.stats {
        let stats = Stats::new(&store, reports + stats_config.archived_reports)?;
        let data = serde_json::to_string_pretty(&stats)?;
        fs::write(&stats_config.path, data)
            .with_context(|| format!("Failed to write {}", stats_config.path.display()))?;
    }

    Ok(())
}

/// Explode and route every report into an in-memory store. Returns the store
/// and the number of reports read.
pub fn load(config: &Config, submissions: Vec<Submission>) -> (MemoryStore, u64) {
    let router = ShardRouter::new(config.router.cell_layout);
    let mut store = MemoryStore::new(router).exclude_local(config.router.exclude_local_stations);

    let count: usize = submissions.iter().map(|x| x.items.len()).sum();
    if count == 0 {
        info!("Nothing to process");
        return (store, 0);
    }
    info!("{count} reports need processing");

    let mut rejected = 0;
    let reports = submissions.into_iter().flat_map(|x| x.items);
    for (i, report) in reports.enumerate() {
        if (i % 10_000) == 0 && i != 0 {
            info!("{i}");
        }

        let sightings = report.sightings();
        let mut explode = report.explode_with(&config.filter);
        let mut accepted = 0;
        for observation in explode.by_ref() {
            match store.insert(observation) {
                Ok(_) => accepted += 1,
                Err(e) => warn!("report #{i}: unroutable observation: {e}"),
            }
        }
        if accepted == 0 && sightings != 0 {
            warn!("report #{i}: all {sightings} sightings rejected");
        }
        rejected += explode.rejected();
    }

    info!(
        "{} observations of {} transmitters, {rejected} sightings rejected, {} local stations skipped",
        store.observations(),
        store.transmitters(),
        store.skipped(),
    );
    (store, count as u64)
}

#[derive(Debug, Serialize)]
struct Stats {
    total_reports: u64,
    total_observations: usize,
    total_cell: usize,
    total_wifi: usize,
    total_bluetooth: usize,
    total_areas: usize,
    total_countries: usize,
}

impl Stats {
    fn new(store: &MemoryStore, total_reports: u64) -> Result<Self> {
        let families = store.families();
        let family = |x| families.get(&x).copied().unwrap_or_default();

        let mut countries = BTreeSet::new();
        for area in store.areas().keys() {
            // a key that fails to decode here means the layout changed under us
            let area = decode_cellarea(area).context("Stored area key is corrupt")?;
            countries.insert(area.mcc);
        }

        Ok(Self {
            total_reports,
            total_observations: store.observations(),
            total_cell: family(ShardFamily::Cell),
            total_wifi: family(ShardFamily::Wifi),
            total_bluetooth: family(ShardFamily::Blue),
            total_areas: store.areas().len(),
            total_countries: countries.len(),
        })
    }
}
