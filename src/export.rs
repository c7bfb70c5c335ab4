//! Routed observations as CSV, one row per observation.

use std::io::{self, Write};

use anyhow::Result;
use serde::Serialize;
use stationkey::{Observation, RadioType, ReportSource, ShardRouter, Submission};

use crate::config::Config;

#[derive(Debug, Serialize)]
struct Row {
    table: String,
    key: String,
    area: Option<String>,
    radio: RadioType,
    lat: f64,
    lon: f64,
    accuracy: Option<f64>,
    signal: Option<i32>,
    source: ReportSource,
    timestamp: i64,
    local: bool,
}

impl Row {
    fn new(router: &ShardRouter, observation: &Observation) -> stationkey::Result<Self> {
        let route = observation.route(router)?;
        let base = observation.base();
        Ok(Self {
            table: route.shard.table(),
            key: route.key.to_string(),
            area: observation.area_key().map(|x| x.to_base64()),
            radio: observation.radio(),
            lat: base.latitude,
            lon: base.longitude,
            accuracy: base.accuracy,
            signal: observation.signal(),
            source: base.source,
            timestamp: base.timestamp.timestamp_millis(),
            local: observation.is_local(),
        })
    }
}

pub fn run(config: &Config, submissions: Vec<Submission>) -> Result<()> {
    write(config, submissions, io::stdout().lock())
}

fn write<W: Write>(config: &Config, submissions: Vec<Submission>, out: W) -> Result<()> {
    let router = ShardRouter::new(config.router.cell_layout);
    let mut writer = csv::Writer::from_writer(out);
    for report in submissions.into_iter().flat_map(|x| x.items) {
        for observation in report.explode_with(&config.filter) {
            if config.router.exclude_local_stations && observation.is_local() {
                continue;
            }
            writer.serialize(Row::new(&router, &observation)?)?;
        }
    }
    writer.flush()?;
    Ok(())
}
