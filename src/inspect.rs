//! Single-identifier lookups for debugging stored keys.

use anyhow::{Context, Result};
use clap::Subcommand;
use stationkey::{
    area_route, decode_cellarea, decode_cellid, encode_mac, registry, CellAreaKey,
    CellIdentifier, EncodedCellId, RadioType, ShardRouter, Transmitter,
};

use crate::config::Config;

#[derive(Debug, Subcommand)]
pub enum RouteCommand {
    /// Route a cell identifier
    Cell {
        radio: RadioType,
        mcc: u16,
        mnc: u16,
        area: u32,
        cell: u64,
        /// Primary scrambling code or physical cell id
        #[arg(long)]
        unit: Option<u16>,
    },
    /// Route a WiFi access point
    Wifi { mac: String },
    /// Route a Bluetooth beacon
    Bluetooth { mac: String },
}

pub fn route(config: &Config, command: RouteCommand) -> Result<()> {
    let router = ShardRouter::new(config.router.cell_layout);
    let transmitter = match command {
        RouteCommand::Cell {
            radio,
            mcc,
            mnc,
            area,
            cell,
            unit,
        } => Transmitter::Cell(CellIdentifier {
            radio,
            mcc,
            mnc,
            area,
            cell,
            unit,
        }),
        RouteCommand::Wifi { mac } => Transmitter::Wifi(encode_mac(mac.as_str(), RadioType::Wifi)?),
        RouteCommand::Bluetooth { mac } => {
            Transmitter::Bluetooth(encode_mac(mac.as_str(), RadioType::Bluetooth)?)
        }
    };

    let route = router.route(&transmitter)?;
    println!("{},{}", route.shard, route.key);
    if let Transmitter::Cell(id) = &transmitter {
        println!("{},{}", stationkey::shard::AREA_TABLE, area_route(id)?);
    }
    Ok(())
}

/// Decode a base64 cell or area key.
pub fn decode(key: &str) -> Result<()> {
    match EncodedCellId::from_base64(key) {
        Ok(cell) => {
            let id = decode_cellid(&cell).context("Cell key does not decode")?;
            println!("{id}");
        }
        Err(cell_error) => {
            let area = CellAreaKey::from_base64(key)
                .with_context(|| format!("Neither a cell key ({cell_error}) nor an area key"))?;
            let id = decode_cellarea(&area).context("Area key does not decode")?;
            println!("{id}");
        }
    }
    Ok(())
}

pub fn tables(config: &Config) {
    for table in registry::tables(config.router.cell_layout) {
        println!("{table}");
    }
}
