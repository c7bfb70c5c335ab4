//! Storage addressing for crowd-sourced radio sightings.
//!
//! Turns cell, WiFi and Bluetooth identifiers into fixed-width,
//! order-preserving keys, assigns them to shards, and folds client reports
//! into per-transmitter observations carrying those keys.

pub mod cell;
pub mod error;
pub mod mac;
pub mod observation;
pub mod radio;
pub mod registry;
pub mod report;
pub mod shard;
pub mod store;
pub mod utils;

pub use cell::{
    decode_cellarea, decode_cellid, encode_cellarea, encode_cellid, CellAreaIdentifier,
    CellAreaKey, CellIdentifier, EncodedCellId,
};
pub use error::{Error, Result};
pub use mac::{decode_mac, encode_mac, StationIdentifier};
pub use observation::{
    BlueObservation, CellObservation, Explode, Filter, Observation, WifiObservation,
};
pub use radio::{RadioType, ReportSource};
pub use report::{BlueReport, CellReport, Report, Submission, WifiReport};
pub use shard::{
    area_route, CellLayout, Route, Shard, ShardFamily, ShardKey, ShardRouter, Transmitter,
};
pub use store::{MemoryStore, ShardStore};
