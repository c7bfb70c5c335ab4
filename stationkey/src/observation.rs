//! Normalised, per-transmitter facts derived from a [`Report`].
//!
//! A report is folded into one observation per nested sighting. Sightings
//! that fail validation are dropped one by one; the rest of the report still
//! produces observations.

use std::{iter::FusedIterator, vec};

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    cell::{encode_cellid, CellAreaKey, CellIdentifier, EncodedCellId},
    error::{Error, Result},
    mac::StationIdentifier,
    radio::{RadioType, ReportSource},
    report::{BlueReport, CellReport, Position, Report, WifiReport},
    shard::{Route, ShardRouter, Transmitter},
    utils::{
        asu_to_signal, channel_to_frequency, frequency_to_channel, is_opted_out, normalize_ssid,
        signal_range, timing_advance_range, within,
    },
};

/// Quality limits applied while exploding a report.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Filter {
    /// Metres; higher fixes are likely taken on a plane.
    pub max_altitude: f64,
    /// Milliseconds between the position fix and a sighting.
    pub max_age_skew: u32,
    /// Upper bound on speed (m/s) times age skew (ms).
    pub max_travel: f64,
    pub max_cell_accuracy: f64,
    pub max_wifi_accuracy: f64,
    pub max_blue_accuracy: f64,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            max_altitude: 5_000.0,
            max_age_skew: 30_000,
            max_travel: 150_000.0,
            max_cell_accuracy: 1_000.0,
            max_wifi_accuracy: 250.0,
            max_blue_accuracy: 250.0,
        }
    }
}

impl Filter {
    fn max_accuracy(&self, radio: RadioType) -> f64 {
        match radio {
            RadioType::Wifi => self.max_wifi_accuracy,
            RadioType::Bluetooth => self.max_blue_accuracy,
            _ => self.max_cell_accuracy,
        }
    }

    fn check_age(&self, position: &Position, age: Option<i32>) -> Result<(), Rejection> {
        let (Some(age), Some(position_age)) = (age, position.age) else {
            // the age field is optional, so sightings without one still count
            return Ok(());
        };
        let skew = position_age.abs_diff(age);
        if skew > self.max_age_skew {
            return Err(Rejection::Stale(skew));
        }
        if position.speed.unwrap_or(0.0) * f64::from(skew) > self.max_travel {
            return Err(Rejection::Moving(skew));
        }
        Ok(())
    }

    fn check_position(&self, position: &Position, radio: RadioType) -> Result<(), Rejection> {
        if !position.is_valid() {
            return Err(Rejection::Position);
        }
        if let Some(accuracy) = position.accuracy {
            if !(0.0..=self.max_accuracy(radio)).contains(&accuracy) {
                return Err(Rejection::Accuracy(accuracy));
            }
        }
        if let Some(altitude) = position.altitude {
            if altitude > self.max_altitude {
                return Err(Rejection::Altitude(altitude));
            }
        }
        Ok(())
    }
}

/// Why a nested sighting produced no observation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error(transparent)]
    Identifier(#[from] Error),
    #[error("observed {0}ms away from the position fix")]
    Stale(u32),
    #[error("device moved too far in {0}ms")]
    Moving(u32),
    #[error("position out of range")]
    Position,
    #[error("accuracy {0}m out of range")]
    Accuracy(f64),
    #[error("altitude {0}m too high")]
    Altitude(f64),
    #[error("network opted out of collection")]
    OptedOut,
}

/// Payload shared by every observation of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationBase {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub altitude: Option<f64>,
    pub altitude_accuracy: Option<f64>,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub source: ReportSource,
}

impl ObservationBase {
    fn new(report: &Report) -> Self {
        let p = &report.position;
        Self {
            latitude: p.latitude,
            longitude: p.longitude,
            accuracy: p.accuracy,
            altitude: p.altitude,
            altitude_accuracy: p.altitude_accuracy,
            heading: within(p.heading, 0.0..=360.0),
            speed: within(p.speed, 0.0..=300.0),
            timestamp: report.timestamp,
            source: p.source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellObservation {
    #[serde(flatten)]
    pub base: ObservationBase,
    pub id: CellIdentifier,
    pub key: EncodedCellId,
    pub signal: Option<i32>,
    pub timing_advance: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WifiObservation {
    #[serde(flatten)]
    pub base: ObservationBase,
    pub mac: StationIdentifier,
    pub ssid: Option<String>,
    pub channel: Option<i32>,
    pub frequency: Option<i32>,
    pub signal: Option<i32>,
    pub snr: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlueObservation {
    #[serde(flatten)]
    pub base: ObservationBase,
    pub mac: StationIdentifier,
    pub name: Option<String>,
    pub signal: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "radio_family", rename_all = "lowercase")]
pub enum Observation {
    Cell(CellObservation),
    Wifi(WifiObservation),
    Blue(BlueObservation),
}

impl Observation {
    pub fn radio(&self) -> RadioType {
        match self {
            Observation::Cell(x) => x.id.radio,
            Observation::Wifi(_) => RadioType::Wifi,
            Observation::Blue(_) => RadioType::Bluetooth,
        }
    }

    pub fn base(&self) -> &ObservationBase {
        match self {
            Observation::Cell(x) => &x.base,
            Observation::Wifi(x) => &x.base,
            Observation::Blue(x) => &x.base,
        }
    }

    pub fn signal(&self) -> Option<i32> {
        match self {
            Observation::Cell(x) => x.signal,
            Observation::Wifi(x) => x.signal,
            Observation::Blue(x) => x.signal,
        }
    }

    pub fn transmitter(&self) -> Transmitter {
        match self {
            Observation::Cell(x) => Transmitter::Cell(x.id),
            Observation::Wifi(x) => Transmitter::Wifi(x.mac),
            Observation::Blue(x) => Transmitter::Bluetooth(x.mac),
        }
    }

    /// Cells route by their stored key.
    pub fn route(&self, router: &ShardRouter) -> Result<Route> {
        match self {
            Observation::Cell(x) => router.route_cell(&x.key),
            Observation::Wifi(x) => router.route_wifi(&x.mac),
            Observation::Blue(x) => Ok(router.route_blue(&x.mac)),
        }
    }

    pub fn area_key(&self) -> Option<CellAreaKey> {
        match self {
            Observation::Cell(x) => Some(x.key.area_key()),
            _ => None,
        }
    }

    /// Station seen under a locally administered, likely randomised address.
    pub fn is_local(&self) -> bool {
        match self {
            Observation::Cell(_) => false,
            Observation::Wifi(x) => x.mac.is_local(),
            Observation::Blue(x) => x.mac.is_local(),
        }
    }
}

impl From<CellObservation> for Observation {
    fn from(value: CellObservation) -> Self {
        Observation::Cell(value)
    }
}

impl From<WifiObservation> for Observation {
    fn from(value: WifiObservation) -> Self {
        Observation::Wifi(value)
    }
}

impl From<BlueObservation> for Observation {
    fn from(value: BlueObservation) -> Self {
        Observation::Blue(value)
    }
}

impl Report {
    pub fn explode(self) -> Explode {
        self.explode_with(&Filter::default())
    }

    pub fn explode_with(self, filter: &Filter) -> Explode {
        Explode {
            base: ObservationBase::new(&self),
            filter: filter.clone(),
            cells: self.cell_towers.into_iter(),
            wifis: self.wifi_access_points.into_iter(),
            blues: self.bluetooth_beacons.into_iter(),
            position: self.position,
            rejected: 0,
        }
    }
}

/// One-shot iterator over the observations of a single report.
///
/// Yields cells, then WiFi, then Bluetooth, in submission order.
#[derive(Debug)]
pub struct Explode {
    base: ObservationBase,
    position: Position,
    filter: Filter,
    cells: vec::IntoIter<CellReport>,
    wifis: vec::IntoIter<WifiReport>,
    blues: vec::IntoIter<BlueReport>,
    rejected: usize,
}

impl Explode {
    /// Sightings dropped so far.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    fn cell(&self, cell: CellReport) -> Result<CellObservation, Rejection> {
        let id = cell.identifier()?;
        let key = encode_cellid(&id)?;
        self.filter.check_age(&self.position, cell.age)?;
        self.filter.check_position(&self.position, id.radio)?;

        let signal = cell
            .signal_strength
            .or_else(|| cell.asu.and_then(|x| asu_to_signal(id.radio, x)));
        Ok(CellObservation {
            base: self.base.clone(),
            id,
            key,
            signal: signal.filter(|x| signal_range(id.radio).is_some_and(|r| r.contains(x))),
            timing_advance: cell
                .timing_advance
                .filter(|x| timing_advance_range(id.radio).is_some_and(|r| r.contains(x))),
        })
    }

    fn wifi(&self, wifi: WifiReport) -> Result<WifiObservation, Rejection> {
        let mac = wifi.identifier()?;
        let ssid = normalize_ssid(wifi.ssid.as_deref());
        if ssid.is_some_and(is_opted_out) {
            return Err(Rejection::OptedOut);
        }
        self.filter.check_age(&self.position, wifi.age)?;
        self.filter.check_position(&self.position, RadioType::Wifi)?;

        let channel = wifi.channel.filter(|x| channel_to_frequency(*x).is_some());
        let frequency = wifi.frequency.filter(|x| frequency_to_channel(*x).is_some());
        Ok(WifiObservation {
            base: self.base.clone(),
            mac,
            ssid: ssid.map(str::to_owned),
            channel: channel.or_else(|| frequency.and_then(frequency_to_channel)),
            frequency: frequency.or_else(|| channel.and_then(channel_to_frequency)),
            signal: wifi
                .signal_strength
                .filter(|x| signal_range(RadioType::Wifi).is_some_and(|r| r.contains(x))),
            snr: within(wifi.signal_to_noise_ratio, 0..=100),
        })
    }

    fn blue(&self, blue: BlueReport) -> Result<BlueObservation, Rejection> {
        let mac = blue.identifier()?;
        self.filter.check_age(&self.position, blue.age)?;
        self.filter
            .check_position(&self.position, RadioType::Bluetooth)?;

        Ok(BlueObservation {
            base: self.base.clone(),
            mac,
            name: normalize_ssid(blue.name.as_deref()).map(str::to_owned),
            signal: blue
                .signal_strength
                .filter(|x| signal_range(RadioType::Bluetooth).is_some_and(|r| r.contains(x))),
        })
    }

    fn next_sighting(&mut self) -> Option<Result<Observation, Rejection>> {
        if let Some(x) = self.cells.next() {
            return Some(self.cell(x).map(Into::into));
        }
        if let Some(x) = self.wifis.next() {
            return Some(self.wifi(x).map(Into::into));
        }
        if let Some(x) = self.blues.next() {
            return Some(self.blue(x).map(Into::into));
        }
        None
    }
}

impl Iterator for Explode {
    type Item = Observation;

    fn next(&mut self) -> Option<Observation> {
        while let Some(result) = self.next_sighting() {
            match result {
                Ok(x) => return Some(x),
                Err(e) => {
                    debug!("dropping sighting: {e}");
                    self.rejected += 1;
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.cells.len() + self.wifis.len() + self.blues.len();
        (0, Some(remaining))
    }
}

impl FusedIterator for Explode {}
