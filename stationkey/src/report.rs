//! Client submissions as received over geosubmit.
//!
//! Only identifier shape is checked here. Numeric fields are kept wide and
//! optional because clients send `null`, negative placeholders and
//! `Integer.MAX_VALUE` for values the modem did not report; canonicalising
//! those is the job of [`CellReport::identifier`] and of the observation
//! builder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    cell::{CellIdentifier, Limits},
    error::{Field, IdentifierFault, Result},
    mac::{encode_mac, StationIdentifier},
    radio::{RadioType, ReportSource},
};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Submission {
    pub items: Vec<Report>,
}

impl Submission {
    pub fn from_slice(raw: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(raw)
    }
}

/// A single client submission: one position fix plus everything the device
/// could see at that moment.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub position: Position,
    #[serde(default, deserialize_with = "nullable")]
    pub cell_towers: Vec<CellReport>,
    #[serde(default, deserialize_with = "nullable")]
    pub wifi_access_points: Vec<WifiReport>,
    #[serde(default, deserialize_with = "nullable")]
    pub bluetooth_beacons: Vec<BlueReport>,
}

impl Report {
    pub fn from_slice(raw: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(raw)
    }

    pub fn source(&self) -> ReportSource {
        self.position.source
    }

    pub fn sightings(&self) -> usize {
        self.cell_towers.len() + self.wifi_access_points.len() + self.bluetooth_beacons.len()
    }
}

// NeoStumbler/18 sends {"cellTowers":null}
fn nullable<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub altitude: Option<f64>,
    pub altitude_accuracy: Option<f64>,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    // Tower Collector does not send age field
    pub age: Option<i32>,
    #[serde(default)]
    pub source: ReportSource,
}

impl Position {
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellReport {
    pub radio_type: Option<RadioType>,
    pub mobile_country_code: Option<i64>,
    pub mobile_network_code: Option<i64>,
    pub location_area_code: Option<i64>,
    pub cell_id: Option<i64>,
    pub primary_scrambling_code: Option<i64>,
    pub asu: Option<i32>,
    pub signal_strength: Option<i32>,
    pub timing_advance: Option<i32>,
    pub age: Option<i32>,
}

impl CellReport {
    /// Build the canonical identifier, validating every field.
    ///
    /// A negative or placeholder unit means "not reported" and becomes
    /// absent; GSM units are dropped since GSM keys carry none.
    pub fn identifier(&self) -> Result<CellIdentifier> {
        let radio = self.radio_type.unwrap_or(RadioType::Unknown);
        if !radio.is_cellular() {
            return Err(IdentifierFault::NotCellular(radio).into());
        }

        let unit = match radio {
            RadioType::Gsm => None,
            _ => self
                .primary_scrambling_code
                .filter(|x| (0..i64::from(i32::MAX)).contains(x)),
        };

        let id = CellIdentifier {
            radio,
            mcc: narrow(radio, Field::Mcc, self.mobile_country_code)?,
            mnc: narrow(radio, Field::Mnc, self.mobile_network_code)?,
            area: narrow(radio, Field::AreaCode, self.location_area_code)?,
            cell: narrow(radio, Field::CellId, self.cell_id)?,
            unit: unit
                .map(|x| narrow(radio, Field::Unit, Some(x)))
                .transpose()?,
        };
        id.validate()?;
        Ok(id)
    }
}

fn narrow<T: TryFrom<i64>>(
    radio: RadioType,
    field: Field,
    value: Option<i64>,
) -> Result<T, IdentifierFault> {
    let value = value
        .filter(|x| *x >= 0)
        .ok_or(IdentifierFault::Missing { radio, field })?;
    T::try_from(value).map_err(|_| IdentifierFault::OutOfRange {
        radio,
        field,
        value: value as u64,
        range: Limits::of(radio)
            .and_then(|x| x.field(field))
            .unwrap_or(0..=0),
    })
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WifiReport {
    pub mac_address: String,
    pub ssid: Option<String>,
    pub channel: Option<i32>,
    pub frequency: Option<i32>,
    pub signal_strength: Option<i32>,
    pub signal_to_noise_ratio: Option<i32>,
    pub age: Option<i32>,
}

impl WifiReport {
    pub fn identifier(&self) -> Result<StationIdentifier> {
        encode_mac(self.mac_address.as_str(), RadioType::Wifi)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueReport {
    pub mac_address: String,
    pub name: Option<String>,
    pub signal_strength: Option<i32>,
    pub age: Option<i32>,
}

impl BlueReport {
    pub fn identifier(&self) -> Result<StationIdentifier> {
        encode_mac(self.mac_address.as_str(), RadioType::Bluetooth)
    }
}
