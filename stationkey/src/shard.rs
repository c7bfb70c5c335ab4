//! Assignment of transmitters to storage partitions.
//!
//! Routing depends only on the radio type and the encoded identifier. The
//! table names produced here are part of the storage layout: changing how an
//! identifier maps to a shard requires migrating the rows already written.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

use crate::{
    cell::{encode_cellarea, encode_cellid, CellAreaKey, CellIdentifier, EncodedCellId},
    error::{KeyFault, MacFault, Result},
    mac::StationIdentifier,
    radio::RadioType,
};

/// Number of shards per station family, one per hex digit.
pub const STATION_SHARDS: u8 = 16;

pub const AREA_TABLE: &str = "cell_area";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ShardFamily {
    Cell,
    Wifi,
    Blue,
}

/// How cell radios are spread over cell shards.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CellLayout {
    /// One table per radio generation.
    #[default]
    PerRadio,
    /// Every generation in a single table.
    Combined,
}

/// A single storage partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Shard {
    /// `None` under [`CellLayout::Combined`].
    Cell(Option<RadioType>),
    Wifi(u8),
    Blue(u8),
}

impl Shard {
    pub fn family(&self) -> ShardFamily {
        match self {
            Shard::Cell(_) => ShardFamily::Cell,
            Shard::Wifi(_) => ShardFamily::Wifi,
            Shard::Blue(_) => ShardFamily::Blue,
        }
    }

    pub fn table(&self) -> String {
        match self {
            Shard::Cell(Some(radio)) => format!("cell_{radio}"),
            Shard::Cell(None) => "cell".to_owned(),
            Shard::Wifi(n) => format!("wifi_shard_{n:x}"),
            Shard::Blue(n) => format!("blue_shard_{n:x}"),
        }
    }

    /// Every shard a deployment with the given layout writes to.
    pub fn all(layout: CellLayout) -> Vec<Shard> {
        let mut shards: Vec<Shard> = match layout {
            CellLayout::PerRadio => RadioType::iter()
                .filter(|x| x.is_cellular())
                .map(|x| Shard::Cell(Some(x)))
                .collect(),
            CellLayout::Combined => vec![Shard::Cell(None)],
        };
        shards.extend((0..STATION_SHARDS).map(Shard::Wifi));
        shards.extend((0..STATION_SHARDS).map(Shard::Blue));
        shards
    }
}

impl fmt::Display for Shard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.table())
    }
}

/// Primary key of a row within its shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum ShardKey {
    Cell(EncodedCellId),
    Station(StationIdentifier),
}

impl ShardKey {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ShardKey::Cell(x) => x.as_bytes(),
            ShardKey::Station(x) => x.as_bytes(),
        }
    }
}

impl fmt::Display for ShardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardKey::Cell(x) => fmt::Display::fmt(x, f),
            ShardKey::Station(x) => fmt::Display::fmt(x, f),
        }
    }
}

/// Any transmitter identity the router accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Transmitter {
    Cell(CellIdentifier),
    Wifi(StationIdentifier),
    Bluetooth(StationIdentifier),
}

impl Transmitter {
    pub fn radio(&self) -> RadioType {
        match self {
            Transmitter::Cell(x) => x.radio,
            Transmitter::Wifi(_) => RadioType::Wifi,
            Transmitter::Bluetooth(_) => RadioType::Bluetooth,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Route {
    pub shard: Shard,
    pub key: ShardKey,
}

/// Stateless mapping from transmitters to shards.
///
/// Two routers built with the same layout always agree.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShardRouter {
    layout: CellLayout,
}

impl ShardRouter {
    pub fn new(layout: CellLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> CellLayout {
        self.layout
    }

    /// `None` for radios that are not cellular.
    pub fn cell_shard(&self, radio: RadioType) -> Option<Shard> {
        if !radio.is_cellular() {
            return None;
        }
        let shard = match self.layout {
            CellLayout::PerRadio => Shard::Cell(Some(radio)),
            CellLayout::Combined => Shard::Cell(None),
        };
        Some(shard)
    }

    pub fn route(&self, transmitter: &Transmitter) -> Result<Route> {
        match transmitter {
            Transmitter::Cell(id) => self.route_cell(&encode_cellid(id)?),
            Transmitter::Wifi(mac) => self.route_wifi(mac),
            Transmitter::Bluetooth(mac) => Ok(self.route_blue(mac)),
        }
    }

    /// Multicast addresses are refused here too, since a parsed or
    /// deserialized identifier never went through the WiFi rules.
    pub fn route_wifi(&self, mac: &StationIdentifier) -> Result<Route> {
        if mac.is_multicast() {
            return Err(MacFault::Multicast(RadioType::Wifi).into());
        }
        Ok(Route {
            shard: Shard::Wifi(mac.shard_digit()),
            key: ShardKey::Station(*mac),
        })
    }

    pub fn route_blue(&self, mac: &StationIdentifier) -> Route {
        Route {
            shard: Shard::Blue(mac.shard_digit()),
            key: ShardKey::Station(*mac),
        }
    }

    /// Route an already encoded cell key by the radio tag it carries.
    pub fn route_cell(&self, key: &EncodedCellId) -> Result<Route> {
        let radio = key.radio()?;
        let shard = self
            .cell_shard(radio)
            .ok_or(KeyFault::RadioTag(key.as_bytes()[1]))?;
        Ok(Route {
            shard,
            key: ShardKey::Cell(*key),
        })
    }
}

/// Key of the area aggregate a cell contributes to.
pub fn area_route(id: &CellIdentifier) -> Result<CellAreaKey> {
    encode_cellarea(&id.area())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cell::decode_cellid, mac::encode_mac, Error};

    fn cell(radio: RadioType, area: u32, cell: u64) -> Transmitter {
        Transmitter::Cell(CellIdentifier::new(radio, 310, 410, area, cell))
    }

    #[test]
    fn cells_by_radio() {
        let router = ShardRouter::default();
        let route = router.route(&cell(RadioType::Lte, 2000, 12345)).unwrap();
        assert_eq!(route.shard, Shard::Cell(Some(RadioType::Lte)));
        assert_eq!(route.shard.table(), "cell_lte");
        let ShardKey::Cell(key) = route.key else {
            panic!("expected a cell key");
        };
        assert_eq!(decode_cellid(&key).unwrap().cell, 12345);

        let umts = router.route(&cell(RadioType::Umts, 1, 1)).unwrap();
        assert_eq!(umts.shard.table(), "cell_wcdma");
    }

    #[test]
    fn combined_layout() {
        let router = ShardRouter::new(CellLayout::Combined);
        for radio in [RadioType::Gsm, RadioType::Nr] {
            let route = router.route(&cell(radio, 1, 1)).unwrap();
            assert_eq!(route.shard.table(), "cell");
        }
    }

    #[test]
    fn stations_by_digit() {
        let router = ShardRouter::default();
        let mac = encode_mac("00:1a:fb:3c:4d:5e", RadioType::Wifi).unwrap();
        let route = router.route(&Transmitter::Wifi(mac)).unwrap();
        assert_eq!(route.shard.table(), "wifi_shard_f");
        assert_eq!(route.key, ShardKey::Station(mac));

        let route = router.route(&Transmitter::Bluetooth(mac)).unwrap();
        assert_eq!(route.shard, Shard::Blue(0xf));
    }

    #[test]
    fn routing_is_stable() {
        let transmitters = [
            cell(RadioType::Gsm, 2000, 12345),
            cell(RadioType::Nr, 70_000, 1 << 35),
            Transmitter::Wifi("a0:b1:c2:d3:e4:f5".parse().unwrap()),
        ];
        let (a, b) = (ShardRouter::default(), ShardRouter::default());
        for x in &transmitters {
            assert_eq!(a.route(x).unwrap(), b.route(x).unwrap());
            assert_eq!(a.route(x).unwrap(), a.route(x).unwrap());
        }
    }

    #[test]
    fn invalid_cell() {
        let err = ShardRouter::default().route(&cell(RadioType::Gsm, 0, 1));
        assert!(matches!(err, Err(Error::InvalidIdentifier(_))));
    }

    #[test]
    fn area_fan_out() {
        let Transmitter::Cell(id) = cell(RadioType::Gsm, 2000, 12345) else {
            unreachable!()
        };
        let route = ShardRouter::default().route(&Transmitter::Cell(id)).unwrap();
        let area = area_route(&id).unwrap();
        let ShardKey::Cell(key) = route.key else {
            unreachable!()
        };
        assert!(area.contains(&key));
    }

    #[test]
    fn cell_key_picks_its_own_shard() {
        let router = ShardRouter::default();
        let key = encode_cellid(&CellIdentifier::new(RadioType::Gsm, 310, 410, 2000, 1)).unwrap();
        assert_eq!(router.route_cell(&key).unwrap().shard.table(), "cell_gsm");

        let nr = CellIdentifier::new(RadioType::Nr, 310, 410, 2000, 1);
        let key = encode_cellid(&nr).unwrap();
        assert_eq!(router.route_cell(&key).unwrap().shard, Shard::Cell(Some(RadioType::Nr)));

        let mut bytes = key.as_bytes().to_vec();
        bytes[1] = 1;
        let key = EncodedCellId::try_from(bytes.as_slice()).unwrap();
        assert!(matches!(router.route_cell(&key), Err(Error::MalformedKey(_))));
    }

    #[test]
    fn cell_shards_only_for_cells() {
        let router = ShardRouter::default();
        assert_eq!(router.cell_shard(RadioType::Wifi), None);
        assert_eq!(router.cell_shard(RadioType::Unknown), None);
        let tables = crate::registry::tables(CellLayout::PerRadio);
        for radio in RadioType::iter() {
            if let Some(shard) = router.cell_shard(radio) {
                assert!(tables.contains(&shard.table()));
            }
        }
    }

    #[test]
    fn wifi_refuses_multicast() {
        let router = ShardRouter::default();
        let mac: StationIdentifier = "01:00:5e:00:00:01".parse().unwrap();
        assert_eq!(
            router.route(&Transmitter::Wifi(mac)),
            Err(Error::InvalidMac(MacFault::Multicast(RadioType::Wifi)))
        );
        assert_eq!(router.route_blue(&mac).shard, Shard::Blue(5));
    }

    #[test]
    fn shard_count() {
        assert_eq!(Shard::all(CellLayout::PerRadio).len(), 4 + 32);
        assert_eq!(Shard::all(CellLayout::Combined).len(), 1 + 32);
    }
}
