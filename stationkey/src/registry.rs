//! Static list of the record types this crate defines, for persistence and
//! validation layers that need to enumerate them.

use strum::{Display, EnumIter, IntoEnumIterator};

use crate::shard::{CellLayout, Shard, AREA_TABLE};

/// Aggregate stats, region stats, data maps, API keys and export configs
/// are owned by the persistence layer and not listed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
pub enum Entity {
    Report,
    CellReport,
    WifiReport,
    BlueReport,
    CellObservation,
    WifiObservation,
    BlueObservation,
    CellShard,
    CellArea,
    WifiShard,
    BlueShard,
}

impl Entity {
    /// Whether rows of this type are written to storage. Reports are
    /// transient and only live until they are exploded.
    pub fn is_persisted(self) -> bool {
        !matches!(
            self,
            Entity::Report | Entity::CellReport | Entity::WifiReport | Entity::BlueReport
        )
    }

    /// Tables holding this entity under the given layout. Observations live
    /// in the shard table of their transmitter.
    pub fn tables(self, layout: CellLayout) -> Vec<String> {
        let shards = Shard::all(layout).into_iter();
        match self {
            Entity::CellShard | Entity::CellObservation => shards
                .filter(|x| matches!(x, Shard::Cell(_)))
                .map(|x| x.table())
                .collect(),
            Entity::WifiShard | Entity::WifiObservation => shards
                .filter(|x| matches!(x, Shard::Wifi(_)))
                .map(|x| x.table())
                .collect(),
            Entity::BlueShard | Entity::BlueObservation => shards
                .filter(|x| matches!(x, Shard::Blue(_)))
                .map(|x| x.table())
                .collect(),
            Entity::CellArea => vec![AREA_TABLE.to_owned()],
            Entity::Report | Entity::CellReport | Entity::WifiReport | Entity::BlueReport => {
                Vec::new()
            }
        }
    }
}

/// Every physical table a deployment with this layout needs.
pub fn tables(layout: CellLayout) -> Vec<String> {
    let mut tables: Vec<String> = Entity::iter()
        .filter(|x| {
            matches!(
                x,
                Entity::CellShard | Entity::CellArea | Entity::WifiShard | Entity::BlueShard
            )
        })
        .flat_map(|x| x.tables(layout))
        .collect();
    tables.sort();
    tables
}
