//! Addressing interface expected from the persistence layer, plus an
//! in-memory implementation.

use std::collections::BTreeMap;

use crate::{
    cell::{decode_cellarea, CellAreaKey, EncodedCellId, AREA_KEY_LEN, CELL_KEY_LEN},
    error::Result,
    observation::Observation,
    shard::{Route, Shard, ShardFamily, ShardKey, ShardRouter},
};

/// Append-only, ordered storage of observations keyed by [`Route`].
pub trait ShardStore {
    /// Rows are never updated in place; a repeat sighting is a new row.
    fn append(&mut self, route: Route, observation: Observation);

    /// Every observation of one shard, ordered by key.
    fn scan<'a>(&'a self, shard: &Shard) -> Box<dyn Iterator<Item = &'a Observation> + 'a>;

    /// Every observation of every cell in an area, ordered by cell key.
    fn scan_area<'a>(
        &'a self,
        area: &CellAreaKey,
    ) -> Result<Box<dyn Iterator<Item = &'a Observation> + 'a>>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    router: ShardRouter,
    exclude_local: bool,
    shards: BTreeMap<Shard, BTreeMap<ShardKey, Vec<Observation>>>,
    areas: BTreeMap<CellAreaKey, usize>,
    skipped: usize,
}

impl MemoryStore {
    pub fn new(router: ShardRouter) -> Self {
        Self {
            router,
            ..Default::default()
        }
    }

    /// Leave out stations seen under locally administered addresses.
    pub fn exclude_local(mut self, exclude: bool) -> Self {
        self.exclude_local = exclude;
        self
    }

    /// Route and append an observation, fanning cells out to their area.
    pub fn insert(&mut self, observation: Observation) -> Result<Option<Route>> {
        if self.exclude_local && observation.is_local() {
            self.skipped += 1;
            return Ok(None);
        }
        let route = observation.route(&self.router)?;
        self.append(route, observation);
        Ok(Some(route))
    }

    /// Distinct transmitters per table.
    pub fn tables(&self) -> BTreeMap<String, usize> {
        self.shards
            .iter()
            .map(|(shard, rows)| (shard.table(), rows.len()))
            .collect()
    }

    /// Distinct transmitters per shard family.
    pub fn families(&self) -> BTreeMap<ShardFamily, usize> {
        let mut families = BTreeMap::new();
        for (shard, rows) in &self.shards {
            *families.entry(shard.family()).or_default() += rows.len();
        }
        families
    }

    pub fn transmitters(&self) -> usize {
        self.shards.values().map(BTreeMap::len).sum()
    }

    pub fn observations(&self) -> usize {
        self.shards
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    /// Cell observations per area, from the area fan-out.
    pub fn areas(&self) -> &BTreeMap<CellAreaKey, usize> {
        &self.areas
    }

    /// Observations left out by [`MemoryStore::exclude_local`].
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl ShardStore for MemoryStore {
    fn append(&mut self, route: Route, observation: Observation) {
        if let Some(area) = observation.area_key() {
            *self.areas.entry(area).or_default() += 1;
        }
        self.shards
            .entry(route.shard)
            .or_default()
            .entry(route.key)
            .or_default()
            .push(observation);
    }

    fn scan<'a>(&'a self, shard: &Shard) -> Box<dyn Iterator<Item = &'a Observation> + 'a> {
        match self.shards.get(shard) {
            Some(rows) => Box::new(rows.values().flatten()),
            None => Box::new(std::iter::empty()),
        }
    }

    fn scan_area<'a>(
        &'a self,
        area: &CellAreaKey,
    ) -> Result<Box<dyn Iterator<Item = &'a Observation> + 'a>> {
        let radio = decode_cellarea(area)?.radio;
        let shard = self.router.cell_shard(radio);
        let Some(rows) = shard.and_then(|x| self.shards.get(&x)) else {
            return Ok(Box::new(std::iter::empty()));
        };

        let mut start = [0; CELL_KEY_LEN];
        start[..AREA_KEY_LEN].copy_from_slice(area.as_bytes());
        let start = ShardKey::Cell(EncodedCellId::try_from(&start[..])?);

        let area = *area;
        let iter = rows
            .range(start..)
            .take_while(move |(key, _)| match key {
                ShardKey::Cell(x) => area.contains(x),
                ShardKey::Station(_) => false,
            })
            .flat_map(|(_, x)| x);
        Ok(Box::new(iter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cell::{encode_cellarea, CellIdentifier},
        radio::RadioType,
        report::Report,
        shard::CellLayout,
    };

    fn cell(area: i64, cell: i64) -> String {
        format!(
            r#"{{"radioType": "lte", "mobileCountryCode": 310, "mobileNetworkCode": 410,
                "locationAreaCode": {area}, "cellId": {cell}}}"#
        )
    }

    fn observations(cells: &[String], wifis: &[&str]) -> Vec<Observation> {
        let wifis: Vec<String> = wifis
            .iter()
            .map(|x| format!(r#"{{"macAddress": "{x}"}}"#))
            .collect();
        let raw = format!(
            r#"{{"timestamp": 0, "position": {{"latitude": 1.0, "longitude": 2.0}},
                "cellTowers": [{}], "wifiAccessPoints": [{}]}}"#,
            cells.join(","),
            wifis.join(",")
        );
        Report::from_slice(raw.as_bytes()).unwrap().explode().collect()
    }

    #[test]
    fn scan_area_in_key_order() {
        let mut store = MemoryStore::default();
        for x in observations(
            &[cell(2001, 5), cell(2000, 9), cell(2000, 3), cell(1999, 4), cell(2000, 3)],
            &[],
        ) {
            store.insert(x).unwrap();
        }

        let area = CellIdentifier::new(RadioType::Lte, 310, 410, 2000, 1).area();
        let key = encode_cellarea(&area).unwrap();
        let cells: Vec<u64> = store
            .scan_area(&key)
            .unwrap()
            .map(|x| match x {
                Observation::Cell(x) => x.id.cell,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(cells, [3, 3, 9]);
        assert_eq!(store.areas()[&key], 3);
        assert_eq!(store.transmitters(), 4);
        assert_eq!(store.observations(), 5);
    }

    #[test]
    fn scan_area_unknown() {
        let store = MemoryStore::default();
        let area = CellIdentifier::new(RadioType::Gsm, 1, 1, 1, 1).area();
        let key = encode_cellarea(&area).unwrap();
        assert_eq!(store.scan_area(&key).unwrap().count(), 0);
    }

    #[test]
    fn station_shards() {
        let mut store =
            MemoryStore::new(ShardRouter::new(CellLayout::Combined)).exclude_local(true);
        for x in observations(
            &[cell(1, 1)],
            &["00:1a:2b:3c:4d:5e", "00:1a:2b:3c:4d:5e", "02:1a:2b:3c:4d:5e"],
        ) {
            store.insert(x).unwrap();
        }
        assert_eq!(store.skipped(), 1);
        assert_eq!(store.scan(&Shard::Wifi(2)).count(), 2);
        assert_eq!(store.scan(&Shard::Wifi(3)).count(), 0);

        let tables = store.tables();
        assert_eq!(tables["cell"], 1);
        assert_eq!(tables["wifi_shard_2"], 1);

        let families = store.families();
        assert_eq!(families[&ShardFamily::Cell], 1);
        assert_eq!(families[&ShardFamily::Wifi], 1);
        assert!(!families.contains_key(&ShardFamily::Blue));
    }
}
