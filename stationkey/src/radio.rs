use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Network technology that observed a transmitter.
///
/// Variant order is significant: it is the sort order of cell keys, and the
/// derived `Ord` agrees with [`RadioType::cell_tag`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RadioType {
    Gsm,
    // geosubmit clients send "wcdma"
    #[serde(rename = "wcdma", alias = "umts")]
    #[strum(to_string = "wcdma", serialize = "umts")]
    Umts,
    Lte,
    Nr,
    Wifi,
    #[serde(alias = "blue")]
    #[strum(to_string = "bluetooth", serialize = "blue")]
    Bluetooth,
    #[serde(other)]
    Unknown,
}

impl RadioType {
    /// Tag byte stored in cell and area keys. `None` for radios without a
    /// cell identifier. Tag 1 is reserved (CDMA) and never produced.
    pub fn cell_tag(self) -> Option<u8> {
        match self {
            RadioType::Gsm => Some(0),
            RadioType::Umts => Some(2),
            RadioType::Lte => Some(3),
            RadioType::Nr => Some(4),
            RadioType::Wifi | RadioType::Bluetooth | RadioType::Unknown => None,
        }
    }

    pub fn from_cell_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(RadioType::Gsm),
            2 => Some(RadioType::Umts),
            3 => Some(RadioType::Lte),
            4 => Some(RadioType::Nr),
            _ => None,
        }
    }

    pub fn is_cellular(self) -> bool {
        self.cell_tag().is_some()
    }

    pub fn is_station(self) -> bool {
        matches!(self, RadioType::Wifi | RadioType::Bluetooth)
    }
}

/// Where the position attached to a report came from.
///
/// Closed set; ordered from most to least trusted so aggregation can rank by
/// it directly.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReportSource {
    /// Satellite fix taken on the device.
    #[default]
    #[serde(rename = "gps", alias = "gnss")]
    #[strum(to_string = "gps", serialize = "gnss")]
    Gnss,
    /// Position entered by hand.
    Manual,
    /// Fused provider, may mix satellite, network and sensor data.
    Fused,
    /// Position estimated by a previous lookup against this service.
    Query,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn tags_follow_variant_order() {
        let tags: Vec<u8> = RadioType::iter().filter_map(RadioType::cell_tag).collect();
        assert_eq!(tags, [0, 2, 3, 4]);
        for radio in RadioType::iter() {
            if let Some(tag) = radio.cell_tag() {
                assert_eq!(RadioType::from_cell_tag(tag), Some(radio));
            }
        }
        assert_eq!(RadioType::from_cell_tag(1), None);
    }

    #[test]
    fn names() {
        assert_eq!(RadioType::Umts.to_string(), "wcdma");
        assert_eq!(RadioType::from_str("umts").ok(), Some(RadioType::Umts));
        assert_eq!(RadioType::from_str("blue").ok(), Some(RadioType::Bluetooth));

        let parsed: RadioType = serde_json::from_str("\"wcdma\"").unwrap();
        assert_eq!(parsed, RadioType::Umts);
        let parsed: RadioType = serde_json::from_str("\"cdma\"").unwrap();
        assert_eq!(parsed, RadioType::Unknown);
    }

    #[test]
    fn sources() {
        let parsed: ReportSource = serde_json::from_str("\"gnss\"").unwrap();
        assert_eq!(parsed, ReportSource::Gnss);
        assert_eq!(ReportSource::Gnss.to_string(), "gps");
        assert!(ReportSource::Gnss < ReportSource::Query);
    }
}
