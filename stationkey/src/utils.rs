use std::ops::RangeInclusive;

use crate::radio::RadioType;

// if this returns None the SSID is hidden or empty
pub fn normalize_ssid(ssid: Option<&str>) -> Option<&str> {
    let ssid = ssid?.trim().trim_matches('\0');
    if ssid.is_empty() {
        None
    } else {
        Some(ssid)
    }
}

/// Owners opt their network out of collection with these SSID suffixes.
pub fn is_opted_out(ssid: &str) -> bool {
    ssid.contains("_nomap") || ssid.contains("_optout")
}

pub fn within<T: PartialOrd + Copy>(value: Option<T>, range: RangeInclusive<T>) -> Option<T> {
    value.filter(|x| range.contains(x))
}

/// Plausible received signal strength in dBm.
pub fn signal_range(radio: RadioType) -> Option<RangeInclusive<i32>> {
    match radio {
        RadioType::Gsm => Some(-113..=-51),
        RadioType::Umts => Some(-121..=-25),
        RadioType::Lte => Some(-140..=-43),
        RadioType::Nr => Some(-156..=-31),
        RadioType::Wifi => Some(-100..=-10),
        RadioType::Bluetooth => Some(-127..=0),
        RadioType::Unknown => None,
    }
}

/// Convert an arbitrary strength unit reading to dBm.
pub fn asu_to_signal(radio: RadioType, asu: i32) -> Option<i32> {
    let (range, offset, scale) = match radio {
        RadioType::Gsm => (0..=31, -113, 2),
        RadioType::Umts => (-5..=91, -116, 1),
        RadioType::Lte => (0..=97, -140, 1),
        RadioType::Nr => (0..=127, -156, 1),
        _ => return None,
    };
    range.contains(&asu).then_some(asu * scale + offset)
}

pub fn timing_advance_range(radio: RadioType) -> Option<RangeInclusive<i32>> {
    match radio {
        RadioType::Gsm => Some(0..=63),
        RadioType::Lte => Some(0..=1282),
        RadioType::Nr => Some(0..=3846),
        _ => None,
    }
}

pub fn channel_to_frequency(channel: i32) -> Option<i32> {
    match channel {
        1..=13 => Some(2407 + 5 * channel),
        14 => Some(2484),
        32..=177 => Some(5000 + 5 * channel),
        _ => None,
    }
}

pub fn frequency_to_channel(frequency: i32) -> Option<i32> {
    match frequency {
        2412..=2472 if (frequency - 2407) % 5 == 0 => Some((frequency - 2407) / 5),
        2484 => Some(14),
        5160..=5885 if frequency % 5 == 0 => Some((frequency - 5000) / 5),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssid() {
        // whitespace
        assert_eq!(normalize_ssid(Some("testing!")), Some("testing!"));
        assert_eq!(normalize_ssid(Some("  testing!  ")), Some("testing!"));
        assert_eq!(normalize_ssid(Some("testing  !")), Some("testing  !"));

        // null
        assert_eq!(normalize_ssid(None), None);
        assert_eq!(normalize_ssid(Some("\0\0\0\0\0\0\0\0")), None);

        // opt out
        assert!(!is_opted_out("wifi"));
        assert!(is_opted_out("wifi_nomap"));
        assert!(is_opted_out("wifi_optout"));
        assert!(is_opted_out("wifi_optout_nomap"));
    }

    #[test]
    fn asu() {
        assert_eq!(asu_to_signal(RadioType::Gsm, 0), Some(-113));
        assert_eq!(asu_to_signal(RadioType::Gsm, 31), Some(-51));
        assert_eq!(asu_to_signal(RadioType::Gsm, 99), None);
        assert_eq!(asu_to_signal(RadioType::Lte, 40), Some(-100));
        assert_eq!(asu_to_signal(RadioType::Wifi, 40), None);
    }

    #[test]
    fn channels() {
        assert_eq!(channel_to_frequency(1), Some(2412));
        assert_eq!(channel_to_frequency(14), Some(2484));
        assert_eq!(channel_to_frequency(36), Some(5180));
        assert_eq!(channel_to_frequency(0), None);
        for channel in [1, 6, 11, 13, 14, 36, 149, 165] {
            let frequency = channel_to_frequency(channel).unwrap();
            assert_eq!(frequency_to_channel(frequency), Some(channel));
        }
        assert_eq!(frequency_to_channel(2413), None);
    }

    #[test]
    fn ranges() {
        assert_eq!(within(Some(-60), -100..=-10), Some(-60));
        assert_eq!(within(Some(-5), -100..=-10), None);
        assert_eq!(within(None::<i32>, -100..=-10), None);
    }
}
