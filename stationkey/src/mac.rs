//! 48-bit station identifiers used by WiFi access points and Bluetooth
//! beacons.

use std::{fmt, str::FromStr};

use mac_address::MacAddress;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    error::{MacFault, Result},
    radio::RadioType,
};

const MULTICAST: u8 = 0b01;
const LOCAL: u8 = 0b10;

/// Canonical binary form of a station address, big-endian.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StationIdentifier([u8; 6]);

impl StationIdentifier {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Locally administered (U/L bit set). Such addresses are usually
    /// randomised per network or per scan and make poor long-lived keys.
    pub fn is_local(&self) -> bool {
        self.0[0] & LOCAL != 0
    }

    pub fn is_multicast(&self) -> bool {
        self.0[0] & MULTICAST != 0
    }

    /// Fifth hex digit of the canonical text form.
    pub fn shard_digit(&self) -> u8 {
        self.0[2] >> 4
    }

    fn check(octets: [u8; 6]) -> Result<Self, MacFault> {
        match octets {
            [0, 0, 0, 0, 0, 0] => Err(MacFault::Zero),
            [0xff, 0xff, 0xff, 0xff, 0xff, 0xff] => Err(MacFault::Broadcast),
            _ => Ok(Self(octets)),
        }
    }
}

/// Anything a station address can be read from.
pub trait MacSource {
    fn octets(&self) -> Result<[u8; 6], MacFault>;
}

impl MacSource for str {
    fn octets(&self) -> Result<[u8; 6], MacFault> {
        let digits: String = self
            .trim()
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | '.'))
            .collect();
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(MacFault::NotHex(self.to_owned()));
        }
        if digits.len() != 12 {
            return Err(MacFault::Length(digits.len()));
        }

        let mut octets = [0; 6];
        hex::decode_to_slice(&digits, &mut octets).map_err(|_| MacFault::NotHex(self.to_owned()))?;
        Ok(octets)
    }
}

impl MacSource for String {
    fn octets(&self) -> Result<[u8; 6], MacFault> {
        self.as_str().octets()
    }
}

impl MacSource for [u8] {
    fn octets(&self) -> Result<[u8; 6], MacFault> {
        // length reported in hex digits, as for text input
        <[u8; 6]>::try_from(self).map_err(|_| MacFault::Length(self.len() * 2))
    }
}

impl MacSource for [u8; 6] {
    fn octets(&self) -> Result<[u8; 6], MacFault> {
        Ok(*self)
    }
}

impl MacSource for MacAddress {
    fn octets(&self) -> Result<[u8; 6], MacFault> {
        Ok(self.bytes())
    }
}

/// Validate a station address for the given radio family.
///
/// All-zero and broadcast addresses are rejected for every family; WiFi
/// additionally rejects multicast addresses since no access point transmits
/// from one. Bluetooth random static addresses set the top bits of the first
/// octet, so no multicast rule applies there.
pub fn encode_mac<T: MacSource + ?Sized>(input: &T, radio: RadioType) -> Result<StationIdentifier> {
    if !radio.is_station() {
        return Err(MacFault::NotStation(radio).into());
    }
    let id = StationIdentifier::check(input.octets()?)?;
    if radio == RadioType::Wifi && id.is_multicast() {
        return Err(MacFault::Multicast(radio).into());
    }
    Ok(id)
}

/// Lower-case, colon-delimited text form.
pub fn decode_mac(id: &StationIdentifier) -> String {
    let [a, b, c, d, e, f] = id.0;
    format!("{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{f:02x}")
}

impl fmt::Display for StationIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&decode_mac(self))
    }
}

impl fmt::Debug for StationIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationIdentifier({self})")
    }
}

/// Parses without any radio-family rule; only zero and broadcast are refused.
impl FromStr for StationIdentifier {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self::check(s.octets()?)?)
    }
}

impl From<StationIdentifier> for MacAddress {
    fn from(value: StationIdentifier) -> Self {
        MacAddress::new(value.0)
    }
}

impl Serialize for StationIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&decode_mac(self))
    }
}

impl<'de> Deserialize<'de> for StationIdentifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}
