//! Cell and cell-area identifiers and their storage keys.
//!
//! Key format version 1, big-endian throughout:
//!
//! ```text
//! byte   0        1      2..4  4..6  6..10  10..18  18..20
//!        version  radio  mcc   mnc   area   cell    unit
//! ```
//!
//! The area key is the first ten bytes of the cell key, so an ordered scan
//! over that prefix visits every cell of the area. A cell without a unit
//! (PSC/PCI) stores `0xffff` there.
//!
//! Any change to this layout must bump [`KEY_VERSION`]; keys written under an
//! older version are rejected by [`decode_cellid`] instead of reinterpreted.

use std::{cmp::Ordering, fmt, ops::RangeInclusive};

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    error::{Field, IdentifierFault, KeyFault, Result},
    radio::RadioType,
};

pub const KEY_VERSION: u8 = 1;
pub const CELL_KEY_LEN: usize = 20;
pub const AREA_KEY_LEN: usize = 10;

const UNIT_ABSENT: u16 = u16::MAX;

const MCC: RangeInclusive<u64> = 0..=999;
const MNC: RangeInclusive<u64> = 0..=999;

/// Legal field ranges for one radio generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    pub area: RangeInclusive<u64>,
    pub cell: RangeInclusive<u64>,
    /// `None` when the generation has no unit (PSC/PCI) at all.
    pub unit: Option<RangeInclusive<u64>>,
}

impl Limits {
    pub fn of(radio: RadioType) -> Option<Self> {
        // LAC/TAC 0x0000 and 0xfffe are reserved by 3GPP
        let limits = match radio {
            RadioType::Gsm => Limits {
                area: 1..=65_533,
                cell: 1..=0xffff,
                unit: None,
            },
            RadioType::Umts => Limits {
                area: 1..=65_533,
                cell: 1..=0x0fff_ffff,
                unit: Some(0..=511),
            },
            RadioType::Lte => Limits {
                area: 1..=65_533,
                cell: 1..=0x0fff_ffff,
                unit: Some(0..=503),
            },
            RadioType::Nr => Limits {
                area: 1..=0xff_fffd,
                cell: 1..=0x0f_ffff_ffff,
                unit: Some(0..=1007),
            },
            RadioType::Wifi | RadioType::Bluetooth | RadioType::Unknown => return None,
        };
        Some(limits)
    }

    pub fn field(&self, field: Field) -> Option<RangeInclusive<u64>> {
        match field {
            Field::Mcc => Some(MCC),
            Field::Mnc => Some(MNC),
            Field::AreaCode => Some(self.area.clone()),
            Field::CellId => Some(self.cell.clone()),
            Field::Unit => self.unit.clone(),
        }
    }
}

fn check(
    radio: RadioType,
    field: Field,
    value: u64,
    range: &RangeInclusive<u64>,
) -> Result<(), IdentifierFault> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(IdentifierFault::OutOfRange {
            radio,
            field,
            value,
            range: range.clone(),
        })
    }
}

/// Identity of a single cell.
///
/// Ordering is by radio, MCC, MNC, area code, cell id and finally unit, with
/// an absent unit sorting after every present one. This matches the byte
/// order of [`EncodedCellId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct CellIdentifier {
    pub radio: RadioType,
    pub mcc: u16,
    pub mnc: u16,
    pub area: u32,
    pub cell: u64,
    pub unit: Option<u16>,
}

impl CellIdentifier {
    pub fn new(radio: RadioType, mcc: u16, mnc: u16, area: u32, cell: u64) -> Self {
        Self {
            radio,
            mcc,
            mnc,
            area,
            cell,
            unit: None,
        }
    }

    pub fn with_unit(mut self, unit: u16) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn area(&self) -> CellAreaIdentifier {
        CellAreaIdentifier {
            radio: self.radio,
            mcc: self.mcc,
            mnc: self.mnc,
            area: self.area,
        }
    }

    pub fn validate(&self) -> Result<(), IdentifierFault> {
        let limits = self.area().validate()?;
        check(self.radio, Field::CellId, self.cell, &limits.cell)?;
        match (self.unit, &limits.unit) {
            (None, _) => Ok(()),
            (Some(unit), Some(range)) => check(self.radio, Field::Unit, unit.into(), range),
            (Some(_), None) => Err(IdentifierFault::Unexpected {
                radio: self.radio,
                field: Field::Unit,
            }),
        }
    }

    fn sort_key(&self) -> (RadioType, u16, u16, u32, u64, bool, u16) {
        (
            self.radio,
            self.mcc,
            self.mnc,
            self.area,
            self.cell,
            self.unit.is_none(),
            self.unit.unwrap_or_default(),
        )
    }
}

impl Ord for CellIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for CellIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CellIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.radio, self.mcc, self.mnc, self.area, self.cell
        )?;
        if let Some(unit) = self.unit {
            write!(f, "/{unit}")?;
        }
        Ok(())
    }
}

/// Identity of the area (LAC/TAC) containing one or more cells.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize,
)]
pub struct CellAreaIdentifier {
    pub radio: RadioType,
    pub mcc: u16,
    pub mnc: u16,
    pub area: u32,
}

impl CellAreaIdentifier {
    fn validate(&self) -> Result<Limits, IdentifierFault> {
        let limits = Limits::of(self.radio).ok_or(IdentifierFault::NotCellular(self.radio))?;
        check(self.radio, Field::Mcc, self.mcc.into(), &MCC)?;
        check(self.radio, Field::Mnc, self.mnc.into(), &MNC)?;
        check(self.radio, Field::AreaCode, self.area.into(), &limits.area)?;
        Ok(limits)
    }
}

impl fmt::Display for CellAreaIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.radio, self.mcc, self.mnc, self.area)
    }
}

macro_rules! key_type {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; $len]);

        impl $name {
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn to_base64(&self) -> String {
                STANDARD.encode(self.0)
            }

            pub fn from_base64(text: &str) -> Result<Self> {
                let bytes = STANDARD
                    .decode(text.trim())
                    .map_err(|e| KeyFault::Text(e.to_string()))?;
                Self::try_from(bytes.as_slice())
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = crate::Error;

            fn try_from(bytes: &[u8]) -> Result<Self> {
                let array = <[u8; $len]>::try_from(bytes).map_err(|_| KeyFault::Length {
                    expected: $len,
                    actual: bytes.len(),
                })?;
                Ok(Self(array))
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_base64())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_base64())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_base64())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                Self::from_base64(&text).map_err(de::Error::custom)
            }
        }
    };
}

key_type!(
    /// Fixed-width, order-preserving storage key of a [`CellIdentifier`].
    EncodedCellId,
    CELL_KEY_LEN
);

key_type!(
    /// Storage key of a [`CellAreaIdentifier`]; a byte prefix of every
    /// [`EncodedCellId`] in the area.
    CellAreaKey,
    AREA_KEY_LEN
);

impl EncodedCellId {
    /// Radio generation named by the tag byte.
    pub fn radio(&self) -> Result<RadioType> {
        key_radio(&self.0)
    }

    pub fn area_key(&self) -> CellAreaKey {
        let mut prefix = [0; AREA_KEY_LEN];
        prefix.copy_from_slice(&self.0[..AREA_KEY_LEN]);
        CellAreaKey(prefix)
    }
}

impl CellAreaKey {
    pub fn radio(&self) -> Result<RadioType> {
        key_radio(&self.0)
    }

    pub fn contains(&self, cell: &EncodedCellId) -> bool {
        cell.as_bytes().starts_with(&self.0)
    }
}

fn write_area(out: &mut [u8], id: &CellAreaIdentifier, tag: u8) {
    out[0] = KEY_VERSION;
    out[1] = tag;
    out[2..4].copy_from_slice(&id.mcc.to_be_bytes());
    out[4..6].copy_from_slice(&id.mnc.to_be_bytes());
    out[6..10].copy_from_slice(&id.area.to_be_bytes());
}

fn key_radio(bytes: &[u8]) -> Result<RadioType> {
    if bytes[0] != KEY_VERSION {
        return Err(KeyFault::Version(bytes[0]).into());
    }
    let radio = RadioType::from_cell_tag(bytes[1]).ok_or(KeyFault::RadioTag(bytes[1]))?;
    Ok(radio)
}

fn read_area(bytes: &[u8]) -> Result<CellAreaIdentifier> {
    let radio = key_radio(bytes)?;
    Ok(CellAreaIdentifier {
        radio,
        mcc: u16::from_be_bytes([bytes[2], bytes[3]]),
        mnc: u16::from_be_bytes([bytes[4], bytes[5]]),
        area: u32::from_be_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]),
    })
}

pub fn encode_cellid(id: &CellIdentifier) -> Result<EncodedCellId> {
    id.validate()?;
    let tag = id
        .radio
        .cell_tag()
        .ok_or(IdentifierFault::NotCellular(id.radio))?;

    let mut key = [0; CELL_KEY_LEN];
    write_area(&mut key, &id.area(), tag);
    key[10..18].copy_from_slice(&id.cell.to_be_bytes());
    key[18..20].copy_from_slice(&id.unit.unwrap_or(UNIT_ABSENT).to_be_bytes());
    Ok(EncodedCellId(key))
}

pub fn decode_cellid(key: &EncodedCellId) -> Result<CellIdentifier> {
    let bytes = key.as_bytes();
    let area = read_area(bytes)?;

    let mut cell = [0; 8];
    cell.copy_from_slice(&bytes[10..18]);
    let unit = match u16::from_be_bytes([bytes[18], bytes[19]]) {
        UNIT_ABSENT => None,
        x => Some(x),
    };

    let id = CellIdentifier {
        radio: area.radio,
        mcc: area.mcc,
        mnc: area.mnc,
        area: area.area,
        cell: u64::from_be_bytes(cell),
        unit,
    };
    id.validate().map_err(KeyFault::Field)?;
    Ok(id)
}

pub fn encode_cellarea(id: &CellAreaIdentifier) -> Result<CellAreaKey> {
    id.validate()?;
    let tag = id
        .radio
        .cell_tag()
        .ok_or(IdentifierFault::NotCellular(id.radio))?;

    let mut key = [0; AREA_KEY_LEN];
    write_area(&mut key, id, tag);
    Ok(CellAreaKey(key))
}

pub fn decode_cellarea(key: &CellAreaKey) -> Result<CellAreaIdentifier> {
    let id = read_area(key.as_bytes())?;
    id.validate().map_err(KeyFault::Field)?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;
    use crate::Error;

    fn gsm(mcc: u16, mnc: u16, area: u32, cell: u64) -> CellIdentifier {
        CellIdentifier::new(RadioType::Gsm, mcc, mnc, area, cell)
    }

    #[test]
    fn example_cell() {
        let id = gsm(310, 410, 2000, 12345);
        let key = encode_cellid(&id).unwrap();
        assert_eq!(decode_cellid(&key).unwrap(), id);

        let same_area = encode_cellid(&gsm(310, 410, 2000, 99)).unwrap();
        let other_area = encode_cellid(&gsm(310, 410, 2001, 12345)).unwrap();
        assert_eq!(key.area_key(), same_area.area_key());
        assert_ne!(key.area_key(), other_area.area_key());
        assert_eq!(key.area_key(), encode_cellarea(&id.area()).unwrap());
    }

    #[test]
    fn layout() {
        let id = CellIdentifier::new(RadioType::Lte, 262, 1, 0x1234, 0x0abc_def0).with_unit(42);
        let key = encode_cellid(&id).unwrap();
        assert_eq!(
            key.as_bytes(),
            [
                1, 3, 0x01, 0x06, 0x00, 0x01, 0x00, 0x00, 0x12, 0x34, 0, 0, 0, 0, 0x0a, 0xbc,
                0xde, 0xf0, 0x00, 42
            ]
        );

        let key = encode_cellid(&gsm(1, 1, 1, 1)).unwrap();
        assert_eq!(&key.as_bytes()[18..], [0xff, 0xff]);
    }

    #[test]
    fn edge_codes() {
        let id = gsm(0, 0, 1, 1);
        let key = encode_cellid(&id).unwrap();
        assert_eq!(decode_cellid(&key).unwrap(), id);

        let err = encode_cellid(&gsm(1000, 1, 1, 1)).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidIdentifier(IdentifierFault::OutOfRange {
                field: Field::Mcc,
                value: 1000,
                ..
            })
        ));
    }

    #[rstest]
    #[case::gsm_cell_too_wide(gsm(310, 410, 2000, 65_536))]
    #[case::gsm_no_unit(gsm(310, 410, 2000, 1).with_unit(3))]
    #[case::reserved_lac(gsm(310, 410, 65_534, 1))]
    #[case::zero_lac(gsm(310, 410, 0, 1))]
    #[case::zero_cell(gsm(310, 410, 1, 0))]
    #[case::mnc_four_digits(gsm(310, 1000, 1, 1))]
    #[case::lte_pci(CellIdentifier::new(RadioType::Lte, 1, 1, 1, 1).with_unit(504))]
    #[case::umts_psc(CellIdentifier::new(RadioType::Umts, 1, 1, 1, 1).with_unit(512))]
    #[case::lte_tac_24bit(CellIdentifier::new(RadioType::Lte, 1, 1, 70_000, 1))]
    #[case::wifi(CellIdentifier::new(RadioType::Wifi, 1, 1, 1, 1))]
    #[case::unknown(CellIdentifier::new(RadioType::Unknown, 1, 1, 1, 1))]
    fn rejects(#[case] id: CellIdentifier) {
        assert!(matches!(encode_cellid(&id), Err(Error::InvalidIdentifier(_))));
    }

    #[test]
    fn nr_widths() {
        let id = CellIdentifier::new(RadioType::Nr, 440, 10, 0xff_fffd, 0x0f_ffff_ffff)
            .with_unit(1007);
        let key = encode_cellid(&id).unwrap();
        assert_eq!(decode_cellid(&key).unwrap(), id);
    }

    #[test]
    fn malformed() {
        let key = encode_cellid(&gsm(310, 410, 2000, 12345)).unwrap();
        let mut bytes = key.as_bytes().to_vec();

        bytes[1] = 1;
        let err = decode_cellid(&EncodedCellId::try_from(bytes.as_slice()).unwrap());
        assert_eq!(err, Err(Error::MalformedKey(KeyFault::RadioTag(1))));
        let err = EncodedCellId::try_from(bytes.as_slice()).unwrap().radio();
        assert_eq!(err, Err(Error::MalformedKey(KeyFault::RadioTag(1))));

        bytes[1] = 0;
        bytes[0] = 2;
        let err = decode_cellid(&EncodedCellId::try_from(bytes.as_slice()).unwrap());
        assert_eq!(err, Err(Error::MalformedKey(KeyFault::Version(2))));

        // gsm key with a unit written into it
        bytes[0] = KEY_VERSION;
        bytes[19] = 7;
        let err = decode_cellid(&EncodedCellId::try_from(bytes.as_slice()).unwrap());
        assert!(matches!(err, Err(Error::MalformedKey(KeyFault::Field(_)))));

        let err = EncodedCellId::try_from(&bytes[..19]);
        assert_eq!(
            err,
            Err(Error::MalformedKey(KeyFault::Length {
                expected: CELL_KEY_LEN,
                actual: 19
            }))
        );
    }

    #[test]
    fn text_form() {
        let key = encode_cellid(&gsm(310, 410, 2000, 12345)).unwrap();
        let text = key.to_base64();
        assert_eq!(EncodedCellId::from_base64(&text).unwrap(), key);
        assert_eq!(key.to_string(), text);

        let json = serde_json::to_string(&key.area_key()).unwrap();
        let back: CellAreaKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key.area_key());

        assert!(matches!(
            EncodedCellId::from_base64("not base64!"),
            Err(Error::MalformedKey(KeyFault::Text(_)))
        ));
    }

    #[test]
    fn area_roundtrip() {
        let area = gsm(310, 410, 2000, 1).area();
        let key = encode_cellarea(&area).unwrap();
        assert_eq!(decode_cellarea(&key).unwrap(), area);
        assert_eq!(key.radio(), Ok(RadioType::Gsm));
        assert!(key.contains(&encode_cellid(&gsm(310, 410, 2000, 7)).unwrap()));
        assert!(!key.contains(&encode_cellid(&gsm(310, 411, 2000, 7)).unwrap()));
    }

    #[test]
    fn absent_unit_sorts_last() {
        let a = CellIdentifier::new(RadioType::Lte, 1, 1, 1, 1).with_unit(503);
        let b = CellIdentifier::new(RadioType::Lte, 1, 1, 1, 1);
        assert!(a < b);
        assert!(encode_cellid(&a).unwrap() < encode_cellid(&b).unwrap());
    }

    fn cell_identifier() -> impl Strategy<Value = CellIdentifier> {
        prop_oneof![
            Just(RadioType::Gsm),
            Just(RadioType::Umts),
            Just(RadioType::Lte),
            Just(RadioType::Nr),
        ]
        .prop_flat_map(|radio| {
            let limits = Limits::of(radio).unwrap();
            let unit = match limits.unit {
                Some(range) => proptest::option::of(range.prop_map(|x| x as u16)).boxed(),
                None => Just(None).boxed(),
            };
            (
                Just(radio),
                MCC.prop_map(|x| x as u16),
                MNC.prop_map(|x| x as u16),
                limits.area.prop_map(|x| x as u32),
                limits.cell,
                unit,
            )
        })
        .prop_map(|(radio, mcc, mnc, area, cell, unit)| CellIdentifier {
            radio,
            mcc,
            mnc,
            area,
            cell,
            unit,
        })
    }

    proptest! {
        #[test]
        fn roundtrip(id in cell_identifier()) {
            let key = encode_cellid(&id).unwrap();
            prop_assert_eq!(decode_cellid(&key).unwrap(), id);
        }

        #[test]
        fn order_preserved(a in cell_identifier(), b in cell_identifier()) {
            let (ka, kb) = (encode_cellid(&a).unwrap(), encode_cellid(&b).unwrap());
            prop_assert_eq!(a.cmp(&b), ka.cmp(&kb));
        }

        #[test]
        fn area_is_prefix(id in cell_identifier()) {
            let key = encode_cellid(&id).unwrap();
            let area = encode_cellarea(&id.area()).unwrap();
            prop_assert!(key.as_bytes().starts_with(area.as_bytes()));
            prop_assert_eq!(decode_cellarea(&area).unwrap(), id.area());
        }
    }
}
