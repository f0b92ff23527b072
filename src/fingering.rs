//! Fingering tables
//!
//! Each table maps a MIDI pitch to what the performer does for it: which
//! valves or keys are pressed, which hand shapes are shown, or which slide
//! positions can play it. Tables are JSON, keyed by instrument name.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use log::info;
use serde::Deserialize;
use smallvec::SmallVec;

use crate::error::{Error, Result};

/// Tables shipped with the crate
const BUILTIN_TABLES: &str = include_str!("../assets/fingerings.json");

/// Trombone slide positions
pub const SLIDE_POSITIONS: std::ops::RangeInclusive<u8> = 1..=7;

/// Indices of pressed keys
pub type KeySet = SmallVec<[u8; 4]>;
/// Slide positions able to play a pitch
pub type SlideSet = SmallVec<[u8; 4]>;

/// Left and right hand shape indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HandPair {
    pub left: u8,
    pub right: u8,
}

/// Pitch to pressed keys
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyTable {
    pub key_count: usize,
    pub notes: BTreeMap<u8, KeySet>,
}

impl KeyTable {
    /// Pressed keys for `pitch`, `None` when the pitch is not playable
    pub fn keys(&self, pitch: u8) -> Option<&KeySet> {
        self.notes.get(&pitch)
    }
}

/// Pitch to hand shapes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandTable {
    pub left_count: u8,
    pub right_count: u8,
    pub notes: BTreeMap<u8, HandPair>,
}

impl HandTable {
    pub fn hands(&self, pitch: u8) -> Option<HandPair> {
        self.notes.get(&pitch).copied()
    }
}

/// Pitch to candidate slide positions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlideTable {
    pub notes: BTreeMap<u8, SlideSet>,
}

impl SlideTable {
    pub fn positions(&self, pitch: u8) -> Option<&[u8]> {
        self.notes.get(&pitch).map(|set| set.as_slice())
    }

    pub fn insert(&mut self, pitch: u8, positions: SlideSet) {
        self.notes.insert(pitch, positions);
    }
}

/// One instrument's table
#[derive(Debug, Clone, PartialEq)]
pub enum FingeringTable {
    PressedKeys(KeyTable),
    Hands(HandTable),
    Slide(SlideTable),
}

/// Table as written in JSON, pitches still as strings
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RawTable {
    PressedKeys {
        key_count: usize,
        notes: BTreeMap<String, KeySet>,
    },
    Hands {
        left_count: u8,
        right_count: u8,
        notes: BTreeMap<String, HandPair>,
    },
    Slide {
        notes: BTreeMap<String, SlideSet>,
    },
}

impl RawTable {
    fn resolve(self, instrument: &str) -> Result<FingeringTable> {
        let table = match self {
            RawTable::PressedKeys { key_count, notes } => FingeringTable::PressedKeys(KeyTable {
                key_count,
                notes: parse_pitches(instrument, notes)?,
            }),
            RawTable::Hands {
                left_count,
                right_count,
                notes,
            } => FingeringTable::Hands(HandTable {
                left_count,
                right_count,
                notes: parse_pitches(instrument, notes)?,
            }),
            RawTable::Slide { notes } => FingeringTable::Slide(SlideTable {
                notes: parse_pitches(instrument, notes)?,
            }),
        };
        table.validate(instrument)?;
        Ok(table)
    }
}

fn parse_pitches<V>(instrument: &str, notes: BTreeMap<String, V>) -> Result<BTreeMap<u8, V>> {
    notes
        .into_iter()
        .map(|(key, value)| match key.trim().parse::<u8>() {
            Ok(pitch) if pitch <= 127 => Ok((pitch, value)),
            _ => Err(Error::table(instrument, format!("invalid pitch {:?}", key))),
        })
        .collect()
}

impl FingeringTable {
    fn kind_name(&self) -> &'static str {
        match self {
            FingeringTable::PressedKeys(_) => "pressed_keys",
            FingeringTable::Hands(_) => "hands",
            FingeringTable::Slide(_) => "slide",
        }
    }

    /// Reject entries that point outside the instrument
    fn validate(&self, instrument: &str) -> Result<()> {
        match self {
            FingeringTable::PressedKeys(table) => {
                for (pitch, keys) in &table.notes {
                    if let Some(key) = keys.iter().find(|&&k| k as usize >= table.key_count) {
                        return Err(Error::table(
                            instrument,
                            format!(
                                "pitch {} presses key {} of {}",
                                pitch, key, table.key_count
                            ),
                        ));
                    }
                }
            }
            FingeringTable::Hands(table) => {
                for (pitch, hands) in &table.notes {
                    if hands.left >= table.left_count || hands.right >= table.right_count {
                        return Err(Error::table(
                            instrument,
                            format!("pitch {} uses a missing hand shape", pitch),
                        ));
                    }
                }
            }
            FingeringTable::Slide(table) => {
                for (pitch, positions) in &table.notes {
                    if positions.is_empty() {
                        return Err(Error::table(
                            instrument,
                            format!("pitch {} has no slide position", pitch),
                        ));
                    }
                    if let Some(p) = positions.iter().find(|p| !SLIDE_POSITIONS.contains(p)) {
                        return Err(Error::table(
                            instrument,
                            format!("pitch {} uses slide position {}", pitch, p),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Every loaded table, by instrument name
#[derive(Debug, Clone, Default)]
pub struct FingeringTables {
    tables: HashMap<String, FingeringTable>,
}

impl FingeringTables {
    /// Tables shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_TABLES)
    }

    /// Parse and validate tables from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: HashMap<String, RawTable> = serde_json::from_str(json)?;
        let tables = raw
            .into_iter()
            .map(|(name, table)| table.resolve(&name).map(|t| (name, t)))
            .collect::<Result<HashMap<_, _>>>()?;
        info!("Loaded {} fingering tables", tables.len());
        Ok(Self { tables })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn insert(&mut self, instrument: impl Into<String>, table: FingeringTable) -> Result<()> {
        let instrument = instrument.into();
        table.validate(&instrument)?;
        self.tables.insert(instrument, table);
        Ok(())
    }

    pub fn get(&self, instrument: &str) -> Option<&FingeringTable> {
        self.tables.get(instrument)
    }

    fn require(&self, instrument: &str) -> Result<&FingeringTable> {
        self.get(instrument)
            .ok_or_else(|| Error::MissingTable(instrument.to_string()))
    }

    /// Pressed-key table for `instrument`
    pub fn key_table(&self, instrument: &str) -> Result<&KeyTable> {
        match self.require(instrument)? {
            FingeringTable::PressedKeys(table) => Ok(table),
            other => Err(wrong_kind(instrument, "pressed_keys", other)),
        }
    }

    /// Hand-shape table for `instrument`
    pub fn hand_table(&self, instrument: &str) -> Result<&HandTable> {
        match self.require(instrument)? {
            FingeringTable::Hands(table) => Ok(table),
            other => Err(wrong_kind(instrument, "hands", other)),
        }
    }

    /// Slide table for `instrument`
    pub fn slide_table(&self, instrument: &str) -> Result<&SlideTable> {
        match self.require(instrument)? {
            FingeringTable::Slide(table) => Ok(table),
            other => Err(wrong_kind(instrument, "slide", other)),
        }
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

fn wrong_kind(instrument: &str, expected: &str, found: &FingeringTable) -> Error {
    Error::table(
        instrument,
        format!("expected a {} table, found {}", expected, found.kind_name()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_load() {
        let tables = FingeringTables::builtin().unwrap();
        let trumpet = tables.key_table("trumpet").unwrap();
        assert_eq!(trumpet.key_count, 3);
        assert!(trumpet.keys(60).unwrap().is_empty());
        assert_eq!(trumpet.keys(64).unwrap().as_slice(), &[0, 1]);

        let trombone = tables.slide_table("trombone").unwrap();
        assert_eq!(trombone.positions(53), Some(&[1, 6][..]));

        let flute = tables.hand_table("flute").unwrap();
        assert!(flute.hands(72).is_some());
    }

    #[test]
    fn test_missing_table() {
        let tables = FingeringTables::builtin().unwrap();
        assert!(matches!(
            tables.key_table("bagpipes"),
            Err(Error::MissingTable(name)) if name == "bagpipes"
        ));
    }

    #[test]
    fn test_wrong_kind() {
        let tables = FingeringTables::builtin().unwrap();
        assert!(matches!(tables.key_table("trombone"), Err(Error::Table { .. })));
    }

    #[test]
    fn test_malformed_json_is_fatal() {
        let result = FingeringTables::from_json_str("{\"trumpet\": {\"kind\": \"pressed_keys\"");
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_key_out_of_range_rejected() {
        let json = r#"{"trumpet": {"kind": "pressed_keys", "key_count": 3, "notes": {"60": [0, 3]}}}"#;
        let result = FingeringTables::from_json_str(json);
        assert!(matches!(result, Err(Error::Table { instrument, .. }) if instrument == "trumpet"));
    }

    #[test]
    fn test_slide_position_range_rejected() {
        let json = r#"{"trombone": {"kind": "slide", "notes": {"46": [0]}}}"#;
        assert!(FingeringTables::from_json_str(json).is_err());
    }

    #[test]
    fn test_bad_pitch_key_rejected() {
        let json = r#"{"trumpet": {"kind": "pressed_keys", "key_count": 3, "notes": {"c4": [0]}}}"#;
        assert!(matches!(FingeringTables::from_json_str(json), Err(Error::Table { .. })));
    }

    #[test]
    fn test_hand_shape_range_rejected() {
        let json = r#"{"flute": {"kind": "hands", "left_count": 2, "right_count": 2, "notes": {"72": {"left": 1, "right": 2}}}}"#;
        assert!(FingeringTables::from_json_str(json).is_err());
    }
}
