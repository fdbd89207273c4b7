//! Tissue material table
//!
//! Maps a simulation frequency to the dielectric properties of the reference
//! body at that frequency. The table is closed: supporting a new frequency means
//! adding an entry, never interpolating between existing ones.

use crate::{Result, SimulationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TissueProperties {
    /// S/m
    pub conductivity: f64,
    pub relative_permittivity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TissueEntry {
    pub frequency_mhz: u32,
    /// Field strength and nucleus this frequency is the Larmor frequency of
    pub field_label: String,
    pub properties: TissueProperties,
}

/// Frequency (MHz) to tissue properties
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialTable {
    pub entries: BTreeMap<u32, TissueEntry>,
}

impl MaterialTable {
    /// Create new empty table
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Create table with the built-in head tissue values
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.load_default_data();
        table
    }

    pub fn load_default_data(&mut self) {
        self.add(298, "7T proton", 0.552035, 51.954693);
        self.add(596, "14T proton", 0.66, 47.52);
        self.add(241, "14T phosphorus", 0.46, 38.0);
    }

    /// Add or replace the entry for `frequency_mhz`
    pub fn add(
        &mut self,
        frequency_mhz: u32,
        field_label: &str,
        conductivity: f64,
        relative_permittivity: f64,
    ) {
        self.entries.insert(
            frequency_mhz,
            TissueEntry {
                frequency_mhz,
                field_label: field_label.to_string(),
                properties: TissueProperties {
                    conductivity,
                    relative_permittivity,
                },
            },
        );
    }

    pub fn get(&self, frequency_mhz: u32) -> Result<&TissueEntry> {
        self.entries
            .get(&frequency_mhz)
            .ok_or(SimulationError::UnknownFrequency(frequency_mhz))
    }

    /// Supported frequencies, ascending
    pub fn frequencies(&self) -> Vec<u32> {
        self.entries.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = MaterialTable::with_defaults();
        assert_eq!(table.frequencies(), vec![241, 298, 596]);

        let proton = table.get(298).unwrap();
        assert_eq!(proton.properties.conductivity, 0.552035);
        assert_eq!(proton.properties.relative_permittivity, 51.954693);
        assert_eq!(proton.field_label, "7T proton");

        assert_eq!(table.get(241).unwrap().field_label, "14T phosphorus");
    }

    #[test]
    fn test_unknown_frequency_is_an_error() {
        let table = MaterialTable::with_defaults();
        // between two entries, still not interpolated
        assert!(matches!(
            table.get(400),
            Err(SimulationError::UnknownFrequency(400))
        ));
        assert!(MaterialTable::new().get(298).is_err());
    }

    #[test]
    fn test_add_extends_table() {
        let mut table = MaterialTable::with_defaults();
        table.add(128, "3T proton", 0.47, 60.0);
        assert_eq!(table.get(128).unwrap().properties.relative_permittivity, 60.0);
        assert_eq!(table.entries.len(), 4);
    }
}
