//! Lumped element values
//!
//! Written as `<number><unit>` with unit `pF` or `nH`, e.g. `"20nH"` or `"0.5pF"`,
//! and held in SI base units.

use crate::{Result, SimulationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Capacitor,
    Inductor,
}

impl ElementKind {
    pub fn unit(&self) -> &'static str {
        match self {
            ElementKind::Capacitor => "pF",
            ElementKind::Inductor => "nH",
        }
    }

    /// Divisor from the written unit to farads or henries
    pub fn scale(&self) -> f64 {
        match self {
            ElementKind::Capacitor => 1e12,
            ElementKind::Inductor => 1e9,
        }
    }

    fn from_unit(unit: &str) -> Option<Self> {
        match unit {
            "pF" => Some(ElementKind::Capacitor),
            "nH" => Some(ElementKind::Inductor),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LumpedValue {
    pub kind: ElementKind,
    /// Farads or henries
    pub magnitude: f64,
}

impl LumpedValue {
    pub fn capacitor(farads: f64) -> Self {
        Self {
            kind: ElementKind::Capacitor,
            magnitude: farads,
        }
    }

    pub fn inductor(henries: f64) -> Self {
        Self {
            kind: ElementKind::Inductor,
            magnitude: henries,
        }
    }
}

/// Parse a value such as `"5pF"`; the last two characters select the kind
pub fn parse(raw: &str) -> Result<LumpedValue> {
    let invalid = || SimulationError::InvalidUnit(raw.to_string());

    let split = raw.len().checked_sub(2).ok_or_else(invalid)?;
    let (number, unit) = match (raw.get(..split), raw.get(split..)) {
        (Some(number), Some(unit)) => (number, unit),
        _ => return Err(invalid()),
    };
    let kind = ElementKind::from_unit(unit).ok_or_else(invalid)?;
    let written: f64 = number.trim().parse().map_err(|_| invalid())?;
    if !written.is_finite() {
        return Err(invalid());
    }

    Ok(LumpedValue {
        kind,
        magnitude: written / kind.scale(),
    })
}

/// `None` means no lumped element, which is not a parse failure
pub fn parse_optional(raw: Option<&str>) -> Result<Option<LumpedValue>> {
    raw.map(parse).transpose()
}

impl FromStr for LumpedValue {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self> {
        parse(s)
    }
}

impl fmt::Display for LumpedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // round away representation noise from the unit conversion
        let written = (self.magnitude * self.kind.scale() * 1e6).round() / 1e6;
        write!(f, "{}{}", written, self.kind.unit())
    }
}
