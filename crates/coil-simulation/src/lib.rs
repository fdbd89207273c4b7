//! Coil Simulation Library
//!
//! Turns a built [`coil_geometry::AntennaArray`] into a multiport FDTD simulation:
//! perfect-conductor material on every conductor, one edge port and sensor per
//! antenna, lumped elements on gap segments, tissue material on the reference
//! body and explicit grid regions.
//!
//! The solver is reached only through the [`SolverSession`] seam. The
//! [`InMemorySession`] records every setting for inspection.
//!
//! # Supported Frequencies
//!
//! Tissue properties come from a closed table keyed by Larmor frequency. A
//! frequency outside the table is an error; no interpolation is attempted.
//!
//! | MHz | σ (S/m) | εr | Field |
//! |-----|---------|----|-------|
//! | 298 | 0.552035 | 51.954693 | 7T proton |
//! | 596 | 0.66 | 47.52 | 14T proton |
//! | 241 | 0.46 | 38.0 | 14T phosphorus |

use coil_geometry::{EntityId, GeometryError};
use thiserror::Error;

pub mod binder;
pub mod config;
pub mod lumped;
pub mod materials;
pub mod session;

pub use binder::{bind, SimulationBinder, SimulationHandle};
pub use config::{GridRegion, SimulationConfig, SolverKernel};
pub use lumped::{ElementKind, LumpedValue};
pub use materials::{MaterialTable, TissueEntry, TissueProperties};
pub use session::{
    InMemorySession, MaterialKind, Setting, SettingId, SettingRecord, SimulationId,
    SimulationRecord, SolverSession,
};

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("Unsupported frequency: {0} MHz")]
    UnknownFrequency(u32),
    #[error("Invalid lumped value: {0}")]
    InvalidUnit(String),
    #[error("Entity not found: {0}")]
    MissingEntity(EntityId),
    #[error("Simulation not found: {0}")]
    UnknownSimulation(SimulationId),
    #[error("No setting named {0:?}")]
    MissingSetting(String),
    #[error("Invalid simulation config: {0}")]
    Configuration(String),
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),
}

pub type Result<T> = std::result::Result<T, SimulationError>;
