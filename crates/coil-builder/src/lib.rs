//! Coil Array Builder
//!
//! One parameterized entry point for building a dipole array and its multiport
//! simulations from an [`ExperimentConfig`]:
//!
//! ```text
//! clear → phantom → layout → spacers → bounding box → bind per (frequency, lumped value)
//! ```
//!
//! The runner drives any [`coil_geometry::ModelStore`] and
//! [`coil_simulation::SolverSession`]; [`runner::run`] uses the in-memory ones and
//! returns them for snapshotting.

use coil_geometry::GeometryError;
use coil_simulation::SimulationError;
use thiserror::Error;

pub mod config;
pub mod loader;
pub mod runner;

pub use config::{ExperimentConfig, PhantomConfig};
pub use runner::{run, run_with, RunMetadata, RunOutput, RunSummary};

#[derive(Error, Debug)]
pub enum BuilderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),
    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),
}

pub type Result<T> = std::result::Result<T, BuilderError>;
