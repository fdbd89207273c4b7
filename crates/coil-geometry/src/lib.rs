//! Coil Geometry Library
//!
//! Parametric dipole construction and elliptical array layout for MRI RF-coil
//! models. All solid modeling goes through the [`ModelStore`] seam, so the same
//! builders drive a real CAD kernel or the deterministic [`InMemoryModel`].
//!
//! # Coordinate Convention
//!
//! | Axis | Meaning |
//! |------|---------|
//! | z    | Antenna long axis and array normal (bore direction) |
//! | y    | Conductor width |
//! | x    | Conductor thickness; rotated onto the outward radial direction by the layout |
//!
//! All lengths are millimeters, all angles radians.

use thiserror::Error;

pub mod body;
pub mod dipole;
pub mod layout;
pub mod model;

pub use dipole::{AntennaBuilder, AntennaInstance, AntennaKind, AntennaSpec};
pub use layout::{AntennaArray, ArrayElement, ArrayPlacement, EllipseLayout, SpacerSpec};
pub use model::{clear_by_label, Aabb, EntityId, InMemoryModel, ModelStore, Shape, Transform};

/// Three-component vector in model space (millimeters).
pub type Vec3 = nalgebra::Vector3<f64>;

#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Unknown antenna kind: {0}")]
    UnknownAntennaKind(String),
    #[error("Entity not found: {0}")]
    MissingEntity(EntityId),
    #[error("No entity labelled {0:?}")]
    MissingLabel(String),
}

pub type Result<T> = std::result::Result<T, GeometryError>;

/// Fail with [`GeometryError::Configuration`] unless `value` is finite and strictly positive.
pub(crate) fn require_positive(what: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GeometryError::Configuration(format!(
            "{} must be positive, got {}",
            what, value
        )))
    }
}
