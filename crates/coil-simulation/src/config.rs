//! Simulation configuration

use crate::lumped::LumpedValue;
use crate::{Result, SimulationError};
use coil_geometry::EntityId;
use serde::{Deserialize, Serialize};

/// FDTD execution kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKernel {
    Software,
    #[default]
    Cuda,
    Acceleware,
}

/// Step and resolution of one manual grid region (mm), applied on all three axes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridRegion {
    pub max_step_mm: f64,
    pub resolution_mm: f64,
}

impl GridRegion {
    /// Coarse grid over the reference body and bounding region
    pub fn body() -> Self {
        Self {
            max_step_mm: 5.0,
            resolution_mm: 10.0,
        }
    }

    /// Fine grid around each conductor
    pub fn antenna() -> Self {
        Self {
            max_step_mm: 1.0,
            resolution_mm: 0.05,
        }
    }
}

fn default_duration() -> f64 {
    500.0
}

fn default_body_grid() -> GridRegion {
    GridRegion::body()
}

fn default_antenna_grid() -> GridRegion {
    GridRegion::antenna()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Overrides the generated "{array} simulation at {f}MHz" name
    #[serde(default)]
    pub name: Option<String>,
    pub frequency_mhz: u32,
    /// Simulation length in periods of the center frequency
    #[serde(default = "default_duration")]
    pub duration_periods: f64,
    #[serde(default)]
    pub kernel: SolverKernel,
    #[serde(default = "default_body_grid")]
    pub body_grid: GridRegion,
    #[serde(default = "default_antenna_grid")]
    pub antenna_grid: GridRegion,
    /// Reference body receiving tissue material
    #[serde(default)]
    pub body: Option<EntityId>,
    #[serde(default)]
    pub bounding_region: Option<EntityId>,
    /// Applied to the gap segments of Lumped antennas
    #[serde(default)]
    pub lumped: Option<LumpedValue>,
}

impl SimulationConfig {
    pub fn new(frequency_mhz: u32) -> Self {
        Self {
            name: None,
            frequency_mhz,
            duration_periods: default_duration(),
            kernel: SolverKernel::default(),
            body_grid: GridRegion::body(),
            antenna_grid: GridRegion::antenna(),
            body: None,
            bounding_region: None,
            lumped: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_body(mut self, body: EntityId) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_bounding_region(mut self, region: EntityId) -> Self {
        self.bounding_region = Some(region);
        self
    }

    pub fn with_lumped(mut self, value: Option<LumpedValue>) -> Self {
        self.lumped = value;
        self
    }

    pub fn with_kernel(mut self, kernel: SolverKernel) -> Self {
        self.kernel = kernel;
        self
    }

    /// Duration and grid sizes must be finite and strictly positive
    pub fn validate(&self) -> Result<()> {
        require_positive("duration in periods", self.duration_periods)?;
        let regions = [("body grid", &self.body_grid), ("antenna grid", &self.antenna_grid)];
        for (what, region) in regions {
            require_positive(&format!("{} step", what), region.max_step_mm)?;
            require_positive(&format!("{} resolution", what), region.resolution_mm)?;
        }
        Ok(())
    }
}

fn require_positive(what: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimulationError::Configuration(format!(
            "{} must be positive, got {}",
            what, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::new(298);
        assert_eq!(config.duration_periods, 500.0);
        assert_eq!(config.kernel, SolverKernel::Cuda);
        assert_eq!(config.body_grid.max_step_mm, 5.0);
        assert_eq!(config.antenna_grid.resolution_mm, 0.05);
        assert!(config.body.is_none() && config.lumped.is_none());
    }

    #[test]
    fn test_builder_methods() {
        let config = SimulationConfig::new(596)
            .with_name("custom")
            .with_body(EntityId(3))
            .with_kernel(SolverKernel::Software);
        assert_eq!(config.name.as_deref(), Some("custom"));
        assert_eq!(config.body, Some(EntityId(3)));
        assert_eq!(config.kernel, SolverKernel::Software);
    }

    #[test]
    fn test_duration_must_be_positive() {
        assert!(SimulationConfig::new(298).validate().is_ok());
        for duration in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            let mut config = SimulationConfig::new(298);
            config.duration_periods = duration;
            assert!(matches!(
                config.validate(),
                Err(SimulationError::Configuration(_))
            ));
        }

        let mut config = SimulationConfig::new(298);
        config.antenna_grid.resolution_mm = 0.0;
        assert!(config.validate().is_err());
    }
}
