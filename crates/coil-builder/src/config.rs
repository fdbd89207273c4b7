//! Experiment configuration

use coil_geometry::body::default_phantom_corners;
use coil_geometry::layout::{DEFAULT_ARRAY_HEIGHT, DEFAULT_ARRAY_WIDTH};
use coil_geometry::{AntennaKind, AntennaSpec, SpacerSpec, Vec3};
use coil_simulation::SolverKernel;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ELEMENT_COUNT: usize = 8;
pub const DEFAULT_ANTENNA_LENGTH: f64 = 350.0;
pub const DEFAULT_FREQUENCY_MHZ: u32 = 298;

fn default_count() -> usize {
    DEFAULT_ELEMENT_COUNT
}

fn default_antenna() -> AntennaSpec {
    AntennaSpec::new(AntennaKind::Fractionated, DEFAULT_ANTENNA_LENGTH)
}

fn default_width() -> f64 {
    DEFAULT_ARRAY_WIDTH
}

fn default_height() -> f64 {
    DEFAULT_ARRAY_HEIGHT
}

fn default_frequencies() -> Vec<u32> {
    vec![DEFAULT_FREQUENCY_MHZ]
}

fn default_duration() -> f64 {
    500.0
}

fn default_scale() -> f64 {
    1.0
}

fn default_corner_min() -> [f64; 3] {
    let (min, _) = default_phantom_corners();
    [min.x, min.y, min.z]
}

fn default_corner_max() -> [f64; 3] {
    let (_, max) = default_phantom_corners();
    [max.x, max.y, max.z]
}

/// Block phantom created when the model has none
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhantomConfig {
    #[serde(default = "default_corner_min")]
    pub corner_min: [f64; 3],
    #[serde(default = "default_corner_max")]
    pub corner_max: [f64; 3],
    /// Uniform scale applied once after creation, e.g. 0.95 for 5% smaller
    #[serde(default = "default_scale")]
    pub scale: f64,
}

impl PhantomConfig {
    pub fn corners(&self) -> (Vec3, Vec3) {
        (
            Vec3::from(self.corner_min),
            Vec3::from(self.corner_max),
        )
    }
}

impl Default for PhantomConfig {
    fn default() -> Self {
        Self {
            corner_min: default_corner_min(),
            corner_max: default_corner_max(),
            scale: default_scale(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Array label; defaults to "{kind} Dipole Array"
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_count")]
    pub count: usize,
    #[serde(default = "default_antenna")]
    pub antenna: AntennaSpec,
    #[serde(default = "default_width")]
    pub array_width: f64,
    #[serde(default = "default_height")]
    pub array_height: f64,
    /// Angle of element 1 in degrees; 90 when absent
    #[serde(default)]
    pub start_angle_deg: Option<f64>,
    #[serde(default)]
    pub spacers: Option<SpacerSpec>,
    /// Margin of the bounding box around the array (mm); no box when absent
    #[serde(default)]
    pub bounding_margin: Option<f64>,
    #[serde(default)]
    pub phantom: Option<PhantomConfig>,
    #[serde(default = "default_frequencies")]
    pub frequencies_mhz: Vec<u32>,
    /// Lumped values such as "5pF"; one simulation per value and frequency
    #[serde(default)]
    pub lumped_values: Vec<String>,
    /// Labels removed from the model before building
    #[serde(default)]
    pub clear: Vec<String>,
    #[serde(default = "default_duration")]
    pub duration_periods: f64,
    #[serde(default)]
    pub kernel: SolverKernel,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            name: None,
            count: default_count(),
            antenna: default_antenna(),
            array_width: default_width(),
            array_height: default_height(),
            start_angle_deg: None,
            spacers: None,
            bounding_margin: None,
            phantom: None,
            frequencies_mhz: default_frequencies(),
            lumped_values: Vec::new(),
            clear: Vec::new(),
            duration_periods: default_duration(),
            kernel: SolverKernel::default(),
        }
    }
}
