//! Solver session seam
//!
//! A session owns simulations; a simulation owns named settings, each scoped to a
//! set of model entities. Every new simulation starts with the solver's default
//! [`AUTOMATIC_GRID`] and [`AUTOMATIC_VOXELER`] settings, as the real solver does.

use crate::config::SolverKernel;
use crate::lumped::LumpedValue;
use crate::{Result, SimulationError};
use coil_geometry::EntityId;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Default grid setting present on every new simulation
pub const AUTOMATIC_GRID: &str = "Automatic";
/// Default voxeler setting present on every new simulation
pub const AUTOMATIC_VOXELER: &str = "Automatic Voxeler Settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimulationId(pub u64);

impl fmt::Display for SimulationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sim-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SettingId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MaterialKind {
    /// Perfect electric conductor
    Pec,
    Dielectric {
        conductivity: f64,
        relative_permittivity: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Setting {
    Material { material: MaterialKind },
    EdgePort { center_frequency_hz: f64 },
    EdgeSensor,
    FieldSensor,
    LumpedElement { value: LumpedValue },
    ManualGrid {
        max_step_mm: [f64; 3],
        resolution_mm: [f64; 3],
    },
    AutomaticGrid,
    AutomaticVoxeler,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingRecord {
    pub id: SettingId,
    pub name: String,
    pub setting: Setting,
    pub entities: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub id: SimulationId,
    pub name: String,
    pub duration_periods: Option<f64>,
    pub kernel: Option<SolverKernel>,
    pub settings: Vec<SettingRecord>,
    pub materials_updated: bool,
    pub grid_updated: bool,
    pub registered: bool,
}

impl SimulationRecord {
    pub fn setting(&self, name: &str) -> Option<&SettingRecord> {
        self.settings.iter().find(|s| s.name == name)
    }

    pub fn settings_of<'a>(
        &'a self,
        matches: impl Fn(&Setting) -> bool + 'a,
    ) -> impl Iterator<Item = &'a SettingRecord> + 'a {
        self.settings.iter().filter(move |s| matches(&s.setting))
    }
}

/// The solver capability consumed by the binder
pub trait SolverSession {
    fn create_multiport(&mut self, name: &str) -> SimulationId;

    fn set_duration(&mut self, sim: SimulationId, periods: f64) -> Result<()>;

    fn set_kernel(&mut self, sim: SimulationId, kernel: SolverKernel) -> Result<()>;

    /// Add a new named setting scoped to `entities`
    fn add_setting(
        &mut self,
        sim: SimulationId,
        name: &str,
        setting: Setting,
        entities: &[EntityId],
    ) -> Result<SettingId>;

    fn find_setting(&self, sim: SimulationId, name: &str) -> Result<Option<SettingId>>;

    /// Add entities to an existing setting, skipping ones already present
    fn extend_setting(
        &mut self,
        sim: SimulationId,
        setting: SettingId,
        entities: &[EntityId],
    ) -> Result<()>;

    fn remove_setting(&mut self, sim: SimulationId, name: &str) -> Result<()>;

    fn update_materials(&mut self, sim: SimulationId) -> Result<()>;

    fn update_grid(&mut self, sim: SimulationId) -> Result<()>;

    /// Make the simulation part of the active document
    fn register(&mut self, sim: SimulationId) -> Result<()>;

    /// Extend the setting called `name`, creating it first if absent
    fn merge_setting(
        &mut self,
        sim: SimulationId,
        name: &str,
        setting: Setting,
        entities: &[EntityId],
    ) -> Result<SettingId> {
        match self.find_setting(sim, name)? {
            Some(existing) => {
                self.extend_setting(sim, existing, entities)?;
                Ok(existing)
            }
            None => self.add_setting(sim, name, setting, entities),
        }
    }
}

/// Recording session for tests and offline snapshots
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemorySession {
    simulations: Vec<SimulationRecord>,
    next_setting: u64,
}

impl InMemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn simulations(&self) -> &[SimulationRecord] {
        &self.simulations
    }

    pub fn simulation(&self, sim: SimulationId) -> Result<&SimulationRecord> {
        self.simulations
            .iter()
            .find(|s| s.id == sim)
            .ok_or(SimulationError::UnknownSimulation(sim))
    }

    /// Simulations carrying `name`, oldest first
    pub fn find_by_name(&self, name: &str) -> Vec<SimulationId> {
        self.simulations
            .iter()
            .filter(|s| s.name == name)
            .map(|s| s.id)
            .collect()
    }

    fn simulation_mut(&mut self, sim: SimulationId) -> Result<&mut SimulationRecord> {
        self.simulations
            .iter_mut()
            .find(|s| s.id == sim)
            .ok_or(SimulationError::UnknownSimulation(sim))
    }

    fn allocate_setting(&mut self) -> SettingId {
        self.next_setting += 1;
        SettingId(self.next_setting)
    }
}

impl SolverSession for InMemorySession {
    fn create_multiport(&mut self, name: &str) -> SimulationId {
        let id = SimulationId(self.simulations.len() as u64 + 1);
        let grid = self.allocate_setting();
        let voxeler = self.allocate_setting();
        self.simulations.push(SimulationRecord {
            id,
            name: name.to_string(),
            duration_periods: None,
            kernel: None,
            settings: vec![
                SettingRecord {
                    id: grid,
                    name: AUTOMATIC_GRID.to_string(),
                    setting: Setting::AutomaticGrid,
                    entities: Vec::new(),
                },
                SettingRecord {
                    id: voxeler,
                    name: AUTOMATIC_VOXELER.to_string(),
                    setting: Setting::AutomaticVoxeler,
                    entities: Vec::new(),
                },
            ],
            materials_updated: false,
            grid_updated: false,
            registered: false,
        });
        debug!("Created multiport simulation {} '{}'", id, name);
        id
    }

    fn set_duration(&mut self, sim: SimulationId, periods: f64) -> Result<()> {
        self.simulation_mut(sim)?.duration_periods = Some(periods);
        Ok(())
    }

    fn set_kernel(&mut self, sim: SimulationId, kernel: SolverKernel) -> Result<()> {
        self.simulation_mut(sim)?.kernel = Some(kernel);
        Ok(())
    }

    fn add_setting(
        &mut self,
        sim: SimulationId,
        name: &str,
        setting: Setting,
        entities: &[EntityId],
    ) -> Result<SettingId> {
        // validate before allocating so a bad id leaves the counter alone
        self.simulation_mut(sim)?;
        let id = self.allocate_setting();
        self.simulation_mut(sim)?.settings.push(SettingRecord {
            id,
            name: name.to_string(),
            setting,
            entities: entities.to_vec(),
        });
        Ok(id)
    }

    fn find_setting(&self, sim: SimulationId, name: &str) -> Result<Option<SettingId>> {
        Ok(self.simulation(sim)?.setting(name).map(|s| s.id))
    }

    fn extend_setting(
        &mut self,
        sim: SimulationId,
        setting: SettingId,
        entities: &[EntityId],
    ) -> Result<()> {
        let record = self
            .simulation_mut(sim)?
            .settings
            .iter_mut()
            .find(|s| s.id == setting)
            .ok_or_else(|| SimulationError::MissingSetting(format!("{:?}", setting)))?;
        for entity in entities {
            if !record.entities.contains(entity) {
                record.entities.push(*entity);
            }
        }
        Ok(())
    }

    fn remove_setting(&mut self, sim: SimulationId, name: &str) -> Result<()> {
        let settings = &mut self.simulation_mut(sim)?.settings;
        let position = settings
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| SimulationError::MissingSetting(name.to_string()))?;
        settings.remove(position);
        Ok(())
    }

    fn update_materials(&mut self, sim: SimulationId) -> Result<()> {
        self.simulation_mut(sim)?.materials_updated = true;
        Ok(())
    }

    fn update_grid(&mut self, sim: SimulationId) -> Result<()> {
        self.simulation_mut(sim)?.grid_updated = true;
        Ok(())
    }

    fn register(&mut self, sim: SimulationId) -> Result<()> {
        self.simulation_mut(sim)?.registered = true;
        Ok(())
    }
}
