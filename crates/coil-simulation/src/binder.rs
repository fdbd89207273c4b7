//! Simulation binding
//!
//! Binding is not idempotent: every call creates a new simulation, even under a
//! name that already exists. Callers replacing a simulation remove the old one
//! first. Entity handles are checked before anything is created, but a solver
//! failure part way through leaves the partially configured simulation behind.

use crate::config::{GridRegion, SimulationConfig};
use crate::materials::{MaterialTable, TissueEntry};
use crate::session::{
    MaterialKind, Setting, SettingId, SimulationId, SolverSession, AUTOMATIC_GRID,
    AUTOMATIC_VOXELER,
};
use crate::{Result, SimulationError};
use coil_geometry::{AntennaArray, AntennaKind, EntityId, ModelStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const PEC_SETTING: &str = "PEC";
pub const BODY_MATERIAL_SETTING: &str = "phantom";
pub const GAP_SENSOR_SETTING: &str = "Gap Sensors";
pub const LUMPED_ELEMENT_SETTING: &str = "Lumped Elements";
pub const BODY_GRID_SETTING: &str = "phantom_grid";
pub const FIELD_SENSOR_SETTING: &str = "Overall Field Sensor";

/// What a successful bind produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationHandle {
    pub id: SimulationId,
    pub name: String,
    /// One edge port per antenna, in array order
    pub ports: Vec<SettingId>,
    pub tissue: TissueEntry,
}

#[derive(Debug, Clone)]
pub struct SimulationBinder {
    pub table: MaterialTable,
}

impl Default for SimulationBinder {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Bind with the built-in material table
pub fn bind(
    model: &dyn ModelStore,
    session: &mut dyn SolverSession,
    array: &AntennaArray,
    config: &SimulationConfig,
) -> Result<SimulationHandle> {
    SimulationBinder::with_defaults().bind(model, session, array, config)
}

/// Generated simulation name: array name, frequency and lumped value if any
pub fn simulation_name(array: &AntennaArray, config: &SimulationConfig) -> String {
    if let Some(name) = &config.name {
        return name.clone();
    }
    let mut name = format!("{} simulation at {}MHz", array.name, config.frequency_mhz);
    if let Some(value) = config.lumped {
        name.push_str(&format!(" {}", value));
    }
    name
}

fn manual_grid(region: &GridRegion) -> Setting {
    Setting::ManualGrid {
        max_step_mm: [region.max_step_mm; 3],
        resolution_mm: [region.resolution_mm; 3],
    }
}

impl SimulationBinder {
    pub fn new(table: MaterialTable) -> Self {
        Self { table }
    }

    pub fn with_defaults() -> Self {
        Self::new(MaterialTable::with_defaults())
    }

    pub fn bind(
        &self,
        model: &dyn ModelStore,
        session: &mut dyn SolverSession,
        array: &AntennaArray,
        config: &SimulationConfig,
    ) -> Result<SimulationHandle> {
        config.validate()?;
        let tissue = self.table.get(config.frequency_mhz)?.clone();
        check_entities(model, array, config)?;

        let name = simulation_name(array, config);
        let sim = session.create_multiport(&name);
        session.set_duration(sim, config.duration_periods)?;

        if let Some(body) = config.body {
            session.add_setting(
                sim,
                BODY_MATERIAL_SETTING,
                Setting::Material {
                    material: MaterialKind::Dielectric {
                        conductivity: tissue.properties.conductivity,
                        relative_permittivity: tissue.properties.relative_permittivity,
                    },
                },
                &[body],
            )?;
        }

        let center_frequency_hz = f64::from(config.frequency_mhz) * 1e6;
        let mut ports = Vec::with_capacity(array.len());
        let mut voxeled: Vec<EntityId> = Vec::new();

        for element in &array.elements {
            let antenna = &element.instance;
            let i = element.placement.index;

            session.merge_setting(
                sim,
                PEC_SETTING,
                Setting::Material {
                    material: MaterialKind::Pec,
                },
                &[antenna.conductor],
            )?;
            ports.push(session.add_setting(
                sim,
                &format!("Edge Port {}", i),
                Setting::EdgePort {
                    center_frequency_hz,
                },
                &[antenna.source],
            )?);
            session.add_setting(
                sim,
                &format!("Edge Sensor {}", i),
                Setting::EdgeSensor,
                &[antenna.source],
            )?;

            if antenna.kind == AntennaKind::Lumped {
                session.merge_setting(sim, GAP_SENSOR_SETTING, Setting::EdgeSensor, &antenna.gaps)?;
                if let Some(value) = config.lumped {
                    session.merge_setting(
                        sim,
                        LUMPED_ELEMENT_SETTING,
                        Setting::LumpedElement { value },
                        &antenna.gaps,
                    )?;
                }
            }

            let parts = antenna.parts();
            session.add_setting(
                sim,
                &format!("antenna_grid {}", i),
                manual_grid(&config.antenna_grid),
                &parts,
            )?;
            voxeled.extend(parts);
            debug!("Bound antenna {} to {}", i, sim);
        }

        session.remove_setting(sim, AUTOMATIC_GRID)?;
        let coarse: Vec<EntityId> = config.body.into_iter().chain(config.bounding_region).collect();
        if !coarse.is_empty() {
            session.add_setting(sim, BODY_GRID_SETTING, manual_grid(&config.body_grid), &coarse)?;
        }
        if let Some(region) = config.bounding_region {
            session.add_setting(sim, FIELD_SENSOR_SETTING, Setting::FieldSensor, &[region])?;
        }
        voxeled.extend(coarse);

        let voxeler = session
            .find_setting(sim, AUTOMATIC_VOXELER)?
            .ok_or_else(|| SimulationError::MissingSetting(AUTOMATIC_VOXELER.to_string()))?;
        session.extend_setting(sim, voxeler, &voxeled)?;

        session.set_kernel(sim, config.kernel)?;
        session.update_materials(sim)?;
        session.update_grid(sim)?;
        session.register(sim)?;

        info!(
            "Created: simulation '{}' with {} ports ({})",
            name,
            ports.len(),
            tissue.field_label
        );
        Ok(SimulationHandle {
            id: sim,
            name,
            ports,
            tissue,
        })
    }
}

/// Every handle the bind will touch must still exist in the model
fn check_entities(
    model: &dyn ModelStore,
    array: &AntennaArray,
    config: &SimulationConfig,
) -> Result<()> {
    let parts = array.elements.iter().flat_map(|e| e.instance.parts());
    for id in parts.chain(config.body).chain(config.bounding_region) {
        model
            .label(id)
            .map_err(|_| SimulationError::MissingEntity(id))?;
    }
    Ok(())
}
