//! Experiment runner

use crate::config::ExperimentConfig;
use crate::Result;
use coil_geometry::body::{ensure_box_phantom, ensure_clear_of_array, scale_entity, PHANTOM_LABEL};
use coil_geometry::layout::default_array_name;
use coil_geometry::{
    clear_by_label, AntennaArray, AntennaKind, EllipseLayout, EntityId, InMemoryModel,
    ModelStore,
};
use coil_simulation::{
    lumped, InMemorySession, LumpedValue, SimulationBinder, SimulationConfig,
    SimulationHandle, SolverSession,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// What one run built
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub array: AntennaArray,
    pub phantom: Option<EntityId>,
    pub simulations: Vec<SimulationHandle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub element_count: usize,
    pub simulation_count: usize,
    pub entity_count: usize,
    pub generated_at: String,
}

/// A run against the in-memory model and session, ready to snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    pub config: ExperimentConfig,
    pub summary: RunSummary,
    pub model: InMemoryModel,
    pub session: InMemorySession,
    pub metadata: RunMetadata,
}

/// Run an experiment on a fresh in-memory model and session
pub fn run(config: &ExperimentConfig) -> Result<RunOutput> {
    let mut model = InMemoryModel::new();
    let mut session = InMemorySession::new();
    let summary = run_with(&mut model, &mut session, config)?;

    let metadata = RunMetadata {
        element_count: summary.array.len(),
        simulation_count: summary.simulations.len(),
        entity_count: model.len(),
        generated_at: chrono::Utc::now().to_rfc3339(),
    };
    Ok(RunOutput {
        config: config.clone(),
        summary,
        model,
        session,
        metadata,
    })
}

/// Build the array once, then bind one simulation per (frequency, lumped value)
pub fn run_with(
    model: &mut dyn ModelStore,
    session: &mut dyn SolverSession,
    config: &ExperimentConfig,
) -> Result<RunSummary> {
    // lumped values are checked before the model is touched
    let lumped_values = lumped_sweep(config)?;

    for label in &config.clear {
        let removed = clear_by_label(model, label)?;
        if removed == 0 {
            info!("Nothing to clear for '{}'", label);
        }
    }

    let phantom = match &config.phantom {
        Some(phantom) => {
            let existed = model.find(PHANTOM_LABEL).is_some();
            let (p0, p1) = phantom.corners();
            let id = ensure_box_phantom(model, p0, p1)?;
            // only a freshly created phantom is scaled
            if !existed && phantom.scale != 1.0 {
                scale_entity(model, id, phantom.scale)?;
            }
            Some(id)
        }
        None => None,
    };

    let mut layout = EllipseLayout::new(config.count, config.array_width, config.array_height)?;
    if let Some(degrees) = config.start_angle_deg {
        layout = layout.with_start_angle(degrees.to_radians())?;
    }
    let name = config
        .name
        .clone()
        .unwrap_or_else(|| default_array_name(&config.antenna));
    let mut array = AntennaArray::build(model, &name, &layout, &config.antenna)?;
    if let Some(body) = phantom {
        ensure_clear_of_array(&*model, body, &array)?;
    }

    if let Some(spacers) = &config.spacers {
        array.add_spacers(model, spacers)?;
    }
    let bounding_region = match config.bounding_margin {
        Some(margin) => Some(array.add_bounding_box(model, margin)?),
        None => None,
    };

    let binder = SimulationBinder::with_defaults();
    let mut simulations = Vec::new();
    for &frequency in &config.frequencies_mhz {
        for value in &lumped_values {
            let mut sim = SimulationConfig::new(frequency)
                .with_kernel(config.kernel)
                .with_lumped(*value);
            sim.duration_periods = config.duration_periods;
            sim.body = phantom;
            sim.bounding_region = bounding_region;
            simulations.push(binder.bind(&*model, session, &array, &sim)?);
        }
    }

    info!(
        "Run complete: '{}' with {} elements, {} simulations",
        array.name,
        array.len(),
        simulations.len()
    );
    Ok(RunSummary {
        array,
        phantom,
        simulations,
    })
}

/// Lumped values to sweep; a single `None` when the config lists none
fn lumped_sweep(config: &ExperimentConfig) -> Result<Vec<Option<LumpedValue>>> {
    if config.lumped_values.is_empty() {
        return Ok(vec![None]);
    }
    if config.antenna.kind != AntennaKind::Lumped {
        warn!(
            "Lumped values only apply to lumped dipoles; '{}' antennas will ignore them",
            config.antenna.kind
        );
    }
    config
        .lumped_values
        .iter()
        .map(|raw| -> Result<Option<LumpedValue>> { Ok(Some(lumped::parse(raw)?)) })
        .collect()
}
