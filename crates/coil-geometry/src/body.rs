//! Reference body (phantom) helpers

use crate::layout::AntennaArray;
use crate::model::{ModelStore, Transform};
use crate::{require_positive, EntityId, GeometryError, Result, Vec3};
use tracing::info;

pub const PHANTOM_LABEL: &str = "phantom";

/// Corners of the default block phantom (mm)
pub fn default_phantom_corners() -> (Vec3, Vec3) {
    (
        Vec3::new(-520.0, -250.0, -250.0),
        Vec3::new(-20.0, 250.0, 250.0),
    )
}

/// Return the existing `phantom` body, or create a block phantom between `p0` and `p1`
pub fn ensure_box_phantom(model: &mut dyn ModelStore, p0: Vec3, p1: Vec3) -> Result<EntityId> {
    if let Some(existing) = model.find(PHANTOM_LABEL) {
        return Ok(existing);
    }
    let phantom = model.block(p0, p1);
    model.set_label(phantom, PHANTOM_LABEL)?;
    info!("Created block phantom {}", phantom);
    Ok(phantom)
}

/// Scale an entity uniformly about the center of its bounding box
pub fn scale_entity(model: &mut dyn ModelStore, id: EntityId, factor: f64) -> Result<()> {
    require_positive("scale factor", factor)?;
    let center = model
        .bounds(id)?
        .ok_or_else(|| GeometryError::Configuration(format!("{} has no extent to scale", id)))?
        .center();
    model.apply_transform(id, Transform::Translation(-center))?;
    model.apply_transform(id, Transform::Scaling(factor))?;
    model.apply_transform(id, Transform::Translation(center))?;
    info!("Scaled {} by {}", id, factor);
    Ok(())
}

/// Fail when the body's bounding box reaches any conductor of `array`
pub fn ensure_clear_of_array(
    model: &dyn ModelStore,
    body: EntityId,
    array: &AntennaArray,
) -> Result<()> {
    let Some(body_bounds) = model.bounds(body)? else {
        return Ok(());
    };
    for element in &array.elements {
        let Some(conductor) = model.bounds(element.instance.conductor)? else {
            continue;
        };
        if body_bounds.intersection(&conductor).is_some() {
            return Err(GeometryError::Configuration(format!(
                "'{}' overlaps element {} of '{}' at ({:.1}, {:.1})",
                model.label(body)?,
                element.placement.index,
                array.name,
                element.placement.x,
                element.placement.y
            )));
        }
    }
    Ok(())
}
