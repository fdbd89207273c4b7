//! Elliptical array layout
//!
//! N antennas at evenly spaced angles around an ellipse in the xy plane. Angles
//! run counter-clockwise from `start_angle`; the default π/2 puts element 1 on
//! +y, above the array center. Each element is rotated about z by its angle, so
//! the conductor normal points radially outward, then translated onto the ellipse:
//!
//! ```text
//! θᵢ = start + 2π·i/N        x = (W/2)·cos θᵢ        y = (H/2)·sin θᵢ
//! ```
//!
//! Building the same array twice yields two independent groups with the same
//! label. Callers replacing an array clear the old one first
//! ([`crate::clear_by_label`]).

use crate::dipole::{self, AntennaInstance, AntennaSpec};
use crate::model::{Aabb, ModelStore, Transform};
use crate::{require_positive, EntityId, GeometryError, Result, Vec3};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, TAU};
use tracing::{debug, info};

pub const DEFAULT_START_ANGLE: f64 = FRAC_PI_2;
pub const DEFAULT_ARRAY_WIDTH: f64 = 240.0;
pub const DEFAULT_ARRAY_HEIGHT: f64 = 300.0;

pub const SPACER_GROUP_LABEL: &str = "Spacer Group";
pub const BOUNDING_BOX_LABEL: &str = "Bounding Box";

/// Rotation axis of the array (the bore direction)
pub fn array_normal() -> Vec3 {
    Vec3::z()
}

/// Where one element sits on the ellipse
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrayPlacement {
    /// 1-based position in the array
    pub index: usize,
    /// Heading angle (rad), also the rotation applied about z
    pub angle: f64,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EllipseLayout {
    pub count: usize,
    /// Full extent along x (mm)
    pub width: f64,
    /// Full extent along y (mm)
    pub height: f64,
    pub start_angle: f64,
}

impl EllipseLayout {
    pub fn new(count: usize, width: f64, height: f64) -> Result<Self> {
        let layout = Self {
            count,
            width,
            height,
            start_angle: DEFAULT_START_ANGLE,
        };
        layout.validate()?;
        Ok(layout)
    }

    pub fn with_start_angle(mut self, start_angle: f64) -> Result<Self> {
        self.start_angle = start_angle;
        self.validate()?;
        Ok(self)
    }

    /// Fields are public, so layouts built by hand or deserialized are checked here
    pub fn validate(&self) -> Result<()> {
        if self.count == 0 {
            return Err(GeometryError::Configuration(
                "array needs at least one element".to_string(),
            ));
        }
        require_positive("array width", self.width)?;
        require_positive("array height", self.height)?;
        if !self.start_angle.is_finite() {
            return Err(GeometryError::Configuration(format!(
                "start angle must be finite, got {}",
                self.start_angle
            )));
        }
        Ok(())
    }

    pub fn angular_spacing(&self) -> f64 {
        TAU / self.count as f64
    }

    pub fn angles(&self) -> Vec<f64> {
        (0..self.count)
            .map(|i| self.start_angle + self.angular_spacing() * i as f64)
            .collect()
    }

    pub fn placements(&self) -> Vec<ArrayPlacement> {
        self.angles()
            .into_iter()
            .enumerate()
            .map(|(i, angle)| ArrayPlacement {
                index: i + 1,
                angle,
                x: self.width / 2.0 * angle.cos(),
                y: self.height / 2.0 * angle.sin(),
            })
            .collect()
    }
}

/// Support block behind each element (mm)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpacerSpec {
    /// Along the array axis (z)
    pub length: f64,
    /// Tangential to the ellipse
    pub width: f64,
    /// Radial thickness, extending inward from the antenna plane
    pub height: f64,
}

impl Default for SpacerSpec {
    fn default() -> Self {
        Self {
            length: 300.0,
            width: 100.0,
            height: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayElement {
    pub instance: AntennaInstance,
    pub placement: ArrayPlacement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntennaArray {
    pub name: String,
    pub group: EntityId,
    pub spec: AntennaSpec,
    pub layout: EllipseLayout,
    pub elements: Vec<ArrayElement>,
    /// One spacer per element once [`AntennaArray::add_spacers`] ran
    pub spacers: Vec<EntityId>,
    pub spacer_group: Option<EntityId>,
    pub bounding_box: Option<EntityId>,
}

/// Default label for an array of `spec`'s kind
pub fn default_array_name(spec: &AntennaSpec) -> String {
    format!("{} Array", spec.kind.display_name())
}

/// Lay out `n` antennas on a `width` × `height` ellipse, element 1 at π/2
pub fn layout(
    model: &mut dyn ModelStore,
    n: usize,
    spec: &AntennaSpec,
    width: f64,
    height: f64,
) -> Result<AntennaArray> {
    let layout = EllipseLayout::new(n, width, height)?;
    AntennaArray::build(model, &default_array_name(spec), &layout, spec)
}

impl AntennaArray {
    pub fn build(
        model: &mut dyn ModelStore,
        name: &str,
        layout: &EllipseLayout,
        spec: &AntennaSpec,
    ) -> Result<Self> {
        layout.validate()?;
        spec.validate()?;
        let group = model.create_group(name);
        let mut elements = Vec::with_capacity(layout.count);

        for placement in layout.placements() {
            let instance = dipole::build(model, spec)?;
            let label = format!("{} {}", spec.kind.display_name(), placement.index);
            model.set_label(instance.group, &label)?;
            place(model, instance.group, &placement)?;
            model.add_to_group(group, instance.group)?;
            debug!(
                "Placed {} at ({:.2}, {:.2}) heading {:.4} rad",
                label, placement.x, placement.y, placement.angle
            );
            elements.push(ArrayElement {
                instance,
                placement,
            });
        }

        info!(
            "Created: ellipse array '{}' with {} '{}' elements",
            name,
            elements.len(),
            spec.kind
        );

        Ok(Self {
            name: name.to_string(),
            group,
            spec: spec.clone(),
            layout: layout.clone(),
            elements,
            spacers: Vec::new(),
            spacer_group: None,
            bounding_box: None,
        })
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// One spacer per element, rotated like its antenna and reaching inward from it
    pub fn add_spacers(&mut self, model: &mut dyn ModelStore, spacer: &SpacerSpec) -> Result<()> {
        require_positive("spacer length", spacer.length)?;
        require_positive("spacer width", spacer.width)?;
        require_positive("spacer height", spacer.height)?;
        if self.spacer_group.is_some() {
            return Err(GeometryError::Configuration(format!(
                "array '{}' already has spacers",
                self.name
            )));
        }

        let group = model.create_group(SPACER_GROUP_LABEL);
        for element in &self.elements {
            let block = model.block(
                Vec3::new(-spacer.height, -spacer.width / 2.0, -spacer.length / 2.0),
                Vec3::new(0.0, spacer.width / 2.0, spacer.length / 2.0),
            );
            model.set_label(block, &format!("Spacer {}", element.placement.index))?;
            place(model, block, &element.placement)?;
            model.add_to_group(group, block)?;
            self.spacers.push(block);
        }
        self.spacer_group = Some(group);
        info!("Added {} spacers to '{}'", self.spacers.len(), self.name);
        Ok(())
    }

    /// Block enclosing the array and its spacers, grown by `margin` on every side
    pub fn add_bounding_box(&mut self, model: &mut dyn ModelStore, margin: f64) -> Result<EntityId> {
        if !(margin.is_finite() && margin >= 0.0) {
            return Err(GeometryError::Configuration(format!(
                "bounding margin must be non-negative, got {}",
                margin
            )));
        }
        let mut extent: Option<Aabb> = model.bounds(self.group)?;
        if let Some(spacers) = self.spacer_group {
            if let Some(b) = model.bounds(spacers)? {
                extent = Some(match extent {
                    Some(e) => e.union(&b),
                    None => b,
                });
            }
        }
        let extent = extent
            .ok_or_else(|| GeometryError::Configuration(format!("array '{}' is empty", self.name)))?
            .expanded(margin);

        let bbox = model.block(extent.min, extent.max);
        model.set_label(bbox, BOUNDING_BOX_LABEL)?;
        self.bounding_box = Some(bbox);
        Ok(bbox)
    }
}

fn place(model: &mut dyn ModelStore, id: EntityId, placement: &ArrayPlacement) -> Result<()> {
    model.apply_transform(
        id,
        Transform::Rotation {
            axis: array_normal(),
            angle: placement.angle,
        },
    )?;
    model.apply_transform(id, Transform::Translation(Vec3::new(placement.x, placement.y, 0.0)))
}
