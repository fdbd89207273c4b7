//! Solid-modeling seam
//!
//! [`ModelStore`] is the capability the builders are handed explicitly instead of
//! reaching for an ambient CAD document. Entities are addressed by [`EntityId`]
//! handles returned at creation time; labels are display text only and may repeat.
//!
//! [`InMemoryModel`] is a small CSG kernel: it keeps one shape tree per entity, an
//! accumulated homogeneous transform, and answers bounding-box and point-membership
//! queries. Boolean operations consume their operands, as a CAD kernel does.

use crate::{GeometryError, Result, Vec3};
use nalgebra::{Matrix4, Point3, Rotation3, Translation3, Unit};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

/// Tolerance for inclusive membership tests (mm)
const EPS: f64 = 1e-9;

/// Opaque handle for an entity in a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_corners(a: &Vec3, b: &Vec3) -> Self {
        Self {
            min: a.inf(b),
            max: a.sup(b),
        }
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    pub fn intersection(&self, other: &Aabb) -> Option<Aabb> {
        let min = self.min.sup(&other.min);
        let max = self.max.inf(&other.max);
        if (0..3).all(|i| min[i] <= max[i] + EPS) {
            Some(Aabb { min, max })
        } else {
            None
        }
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) / 2.0
    }

    pub fn expanded(&self, margin: f64) -> Aabb {
        let m = Vec3::repeat(margin);
        Aabb {
            min: self.min - m,
            max: self.max + m,
        }
    }

    /// Box enclosing all eight transformed corners
    pub fn transformed(&self, matrix: &Matrix4<f64>) -> Aabb {
        let mut out: Option<Aabb> = None;
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            let p = matrix.transform_point(&Point3::from(corner)).coords;
            let b = Aabb { min: p, max: p };
            out = Some(match out {
                Some(acc) => acc.union(&b),
                None => b,
            });
        }
        out.unwrap_or(*self)
    }
}

/// Constructive solid geometry tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Shape {
    /// Rectangular block spanned by two opposite corners (any order)
    Block { p0: Vec3, p1: Vec3 },
    /// Annular cylinder; `axis` gives direction and length
    Tube {
        origin: Vec3,
        axis: Vec3,
        outer_radius: f64,
        inner_radius: f64,
    },
    /// Open polyline; has no volume
    PolyLine { points: Vec<Vec3> },
    Union(Vec<Shape>),
    Subtract { base: Box<Shape>, tools: Vec<Shape> },
    Intersect(Vec<Shape>),
    /// A consumed operand that carried its own transform
    Transformed {
        matrix: Matrix4<f64>,
        shape: Box<Shape>,
    },
}

impl Shape {
    pub fn contains(&self, p: &Vec3) -> bool {
        match self {
            Shape::Block { p0, p1 } => {
                (0..3).all(|i| p[i] >= p0[i].min(p1[i]) - EPS && p[i] <= p0[i].max(p1[i]) + EPS)
            }
            Shape::Tube {
                origin,
                axis,
                outer_radius,
                inner_radius,
            } => {
                let len = axis.norm();
                if len == 0.0 {
                    return false;
                }
                let dir = axis / len;
                let rel = p - origin;
                let t = rel.dot(&dir);
                if t < -EPS || t > len + EPS {
                    return false;
                }
                let radial = (rel - dir * t).norm();
                radial >= inner_radius - EPS && radial <= outer_radius + EPS
            }
            Shape::PolyLine { .. } => false,
            Shape::Union(parts) => parts.iter().any(|s| s.contains(p)),
            Shape::Subtract { base, tools } => {
                base.contains(p) && !tools.iter().any(|t| t.contains(p))
            }
            Shape::Intersect(parts) => !parts.is_empty() && parts.iter().all(|s| s.contains(p)),
            Shape::Transformed { matrix, shape } => match matrix.try_inverse() {
                Some(inv) => shape.contains(&inv.transform_point(&Point3::from(*p)).coords),
                None => false,
            },
        }
    }

    /// Conservative bounds; subtraction keeps the base box
    pub fn bounds(&self) -> Option<Aabb> {
        match self {
            Shape::Block { p0, p1 } => Some(Aabb::from_corners(p0, p1)),
            Shape::Tube {
                origin,
                axis,
                outer_radius,
                ..
            } => {
                let len = axis.norm();
                if len == 0.0 {
                    return None;
                }
                let dir = axis / len;
                let reach = dir.map(|a| outer_radius * (1.0 - a * a).max(0.0).sqrt());
                let end = origin + axis;
                Some(Aabb {
                    min: origin.inf(&end) - reach,
                    max: origin.sup(&end) + reach,
                })
            }
            Shape::PolyLine { points } => points
                .iter()
                .map(|p| Aabb { min: *p, max: *p })
                .reduce(|a, b| a.union(&b)),
            Shape::Union(parts) => parts
                .iter()
                .filter_map(Shape::bounds)
                .reduce(|a, b| a.union(&b)),
            Shape::Subtract { base, .. } => base.bounds(),
            Shape::Intersect(parts) => {
                let mut acc: Option<Aabb> = None;
                for part in parts {
                    let b = part.bounds()?;
                    acc = match acc {
                        Some(a) => Some(a.intersection(&b)?),
                        None => Some(b),
                    };
                }
                acc
            }
            Shape::Transformed { matrix, shape } => shape.bounds().map(|b| b.transformed(matrix)),
        }
    }
}

/// Rigid (and uniform scaling) transforms applicable to any entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Transform {
    Rotation { axis: Vec3, angle: f64 },
    Translation(Vec3),
    /// Uniform scaling about the model origin
    Scaling(f64),
}

impl Transform {
    pub fn to_homogeneous(&self) -> Matrix4<f64> {
        match self {
            Transform::Rotation { axis, angle } => {
                Rotation3::from_axis_angle(&Unit::new_normalize(*axis), *angle).to_homogeneous()
            }
            Transform::Translation(v) => Translation3::from(*v).to_homogeneous(),
            Transform::Scaling(factor) => Matrix4::new_scaling(*factor),
        }
    }
}

/// The solid-modeling capability consumed by the builders
pub trait ModelStore {
    /// Register a primitive solid or polyline
    fn create_solid(&mut self, shape: Shape) -> EntityId;

    /// Union of the operands; operands are consumed and the result takes the first label
    fn unite(&mut self, operands: &[EntityId]) -> Result<EntityId>;

    /// `base` minus every tool; all operands are consumed
    fn subtract(&mut self, base: EntityId, tools: &[EntityId]) -> Result<EntityId>;

    /// Intersection of the operands; operands are consumed
    fn intersect(&mut self, operands: &[EntityId]) -> Result<EntityId>;

    fn create_group(&mut self, label: &str) -> EntityId;

    /// Move `child` under `group`, detaching it from any previous group
    fn add_to_group(&mut self, group: EntityId, child: EntityId) -> Result<()>;

    fn set_label(&mut self, id: EntityId, label: &str) -> Result<()>;

    fn label(&self, id: EntityId) -> Result<&str>;

    /// Apply a transform; groups propagate it to every descendant
    fn apply_transform(&mut self, id: EntityId, transform: Transform) -> Result<()>;

    /// Every entity carrying `label`, oldest first
    fn find_all(&self, label: &str) -> Vec<EntityId>;

    /// World-space bounds; `None` for empty groups or degenerate shapes
    fn bounds(&self, id: EntityId) -> Result<Option<Aabb>>;

    /// Delete an entity and, for groups, all descendants
    fn delete(&mut self, id: EntityId) -> Result<()>;

    fn find(&self, label: &str) -> Option<EntityId> {
        self.find_all(label).into_iter().next()
    }

    fn block(&mut self, p0: Vec3, p1: Vec3) -> EntityId {
        self.create_solid(Shape::Block { p0, p1 })
    }

    fn tube(&mut self, origin: Vec3, axis: Vec3, outer_radius: f64, inner_radius: f64) -> EntityId {
        self.create_solid(Shape::Tube {
            origin,
            axis,
            outer_radius,
            inner_radius,
        })
    }

    fn polyline(&mut self, points: Vec<Vec3>) -> EntityId {
        self.create_solid(Shape::PolyLine { points })
    }
}

/// Delete every entity labelled `label`, repeating until none is left
pub fn clear_by_label(model: &mut dyn ModelStore, label: &str) -> Result<usize> {
    let mut deleted = 0;
    while let Some(id) = model.find(label) {
        model.delete(id)?;
        deleted += 1;
        info!("Deleted: {}", label);
    }
    Ok(deleted)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EntityKind {
    Solid(Shape),
    Group(Vec<EntityId>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub label: String,
    pub kind: EntityKind,
    /// Accumulated world transform
    pub transform: Matrix4<f64>,
    pub parent: Option<EntityId>,
}

impl Entity {
    fn world_shape(self) -> Option<Shape> {
        let identity = self.transform == Matrix4::identity();
        match self.kind {
            EntityKind::Solid(shape) if identity => Some(shape),
            EntityKind::Solid(shape) => Some(Shape::Transformed {
                matrix: self.transform,
                shape: Box::new(shape),
            }),
            EntityKind::Group(_) => None,
        }
    }
}

/// Deterministic in-process model; ids are assigned sequentially from 1
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryModel {
    entities: BTreeMap<EntityId, Entity>,
    next_id: u64,
}

impl InMemoryModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: EntityId) -> Result<&Entity> {
        self.entities.get(&id).ok_or(GeometryError::MissingEntity(id))
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn children(&self, id: EntityId) -> Result<&[EntityId]> {
        match &self.get(id)?.kind {
            EntityKind::Group(children) => Ok(children.as_slice()),
            EntityKind::Solid(_) => Ok(&[]),
        }
    }

    /// Point membership in world space; polylines never contain points
    pub fn contains_point(&self, id: EntityId, p: &Vec3) -> Result<bool> {
        let entity = self.get(id)?;
        match &entity.kind {
            EntityKind::Solid(shape) => {
                let local = match entity.transform.try_inverse() {
                    Some(inv) => inv.transform_point(&Point3::from(*p)).coords,
                    None => return Ok(false),
                };
                Ok(shape.contains(&local))
            }
            EntityKind::Group(children) => {
                for child in children {
                    if self.contains_point(*child, p)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn insert(&mut self, label: &str, kind: EntityKind) -> EntityId {
        self.next_id += 1;
        let id = EntityId(self.next_id);
        self.entities.insert(
            id,
            Entity {
                id,
                label: label.to_string(),
                kind,
                transform: Matrix4::identity(),
                parent: None,
            },
        );
        id
    }

    fn detach(&mut self, id: EntityId) {
        let parent = self.entities.get_mut(&id).and_then(|e| e.parent.take());
        if let Some(parent) = parent {
            if let Some(Entity {
                kind: EntityKind::Group(children),
                ..
            }) = self.entities.get_mut(&parent)
            {
                children.retain(|c| *c != id);
            }
        }
    }

    fn subtree(&self, id: EntityId) -> Result<Vec<EntityId>> {
        let mut out = vec![id];
        let mut i = 0;
        while i < out.len() {
            if let EntityKind::Group(children) = &self.get(out[i])?.kind {
                out.extend(children.iter().copied());
            }
            i += 1;
        }
        Ok(out)
    }

    /// Check that every operand is an existing solid before consuming any of them
    fn check_solids(&self, ids: &[EntityId]) -> Result<()> {
        for id in ids {
            if let EntityKind::Group(_) = self.get(*id)?.kind {
                return Err(GeometryError::Configuration(format!(
                    "group {} cannot be a boolean operand",
                    id
                )));
            }
        }
        Ok(())
    }

    fn take_shape(&mut self, id: EntityId) -> Result<Shape> {
        self.detach(id);
        self.entities
            .remove(&id)
            .and_then(Entity::world_shape)
            .ok_or(GeometryError::MissingEntity(id))
    }

    fn boolean(
        &mut self,
        operands: &[EntityId],
        combine: impl FnOnce(Vec<Shape>) -> Shape,
    ) -> Result<EntityId> {
        let first = *operands.first().ok_or_else(|| {
            GeometryError::Configuration("boolean operation needs operands".to_string())
        })?;
        self.check_solids(operands)?;
        let label = self.get(first)?.label.clone();
        let shapes = operands
            .iter()
            .map(|id| self.take_shape(*id))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.insert(&label, EntityKind::Solid(combine(shapes))))
    }
}

impl ModelStore for InMemoryModel {
    fn create_solid(&mut self, shape: Shape) -> EntityId {
        self.insert("", EntityKind::Solid(shape))
    }

    fn unite(&mut self, operands: &[EntityId]) -> Result<EntityId> {
        self.boolean(operands, Shape::Union)
    }

    fn subtract(&mut self, base: EntityId, tools: &[EntityId]) -> Result<EntityId> {
        let mut operands = vec![base];
        operands.extend_from_slice(tools);
        self.boolean(&operands, |mut shapes| {
            let base = shapes.remove(0);
            Shape::Subtract {
                base: Box::new(base),
                tools: shapes,
            }
        })
    }

    fn intersect(&mut self, operands: &[EntityId]) -> Result<EntityId> {
        self.boolean(operands, Shape::Intersect)
    }

    fn create_group(&mut self, label: &str) -> EntityId {
        self.insert(label, EntityKind::Group(Vec::new()))
    }

    fn add_to_group(&mut self, group: EntityId, child: EntityId) -> Result<()> {
        self.get(child)?;
        if self.subtree(child)?.contains(&group) {
            return Err(GeometryError::Configuration(format!(
                "cannot nest {} inside its own descendant {}",
                child, group
            )));
        }
        match self.entities.get(&group) {
            Some(Entity {
                kind: EntityKind::Group(_),
                ..
            }) => {}
            Some(_) => {
                return Err(GeometryError::Configuration(format!(
                    "{} is not a group",
                    group
                )))
            }
            None => return Err(GeometryError::MissingEntity(group)),
        }
        self.detach(child);
        if let Some(Entity {
            kind: EntityKind::Group(children),
            ..
        }) = self.entities.get_mut(&group)
        {
            children.push(child);
        }
        if let Some(entity) = self.entities.get_mut(&child) {
            entity.parent = Some(group);
        }
        Ok(())
    }

    fn set_label(&mut self, id: EntityId, label: &str) -> Result<()> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(GeometryError::MissingEntity(id))?;
        entity.label = label.to_string();
        Ok(())
    }

    fn label(&self, id: EntityId) -> Result<&str> {
        Ok(&self.get(id)?.label)
    }

    fn apply_transform(&mut self, id: EntityId, transform: Transform) -> Result<()> {
        let matrix = transform.to_homogeneous();
        for target in self.subtree(id)? {
            if let Some(entity) = self.entities.get_mut(&target) {
                entity.transform = matrix * entity.transform;
            }
        }
        Ok(())
    }

    fn find_all(&self, label: &str) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| e.label == label)
            .map(|e| e.id)
            .collect()
    }

    fn bounds(&self, id: EntityId) -> Result<Option<Aabb>> {
        let entity = self.get(id)?;
        match &entity.kind {
            EntityKind::Solid(shape) => Ok(shape.bounds().map(|b| b.transformed(&entity.transform))),
            EntityKind::Group(children) => {
                let mut acc: Option<Aabb> = None;
                for child in children {
                    if let Some(b) = self.bounds(*child)? {
                        acc = Some(match acc {
                            Some(a) => a.union(&b),
                            None => b,
                        });
                    }
                }
                Ok(acc)
            }
        }
    }

    fn delete(&mut self, id: EntityId) -> Result<()> {
        let doomed = self.subtree(id)?;
        self.detach(id);
        for target in &doomed {
            self.entities.remove(target);
        }
        debug!("Removed {} entities rooted at {}", doomed.len(), id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn v(x: f64, y: f64, z: f64) -> Vec3 {
        Vec3::new(x, y, z)
    }

    #[test]
    fn test_unite_consumes_operands() {
        let mut model = InMemoryModel::new();
        let a = model.block(v(0.0, 0.0, 0.0), v(1.0, 1.0, 1.0));
        let b = model.block(v(2.0, 0.0, 0.0), v(3.0, 1.0, 1.0));
        model.set_label(a, "left").unwrap();
        let u = model.unite(&[a, b]).unwrap();

        assert_eq!(model.len(), 1);
        assert!(model.get(a).is_err());
        assert_eq!(model.label(u).unwrap(), "left");
        let bounds = model.bounds(u).unwrap().unwrap();
        assert_eq!(bounds.min, v(0.0, 0.0, 0.0));
        assert_eq!(bounds.max, v(3.0, 1.0, 1.0));
    }

    #[test]
    fn test_subtract_breaks_membership() {
        let mut model = InMemoryModel::new();
        let bar = model.block(v(0.0, -1.0, -10.0), v(0.0, 1.0, 10.0));
        let slot = model.block(v(-1.0, -1.0, -2.0), v(1.0, 1.0, 2.0));
        let cut = model.subtract(bar, &[slot]).unwrap();

        assert!(!model.contains_point(cut, &v(0.0, 0.0, 0.0)).unwrap());
        assert!(model.contains_point(cut, &v(0.0, 0.0, 5.0)).unwrap());
        // subtraction keeps the base bounds
        let b = model.bounds(cut).unwrap().unwrap();
        assert_eq!(b.extent(), v(0.0, 2.0, 20.0));
    }

    #[test]
    fn test_tube_intersection_is_half_annulus() {
        let mut model = InMemoryModel::new();
        let tube = model.tube(v(-1.0, 0.0, 0.0), v(2.0, 0.0, 0.0), 6.0, 2.0);
        let half = model.block(v(0.0, 0.0, -6.0), v(0.0, 6.0, 6.0));
        let piece = model.intersect(&[tube, half]).unwrap();

        assert!(model.contains_point(piece, &v(0.0, 4.0, 0.0)).unwrap());
        assert!(!model.contains_point(piece, &v(0.0, -4.0, 0.0)).unwrap());
        assert!(!model.contains_point(piece, &v(0.0, 1.0, 0.0)).unwrap());
    }

    #[test]
    fn test_group_transform_propagates() {
        let mut model = InMemoryModel::new();
        let group = model.create_group("g");
        let a = model.block(v(1.0, 0.0, 0.0), v(2.0, 0.0, 0.0));
        model.add_to_group(group, a).unwrap();

        model
            .apply_transform(
                group,
                Transform::Rotation {
                    axis: Vec3::z(),
                    angle: FRAC_PI_2,
                },
            )
            .unwrap();
        model
            .apply_transform(group, Transform::Translation(v(0.0, 0.0, 5.0)))
            .unwrap();

        let b = model.bounds(a).unwrap().unwrap();
        assert!((b.min.y - 1.0).abs() < 1e-9);
        assert!((b.max.y - 2.0).abs() < 1e-9);
        assert!(b.min.x.abs() < 1e-9);
        assert!((b.min.z - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_transformed_operand_keeps_placement() {
        let mut model = InMemoryModel::new();
        let a = model.block(v(0.0, 0.0, 0.0), v(1.0, 1.0, 1.0));
        model
            .apply_transform(a, Transform::Translation(v(10.0, 0.0, 0.0)))
            .unwrap();
        let b = model.block(v(0.0, 0.0, 0.0), v(1.0, 1.0, 1.0));
        let u = model.unite(&[a, b]).unwrap();

        assert!(model.contains_point(u, &v(10.5, 0.5, 0.5)).unwrap());
        assert!(!model.contains_point(u, &v(5.0, 0.5, 0.5)).unwrap());
    }

    #[test]
    fn test_delete_group_removes_children() {
        let mut model = InMemoryModel::new();
        let outer = model.create_group("outer");
        let inner = model.create_group("inner");
        let leaf = model.block(v(0.0, 0.0, 0.0), v(1.0, 1.0, 1.0));
        model.add_to_group(inner, leaf).unwrap();
        model.add_to_group(outer, inner).unwrap();

        model.delete(outer).unwrap();
        assert!(model.is_empty());
        assert!(matches!(
            model.delete(leaf),
            Err(GeometryError::MissingEntity(_))
        ));
    }

    #[test]
    fn test_group_cycle_rejected() {
        let mut model = InMemoryModel::new();
        let outer = model.create_group("outer");
        let inner = model.create_group("inner");
        model.add_to_group(outer, inner).unwrap();
        assert!(model.add_to_group(inner, outer).is_err());
    }

    #[test]
    fn test_clear_by_label_removes_duplicates() {
        let mut model = InMemoryModel::new();
        for _ in 0..3 {
            let g = model.create_group("Spacer Group");
            let s = model.block(v(0.0, 0.0, 0.0), v(1.0, 1.0, 1.0));
            model.add_to_group(g, s).unwrap();
        }
        model.create_group("keep");

        assert_eq!(clear_by_label(&mut model, "Spacer Group").unwrap(), 3);
        assert_eq!(model.len(), 1);
        assert!(model.find("keep").is_some());
        assert_eq!(clear_by_label(&mut model, "Spacer Group").unwrap(), 0);
    }

    #[test]
    fn test_scaling_about_origin() {
        let mut model = InMemoryModel::new();
        let a = model.block(v(1.0, 1.0, 1.0), v(2.0, 2.0, 2.0));
        model.apply_transform(a, Transform::Scaling(2.0)).unwrap();
        let b = model.bounds(a).unwrap().unwrap();
        assert!((b.min - v(2.0, 2.0, 2.0)).norm() < 1e-9);
        assert!((b.max - v(4.0, 4.0, 4.0)).norm() < 1e-9);
    }
}
