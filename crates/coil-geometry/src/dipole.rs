//! Dipole antenna construction
//!
//! Three variants share one conductor and feed layout and differ in how the arms
//! are segmented:
//!
//! | Kind | Conductor | Gap segments |
//! |------|-----------|--------------|
//! | Plain | two arms separated by the feed gap | none |
//! | Lumped | arms cut by four 4 mm slots | one per slot, for lumped elements |
//! | Fractionated | arms cut by four 12 mm slots, each bridged by a meander | one per slot |
//!
//! The cut count is fixed at four regardless of length. Antennas needing a
//! different segment density need a different scheme, not a parameter.

use crate::model::ModelStore;
use crate::{require_positive, EntityId, GeometryError, Result, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Axial cut positions as fractions of the half-length
pub const CUT_FRACTIONS: [f64; 4] = [-2.0 / 3.0, -1.0 / 3.0, 1.0 / 3.0, 2.0 / 3.0];

/// Number of gap segments on segmented variants
pub const GAP_SEGMENT_COUNT: usize = CUT_FRACTIONS.len();

/// Cut slabs overshoot the conductor face by this much on each side (mm)
pub const CUT_MARGIN: f64 = 1.0;

/// Half the axial length of a Lumped slot (mm)
pub const LUMPED_SLOT_HALF_LENGTH: f64 = 2.0;

pub const CONDUCTOR_LABEL: &str = "Conductor";
pub const SOURCE_LABEL: &str = "Source";
pub const SERIES_MATCH_LABEL: &str = "SeriesLE";
pub const PARALLEL_MATCH_LABEL: &str = "ParallelLE";

/// Meander offsets for the Fractionated dipole (mm).
///
/// These fix the folded path's fabrication geometry and are not derived from the
/// conductor width; changing them needs confirmation against a built coil.
pub mod meander {
    /// Half the axial length of a Fractionated slot
    pub const SLOT_HALF_LENGTH: f64 = 6.0;
    /// Axial start of the connector block beside each slot
    pub const CONNECTOR_NEAR: f64 = 6.0;
    /// Axial end of the connector block
    pub const CONNECTOR_FAR: f64 = 10.0;
    /// Lateral reach of connectors and bridge beyond the conductor edge
    pub const LATERAL_OFFSET: f64 = 6.0;
    /// Lateral extent of the clipping block around each bend
    pub const BEND_REACH: f64 = 12.0;
    /// Half the axial length of the central bridge
    pub const BRIDGE_HALF_LENGTH: f64 = 2.0;
    /// Axial offset of each bend's center from the slot center
    pub const BEND_CENTER: f64 = 4.0;
    pub const BEND_OUTER_RADIUS: f64 = 6.0;
    pub const BEND_INNER_RADIUS: f64 = 2.0;
}

/// Antenna variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AntennaKind {
    Plain,
    Lumped,
    Fractionated,
}

impl AntennaKind {
    /// Group label of a freshly built antenna
    pub fn display_name(&self) -> &'static str {
        match self {
            AntennaKind::Plain => "Plain Dipole",
            AntennaKind::Lumped => "Lumped Dipole",
            AntennaKind::Fractionated => "Fractionated Dipole",
        }
    }

    /// Whether the conductor is cut into segments
    pub fn is_segmented(&self) -> bool {
        !matches!(self, AntennaKind::Plain)
    }
}

impl fmt::Display for AntennaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            AntennaKind::Plain => "plain",
            AntennaKind::Lumped => "lumped",
            AntennaKind::Fractionated => "fractionated",
        };
        f.write_str(tag)
    }
}

impl FromStr for AntennaKind {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(AntennaKind::Plain),
            "lumped" => Ok(AntennaKind::Lumped),
            "fractionated" | "meander" => Ok(AntennaKind::Fractionated),
            _ => Err(GeometryError::UnknownAntennaKind(s.to_string())),
        }
    }
}

impl TryFrom<String> for AntennaKind {
    type Error = GeometryError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<AntennaKind> for String {
    fn from(kind: AntennaKind) -> Self {
        kind.to_string()
    }
}

fn default_width() -> f64 {
    10.0
}

fn default_gap_width() -> f64 {
    2.0
}

/// Dimensional parameters of one dipole (mm)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntennaSpec {
    pub kind: AntennaKind,
    /// Tip-to-tip length along z
    pub length: f64,
    #[serde(default = "default_width")]
    pub width: f64,
    /// Feed gap between the arms
    #[serde(default = "default_gap_width")]
    pub gap_width: f64,
    /// Conductor thickness along x; zero gives a sheet conductor
    #[serde(default)]
    pub thickness: f64,
    /// Add series/parallel matching stubs at the feed
    #[serde(default)]
    pub matching: bool,
}

impl AntennaSpec {
    pub fn new(kind: AntennaKind, length: f64) -> Self {
        Self {
            kind,
            length,
            width: default_width(),
            gap_width: default_gap_width(),
            thickness: 0.0,
            matching: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_positive("antenna length", self.length)?;
        require_positive("antenna width", self.width)?;
        if !(self.gap_width.is_finite() && self.gap_width >= 0.0) {
            return Err(GeometryError::Configuration(format!(
                "gap width must be non-negative, got {}",
                self.gap_width
            )));
        }
        if self.gap_width >= self.length {
            return Err(GeometryError::Configuration(format!(
                "gap width {} must be shorter than length {}",
                self.gap_width, self.length
            )));
        }
        if !(self.thickness.is_finite() && self.thickness >= 0.0) {
            return Err(GeometryError::Configuration(format!(
                "thickness must be non-negative, got {}",
                self.thickness
            )));
        }
        if let Some(reach) = segment_reach(self.kind) {
            self.check_segments_fit(reach)?;
        }
        Ok(())
    }

    /// Every cut, with whatever it adds around it, must clear the feed gap, its
    /// neighbour and the tip
    fn check_segments_fit(&self, reach: f64) -> Result<()> {
        let third = self.length / 6.0;
        let half_gap = self.gap_width / 2.0;
        if third - reach <= half_gap || third < 2.0 * reach {
            return Err(GeometryError::Configuration(format!(
                "{} dipole of length {} is too short for {} cuts reaching {}mm each",
                self.kind, self.length, GAP_SEGMENT_COUNT, reach
            )));
        }
        Ok(())
    }
}

/// Axial reach of a cut about its center, including the meander on Fractionated arms
fn segment_reach(kind: AntennaKind) -> Option<f64> {
    match kind {
        AntennaKind::Plain => None,
        AntennaKind::Lumped => Some(LUMPED_SLOT_HALF_LENGTH),
        AntennaKind::Fractionated => Some(meander::CONNECTOR_FAR),
    }
}

/// Handles of one built antenna
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntennaInstance {
    pub kind: AntennaKind,
    /// Group owning every part below
    pub group: EntityId,
    pub conductor: EntityId,
    pub source: EntityId,
    pub series_match: Option<EntityId>,
    pub parallel_match: Option<EntityId>,
    /// Gap segments ordered along +z; empty for Plain
    pub gaps: Vec<EntityId>,
}

impl AntennaInstance {
    /// Conductor, source, matching stubs and gaps, in that order
    pub fn parts(&self) -> Vec<EntityId> {
        let mut parts = vec![self.conductor, self.source];
        parts.extend(self.series_match);
        parts.extend(self.parallel_match);
        parts.extend(self.gaps.iter().copied());
        parts
    }
}

/// One construction routine per antenna kind
pub trait AntennaBuilder {
    fn kind(&self) -> AntennaKind;

    fn build(&self, model: &mut dyn ModelStore, spec: &AntennaSpec) -> Result<AntennaInstance>;
}

pub struct PlainDipole;
pub struct LumpedDipole;
pub struct FractionatedDipole;

/// The single dispatch point from kind to builder
pub fn builder_for(kind: AntennaKind) -> &'static dyn AntennaBuilder {
    match kind {
        AntennaKind::Plain => &PlainDipole,
        AntennaKind::Lumped => &LumpedDipole,
        AntennaKind::Fractionated => &FractionatedDipole,
    }
}

/// Build one antenna centered on the origin, long axis along z
pub fn build(model: &mut dyn ModelStore, spec: &AntennaSpec) -> Result<AntennaInstance> {
    builder_for(spec.kind).build(model, spec)
}

impl AntennaBuilder for PlainDipole {
    fn kind(&self) -> AntennaKind {
        AntennaKind::Plain
    }

    fn build(&self, model: &mut dyn ModelStore, spec: &AntennaSpec) -> Result<AntennaInstance> {
        let frame = Frame::new(spec)?;
        let conductor = frame.conductor(model)?;
        let feed = frame.feed(model, spec.matching);
        assemble(model, AntennaKind::Plain, conductor, feed, Vec::new())
    }
}

impl AntennaBuilder for LumpedDipole {
    fn kind(&self) -> AntennaKind {
        AntennaKind::Lumped
    }

    fn build(&self, model: &mut dyn ModelStore, spec: &AntennaSpec) -> Result<AntennaInstance> {
        let frame = Frame::new(spec)?;
        let mut conductor = frame.conductor(model)?;
        let feed = frame.feed(model, spec.matching);

        let mut gaps = Vec::with_capacity(GAP_SEGMENT_COUNT);
        for z in frame.cut_positions() {
            conductor = frame.cut(model, conductor, z, LUMPED_SLOT_HALF_LENGTH)?;
            gaps.push(frame.gap_segment(model, z, LUMPED_SLOT_HALF_LENGTH, gaps.len() + 1)?);
        }
        assemble(model, AntennaKind::Lumped, conductor, feed, gaps)
    }
}

impl AntennaBuilder for FractionatedDipole {
    fn kind(&self) -> AntennaKind {
        AntennaKind::Fractionated
    }

    fn build(&self, model: &mut dyn ModelStore, spec: &AntennaSpec) -> Result<AntennaInstance> {
        use meander::*;

        let frame = Frame::new(spec)?;
        let mut conductor = frame.conductor(model)?;
        let feed = frame.feed(model, spec.matching);
        let (hw, t) = (frame.hw, frame.t);

        let mut gaps = Vec::with_capacity(GAP_SEGMENT_COUNT);
        for z in frame.cut_positions() {
            conductor = frame.cut(model, conductor, z, SLOT_HALF_LENGTH)?;
            gaps.push(frame.gap_segment(model, z, SLOT_HALF_LENGTH, gaps.len() + 1)?);

            let upper_connector = model.block(
                Vec3::new(0.0, hw, z + CONNECTOR_FAR),
                Vec3::new(t, hw + LATERAL_OFFSET, z + CONNECTOR_NEAR),
            );
            let lower_connector = model.block(
                Vec3::new(0.0, -hw, z - CONNECTOR_NEAR),
                Vec3::new(t, -hw - LATERAL_OFFSET, z - CONNECTOR_FAR),
            );
            let bridge = model.block(
                Vec3::new(0.0, -hw - LATERAL_OFFSET, z + BRIDGE_HALF_LENGTH),
                Vec3::new(t, hw + LATERAL_OFFSET, z - BRIDGE_HALF_LENGTH),
            );
            let upper_bend = bend(model, &frame, z, 1.0)?;
            let lower_bend = bend(model, &frame, z, -1.0)?;

            conductor = model.unite(&[
                conductor,
                upper_connector,
                lower_connector,
                bridge,
                upper_bend,
                lower_bend,
            ])?;
        }
        assemble(model, AntennaKind::Fractionated, conductor, feed, gaps)
    }
}

/// Half-annulus joining a connector to the bridge; `side` is +1 above the axis, -1 below
fn bend(model: &mut dyn ModelStore, frame: &Frame, z: f64, side: f64) -> Result<EntityId> {
    use meander::*;

    let edge = side * (frame.hw + LATERAL_OFFSET);
    let tube = model.tube(
        Vec3::new(-CUT_MARGIN, edge, z + side * BEND_CENTER),
        Vec3::new(2.0 * CUT_MARGIN, 0.0, 0.0),
        BEND_OUTER_RADIUS,
        BEND_INNER_RADIUS,
    );
    let clip = model.block(
        Vec3::new(0.0, edge, z + side * CONNECTOR_FAR),
        Vec3::new(
            frame.t,
            side * (frame.hw + BEND_REACH),
            z - side * BRIDGE_HALF_LENGTH,
        ),
    );
    model.intersect(&[tube, clip])
}

struct Feed {
    source: EntityId,
    series: Option<EntityId>,
    parallel: Option<EntityId>,
}

/// Half-dimensions of a validated spec
struct Frame {
    hl: f64,
    hgw: f64,
    hw: f64,
    t: f64,
}

impl Frame {
    fn new(spec: &AntennaSpec) -> Result<Self> {
        spec.validate()?;
        Ok(Self {
            hl: spec.length / 2.0,
            hgw: spec.gap_width / 2.0,
            hw: spec.width / 2.0,
            t: spec.thickness,
        })
    }

    fn cut_positions(&self) -> [f64; GAP_SEGMENT_COUNT] {
        CUT_FRACTIONS.map(|f| f * self.hl)
    }

    /// Two arms from the gap edges to the tips, united
    fn conductor(&self, model: &mut dyn ModelStore) -> Result<EntityId> {
        let lower = model.block(
            Vec3::new(0.0, -self.hw, -self.hgw),
            Vec3::new(self.t, self.hw, -self.hl),
        );
        let upper = model.block(
            Vec3::new(0.0, -self.hw, self.hgw),
            Vec3::new(self.t, self.hw, self.hl),
        );
        let conductor = model.unite(&[lower, upper])?;
        model.set_label(conductor, CONDUCTOR_LABEL)?;
        Ok(conductor)
    }

    /// Source across the gap, or across its upper half with matching stubs on the lower half
    fn feed(&self, model: &mut dyn ModelStore, matching: bool) -> Feed {
        if !matching {
            let source = model.polyline(vec![
                Vec3::new(0.0, 0.0, -self.hgw),
                Vec3::new(0.0, 0.0, self.hgw),
            ]);
            return Feed {
                source,
                series: None,
                parallel: None,
            };
        }
        let source = model.polyline(vec![Vec3::zeros(), Vec3::new(0.0, 0.0, self.hgw)]);
        let series = model.polyline(vec![Vec3::new(0.0, 0.0, -self.hgw), Vec3::zeros()]);
        let parallel = model.polyline(vec![
            Vec3::new(0.0, -self.hw / 2.0, -self.hgw),
            Vec3::new(0.0, -self.hw / 2.0, self.hgw),
        ]);
        Feed {
            source,
            series: Some(series),
            parallel: Some(parallel),
        }
    }

    /// Remove a slot of the given half-length centered at `z`
    fn cut(
        &self,
        model: &mut dyn ModelStore,
        conductor: EntityId,
        z: f64,
        half_length: f64,
    ) -> Result<EntityId> {
        let slab = model.block(
            Vec3::new(-CUT_MARGIN, -self.hw, z - half_length),
            Vec3::new(self.t + CUT_MARGIN, self.hw, z + half_length),
        );
        debug!("Cutting {:.2}mm slot at z={:.2}", 2.0 * half_length, z);
        model.subtract(conductor, &[slab])
    }

    fn gap_segment(
        &self,
        model: &mut dyn ModelStore,
        z: f64,
        half_length: f64,
        index: usize,
    ) -> Result<EntityId> {
        let gap = model.polyline(vec![
            Vec3::new(0.0, 0.0, z - half_length),
            Vec3::new(0.0, 0.0, z + half_length),
        ]);
        model.set_label(gap, &format!("Capacitor {}", index))?;
        Ok(gap)
    }
}

fn assemble(
    model: &mut dyn ModelStore,
    kind: AntennaKind,
    conductor: EntityId,
    feed: Feed,
    gaps: Vec<EntityId>,
) -> Result<AntennaInstance> {
    model.set_label(feed.source, SOURCE_LABEL)?;
    if let Some(series) = feed.series {
        model.set_label(series, SERIES_MATCH_LABEL)?;
    }
    if let Some(parallel) = feed.parallel {
        model.set_label(parallel, PARALLEL_MATCH_LABEL)?;
    }

    let group = model.create_group(kind.display_name());
    let instance = AntennaInstance {
        kind,
        group,
        conductor,
        source: feed.source,
        series_match: feed.series,
        parallel_match: feed.parallel,
        gaps,
    };
    for part in instance.parts() {
        model.add_to_group(group, part)?;
    }
    debug!("Built {} with {} parts", kind.display_name(), instance.parts().len());
    Ok(instance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InMemoryModel;

    fn point(y: f64, z: f64) -> Vec3 {
        Vec3::new(0.0, y, z)
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("plain".parse::<AntennaKind>().unwrap(), AntennaKind::Plain);
        assert_eq!("Lumped".parse::<AntennaKind>().unwrap(), AntennaKind::Lumped);
        assert_eq!(
            "meander".parse::<AntennaKind>().unwrap(),
            AntennaKind::Fractionated
        );
        assert!(matches!(
            "loop".parse::<AntennaKind>(),
            Err(GeometryError::UnknownAntennaKind(tag)) if tag == "loop"
        ));
    }

    #[test]
    fn test_spec_validation() {
        assert!(AntennaSpec::new(AntennaKind::Plain, 300.0).validate().is_ok());
        assert!(AntennaSpec::new(AntennaKind::Plain, 0.0).validate().is_err());

        let mut spec = AntennaSpec::new(AntennaKind::Plain, 300.0);
        spec.width = -1.0;
        assert!(spec.validate().is_err());

        let mut spec = AntennaSpec::new(AntennaKind::Plain, 2.0);
        spec.gap_width = 2.0;
        assert!(matches!(
            spec.validate(),
            Err(GeometryError::Configuration(_))
        ));
    }

    #[test]
    fn test_short_segmented_dipoles_rejected() {
        let mut model = InMemoryModel::new();
        for (kind, length) in [(AntennaKind::Lumped, 8.0), (AntennaKind::Fractionated, 40.0)] {
            assert!(matches!(
                build(&mut model, &AntennaSpec::new(kind, length)),
                Err(GeometryError::Configuration(_))
            ));
        }
        assert!(model.is_empty());

        // a plain arm has no cuts to fit
        assert!(AntennaSpec::new(AntennaKind::Plain, 8.0).validate().is_ok());
        assert!(AntennaSpec::new(AntennaKind::Lumped, 24.0).validate().is_ok());
        assert!(AntennaSpec::new(AntennaKind::Fractionated, 119.0).validate().is_err());
    }

    #[test]
    fn test_shortest_fractionated_stays_within_tips() {
        let mut model = InMemoryModel::new();
        let antenna =
            build(&mut model, &AntennaSpec::new(AntennaKind::Fractionated, 120.0)).unwrap();
        let b = model.bounds(antenna.conductor).unwrap().unwrap();
        assert!((b.min.z + 60.0).abs() < 1e-9);
        assert!((b.max.z - 60.0).abs() < 1e-9);
        // conductor survives between the feed gap and the inner cut
        assert!(model.contains_point(antenna.conductor, &point(0.0, 5.0)).unwrap());
    }

    #[test]
    fn test_plain_extent_and_gap() {
        let mut model = InMemoryModel::new();
        let spec = AntennaSpec::new(AntennaKind::Plain, 300.0);
        let antenna = build(&mut model, &spec).unwrap();

        let b = model.bounds(antenna.conductor).unwrap().unwrap();
        assert_eq!(b.extent(), Vec3::new(0.0, 10.0, 300.0));
        assert_eq!(b.center(), Vec3::zeros());

        assert!(!model.contains_point(antenna.conductor, &point(0.0, 0.0)).unwrap());
        assert!(model.contains_point(antenna.conductor, &point(0.0, 1.0)).unwrap());
        assert!(model.contains_point(antenna.conductor, &point(4.0, -100.0)).unwrap());
        assert!(antenna.gaps.is_empty());
        assert_eq!(model.label(antenna.group).unwrap(), "Plain Dipole");
        assert_eq!(model.label(antenna.conductor).unwrap(), CONDUCTOR_LABEL);
    }

    #[test]
    fn test_source_spans_gap() {
        let mut model = InMemoryModel::new();
        let antenna = build(&mut model, &AntennaSpec::new(AntennaKind::Plain, 300.0)).unwrap();
        let b = model.bounds(antenna.source).unwrap().unwrap();
        assert_eq!(b.min.z, -1.0);
        assert_eq!(b.max.z, 1.0);
        assert!(antenna.series_match.is_none());
        assert!(antenna.parallel_match.is_none());
    }

    #[test]
    fn test_matching_splits_feed() {
        let mut model = InMemoryModel::new();
        let mut spec = AntennaSpec::new(AntennaKind::Plain, 300.0);
        spec.matching = true;
        let antenna = build(&mut model, &spec).unwrap();

        let source = model.bounds(antenna.source).unwrap().unwrap();
        assert_eq!((source.min.z, source.max.z), (0.0, 1.0));

        let series = antenna.series_match.unwrap();
        let s = model.bounds(series).unwrap().unwrap();
        assert_eq!((s.min.z, s.max.z), (-1.0, 0.0));
        assert_eq!(model.label(series).unwrap(), SERIES_MATCH_LABEL);

        let parallel = model.bounds(antenna.parallel_match.unwrap()).unwrap().unwrap();
        assert_eq!(parallel.min.y, -2.5);
        assert_eq!((parallel.min.z, parallel.max.z), (-1.0, 1.0));
        assert_eq!(antenna.parts().len(), 4);
    }

    #[test]
    fn test_lumped_cuts_at_thirds() {
        let mut model = InMemoryModel::new();
        let antenna = build(&mut model, &AntennaSpec::new(AntennaKind::Lumped, 300.0)).unwrap();

        assert_eq!(antenna.gaps.len(), GAP_SEGMENT_COUNT);
        for (i, z) in [-100.0, -50.0, 50.0, 100.0].into_iter().enumerate() {
            assert!(!model.contains_point(antenna.conductor, &point(0.0, z)).unwrap());
            assert!(model.contains_point(antenna.conductor, &point(0.0, z + 3.0)).unwrap());
            let gap = model.bounds(antenna.gaps[i]).unwrap().unwrap();
            assert!((gap.center().z - z).abs() < 1e-9);
            assert!((gap.extent().z - 4.0).abs() < 1e-9);
            assert_eq!(
                model.label(antenna.gaps[i]).unwrap(),
                format!("Capacitor {}", i + 1)
            );
        }
    }

    #[test]
    fn test_fractionated_meander_bridges_slots() {
        let mut model = InMemoryModel::new();
        let antenna =
            build(&mut model, &AntennaSpec::new(AntennaKind::Fractionated, 300.0)).unwrap();
        let c = antenna.conductor;
        let z = 50.0;

        // slot is open on the arm itself except for the central bridge
        assert!(!model.contains_point(c, &point(0.0, z + 4.0)).unwrap());
        assert!(!model.contains_point(c, &point(0.0, z - 4.0)).unwrap());
        assert!(model.contains_point(c, &point(0.0, z)).unwrap());
        // connectors beside the slot
        assert!(model.contains_point(c, &point(8.0, z + 8.0)).unwrap());
        assert!(model.contains_point(c, &point(-8.0, z - 8.0)).unwrap());
        // bends, outside their inner radius
        assert!(model.contains_point(c, &point(15.0, z + 4.0)).unwrap());
        assert!(!model.contains_point(c, &point(12.0, z + 4.0)).unwrap());
        assert!(model.contains_point(c, &point(-15.0, z - 4.0)).unwrap());

        assert_eq!(antenna.gaps.len(), GAP_SEGMENT_COUNT);
        let b = model.bounds(c).unwrap().unwrap();
        assert!((b.extent().z - 300.0).abs() < 1e-9);
        assert!((b.max.y - 17.0).abs() < 1e-9);
    }

    #[test]
    fn test_builder_dispatch() {
        for kind in [
            AntennaKind::Plain,
            AntennaKind::Lumped,
            AntennaKind::Fractionated,
        ] {
            assert_eq!(builder_for(kind).kind(), kind);
        }
    }
}
