//! Property tests for dipole construction and ellipse layout

use coil_geometry::dipole::{self, AntennaKind, AntennaSpec, GAP_SEGMENT_COUNT};
use coil_geometry::layout::{layout, EllipseLayout};
use coil_geometry::{InMemoryModel, ModelStore, Vec3};
use proptest::prelude::*;

/// Valid dipole dimensions in mm: length, width, gap
fn dimensions() -> impl Strategy<Value = (f64, f64, f64)> {
    (60.0f64..600.0, 2.0f64..30.0, 0.5f64..8.0)
}

fn kind() -> impl Strategy<Value = AntennaKind> {
    prop_oneof![
        Just(AntennaKind::Plain),
        Just(AntennaKind::Lumped),
        Just(AntennaKind::Fractionated),
    ]
}

proptest! {
    #[test]
    fn plain_conductor_is_symmetric((length, width, gap) in dimensions()) {
        let mut model = InMemoryModel::new();
        let mut spec = AntennaSpec::new(AntennaKind::Plain, length);
        spec.width = width;
        spec.gap_width = gap;
        let antenna = dipole::build(&mut model, &spec).unwrap();

        let b = model.bounds(antenna.conductor).unwrap().unwrap();
        prop_assert!((b.extent().z - length).abs() < 1e-9);
        prop_assert!((b.extent().y - width).abs() < 1e-9);
        prop_assert!((b.min.z + b.max.z).abs() < 1e-9);

        // mirror images along the long axis
        for z in [gap / 2.0 + 0.1, length / 4.0, length / 2.0 - 0.1] {
            let above = model.contains_point(antenna.conductor, &Vec3::new(0.0, 0.0, z)).unwrap();
            let below = model.contains_point(antenna.conductor, &Vec3::new(0.0, 0.0, -z)).unwrap();
            prop_assert!(above && below);
        }
        prop_assert!(!model.contains_point(antenna.conductor, &Vec3::zeros()).unwrap());
    }

    #[test]
    fn segmented_kinds_always_have_four_gaps(length in 120.0f64..900.0, fractionated in any::<bool>()) {
        let kind = if fractionated { AntennaKind::Fractionated } else { AntennaKind::Lumped };
        let mut model = InMemoryModel::new();
        let antenna = dipole::build(&mut model, &AntennaSpec::new(kind, length)).unwrap();
        prop_assert_eq!(antenna.gaps.len(), GAP_SEGMENT_COUNT);

        for (i, fraction) in dipole::CUT_FRACTIONS.into_iter().enumerate() {
            let z = fraction * length / 2.0;
            let gap = model.bounds(antenna.gaps[i]).unwrap().unwrap();
            prop_assert!((gap.center().z - z).abs() < 1e-9);

            // the strip is open on the axis beside each cut center
            let probe = if kind == AntennaKind::Lumped { z } else { z + 4.0 };
            prop_assert!(!model.contains_point(antenna.conductor, &Vec3::new(0.0, 0.0, probe)).unwrap());
            prop_assert!(model.contains_point(antenna.conductor, &Vec3::new(0.0, 0.0, z + 12.0)).unwrap());
        }
    }

    #[test]
    fn dipoles_never_outgrow_their_length(length in 3.0f64..200.0, kind in kind()) {
        let mut model = InMemoryModel::new();
        match dipole::build(&mut model, &AntennaSpec::new(kind, length)) {
            Ok(antenna) => {
                let b = model.bounds(antenna.conductor).unwrap().unwrap();
                prop_assert!((b.extent().z - length).abs() < 1e-9);
                // conductor survives between the feed gap and the first cut above it
                let first_cut = match antenna.gaps.get(GAP_SEGMENT_COUNT / 2) {
                    Some(gap) => model.bounds(*gap).unwrap().unwrap().min.z,
                    None => length / 2.0,
                };
                let z = (1.0 + first_cut) / 2.0;
                prop_assert!(model.contains_point(antenna.conductor, &Vec3::new(0.0, 0.0, z)).unwrap());
                prop_assert!(model.contains_point(antenna.conductor, &Vec3::new(0.0, 0.0, -z)).unwrap());
                for pair in antenna.gaps.windows(2) {
                    let lower = model.bounds(pair[0]).unwrap().unwrap();
                    let upper = model.bounds(pair[1]).unwrap().unwrap();
                    prop_assert!(lower.max.z <= upper.min.z);
                }
            }
            Err(err) => {
                prop_assert!(kind.is_segmented(), "{}", err);
                prop_assert!(model.is_empty());
            }
        }
    }

    #[test]
    fn placements_lie_on_the_ellipse(
        count in 1usize..32,
        width in 50.0f64..600.0,
        height in 50.0f64..600.0,
        start in -6.3f64..6.3,
    ) {
        let ellipse = EllipseLayout::new(count, width, height).unwrap().with_start_angle(start).unwrap();
        let placements = ellipse.placements();
        prop_assert_eq!(placements.len(), count);
        for (i, p) in placements.iter().enumerate() {
            let r = (p.x / (width / 2.0)).powi(2) + (p.y / (height / 2.0)).powi(2);
            prop_assert!((r - 1.0).abs() < 1e-9);
            prop_assert_eq!(p.index, i + 1);
        }
        for pair in placements.windows(2) {
            prop_assert!((pair[1].angle - pair[0].angle - ellipse.angular_spacing()).abs() < 1e-9);
        }
    }

    #[test]
    fn every_element_is_built(count in 1usize..10, kind in kind()) {
        let mut model = InMemoryModel::new();
        let spec = AntennaSpec::new(kind, 250.0);
        let array = layout(&mut model, count, &spec, 240.0, 300.0).unwrap();
        prop_assert_eq!(array.len(), count);
        for element in &array.elements {
            prop_assert!(model.bounds(element.instance.conductor).unwrap().is_some());
        }
    }
}
