// ─────────────────────────────────────────────────────────────────────
// SCPN Gravity Core — Property-Based Tests (proptest) for gravity-types
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for the shared data model.

use gravity_types::state::{Cell, Mesh, SensorsGrid, Stratum};
use proptest::prelude::*;

fn cell(cx: f64, cy: f64, cz: f64, b: f64) -> Cell {
    Cell {
        center_x: cx,
        center_y: cy,
        center_z: cz,
        bound_x: b,
        bound_y: b,
        bound_z: b,
        density: 0.0,
        level: 0,
    }
}

proptest! {
    /// Cell volume is positive for positive half-extents and scales
    /// with the cube of the edge length.
    #[test]
    fn cell_volume_positive_and_cubic(b in 1e-3f64..100.0) {
        let c = cell(0.0, 0.0, 0.0, b);
        let doubled = cell(0.0, 0.0, 0.0, 2.0 * b);
        prop_assert!(c.volume() > 0.0);
        prop_assert!((doubled.volume() / c.volume() - 8.0).abs() < 1e-9);
    }

    /// Mesh total volume is the sum of its cell volumes.
    #[test]
    fn mesh_volume_additive(bounds in prop::collection::vec(1e-2f64..10.0, 1..20)) {
        let cells: Vec<Cell> = bounds.iter().map(|&b| cell(0.0, 0.0, -b, b)).collect();
        let expected: f64 = cells.iter().map(Cell::volume).sum();
        let mesh = Mesh::new(cells);
        prop_assert!((mesh.total_volume() - expected).abs() < expected * 1e-12);
    }

    /// set_densities followed by densities() is the identity.
    #[test]
    fn mesh_density_roundtrip(rhos in prop::collection::vec(-5000.0f64..5000.0, 1..30)) {
        let mut mesh = Mesh::new(vec![cell(0.0, 0.0, -1.0, 1.0); rhos.len()]);
        mesh.set_densities(&rhos).unwrap();
        prop_assert_eq!(mesh.densities(), rhos);
    }

    /// Sensor grids always produce (sx+1)(sy+1) nodes inside the bounds.
    #[test]
    fn sensor_grid_count_and_containment(
        sx in 1usize..12,
        sy in 1usize..12,
        half in 0.5f64..50.0,
    ) {
        let grid = SensorsGrid {
            start_x: -half,
            end_x: half,
            splits_x: sx,
            start_y: -half,
            end_y: half,
            splits_y: sy,
            z: 0.0,
        };
        let sensors = grid.build_sensors().unwrap();
        prop_assert_eq!(sensors.len(), (sx + 1) * (sy + 1));
        for s in &sensors {
            prop_assert!(s.x >= -half - 1e-9 && s.x <= half + 1e-9);
            prop_assert!(s.y >= -half - 1e-9 && s.y <= half + 1e-9);
        }
    }

    /// A stratum contains its own center and excludes points beyond its
    /// bounds by any positive margin.
    #[test]
    fn stratum_containment(
        cx in -50.0f64..50.0,
        cz in -50.0f64..0.0,
        half in 0.1f64..10.0,
        margin in 1e-6f64..5.0,
    ) {
        let stratum = Stratum {
            start_x: cx - half,
            end_x: cx + half,
            start_y: -half,
            end_y: half,
            start_z: cz - half,
            end_z: cz + half,
            density: 2500.0,
        };
        prop_assert!(stratum.contains(cx, 0.0, cz));
        prop_assert!(!stratum.contains(cx + half + margin, 0.0, cz));
        prop_assert!(!stratum.contains(cx, 0.0, cz - half - margin));
    }
}
