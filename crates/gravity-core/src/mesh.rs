// ─────────────────────────────────────────────────────────────────────
// SCPN Gravity Core — Mesh Construction
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Construction of the initial prism mesh.
//!
//! Two entry points: a forward-modelling mesh built from a domain plus its
//! geological strata, with grid lines snapped to stratum boundaries, and an
//! inversion mesh built from the sensor grid footprint with a uniform
//! density start.

use gravity_types::config::InitialMeshOptions;
use gravity_types::error::{GravityError, GravityResult};
use gravity_types::state::{Cell, Domain, Mesh, SensorsGrid, Stratum};

use crate::octree::Octree;

/// Tolerance for deduplicating merged axis break points.
const AXIS_DEDUP_EPSILON: f64 = 1e-12;

/// Uniform grid points over `[start, end]` merged with the given stratum
/// boundaries that fall inside the interval.
fn axis_points(start: f64, end: f64, splits: usize, boundaries: &[f64]) -> Vec<f64> {
    let lo = start.min(end);
    let hi = start.max(end);
    let step = (hi - lo) / splits as f64;

    let mut points: Vec<f64> = (0..=splits).map(|i| lo + i as f64 * step).collect();
    points.extend(boundaries.iter().copied().filter(|&b| b > lo && b < hi));
    points.sort_by(|a, b| a.total_cmp(b));
    points.dedup_by(|a, b| (*a - *b).abs() < AXIS_DEDUP_EPSILON);
    points
}

/// Build a forward-modelling mesh over the domain.
///
/// Cells are the tensor product of the merged axis breaks, so every stratum
/// face lies on a cell boundary and no cell straddles a density contrast.
/// Each cell takes the density of the stratum containing its center, or the
/// domain base density when no stratum does.
pub fn mesh_from_domain(domain: &Domain, strata: &[Stratum]) -> GravityResult<Mesh> {
    if domain.splits_x == 0 || domain.splits_y == 0 || domain.splits_z == 0 {
        return Err(GravityError::Input(
            "Domain splits must be >= 1 on every axis".to_string(),
        ));
    }

    let bx: Vec<f64> = strata.iter().flat_map(|s| [s.start_x, s.end_x]).collect();
    let by: Vec<f64> = strata.iter().flat_map(|s| [s.start_y, s.end_y]).collect();
    let bz: Vec<f64> = strata.iter().flat_map(|s| [s.start_z, s.end_z]).collect();

    let xs = axis_points(domain.start_x, domain.end_x, domain.splits_x, &bx);
    let ys = axis_points(domain.start_y, domain.end_y, domain.splits_y, &by);
    let zs = axis_points(domain.start_z, domain.end_z, domain.splits_z, &bz);

    let mut octree = Octree::new(domain);
    for &stratum in strata {
        octree.insert(stratum);
    }

    let mut cells = Vec::with_capacity((xs.len() - 1) * (ys.len() - 1) * (zs.len() - 1));
    for xw in xs.windows(2) {
        for yw in ys.windows(2) {
            for zw in zs.windows(2) {
                let center_x = 0.5 * (xw[0] + xw[1]);
                let center_y = 0.5 * (yw[0] + yw[1]);
                let center_z = 0.5 * (zw[0] + zw[1]);
                let density = octree
                    .find_density(center_x, center_y, center_z)
                    .unwrap_or(domain.base_density);
                cells.push(Cell {
                    center_x,
                    center_y,
                    center_z,
                    bound_x: 0.5 * (xw[1] - xw[0]),
                    bound_y: 0.5 * (yw[1] - yw[0]),
                    bound_z: 0.5 * (zw[1] - zw[0]),
                    density,
                    level: 0,
                });
            }
        }
    }

    let mesh = Mesh::new(cells);
    mesh.validate()?;
    Ok(mesh)
}

/// Build the starting inversion mesh under the sensor grid footprint.
///
/// The mesh spans the sensor grid in x and y and `depth` downward from the
/// sensor plane, with every cell at `start_density` and level 0.
pub fn mesh_from_sensors_grid(
    grid: &SensorsGrid,
    options: &InitialMeshOptions,
    start_density: f64,
) -> GravityResult<Mesh> {
    if options.splits_x == 0 || options.splits_y == 0 || options.splits_z == 0 {
        return Err(GravityError::Input(
            "Initial mesh splits must be >= 1 on every axis".to_string(),
        ));
    }
    if options.depth <= 0.0 || !options.depth.is_finite() {
        return Err(GravityError::Input(format!(
            "Initial mesh depth must be positive and finite, got {}",
            options.depth
        )));
    }

    let size_x = grid.extent_x() / options.splits_x as f64;
    let size_y = grid.extent_y() / options.splits_y as f64;
    let size_z = options.depth / options.splits_z as f64;
    let origin_x = grid.start_x.min(grid.end_x);
    let origin_y = grid.start_y.min(grid.end_y);

    let mut cells = Vec::with_capacity(options.splits_x * options.splits_y * options.splits_z);
    for ix in 0..options.splits_x {
        for iy in 0..options.splits_y {
            for iz in 0..options.splits_z {
                cells.push(Cell {
                    center_x: origin_x + (ix as f64 + 0.5) * size_x,
                    center_y: origin_y + (iy as f64 + 0.5) * size_y,
                    center_z: grid.z - (iz as f64 + 0.5) * size_z,
                    bound_x: 0.5 * size_x,
                    bound_y: 0.5 * size_y,
                    bound_z: 0.5 * size_z,
                    density: start_density,
                    level: 0,
                });
            }
        }
    }

    let mesh = Mesh::new(cells);
    mesh.validate()?;
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_domain() -> Domain {
        Domain {
            start_x: 0.0,
            end_x: 10.0,
            splits_x: 2,
            start_y: 0.0,
            end_y: 10.0,
            splits_y: 2,
            start_z: -10.0,
            end_z: 0.0,
            splits_z: 2,
            base_density: 2670.0,
        }
    }

    #[test]
    fn test_domain_mesh_fills_volume_without_overlap() {
        let mesh = mesh_from_domain(&test_domain(), &[]).unwrap();
        assert_eq!(mesh.len(), 8);
        assert!((mesh.total_volume() - 1000.0).abs() < 1e-9);

        // Cells tile the domain: pairwise interiors are disjoint.
        for (i, a) in mesh.cells.iter().enumerate() {
            for b in mesh.cells.iter().skip(i + 1) {
                let overlap_x = (a.center_x - b.center_x).abs() < a.bound_x + b.bound_x - 1e-9;
                let overlap_y = (a.center_y - b.center_y).abs() < a.bound_y + b.bound_y - 1e-9;
                let overlap_z = (a.center_z - b.center_z).abs() < a.bound_z + b.bound_z - 1e-9;
                assert!(!(overlap_x && overlap_y && overlap_z), "Cells {i} overlap");
            }
        }
    }

    #[test]
    fn test_stratum_boundaries_become_cell_faces() {
        let stratum = Stratum {
            start_x: 0.0,
            end_x: 10.0,
            start_y: 0.0,
            end_y: 10.0,
            start_z: -6.5,
            end_z: -3.5,
            density: 3200.0,
        };
        let mesh = mesh_from_domain(&test_domain(), &[stratum]).unwrap();

        // No cell straddles z = -6.5 or z = -3.5.
        for cell in &mesh.cells {
            let (z0, z1) = cell.z_range();
            for boundary in [-6.5, -3.5] {
                assert!(
                    z1 <= boundary + 1e-9 || z0 >= boundary - 1e-9,
                    "Cell [{z0}, {z1}] straddles {boundary}"
                );
            }
        }
        // Cells inside the slab carry its density, outside the base.
        for cell in &mesh.cells {
            if cell.center_z > -6.5 && cell.center_z < -3.5 {
                assert_eq!(cell.density, 3200.0);
            } else {
                assert_eq!(cell.density, 2670.0);
            }
        }
        assert!((mesh.total_volume() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_domain_mesh_rejects_zero_splits() {
        let mut domain = test_domain();
        domain.splits_z = 0;
        assert!(mesh_from_domain(&domain, &[]).is_err());
    }

    #[test]
    fn test_sensors_grid_mesh_shape() {
        let grid = SensorsGrid {
            start_x: -5.0,
            end_x: 5.0,
            splits_x: 4,
            start_y: -5.0,
            end_y: 5.0,
            splits_y: 4,
            z: 0.0,
        };
        let options = InitialMeshOptions {
            splits_x: 2,
            splits_y: 2,
            splits_z: 3,
            depth: 9.0,
        };
        let mesh = mesh_from_sensors_grid(&grid, &options, 0.0).unwrap();

        assert_eq!(mesh.len(), 12);
        assert!((mesh.total_volume() - 10.0 * 10.0 * 9.0).abs() < 1e-9);
        for cell in &mesh.cells {
            assert_eq!(cell.density, 0.0);
            assert_eq!(cell.level, 0);
            assert!(cell.center_z < 0.0 && cell.center_z > -9.0);
            // Half-extents are half the cell pitch: 10 / 2 splits / 2 in x,
            // 9 / 3 splits / 2 in z.
            assert!((cell.bound_x - 2.5).abs() < 1e-12);
            assert!((cell.bound_y - 2.5).abs() < 1e-12);
            assert!((cell.bound_z - 1.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_sensors_grid_mesh_rejects_bad_depth() {
        let grid = SensorsGrid {
            start_x: 0.0,
            end_x: 1.0,
            splits_x: 1,
            start_y: 0.0,
            end_y: 1.0,
            splits_y: 1,
            z: 0.0,
        };
        let options = InitialMeshOptions { depth: 0.0, ..Default::default() };
        assert!(mesh_from_sensors_grid(&grid, &options, 0.0).is_err());
    }
}
