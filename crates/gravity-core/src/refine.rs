// ─────────────────────────────────────────────────────────────────────
// SCPN Gravity Core — Adaptive Mesh Refinement
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Residual-driven mesh refinement and sibling merging.
//!
//! Each cell receives a local residual score, a distance-weighted average
//! of the sensor residuals. High-scoring cells split into eight octants;
//! full sibling sets of eight quiet cells recombine into their parent.
//! Both operations preserve total mesh volume exactly.

use std::collections::HashMap;

use gravity_types::config::MeshRefinementOptions;
use gravity_types::error::{GravityError, GravityResult};
use gravity_types::state::{Cell, Mesh, Sensor, SensorsGrid};

/// Distance floor in the residual weighting.
const WEIGHT_EPSILON: f64 = 1e-9;

/// Coordinate quantum for sibling-group hashing.
const KEY_QUANTUM: f64 = 1e-9;

/// Distance-weighted residual score per cell.
///
/// Weight of sensor s for cell c is `1 / (dist(c, s) + ε)`; the score is
/// the weighted average of `|residual|`, so it carries the residual's own
/// units and is directly comparable to the thresholds.
pub fn local_residuals(
    mesh: &Mesh,
    sensors: &[Sensor],
    residuals: &[f64],
) -> GravityResult<Vec<f64>> {
    if sensors.len() != residuals.len() {
        return Err(GravityError::Input(format!(
            "Residual length mismatch: sensors={}, residuals={}",
            sensors.len(),
            residuals.len()
        )));
    }
    if sensors.is_empty() {
        return Err(GravityError::Input(
            "Sensor list must be non-empty".to_string(),
        ));
    }

    Ok(mesh
        .cells
        .iter()
        .map(|cell| {
            let mut weighted = 0.0;
            let mut total_weight = 0.0;
            for (sensor, &r) in sensors.iter().zip(residuals.iter()) {
                let w = 1.0 / (cell.distance_to(sensor.x, sensor.y, sensor.z) + WEIGHT_EPSILON);
                weighted += w * r.abs();
                total_weight += w;
            }
            weighted / total_weight
        })
        .collect())
}

/// Eight octant children of a cell: halved half-extents, centers offset by
/// half the child extent, density inherited, level incremented.
fn split_cell(cell: &Cell) -> [Cell; 8] {
    let bx = 0.5 * cell.bound_x;
    let by = 0.5 * cell.bound_y;
    let bz = 0.5 * cell.bound_z;
    std::array::from_fn(|octant| {
        let sx = if octant & 1 == 0 { -1.0 } else { 1.0 };
        let sy = if octant & 2 == 0 { -1.0 } else { 1.0 };
        let sz = if octant & 4 == 0 { -1.0 } else { 1.0 };
        Cell {
            center_x: cell.center_x + sx * bx,
            center_y: cell.center_y + sy * by,
            center_z: cell.center_z + sz * bz,
            bound_x: bx,
            bound_y: by,
            bound_z: bz,
            density: cell.density,
            level: cell.level + 1,
        }
    })
}

fn quantize(v: f64) -> i64 {
    (v / KEY_QUANTUM).round() as i64
}

/// Hash key of a candidate parent center. Bounds participate so only
/// same-size siblings can group.
type ParentKey = (i64, i64, i64, i64, i64, i64);

fn parent_key(x: f64, y: f64, z: f64, bx: f64, by: f64, bz: f64) -> ParentKey {
    (
        quantize(x),
        quantize(y),
        quantize(z),
        quantize(bx),
        quantize(by),
        quantize(bz),
    )
}

/// Vertical extent of the mesh bounding box.
fn mesh_extent_z(mesh: &Mesh) -> f64 {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for cell in &mesh.cells {
        let (z0, z1) = cell.z_range();
        lo = lo.min(z0);
        hi = hi.max(z1);
    }
    if lo.is_finite() && hi.is_finite() {
        hi - lo
    } else {
        0.0
    }
}

/// One refinement pass over the mesh.
///
/// Thresholds decay geometrically with the iteration number, so the mesh
/// keeps adapting as the residual shrinks. Returns the rebuilt mesh;
/// splits replace a cell in place with its eight children, merges replace
/// the first-encountered sibling with the recombined parent.
pub fn refine_mesh(
    mesh: &Mesh,
    sensors: &[Sensor],
    residuals: &[f64],
    options: &MeshRefinementOptions,
    iteration: usize,
    grid: &SensorsGrid,
) -> GravityResult<Mesh> {
    if mesh.is_empty() {
        return Err(GravityError::Input(
            "Mesh must contain at least one cell".to_string(),
        ));
    }
    let local = local_residuals(mesh, sensors, residuals)?;
    let max_local = local.iter().fold(0.0_f64, |acc, &v| acc.max(v));

    let decay = options.threshold_decay.powi(iteration as i32);
    let threshold_refine = options.residual_threshold_refine * decay;
    let threshold_merge = options.residual_threshold_merge * decay;

    let extent_x = grid.extent_x();
    let extent_y = grid.extent_y();
    let extent_z = mesh_extent_z(mesh);
    let influence_radius =
        options.influence_radius_fraction * extent_x.max(extent_y).max(extent_z);

    // Pass 1: group merge candidates by their would-be parent center.
    let mut groups: HashMap<ParentKey, Vec<usize>> = HashMap::new();
    for (idx, cell) in mesh.cells.iter().enumerate() {
        if cell.level == 0 || local[idx] >= threshold_merge {
            continue;
        }
        // The merged full edge is 4x the sibling half-extent.
        if 4.0 * cell.bound_x > options.max_cell_size_fraction * extent_x
            || 4.0 * cell.bound_y > options.max_cell_size_fraction * extent_y
            || 4.0 * cell.bound_z > options.max_cell_size_fraction * extent_z
        {
            continue;
        }
        for octant in 0..8u32 {
            let sx = if octant & 1 == 0 { -1.0 } else { 1.0 };
            let sy = if octant & 2 == 0 { -1.0 } else { 1.0 };
            let sz = if octant & 4 == 0 { -1.0 } else { 1.0 };
            let key = parent_key(
                cell.center_x + sx * cell.bound_x,
                cell.center_y + sy * cell.bound_y,
                cell.center_z + sz * cell.bound_z,
                cell.bound_x,
                cell.bound_y,
                cell.bound_z,
            );
            groups.entry(key).or_default().push(idx);
        }
    }

    // A true sibling set shares exactly one candidate center, eight ways.
    let mut merge_parent: HashMap<usize, ParentKey> = HashMap::new();
    let mut parents: HashMap<ParentKey, Vec<usize>> = HashMap::new();
    for (key, members) in &groups {
        if members.len() != 8 {
            continue;
        }
        // Sensor safety: a loud sensor near the parent vetoes the merge.
        let px = members
            .iter()
            .map(|&i| mesh.cells[i].center_x)
            .sum::<f64>()
            / 8.0;
        let py = members
            .iter()
            .map(|&i| mesh.cells[i].center_y)
            .sum::<f64>()
            / 8.0;
        let pz = members
            .iter()
            .map(|&i| mesh.cells[i].center_z)
            .sum::<f64>()
            / 8.0;
        let vetoed = sensors.iter().zip(residuals.iter()).any(|(s, &r)| {
            let dx = s.x - px;
            let dy = s.y - py;
            let dz = s.z - pz;
            (dx * dx + dy * dy + dz * dz).sqrt() < influence_radius && r.abs() > threshold_merge
        });
        if vetoed {
            continue;
        }
        if members.iter().any(|i| merge_parent.contains_key(i)) {
            continue;
        }
        for &i in members {
            merge_parent.insert(i, *key);
        }
        parents.insert(*key, members.clone());
    }

    // Pass 2: rebuild the cell list.
    let mut emitted: HashMap<ParentKey, bool> = HashMap::new();
    let mut cells = Vec::with_capacity(mesh.len());
    for (idx, cell) in mesh.cells.iter().enumerate() {
        if let Some(key) = merge_parent.get(&idx) {
            if !emitted.get(key).copied().unwrap_or(false) {
                emitted.insert(*key, true);
                let members = &parents[key];
                let density =
                    members.iter().map(|&i| mesh.cells[i].density).sum::<f64>() / 8.0;
                let sample = &mesh.cells[members[0]];
                let px =
                    members.iter().map(|&i| mesh.cells[i].center_x).sum::<f64>() / 8.0;
                let py =
                    members.iter().map(|&i| mesh.cells[i].center_y).sum::<f64>() / 8.0;
                let pz =
                    members.iter().map(|&i| mesh.cells[i].center_z).sum::<f64>() / 8.0;
                cells.push(Cell {
                    center_x: px,
                    center_y: py,
                    center_z: pz,
                    bound_x: 2.0 * sample.bound_x,
                    bound_y: 2.0 * sample.bound_y,
                    bound_z: 2.0 * sample.bound_z,
                    density,
                    level: sample.level.saturating_sub(1),
                });
            }
            continue;
        }

        // Size guards compare full cell edges against the extent fractions,
        // matching the merge guard above.
        let splittable = cell.level < options.max_subdivision_level
            && 2.0 * cell.bound_x > options.min_cell_size_fraction * extent_x
            && 2.0 * cell.bound_y > options.min_cell_size_fraction * extent_y
            && 2.0 * cell.bound_z > options.min_cell_size_fraction * extent_z;
        if splittable
            && local[idx] > threshold_refine
            && local[idx] > options.max_residual_fraction * max_local
        {
            cells.extend(split_cell(cell));
        } else {
            cells.push(cell.clone());
        }
    }

    let refined = Mesh::new(cells);
    refined.validate()?;
    Ok(refined)
}
