// ─────────────────────────────────────────────────────────────────────
// SCPN Gravity Core — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};

use crate::error::{GravityError, GravityResult};

/// Axis-aligned rectangular prism cell.
///
/// `center_*` is the prism midpoint, `bound_*` are the half-extents along
/// each axis. Invariant: half-extents are strictly positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub center_x: f64,
    pub center_y: f64,
    pub center_z: f64,
    pub bound_x: f64,
    pub bound_y: f64,
    pub bound_z: f64,
    pub density: f64,
    /// Subdivision depth relative to the initial mesh (0 for initial cells).
    #[serde(default)]
    pub level: u32,
}

impl Cell {
    /// Geometric volume of the prism (half-extents span half the edge).
    pub fn volume(&self) -> f64 {
        8.0 * self.bound_x * self.bound_y * self.bound_z
    }

    pub fn x_range(&self) -> (f64, f64) {
        (self.center_x - self.bound_x, self.center_x + self.bound_x)
    }

    pub fn y_range(&self) -> (f64, f64) {
        (self.center_y - self.bound_y, self.center_y + self.bound_y)
    }

    pub fn z_range(&self) -> (f64, f64) {
        (self.center_z - self.bound_z, self.center_z + self.bound_z)
    }

    /// Distance from the cell center to a point.
    pub fn distance_to(&self, x: f64, y: f64, z: f64) -> f64 {
        let dx = x - self.center_x;
        let dy = y - self.center_y;
        let dz = z - self.center_z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Length of the half-extent diagonal, used as the cell size scale.
    pub fn half_diagonal(&self) -> f64 {
        (self.bound_x * self.bound_x + self.bound_y * self.bound_y + self.bound_z * self.bound_z)
            .sqrt()
    }
}

/// Ordered collection of cells; the single mutable artifact of an
/// inversion run. Cell count changes between iterations under refinement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub cells: Vec<Cell>,
}

impl Mesh {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn total_volume(&self) -> f64 {
        self.cells.iter().map(Cell::volume).sum()
    }

    pub fn densities(&self) -> Vec<f64> {
        self.cells.iter().map(|c| c.density).collect()
    }

    /// Write solver output back into the cells, index-aligned.
    pub fn set_densities(&mut self, densities: &[f64]) -> GravityResult<()> {
        if densities.len() != self.cells.len() {
            return Err(GravityError::Input(format!(
                "Density vector length mismatch: cells={}, densities={}",
                self.cells.len(),
                densities.len()
            )));
        }
        for (cell, &rho) in self.cells.iter_mut().zip(densities.iter()) {
            cell.density = rho;
        }
        Ok(())
    }

    /// Check the positive half-extent invariant over every cell.
    pub fn validate(&self) -> GravityResult<()> {
        for (idx, cell) in self.cells.iter().enumerate() {
            if cell.bound_x <= 0.0 || cell.bound_y <= 0.0 || cell.bound_z <= 0.0 {
                return Err(GravityError::Input(format!(
                    "Cell {idx} has non-positive half-extents: ({}, {}, {})",
                    cell.bound_x, cell.bound_y, cell.bound_z
                )));
            }
            if !cell.density.is_finite() {
                return Err(GravityError::Input(format!(
                    "Cell {idx} has non-finite density: {}",
                    cell.density
                )));
            }
        }
        Ok(())
    }
}

/// Fixed observation point with an observed anomaly value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub value: f64,
}

/// Regular sensor layout on a horizontal plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorsGrid {
    pub start_x: f64,
    pub end_x: f64,
    pub splits_x: usize,
    pub start_y: f64,
    pub end_y: f64,
    pub splits_y: usize,
    #[serde(default)]
    pub z: f64,
}

impl SensorsGrid {
    /// Generate `(splits_x + 1) × (splits_y + 1)` sensors at grid nodes,
    /// all with zero observed value.
    pub fn build_sensors(&self) -> GravityResult<Vec<Sensor>> {
        if self.splits_x == 0 || self.splits_y == 0 {
            return Err(GravityError::Input(
                "Sensor grid splits must be >= 1 on both axes".to_string(),
            ));
        }
        let step_x = (self.end_x - self.start_x) / self.splits_x as f64;
        let step_y = (self.end_y - self.start_y) / self.splits_y as f64;

        let mut sensors = Vec::with_capacity((self.splits_x + 1) * (self.splits_y + 1));
        for ix in 0..=self.splits_x {
            for iy in 0..=self.splits_y {
                sensors.push(Sensor {
                    x: self.start_x + ix as f64 * step_x,
                    y: self.start_y + iy as f64 * step_y,
                    z: self.z,
                    value: 0.0,
                });
            }
        }
        Ok(sensors)
    }

    pub fn extent_x(&self) -> f64 {
        (self.end_x - self.start_x).abs()
    }

    pub fn extent_y(&self) -> f64 {
        (self.end_y - self.start_y).abs()
    }
}

/// Computational domain bounds plus base split counts per axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    pub start_x: f64,
    pub end_x: f64,
    pub splits_x: usize,
    pub start_y: f64,
    pub end_y: f64,
    pub splits_y: usize,
    pub start_z: f64,
    pub end_z: f64,
    pub splits_z: usize,
    pub base_density: f64,
}

/// Rectangular geological layer with a constant density.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stratum {
    pub start_x: f64,
    pub end_x: f64,
    pub start_y: f64,
    pub end_y: f64,
    pub start_z: f64,
    pub end_z: f64,
    pub density: f64,
}

impl Stratum {
    pub fn contains(&self, x: f64, y: f64, z: f64) -> bool {
        x >= self.start_x
            && x <= self.end_x
            && y >= self.start_y
            && y <= self.end_y
            && z >= self.start_z
            && z <= self.end_z
    }
}
