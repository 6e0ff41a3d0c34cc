// ─────────────────────────────────────────────────────────────────────
// SCPN Gravity Core — Jacobian Assembly
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Sensitivity matrix of the anomaly map with respect to cell densities.
//!
//! The forward model is linear in density, so the analytic Jacobian column
//! for a cell is the cell's anomaly at unit density excess. Distant cells
//! may optionally be collapsed to point masses, trading a negligible error
//! for a much cheaper kernel.

use gravity_types::constants::{GRAVITATIONAL_CONSTANT, MIN_DISTANCE};
use gravity_types::error::{GravityError, GravityResult};
use gravity_types::state::{Cell, Mesh, Sensor};
use ndarray::parallel::prelude::*;
use ndarray::{Array2, Axis};

use crate::forward::prism_kernel;

/// Kernel selection per sensor-cell pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JacobianMode {
    /// Analytic prism kernel everywhere.
    #[default]
    Analytic,
    /// Point-mass kernel beyond `far_field_ratio` cell diagonals.
    FarFieldPointMass,
}

#[derive(Debug, Clone, Copy)]
pub struct JacobianConfig {
    pub mode: JacobianMode,
    /// Sensor-cell distance beyond which the point-mass kernel applies,
    /// in units of the cell half-diagonal.
    pub far_field_ratio: f64,
    /// Distance floor guarding the point-mass kernel near coincidence.
    pub min_distance: f64,
}

impl Default for JacobianConfig {
    fn default() -> Self {
        Self {
            mode: JacobianMode::Analytic,
            far_field_ratio: 4.0,
            min_distance: MIN_DISTANCE,
        }
    }
}

impl JacobianConfig {
    pub fn validate(&self) -> GravityResult<()> {
        if self.far_field_ratio <= 0.0 || !self.far_field_ratio.is_finite() {
            return Err(GravityError::Config(format!(
                "far_field_ratio must be positive and finite, got {}",
                self.far_field_ratio
            )));
        }
        if self.min_distance <= 0.0 || !self.min_distance.is_finite() {
            return Err(GravityError::Config(format!(
                "min_distance must be positive and finite, got {}",
                self.min_distance
            )));
        }
        Ok(())
    }
}

/// Derivative of the anomaly at `sensor` with respect to the density of
/// `cell`, under the configured kernel.
fn sensitivity(sensor: &Sensor, cell: &Cell, config: &JacobianConfig) -> f64 {
    if config.mode == JacobianMode::FarFieldPointMass {
        let r = cell
            .distance_to(sensor.x, sensor.y, sensor.z)
            .max(config.min_distance);
        if r > config.far_field_ratio * cell.half_diagonal() {
            // Vertical component of the point-mass attraction.
            let dz = (sensor.z - cell.center_z).abs();
            return GRAVITATIONAL_CONSTANT * cell.volume() * dz / (r * r * r);
        }
    }
    let (x0, x1) = cell.x_range();
    let (y0, y1) = cell.y_range();
    let (z0, z1) = cell.z_range();
    GRAVITATIONAL_CONSTANT * prism_kernel(sensor.x, sensor.y, sensor.z, x0, x1, y0, y1, z0, z1)
}

/// Assemble the m×n Jacobian (m sensors, n cells).
///
/// Columns are independent; assembly is parallel across them.
pub fn build_jacobian(
    mesh: &Mesh,
    sensors: &[Sensor],
    config: &JacobianConfig,
) -> GravityResult<Array2<f64>> {
    config.validate()?;
    if sensors.is_empty() {
        return Err(GravityError::Input(
            "Sensor list must be non-empty".to_string(),
        ));
    }
    if mesh.is_empty() {
        return Err(GravityError::Input(
            "Mesh must contain at least one cell".to_string(),
        ));
    }

    let mut jacobian = Array2::zeros((sensors.len(), mesh.len()));
    jacobian
        .axis_iter_mut(Axis(1))
        .into_par_iter()
        .enumerate()
        .for_each(|(col, mut column)| {
            let cell = &mesh.cells[col];
            for (row, sensor) in sensors.iter().enumerate() {
                column[row] = sensitivity(sensor, cell, config);
            }
        });
    Ok(jacobian)
}
