// ─────────────────────────────────────────────────────────────────────
// SCPN Gravity Core — Forward Gravitational Anomaly
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Closed-form gravitational anomaly of a prism mesh at surface sensors.
//!
//! The per-cell kernel integrates Newton's law over an axis-aligned
//! rectangular prism: the y and z integrals are evaluated analytically via
//! `asinh` antiderivatives at the prism corners, while the x axis is
//! integrated with a midpoint rule for stability near the corner
//! singularities.

use gravity_types::constants::GRAVITATIONAL_CONSTANT;
use gravity_types::error::{GravityError, GravityResult};
use gravity_types::state::{Cell, Mesh, Sensor};
use rayon::prelude::*;

/// Midpoint-rule subintervals along the x axis of the prism.
const INTEGRAL_SUBINTERVALS: usize = 25;

/// Geometric prism kernel at unit density excess, before the
/// gravitational-constant scale.
///
/// `(sx, sy, sz)` is the receiver, `[x0, x1] × [y0, y1] × [z0, z1]` the
/// prism. A receiver coincident with a prism edge makes the corner ratio
/// non-finite; such corners contribute zero instead of propagating NaN.
pub fn prism_kernel(
    sx: f64,
    sy: f64,
    sz: f64,
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
    z0: f64,
    z1: f64,
) -> f64 {
    let n = INTEGRAL_SUBINTERVALS;
    let h = (x1 - x0) / n as f64;

    let corner = |w: f64, y: f64, z: f64| -> f64 {
        let dx = sx - w;
        let dz = sz - z;
        let rho = (dx * dx + dz * dz).sqrt();
        let ratio = (sy - y) / rho;
        if ratio.is_finite() {
            ratio.asinh()
        } else {
            0.0
        }
    };

    let mut result = 0.0;
    for i in 0..n {
        let w = x0 + h * (i as f64 + 0.5);
        result += corner(w, y0, z1) - corner(w, y1, z1) - corner(w, y0, z0) + corner(w, y1, z0);
    }
    result * h
}

/// Anomaly of a single cell's density excess at one sensor.
pub fn cell_anomaly(sensor: &Sensor, cell: &Cell, base_density: f64) -> f64 {
    let (x0, x1) = cell.x_range();
    let (y0, y1) = cell.y_range();
    let (z0, z1) = cell.z_range();

    GRAVITATIONAL_CONSTANT
        * (cell.density - base_density)
        * prism_kernel(sensor.x, sensor.y, sensor.z, x0, x1, y0, y1, z0, z1)
}

/// Evaluate the full anomaly map, one value per sensor.
///
/// Sensors are independent; evaluation is parallel across them. The
/// result index matches the sensor index.
pub fn evaluate(mesh: &Mesh, sensors: &[Sensor], base_density: f64) -> GravityResult<Vec<f64>> {
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

    Ok(sensors
        .par_iter()
        .map(|sensor| {
            mesh.cells
                .iter()
                .map(|cell| cell_anomaly(sensor, cell, base_density))
                .sum()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell_at(cz: f64, b: f64, density: f64) -> Cell {
        Cell {
            center_x: 0.0,
            center_y: 0.0,
            center_z: cz,
            bound_x: b,
            bound_y: b,
            bound_z: b,
            density,
            level: 0,
        }
    }

    fn sensor_at(x: f64, y: f64, z: f64) -> Sensor {
        Sensor { x, y, z, value: 0.0 }
    }

    #[test]
    fn test_zero_density_excess_gives_zero_anomalies() {
        let mesh = Mesh::new(vec![cell_at(-5.0, 1.0, 2700.0), cell_at(-8.0, 1.5, 2700.0)]);
        let sensors = vec![sensor_at(0.0, 0.0, 0.0), sensor_at(3.0, -2.0, 0.0)];

        let anomalies = evaluate(&mesh, &sensors, 2700.0).unwrap();
        for &a in &anomalies {
            assert_eq!(a, 0.0, "Null model must produce exactly zero anomaly");
        }
    }

    #[test]
    fn test_far_field_approaches_point_mass() {
        // Sensor directly above a unit cell; at 20x the cell size the
        // analytic integral should track G * V / r^2 closely.
        let cell = cell_at(-20.0, 1.0, 1000.0);
        let sensor = sensor_at(0.0, 0.0, 0.0);

        let anomaly = cell_anomaly(&sensor, &cell, 0.0);
        let r = 20.0;
        let point_mass = GRAVITATIONAL_CONSTANT * 1000.0 * cell.volume() / (r * r);

        let rel = (anomaly - point_mass).abs() / point_mass.abs();
        assert!(
            rel < 0.01,
            "Far-field mismatch: analytic={anomaly:e}, point-mass={point_mass:e}, rel={rel:e}"
        );
    }

    #[test]
    fn test_anomaly_linear_in_density_excess() {
        let sensor = sensor_at(1.0, -2.0, 0.0);
        let single = cell_anomaly(&sensor, &cell_at(-4.0, 1.0, 500.0), 0.0);
        let double = cell_anomaly(&sensor, &cell_at(-4.0, 1.0, 1000.0), 0.0);
        assert!((double - 2.0 * single).abs() < double.abs() * 1e-12);
    }

    #[test]
    fn test_sensor_on_cell_corner_stays_finite() {
        // Receiver coincident with the (+1, +1, 0) corner of the cell.
        let cell = cell_at(-1.0, 1.0, 1800.0);
        let sensor = sensor_at(1.0, 1.0, 0.0);

        let anomaly = cell_anomaly(&sensor, &cell, 0.0);
        assert!(
            anomaly.is_finite(),
            "Corner-coincident sensor produced {anomaly}"
        );
    }

    #[test]
    fn test_evaluate_rejects_empty_inputs() {
        let mesh = Mesh::new(vec![cell_at(-5.0, 1.0, 100.0)]);
        assert!(evaluate(&mesh, &[], 0.0).is_err());
        assert!(evaluate(&Mesh::default(), &[sensor_at(0.0, 0.0, 0.0)], 0.0).is_err());
    }

    #[test]
    fn test_evaluate_preserves_sensor_order() {
        let mesh = Mesh::new(vec![cell_at(-5.0, 1.0, 1800.0)]);
        let sensors = vec![
            sensor_at(-5.0, 0.0, 0.0),
            sensor_at(0.0, 0.0, 0.0),
            sensor_at(5.0, 0.0, 0.0),
        ];
        let anomalies = evaluate(&mesh, &sensors, 0.0).unwrap();
        assert_eq!(anomalies.len(), 3);
        // The cell sits under x = 0; the middle sensor must see the
        // strongest signal.
        assert!(anomalies[1] > anomalies[0]);
        assert!(anomalies[1] > anomalies[2]);
        // Symmetric geometry: flanking sensors agree.
        assert!((anomalies[0] - anomalies[2]).abs() < anomalies[1].abs() * 1e-9);
    }
}
