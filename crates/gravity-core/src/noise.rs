// ─────────────────────────────────────────────────────────────────────
// SCPN Gravity Core — Density Noise Injection
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Gaussian perturbation of mesh densities for synthetic-data studies.

use gravity_types::error::{GravityError, GravityResult};
use gravity_types::state::Mesh;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Perturb every cell density with zero-mean Gaussian noise whose standard
/// deviation is `percentage` percent of that cell's density magnitude.
///
/// Zero-density cells are left untouched. Densities are not clamped; noise
/// may drive them negative.
pub fn add_gaussian_noise<R: Rng>(
    mesh: &mut Mesh,
    percentage: f64,
    rng: &mut R,
) -> GravityResult<()> {
    if !(0.0..=100.0).contains(&percentage) || !percentage.is_finite() {
        return Err(GravityError::Input(format!(
            "Noise percentage must lie in [0, 100], got {percentage}"
        )));
    }
    if percentage == 0.0 {
        return Ok(());
    }

    for cell in &mut mesh.cells {
        let sigma = cell.density.abs() * percentage / 100.0;
        if sigma == 0.0 {
            continue;
        }
        let normal = Normal::new(0.0, sigma)
            .map_err(|e| GravityError::Input(format!("Invalid noise distribution: {e}")))?;
        cell.density += normal.sample(rng);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gravity_types::state::Cell;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn mesh_with_densities(densities: &[f64]) -> Mesh {
        Mesh::new(
            densities
                .iter()
                .map(|&density| Cell {
                    center_x: 0.0,
                    center_y: 0.0,
                    center_z: -1.0,
                    bound_x: 1.0,
                    bound_y: 1.0,
                    bound_z: 1.0,
                    density,
                    level: 0,
                })
                .collect(),
        )
    }

    #[test]
    fn test_zero_percentage_is_identity() {
        let mut mesh = mesh_with_densities(&[100.0, -50.0, 0.0]);
        let mut rng = StdRng::seed_from_u64(7);
        add_gaussian_noise(&mut mesh, 0.0, &mut rng).unwrap();
        assert_eq!(mesh.densities(), vec![100.0, -50.0, 0.0]);
    }

    #[test]
    fn test_zero_density_cells_stay_zero() {
        let mut mesh = mesh_with_densities(&[0.0, 2000.0]);
        let mut rng = StdRng::seed_from_u64(7);
        add_gaussian_noise(&mut mesh, 10.0, &mut rng).unwrap();
        assert_eq!(mesh.cells[0].density, 0.0);
        assert_ne!(mesh.cells[1].density, 2000.0);
    }

    #[test]
    fn test_noise_scale_tracks_percentage() {
        // Sample statistics over many cells: the empirical sigma of the
        // relative perturbation must land near the requested percentage.
        let densities = vec![1000.0; 4000];
        let mut mesh = mesh_with_densities(&densities);
        let mut rng = StdRng::seed_from_u64(42);
        add_gaussian_noise(&mut mesh, 5.0, &mut rng).unwrap();

        let deltas: Vec<f64> = mesh.densities().iter().map(|d| d - 1000.0).collect();
        let mean = deltas.iter().sum::<f64>() / deltas.len() as f64;
        let var =
            deltas.iter().map(|d| (d - mean) * (d - mean)).sum::<f64>() / deltas.len() as f64;
        let sigma = var.sqrt();

        assert!(mean.abs() < 5.0, "Sample mean drifted: {mean}");
        assert!(
            (sigma - 50.0).abs() < 5.0,
            "Sample sigma {sigma} far from requested 50"
        );
    }

    #[test]
    fn test_rejects_out_of_range_percentage() {
        let mut mesh = mesh_with_densities(&[100.0]);
        let mut rng = StdRng::seed_from_u64(7);
        assert!(add_gaussian_noise(&mut mesh, -1.0, &mut rng).is_err());
        assert!(add_gaussian_noise(&mut mesh, 150.0, &mut rng).is_err());
    }
}
