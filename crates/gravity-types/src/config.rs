// ─────────────────────────────────────────────────────────────────────
// SCPN Gravity Core — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::GravityResult;

/// Gauss-Newton regularization and stopping parameters.
///
/// Treated as an immutable value per run; the controller works on a local
/// copy when smoothing is activated mid-run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InverseOptions {
    /// Terminal functional ratio: converged once
    /// `functional / initial_functional` drops below this.
    #[serde(default = "default_functional_threshold")]
    pub functional_threshold: f64,
    /// Initial Tikhonov regularization coefficient.
    #[serde(default = "default_lambda")]
    pub lambda: f64,
    /// Lower bound for the decayed lambda.
    #[serde(default = "default_min_lambda")]
    pub min_lambda: f64,
    /// Per-iteration lambda decay factor (0.9 = 10% reduction each step).
    #[serde(default = "default_lambda_decay")]
    pub lambda_decay: f64,
    /// Apply the `lambda * decay^iteration` schedule.
    #[serde(default = "default_true")]
    pub auto_adjust_regularization: bool,
    /// First-order (amplitude) Tikhonov damping on the normal-matrix diagonal.
    #[serde(default = "default_true")]
    pub use_tikhonov_first_order: bool,
    /// Second-order (smoothing) Tikhonov term on high-curvature parameters.
    #[serde(default)]
    pub use_tikhonov_second_order: bool,
    /// Discrete-curvature magnitude above which the smoothing term applies.
    #[serde(default = "default_gradient_threshold")]
    pub gradient_threshold: f64,
    /// Scale applied to lambda for the second-order diagonal contribution.
    #[serde(default = "default_second_order_multiplier")]
    pub second_order_multiplier: f64,
    /// Fraction of the initial functional under which smoothing activates.
    #[serde(default = "default_smoothing_activation_fraction")]
    pub smoothing_activation_fraction: f64,
    /// Relative functional change under which the run is declared stalled.
    #[serde(default = "default_relative_tolerance")]
    pub relative_tolerance: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Optional wall-clock budget, checked at iteration boundaries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_budget_seconds: Option<f64>,
}

fn default_functional_threshold() -> f64 {
    1e-4
}
fn default_lambda() -> f64 {
    1e-6
}
fn default_min_lambda() -> f64 {
    1e-12
}
fn default_lambda_decay() -> f64 {
    0.9
}
fn default_true() -> bool {
    true
}
fn default_gradient_threshold() -> f64 {
    5.0
}
fn default_second_order_multiplier() -> f64 {
    1.0
}
fn default_smoothing_activation_fraction() -> f64 {
    0.1
}
fn default_relative_tolerance() -> f64 {
    1e-6
}
fn default_max_iterations() -> usize {
    100
}

impl Default for InverseOptions {
    fn default() -> Self {
        Self {
            functional_threshold: default_functional_threshold(),
            lambda: default_lambda(),
            min_lambda: default_min_lambda(),
            lambda_decay: default_lambda_decay(),
            auto_adjust_regularization: true,
            use_tikhonov_first_order: true,
            use_tikhonov_second_order: false,
            gradient_threshold: default_gradient_threshold(),
            second_order_multiplier: default_second_order_multiplier(),
            smoothing_activation_fraction: default_smoothing_activation_fraction(),
            relative_tolerance: default_relative_tolerance(),
            max_iterations: default_max_iterations(),
            time_budget_seconds: None,
        }
    }
}

impl InverseOptions {
    pub fn from_file(path: &str) -> GravityResult<Self> {
        from_json_file(path)
    }
}

/// Adaptive refine/merge thresholds and cell-size bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshRefinementOptions {
    /// Maximum subdivision depth relative to the initial mesh.
    #[serde(default = "default_max_subdivision_level")]
    pub max_subdivision_level: u32,
    /// Smallest refinable cell edge, as a fraction of the domain extent.
    #[serde(default = "default_min_cell_size_fraction")]
    pub min_cell_size_fraction: f64,
    /// Largest mergeable cell edge, as a fraction of the domain extent.
    #[serde(default = "default_max_cell_size_fraction")]
    pub max_cell_size_fraction: f64,
    /// Local residual above which a cell is split.
    #[serde(default = "default_residual_threshold_refine")]
    pub residual_threshold_refine: f64,
    /// Local residual below which sibling cells may merge.
    #[serde(default = "default_residual_threshold_merge")]
    pub residual_threshold_merge: f64,
    /// Geometric per-iteration decay applied to both thresholds.
    #[serde(default = "default_threshold_decay")]
    pub threshold_decay: f64,
    /// A cell must also carry at least this fraction of the worst local
    /// residual to be split.
    #[serde(default = "default_max_residual_fraction")]
    pub max_residual_fraction: f64,
    /// Merge safety radius, as a fraction of the sensor-grid extent.
    #[serde(default = "default_influence_radius_fraction")]
    pub influence_radius_fraction: f64,
    /// Relative functional improvement under which the controller invokes
    /// the refiner for that iteration.
    #[serde(default = "default_improvement_trigger")]
    pub improvement_trigger: f64,
}

fn default_max_subdivision_level() -> u32 {
    5
}
fn default_min_cell_size_fraction() -> f64 {
    0.1
}
fn default_max_cell_size_fraction() -> f64 {
    0.5
}
fn default_residual_threshold_refine() -> f64 {
    1e-6
}
fn default_residual_threshold_merge() -> f64 {
    1e-8
}
fn default_threshold_decay() -> f64 {
    0.9
}
fn default_max_residual_fraction() -> f64 {
    0.5
}
fn default_influence_radius_fraction() -> f64 {
    0.25
}
fn default_improvement_trigger() -> f64 {
    0.05
}

impl Default for MeshRefinementOptions {
    fn default() -> Self {
        Self {
            max_subdivision_level: default_max_subdivision_level(),
            min_cell_size_fraction: default_min_cell_size_fraction(),
            max_cell_size_fraction: default_max_cell_size_fraction(),
            residual_threshold_refine: default_residual_threshold_refine(),
            residual_threshold_merge: default_residual_threshold_merge(),
            threshold_decay: default_threshold_decay(),
            max_residual_fraction: default_max_residual_fraction(),
            influence_radius_fraction: default_influence_radius_fraction(),
            improvement_trigger: default_improvement_trigger(),
        }
    }
}

impl MeshRefinementOptions {
    pub fn from_file(path: &str) -> GravityResult<Self> {
        from_json_file(path)
    }
}

/// Initial inversion-mesh shape when built from the sensor grid footprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialMeshOptions {
    #[serde(default = "default_splits_xy")]
    pub splits_x: usize,
    #[serde(default = "default_splits_xy")]
    pub splits_y: usize,
    #[serde(default = "default_splits_z")]
    pub splits_z: usize,
    /// Mesh depth below the sensor plane, downward along -Z.
    #[serde(default = "default_depth")]
    pub depth: f64,
}

fn default_splits_xy() -> usize {
    15
}
fn default_splits_z() -> usize {
    10
}
fn default_depth() -> f64 {
    10.0
}

impl Default for InitialMeshOptions {
    fn default() -> Self {
        Self {
            splits_x: default_splits_xy(),
            splits_y: default_splits_xy(),
            splits_z: default_splits_z(),
            depth: default_depth(),
        }
    }
}

/// Load any options model from a JSON file.
pub fn from_json_file<T: DeserializeOwned>(path: &str) -> GravityResult<T> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
