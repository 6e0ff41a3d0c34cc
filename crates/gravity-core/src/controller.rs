// ─────────────────────────────────────────────────────────────────────
// SCPN Gravity Core — Inversion Controller
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Iteration loop driving the Gauss-Newton inversion.
//!
//! Each iteration evaluates the forward model, checks the termination
//! conditions, optionally refines the mesh when progress slows, assembles
//! the Jacobian, and applies one regularized update. The mesh passed in is
//! mutated in place and always holds the last successfully updated model,
//! even when the run ends in an error.

use std::time::Instant;

use gravity_types::config::{InverseOptions, MeshRefinementOptions};
use gravity_types::error::{GravityError, GravityResult};
use gravity_types::state::{Mesh, Sensor, SensorsGrid};
use tracing::{debug, info};

use crate::forward::evaluate;
use crate::jacobian::{build_jacobian, JacobianConfig};
use crate::refine::refine_mesh;
use crate::solver::{effective_lambda, invert};

/// Functional magnitude treated as an exact data fit.
const ZERO_FUNCTIONAL: f64 = 1e-18;

/// Lambda scale applied once when smoothing activates.
const SMOOTHING_LAMBDA_SCALE: f64 = 0.3;

/// Regularization regime of the run. The transition to smoothing is
/// one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegularizationMode {
    AmplitudeOnly,
    AmplitudeAndSmoothing,
}

/// Why the iteration loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Functional dropped below the configured threshold.
    Converged,
    /// Progress fell under the relative tolerance, or the functional
    /// regressed on an unchanged mesh.
    Stalled,
    /// Wall-clock budget exhausted at an iteration boundary.
    TimeExpired,
    MaxIterationsReached,
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct InversionReport {
    pub termination: TerminationReason,
    /// Iterations actually executed.
    pub iterations: usize,
    pub initial_functional: f64,
    pub final_functional: f64,
    /// Functional at the start of every executed iteration.
    pub functional_history: Vec<f64>,
    /// Lambda applied by the last executed solve.
    pub effective_lambda: f64,
    pub elapsed_seconds: f64,
    pub cell_count: usize,
}

/// Range and positivity checks over the stopping and regularization
/// parameters.
pub fn validate_inverse_options(options: &InverseOptions) -> GravityResult<()> {
    if options.lambda < 0.0 || !options.lambda.is_finite() {
        return Err(GravityError::Config(format!(
            "lambda must be non-negative and finite, got {}",
            options.lambda
        )));
    }
    if options.min_lambda < 0.0 || options.min_lambda > options.lambda {
        return Err(GravityError::Config(format!(
            "min_lambda must lie in [0, lambda], got {}",
            options.min_lambda
        )));
    }
    if !(options.lambda_decay > 0.0 && options.lambda_decay <= 1.0) {
        return Err(GravityError::Config(format!(
            "lambda_decay must lie in (0, 1], got {}",
            options.lambda_decay
        )));
    }
    if options.functional_threshold < 0.0 {
        return Err(GravityError::Config(format!(
            "functional_threshold must be non-negative, got {}",
            options.functional_threshold
        )));
    }
    if options.relative_tolerance < 0.0 {
        return Err(GravityError::Config(format!(
            "relative_tolerance must be non-negative, got {}",
            options.relative_tolerance
        )));
    }
    if !(options.smoothing_activation_fraction > 0.0
        && options.smoothing_activation_fraction <= 1.0)
    {
        return Err(GravityError::Config(format!(
            "smoothing_activation_fraction must lie in (0, 1], got {}",
            options.smoothing_activation_fraction
        )));
    }
    if options.max_iterations == 0 {
        return Err(GravityError::Config(
            "max_iterations must be >= 1".to_string(),
        ));
    }
    if let Some(budget) = options.time_budget_seconds {
        if budget < 0.0 || !budget.is_finite() {
            return Err(GravityError::Config(format!(
                "time_budget_seconds must be non-negative and finite, got {budget}"
            )));
        }
    }
    Ok(())
}

/// Gauss-Newton iteration driver with optional adaptive refinement.
pub struct InversionController {
    options: InverseOptions,
    jacobian_config: JacobianConfig,
    refinement: Option<(MeshRefinementOptions, SensorsGrid)>,
}

impl InversionController {
    pub fn new(options: InverseOptions) -> Self {
        Self {
            options,
            jacobian_config: JacobianConfig::default(),
            refinement: None,
        }
    }

    pub fn with_jacobian_config(mut self, config: JacobianConfig) -> Self {
        self.jacobian_config = config;
        self
    }

    /// Enable adaptive refinement between iterations. The sensor grid
    /// supplies the horizontal extents the size limits are relative to.
    pub fn with_refinement(mut self, options: MeshRefinementOptions, grid: SensorsGrid) -> Self {
        self.refinement = Some((options, grid));
        self
    }

    /// Run the inversion until a termination condition fires.
    ///
    /// `mesh` enters as the starting model and leaves holding the final
    /// densities. Observed anomaly values are taken from `sensors[i].value`.
    pub fn run(
        &self,
        mesh: &mut Mesh,
        sensors: &[Sensor],
        base_density: f64,
    ) -> GravityResult<InversionReport> {
        validate_inverse_options(&self.options)?;
        self.jacobian_config.validate()?;
        if sensors.is_empty() {
            return Err(GravityError::Input(
                "Sensor list must be non-empty".to_string(),
            ));
        }
        mesh.validate()?;

        let observed: Vec<f64> = sensors.iter().map(|s| s.value).collect();
        let started = Instant::now();

        // Smoothing activation mutates a run-local copy of the options.
        let mut options = self.options.clone();
        let mut mode = if options.use_tikhonov_second_order {
            RegularizationMode::AmplitudeAndSmoothing
        } else {
            RegularizationMode::AmplitudeOnly
        };

        info!(
            cells = mesh.len(),
            sensors = sensors.len(),
            max_iterations = options.max_iterations,
            "Starting inversion"
        );

        let mut history: Vec<f64> = Vec::new();
        let mut initial_functional = 0.0;
        let mut termination = TerminationReason::MaxIterationsReached;
        let mut iterations = 0;
        let mut last_lambda = effective_lambda(&options, 0);

        for iteration in 0..options.max_iterations {
            if let Some(budget) = options.time_budget_seconds {
                if started.elapsed().as_secs_f64() >= budget {
                    termination = TerminationReason::TimeExpired;
                    break;
                }
            }

            let mut model = evaluate(mesh, sensors, base_density)?;
            let mut functional: f64 = observed
                .iter()
                .zip(model.iter())
                .map(|(d, f)| (d - f) * (d - f))
                .sum();
            if !functional.is_finite() {
                return Err(GravityError::Numerical {
                    iteration,
                    message: format!("Functional became non-finite: {functional}"),
                });
            }
            if iteration == 0 {
                initial_functional = functional;
            }

            if functional < ZERO_FUNCTIONAL
                || (initial_functional > 0.0
                    && functional / initial_functional <= options.functional_threshold)
            {
                history.push(functional);
                iterations = iteration + 1;
                termination = TerminationReason::Converged;
                break;
            }

            let mut mesh_changed = false;
            if let (Some((refine_options, grid)), Some(&previous)) =
                (self.refinement.as_ref(), history.last())
            {
                let improvement = (previous - functional) / previous;
                if improvement < refine_options.improvement_trigger {
                    let residuals: Vec<f64> = observed
                        .iter()
                        .zip(model.iter())
                        .map(|(d, f)| d - f)
                        .collect();
                    let refined =
                        refine_mesh(mesh, sensors, &residuals, refine_options, iteration, grid)?;
                    if refined.len() != mesh.len() {
                        debug!(
                            iteration,
                            cells_before = mesh.len(),
                            cells_after = refined.len(),
                            "Mesh refined"
                        );
                        *mesh = refined;
                        mesh_changed = true;
                        model = evaluate(mesh, sensors, base_density)?;
                        functional = observed
                            .iter()
                            .zip(model.iter())
                            .map(|(d, f)| (d - f) * (d - f))
                            .sum();
                    }
                }
            }

            if !mesh_changed {
                if let Some(&previous) = history.last() {
                    let change = (previous - functional) / previous;
                    if functional > previous || change.abs() < options.relative_tolerance {
                        history.push(functional);
                        iterations = iteration + 1;
                        termination = TerminationReason::Stalled;
                        break;
                    }
                }
            }

            if mode == RegularizationMode::AmplitudeOnly
                && functional < initial_functional * options.smoothing_activation_fraction
            {
                mode = RegularizationMode::AmplitudeAndSmoothing;
                options.use_tikhonov_second_order = true;
                options.lambda *= SMOOTHING_LAMBDA_SCALE;
                debug!(iteration, lambda = options.lambda, "Smoothing activated");
            }

            let jacobian = build_jacobian(mesh, sensors, &self.jacobian_config)?;
            let parameters = mesh.densities();
            let (updated, lambda_used) =
                invert(&model, &observed, &jacobian, &parameters, &options, iteration).map_err(
                    |e| match e {
                        GravityError::LinAlg(message) => {
                            GravityError::Numerical { iteration, message }
                        }
                        other => other,
                    },
                )?;
            if updated.iter().any(|v| !v.is_finite()) {
                return Err(GravityError::Numerical {
                    iteration,
                    message: "Parameter update contains non-finite values".to_string(),
                });
            }
            mesh.set_densities(&updated)?;
            last_lambda = lambda_used;

            debug!(
                iteration,
                functional,
                cells = mesh.len(),
                lambda = lambda_used,
                "Iteration complete"
            );
            history.push(functional);
            iterations = iteration + 1;
        }

        let final_functional = history.last().copied().unwrap_or(initial_functional);
        let report = InversionReport {
            termination,
            iterations,
            initial_functional,
            final_functional,
            functional_history: history,
            effective_lambda: last_lambda,
            elapsed_seconds: started.elapsed().as_secs_f64(),
            cell_count: mesh.len(),
        };
        info!(
            termination = ?report.termination,
            iterations = report.iterations,
            final_functional = report.final_functional,
            cells = report.cell_count,
            "Inversion finished"
        );
        Ok(report)
    }
}
