// ─────────────────────────────────────────────────────────────────────
// SCPN Gravity Core — Regularized Gauss-Newton Step
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! One Tikhonov-regularized Gauss-Newton parameter update.
//!
//! Forms the normal equations `(JᵗJ + R) Δp = Jᵗ(d - f(p))`, applies the
//! configured first- and second-order regularization terms to the diagonal,
//! solves, and returns the updated parameters together with the lambda the
//! step actually applied.

use gravity_math::linalg::{normal_matrix, solve_dense, transpose_mul_vec};
use gravity_types::config::InverseOptions;
use gravity_types::error::{GravityError, GravityResult};
use ndarray::{Array1, Array2};

/// Lambda after the decay schedule, floored at `min_lambda`.
pub fn effective_lambda(options: &InverseOptions, iteration: usize) -> f64 {
    if options.auto_adjust_regularization {
        (options.lambda * options.lambda_decay.powi(iteration as i32)).max(options.min_lambda)
    } else {
        options.lambda
    }
}

/// Amplitude damping: add lambda to every diagonal entry.
fn apply_first_order(a: &mut Array2<f64>, lambda: f64) {
    let n = a.nrows();
    for i in 0..n {
        a[[i, i]] += lambda;
    }
}

/// Smoothing: penalize parameters whose discrete curvature
/// `p[i-1] - 2 p[i] + p[i+1]` exceeds the gradient threshold.
fn apply_second_order(a: &mut Array2<f64>, parameters: &[f64], options: &InverseOptions, lambda: f64) {
    let n = parameters.len();
    for i in 1..n.saturating_sub(1) {
        let curvature = parameters[i - 1] - 2.0 * parameters[i] + parameters[i + 1];
        if curvature.abs() > options.gradient_threshold {
            a[[i, i]] += lambda * options.second_order_multiplier;
        }
    }
}

/// Compute one Gauss-Newton update.
///
/// Returns `(updated_parameters, lambda)`, where lambda is the
/// regularization coefficient actually applied this step.
pub fn invert(
    model_values: &[f64],
    observed_values: &[f64],
    jacobian: &Array2<f64>,
    current_parameters: &[f64],
    options: &InverseOptions,
    iteration: usize,
) -> GravityResult<(Vec<f64>, f64)> {
    let m = observed_values.len();
    let n = current_parameters.len();
    if model_values.len() != m {
        return Err(GravityError::Input(format!(
            "Model/observation length mismatch: model={}, observed={m}",
            model_values.len()
        )));
    }
    if jacobian.dim() != (m, n) {
        return Err(GravityError::Input(format!(
            "Jacobian shape {:?} does not match {m} observations x {n} parameters",
            jacobian.dim()
        )));
    }

    let residual = Array1::from_shape_fn(m, |i| observed_values[i] - model_values[i]);

    let mut a = normal_matrix(jacobian);
    let b = transpose_mul_vec(jacobian, &residual);

    let lambda = effective_lambda(options, iteration);
    if options.use_tikhonov_first_order {
        apply_first_order(&mut a, lambda);
    }
    if options.use_tikhonov_second_order {
        apply_second_order(&mut a, current_parameters, options, lambda);
    }

    let delta = solve_dense(&a, &b)?;

    let updated = current_parameters
        .iter()
        .zip(delta.iter())
        .map(|(p, d)| p + d)
        .collect();
    Ok((updated, lambda))
}
