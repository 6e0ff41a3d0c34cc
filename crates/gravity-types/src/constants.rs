// ─────────────────────────────────────────────────────────────────────
// SCPN Gravity Core — Physical Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

/// Newtonian constant of gravitation, CODATA 2018 [m^3 kg^-1 s^-2].
pub const GRAVITATIONAL_CONSTANT: f64 = 6.67430e-11;

/// Floor applied to sensor-to-cell distances before any division.
pub const MIN_DISTANCE: f64 = 1e-6;
