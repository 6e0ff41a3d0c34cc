// ─────────────────────────────────────────────────────────────────────
// SCPN Gravity Core — Gravity Core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
pub mod controller;
pub mod forward;
pub mod jacobian;
pub mod mesh;
pub mod noise;
pub mod octree;
pub mod refine;
pub mod solver;
