// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// receta-server — HTTP surface of the Receta service.

pub mod error;
pub mod routes;
pub mod service;
pub mod state;

pub use error::ApiError;
pub use routes::router;
pub use service::RecetaService;
pub use state::AppState;
