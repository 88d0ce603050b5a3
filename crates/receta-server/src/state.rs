// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use std::sync::Arc;

use crate::service::RecetaService;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RecetaService>,
}

impl AppState {
    pub fn new(service: RecetaService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
