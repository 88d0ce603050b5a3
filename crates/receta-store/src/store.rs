// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Storage seam for the `recetas` collection.

use async_trait::async_trait;
use receta_core::Row;
use receta_core::error::Result;

/// Name of the collection prescriptions are written to.
pub const RECETAS: &str = "recetas";

/// Insert-and-return-row access to the `recetas` collection.
///
/// Implementations assign `id` (and `created_at`) and return the full stored
/// row, including every submitted key.
#[async_trait]
pub trait RecetaStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Insert `row` and return it as stored.
    async fn insert_receta(&self, row: Row) -> Result<Row>;
}
