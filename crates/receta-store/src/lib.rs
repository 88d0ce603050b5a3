// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// receta-store — Persistence for the Receta service.
//
// Provides the `RecetaStore` seam ("insert and return the stored row") with a
// local SQLite backend and a Supabase/PostgREST backend, the append-only
// dispatch audit log, and SHA-256 document fingerprints.

pub mod audit;
pub mod integrity;
pub mod sqlite;
pub mod store;
pub mod supabase;

pub use audit::{DispatchEntry, DispatchLog, DispatchStep};
pub use integrity::hash_bytes;
pub use sqlite::SqliteStore;
pub use store::RecetaStore;
pub use supabase::SupabaseStore;
