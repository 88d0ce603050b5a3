// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Supabase backend — inserts into `recetas` through the project's PostgREST
// endpoint and asks for the stored row back (`Prefer: return=representation`).

use async_trait::async_trait;
use receta_core::Row;
use receta_core::error::{RecetaError, Result};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::store::{RECETAS, RecetaStore};

/// Maximum response body echoed into an error message.
const MAX_ERROR_BODY: usize = 512;

/// Client for a Supabase project's REST interface.
#[derive(Clone)]
pub struct SupabaseStore {
    client: Client,
    endpoint: String,
}

impl SupabaseStore {
    /// Build a store for the project at `url`, authenticating with `key`.
    pub fn new(url: &str, key: &str) -> Result<Self> {
        let header = |value: String| {
            HeaderValue::from_str(&value)
                .map_err(|_| RecetaError::Config("SUPABASE_KEY is not a valid header value".into()))
        };

        let mut headers = HeaderMap::new();
        headers.insert("apikey", header(key.to_owned())?);
        headers.insert(AUTHORIZATION, header(format!("Bearer {key}"))?);
        headers.insert("prefer", HeaderValue::from_static("return=representation"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| RecetaError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: table_endpoint(url, RECETAS),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// `https://<project>.supabase.co/rest/v1/<table>`
fn table_endpoint(url: &str, table: &str) -> String {
    format!("{}/rest/v1/{table}", url.trim().trim_end_matches('/'))
}

/// PostgREST answers an insert with an array of inserted rows.
fn first_row(body: Value) -> Result<Row> {
    let row = match body {
        Value::Array(rows) => rows.into_iter().next(),
        other => Some(other),
    };
    match row {
        Some(Value::Object(row)) => Ok(row),
        Some(_) => Err(RecetaError::Database(
            "supabase returned a non-object row".into(),
        )),
        None => Err(RecetaError::Database(
            "supabase returned no inserted row".into(),
        )),
    }
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}

#[async_trait]
impl RecetaStore for SupabaseStore {
    fn backend(&self) -> &'static str {
        "supabase"
    }

    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    async fn insert_receta(&self, row: Row) -> Result<Row> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&row)
            .send()
            .await
            .map_err(|e| RecetaError::Database(format!("supabase request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "supabase rejected insert");
            return Err(RecetaError::Database(format!(
                "supabase responded {status}: {}",
                truncate(body)
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RecetaError::Database(format!("invalid supabase response: {e}")))?;
        let stored = first_row(body)?;
        debug!(id = ?stored.get("id"), "receta inserted");
        Ok(stored)
    }
}
