// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Create-and-send pipeline: insert the receta, render it, email it.
//
// Steps run strictly in order and the first failure aborts the rest. Earlier
// steps are not undone: a receta whose email failed stays stored, and the
// failure is written to the dispatch log (when enabled) so it can be found.

use std::sync::Arc;

use receta_core::error::{RecetaError, Result};
use receta_core::{CrearRecetaRequest, NewReceta, PrescriptionRecord, Row, row_id};
use receta_document::PrescriptionComposer;
use receta_mail::{MailMessage, Mailer};
use receta_store::{DispatchLog, DispatchStep, RecetaStore, hash_bytes};
use tracing::{debug, error, info, instrument, warn};

/// Owns the collaborators of the create-and-send flow.
pub struct RecetaService {
    store: Arc<dyn RecetaStore>,
    mailer: Arc<dyn Mailer>,
    composer: Arc<PrescriptionComposer>,
    dispatch_log: Option<DispatchLog>,
}

impl RecetaService {
    pub fn new(
        store: Arc<dyn RecetaStore>,
        mailer: Arc<dyn Mailer>,
        composer: PrescriptionComposer,
    ) -> Self {
        Self {
            store,
            mailer,
            composer: Arc::new(composer),
            dispatch_log: None,
        }
    }

    /// Record every step outcome in `log`.
    pub fn with_dispatch_log(mut self, log: DispatchLog) -> Self {
        self.dispatch_log = Some(log);
        self
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Validate, insert, render and email. Returns the stored id.
    #[instrument(skip_all)]
    pub async fn crear_y_enviar(&self, request: CrearRecetaRequest) -> Result<String> {
        let new = request.validate()?;
        let row = new.to_row();
        PrescriptionRecord::check_shape(&row)?;

        let (id, stored) = self.insert(row).await?;
        let (pdf, hash) = self.render(&id, stored).await?;
        self.email(&new, &id, pdf, &hash).await?;

        info!(receta_id = %id, "receta created and sent");
        Ok(id)
    }

    async fn insert(&self, row: Row) -> Result<(String, Row)> {
        let stored = match self.store.insert_receta(row).await {
            Ok(stored) => stored,
            Err(e) => {
                error!(error = %e, backend = self.store.backend(), "insert failed");
                self.audit(DispatchStep::Insert, None, false, None, Some(&e.to_string()))
                    .await;
                return Err(e);
            }
        };

        let Some(id) = row_id(&stored) else {
            let e = RecetaError::Database("inserted receta came back without an id".into());
            error!(error = %e, "insert failed");
            self.audit(DispatchStep::Insert, None, false, None, Some(&e.to_string()))
                .await;
            return Err(e);
        };

        debug!(receta_id = %id, "receta stored");
        self.audit(DispatchStep::Insert, Some(&id), true, None, None).await;
        Ok((id, stored))
    }

    /// Compose on the blocking pool; returns the PDF and its SHA-256.
    async fn render(&self, id: &str, stored: Row) -> Result<(Vec<u8>, String)> {
        let composer = Arc::clone(&self.composer);
        let rendered = tokio::task::spawn_blocking(move || {
            let record = PrescriptionRecord::from_row(stored)?;
            composer.compose(&record)
        })
        .await
        .map_err(|e| RecetaError::Render(format!("render task failed: {e}")))
        .and_then(|result| result);

        match rendered {
            Ok(pdf) => {
                let hash = hash_bytes(&pdf);
                debug!(receta_id = %id, bytes = pdf.len(), "receta rendered");
                self.audit(DispatchStep::Render, Some(id), true, Some(&hash), None).await;
                Ok((pdf, hash))
            }
            Err(e) => {
                error!(receta_id = %id, error = %e, "render failed; receta remains stored");
                self.audit(DispatchStep::Render, Some(id), false, None, Some(&e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    async fn email(&self, new: &NewReceta, id: &str, pdf: Vec<u8>, hash: &str) -> Result<()> {
        let message = MailMessage::receta(&new.email, Some(new.patient_name()), id, pdf);
        match self.mailer.send(message).await {
            Ok(()) => {
                self.audit(DispatchStep::Email, Some(id), true, Some(hash), None).await;
                Ok(())
            }
            Err(e) => {
                error!(receta_id = %id, error = %e, "email failed; receta remains stored");
                self.audit(DispatchStep::Email, Some(id), false, Some(hash), Some(&e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    /// Append to the dispatch log. A log write failure never fails the
    /// request.
    async fn audit(
        &self,
        step: DispatchStep,
        receta_id: Option<&str>,
        success: bool,
        document_hash: Option<&str>,
        details: Option<&str>,
    ) {
        let Some(log) = &self.dispatch_log else {
            return;
        };
        if let Err(e) = log
            .record(step, receta_id, success, document_hash, details)
            .await
        {
            warn!(%step, error = %e, "could not write dispatch log");
        }
    }
}
