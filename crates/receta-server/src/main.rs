// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Receta — prescription intake service.
//
// Entry point. Initialises logging, reads the configuration, wires the store,
// mailer and composer together, and serves the HTTP API.

use std::sync::Arc;

use receta_core::AppConfig;
use receta_core::config::StoreConfig;
use receta_document::{ComposerSettings, PrescriptionComposer};
use receta_mail::SmtpMailer;
use receta_server::{AppState, RecetaService, router};
use receta_store::{DispatchLog, RecetaStore, SqliteStore, SupabaseStore};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let store: Arc<dyn RecetaStore> = match &config.store {
        StoreConfig::Sqlite { path } => Arc::new(SqliteStore::open(path)?),
        StoreConfig::Supabase { url, key } => Arc::new(SupabaseStore::new(url, key)?),
    };
    let mailer = Arc::new(SmtpMailer::new(&config.smtp)?);

    let mut settings = ComposerSettings::default();
    if let Some(url) = &config.portal_url {
        settings = settings.with_portal_url(url.as_str());
    }

    let mut service = RecetaService::new(store, mailer, PrescriptionComposer::new(settings));
    if let Some(path) = &config.audit_path {
        service = service.with_dispatch_log(DispatchLog::open(path)?);
        info!(path = %path.display(), "dispatch log enabled");
    }

    info!(
        addr = %config.addr,
        store = service.store_backend(),
        smtp = %config.smtp.host,
        "starting Receta"
    );

    let app = router(AppState::new(service));
    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
