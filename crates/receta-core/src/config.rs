// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration, read from the process environment (and a
// `.env` file when one is present).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RecetaError, Result};

/// Default listen address for the HTTP server.
pub const DEFAULT_ADDR: &str = "0.0.0.0:3001";

/// Default SMTP submission port (STARTTLS).
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Which backend holds the `recetas` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreConfig {
    /// Local SQLite file.
    Sqlite { path: PathBuf },
    /// Supabase project, reached over its PostgREST interface.
    Supabase { url: String, key: String },
}

/// SMTP relay credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// `From:` mailbox; defaults to the SMTP username.
    pub from: String,
}

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// `host:port` the HTTP server binds to.
    pub addr: String,
    pub store: StoreConfig,
    pub smtp: SmtpConfig,
    /// Overrides the portal URL encoded in the QR code.
    pub portal_url: Option<String>,
    /// Enables the SQLite dispatch audit log at this path.
    pub audit_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load `.env` (if any) and read the configuration from the environment.
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(RecetaError::Config(format!("invalid .env file: {e}"))),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| RecetaError::Config(format!("{key} is not set")))
        };

        let store = match get("RECETA_STORE").as_deref().unwrap_or("sqlite") {
            "sqlite" => StoreConfig::Sqlite {
                path: get("RECETA_DB_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("recetas.db")),
            },
            "supabase" => StoreConfig::Supabase {
                url: require("SUPABASE_URL")?,
                key: require("SUPABASE_KEY")?,
            },
            other => {
                return Err(RecetaError::Config(format!(
                    "RECETA_STORE must be `sqlite` or `supabase`, got `{other}`"
                )));
            }
        };

        let port = match get("SMTP_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| RecetaError::Config(format!("SMTP_PORT is not a port: {raw}")))?,
            None => DEFAULT_SMTP_PORT,
        };
        let username = require("SMTP_USER")?;
        let smtp = SmtpConfig {
            host: require("SMTP_HOST")?,
            port,
            from: get("MAIL_FROM").unwrap_or_else(|| username.clone()),
            username,
            password: require("SMTP_PASS")?,
        };

        Ok(Self {
            addr: get("RECETA_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_owned()),
            store,
            smtp,
            portal_url: get("RECETA_PORTAL_URL"),
            audit_path: get("RECETA_AUDIT_PATH").map(PathBuf::from),
        })
    }
}
