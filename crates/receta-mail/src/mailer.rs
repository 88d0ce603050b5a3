// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use async_trait::async_trait;
use receta_core::error::Result;

use crate::message::MailMessage;

/// Anything that can deliver a [`MailMessage`].
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver `message`. Resolves once the transport has accepted it.
    async fn send(&self, message: MailMessage) -> Result<()>;
}
