// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// receta-mail — Delivery of rendered prescriptions to patients.

pub mod mailer;
pub mod message;
pub mod smtp;

pub use mailer::Mailer;
pub use message::{Attachment, MailMessage, PDF_MIME};
pub use smtp::SmtpMailer;
