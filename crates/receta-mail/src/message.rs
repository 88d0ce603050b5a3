// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Outgoing message model, independent of the transport that delivers it.

use serde::{Deserialize, Serialize};

/// Subject line of every prescription email.
pub const RECETA_SUBJECT: &str = "Tu receta médica";

/// MIME type of the attached prescription.
pub const PDF_MIME: &str = "application/pdf";

/// A file attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
    pub mime: String,
}

/// One HTML message to a single recipient, with one attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachment: Attachment,
}

impl MailMessage {
    /// The message that delivers a rendered prescription to its patient.
    pub fn receta(to: &str, patient_name: Option<&str>, receta_id: &str, pdf: Vec<u8>) -> Self {
        Self {
            to: to.trim().to_owned(),
            subject: RECETA_SUBJECT.to_owned(),
            html: receta_html(patient_name),
            attachment: Attachment {
                filename: attachment_name(receta_id),
                content: pdf,
                mime: PDF_MIME.to_owned(),
            },
        }
    }
}

/// `receta-<id>.pdf`
pub fn attachment_name(receta_id: &str) -> String {
    format!("receta-{receta_id}.pdf")
}

fn receta_html(patient_name: Option<&str>) -> String {
    let greeting = match patient_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("Hola {},", escape_html(name)),
        None => "Hola,".to_owned(),
    };
    format!(
        "<p>{greeting}</p>\
         <p>Adjuntamos tu receta médica en formato PDF.</p>\
         <p>Preséntala en tu farmacia junto con una identificación oficial.</p>"
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
