// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SMTP delivery over a STARTTLS relay, via `lettre`'s async transport.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MimeAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use receta_core::config::SmtpConfig;
use receta_core::error::{RecetaError, Result};
use tracing::{info, instrument};

use crate::mailer::Mailer;
use crate::message::MailMessage;

fn mail_err(e: impl std::fmt::Display) -> RecetaError {
    RecetaError::Mail(e.to_string())
}

/// Sends messages through an authenticated SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build a transport for `config`. No connection is made until the first
    /// message is sent.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| RecetaError::Config(format!("MAIL_FROM is not a mailbox: {e}")))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| RecetaError::Config(format!("invalid SMTP relay {}: {e}", config.host)))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { transport, from })
    }

    /// Assemble the MIME message: an HTML part plus the attachment.
    pub fn build_message(&self, message: MailMessage) -> Result<Message> {
        build_message(self.from.clone(), message)
    }
}

fn build_message(from: Mailbox, message: MailMessage) -> Result<Message> {
    let to = message
        .to
        .parse::<Mailbox>()
        .map_err(|e| RecetaError::Mail(format!("invalid recipient {}: {e}", message.to)))?;
    let content_type = ContentType::parse(&message.attachment.mime).map_err(mail_err)?;

    let body = MultiPart::mixed()
        .singlepart(SinglePart::html(message.html))
        .singlepart(
            MimeAttachment::new(message.attachment.filename)
                .body(message.attachment.content, content_type),
        );

    Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject)
        .multipart(body)
        .map_err(mail_err)
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[instrument(skip_all, fields(to = %message.to, attachment = %message.attachment.filename))]
    async fn send(&self, message: MailMessage) -> Result<()> {
        let email = self.build_message(message)?;
        let response = self.transport.send(email).await.map_err(mail_err)?;
        info!(code = %response.code(), "mail accepted by relay");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".into(),
            port: 587,
            username: "recetas@example.com".into(),
            password: "secret".into(),
            from: "Receta Digital <recetas@example.com>".into(),
        }
    }

    #[test]
    fn formats_multipart_message() {
        let mailer = SmtpMailer::new(&config()).unwrap();
        let msg = MailMessage::receta("ana@example.com", Some("Ana"), "7", b"%PDF-1.7".to_vec());
        let raw = String::from_utf8(mailer.build_message(msg).unwrap().formatted()).unwrap();

        assert!(raw.contains("To: ana@example.com"));
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("text/html"));
        assert!(raw.contains("application/pdf"));
        assert!(raw.contains("receta-7.pdf"));
    }

    #[test]
    fn bad_recipient_is_a_mail_error() {
        let mailer = SmtpMailer::new(&config()).unwrap();
        let msg = MailMessage::receta("not an address", None, "7", Vec::new());
        assert!(matches!(mailer.build_message(msg), Err(RecetaError::Mail(_))));
    }

    #[test]
    fn bad_sender_is_a_config_error() {
        let mut cfg = config();
        cfg.from = "@@".into();
        assert!(matches!(SmtpMailer::new(&cfg), Err(RecetaError::Config(_))));
    }
}
