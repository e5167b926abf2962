// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outgoing email: verification links, subscriber notifications and
//! production error alerts.
//!
//! Three transports are supported. SMTP is the real one. `Disabled` fails
//! every send, which development relies on to auto-verify new users.
//! `Outbox` records messages in memory so tests can inspect them.

use crate::config::Config;
use crate::models::{Direction, Trip};
use crate::time_utils::{format_trip_date, format_trip_time};
use lettre::message::{header::ContentType, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::PoolConfig;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A message captured by the outbox transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Shared view of messages sent through an outbox mailer.
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    sent: Arc<Mutex<Vec<SentMail>>>,
}

impl Outbox {
    pub async fn messages(&self) -> Vec<SentMail> {
        self.sent.lock().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

enum Transport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    Disabled,
    Outbox(Outbox),
}

pub struct Mailer {
    from: Mailbox,
    transport: Transport,
    /// Public base URL for verification links
    domain_name: String,
    verify_endpoint: String,
}

impl Mailer {
    /// Build the mailer from configuration. No SMTP host disables mail.
    pub fn from_config(config: &Config) -> Result<Self, MailError> {
        let from: Mailbox = config
            .mail_addr
            .parse()
            .map_err(|e: lettre::address::AddressError| MailError::Address(e.to_string()))?;

        let transport = match &config.smtp {
            Some(smtp) => {
                let creds = Credentials::new(smtp.username.clone(), smtp.password.clone());
                let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
                    .map_err(|e| MailError::Transport(e.to_string()))?
                    .port(smtp.port)
                    .credentials(creds)
                    .authentication(vec![Mechanism::Plain])
                    .pool_config(PoolConfig::new().max_size(5))
                    .build();
                tracing::info!(host = %smtp.host, port = smtp.port, "SMTP mailer configured");
                Transport::Smtp(transport)
            }
            None => {
                tracing::warn!("SMTP not configured, outgoing mail disabled");
                Transport::Disabled
            }
        };

        Ok(Self {
            from,
            transport,
            domain_name: config.domain_name.clone(),
            verify_endpoint: config.verify_endpoint.clone(),
        })
    }

    /// Mailer that records messages instead of sending them.
    pub fn with_outbox(config: &Config) -> Result<(Self, Outbox), MailError> {
        let mut mailer = Self::from_config(&Config {
            smtp: None,
            ..config.clone()
        })?;
        let outbox = Outbox::default();
        mailer.transport = Transport::Outbox(outbox.clone());
        Ok((mailer, outbox))
    }

    pub fn verification_link(&self, record_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.domain_name.trim_end_matches('/'),
            self.verify_endpoint.trim_matches('/'),
            record_id
        )
    }

    async fn send(&self, to: &str, subject: &str, html: String) -> Result<(), MailError> {
        let transport = match &self.transport {
            Transport::Disabled => return Err(MailError::Disabled),
            Transport::Outbox(outbox) => {
                outbox.sent.lock().await.push(SentMail {
                    to: to.to_string(),
                    subject: subject.to_string(),
                    body: html,
                });
                return Ok(());
            }
            Transport::Smtp(transport) => transport,
        };

        let recipient: Mailbox = to
            .parse()
            .map_err(|e: lettre::address::AddressError| MailError::Address(e.to_string()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(strip_tags(&html)),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html),
                    ),
            )
            .map_err(|e| MailError::Build(e.to_string()))?;

        transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(())
    }

    /// Send the verification link. Returns whether the mail went out.
    pub async fn send_verification(&self, first_name: &str, to: &str, record_id: &str) -> bool {
        let link = self.verification_link(record_id);
        let html = format!(
            "<p>Hi {},</p>\
             <p>Welcome to IGetBack! Please confirm your email address:</p>\
             <p><a href=\"{link}\">{link}</a></p>\
             <p>This link expires in 24 hours.</p>",
            first_name,
            link = link
        );

        match self.send(to, "Verify your IGetBack account", html).await {
            Ok(()) => {
                tracing::info!(to, "Verification email sent");
                true
            }
            Err(e) => {
                tracing::warn!(to, error = %e, "Verification email not sent");
                false
            }
        }
    }

    /// Tell subscribers about a new trip near their requested time.
    pub async fn send_subscriber_notification(
        &self,
        recipients: &[String],
        direction: Direction,
        trip: &Trip,
    ) -> Result<(), MailError> {
        let subject = format!(
            "New trip from {} to {}",
            direction.origin(trip),
            direction.destination(trip)
        );
        let html = format!(
            "<p>A new trip matches one of your IGetBack subscriptions.</p>\
             <p><b>{}</b> to <b>{}</b> on {} at {}, posted by {}.</p>\
             <p>{} seat(s) available. Log in to join.</p>",
            direction.origin(trip),
            direction.destination(trip),
            format_trip_date(trip.trip_date),
            format_trip_time(trip.trip_hour, trip.trip_quarter_hour),
            trip.owner_email.to_lowercase(),
            trip.seats_left(),
        );

        let mut failures = 0usize;
        for to in recipients {
            if let Err(e) = self.send(to, &subject, html.clone()).await {
                tracing::warn!(to = %to, error = %e, "Subscriber notification failed");
                failures += 1;
            }
        }

        tracing::info!(
            trip_id = %trip.id,
            recipients = recipients.len(),
            failures,
            "Subscriber notifications sent"
        );

        if failures > 0 {
            return Err(MailError::Partial {
                failed: failures,
                total: recipients.len(),
            });
        }
        Ok(())
    }

    /// Report an unexpected server error to the operators.
    pub async fn send_error_alert(&self, to: &str, details: &str) -> Result<(), MailError> {
        let html = format!(
            "<p>IGetBack returned an internal server error.</p><pre>{}</pre>",
            html_escape::encode_text(details)
        );
        self.send(to, "IGetBack server error", html).await
    }
}

/// Plain-text alternative for the simple markup used above, with entities
/// decoded.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    let text = out.split_whitespace().collect::<Vec<_>>().join(" ");
    html_escape::decode_html_entities(&text).into_owned()
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail is disabled")]
    Disabled,

    #[error("invalid address: {0}")]
    Address(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Transport(String),

    #[error("{failed} of {total} messages failed")]
    Partial { failed: usize, total: usize },
}
