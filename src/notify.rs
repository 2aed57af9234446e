//! Fire-and-forget outbound mail.
//!
//! Callers push a [`Mail`] onto a bounded channel through [`Notifier::send`]
//! and return immediately. A worker task owns the [`MailClient`] and delivers
//! messages one by one; delivery errors are logged and dropped.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::config::MailConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait MailClient: Send + Sync {
    async fn deliver(&self, mail: &Mail) -> anyhow::Result<()>;
}

/// Sends through an HTTP mail API that accepts a base64url-encoded RFC 822
/// message as `{"raw": ...}` (the Gmail `messages.send` shape).
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    access_token: String,
    from: Option<String>,
}

impl HttpMailer {
    pub fn new(cfg: &MailConfig, access_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: cfg.api_url.clone(),
            access_token,
            from: cfg.from.clone(),
        }
    }
}

/// Control characters (CR/LF included) become spaces so a value cannot
/// start a new header line.
fn header_value(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// RFC 2047 encoded-word for non-ASCII subjects.
fn subject_value(raw: &str) -> String {
    let clean = header_value(raw);
    if clean.is_ascii() {
        clean
    } else {
        format!("=?UTF-8?B?{}?=", general_purpose::STANDARD.encode(clean.as_bytes()))
    }
}

fn encode_message(from: Option<&str>, mail: &Mail) -> String {
    let mut message = String::new();
    if let Some(from) = from {
        message.push_str(&format!("From: {}\r\n", header_value(from)));
    }
    message.push_str(&format!(
        "To: {}\r\nSubject: {}\r\nContent-Type: text/plain; charset=UTF-8\r\n\r\n{}",
        header_value(&mail.to),
        subject_value(&mail.subject),
        mail.body
    ));
    general_purpose::URL_SAFE_NO_PAD.encode(message.as_bytes())
}

#[async_trait]
impl MailClient for HttpMailer {
    async fn deliver(&self, mail: &Mail) -> anyhow::Result<()> {
        let raw = encode_message(self.from.as_deref(), mail);
        self.client
            .post(&self.api_url)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({ "raw": raw }))
            .send()
            .await
            .context("mail api request")?
            .error_for_status()
            .context("mail api rejected message")?;
        Ok(())
    }
}

/// Used when no mail credentials are configured.
pub struct LogMailer;

#[async_trait]
impl MailClient for LogMailer {
    async fn deliver(&self, mail: &Mail) -> anyhow::Result<()> {
        info!(to = %mail.to, subject = %mail.subject, "mail not configured; message logged only");
        Ok(())
    }
}

#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<Mail>,
}

impl Notifier {
    /// A notifier and the receiving end of its queue, without a worker.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Mail>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Starts the delivery worker. It stops once every `Notifier` clone is
    /// dropped and the queue is drained.
    pub fn spawn(client: Arc<dyn MailClient>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (notifier, rx) = Self::channel(capacity);
        let handle = tokio::spawn(run_worker(rx, client));
        (notifier, handle)
    }

    /// Queues a message. Never blocks and never fails the caller.
    pub fn send(&self, to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) {
        let mail = Mail {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        };
        match self.tx.try_send(mail) {
            Ok(()) => debug!("mail queued"),
            Err(TrySendError::Full(m)) => warn!(to = %m.to, "mail queue full; message dropped"),
            Err(TrySendError::Closed(m)) => warn!(to = %m.to, "mail worker stopped; message dropped"),
        }
    }
}

async fn run_worker(mut rx: mpsc::Receiver<Mail>, client: Arc<dyn MailClient>) {
    while let Some(mail) = rx.recv().await {
        match client.deliver(&mail).await {
            Ok(()) => info!(to = %mail.to, subject = %mail.subject, "email sent"),
            Err(e) => error!(error = ?e, to = %mail.to, "error sending email"),
        }
    }
    debug!("mail worker drained");
}
