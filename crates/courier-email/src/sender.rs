// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMTP delivery through `lettre`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use courier_core::traits::Sender;
use courier_core::{
    Channel, Context, CourierError, Recipient, RecipientType, RenderedContent, SendReceipt,
    SenderError,
};
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MessageBuilder};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::{EmailChannelConfig, TlsMode, TransportKey};

type Transport = AsyncSmtpTransport<Tokio1Executor>;

/// Sends one email per call. Transports are pooled per server and credentials.
pub struct EmailSender {
    timeout: Duration,
    transports: Mutex<HashMap<TransportKey, Transport>>,
}

impl std::fmt::Debug for EmailSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailSender")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl EmailSender {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            transports: Mutex::new(HashMap::new()),
        }
    }

    async fn transport(&self, config: &EmailChannelConfig) -> Result<Transport, SenderError> {
        let key = config.transport_key();
        let mut pool = self.transports.lock().await;
        if let Some(transport) = pool.get(&key) {
            return Ok(transport.clone());
        }

        let builder = match config.tls {
            TlsMode::Starttls => Transport::starttls_relay(&config.host),
            TlsMode::Tls => Transport::relay(&config.host),
            TlsMode::Plain => Ok(Transport::builder_dangerous(&config.host)),
        }
        .map_err(|e| SenderError::transport(format!("smtp setup for {}: {e}", config.host)))?;

        let mut builder = builder.port(config.port).timeout(Some(self.timeout));
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        let transport = builder.build();
        debug!(host = %config.host, port = config.port, "smtp transport created");
        pool.insert(key, transport.clone());
        Ok(transport)
    }
}

fn mailbox(recipient: &Recipient) -> Result<Mailbox, SenderError> {
    let address: Address = recipient.target.parse().map_err(|e| {
        SenderError::invalid_recipient(format!("invalid address `{}`: {e}", recipient.target))
    })?;
    Ok(Mailbox::new(recipient.name.clone(), address))
}

/// Builds the MIME message for `recipients`, addressed by recipient type.
pub fn build_message(
    from: Mailbox,
    content: &RenderedContent,
    recipients: &[Recipient],
) -> Result<Message, SenderError> {
    let mut builder: MessageBuilder = Message::builder()
        .from(from)
        .subject(content.subject.as_str())
        .header(ContentType::TEXT_PLAIN);
    for recipient in recipients {
        let mb = mailbox(recipient)?;
        builder = match recipient.kind {
            RecipientType::Cc => builder.cc(mb),
            RecipientType::Bcc => builder.bcc(mb),
            _ => builder.to(mb),
        };
    }
    builder
        .body(content.body.clone())
        .map_err(|e| SenderError::invalid_recipient(format!("cannot build email: {e}")))
}

/// Maps an SMTP failure onto a delivery code.
fn classify(err: &lettre::transport::smtp::Error) -> SenderError {
    let details = err.to_string();
    if err.is_timeout() {
        return SenderError::timeout(details);
    }
    if err.is_permanent() {
        let auth_failed = err
            .status()
            .is_some_and(|code| code.to_string().starts_with("53"));
        return if auth_failed {
            SenderError::auth(details)
        } else {
            SenderError::invalid_recipient(details)
        };
    }
    SenderError::transport(details)
}

#[async_trait]
impl Sender for EmailSender {
    async fn send(
        &self,
        ctx: &Context,
        channel: &Channel,
        content: &RenderedContent,
        recipients: &[Recipient],
    ) -> Result<SendReceipt, SenderError> {
        if ctx.is_cancelled() {
            return Err(SenderError::canceled());
        }
        let config = EmailChannelConfig::from_map(&channel.config)?;
        let email = build_message(config.mailbox()?, content, recipients)?;
        let transport = self.transport(&config).await?;

        let response = transport.send(email).await.map_err(|e| classify(&e))?;
        info!(
            channel_id = %channel.id,
            recipients = recipients.len(),
            "email accepted by relay"
        );
        let mut receipt = SendReceipt::new(format!(
            "email accepted for {} recipient(s)",
            recipients.len()
        ));
        if let Some(line) = response.first_line() {
            receipt = receipt.with_provider_id(line);
        }
        Ok(receipt)
    }

    async fn shutdown(&self) -> Result<(), CourierError> {
        let mut pool = self.transports.lock().await;
        debug!(transports = pool.len(), "releasing smtp transports");
        pool.clear();
        Ok(())
    }
}
