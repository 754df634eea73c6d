//! Pluggable code delivery: real SMTP or a logging dev fallback.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid mail configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to send email: {0}")]
    SendFailed(String),
}

/// How a code reached the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Delivered out-of-band (email).
    Sent,
    /// Not actually delivered; the caller should expose the code in the
    /// response, the way a dev deployment prints it to the console.
    DevFallback,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_code(&self, to: &str, code: &str) -> Result<Delivery, MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        port: u16,
        username: Option<String>,
        password: Option<String>,
        from: &str,
    ) -> Result<Self, MailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| MailError::InvalidConfig(format!("SMTP relay error: {}", e)))?
            .port(port);

        if let (Some(user), Some(pass)) = (username, password) {
            builder = builder.credentials(Credentials::new(user, pass));
        }

        let from = from
            .parse()
            .map_err(|e| MailError::InvalidConfig(format!("invalid from address: {}", e)))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_code(&self, to: &str, code: &str) -> Result<Delivery, MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to
                .parse()
                .map_err(|e| MailError::InvalidConfig(format!("invalid to address: {}", e)))?)
            .subject("Quaddash - verify your email")
            .body(format!(
                "Your Quaddash verification code is: {}\n\nThis code expires in 15 minutes.",
                code
            ))
            .map_err(|e| MailError::SendFailed(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::SendFailed(e.to_string()))?;

        Ok(Delivery::Sent)
    }
}

/// No-transport mailer for local development and tests: logs the code and
/// tells the gate to surface it in the response.
pub struct DevMailer;

#[async_trait]
impl Mailer for DevMailer {
    async fn send_code(&self, to: &str, code: &str) -> Result<Delivery, MailError> {
        info!("[DEV] verification code for {}: {}", to, code);
        Ok(Delivery::DevFallback)
    }
}
