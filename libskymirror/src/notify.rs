//! Start/end email alerts
//!
//! One fixed-subject plain-text message at process start and one at
//! process end; useful for spotting forced restarts and hung processes.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::MailerConfig;
use crate::error::{NotifyError, Result};

pub struct Notifier {
    config: MailerConfig,
}

impl Notifier {
    pub fn new(config: MailerConfig) -> Self {
        Self { config }
    }

    /// Subject used for every alert from this module.
    pub fn subject(&self) -> String {
        format!("Email from {}", self.config.module_name)
    }

    /// Send one plain-text status line.
    pub async fn send(&self, body: &str) -> Result<()> {
        let from: Mailbox = self.config.from.parse().map_err(NotifyError::Address)?;
        let to: Mailbox = self.config.to.parse().map_err(NotifyError::Address)?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(self.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(NotifyError::Message)?;

        let credentials = Credentials::new(
            self.config.username.clone(),
            self.config.password.clone(),
        );

        let mailer: AsyncSmtpTransport<Tokio1Executor> =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)
                .map_err(NotifyError::Smtp)?
                .port(self.config.smtp_port)
                .credentials(credentials)
                .build();

        mailer.send(email).await.map_err(NotifyError::Smtp)?;
        tracing::info!(to = %self.config.to, "status email sent");

        Ok(())
    }

    /// `"{module} started at {timestamp}"`, sent once at process start.
    pub async fn notify_started(&self, timestamp: &str) -> Result<()> {
        self.send(&format!("{} started at {}", self.config.module_name, timestamp))
            .await
    }

    /// `"{module} ended at {timestamp}"`, sent once at process end.
    pub async fn notify_ended(&self, timestamp: &str) -> Result<()> {
        self.send(&format!("{} ended at {}", self.config.module_name, timestamp))
            .await
    }
}
