/// Outgoing mail
///
/// Handlers talk to a [`Mailer`] trait object stored in the application state:
///
/// - [`SmtpMailer`]: sends through an SMTP relay with lettre's async tokio transport
/// - [`LogMailer`]: writes the message to the log; used when no SMTP host is configured
///
/// # Example
///
/// ```no_run
/// use taskdash_api::mail::{LogMailer, Mailer, OutgoingMail};
///
/// # async fn example() -> Result<(), taskdash_api::mail::MailError> {
/// let mailer = LogMailer::new("TaskDash <no-reply@taskdash.local>");
/// mailer
///     .send(OutgoingMail::password_reset("ada@example.com", "Ada", "http://localhost/reset/abc", 10))
///     .await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::time::Duration;

use crate::config::{MailConfig, SmtpConfig};

/// Error type for mail delivery
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// Sender or recipient address could not be parsed
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Message could not be assembled
    #[error("Failed to build message: {0}")]
    Build(String),

    /// Relay refused or connection failed
    #[error("SMTP transport error: {0}")]
    Transport(String),
}

/// A plain-text message ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    /// Password reset message carrying the reset link
    pub fn password_reset(to: &str, name: &str, link: &str, ttl_minutes: i64) -> Self {
        Self {
            to: to.to_string(),
            subject: "Password reset request".to_string(),
            body: format!(
                "Hello {name},\n\n\
                 You requested a password reset. Open the link below to choose a new password:\n\n\
                 {link}\n\n\
                 The link expires in {ttl_minutes} minutes and can be used once. \
                 If you did not request this, you can ignore this email.\n"
            ),
        }
    }

    /// Invitation sent when an administrator creates an account
    pub fn invitation(to: &str, name: &str, link: &str, ttl_minutes: i64) -> Self {
        Self {
            to: to.to_string(),
            subject: "You have been invited to TaskDash".to_string(),
            body: format!(
                "Hello {name},\n\n\
                 An administrator created a TaskDash account for you. \
                 Open the link below to set your password:\n\n\
                 {link}\n\n\
                 The link expires in {ttl_minutes} minutes. \
                 Afterwards, use \"Forgot password\" on the login page to get a new one.\n"
            ),
        }
    }
}

/// Delivers outgoing mail
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Mailer that only logs messages
#[derive(Debug, Clone)]
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        tracing::info!(
            from = %self.from,
            to = %mail.to,
            subject = %mail.subject,
            body = %mail.body,
            "Mail not sent (no SMTP configured)"
        );
        Ok(())
    }
}

/// Mailer backed by an SMTP relay
///
/// Port 465 uses implicit TLS, 587 STARTTLS; any other port connects without
/// TLS (local relays such as Mailpit).
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(smtp: &SmtpConfig, from: &str) -> Result<Self, MailError> {
        let from: Mailbox = from
            .parse()
            .map_err(|e| MailError::InvalidAddress(format!("{}: {}", from, e)))?;

        let builder = match smtp.port {
            465 => AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
                .map_err(|e| MailError::Transport(e.to_string()))?,
            587 => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
                .map_err(|e| MailError::Transport(e.to_string()))?,
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp.host),
        };

        let mut builder = builder
            .port(smtp.port)
            .timeout(Some(Duration::from_secs(20)));

        if let (Some(username), Some(password)) = (&smtp.username, &smtp.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let to: Mailbox = mail
            .to
            .parse()
            .map_err(|e| MailError::InvalidAddress(format!("{}: {}", mail.to, e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body)
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        tracing::debug!(to = %mail.to, "Mail sent");
        Ok(())
    }
}

/// Picks the mailer for a configuration: SMTP when a host is set, log otherwise
pub fn mailer_from_config(config: &MailConfig) -> Result<Box<dyn Mailer>, MailError> {
    match &config.smtp {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, port = smtp.port, "Using SMTP mailer");
            Ok(Box::new(SmtpMailer::new(smtp, &config.from)?))
        }
        None => {
            tracing::warn!("SMTP_HOST not set, outgoing mail will only be logged");
            Ok(Box::new(LogMailer::new(config.from.clone())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_reset_message() {
        let mail = OutgoingMail::password_reset(
            "ada@example.com",
            "Ada",
            "http://localhost:5173/reset-password/abc",
            10,
        );

        assert_eq!(mail.to, "ada@example.com");
        assert!(mail.body.contains("Hello Ada"));
        assert!(mail.body.contains("http://localhost:5173/reset-password/abc"));
        assert!(mail.body.contains("10 minutes"));
    }

    #[test]
    fn test_invitation_message() {
        let mail = OutgoingMail::invitation("bob@example.com", "Bob", "http://x/reset/t", 10);
        assert!(mail.subject.contains("invited"));
        assert!(mail.body.contains("http://x/reset/t"));
    }

    #[tokio::test]
    async fn test_log_mailer_always_succeeds() {
        let mailer = LogMailer::new("TaskDash <no-reply@taskdash.local>");
        let result = mailer
            .send(OutgoingMail::password_reset("ada@example.com", "Ada", "link", 10))
            .await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_smtp_mailer_rejects_bad_sender() {
        let smtp = SmtpConfig {
            host: "localhost".to_string(),
            port: 1025,
            username: None,
            password: None,
        };

        assert!(matches!(
            SmtpMailer::new(&smtp, "not an address"),
            Err(MailError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_smtp_mailer_builds_for_local_relay() {
        let smtp = SmtpConfig {
            host: "localhost".to_string(),
            port: 1025,
            username: None,
            password: None,
        };

        assert!(SmtpMailer::new(&smtp, "TaskDash <no-reply@taskdash.local>").is_ok());
    }

    #[test]
    fn test_mailer_from_config_without_smtp() {
        let config = MailConfig {
            from: "TaskDash <no-reply@taskdash.local>".to_string(),
            smtp: None,
        };
        assert!(mailer_from_config(&config).is_ok());
    }
}
