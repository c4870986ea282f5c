use crate::config::Settings;
use crate::notify::error::NotifyError;
use crate::notify::Channel;
use anyhow::Result;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

const IMPLICIT_TLS_PORT: u16 = 465;

pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let host = settings.require_smtp_host()?;
        let (username, password) = settings.require_smtp_credentials()?;
        let from = parse_mailbox(settings.require_email_from()?)?;
        let to = parse_mailbox(settings.require_email_to()?)?;

        let builder = if settings.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|e| NotifyError::new(Channel::Email, "transport", e.to_string()))?;

        let transport = builder
            .port(settings.smtp_port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();

        Ok(Self { transport, from, to })
    }

    pub async fn send(&self, subject: &str, body: &str) -> Result<()> {
        let message = build_message(&self.from, &self.to, subject, body)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::new(Channel::Email, "send", e.to_string()))?;

        tracing::info!(to = %self.to, %subject, "email sent");
        Ok(())
    }
}

fn parse_mailbox(addr: &str) -> Result<Mailbox> {
    addr.parse::<Mailbox>().map_err(|e| {
        NotifyError::new(Channel::Email, "config", format!("invalid address {addr:?}: {e}")).into()
    })
}

fn build_message(from: &Mailbox, to: &Mailbox, subject: &str, body: &str) -> Result<Message> {
    Message::builder()
        .from(from.clone())
        .to(to.clone())
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| NotifyError::new(Channel::Email, "build", e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_plaintext_message() {
        let from = parse_mailbox("Screener <screener@example.com>").unwrap();
        let to = parse_mailbox("me@example.com").unwrap();
        let message = build_message(&from, &to, "Bottom fishing picks", "ABCD  1.80").unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Bottom fishing picks"));
        assert!(raw.contains("To: me@example.com"));
        assert!(raw.contains("Content-Type: text/plain"));
        assert!(raw.contains("ABCD  1.80"));
    }

    #[test]
    fn rejects_invalid_recipient() {
        let err = parse_mailbox("not an address").unwrap_err();
        let diag = err.downcast_ref::<NotifyError>().unwrap();
        assert_eq!(diag.channel, Channel::Email);
        assert_eq!(diag.stage, "config");
    }

    #[test]
    fn missing_relay_settings_fail_at_construction() {
        assert!(EmailNotifier::from_settings(&Settings::default()).is_err());

        let settings = Settings {
            smtp_host: Some("smtp.example.com".to_string()),
            ..Settings::default()
        };
        let err = EmailNotifier::from_settings(&settings).err().unwrap();
        assert!(err.to_string().contains("SMTP_USERNAME"));
    }
}
