use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
        PoolConfig,
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::MailConfig;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// SMTP mailer built once at startup and shared through `AppState`.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        let tls = TlsParameters::builder(config.host.clone())
            .build()
            .context("build smtp tls parameters")?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .context("create smtp transport")?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .port(config.port)
            .tls(Tls::Required(tls))
            .pool_config(PoolConfig::new().max_size(1))
            .timeout(Some(std::time::Duration::from_secs(10)))
            .build();

        let from = config
            .from
            .parse::<Mailbox>()
            .context("invalid MAIL_FROM address")?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(to.parse().context("invalid recipient address")?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("build mail message")?;

        self.transport.send(email).await.context("smtp send")?;
        Ok(())
    }
}

pub const RESET_MAIL_SUBJECT: &str = "Account recovery";
pub const PASSWORD_CHANGED_SUBJECT: &str = "Password changed";

pub fn reset_mail_body(reset_url: &str) -> String {
    format!(
        "Please click the following link to recover your password.\n\
        \n\
        {}\n\
        \n\
        The link is valid for 30 minutes.\n\
        \n\
        If you did not request this, please ignore this email.",
        reset_url
    )
}

pub fn password_changed_body(name: &str, email: &str) -> String {
    format!(
        "Hello, {},\n\
        \n\
        This is the confirmation that the password for your account {} \
        has been changed.",
        name, email
    )
}

#[cfg(test)]
mod template_tests {
    use super::*;

    #[test]
    fn reset_body_contains_link() {
        let body = reset_mail_body("http://localhost:8080/reset/abc123");
        assert!(body.contains("http://localhost:8080/reset/abc123"));
        assert!(body.contains("ignore this email"));
    }

    #[test]
    fn changed_body_names_the_account() {
        let body = password_changed_body("Ada", "ada@example.com");
        assert!(body.starts_with("Hello, Ada,"));
        assert!(body.contains("ada@example.com"));
    }
}
