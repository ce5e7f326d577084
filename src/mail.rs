use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, info, warn};

use crate::config::MailConfig;

/// A rendered HTML message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Escapes text for interpolation into HTML element content or a quoted attribute.
fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

impl Mail {
    pub fn welcome(to: &str, name: Option<&str>) -> Self {
        Self {
            to: to.to_string(),
            subject: "Welcome to CineLog!".into(),
            html: format!(
                "<h1>Hello, {}.</h1><p>Welcome to CineLog! Your account has been created.</p>",
                escape_html(name.unwrap_or("there"))
            ),
        }
    }

    pub fn password_reset(to: &str, link: &str) -> Self {
        let link = escape_html(link);
        Self {
            to: to.to_string(),
            subject: "Password reset request".into(),
            html: format!(
                "<p>A password reset was requested for your account. \
                 <a href=\"{link}\">Click here</a> to choose a new password. \
                 The link expires in one hour.</p>"
            ),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, mail: &Mail) -> anyhow::Result<()>;
}

/// How a caller treats a failed send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Failure is logged and swallowed.
    BestEffort,
    /// Failure is returned to the caller.
    MustSucceed,
}

pub async fn deliver(notifier: &dyn Notifier, delivery: Delivery, mail: Mail) -> anyhow::Result<()> {
    match (notifier.send(&mail).await, delivery) {
        (Ok(()), _) => Ok(()),
        (Err(e), Delivery::BestEffort) => {
            warn!(error = ?e, to = %mail.to, subject = %mail.subject, "best-effort mail failed");
            Ok(())
        }
        (Err(e), Delivery::MustSucceed) => {
            Err(e.context(format!("send mail \"{}\"", mail.subject)))
        }
    }
}

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(cfg: &MailConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
            .with_context(|| format!("smtp relay {}", cfg.host))?
            .port(cfg.port)
            .credentials(Credentials::new(cfg.user.clone(), cfg.pass.clone()))
            .build();
        let from = cfg.from.parse::<Mailbox>().context("parse MAIL_FROM")?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, mail: &Mail) -> anyhow::Result<()> {
        let to = mail
            .to
            .parse::<Mailbox>()
            .with_context(|| format!("parse recipient {}", mail.to))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(mail.html.clone())
            .context("build message")?;

        let response = self.transport.send(message).await.context("smtp send")?;
        info!(to = %mail.to, code = %response.code(), "mail sent");
        Ok(())
    }
}

/// Used when no SMTP host is configured: the message is logged, not sent.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, mail: &Mail) -> anyhow::Result<()> {
        info!(to = %mail.to, subject = %mail.subject, "mail transport disabled; message not sent");
        debug!(to = %mail.to, html = %mail.html, "unsent mail body");
        Ok(())
    }
}
