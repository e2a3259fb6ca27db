use anyhow::Context;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::{ExposeSecret, SecretString};

use crate::domain::EmailAddress;

/// Mail sender data
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    fixed_receiver: Option<Mailbox>,
    ticker: String,
}

impl Mailer {
    /// Build a mail sender that submits over implicit TLS to the given relay
    pub fn new(
        relay_host: &str,
        username: String,
        password: SecretString,
        sender: &EmailAddress,
        fixed_receiver: Option<&EmailAddress>,
        ticker: String,
    ) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(relay_host)
            .context("Failed to build SMTP transport")?
            .credentials(Credentials::new(
                username,
                password.expose_secret().to_owned(),
            ))
            .build();
        let sender = parse_mailbox(sender)?;
        let fixed_receiver = fixed_receiver.map(parse_mailbox).transpose()?;
        Ok(Self {
            transport,
            sender,
            fixed_receiver,
            ticker,
        })
    }

    /// Send a price alert to the fixed receiver or to every given subscriber
    #[tracing::instrument(name = "Sending price alert", skip(self, recipients))]
    pub async fn send_price_alert(
        &self,
        price: f64,
        ratio: f64,
        recipients: &[String],
    ) -> anyhow::Result<()> {
        let Some(body) = change_message(ratio) else {
            // No template covers this ratio: skip rather than invent content
            tracing::warn!(ratio, "No message template covers this change ratio, skipping send");
            return Ok(());
        };

        let mut builder = Message::builder()
            .from(self.sender.clone())
            .subject(format!("{} is: {}", self.ticker, price));
        if let Some(receiver) = &self.fixed_receiver {
            builder = builder.to(receiver.clone());
        } else {
            if recipients.is_empty() {
                tracing::warn!("No subscribers to notify, skipping send");
                return Ok(());
            }
            for recipient in recipients {
                let mailbox = recipient
                    .parse::<Mailbox>()
                    .with_context(|| format!("Invalid recipient address {recipient}"))?;
                builder = builder.to(mailbox);
            }
        }

        let message = builder
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .context("Failed to build alert message")?;
        self.transport
            .send(message)
            .await
            .context("Failed to submit alert message to the mail relay")?;

        tracing::info!("Price alert sent");
        Ok(())
    }
}

/// Select the message body for a change ratio
///
/// The moderate-gain band stops at 1.2 while the strong-gain band starts at
/// 1.201, so ratios inside (1.2, 1.201) have no template and yield `None`.
pub fn change_message(ratio: f64) -> Option<String> {
    #[allow(clippy::cast_possible_truncation)]
    let percent = ((ratio - 1.0) * 100.0) as i64;
    if ratio <= 0.9 {
        Some(format!("Slacking down. Change is: {percent}%."))
    } else if ratio >= 1.201 {
        Some(format!("Rocking! Change is: {percent}%."))
    } else if (1.1..=1.2).contains(&ratio) {
        Some(format!("Doing, good. Change is: {percent}%."))
    } else {
        None
    }
}

/// Turn a validated email address into a lettre mailbox
fn parse_mailbox(email: &EmailAddress) -> anyhow::Result<Mailbox> {
    email
        .as_ref()
        .parse::<Mailbox>()
        .with_context(|| format!("Invalid mailbox address {email}"))
}
