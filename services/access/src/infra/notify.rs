use anyhow::Context as _;
use serde::Serialize;
use tracing::info;

use crate::domain::repository::Notifier;
use crate::domain::types::{DeliveryChannel, PasscodeMessage};
use crate::error::PortalError;

const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Hands passcode messages to an HTTP email relay or SMS gateway.
///
/// A channel without a configured URL is simulated: the send is logged
/// (recipient only) and reported as delivered.
#[derive(Clone)]
pub struct RelayNotifier {
    client: reqwest::Client,
    email_relay_url: Option<String>,
    sms_gateway_url: Option<String>,
    mail_from: String,
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    to: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<&'a str>,
    body: &'a str,
}

impl RelayNotifier {
    pub fn new(
        client: reqwest::Client,
        email_relay_url: Option<String>,
        sms_gateway_url: Option<String>,
        mail_from: String,
    ) -> Self {
        Self {
            client,
            email_relay_url,
            sms_gateway_url,
            mail_from,
        }
    }

    fn endpoint(&self, channel: DeliveryChannel) -> Option<&str> {
        match channel {
            DeliveryChannel::Email => self.email_relay_url.as_deref(),
            DeliveryChannel::Sms => self.sms_gateway_url.as_deref(),
        }
    }
}

impl Notifier for RelayNotifier {
    async fn send(&self, message: &PasscodeMessage) -> Result<(), PortalError> {
        let Some(url) = self.endpoint(message.channel) else {
            info!(
                channel = ?message.channel,
                recipient = %message.recipient,
                "no relay configured, passcode delivery simulated"
            );
            return Ok(());
        };

        // SMS gateways take a bare body; sender and subject only make sense for mail.
        let request = match message.channel {
            DeliveryChannel::Email => RelayRequest {
                to: &message.recipient,
                from: Some(self.mail_from.as_str()),
                subject: Some(message.subject.as_str()),
                body: &message.body,
            },
            DeliveryChannel::Sms => RelayRequest {
                to: &message.recipient,
                from: None,
                subject: None,
                body: &message.body,
            },
        };

        self.client
            .post(url)
            .header(IDEMPOTENCY_KEY_HEADER, &message.idempotency_key)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("post {:?} passcode to relay", message.channel))?
            .error_for_status()
            .context("relay rejected passcode")?;
        Ok(())
    }
}
