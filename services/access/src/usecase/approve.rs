use tracing::info;

use portal_domain::identifier::Identifier;

use crate::domain::repository::SessionRepository;
use crate::domain::types::DeliveryChannel;
use crate::error::PortalError;

pub struct ApprovePasscodeInput {
    pub user_id: String,
}

pub struct ApprovePasscodeOutput {
    pub user_id: Identifier,
    /// `None` when the identifier is neither an email address nor a phone number.
    pub channel: Option<DeliveryChannel>,
}

impl ApprovePasscodeOutput {
    pub fn describe(&self) -> String {
        match self.channel {
            Some(DeliveryChannel::Email) => {
                format!("Approved! Passcode email queued for {}.", self.user_id)
            }
            Some(DeliveryChannel::Sms) => {
                format!("Approved! Passcode SMS queued for {}.", self.user_id)
            }
            None => "Approved, but ID type unknown.".to_owned(),
        }
    }
}

pub struct ApprovePasscodeUseCase<S>
where
    S: SessionRepository,
{
    pub sessions: S,
}

impl<S> ApprovePasscodeUseCase<S>
where
    S: SessionRepository,
{
    pub async fn execute(
        &self,
        input: ApprovePasscodeInput,
    ) -> Result<ApprovePasscodeOutput, PortalError> {
        let user_id = Identifier::parse(&input.user_id)
            .map_err(|_| PortalError::validation("Mobile/Email is required."))?;

        // Passcode read, status change and outbox insert commit together, so the
        // delivered passcode is always the one that was approved.
        let session = self
            .sessions
            .approve_with_outbox(user_id.as_str())
            .await?
            .ok_or(PortalError::SessionNotFound)?;

        let channel = DeliveryChannel::for_identifier(&session.user_id);
        info!(user_id = %session.user_id, ?channel, "passcode approved");
        Ok(ApprovePasscodeOutput {
            user_id: session.user_id,
            channel,
        })
    }
}
