use chrono::Utc;
use tracing::{debug, info};

use portal_domain::device::DeviceId;
use portal_domain::identifier::Identifier;

use crate::domain::repository::SessionRepository;
use crate::domain::types::{Admission, SessionPolicy};
use crate::error::PortalError;

pub struct ValidatePasscodeInput {
    pub user_id: String,
    pub passcode: String,
    pub device_id: String,
}

pub struct ValidatePasscodeOutput {
    pub admission: Admission,
    pub validity_hours: i64,
}

impl ValidatePasscodeOutput {
    pub fn describe(&self) -> String {
        format!(
            "Access Granted! Connected to WiFi for {} hours.",
            self.validity_hours
        )
    }
}

pub struct ValidatePasscodeUseCase<S>
where
    S: SessionRepository,
{
    pub sessions: S,
    pub policy: SessionPolicy,
}

impl<S> ValidatePasscodeUseCase<S>
where
    S: SessionRepository,
{
    pub async fn execute(
        &self,
        input: ValidatePasscodeInput,
    ) -> Result<ValidatePasscodeOutput, PortalError> {
        let user_id = Identifier::parse(&input.user_id);
        let passcode = input.passcode.trim();
        let (user_id, passcode) = match user_id {
            Ok(user_id) if !passcode.is_empty() => (user_id, passcode),
            _ => return Err(PortalError::validation("Missing ID or Passcode.")),
        };
        let device = DeviceId::parse(&input.device_id)?;

        let result = self
            .sessions
            .redeem(
                user_id.as_str(),
                passcode,
                &device,
                Utc::now(),
                self.policy.device_cap,
            )
            .await;

        match result {
            Ok(admission) => {
                info!(%user_id, %device, ?admission, "access granted");
                Ok(ValidatePasscodeOutput {
                    admission,
                    validity_hours: self.policy.validity_hours(),
                })
            }
            Err(e) => {
                debug!(%user_id, %device, kind = e.kind(), "access denied");
                Err(e)
            }
        }
    }
}
