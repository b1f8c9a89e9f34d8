use chrono::Utc;
use rand::RngExt;
use tracing::info;

use portal_domain::identifier::Identifier;

use crate::domain::repository::SessionRepository;
use crate::domain::types::{Session, SessionPolicy};
use crate::error::PortalError;

/// Passcode alphabet: digits, lowercase, uppercase.
pub const CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Each position is drawn independently from the thread-local CSPRNG.
pub fn generate_passcode(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

pub struct RequestPasscodeInput {
    pub user_id: String,
}

pub struct RequestPasscodeUseCase<S>
where
    S: SessionRepository,
{
    pub sessions: S,
    pub policy: SessionPolicy,
}

impl<S> RequestPasscodeUseCase<S>
where
    S: SessionRepository,
{
    pub async fn execute(&self, input: RequestPasscodeInput) -> Result<(), PortalError> {
        let user_id = Identifier::parse(&input.user_id)
            .map_err(|_| PortalError::validation("Mobile/Email is required."))?;

        // A repeated request replaces the previous passcode and unbinds its devices.
        let session = Session::issue(
            user_id,
            generate_passcode(self.policy.passcode_len),
            Utc::now(),
            &self.policy,
        );
        self.sessions.upsert(&session).await?;

        info!(user_id = %session.user_id, expires_at = %session.expires_at, "passcode requested");
        Ok(())
    }
}
