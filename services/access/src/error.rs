use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use portal_domain::device::DeviceIdError;
use portal_domain::identifier::IdentifierError;

/// Access service error variants.
///
/// `InvalidPasscode`, `PendingApproval`, `Expired` and `DeviceLimitExceeded` are
/// the validation rejections, reported in that precedence order.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("{0}")]
    Validation(String),
    #[error("No session found for this ID.")]
    SessionNotFound,
    #[error("Invalid Passcode.")]
    InvalidPasscode,
    #[error("Access is still pending owner approval.")]
    PendingApproval,
    #[error("Passcode has expired.")]
    Expired,
    #[error("Maximum device limit ({cap}) reached.")]
    DeviceLimitExceeded { cap: usize },
    #[error("Invalid API call.")]
    InvalidAction,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl PortalError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::InvalidPasscode => "INVALID_PASSCODE",
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Expired => "EXPIRED",
            Self::DeviceLimitExceeded { .. } => "DEVICE_LIMIT_EXCEEDED",
            Self::InvalidAction => "INVALID_ACTION",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<IdentifierError> for PortalError {
    fn from(e: IdentifierError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<DeviceIdError> for PortalError {
    fn from(e: DeviceIdError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) | Self::InvalidAction => StatusCode::BAD_REQUEST,
            Self::SessionNotFound => StatusCode::NOT_FOUND,
            Self::InvalidPasscode => StatusCode::UNAUTHORIZED,
            Self::PendingApproval | Self::DeviceLimitExceeded { .. } => StatusCode::FORBIDDEN,
            Self::Expired => StatusCode::GONE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // TraceLayer already records method/uri/status; only 500s carry a cause worth logging.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = ?e, kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "status": "error",
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
