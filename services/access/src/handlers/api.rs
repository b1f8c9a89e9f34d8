use std::str::FromStr;

use axum::{
    Form, Json,
    extract::{Query, State, rejection::FormRejection},
};
use serde::{Deserialize, Serialize};

use crate::error::PortalError;
use crate::state::AppState;
use crate::usecase::approve::{ApprovePasscodeInput, ApprovePasscodeUseCase};
use crate::usecase::request::{RequestPasscodeInput, RequestPasscodeUseCase};
use crate::usecase::validate::{ValidatePasscodeInput, ValidatePasscodeUseCase};

// ── Request / response types ─────────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub struct ApiQuery {
    #[serde(default)]
    pub action: String,
    pub user_id: Option<String>,
    pub passcode: Option<String>,
    pub device_id: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct ApiForm {
    pub user_id: Option<String>,
    pub passcode: Option<String>,
    pub device_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub status: &'static str,
    pub message: String,
}

impl ApiResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Request,
    ApproveAndSend,
    Validate,
}

impl FromStr for Action {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "request" => Ok(Self::Request),
            "approve_and_send" => Ok(Self::ApproveAndSend),
            "validate" => Ok(Self::Validate),
            _ => Err(PortalError::InvalidAction),
        }
    }
}

/// Form fields win; the query string fills in whatever the form left out.
struct Params {
    user_id: String,
    passcode: String,
    device_id: String,
}

impl Params {
    fn merge(form: ApiForm, query: ApiQuery) -> Self {
        Self {
            user_id: form.user_id.or(query.user_id).unwrap_or_default(),
            passcode: form.passcode.or(query.passcode).unwrap_or_default(),
            device_id: form.device_id.or(query.device_id).unwrap_or_default(),
        }
    }
}

// ── GET /api ─────────────────────────────────────────────────────────────────

/// Lets an operator approve straight from a link: `/api?action=approve_and_send&user_id=…`.
pub async fn api_get(
    State(state): State<AppState>,
    Query(query): Query<ApiQuery>,
) -> Result<Json<ApiResponse>, PortalError> {
    dispatch(&state, query, Ok(Form(ApiForm::default()))).await
}

// ── POST /api ────────────────────────────────────────────────────────────────

/// The body is optional: a POST without a urlencoded body reads every field
/// from the query string, so rejections still come back as JSON.
pub async fn api_post(
    State(state): State<AppState>,
    Query(query): Query<ApiQuery>,
    form: Result<Form<ApiForm>, FormRejection>,
) -> Result<Json<ApiResponse>, PortalError> {
    dispatch(&state, query, form).await
}

fn form_or_default(form: Result<Form<ApiForm>, FormRejection>) -> Result<ApiForm, PortalError> {
    match form {
        Ok(Form(form)) => Ok(form),
        Err(FormRejection::InvalidFormContentType(_)) => Ok(ApiForm::default()),
        Err(rejection) => Err(PortalError::validation(rejection.body_text())),
    }
}

async fn dispatch(
    state: &AppState,
    query: ApiQuery,
    form: Result<Form<ApiForm>, FormRejection>,
) -> Result<Json<ApiResponse>, PortalError> {
    let action: Action = query.action.parse()?;
    let params = Params::merge(form_or_default(form)?, query);

    let message = match action {
        Action::Request => {
            let usecase = RequestPasscodeUseCase {
                sessions: state.session_repo(),
                policy: state.policy,
            };
            usecase
                .execute(RequestPasscodeInput {
                    user_id: params.user_id,
                })
                .await?;
            "Request sent! Waiting for approval.".to_owned()
        }
        Action::ApproveAndSend => {
            let usecase = ApprovePasscodeUseCase {
                sessions: state.session_repo(),
            };
            usecase
                .execute(ApprovePasscodeInput {
                    user_id: params.user_id,
                })
                .await?
                .describe()
        }
        Action::Validate => {
            let usecase = ValidatePasscodeUseCase {
                sessions: state.session_repo(),
                policy: state.policy,
            };
            usecase
                .execute(ValidatePasscodeInput {
                    user_id: params.user_id,
                    passcode: params.passcode,
                    device_id: params.device_id,
                })
                .await?
                .describe()
        }
    };

    Ok(Json(ApiResponse::success(message)))
}
