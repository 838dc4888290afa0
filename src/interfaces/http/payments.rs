use super::{AdminUser, ApiJson, AppState, AuthUser, MaybeAuthUser};
use crate::application::enrollment::{
    CheckoutOptions, CheckoutStarted, Initiator, MarkPaidOutcome, VerifyOutcome, WebhookEvent,
};
use crate::domain::payment::{Amount, Plan};
use crate::domain::user::Email;
use crate::error::{AcademyError, Result};
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::warn;

const SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Every field is optional, so `{}` buys the full plan; anything that does
/// not parse is rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InitializeBody {
    plan: Plan,
    callback_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicInitializeBody {
    email: String,
    name: String,
    #[serde(default)]
    phone_number: Option<String>,
    #[serde(default)]
    plan: Plan,
    #[serde(default)]
    amount: Option<Amount>,
    #[serde(default)]
    callback_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyBody {
    #[serde(default)]
    reference: String,
}

#[derive(Debug, Deserialize)]
pub struct MarkPaidBody {
    email: String,
    #[serde(default)]
    amount: Option<Amount>,
}

pub async fn initialize(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    ApiJson(body): ApiJson<InitializeBody>,
) -> Result<Json<CheckoutStarted>> {
    let options = CheckoutOptions {
        plan: body.plan,
        amount: None,
        callback_url: body.callback_url,
    };
    let started = state
        .enrollment
        .initialize(Initiator::Authenticated(caller.id), options)
        .await?;
    Ok(Json(started))
}

pub async fn initialize_public(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<PublicInitializeBody>,
) -> Result<Json<CheckoutStarted>> {
    let initiator = Initiator::Public {
        email: Email::parse(&body.email)?,
        name: body.name,
        phone_number: body.phone_number,
    };
    let options = CheckoutOptions {
        plan: body.plan,
        amount: body.amount,
        callback_url: body.callback_url,
    };
    Ok(Json(state.enrollment.initialize(initiator, options).await?))
}

pub async fn verify(
    State(state): State<AppState>,
    MaybeAuthUser(caller): MaybeAuthUser,
    ApiJson(body): ApiJson<VerifyBody>,
) -> Result<Json<VerifyOutcome>> {
    let outcome = state
        .enrollment
        .verify(caller.as_ref(), &body.reference)
        .await?;
    Ok(Json(outcome))
}

/// Provider callback. The raw body must carry a valid signature before it is
/// even parsed; failures get a bare 401.
pub async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let authentic = match signature {
        Some(signature) => state.webhook_signer.verify(&body, signature),
        None => false,
    };
    if !authentic {
        warn!(signed = signature.is_some(), "webhook rejected");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            return AcademyError::ValidationError(format!("Malformed webhook event: {e}"))
                .into_response();
        }
    };
    match state.enrollment.handle_webhook(event).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn mark_paid(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiJson(body): ApiJson<MarkPaidBody>,
) -> Result<Json<MarkPaidOutcome>> {
    let email = Email::parse(&body.email)?;
    Ok(Json(state.enrollment.mark_paid(&email, body.amount).await?))
}
