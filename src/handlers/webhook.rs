use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::crypto;
use crate::db::models::NewLicense;
use crate::db::queries;
use crate::error::ApiError;
use crate::handlers::apply_cors;
use crate::license::LicenseKey;

/// Attempts at generating a key that is absent from the store before the
/// whole delivery is failed.
const MAX_KEY_ATTEMPTS: usize = 10;

const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, Deserialize)]
struct StripeEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: StripeSession,
}

#[derive(Debug, Deserialize)]
struct StripeSession {
    #[serde(default)]
    id: String,
    #[serde(default)]
    customer_details: Option<CustomerDetails>,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CustomerDetails {
    #[serde(default)]
    phone: Option<String>,
}

/// POST /api/stripe-webhook
/// Turns a verified payment-completion event into a license row, exactly
/// once per event id. The provider retries 5xx deliveries.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Response, ApiError> {
    let Some(secret) = state.config.stripe_webhook_secret.as_deref() else {
        return Err(ApiError::Config("STRIPE_WEBHOOK_SECRET is not set".to_string()));
    };

    let Some(signature) = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
    else {
        return Ok(error_response(
            StatusCode::BAD_REQUEST,
            "Missing stripe-signature header",
        ));
    };

    match crypto::verify_webhook_signature(secret, body.as_bytes(), signature) {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!("webhook signature verification failed");
            return Ok(error_response(StatusCode::UNAUTHORIZED, "Invalid signature"));
        }
        Err(_) => {
            return Ok(error_response(
                StatusCode::BAD_REQUEST,
                "Malformed signature header",
            ));
        }
    }

    let event: StripeEvent = match serde_json::from_str(&body) {
        Ok(event) => event,
        Err(_) => return Ok(error_response(StatusCode::BAD_REQUEST, "Invalid event payload")),
    };

    if event.event_type != CHECKOUT_COMPLETED {
        return Ok(received_response(json!({
            "received": true,
            "message": "Event type not handled",
        })));
    }

    // idempotency: a replayed delivery must not create a second license
    if queries::get_license_by_event_id(&state.pool, &event.id)
        .await?
        .is_some()
    {
        tracing::info!(event_id = %event.id, "event already processed");
        return Ok(received_response(json!({
            "received": true,
            "message": "Event already processed",
        })));
    }

    let mut license_key = None;
    for _ in 0..MAX_KEY_ATTEMPTS {
        let candidate = LicenseKey::generate();
        if queries::get_license_by_key(&state.pool, candidate.as_str())
            .await?
            .is_none()
        {
            license_key = Some(candidate);
            break;
        }
    }
    let Some(key) = license_key else {
        return Err(ApiError::Internal(format!(
            "no unique license key after {MAX_KEY_ATTEMPTS} attempts"
        )));
    };

    let session = &event.data.object;
    let phone = session
        .customer_details
        .as_ref()
        .and_then(|details| details.phone.as_deref());
    let metadata = json!({
        "stripe_session_id": session.id,
        "payment_status": session.payment_status.as_ref().or(session.status.as_ref()),
    })
    .to_string();

    let new_license = NewLicense {
        key: key.as_str(),
        phone,
        stripe_event_id: &event.id,
        metadata: &metadata,
    };

    // a concurrent delivery of the same event loses the insert race on the
    // unique constraint and surfaces as a 5xx; the provider's retry then
    // hits the already-processed path
    queries::insert_license(&state.pool, &new_license).await?;

    tracing::info!(key = %key, event_id = %event.id, "license created");
    Ok(received_response(json!({
        "received": true,
        "licenseKey": key,
        "message": "License created successfully",
    })))
}

/// OPTIONS /api/stripe-webhook
pub async fn preflight() -> Response {
    apply_cors((StatusCode::OK, "ok").into_response())
}

fn received_response(body: serde_json::Value) -> Response {
    apply_cors((StatusCode::OK, Json(body)).into_response())
}

fn error_response(status: StatusCode, error: &str) -> Response {
    apply_cors((status, Json(json!({ "error": error }))).into_response())
}
