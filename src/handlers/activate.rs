use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::activation::db_repository::DatabaseLicenseRepository;
use crate::activation::{ActivationOutcome, ActivationService, RequestContext};
use crate::app_state::AppState;
use crate::error::ApiError;
use crate::handlers::{apply_cors, client_ip, user_agent};
use crate::license;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationRequest {
    #[serde(default)]
    pub license_key: String,
    #[serde(default)]
    pub device_id: String,
}

#[derive(Debug, Serialize)]
pub struct ActivationResponse {
    pub success: bool,
    pub token: String,
    pub message: String,
}

/// POST /api/activate
/// Redeems a license key for a device-bound activation token.
pub async fn activate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ActivationRequest>,
) -> Result<Response, ApiError> {
    // sweep stale windows while we're here
    state.limiter.cleanup();

    let license_key = request.license_key.trim();
    let device_id = request.device_id.trim();

    if license_key.is_empty() || device_id.is_empty() {
        return Err(ApiError::Validation(
            "Missing licenseKey or deviceId".to_string(),
        ));
    }
    if !license::is_valid_format(license_key) {
        return Err(ApiError::Validation(
            "Invalid license key format".to_string(),
        ));
    }

    let ip = client_ip(&headers);
    let rate_key = format!("{}:{}", ip, device_id);
    if state.limiter.check(&rate_key) {
        return Err(ApiError::RateLimited {
            retry_after: state.config.activation_rate_window_secs,
        });
    }

    let repo = DatabaseLicenseRepository::new(state.pool.clone());
    let service = ActivationService::new(&state.signer);
    let context = RequestContext {
        client_ip: ip,
        user_agent: user_agent(&headers),
    };

    let outcome = service
        .activate(&repo, license_key, device_id, &context)
        .await?;

    let (token, message) = match outcome {
        ActivationOutcome::Activated { token } => (token, "License activated successfully"),
        ActivationOutcome::Reissued { token } => {
            (token, "License already activated on this device")
        }
    };

    Ok(apply_cors(
        (
            StatusCode::OK,
            Json(ActivationResponse {
                success: true,
                token,
                message: message.to_string(),
            }),
        )
            .into_response(),
    ))
}

/// OPTIONS /api/activate
pub async fn preflight() -> Response {
    apply_cors((StatusCode::OK, "ok").into_response())
}
