use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::currency::{self, ChangeBreakdown};
use crate::handlers::apply_cors;

/// Inputs arrive as free text straight from keypad fields; comma and dot
/// both work as the decimal separator, anything unparseable counts as 0.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequest {
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub paid_bgn: String,
    #[serde(default)]
    pub paid_eur: String,
}

/// POST /api/change
/// Computes change due for a EUR price paid with a BGN/EUR mix.
pub async fn compute(Json(request): Json<ChangeRequest>) -> Response {
    let breakdown = compute_breakdown(&request);
    apply_cors(Json(breakdown).into_response())
}

/// OPTIONS /api/change
pub async fn preflight() -> Response {
    apply_cors(StatusCode::NO_CONTENT.into_response())
}

fn compute_breakdown(request: &ChangeRequest) -> ChangeBreakdown {
    currency::compute_change(
        currency::parse_amount(&request.price),
        currency::parse_amount(&request.paid_bgn),
        currency::parse_amount(&request.paid_eur),
    )
}
