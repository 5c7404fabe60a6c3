use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::handlers::{apply_cors, client_ip, user_agent};
use crate::mailer::{ContactMessage, MailerError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub page: String,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Serialize)]
pub struct ContactAccepted {
    pub ok: bool,
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContactRejected {
    pub ok: bool,
    pub error: String,
}

/// POST /api/contact
/// Relays a lead-capture inquiry to the configured inbox.
pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ContactRequest>,
) -> Response {
    let full_name = request.full_name.trim();
    let phone = request.phone.trim();
    let email = request.email.trim();

    if full_name.is_empty() || phone.is_empty() || email.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Missing required fields");
    }

    let description = request.description.trim();
    let page = request.page.trim();
    let language = request.language.trim();
    let agent = user_agent(&headers);
    let ip = client_ip(&headers);

    let mut lines = vec![
        "New EvroLev inquiry".to_string(),
        format!("Full name: {full_name}"),
        format!("Phone: {phone}"),
        format!("Email: {email}"),
        if description.is_empty() {
            "Description: (not provided)".to_string()
        } else {
            format!("Description: {description}")
        },
    ];
    if !page.is_empty() {
        lines.push(format!("Page: {page}"));
    }
    if !language.is_empty() {
        lines.push(format!("Language: {language}"));
    }
    lines.push(format!("User-Agent: {agent}"));
    lines.push(format!("IP: {ip}"));
    let text = lines.join("\n");

    let message = ContactMessage {
        subject: format!("EvroLev inquiry: {full_name}"),
        text,
        reply_to: email.to_string(),
    };

    match state.mailer.send(&message).await {
        Ok(receipt) => apply_cors(
            (
                StatusCode::OK,
                Json(ContactAccepted {
                    ok: true,
                    id: receipt.id,
                }),
            )
                .into_response(),
        ),
        Err(MailerError::Config(e)) => {
            tracing::error!("contact relay misconfigured: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Server misconfigured")
        }
        Err(MailerError::Provider(e)) => {
            tracing::error!("delivery provider rejected inquiry: {}", e);
            error_response(StatusCode::BAD_GATEWAY, "Email delivery failed")
        }
        Err(MailerError::Transport(e)) => {
            tracing::error!("delivery provider unreachable: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Email delivery failed")
        }
    }
}

/// OPTIONS /api/contact
pub async fn preflight() -> Response {
    apply_cors(StatusCode::NO_CONTENT.into_response())
}

fn error_response(status: StatusCode, error: &str) -> Response {
    apply_cors(
        (
            status,
            Json(ContactRejected {
                ok: false,
                error: error.to_string(),
            }),
        )
            .into_response(),
    )
}
