use axum::{Router, routing::post};
use clap::Parser;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use evrolev_server::app_state::AppState;
use evrolev_server::config::Config;
use evrolev_server::db::init_pool;
use evrolev_server::handlers::{activate, calculator, contact, webhook};
use evrolev_server::mailer::{Mailer, ResendMailer};
use evrolev_server::ratelimit::FixedWindowLimiter;
use evrolev_server::token::TokenSigner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "evrolev_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse configuration
    let config = Arc::new(Config::parse());

    // Initialize database
    let pool = init_pool(&config.database_url).await?;

    // Outbound email backend
    let mailer: Arc<dyn Mailer> = Arc::new(ResendMailer::new(
        config.resend_api_key.clone(),
        config.resend_from.clone(),
        config.contact_to.clone(),
    ));

    // Create shared state
    let state = AppState {
        pool,
        signer: Arc::new(TokenSigner::new(
            config.activation_jwt_secret.as_bytes(),
            config.activation_token_days,
        )),
        limiter: Arc::new(FixedWindowLimiter::new(
            config.activation_rate_limit,
            config.activation_rate_window_secs as i64 * 1000,
        )),
        mailer,
        config: config.clone(),
    };

    // Build router
    let app = Router::new()
        // Change calculator
        .route(
            "/api/change",
            post(calculator::compute).options(calculator::preflight),
        )
        // Contact form relay
        .route(
            "/api/contact",
            post(contact::submit).options(contact::preflight),
        )
        // License activation
        .route(
            "/api/activate",
            post(activate::activate).options(activate::preflight),
        )
        // Payment webhook
        .route(
            "/api/stripe-webhook",
            post(webhook::stripe_webhook).options(webhook::preflight),
        )
        // Add middleware
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        // Add shared state
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.socket_addr()).await?;

    tracing::info!("Server running on {}", config.socket_addr());

    axum::serve(listener, app).await?;

    Ok(())
}
