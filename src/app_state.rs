use sqlx::{Pool, Sqlite};
use std::sync::Arc;

use crate::{config::Config, mailer::Mailer, ratelimit::FixedWindowLimiter, token::TokenSigner};

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Sqlite>,
    pub config: Arc<Config>,
    pub mailer: Arc<dyn Mailer>,
    pub limiter: Arc<FixedWindowLimiter>,
    pub signer: Arc<TokenSigner>,
}
