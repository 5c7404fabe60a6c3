use serde::{Deserialize, Serialize};

/// One purchased license. `key` is globally unique; `device_id` stays null
/// until the first activation and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct License {
    pub license_id: i64,
    pub key: String,
    pub activated: bool,
    pub device_id: Option<String>,
    pub activated_at: Option<String>,
    pub stripe_event_id: Option<String>,
    pub phone: Option<String>,
    pub metadata: Option<String>,
    pub created_at: Option<String>,
}

/// Fields for a new license row created from a payment event.
#[derive(Debug, Clone)]
pub struct NewLicense<'a> {
    pub key: &'a str,
    pub phone: Option<&'a str>,
    pub stripe_event_id: &'a str,
    pub metadata: &'a str,
}
