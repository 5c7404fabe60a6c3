use anyhow::Result;
use sqlx::{Pool, Sqlite};

use crate::activation::LicenseRepository;
use crate::db::models::License;
use crate::db::queries;

/// Database implementation of LicenseRepository
pub struct DatabaseLicenseRepository {
    pool: Pool<Sqlite>,
}

impl DatabaseLicenseRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl LicenseRepository for DatabaseLicenseRepository {
    async fn get_by_key(&self, key: &str) -> Result<Option<License>> {
        Ok(queries::get_license_by_key(&self.pool, key).await?)
    }

    async fn activate(&self, license_id: i64, device_id: &str, metadata: &str) -> Result<bool> {
        Ok(queries::activate_license(&self.pool, license_id, device_id, metadata).await?)
    }
}
