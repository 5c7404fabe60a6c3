use anyhow::Result;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::license::LicenseKey;

/// Claims carried by an activation token.
///
/// The token is stateless: nothing is persisted on issuance, and there is
/// no revocation mechanism. Revoking access requires a server-side check
/// against the license's current activation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationClaims {
    pub license_key: String,
    pub device_id: String,
    /// Issue time, unix seconds.
    pub activated_at: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
    /// Unique token id; makes every issuance distinct even for identical
    /// key/device pairs within the same second.
    pub jti: String,
}

/// Issues and verifies HS256-signed activation tokens.
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validity_days: i64,
}

impl TokenSigner {
    pub fn new(secret: &[u8], validity_days: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validity_days,
        }
    }

    /// Produces a signed token binding `license_key` to `device_id`,
    /// valid from now until now + validity window.
    pub fn issue(&self, license_key: &LicenseKey, device_id: &str) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = ActivationClaims {
            license_key: license_key.to_string(),
            device_id: device_id.to_string(),
            activated_at: now,
            exp: now + self.validity_days * 24 * 60 * 60,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Verifies signature and expiry, returning the decoded claims on
    /// success and `None` on any failure: bad signature, malformed
    /// structure, or an expired token. Never panics on hostile input.
    pub fn verify(&self, token: &str) -> Option<ActivationClaims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<ActivationClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .ok()
    }
}
