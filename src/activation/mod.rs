use anyhow::Result;
use serde_json::{Value, json};

use crate::db::models::License;
use crate::device;
use crate::error::ApiError;
use crate::license::LicenseKey;
use crate::token::TokenSigner;

/// Request metadata recorded on the license at activation time.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub client_ip: String,
    pub user_agent: String,
}

/// Store operations the activation flow needs. Implemented against sqlx in
/// `db_repository`; tests supply an in-memory implementation.
#[async_trait::async_trait]
pub trait LicenseRepository {
    async fn get_by_key(&self, key: &str) -> Result<Option<License>>;

    /// Conditionally binds `device_id` to an unactivated license. Returns
    /// false when no row changed (already activated, e.g. lost race).
    async fn activate(&self, license_id: i64, device_id: &str, metadata: &str) -> Result<bool>;
}

/// Successful activation result.
#[derive(Debug)]
pub enum ActivationOutcome {
    /// First activation: device bound, state mutated, token issued.
    Activated { token: String },
    /// Same device against an already-activated license: fresh token,
    /// stored state untouched.
    Reissued { token: String },
}

/// Drives the per-license state machine UNACTIVATED -> ACTIVATED. The
/// device binding is permanent: once set it is never re-mutated, and a
/// mismatching device is rejected outright.
pub struct ActivationService<'a> {
    signer: &'a TokenSigner,
}

impl<'a> ActivationService<'a> {
    pub fn new(signer: &'a TokenSigner) -> Self {
        Self { signer }
    }

    pub async fn activate<R: LicenseRepository>(
        &self,
        repo: &R,
        license_key: &str,
        device_id: &str,
        context: &RequestContext,
    ) -> Result<ActivationOutcome, ApiError> {
        if license_key.trim().is_empty() || device_id.trim().is_empty() {
            return Err(ApiError::Validation(
                "Missing licenseKey or deviceId".to_string(),
            ));
        }

        let device_id = device::validate_device_id(device_id)
            .map_err(|e| ApiError::Validation(e.to_string()))?;

        let key = LicenseKey::parse(license_key)
            .map_err(|_| ApiError::Validation("Invalid license key format".to_string()))?;

        let license = repo
            .get_by_key(key.as_str())
            .await
            .map_err(|e| ApiError::Internal(format!("license lookup failed: {e}")))?
            .ok_or_else(|| ApiError::NotFound("Invalid license key".to_string()))?;

        if license.activated {
            return if license.device_id.as_deref() == Some(device_id) {
                let token = self.issue_token(&key, device_id)?;
                Ok(ActivationOutcome::Reissued { token })
            } else {
                Err(ApiError::Forbidden(
                    "License already activated on another device".to_string(),
                ))
            };
        }

        let metadata = merge_activation_metadata(license.metadata.as_deref(), context);
        let updated = repo
            .activate(license.license_id, device_id, &metadata)
            .await
            .map_err(|e| ApiError::Internal(format!("activation update failed: {e}")))?;

        if !updated {
            // lost a race with another instance; retryable, and the retry
            // lands on the idempotent or mismatch path above
            return Err(ApiError::Internal(
                "Activation failed. Please try again.".to_string(),
            ));
        }

        tracing::info!(key = %key, "license activated");
        let token = self.issue_token(&key, device_id)?;
        Ok(ActivationOutcome::Activated { token })
    }

    fn issue_token(&self, key: &LicenseKey, device_id: &str) -> Result<String, ApiError> {
        self.signer
            .issue(key, device_id)
            .map_err(|e| ApiError::Internal(format!("token issuance failed: {e}")))
    }
}

/// Merges activation request metadata into the license's existing JSON
/// blob, preserving prior keys.
fn merge_activation_metadata(existing: Option<&str>, context: &RequestContext) -> String {
    let mut map = match existing.and_then(|raw| serde_json::from_str::<Value>(raw).ok()) {
        Some(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };

    map.insert("activation_ip".to_string(), json!(context.client_ip));
    map.insert(
        "activation_user_agent".to_string(),
        json!(context.user_agent),
    );

    Value::Object(map).to_string()
}

pub mod db_repository;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MemoryRepository {
        licenses: Mutex<HashMap<String, License>>,
        fail_activation: bool,
    }

    impl MemoryRepository {
        fn with_license(key: &str) -> Self {
            let license = License {
                license_id: 1,
                key: key.to_string(),
                activated: false,
                device_id: None,
                activated_at: None,
                stripe_event_id: Some("evt_1".to_string()),
                phone: None,
                metadata: Some("{\"payment_status\":\"paid\"}".to_string()),
                created_at: None,
            };
            Self {
                licenses: Mutex::new(HashMap::from([(key.to_string(), license)])),
                fail_activation: false,
            }
        }

        fn license(&self, key: &str) -> License {
            self.licenses.lock().unwrap().get(key).unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl LicenseRepository for MemoryRepository {
        async fn get_by_key(&self, key: &str) -> Result<Option<License>> {
            Ok(self.licenses.lock().unwrap().get(key).cloned())
        }

        async fn activate(
            &self,
            license_id: i64,
            device_id: &str,
            metadata: &str,
        ) -> Result<bool> {
            if self.fail_activation {
                return Ok(false);
            }
            let mut licenses = self.licenses.lock().unwrap();
            let license = licenses
                .values_mut()
                .find(|l| l.license_id == license_id && !l.activated);
            match license {
                Some(license) => {
                    license.activated = true;
                    license.device_id = Some(device_id.to_string());
                    license.activated_at = Some("2026-01-01 00:00:00".to_string());
                    license.metadata = Some(metadata.to_string());
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    const KEY: &str = "EVRO-ABCD-EFGH-JKLM-NPQR";

    fn context() -> RequestContext {
        RequestContext {
            client_ip: "203.0.113.9".to_string(),
            user_agent: "test-agent".to_string(),
        }
    }

    fn signer() -> TokenSigner {
        TokenSigner::new(b"test_secret", 30)
    }

    #[tokio::test]
    async fn test_first_activation_binds_device_and_issues_token() {
        let repo = MemoryRepository::with_license(KEY);
        let signer = signer();
        let service = ActivationService::new(&signer);

        let outcome = service
            .activate(&repo, KEY, "device-a", &context())
            .await
            .unwrap();

        let token = match outcome {
            ActivationOutcome::Activated { token } => token,
            other => panic!("expected Activated, got {:?}", other),
        };

        let claims = signer.verify(&token).expect("token should verify");
        assert_eq!(claims.license_key, KEY);
        assert_eq!(claims.device_id, "device-a");

        let stored = repo.license(KEY);
        assert!(stored.activated);
        assert_eq!(stored.device_id.as_deref(), Some("device-a"));
        assert!(stored.activated_at.is_some());

        // request metadata merged without losing prior keys
        let metadata: serde_json::Value =
            serde_json::from_str(stored.metadata.as_deref().unwrap()).unwrap();
        assert_eq!(metadata["payment_status"], "paid");
        assert_eq!(metadata["activation_ip"], "203.0.113.9");
        assert_eq!(metadata["activation_user_agent"], "test-agent");
    }

    #[tokio::test]
    async fn test_same_device_reactivation_reissues_without_mutation() {
        let repo = MemoryRepository::with_license(KEY);
        let signer = signer();
        let service = ActivationService::new(&signer);

        let first = service
            .activate(&repo, KEY, "device-a", &context())
            .await
            .unwrap();
        let before = repo.license(KEY);

        let second = service
            .activate(&repo, KEY, "device-a", &context())
            .await
            .unwrap();

        let (first_token, second_token) = match (first, second) {
            (
                ActivationOutcome::Activated { token: a },
                ActivationOutcome::Reissued { token: b },
            ) => (a, b),
            other => panic!("expected Activated then Reissued, got {:?}", other),
        };

        assert_ne!(first_token, second_token);
        let after = repo.license(KEY);
        assert_eq!(before.device_id, after.device_id);
        assert_eq!(before.activated_at, after.activated_at);
        assert_eq!(before.metadata, after.metadata);
    }

    #[tokio::test]
    async fn test_other_device_is_rejected_without_mutation() {
        let repo = MemoryRepository::with_license(KEY);
        let signer = signer();
        let service = ActivationService::new(&signer);

        service
            .activate(&repo, KEY, "device-a", &context())
            .await
            .unwrap();

        let result = service.activate(&repo, KEY, "device-b", &context()).await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));
        assert_eq!(repo.license(KEY).device_id.as_deref(), Some("device-a"));
    }

    #[tokio::test]
    async fn test_unknown_key_is_not_found() {
        let repo = MemoryRepository::with_license(KEY);
        let signer = signer();
        let service = ActivationService::new(&signer);

        let result = service
            .activate(&repo, "EVRO-ZZZZ-ZZZZ-ZZZZ-ZZZZ", "device-a", &context())
            .await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_invalid_inputs_are_validation_errors() {
        let repo = MemoryRepository::with_license(KEY);
        let signer = signer();
        let service = ActivationService::new(&signer);

        let empty_key = service.activate(&repo, "", "device-a", &context()).await;
        assert!(matches!(empty_key, Err(ApiError::Validation(_))));

        let empty_device = service.activate(&repo, KEY, "   ", &context()).await;
        assert!(matches!(empty_device, Err(ApiError::Validation(_))));

        let bad_format = service
            .activate(&repo, "EVRO-AB0D-EFGH-JKLM-NPQR", "device-a", &context())
            .await;
        assert!(matches!(bad_format, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_failed_persist_is_retryable_server_error() {
        let mut repo = MemoryRepository::with_license(KEY);
        repo.fail_activation = true;
        let signer = signer();
        let service = ActivationService::new(&signer);

        let result = service.activate(&repo, KEY, "device-a", &context()).await;
        assert!(matches!(result, Err(ApiError::Internal(_))));
    }
}
