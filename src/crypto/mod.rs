use anyhow::{Result, anyhow};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted age of a signed webhook timestamp, in seconds.
/// Deliveries outside this tolerance are treated as replays.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// A parsed `Stripe-Signature` header: `t=<unix>,v1=<hex hmac>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookSignature {
    pub timestamp: i64,
    pub signature: Vec<u8>,
}

impl WebhookSignature {
    /// Parses the signature header. Missing `t` or `v1` elements, or
    /// non-hex signature bytes, are a malformed header (an error, distinct
    /// from a well-formed header that fails verification).
    pub fn parse(header: &str) -> Result<Self> {
        let mut timestamp = None;
        let mut signature = None;

        for element in header.split(',') {
            match element.trim().split_once('=') {
                Some(("t", value)) => {
                    timestamp = Some(
                        value
                            .parse::<i64>()
                            .map_err(|_| anyhow!("Invalid signature timestamp"))?,
                    );
                }
                Some(("v1", value)) => {
                    signature =
                        Some(hex::decode(value).map_err(|_| anyhow!("Invalid signature hex"))?);
                }
                _ => {}
            }
        }

        match (timestamp, signature) {
            (Some(timestamp), Some(signature)) => Ok(Self {
                timestamp,
                signature,
            }),
            (None, _) => Err(anyhow!("Signature header missing timestamp")),
            (_, None) => Err(anyhow!("Signature header missing v1 signature")),
        }
    }
}

/// Verifies a provider-signed webhook payload.
///
/// The signed message is `"{t}.{payload}"`, MACed with HMAC-SHA256 under
/// the webhook secret. Returns `Ok(false)` for a wrong signature or a
/// timestamp outside the tolerance window, `Err` only for a malformed
/// header.
pub fn verify_webhook_signature(secret: &str, payload: &[u8], header: &str) -> Result<bool> {
    verify_webhook_signature_at(secret, payload, header, chrono::Utc::now().timestamp())
}

pub fn verify_webhook_signature_at(
    secret: &str,
    payload: &[u8],
    header: &str,
    now: i64,
) -> Result<bool> {
    let parsed = WebhookSignature::parse(header)?;

    if (now - parsed.timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Ok(false);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow!("Invalid HMAC key: {:?}", e))?;
    mac.update(parsed.timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    // verify_slice is constant-time
    Ok(mac.verify_slice(&parsed.signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test123secret456";

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.", timestamp).as_bytes());
        mac.update(payload);
        format!(
            "t={},v1={}",
            timestamp,
            hex::encode(mac.finalize().into_bytes())
        )
    }

    #[test]
    fn test_valid_signature_accepted() {
        let payload = b"{\"type\":\"checkout.session.completed\"}";
        let header = sign(payload, SECRET, 1_700_000_000);
        let result = verify_webhook_signature_at(SECRET, payload, &header, 1_700_000_000).unwrap();
        assert!(result);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = b"{\"type\":\"checkout.session.completed\"}";
        let header = sign(payload, "wrong_secret", 1_700_000_000);
        let result = verify_webhook_signature_at(SECRET, payload, &header, 1_700_000_000).unwrap();
        assert!(!result);
    }

    #[test]
    fn test_modified_payload_rejected() {
        let original = b"{\"type\":\"checkout.session.completed\"}";
        let modified = b"{\"type\":\"checkout.session.completed\",\"extra\":true}";
        let header = sign(original, SECRET, 1_700_000_000);
        let result = verify_webhook_signature_at(SECRET, modified, &header, 1_700_000_000).unwrap();
        assert!(!result);
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let payload = b"{}";
        let signed_at = 1_700_000_000;
        let header = sign(payload, SECRET, signed_at);
        // delivered 10 minutes later
        let result =
            verify_webhook_signature_at(SECRET, payload, &header, signed_at + 600).unwrap();
        assert!(!result);
    }

    #[test]
    fn test_timestamp_within_tolerance_accepted() {
        let payload = b"{}";
        let signed_at = 1_700_000_000;
        let header = sign(payload, SECRET, signed_at);
        let result =
            verify_webhook_signature_at(SECRET, payload, &header, signed_at + 250).unwrap();
        assert!(result);
    }

    #[test]
    fn test_unicode_payload_round_trips() {
        let payload = "{\"name\":\"Иван Петров\"}".as_bytes();
        let header = sign(payload, SECRET, 1_700_000_000);
        let result = verify_webhook_signature_at(SECRET, payload, &header, 1_700_000_000).unwrap();
        assert!(result);
    }

    #[test]
    fn test_malformed_headers_error() {
        let payload = b"{}";
        assert!(verify_webhook_signature_at(SECRET, payload, "", 0).is_err());
        assert!(verify_webhook_signature_at(SECRET, payload, "garbage", 0).is_err());
        assert!(verify_webhook_signature_at(SECRET, payload, "t=123", 0).is_err());
        assert!(verify_webhook_signature_at(SECRET, payload, "v1=abcdef", 0).is_err());
        assert!(verify_webhook_signature_at(SECRET, payload, "t=abc,v1=abcdef", 0).is_err());
        assert!(verify_webhook_signature_at(SECRET, payload, "t=123,v1=zzzz", 0).is_err());
    }
}
