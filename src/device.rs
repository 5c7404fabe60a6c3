use anyhow::{Result, anyhow};
use rand::Rng;

/// Longest device id accepted from a client.
const MAX_DEVICE_ID_LEN: usize = 128;

/// Generates a fresh device identifier from a secure random source.
pub fn generate_device_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Fallback identifier for callers without a secure random source:
/// unix-millis timestamp plus a random base-36 suffix. No cryptographic
/// uniqueness is claimed for this path.
pub fn fallback_device_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let mut rng = rand::rng();
    let suffix: String = (0..13)
        .map(|_| {
            let n = rng.random_range(0..36u32);
            char::from_digit(n, 36).unwrap_or('0')
        })
        .collect();
    format!("{}-{}", millis, suffix)
}

/// Validates an inbound device identifier: non-empty after trimming and
/// within the length cap. Returns the trimmed id.
pub fn validate_device_id(raw: &str) -> Result<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Device id must not be empty"));
    }
    if trimmed.len() > MAX_DEVICE_ID_LEN {
        return Err(anyhow!("Device id too long"));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique_uuids() {
        let a = generate_device_id();
        let b = generate_device_id();
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn test_fallback_id_shape() {
        let id = fallback_device_id();
        let (millis, suffix) = id.split_once('-').expect("timestamp-suffix shape");
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), 13);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_inbound_validation() {
        assert_eq!(validate_device_id("  abc  ").unwrap(), "abc");
        assert!(validate_device_id("").is_err());
        assert!(validate_device_id("   ").is_err());
        assert!(validate_device_id(&"x".repeat(200)).is_err());
    }
}
