use anyhow::{Result, anyhow};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Key alphabet: uppercase alphanumerics without the visually ambiguous
/// 0, O, I and 1. 32 symbols.
const KEY_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

const KEY_PREFIX: &str = "EVRO";
const GROUP_COUNT: usize = 4;
const GROUP_LEN: usize = 4;

/// A license key of the form `EVRO-XXXX-XXXX-XXXX-XXXX`.
///
/// The generator draws uniformly from the 32-symbol alphabet and does NOT
/// guarantee global uniqueness; callers must check the store and retry on
/// collision (see the webhook handler's bounded retry loop).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseKey(String);

impl LicenseKey {
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let mut key = String::with_capacity(KEY_PREFIX.len() + GROUP_COUNT * (GROUP_LEN + 1));
        key.push_str(KEY_PREFIX);
        for _ in 0..GROUP_COUNT {
            key.push('-');
            for _ in 0..GROUP_LEN {
                let idx = rng.random_range(0..KEY_ALPHABET.len());
                key.push(KEY_ALPHABET[idx] as char);
            }
        }
        Self(key)
    }

    /// Parses a key, accepting only the exact `EVRO-XXXX-XXXX-XXXX-XXXX`
    /// format. This is a syntax check only; whether the key exists or is
    /// activated requires the store.
    pub fn parse(s: &str) -> Result<Self> {
        if !is_valid_format(s) {
            return Err(anyhow!("Invalid license key format"));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LicenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for LicenseKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for LicenseKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Returns true iff `key` matches `EVRO-` followed by four hyphen-joined
/// groups of 4 characters from the key alphabet.
pub fn is_valid_format(key: &str) -> bool {
    let mut parts = key.split('-');
    if parts.next() != Some(KEY_PREFIX) {
        return false;
    }
    let mut groups = 0;
    for group in parts {
        if group.len() != GROUP_LEN || !group.bytes().all(|b| KEY_ALPHABET.contains(&b)) {
            return false;
        }
        groups += 1;
    }
    groups == GROUP_COUNT
}
