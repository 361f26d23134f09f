use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Decides whether a write may proceed, given what the caller presented.
///
/// This is an authorization placeholder, not an identity system.
pub trait WriteGate: Send + Sync {
    fn check(&self, presented: Option<&str>) -> Result<(), AppError>;
}

/// Admits callers presenting exactly the configured secret.
///
/// Both sides are run through HMAC under a per-process key and the tags
/// compared with `verify_slice`, which takes the same time wherever the
/// inputs differ.
pub struct SharedSecretGate {
    key: [u8; 16],
    expected: Vec<u8>,
}

impl SharedSecretGate {
    pub fn new(secret: &str) -> Result<Self, AppError> {
        let key = Uuid::new_v4().into_bytes();
        let mut mac = Self::mac(&key)?;
        mac.update(secret.as_bytes());
        Ok(Self {
            key,
            expected: mac.finalize().into_bytes().to_vec(),
        })
    }

    fn mac(key: &[u8]) -> Result<HmacSha256, AppError> {
        HmacSha256::new_from_slice(key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC key rejected: {}", e)))
    }
}

impl WriteGate for SharedSecretGate {
    fn check(&self, presented: Option<&str>) -> Result<(), AppError> {
        let presented = presented.ok_or(AppError::Auth)?;
        let mut mac = Self::mac(&self.key)?;
        mac.update(presented.as_bytes());
        mac.verify_slice(&self.expected).map_err(|_| AppError::Auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_secret_passes() {
        let gate = SharedSecretGate::new("admindin").unwrap();
        assert!(gate.check(Some("admindin")).is_ok());
    }

    #[test]
    fn test_wrong_or_missing_secret_is_auth_error() {
        let gate = SharedSecretGate::new("admindin").unwrap();
        assert!(matches!(gate.check(Some("admindim")), Err(AppError::Auth)));
        assert!(matches!(gate.check(Some("admindin ")), Err(AppError::Auth)));
        assert!(matches!(gate.check(Some("")), Err(AppError::Auth)));
        assert!(matches!(gate.check(None), Err(AppError::Auth)));
    }
}
