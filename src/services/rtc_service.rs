use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

pub const TOKEN_VERSION: &str = "006";
pub const TOKEN_TTL_SECS: i64 = 3600;
pub const ROLE_PUBLISHER: u32 = 1;

/// Mints short-lived join credentials for the RTC provider: an
/// HMAC-SHA256 over app id, room, session uid, role and expiry, keyed by
/// the provider certificate, wrapped in the provider's versioned token
/// envelope.
#[derive(Clone)]
pub struct RtcService {
    app_id: String,
    app_certificate: String,
}

impl RtcService {
    pub fn new(app_id: String, app_certificate: String) -> Self {
        Self {
            app_id,
            app_certificate,
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Publisher token valid for one hour from now.
    pub fn build_token(&self, room_id: &str, uid: u32) -> Result<String> {
        let expire_at = Utc::now().timestamp() + TOKEN_TTL_SECS;
        self.build_token_with_expiry(room_id, uid, expire_at)
    }

    pub fn build_token_with_expiry(
        &self,
        room_id: &str,
        uid: u32,
        expire_at: i64,
    ) -> Result<String> {
        if self.app_certificate.is_empty() {
            return Err(Error::Upstream(
                "RTC certificate is not configured".to_string(),
            ));
        }

        let signing_input = format!(
            "{}:{}:{}:{}:{}",
            self.app_id, room_id, uid, ROLE_PUBLISHER, expire_at
        );
        let mut mac = HmacSha256::new_from_slice(self.app_certificate.as_bytes())
            .map_err(|e| Error::Upstream(format!("RTC signing failed: {}", e)))?;
        mac.update(signing_input.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        let payload = format!("{}:{}:{}:{}", room_id, uid, expire_at, signature);
        Ok(format!(
            "{}{}{}",
            TOKEN_VERSION,
            self.app_id,
            BASE64.encode(payload)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> RtcService {
        RtcService::new("app-id".to_string(), "certificate".to_string())
    }

    #[test]
    fn token_is_deterministic_for_fixed_expiry() {
        let svc = service();
        let a = svc.build_token_with_expiry("room-1", 42, 1_900_000_000).unwrap();
        let b = svc.build_token_with_expiry("room-1", 42, 1_900_000_000).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn token_varies_by_room_uid_and_expiry() {
        let svc = service();
        let base = svc.build_token_with_expiry("room-1", 42, 1_900_000_000).unwrap();
        assert_ne!(base, svc.build_token_with_expiry("room-2", 42, 1_900_000_000).unwrap());
        assert_ne!(base, svc.build_token_with_expiry("room-1", 43, 1_900_000_000).unwrap());
        assert_ne!(base, svc.build_token_with_expiry("room-1", 42, 1_900_000_001).unwrap());
    }

    #[test]
    fn token_carries_version_and_app_id_prefix() {
        let svc = service();
        let token = svc.build_token("room-1", 7).unwrap();
        assert!(token.starts_with("006app-id"));
    }

    #[test]
    fn token_payload_encodes_room_and_expiry() {
        let svc = service();
        let token = svc.build_token_with_expiry("room-9", 5, 1_900_000_000).unwrap();
        let encoded = token.strip_prefix("006app-id").unwrap();
        let payload = String::from_utf8(BASE64.decode(encoded).unwrap()).unwrap();
        assert!(payload.starts_with("room-9:5:1900000000:"));
    }

    #[test]
    fn missing_certificate_is_an_upstream_failure() {
        let svc = RtcService::new("app-id".to_string(), String::new());
        assert!(matches!(
            svc.build_token("room-1", 1),
            Err(Error::Upstream(_))
        ));
    }
}
