//! HMAC-SHA256 signatures for outbound alerts and inbound bank webhooks.
//!
//! # Format
//!
//! `sha256=<hex_encoded_hmac>`
//!
//! # Verification
//!
//! Receivers should:
//! 1. Extract the signature from the signature header
//! 2. Compute HMAC-SHA256(secret, request_body)
//! 3. Compare using constant-time comparison

use hmac::{Hmac, Mac};
use sha2::Sha256;

pub(crate) type HmacSha256 = Hmac<Sha256>;

const PREFIX: &str = "sha256=";

/// Hex-encoded HMAC-SHA256 of `payload`, without prefix.
pub fn hmac_hex(secret: &str, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Generate the `X-NotificaPix-Signature` header value for a payload.
pub fn sign(secret: &str, payload: &[u8]) -> String {
    format!("{PREFIX}{}", hmac_hex(secret, payload))
}

/// Verify a signature header over `payload`.
///
/// Accepts the value with or without the `sha256=` prefix and hex in any
/// case. Malformed hex never verifies.
pub fn verify(secret: &str, payload: &[u8], signature: &str) -> bool {
    let signature = signature.trim();
    let hex_part = signature
        .get(..PREFIX.len())
        .filter(|head| head.eq_ignore_ascii_case(PREFIX))
        .map_or(signature, |_| &signature[PREFIX.len()..]);

    let Ok(expected) = hex::decode(hex_part) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "secret123";
    const BODY: &[u8] = br#"{"event_type":"pix.received"}"#;

    #[test]
    fn known_vector() {
        // RFC 4231 test case 2
        assert_eq!(
            hmac_hex("Jefe", b"what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn signed_payload_verifies() {
        let signature = sign(SECRET, BODY);

        assert!(signature.starts_with("sha256="));
        assert_eq!(signature.len(), PREFIX.len() + 64);
        assert!(verify(SECRET, BODY, &signature));
    }

    #[test]
    fn prefix_and_case_are_optional() {
        let hex = hmac_hex(SECRET, BODY);

        assert!(verify(SECRET, BODY, &hex));
        assert!(verify(SECRET, BODY, &hex.to_uppercase()));
        assert!(verify(SECRET, BODY, &format!("SHA256={}", hex.to_uppercase())));
    }

    #[test]
    fn tampering_is_detected() {
        let signature = sign(SECRET, BODY);

        assert!(!verify(SECRET, br#"{"event_type":"pix.refund"}"#, &signature));
        assert!(!verify("other-secret", BODY, &signature));
    }

    #[test]
    fn malformed_signatures_fail() {
        assert!(!verify(SECRET, BODY, ""));
        assert!(!verify(SECRET, BODY, "sha256="));
        assert!(!verify(SECRET, BODY, "sha256=zz"));
        assert!(!verify(SECRET, BODY, "sha256=abc"));
    }
}
