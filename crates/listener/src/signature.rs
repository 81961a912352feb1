//! HMAC-SHA256 validation of webhook deliveries.
//!
//! GitHub signs the raw request body with the webhook secret and sends the
//! digest as `X-Hub-Signature-256: sha256=<hex>`. Deliveries without a valid
//! signature never reach the decoder.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

/// The delivery could not be authenticated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing X-Hub-Signature-256 header")]
    Missing,

    #[error("malformed signature header")]
    Malformed,

    #[error("payload signature does not match")]
    Mismatch,
}

/// Shared secret configured on the GitHub App webhook.
#[derive(Clone)]
pub struct WebhookSecret(Vec<u8>);

impl WebhookSecret {
    /// Returns `None` for an empty secret.
    pub fn new(secret: impl Into<Vec<u8>>) -> Option<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            None
        } else {
            Some(Self(secret))
        }
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length.
        match HmacSha256::new_from_slice(&self.0) {
            Ok(mac) => mac,
            Err(_) => unreachable!("HMAC can take key of any size"),
        }
    }
}

impl std::fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WebhookSecret(<redacted>)")
    }
}

/// Computes the `X-Hub-Signature-256` value GitHub would send for `body`.
pub fn sign(secret: &WebhookSecret, body: &[u8]) -> String {
    let mut mac = secret.mac();
    mac.update(body);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

/// Checks `signature` against `body` in constant time.
pub fn verify(
    secret: &WebhookSecret,
    body: &[u8],
    signature: Option<&str>,
) -> Result<(), SignatureError> {
    let signature = signature.ok_or(SignatureError::Missing)?;
    let digest = signature
        .trim()
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or(SignatureError::Malformed)?;
    let expected = hex::decode(digest).map_err(|_| SignatureError::Malformed)?;

    let mut mac = secret.mac();
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> WebhookSecret {
        WebhookSecret::new("It's a Secret to Everybody").unwrap()
    }

    #[test]
    fn matches_github_documented_example() {
        // Example from the GitHub "Validating webhook deliveries" guide.
        assert_eq!(
            sign(&secret(), b"Hello, World!"),
            "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17"
        );
    }

    #[test]
    fn accepts_valid_signature() {
        let body = br#"{"zen":"Keep it logically awesome."}"#;
        let header = sign(&secret(), body);
        assert_eq!(verify(&secret(), body, Some(&header)), Ok(()));
    }

    #[test]
    fn rejects_tampered_body() {
        let header = sign(&secret(), b"original");
        assert_eq!(
            verify(&secret(), b"tampered", Some(&header)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_missing_and_malformed_headers() {
        assert_eq!(verify(&secret(), b"x", None), Err(SignatureError::Missing));
        assert_eq!(
            verify(&secret(), b"x", Some("sha1=abcdef")),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify(&secret(), b"x", Some("sha256=not-hex")),
            Err(SignatureError::Malformed)
        );
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(WebhookSecret::new("").is_none());
    }

    #[test]
    fn debug_hides_secret() {
        assert!(!format!("{:?}", secret()).contains("Secret to"));
    }
}
