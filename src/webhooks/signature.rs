//! GitHub webhook signature verification using HMAC-SHA256.
//!
//! GitHub signs every delivery with the App's webhook secret and sends the
//! result in `X-Hub-Signature-256` as `sha256=<hex>`. Deliveries are checked
//! before their payload is parsed.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Why a delivery was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("missing signature header")]
    Missing,

    /// Not of the form `sha256=<hex>`.
    #[error("malformed signature header")]
    Malformed,

    #[error("signature does not match payload")]
    Mismatch,
}

/// The shared secret deliveries are signed with.
#[derive(Clone)]
pub struct WebhookSecret(Vec<u8>);

impl WebhookSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        WebhookSecret(secret.into())
    }

    fn mac(&self) -> HmacSha256 {
        <HmacSha256 as Mac>::new_from_slice(&self.0).expect("HMAC can take key of any size")
    }

    /// Checks `header` (the `X-Hub-Signature-256` value, if any) against
    /// `payload`. The comparison is constant-time.
    ///
    /// # Examples
    ///
    /// ```
    /// use gfw_helper::webhooks::{SignatureError, WebhookSecret};
    ///
    /// let secret = WebhookSecret::new("It's a Secret to Everybody");
    /// let header = secret.sign(b"Hello, World!");
    ///
    /// assert_eq!(secret.verify(b"Hello, World!", Some(&header)), Ok(()));
    /// assert_eq!(secret.verify(b"Hello, World?", Some(&header)), Err(SignatureError::Mismatch));
    /// assert_eq!(secret.verify(b"Hello, World!", None), Err(SignatureError::Missing));
    /// ```
    pub fn verify(&self, payload: &[u8], header: Option<&str>) -> Result<(), SignatureError> {
        let header = header.ok_or(SignatureError::Missing)?;
        let expected = parse_signature_header(header).ok_or(SignatureError::Malformed)?;

        let mut mac = self.mac();
        mac.update(payload);
        mac.verify_slice(&expected)
            .map_err(|_| SignatureError::Mismatch)
    }

    /// The header value GitHub would send for `payload`.
    pub fn sign(&self, payload: &[u8]) -> String {
        let mut mac = self.mac();
        mac.update(payload);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(<redacted>)")
    }
}

/// Decodes `sha256=<hex>`. Never panics.
fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    let hex_sig = header.strip_prefix("sha256=")?;
    hex::decode(hex_sig).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn header_parsing() {
        assert_eq!(
            parse_signature_header("sha256=1234ABcd"),
            Some(vec![0x12, 0x34, 0xab, 0xcd])
        );
        assert_eq!(parse_signature_header("sha256="), Some(vec![]));
        assert_eq!(parse_signature_header("1234abcd"), None);
        assert_eq!(parse_signature_header("sha1=1234abcd"), None);
        assert_eq!(parse_signature_header("sha256=xyz"), None);
        assert_eq!(parse_signature_header("sha256=abc"), None);
    }

    /// The example delivery from GitHub's webhook documentation.
    #[test]
    fn github_documentation_example() {
        let secret = WebhookSecret::new("It's a Secret to Everybody");
        let header = "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17";

        assert_eq!(secret.verify(b"Hello, World!", Some(header)), Ok(()));
        assert_eq!(secret.sign(b"Hello, World!"), header);
    }

    #[test]
    fn malformed_headers_are_told_apart_from_mismatches() {
        let secret = WebhookSecret::new("secret");

        assert_eq!(secret.verify(b"x", Some("")), Err(SignatureError::Malformed));
        assert_eq!(secret.verify(b"x", Some("sha256=zz")), Err(SignatureError::Malformed));
        assert_eq!(secret.verify(b"x", Some("sha256=")), Err(SignatureError::Mismatch));
        assert_eq!(
            secret.verify(b"x", Some(&WebhookSecret::new("other").sign(b"x"))),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn debug_does_not_leak_the_secret() {
        let secret = WebhookSecret::new("hunter2");
        assert!(!format!("{:?}", secret).contains("hunter2"));
    }

    proptest! {
        #[test]
        fn sign_then_verify_succeeds(payload: Vec<u8>, secret: Vec<u8>) {
            let secret = WebhookSecret::new(secret);
            let header = secret.sign(&payload);
            prop_assert_eq!(secret.verify(&payload, Some(&header)), Ok(()));
        }

        #[test]
        fn modified_payload_fails(original: Vec<u8>, modified: Vec<u8>, secret: Vec<u8>) {
            prop_assume!(original != modified);
            let secret = WebhookSecret::new(secret);
            let header = secret.sign(&original);
            prop_assert_eq!(secret.verify(&modified, Some(&header)), Err(SignatureError::Mismatch));
        }

        #[test]
        fn arbitrary_headers_never_panic(header: String, payload: Vec<u8>) {
            let _ = WebhookSecret::new("secret").verify(&payload, Some(&header));
        }
    }
}
