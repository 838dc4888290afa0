use crate::error::{AcademyError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Authenticates provider webhooks: hex HMAC-SHA512 of the raw body, keyed
/// with the provider secret.
#[derive(Clone)]
pub struct WebhookSigner {
    keyed: HmacSha512,
}

impl WebhookSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self> {
        let keyed = HmacSha512::new_from_slice(secret.as_ref())
            .map_err(|e| AcademyError::internal(format!("invalid webhook secret: {e}")))?;
        Ok(Self { keyed })
    }

    fn mac(&self, body: &[u8]) -> HmacSha512 {
        let mut mac = self.keyed.clone();
        mac.update(body);
        mac
    }

    pub fn sign(&self, body: &[u8]) -> String {
        hex::encode(self.mac(body).finalize().into_bytes())
    }

    /// Constant-time check of a hex signature against `body`.
    pub fn verify(&self, body: &[u8], signature: &str) -> bool {
        match hex::decode(signature.trim()) {
            Ok(expected) => self.mac(body).verify_slice(&expected).is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let signer = WebhookSigner::new("psk").unwrap();
        let body = br#"{"event":"charge.success","data":{"reference":"R1"}}"#;
        let signature = signer.sign(body);

        assert_eq!(signature.len(), 128);
        assert!(signer.verify(body, &signature));
        assert!(signer.verify(body, &signature.to_uppercase()));
    }

    #[test]
    fn test_rejects_tampered_body_and_wrong_key() {
        let signer = WebhookSigner::new("psk").unwrap();
        let body = br#"{"event":"charge.success","data":{"reference":"R1"}}"#;
        let signature = signer.sign(body);

        let tampered = br#"{"event":"charge.success","data":{"reference":"R2"}}"#;
        assert!(!signer.verify(tampered, &signature));
        assert!(!WebhookSigner::new("other").unwrap().verify(body, &signature));
    }

    #[test]
    fn test_signer_is_reusable_across_bodies() {
        let signer = WebhookSigner::new("psk").unwrap();
        let first = signer.sign(b"one");
        let second = signer.sign(b"two");
        assert_ne!(first, second);
        assert_eq!(signer.sign(b"one"), first);
        assert!(signer.verify(b"two", &second));

        let unkeyed = WebhookSigner::new("").unwrap();
        assert!(unkeyed.verify(b"x", &unkeyed.sign(b"x")));
        assert!(!signer.verify(b"x", &unkeyed.sign(b"x")));
    }

    #[test]
    fn test_rejects_garbage_signatures() {
        let signer = WebhookSigner::new("psk").unwrap();
        assert!(!signer.verify(b"{}", ""));
        assert!(!signer.verify(b"{}", "not-hex"));
        assert!(!signer.verify(b"{}", "abcd"));
    }
}
