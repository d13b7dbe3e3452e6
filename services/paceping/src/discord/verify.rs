//! Interaction request signature verification.
//!
//! # Purpose
//! Discord signs every interaction webhook with the application's Ed25519 key.
//! The signed message is the `X-Signature-Timestamp` header value followed by
//! the raw request body; the signature arrives hex-encoded in
//! `X-Signature-Ed25519`.
//!
//! # Security considerations
//! - Verification must run on the raw body bytes, before any JSON parsing.
//! - Requests failing verification must be rejected with 401; Discord probes
//!   the endpoint with bad signatures and disables it otherwise.
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("missing signature headers")]
    MissingHeaders,
    #[error("malformed signature")]
    MalformedSignature,
    #[error("signature mismatch")]
    Mismatch,
}

#[derive(Debug, Clone)]
pub struct InteractionVerifier {
    key: VerifyingKey,
}

impl InteractionVerifier {
    /// Build a verifier from the hex public key shown in the developer portal.
    ///
    /// # Errors
    /// - [`SignatureError::InvalidPublicKey`] when the key is not 32 hex-encoded
    ///   bytes of a valid Ed25519 point.
    pub fn from_hex(public_key_hex: &str) -> Result<Self, SignatureError> {
        let bytes: [u8; 32] = hex::decode(public_key_hex.trim())
            .map_err(|_| SignatureError::InvalidPublicKey)?
            .try_into()
            .map_err(|_| SignatureError::InvalidPublicKey)?;
        let key = VerifyingKey::from_bytes(&bytes).map_err(|_| SignatureError::InvalidPublicKey)?;
        Ok(Self { key })
    }

    pub fn from_key(key: VerifyingKey) -> Self {
        Self { key }
    }

    pub fn verify(
        &self,
        timestamp: &str,
        body: &[u8],
        signature_hex: &str,
    ) -> Result<(), SignatureError> {
        let bytes: [u8; 64] = hex::decode(signature_hex.trim())
            .map_err(|_| SignatureError::MalformedSignature)?
            .try_into()
            .map_err(|_| SignatureError::MalformedSignature)?;
        let signature = Signature::from_bytes(&bytes);
        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);
        self.key
            .verify(&message, &signature)
            .map_err(|_| SignatureError::Mismatch)
    }

    /// Verify using the signature headers of an HTTP request.
    pub fn verify_headers(
        &self,
        headers: &axum::http::HeaderMap,
        body: &[u8],
    ) -> Result<(), SignatureError> {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(SignatureError::MissingHeaders)?;
        let timestamp = headers
            .get(TIMESTAMP_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(SignatureError::MissingHeaders)?;
        self.verify(timestamp, body, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    fn sign(key: &SigningKey, timestamp: &str, body: &[u8]) -> String {
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body);
        hex::encode(key.sign(&message).to_bytes())
    }

    #[test]
    fn accepts_valid_signature() {
        let key = signing_key();
        let verifier =
            InteractionVerifier::from_hex(&hex::encode(key.verifying_key().to_bytes()))
                .expect("verifier");
        let body = br#"{"type":1}"#;
        let signature = sign(&key, "1700000000", body);
        assert_eq!(verifier.verify("1700000000", body, &signature), Ok(()));
    }

    #[test]
    fn rejects_tampered_body_or_timestamp() {
        let key = signing_key();
        let verifier = InteractionVerifier::from_key(key.verifying_key());
        let signature = sign(&key, "1700000000", br#"{"type":1}"#);
        assert_eq!(
            verifier.verify("1700000000", br#"{"type":2}"#, &signature),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verifier.verify("1700000001", br#"{"type":1}"#, &signature),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_malformed_signature_and_key() {
        let verifier = InteractionVerifier::from_key(signing_key().verifying_key());
        assert_eq!(
            verifier.verify("1", b"{}", "zz"),
            Err(SignatureError::MalformedSignature)
        );
        assert_eq!(
            verifier.verify("1", b"{}", "abcd"),
            Err(SignatureError::MalformedSignature)
        );
        assert_eq!(
            InteractionVerifier::from_hex("1234").unwrap_err(),
            SignatureError::InvalidPublicKey
        );
    }

    #[test]
    fn missing_headers_are_rejected() {
        let verifier = InteractionVerifier::from_key(signing_key().verifying_key());
        let headers = axum::http::HeaderMap::new();
        assert_eq!(
            verifier.verify_headers(&headers, b"{}"),
            Err(SignatureError::MissingHeaders)
        );
    }
}
