use crate::core::errors::ExchangeError;
use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::pkcs8::DecodePrivateKey;
use ed25519_dalek::{Signer as Ed25519SignerTrait, SigningKey};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Signer trait for request authentication
///
/// The WebSocket API signs a canonical payload built from the request
/// parameters (see `RequestHandler::signature_request`). Implementations only
/// need to turn that payload into the signature string the exchange expects.
pub trait Signer: Send + Sync {
    /// Sign the canonical `key=value&key=value` payload
    fn sign(&self, payload: &str) -> Result<String, ExchangeError>;
}

/// HMAC-SHA256 signer, hex-encoded output
pub struct HmacSigner {
    secret_key: Zeroizing<String>,
}

impl HmacSigner {
    pub fn new(secret_key: String) -> Self {
        Self {
            secret_key: Zeroizing::new(secret_key),
        }
    }
}

impl Signer for HmacSigner {
    fn sign(&self, payload: &str) -> Result<String, ExchangeError> {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| ExchangeError::AuthError(format!("Invalid secret key: {}", e)))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// Ed25519 signer, base64-encoded output
pub struct Ed25519Signer {
    signing_key: SigningKey,
}

impl Ed25519Signer {
    /// Create a signer from a base64-encoded raw 32-byte private key
    pub fn new(private_key: &str) -> Result<Self, ExchangeError> {
        let key_bytes = Zeroizing::new(
            general_purpose::STANDARD
                .decode(private_key.trim())
                .map_err(|e| {
                    ExchangeError::AuthError(format!("Invalid private key format: {}", e))
                })?,
        );

        let key_array: [u8; 32] = key_bytes.as_slice().try_into().map_err(|_| {
            ExchangeError::AuthError(format!(
                "Invalid private key length: expected 32 bytes, got {}",
                key_bytes.len()
            ))
        })?;

        Ok(Self {
            signing_key: SigningKey::from_bytes(&key_array),
        })
    }

    /// Create a signer from a PKCS#8 PEM private key, the format the exchange
    /// hands out when an Ed25519 API key is registered
    pub fn from_pem(pem: &str) -> Result<Self, ExchangeError> {
        let signing_key = SigningKey::from_pkcs8_pem(pem)
            .map_err(|e| ExchangeError::AuthError(format!("Invalid PEM private key: {}", e)))?;
        Ok(Self { signing_key })
    }
}

impl Signer for Ed25519Signer {
    fn sign(&self, payload: &str) -> Result<String, ExchangeError> {
        let signature = Ed25519SignerTrait::sign(&self.signing_key, payload.as_bytes());
        Ok(general_purpose::STANDARD.encode(signature.to_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};

    #[test]
    fn test_hmac_signature_matches_documented_vector() {
        // Example key pair published in the exchange's API documentation
        let signer = HmacSigner::new(
            "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j".to_string(),
        );
        let payload = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";

        let signature = signer.sign(payload).unwrap();
        assert_eq!(
            signature,
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_ed25519_signature_verifies() {
        let raw = [7u8; 32];
        let encoded = general_purpose::STANDARD.encode(raw);
        let signer = Ed25519Signer::new(&encoded).unwrap();

        let payload = "apiKey=abc&timestamp=1";
        let signature_b64 = signer.sign(payload).unwrap();
        let signature_bytes = general_purpose::STANDARD.decode(signature_b64).unwrap();
        let signature = Signature::from_slice(&signature_bytes).unwrap();

        let verifying_key = SigningKey::from_bytes(&raw).verifying_key();
        assert!(verifying_key.verify(payload.as_bytes(), &signature).is_ok());
    }

    #[test]
    fn test_ed25519_rejects_short_key() {
        let encoded = general_purpose::STANDARD.encode([1u8; 16]);
        assert!(matches!(
            Ed25519Signer::new(&encoded),
            Err(ExchangeError::AuthError(_))
        ));
    }

    #[test]
    fn test_ed25519_rejects_garbage_pem() {
        assert!(Ed25519Signer::from_pem("not a pem").is_err());
    }
}
