//! Bearer token issuance and verification (JWT, HS family).
//!
//! Tokens carry `sub` and `iat` and deliberately no `exp` claim: sessions do
//! not expire and nothing is persisted or revocable. Verification failures
//! are logged with the library's detail but surface to callers as a generic
//! `GatewayError::Auth` so the 401 body never echoes crypto internals.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{GatewayError, GatewayResult};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub: Option<String>,
    iat: i64,
}

/// Issues and verifies bearer credentials with a shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenSigner {
    /// Build a signer for the given algorithm name (e.g. "HS256") and secret.
    pub fn new(algorithm: &str, secret: &str) -> GatewayResult<Self> {
        let algorithm = Algorithm::from_str(algorithm)
            .map_err(|_| GatewayError::Auth(format!("unsupported signing algorithm {algorithm}")))?;
        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    /// Produce a signed credential binding `subject` and the issuance time.
    pub fn issue(&self, subject: &str) -> GatewayResult<String> {
        let claims = Claims {
            sub: Some(subject.to_string()),
            iat: Utc::now().timestamp(),
        };
        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| GatewayError::Auth(format!("token encoding failed: {e}")))
    }

    /// Validate signature and structure, returning the subject. A structurally
    /// valid token without a subject claim is rejected rather than mapped to a
    /// sentinel identity.
    pub fn verify(&self, token: &str) -> GatewayResult<String> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::warn!("bearer token rejected: {e}");
            GatewayError::Auth("invalid bearer token".to_string())
        })?;

        match data.claims.sub {
            Some(sub) if !sub.is_empty() => Ok(sub),
            _ => {
                tracing::warn!("bearer token verified but carries no subject claim");
                Err(GatewayError::Auth("token carries no subject".to_string()))
            }
        }
    }
}
