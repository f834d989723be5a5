//! Signed access tokens (HS256 JWT) carrying the principal's email and
//! display name.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Principal;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),

    #[error("token rejected: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error("token has no email claim")]
    MissingEmail,

    #[error("token lifetime overflows the expiry timestamp")]
    ExpiryOverflow,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Claims {
    email: String,
    #[serde(default)]
    full_name: String,
    exp: i64,
}

pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims = ["exp".to_string()].into_iter().collect();

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn issue(&self, principal: &Principal) -> Result<String, TokenError> {
        self.issue_at(principal, Utc::now())
    }

    pub fn issue_at(&self, principal: &Principal, now: DateTime<Utc>) -> Result<String, TokenError> {
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or(TokenError::ExpiryOverflow)?;
        let claims = Claims {
            email: principal.email.clone(),
            full_name: principal.full_name.clone(),
            exp: expires.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Sign)
    }

    /// Check signature and expiry, then hand back the embedded principal.
    pub fn verify(&self, token: &str) -> Result<Principal, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(TokenError::Invalid)?;

        if data.claims.email.is_empty() {
            return Err(TokenError::MissingEmail);
        }

        Ok(Principal {
            email: data.claims.email,
            full_name: data.claims.full_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal() -> Principal {
        Principal {
            email: "ana@example.com".to_string(),
            full_name: "Ana Pop".to_string(),
        }
    }

    #[test]
    fn issued_token_verifies() {
        let signer = TokenSigner::new(b"classified", Duration::days(30));
        let token = signer.issue(&principal()).unwrap();
        assert_eq!(signer.verify(&token).unwrap(), principal());
    }

    #[test]
    fn other_secret_is_rejected() {
        let signer = TokenSigner::new(b"classified", Duration::days(30));
        let other = TokenSigner::new(b"declassified", Duration::days(30));
        let token = other.issue(&principal()).unwrap();
        assert!(matches!(signer.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let signer = TokenSigner::new(b"classified", Duration::hours(1));
        let token = signer
            .issue_at(&principal(), Utc::now() - Duration::hours(3))
            .unwrap();
        assert!(matches!(signer.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn garbage_is_rejected() {
        let signer = TokenSigner::new(b"classified", Duration::days(1));
        assert!(signer.verify("not.a.jwt").is_err());
        assert!(signer.verify("").is_err());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let signer = TokenSigner::new(b"classified", Duration::days(1));
        let token = signer.issue(&principal()).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = TokenSigner::new(b"classified", Duration::days(1))
            .issue(&Principal {
                email: "mallory@example.com".to_string(),
                full_name: "Mallory".to_string(),
            })
            .unwrap();
        let forged_payload = forged.split('.').nth(1).unwrap().to_string();
        parts[1] = &forged_payload;
        assert!(signer.verify(&parts.join(".")).is_err());
    }

    #[test]
    fn oversized_ttl_fails_to_issue() {
        let signer = TokenSigner::new(b"classified", Duration::MAX);
        assert!(matches!(
            signer.issue(&principal()),
            Err(TokenError::ExpiryOverflow)
        ));
    }
}
