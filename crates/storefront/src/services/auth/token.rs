//! Signed access tokens.
//!
//! Tokens are HS256 JWTs whose subject is the user's email.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use bazaar_core::Email;

use super::AuthError;

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's email.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly issued token.
#[derive(Debug, Clone, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: &'static str,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

/// Issues and verifies access tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("keys", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Create an issuer signing with `secret`, issuing tokens valid for `ttl`.
    #[must_use]
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let secret = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Issue a token for `email`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenEncoding` if signing fails.
    pub fn issue(&self, email: &Email) -> Result<AccessToken, AuthError> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: email.as_str().to_owned(),
            iat: now,
            exp: now.saturating_add(ttl),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenEncoding(e.to_string()))?;

        Ok(AccessToken {
            access_token: token,
            token_type: "bearer",
            expires_in: self.ttl.as_secs(),
        })
    }

    /// Verify a token and return its subject.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for bad signatures, expired tokens,
    /// or subjects that are not valid emails.
    pub fn verify(&self, token: &str) -> Result<Email, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| AuthError::InvalidToken)?;
        Email::parse(&data.claims.sub).map_err(|_| AuthError::InvalidToken)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "k9$Qz!7vLp2#Xw8@Rt5^Mn3&Yb6*Hc1%";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&SecretString::from(SECRET), Duration::from_secs(30 * 60))
    }

    #[test]
    fn test_issue_then_verify() {
        let email = Email::parse("ana@shop.test").unwrap();
        let token = issuer().issue(&email).unwrap();

        assert_eq!(token.token_type, "bearer");
        assert_eq!(token.expires_in, 1800);
        assert_eq!(issuer().verify(&token.access_token).unwrap(), email);
    }

    #[test]
    fn test_rejects_other_secret() {
        let email = Email::parse("ana@shop.test").unwrap();
        let token = issuer().issue(&email).unwrap();
        let other = TokenIssuer::new(
            &SecretString::from("Zq8!mW3#rT6$yU1%iO4^pA7&sD0*fG2@"),
            Duration::from_secs(60),
        );

        assert!(matches!(
            other.verify(&token.access_token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_rejects_expired() {
        let past = Utc::now().timestamp() - 3600;
        let claims = Claims {
            sub: "ana@shop.test".to_string(),
            iat: past - 60,
            exp: past,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(issuer().verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            issuer().verify("not.a.token"),
            Err(AuthError::InvalidToken)
        ));
    }
}
