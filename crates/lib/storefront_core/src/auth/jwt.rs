//! JWT session tokens.
//!
//! Access and refresh tokens share one claims shape and differ in their
//! `purpose` marker, lifetime and (optionally) signing secret. Verification
//! checks signature, claim shape, purpose and expiry, in that order, and
//! never hands back claims from a token that failed any of them.

use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use crate::clock::Clock;
use crate::models::auth::{TokenClaims, TokenPurpose, TokenSubject};
use crate::settings::AuthSettings;

/// Access token lifetime: 15 minutes.
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;

/// Refresh token lifetime: 7 days.
pub const DEFAULT_REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Token verification failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("expected {expected} token, got {actual} token")]
    WrongPurpose {
        expected: TokenPurpose,
        actual: TokenPurpose,
    },

    #[error("token expired")]
    Expired,

    #[error("jwt encode: {0}")]
    Encode(String),
}

#[derive(Clone)]
struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKeys {
    fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Signs and verifies session tokens (HS256).
#[derive(Clone)]
pub struct TokenCodec {
    access: SigningKeys,
    refresh: SigningKeys,
    access_ttl: Duration,
    refresh_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(settings: &AuthSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            access: SigningKeys::from_secret(settings.jwt_secret.as_bytes()),
            refresh: SigningKeys::from_secret(settings.refresh_secret().as_bytes()),
            access_ttl: settings.access_token_ttl,
            refresh_ttl: settings.refresh_token_ttl,
            clock,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Issue a short-lived access token.
    pub fn issue_access_token(&self, subject: &TokenSubject) -> Result<String, TokenError> {
        self.issue(subject, TokenPurpose::Access)
    }

    /// Issue a long-lived refresh token.
    pub fn issue_refresh_token(&self, subject: &TokenSubject) -> Result<String, TokenError> {
        self.issue(subject, TokenPurpose::Refresh)
    }

    /// Verify an access token, returning its claims.
    pub fn verify_access_token(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify(token, TokenPurpose::Access)
    }

    /// Verify a refresh token, returning its claims.
    pub fn verify_refresh_token(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify(token, TokenPurpose::Refresh)
    }

    fn keys(&self, purpose: TokenPurpose) -> &SigningKeys {
        match purpose {
            TokenPurpose::Access => &self.access,
            TokenPurpose::Refresh => &self.refresh,
        }
    }

    fn ttl(&self, purpose: TokenPurpose) -> Duration {
        match purpose {
            TokenPurpose::Access => self.access_ttl,
            TokenPurpose::Refresh => self.refresh_ttl,
        }
    }

    fn issue(&self, subject: &TokenSubject, purpose: TokenPurpose) -> Result<String, TokenError> {
        let now = self.clock.now();
        let claims = TokenClaims {
            sub: subject.id,
            email: subject.email.clone(),
            role: subject.role,
            purpose,
            iat: now.timestamp(),
            exp: (now + self.ttl(purpose)).timestamp(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.keys(purpose).encoding,
        )
        .map_err(|e| TokenError::Encode(e.to_string()))
    }

    fn verify(&self, token: &str, expected: TokenPurpose) -> Result<TokenClaims, TokenError> {
        // Expiry is checked below against the injected clock, with no leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        let claims = decode::<TokenClaims>(token, &self.keys(expected).decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?;

        if claims.purpose != expected {
            return Err(TokenError::WrongPurpose {
                expected,
                actual: claims.purpose,
            });
        }
        if self.clock.now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::auth::Role;
    use serde::Serialize;
    use uuid::Uuid;

    fn subject() -> TokenSubject {
        TokenSubject {
            id: Uuid::now_v7(),
            email: "a@b.com".into(),
            role: Role::Customer,
        }
    }

    fn codec_with(settings: AuthSettings) -> (TokenCodec, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        (TokenCodec::new(&settings, clock.clone()), clock)
    }

    fn codec() -> (TokenCodec, Arc<ManualClock>) {
        codec_with(AuthSettings::new("test-secret"))
    }

    #[test]
    fn access_token_roundtrip_preserves_claims() {
        let (codec, clock) = codec();
        let subject = subject();
        let token = codec.issue_access_token(&subject).unwrap();
        let claims = codec.verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, subject.id);
        assert_eq!(claims.email, subject.email);
        assert_eq!(claims.role, Role::Customer);
        assert_eq!(claims.purpose, TokenPurpose::Access);
        assert_eq!(claims.iat, clock.now().timestamp());
        assert_eq!(claims.exp, claims.iat + DEFAULT_ACCESS_TOKEN_TTL_SECS);
    }

    #[test]
    fn refresh_token_is_rejected_as_access_token() {
        let (codec, _) = codec();
        let refresh = codec.issue_refresh_token(&subject()).unwrap();
        assert_eq!(
            codec.verify_access_token(&refresh),
            Err(TokenError::WrongPurpose {
                expected: TokenPurpose::Access,
                actual: TokenPurpose::Refresh,
            })
        );
        assert!(codec.verify_refresh_token(&refresh).is_ok());
    }

    #[test]
    fn access_token_is_rejected_as_refresh_token() {
        let (codec, _) = codec();
        let access = codec.issue_access_token(&subject()).unwrap();
        assert!(matches!(
            codec.verify_refresh_token(&access),
            Err(TokenError::WrongPurpose { .. })
        ));
    }

    #[test]
    fn separate_refresh_secret_fails_signature_across_kinds() {
        let mut settings = AuthSettings::new("access-secret");
        settings.refresh_secret = Some("refresh-secret".into());
        let (codec, _) = codec_with(settings);
        let refresh = codec.issue_refresh_token(&subject()).unwrap();
        assert_eq!(
            codec.verify_access_token(&refresh),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn token_is_valid_until_expiry_and_invalid_at_expiry() {
        let (codec, clock) = codec();
        let token = codec.issue_access_token(&subject()).unwrap();

        clock.advance(Duration::seconds(DEFAULT_ACCESS_TOKEN_TTL_SECS - 1));
        assert!(codec.verify_access_token(&token).is_ok());

        clock.advance(Duration::seconds(1));
        assert_eq!(codec.verify_access_token(&token), Err(TokenError::Expired));

        clock.advance(Duration::hours(1));
        assert_eq!(codec.verify_access_token(&token), Err(TokenError::Expired));
    }

    #[test]
    fn refresh_token_outlives_access_token() {
        let (codec, clock) = codec();
        let refresh = codec.issue_refresh_token(&subject()).unwrap();
        clock.advance(Duration::days(DEFAULT_REFRESH_TOKEN_TTL_DAYS) - Duration::seconds(1));
        assert!(codec.verify_refresh_token(&refresh).is_ok());
        clock.advance(Duration::seconds(1));
        assert_eq!(codec.verify_refresh_token(&refresh), Err(TokenError::Expired));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let (codec, _) = codec();
        let (other, _) = codec_with(AuthSettings::new("other-secret"));
        let token = other.issue_access_token(&subject()).unwrap();
        assert_eq!(
            codec.verify_access_token(&token),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let (codec, _) = codec();
        let token = codec.issue_access_token(&subject()).unwrap();
        let mut elevated = subject();
        elevated.role = Role::Admin;
        let other = codec.issue_access_token(&elevated).unwrap();

        // Header and signature from one token, payload from another.
        let parts: Vec<&str> = token.split('.').collect();
        let other_payload = other.split('.').nth(1).unwrap();
        let spliced = format!("{}.{}.{}", parts[0], other_payload, parts[2]);
        assert_eq!(
            codec.verify_access_token(&spliced),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let (codec, _) = codec();
        assert_eq!(codec.verify_access_token(""), Err(TokenError::Malformed));
        assert_eq!(
            codec.verify_access_token("not.a.jwt"),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn unexpected_claim_shape_is_malformed() {
        #[derive(Serialize)]
        struct LooseClaims {
            sub: Uuid,
            email: String,
            role: Role,
            purpose: TokenPurpose,
            iat: i64,
            exp: i64,
            scope: String,
        }

        let (codec, clock) = codec();
        let now = clock.now().timestamp();
        let claims = LooseClaims {
            sub: Uuid::now_v7(),
            email: "a@b.com".into(),
            role: Role::Admin,
            purpose: TokenPurpose::Access,
            iat: now,
            exp: now + 60,
            scope: "everything".into(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert_eq!(codec.verify_access_token(&token), Err(TokenError::Malformed));
    }
}
