use crate::application_port::*;
use crate::domain_model::AccountId;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::error;

pub const MIN_REFRESH_TOKEN_BYTES: usize = 64;

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: Vec<u8>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub refresh_long_ttl: Duration,
    pub refresh_token_bytes: usize,
}

impl TokenConfig {
    pub fn refresh_ttl_for(&self, lifetime: RefreshLifetime) -> Duration {
        match lifetime {
            RefreshLifetime::Standard => self.refresh_ttl,
            RefreshLifetime::Extended => self.refresh_long_ttl,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    id: u64,
    exp: i64,
}

/// Issues HS256-signed access tokens and random opaque refresh tokens.
pub struct JwtHs256Issuer {
    cfg: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtHs256Issuer {
    pub fn new(cfg: TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        JwtHs256Issuer {
            encoding_key: EncodingKey::from_secret(&cfg.secret),
            decoding_key: DecodingKey::from_secret(&cfg.secret),
            cfg,
            validation,
        }
    }
}

impl TokenIssuer for JwtHs256Issuer {
    fn generate_access_token(
        &self,
        account_id: AccountId,
    ) -> Result<(AccessToken, DateTime<Utc>), TokenError> {
        let exp = (Utc::now() + self.cfg.access_ttl).timestamp();
        let expires_at = DateTime::from_timestamp(exp, 0)
            .ok_or_else(|| TokenError::Internal("access token expiry out of range".into()))?;
        let claims = Claims {
            id: account_id.0,
            exp,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| {
                error!(%e, "failed to sign access token");
                TokenError::Internal(e.to_string())
            })?;
        Ok((AccessToken(token), expires_at))
    }

    fn verify_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            },
        )?;
        let expires_at =
            DateTime::from_timestamp(data.claims.exp, 0).ok_or(TokenError::Malformed)?;
        if Utc::now() > expires_at {
            return Err(TokenError::Expired);
        }
        Ok(AccessClaims {
            account_id: AccountId(data.claims.id),
            expires_at,
        })
    }

    fn generate_refresh_token(
        &self,
        lifetime: RefreshLifetime,
    ) -> Result<(RefreshToken, DateTime<Utc>), TokenError> {
        let expires_at = Utc::now() + self.cfg.refresh_ttl_for(lifetime);
        let mut bytes = vec![0u8; self.cfg.refresh_token_bytes.max(MIN_REFRESH_TOKEN_BYTES)];
        OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
            error!(%e, "secure random source unavailable");
            TokenError::Internal(e.to_string())
        })?;
        Ok((RefreshToken(URL_SAFE_NO_PAD.encode(&bytes)), expires_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str) -> TokenConfig {
        TokenConfig {
            secret: secret.as_bytes().to_vec(),
            access_ttl: Duration::from_secs(15 * 60),
            refresh_ttl: Duration::from_secs(24 * 3600),
            refresh_long_ttl: Duration::from_secs(30 * 24 * 3600),
            refresh_token_bytes: 64,
        }
    }

    fn sign(secret: &str, alg: Algorithm, claims: &serde_json::Value) -> String {
        encode(
            &Header::new(alg),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn access_token_round_trips_account_id() {
        let issuer = JwtHs256Issuer::new(config("test-secret-key-123"));
        let (token, expires_at) = issuer.generate_access_token(AccountId(42)).unwrap();
        let claims = issuer.verify_access_token(&token.0).unwrap();
        assert_eq!(claims.account_id, AccountId(42));
        assert_eq!(claims.expires_at, expires_at);
        assert!(expires_at > Utc::now());
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let issuer = JwtHs256Issuer::new(config("s"));
        let exp = Utc::now().timestamp() - 10;
        let token = sign("s", Algorithm::HS256, &serde_json::json!({"id": 1, "exp": exp}));
        assert!(matches!(
            issuer.verify_access_token(&token),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn token_from_another_secret_has_invalid_signature() {
        let issuer = JwtHs256Issuer::new(config("right"));
        let other = JwtHs256Issuer::new(config("wrong"));
        let (token, _) = other.generate_access_token(AccountId(1)).unwrap();
        assert!(matches!(
            issuer.verify_access_token(&token.0),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn unexpected_algorithm_is_rejected() {
        let issuer = JwtHs256Issuer::new(config("s"));
        let exp = Utc::now().timestamp() + 60;
        let token = sign("s", Algorithm::HS512, &serde_json::json!({"id": 1, "exp": exp}));
        assert!(matches!(
            issuer.verify_access_token(&token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn missing_claims_are_malformed() {
        let issuer = JwtHs256Issuer::new(config("s"));
        let exp = Utc::now().timestamp() + 60;
        let no_id = sign("s", Algorithm::HS256, &serde_json::json!({"exp": exp}));
        let no_exp = sign("s", Algorithm::HS256, &serde_json::json!({"id": 1}));
        assert!(matches!(
            issuer.verify_access_token(&no_id),
            Err(TokenError::Malformed)
        ));
        assert!(matches!(
            issuer.verify_access_token(&no_exp),
            Err(TokenError::Malformed)
        ));
        assert!(matches!(
            issuer.verify_access_token("not-a-jwt"),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn refresh_tokens_are_unique_and_full_length() {
        let issuer = JwtHs256Issuer::new(config("s"));
        let (a, _) = issuer.generate_refresh_token(RefreshLifetime::Standard).unwrap();
        let (b, _) = issuer.generate_refresh_token(RefreshLifetime::Standard).unwrap();
        assert_ne!(a, b);
        assert_eq!(URL_SAFE_NO_PAD.decode(&a.0).unwrap().len(), 64);
        assert!(!a.0.contains('='));
    }

    #[test]
    fn extended_refresh_lifetime_outlasts_standard() {
        let cfg = config("s");
        let issuer = JwtHs256Issuer::new(cfg.clone());
        let before = Utc::now();
        let (_, standard) = issuer.generate_refresh_token(RefreshLifetime::Standard).unwrap();
        let (_, extended) = issuer.generate_refresh_token(RefreshLifetime::Extended).unwrap();
        assert!(standard >= before + cfg.refresh_ttl);
        assert!(standard <= Utc::now() + cfg.refresh_ttl);
        assert!(extended > standard);
    }
}
