use crate::{config::JwtConfig, error::Result, types::JwtClaims, Error};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Access tokens are signed JWTs; refresh tokens are opaque random strings
/// whose SHA-256 hash is the only thing persisted. A stolen database row
/// can't be replayed as a refresh token without the original random value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry: Duration,
    refresh_token_expiry: Duration,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Result<Self> {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Ok(Self {
            encoding_key,
            decoding_key,
            access_token_expiry: Duration::seconds(config.access_token_expiry),
            refresh_token_expiry: Duration::seconds(config.refresh_token_expiry),
        })
    }

    pub fn access_token_expiry(&self) -> Duration {
        self.access_token_expiry
    }

    pub fn refresh_token_expiry(&self) -> Duration {
        self.refresh_token_expiry
    }

    pub fn generate_access_token(
        &self,
        user_id: &str,
        tenant_id: &str,
        role: &str,
        permissions: Vec<String>,
    ) -> Result<String> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user_id.to_string(),
            tenant_id: tenant_id.to_string(),
            role: role.to_string(),
            permissions,
            exp: (now + self.access_token_expiry).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let header = Header::new(Algorithm::HS512);
        encode(&header, &claims, &self.encoding_key).map_err(|e| {
            Error::new(
                crate::error::ErrorCode::TokenInvalid,
                format!("failed to generate access token: {}", e),
            )
        })
    }

    pub fn verify_access_token(&self, token: &str) -> Result<JwtClaims> {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.validate_exp = true;

        let token_data = decode::<JwtClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            Error::new(
                crate::error::ErrorCode::TokenInvalid,
                format!("invalid access token: {}", e),
            )
        })?;

        Ok(token_data.claims)
    }

    /// Generates a fresh opaque refresh-token secret and its SHA-256 hash,
    /// along with the expiry timestamp the caller should persist alongside
    /// the hash.
    pub fn generate_refresh_secret(&self) -> (String, String, chrono::DateTime<Utc>) {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let secret = hex::encode(bytes);
        let hash = Self::hash_refresh_secret(&secret);
        let expires_at = Utc::now() + self.refresh_token_expiry;
        (secret, hash, expires_at)
    }

    pub fn hash_refresh_secret(secret: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}
