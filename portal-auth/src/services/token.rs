use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::User;
use crate::rbac::Role;
use crate::services::error::AuthError;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
pub const CSRF_TOKEN_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";

type HmacSha256 = Hmac<Sha256>;

/// Access-token claims. Tenant context is present only for sessions scoped
/// to an organization; the embedded role is advisory and re-checked against
/// the live membership on every authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: Uuid,
    pub email: String,
    #[serde(rename = "isSuperAdmin")]
    pub is_super_admin: bool,
    #[serde(
        rename = "organizationId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub organization_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly minted refresh token: the cleartext goes to the client, only
/// the hash is persisted.
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub hash: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    csrf_key: Vec<u8>,
    access_token_expiry_hours: i64,
    refresh_token_expiry_days: i64,
}

impl TokenService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            csrf_key: config.csrf_secret.as_bytes().to_vec(),
            access_token_expiry_hours: config.access_token_expiry_hours,
            refresh_token_expiry_days: config.refresh_token_expiry_days,
        }
    }

    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry_hours * 3600
    }

    pub fn refresh_token_expiry_seconds(&self) -> i64 {
        self.refresh_token_expiry_days * 24 * 3600
    }

    pub fn issue_access_token(
        &self,
        user: &User,
        context: Option<(Uuid, Role)>,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: user.id,
            email: user.email.clone(),
            is_super_admin: user.is_super_admin,
            organization_id: context.map(|(org_id, _)| org_id),
            role: context.map(|(_, role)| role),
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.access_token_expiry_hours)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(anyhow::anyhow!("failed to sign access token: {e}")))
    }

    /// Signature, structure, and expiry check. Any failure collapses to
    /// `InvalidToken`; callers never learn why a token was rejected.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessTokenClaims, AuthError> {
        decode::<AccessTokenClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }

    /// 32 bytes from the OS RNG, hex-encoded. Opaque: carries no claims and
    /// is useless without the server-side hash lookup.
    pub fn issue_refresh_token(&self) -> IssuedRefreshToken {
        let token = random_token();
        IssuedRefreshToken {
            hash: hash_token(&token),
            token,
            expires_at: Utc::now() + Duration::days(self.refresh_token_expiry_days),
        }
    }

    /// CSRF token bound to the user and the session it was issued with:
    /// `nonce.hmac(key, user_id || session_key || nonce)`, where the session
    /// key is the refresh-token hash. Stateless, and rotating or revoking
    /// the refresh token invalidates every CSRF token issued under it.
    pub fn issue_csrf_token(&self, user_id: Uuid, session_key: &str) -> String {
        let mut nonce = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut nonce);
        let nonce_hex = hex::encode(nonce);
        let mac = self.csrf_mac(user_id, session_key, &nonce_hex);
        format!("{nonce_hex}.{mac}")
    }

    pub fn verify_csrf_token(&self, token: &str, user_id: Uuid, session_key: &str) -> bool {
        let Some((nonce_hex, mac_hex)) = token.split_once('.') else {
            return false;
        };
        let expected = self.csrf_mac(user_id, session_key, nonce_hex);
        let (Ok(given), Ok(expected)) = (hex::decode(mac_hex), hex::decode(expected)) else {
            return false;
        };
        given.ct_eq(&expected).into()
    }

    fn csrf_mac(&self, user_id: Uuid, session_key: &str, nonce_hex: &str) -> String {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.csrf_key)
            .expect("hmac accepts any key length");
        mac.update(user_id.as_bytes());
        mac.update(session_key.as_bytes());
        mac.update(nonce_hex.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// SHA-256 hex digest. Applied to refresh, verification, reset, and
/// invitation tokens before they touch storage, so a leaked datastore
/// never yields usable credentials.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// 32 random bytes, hex-encoded.
pub fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
