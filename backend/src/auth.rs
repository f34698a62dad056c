use std::num::NonZeroU32;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ring::{digest, pbkdf2};
use ring::rand::{SecureRandom, SystemRandom};
use rocket::http::Status;
use rocket::outcome::try_outcome;
use rocket::request::{FromRequest, Outcome};
use rocket::Request;
use serde::{Deserialize, Serialize};
use shared::Identity;
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;
use crate::error::ApiError;
use crate::routes::AppState;
use crate::store::UserStore;

const HASH_SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const CREDENTIAL_LEN: usize = digest::SHA256_OUTPUT_LEN;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            ttl,
        }
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String, ApiError> {
        let now = OffsetDateTime::now_utc();
        let expires = now.checked_add(self.ttl)
            .ok_or_else(|| ApiError::Internal(format!("token lifetime {} is out of range", self.ttl)))?;
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.unix_timestamp(),
            exp: expires.unix_timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token signing failed: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Uuid, ApiError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                debug!("Token rejected: {}", e);
                ApiError::Unauthorized("Not authorized, token failed".into())
            })?
            .claims;
        Uuid::parse_str(&claims.sub)
            .map_err(|_| ApiError::Unauthorized("Not authorized, token failed".into()))
    }
}

/// PBKDF2-HMAC-SHA256 hashes stored as `pbkdf2-sha256$<iterations>$<salt>$<hash>`.
pub struct PasswordHasher {
    iterations: NonZeroU32,
    rng: SystemRandom,
}

impl PasswordHasher {
    pub fn new(iterations: NonZeroU32) -> Self {
        Self {
            iterations,
            rng: SystemRandom::new(),
        }
    }

    pub fn hash(&self, password: &str) -> Result<String, ApiError> {
        let mut salt = [0u8; SALT_LEN];
        self.rng.fill(&mut salt)
            .map_err(|_| ApiError::Internal("failed to generate password salt".into()))?;

        let mut credential = [0u8; CREDENTIAL_LEN];
        pbkdf2::derive(pbkdf2::PBKDF2_HMAC_SHA256, self.iterations, &salt, password.as_bytes(), &mut credential);

        Ok(format!(
            "{}${}${}${}",
            HASH_SCHEME,
            self.iterations,
            STANDARD_NO_PAD.encode(salt),
            STANDARD_NO_PAD.encode(credential)
        ))
    }

    /// Verifies against the iteration count recorded in the hash, not the current setting.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        let mut parts = stored.split('$');
        let (Some(HASH_SCHEME), Some(iterations), Some(salt), Some(credential), None) =
            (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
        else {
            warn!("Stored password hash has an unknown format");
            return false;
        };

        let Some(iterations) = iterations.parse::<u32>().ok().and_then(NonZeroU32::new) else {
            return false;
        };
        let (Ok(salt), Ok(credential)) = (STANDARD_NO_PAD.decode(salt), STANDARD_NO_PAD.decode(credential)) else {
            return false;
        };

        pbkdf2::verify(pbkdf2::PBKDF2_HMAC_SHA256, iterations, &salt, password.as_bytes(), &credential).is_ok()
    }
}

fn bearer_token<'r>(req: &'r Request<'_>) -> Option<&'r str> {
    req.headers()
        .get_one("Authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Request guard for any logged-in user.
pub struct AuthUser(pub Identity);

/// Request guard for users with the admin flag.
pub struct AdminUser(pub Identity);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = ApiError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(state) = req.rocket().state::<AppState>() else {
            return Outcome::Error((Status::InternalServerError, ApiError::Internal("app state missing".into())));
        };

        let Some(token) = bearer_token(req) else {
            return Outcome::Error((Status::Unauthorized, ApiError::Unauthorized("Not authorized, no token".into())));
        };

        let user_id = match state.tokens.verify(token) {
            Ok(id) => id,
            Err(e) => return Outcome::Error((Status::Unauthorized, e)),
        };

        match state.store.find_user_by_id(user_id).await {
            Ok(Some(user)) => Outcome::Success(AuthUser(Identity::from(&user))),
            Ok(None) => {
                debug!("Token subject {} no longer exists", user_id);
                Outcome::Error((Status::Unauthorized, ApiError::Unauthorized("Not authorized, user not found".into())))
            }
            Err(e) => Outcome::Error((Status::InternalServerError, e.into())),
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminUser {
    type Error = ApiError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let AuthUser(identity) = try_outcome!(req.guard::<AuthUser>().await);
        if identity.is_admin() {
            Outcome::Success(AdminUser(identity))
        } else {
            debug!("User {} denied admin access", identity.id);
            Outcome::Error((Status::Forbidden, ApiError::Forbidden))
        }
    }
}
