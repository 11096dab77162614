//! Bearer authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the token from the Authorization header
//! 2. Resolve it to an organization, either as an API key or as a JWT
//! 3. Inject authentication context into the request
//! 4. Reject unauthorized requests with HTTP 401
//!
//! Tokens starting with `npx_` are API keys; anything else is decoded as an
//! HS256 JWT.

use crate::{
    error::AppError,
    models::api_key::{API_KEY_PREFIX, ApiKey, hash_api_key},
    state::AppState,
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifetime of tokens issued by [`JwtKeys::issue`].
const TOKEN_TTL_HOURS: i64 = 12;

/// Role of the caller inside its organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    OrgAdmin,
    OrgMember,
}

/// Authentication context attached to authenticated requests.
///
/// This struct is inserted into the request's extension map and can be
/// extracted by route handlers to know who made the request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Every query a handler runs is scoped to this organization.
    pub organization_id: Uuid,

    /// `None` for API keys.
    pub user_id: Option<Uuid>,

    pub role: Role,
}

/// JWT claims.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(rename = "orgId")]
    pub org_id: Uuid,
    pub role: Role,
    pub exp: i64,
}

/// HS256 keys derived from `JWT_SECRET`.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    /// HS256 keys derived from the shared secret.
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a token valid for twelve hours.
    pub fn issue(&self, user_id: Uuid, organization_id: Uuid, role: Role) -> Result<String, AppError> {
        let claims = Claims {
            sub: user_id.to_string(),
            org_id: organization_id,
            role,
            exp: (Utc::now() + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("failed to sign token: {e}")))
    }

    /// Decode and validate a token, including its expiry.
    pub fn verify(&self, token: &str) -> Result<AuthContext, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected JWT");
                AppError::Unauthorized
            })?;

        Ok(AuthContext {
            organization_id: data.claims.org_id,
            user_id: Uuid::parse_str(&data.claims.sub).ok(),
            role: data.claims.role,
        })
    }
}

/// Bearer authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <token>` header from request
/// 2. `npx_` tokens: hash, look up an active key, touch `last_used_at`, act as `OrgMember`
/// 3. Other tokens: verify as JWT
/// 4. Inject `AuthContext` into request, call next handler
///
/// # Returns
///
/// - `Ok(Response)` if authenticated successfully (calls next handler)
/// - `Err(AppError::Unauthorized)` if authentication fails (returns 401)
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)?;

    let auth_context = if token.starts_with(API_KEY_PREFIX) {
        authenticate_api_key(&state, token).await?
    } else {
        state.jwt.verify(token)?
    };

    // Route handlers can now extract this using Extension<AuthContext>
    request.extensions_mut().insert(auth_context);

    Ok(next.run(request).await)
}

async fn authenticate_api_key(state: &AppState, key: &str) -> Result<AuthContext, AppError> {
    let key_hash = hash_api_key(key);

    let api_key = sqlx::query_as::<_, ApiKey>(
        "SELECT * FROM api_keys WHERE key_hash = $1 AND is_active = true",
    )
    .bind(&key_hash)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::Unauthorized)?;

    sqlx::query("UPDATE api_keys SET last_used_at = NOW() WHERE id = $1")
        .bind(api_key.id)
        .execute(&state.pool)
        .await?;

    Ok(AuthContext {
        organization_id: api_key.organization_id,
        user_id: None,
        role: Role::OrgMember,
    })
}

/// Role gate for admin routes. Must run after [`auth_middleware`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    match request.extensions().get::<AuthContext>() {
        Some(auth) if auth.role == Role::OrgAdmin => Ok(next.run(request).await),
        Some(_) => Err(AppError::Forbidden("OrgAdmin")),
        None => Err(AppError::Unauthorized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-with-enough-bytes";

    #[test]
    fn issued_tokens_verify() {
        let keys = JwtKeys::new(SECRET);
        let user = Uuid::new_v4();
        let org = Uuid::new_v4();

        let token = keys.issue(user, org, Role::OrgAdmin).unwrap();
        let auth = keys.verify(&token).unwrap();

        assert_eq!(auth.organization_id, org);
        assert_eq!(auth.user_id, Some(user));
        assert_eq!(auth.role, Role::OrgAdmin);
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let token = JwtKeys::new("another-secret-of-enough-bytes")
            .issue(Uuid::new_v4(), Uuid::new_v4(), Role::OrgMember)
            .unwrap();

        assert!(matches!(
            JwtKeys::new(SECRET).verify(&token),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            org_id: Uuid::new_v4(),
            role: Role::OrgAdmin,
            exp: (Utc::now() - Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(JwtKeys::new(SECRET).verify(&token).is_err());
    }

    #[test]
    fn role_claim_uses_pascal_case() {
        assert_eq!(serde_json::to_string(&Role::OrgMember).unwrap(), "\"OrgMember\"");
    }
}
