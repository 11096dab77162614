//! API Key model for authentication.
//!
//! API keys let an organization's own systems call the API without a user
//! session. They are stored in the database as SHA-256 hashes; the plaintext
//! is shown only once, when the key is created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Prefix that tells API keys apart from JWTs in the `Authorization` header.
pub const API_KEY_PREFIX: &str = "npx_";

/// Represents an API key record from the database.
///
/// # Database Table
///
/// Maps to the `api_keys` table with columns:
/// - `id`: Unique identifier (UUID)
/// - `organization_id`: Organization the key acts for
/// - `name`: Label chosen by the admin who created it
/// - `key_hash`: SHA-256 hash of the actual API key
/// - `is_active`: Whether the key is currently valid
/// - `last_used_at`: Last successful authentication
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKey {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,

    /// SHA-256 hash of the actual API key (64 hex characters)
    ///
    /// When a request comes in with "Bearer npx_abc123", we:
    /// 1. Hash "npx_abc123" with SHA-256
    /// 2. Look up this hash in the database
    /// 3. If found and active, authenticate the request
    pub key_hash: String,

    /// Inactive keys are rejected during authentication.
    pub is_active: bool,

    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Hash a plaintext API key the way it is stored.
pub fn hash_api_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a new plaintext API key: `npx_` followed by 64 hex characters.
pub fn generate_api_key() -> String {
    let bytes: [u8; 32] = rand::random();
    format!("{API_KEY_PREFIX}{}", hex::encode(bytes))
}

/// Request body for `POST /api/v1/api-keys`.
#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: String,
}

/// API key as listed to admins. Never contains the key itself.
#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,

    /// Plaintext key, present only in the creation response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl From<ApiKey> for ApiKeyResponse {
    fn from(api_key: ApiKey) -> Self {
        Self {
            id: api_key.id,
            name: api_key.name,
            is_active: api_key.is_active,
            last_used_at: api_key.last_used_at,
            created_at: api_key.created_at,
            key: None,
        }
    }
}

impl ApiKeyResponse {
    pub fn with_key(mut self, key: String) -> Self {
        self.key = Some(key);
        self
    }
}
