use sqlx::FromRow;

/// Registered API client; the secret column holds an argon2 hash
#[derive(Debug, Clone, FromRow)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    pub created_at: String,
}

/// Credentials decoded from a basic auth token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredential {
    pub client_id: String,
    pub client_secret: String,
}
