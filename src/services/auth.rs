use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{ClientCredential, OAuthClient};

/// Client credential check for HTTP basic authentication
#[derive(Clone)]
pub struct BasicAuth {
    db: Database,
}

impl BasicAuth {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Decode a basic auth token (`base64(client_id:client_secret)`)
    pub fn parse_auth_token(token: &str) -> Result<ClientCredential> {
        let invalid = || AppError::Unauthorized("invalid authorization token".to_string());

        let decoded = STANDARD.decode(token.trim()).map_err(|_| invalid())?;
        let decoded = String::from_utf8(decoded).map_err(|_| invalid())?;

        let (client_id, client_secret) = decoded.split_once(':').ok_or_else(invalid)?;
        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            return Err(invalid());
        }

        Ok(ClientCredential {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    /// Check a basic auth token against the registered clients
    pub async fn check_credential(&self, token: &str) -> Result<bool> {
        let credential = match Self::parse_auth_token(token) {
            Ok(credential) => credential,
            Err(_) => return Ok(false),
        };

        let client: Option<OAuthClient> = sqlx::query_as(
            "SELECT client_id, client_secret, created_at FROM oauth_client WHERE client_id = ?",
        )
        .bind(&credential.client_id)
        .fetch_optional(self.db.pool())
        .await?;

        let Some(client) = client else {
            tracing::debug!(client_id = %credential.client_id, "Unknown client");
            return Ok(false);
        };

        Self::verify_secret(&credential.client_secret, &client.client_secret)
    }

    /// Register a client, storing only the hash of its secret
    pub async fn register_client(&self, client_id: &str, client_secret: &str) -> Result<()> {
        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            return Err(AppError::BadRequest(
                "client id and secret are required".to_string(),
            ));
        }

        let hash = Self::hash_secret(client_secret)?;

        let inserted = sqlx::query(
            "INSERT INTO oauth_client (client_id, client_secret) VALUES (?, ?) ON CONFLICT(client_id) DO NOTHING",
        )
        .bind(client_id)
        .bind(&hash)
        .execute(self.db.pool())
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(AppError::ResourceExists(format!("client {}", client_id)));
        }

        tracing::info!(client_id = %client_id, "Registered client");
        Ok(())
    }

    /// Hash secret using Argon2
    fn hash_secret(secret: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Secret hashing failed: {}", e)))?
            .to_string();

        Ok(hash)
    }

    fn verify_secret(secret: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(format!("Invalid secret hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(secret.as_bytes(), &parsed_hash)
            .is_ok())
    }
}
