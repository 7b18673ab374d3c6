// src/services/auth.rs

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bcrypt::verify;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::error::AppError,
    models::auth::{Claims, SessionUser},
};

/// Checks a username/password pair.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn verify(&self, username: &str, password: &str) -> Result<bool, AppError>;
}

/// Users configured as `username -> bcrypt hash`.
#[derive(Debug, Clone, Default)]
pub struct BcryptAuthenticator {
    users: HashMap<String, String>,
}

impl BcryptAuthenticator {
    pub fn new(users: impl IntoIterator<Item = (String, String)>) -> Self {
        Self { users: users.into_iter().collect() }
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

#[async_trait]
impl Authenticator for BcryptAuthenticator {
    async fn verify(&self, username: &str, password: &str) -> Result<bool, AppError> {
        let Some(hash) = self.users.get(username).cloned() else {
            return Ok(false);
        };
        let password = password.to_owned();

        // bcrypt is CPU-bound, run it on the blocking pool
        let valid = tokio::task::spawn_blocking(move || verify(&password, &hash))
            .await
            .map_err(|e| anyhow::anyhow!("password verification task failed: {}", e))??;
        Ok(valid)
    }
}

#[derive(Clone)]
pub struct AuthService {
    authenticator: Arc<dyn Authenticator>,
    jwt_secret: String,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(authenticator: Arc<dyn Authenticator>, jwt_secret: String, token_ttl: Duration) -> Self {
        Self { authenticator, jwt_secret, token_ttl }
    }

    pub async fn login_user(&self, username: &str, password: &str) -> Result<String, AppError> {
        if !self.authenticator.verify(username, password).await? {
            tracing::warn!("Failed login for '{}'", username);
            return Err(AppError::InvalidCredentials);
        }
        tracing::info!("'{}' logged in", username);
        self.create_token(username)
    }

    pub fn validate_token(&self, token: &str) -> Result<SessionUser, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        Ok(SessionUser { username: token_data.claims.sub })
    }

    fn create_token(&self, username: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + self.token_ttl;

        let claims = Claims {
            sub: username.to_string(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        let hash = bcrypt::hash("password123", 4).unwrap();
        let authenticator = BcryptAuthenticator::new([("ahmed".to_string(), hash)]);
        AuthService::new(Arc::new(authenticator), "test-secret".into(), Duration::hours(1))
    }

    #[tokio::test]
    async fn issued_token_round_trips_to_the_user() {
        let svc = service();
        let token = svc.login_user("ahmed", "password123").await.unwrap();

        let user = svc.validate_token(&token).unwrap();
        assert_eq!(user.username, "ahmed");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_are_rejected() {
        let svc = service();
        assert!(matches!(
            svc.login_user("ahmed", "nope").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            svc.login_user("guest", "password123").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn tokens_signed_with_another_secret_are_invalid() {
        let other = AuthService::new(
            Arc::new(BcryptAuthenticator::default()),
            "other-secret".into(),
            Duration::hours(1),
        );
        let token = other.create_token("ahmed").unwrap();

        assert!(matches!(service().validate_token(&token), Err(AppError::InvalidToken)));
    }
}
