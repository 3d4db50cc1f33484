//! Authentication Service
//!
//! Handles registration, login, JWT access/refresh tokens and revocation.
//!
//! Access and refresh tokens are both JWTs signed with different secrets and
//! told apart by the `typ` claim. Logging out (or rotating a refresh token)
//! puts the token on the revocation list until it would have expired.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::application::dto::request::{ChangePasswordRequest, LoginRequest, RegisterRequest};
use crate::application::dto::response::{AuthResponse, TokenResponse, UserResponse};
use crate::config::JwtSettings;
use crate::domain::{User, UserRepository};
use crate::infrastructure::cache::TokenRevocationList;
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Authentication service trait for dependency injection
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a new user and sign them in
    async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError>;

    /// Authenticate user with credentials
    async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError>;

    /// Exchange a refresh token for a new pair; the old refresh token is revoked
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError>;

    /// Revoke the access token and, when given, the refresh token
    async fn logout(&self, access_token: &str, refresh_token: Option<&str>) -> Result<(), AuthError>;

    /// Resolve the user behind an access token
    async fn authenticate(&self, access_token: &str) -> Result<User, AuthError>;

    async fn change_password(&self, user_id: i64, request: ChangePasswordRequest) -> Result<(), AuthError>;
}

/// Distinguishes access from refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
    /// Unique token id so two tokens issued in the same second differ
    pub jti: String,
    pub typ: TokenType,
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has been revoked")]
    RevokedToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Email already registered")]
    EmailExists,

    #[error("Username already taken")]
    UsernameExists,

    #[error("Current password is incorrect")]
    WrongPassword,

    #[error(transparent)]
    App(#[from] AppError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::InvalidCredentials => AppError::unauthorized("INVALID_CREDENTIALS", message),
            AuthError::TokenExpired | AuthError::InvalidToken => {
                AppError::unauthorized("INVALID_TOKEN", message)
            }
            AuthError::RevokedToken => AppError::unauthorized("REVOKED_TOKEN", message),
            AuthError::UserNotFound => AppError::unauthorized("USER_NOT_FOUND", message),
            AuthError::EmailExists => AppError::bad_request("EMAIL_EXISTS", message),
            AuthError::UsernameExists => AppError::bad_request("USERNAME_EXISTS", message),
            AuthError::WrongPassword => AppError::bad_request("INVALID_PASSWORD", message),
            AuthError::App(e) => e,
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// AuthService implementation
pub struct AuthServiceImpl {
    users: Arc<dyn UserRepository>,
    revocations: Arc<dyn TokenRevocationList>,
    id_generator: Arc<SnowflakeGenerator>,
    jwt_settings: JwtSettings,
}

impl AuthServiceImpl {
    /// Create a new AuthServiceImpl
    pub fn new(
        users: Arc<dyn UserRepository>,
        revocations: Arc<dyn TokenRevocationList>,
        id_generator: Arc<SnowflakeGenerator>,
        jwt_settings: JwtSettings,
    ) -> Self {
        Self {
            users,
            revocations,
            id_generator,
            jwt_settings,
        }
    }

    /// Hash a password using Argon2id
    fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against its hash
    fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AuthError::Internal(format!("Invalid password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    fn secret_for(&self, typ: TokenType) -> &[u8] {
        match typ {
            TokenType::Access => self.jwt_settings.secret.as_bytes(),
            TokenType::Refresh => self.jwt_settings.refresh_secret.as_bytes(),
        }
    }

    fn issue(&self, user_id: i64, typ: TokenType) -> Result<String, AuthError> {
        let now = Utc::now();
        let lifetime = match typ {
            TokenType::Access => Duration::minutes(self.jwt_settings.access_token_expiry_minutes),
            TokenType::Refresh => Duration::days(self.jwt_settings.refresh_token_expiry_days),
        };

        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            typ,
        };

        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret_for(typ)))
            .map_err(|e| AuthError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Generate access and refresh tokens
    fn generate_tokens(&self, user_id: i64) -> Result<TokenResponse, AuthError> {
        Ok(TokenResponse {
            access_token: self.issue(user_id, TokenType::Access)?,
            refresh_token: self.issue(user_id, TokenType::Refresh)?,
            expires_in: self.jwt_settings.access_token_expiry_minutes * 60,
            token_type: "Bearer".to_string(),
        })
    }

    /// Decode a token, checking signature, expiry and `typ`.
    fn decode_token(&self, token: &str, typ: TokenType) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &DecodingKey::from_secret(self.secret_for(typ)), &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })?
            .claims;

        if claims.typ != typ {
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }

    async fn ensure_not_revoked(&self, token: &str) -> Result<(), AuthError> {
        if self.revocations.is_revoked(token).await? {
            return Err(AuthError::RevokedToken);
        }
        Ok(())
    }

    fn subject(claims: &Claims) -> Result<i64, AuthError> {
        claims.sub.parse::<i64>().map_err(|_| AuthError::InvalidToken)
    }
}

#[async_trait]
impl AuthService for AuthServiceImpl {
    #[instrument(skip(self, request), fields(username = %request.username))]
    async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError> {
        if self.users.email_exists(&request.email).await? {
            return Err(AuthError::EmailExists);
        }
        if self.users.username_exists(&request.username).await? {
            return Err(AuthError::UsernameExists);
        }

        let password_hash = self.hash_password(&request.password)?;

        let mut user = User::new(
            self.id_generator.generate(),
            request.username,
            request.email,
            password_hash,
        );
        user.full_name = request.full_name;

        let user = self.users.create(&user).await?;
        let tokens = self.generate_tokens(user.id)?;

        info!(user_id = user.id, "User registered");

        Ok(AuthResponse {
            user: UserResponse::from_user(user, true),
            tokens,
        })
    }

    #[instrument(skip(self, request))]
    async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let user = self
            .users
            .find_by_email(&request.email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.verify_password(&request.password, &user.password_hash)? {
            warn!(user_id = user.id, "Failed login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.generate_tokens(user.id)?;
        info!(user_id = user.id, "User logged in");

        Ok(AuthResponse {
            user: UserResponse::from_user(user, true),
            tokens,
        })
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        let claims = self.decode_token(refresh_token, TokenType::Refresh)?;
        self.ensure_not_revoked(refresh_token).await?;

        let user_id = Self::subject(&claims)?;
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AuthError::UserNotFound);
        }

        // Rotation: the presented refresh token cannot be used again
        self.revocations.revoke(refresh_token, claims.exp).await?;

        self.generate_tokens(user_id)
    }

    #[instrument(skip_all)]
    async fn logout(&self, access_token: &str, refresh_token: Option<&str>) -> Result<(), AuthError> {
        let claims = self.decode_token(access_token, TokenType::Access)?;
        self.revocations.revoke(access_token, claims.exp).await?;

        if let Some(refresh_token) = refresh_token {
            // An unusable refresh token needs no revocation
            if let Ok(refresh_claims) = self.decode_token(refresh_token, TokenType::Refresh) {
                self.revocations.revoke(refresh_token, refresh_claims.exp).await?;
            }
        }

        info!(user_id = %claims.sub, "User logged out");
        Ok(())
    }

    async fn authenticate(&self, access_token: &str) -> Result<User, AuthError> {
        let claims = self.decode_token(access_token, TokenType::Access)?;
        self.ensure_not_revoked(access_token).await?;

        let user_id = Self::subject(&claims)?;
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    #[instrument(skip(self, request))]
    async fn change_password(&self, user_id: i64, request: ChangePasswordRequest) -> Result<(), AuthError> {
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !self.verify_password(&request.current_password, &user.password_hash)? {
            return Err(AuthError::WrongPassword);
        }

        user.password_hash = self.hash_password(&request.new_password)?;
        self.users.update(&user).await?;

        info!(user_id, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::infrastructure::cache::MemoryRevocationList;
    use crate::infrastructure::repositories::{MemoryStore, Repositories};

    fn service() -> AuthServiceImpl {
        let settings = Settings::for_testing("test-secret-that-is-at-least-32-chars").unwrap();
        AuthServiceImpl::new(
            Repositories::in_memory(MemoryStore::new()).users,
            Arc::new(MemoryRevocationList::new()),
            Arc::new(SnowflakeGenerator::new(1, 1)),
            settings.jwt,
        )
    }

    fn register_request(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: "correct horse".into(),
            full_name: None,
        }
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let service = service();
        let response = service.register(register_request("alice", "alice@example.com")).await.unwrap();

        let user = service.authenticate(&response.tokens.access_token).await.unwrap();
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let service = service();
        service.register(register_request("alice", "alice@example.com")).await.unwrap();

        let err = service
            .register(register_request("alice2", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailExists));
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let service = service();
        service.register(register_request("alice", "alice@example.com")).await.unwrap();

        let err = service
            .login(LoginRequest {
                email: "alice@example.com".into(),
                password: "wrong".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_an_access_token() {
        let service = service();
        let response = service.register(register_request("alice", "alice@example.com")).await.unwrap();

        let err = service.authenticate(&response.tokens.refresh_token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_refresh_rotates() {
        let service = service();
        let response = service.register(register_request("alice", "alice@example.com")).await.unwrap();

        let rotated = service.refresh(&response.tokens.refresh_token).await.unwrap();
        assert!(service.authenticate(&rotated.access_token).await.is_ok());

        let err = service.refresh(&response.tokens.refresh_token).await.unwrap_err();
        assert!(matches!(err, AuthError::RevokedToken));
    }

    #[tokio::test]
    async fn test_logout_revokes_access_token() {
        let service = service();
        let response = service.register(register_request("alice", "alice@example.com")).await.unwrap();

        service
            .logout(&response.tokens.access_token, Some(&response.tokens.refresh_token))
            .await
            .unwrap();

        let err = service.authenticate(&response.tokens.access_token).await.unwrap_err();
        assert!(matches!(err, AuthError::RevokedToken));
        let err = service.refresh(&response.tokens.refresh_token).await.unwrap_err();
        assert!(matches!(err, AuthError::RevokedToken));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::from(AuthError::RevokedToken).code(), "REVOKED_TOKEN");
        assert_eq!(AppError::from(AuthError::TokenExpired).code(), "INVALID_TOKEN");
        assert_eq!(AppError::from(AuthError::UsernameExists).code(), "USERNAME_EXISTS");
    }

    #[test]
    fn test_duplicate_identity_is_a_bad_request() {
        for err in [AuthError::EmailExists, AuthError::UsernameExists] {
            assert_eq!(AppError::from(err).status(), axum::http::StatusCode::BAD_REQUEST);
        }
    }
}
