//! Sign-up, login, refresh rotation, logout and profile lookup.
//!
//! The manager holds no per-session state. Every call re-reads what it needs
//! from the store, so any number of instances can serve the same database.
//! Store and crypto failures are logged here and collapsed into
//! [`SessionError::Internal`]; nothing below this layer reaches a client.

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

use crate::db::{Database, UserRole, is_unique_violation};
use crate::jwt::{IssuedToken, JwtConfig, JwtError};
use crate::password::{self, MIN_PASSWORD_LENGTH};

/// Default bound on a single store operation.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Tokens returned by login and refresh.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
    /// Access token expiry (Unix seconds)
    pub expires_at: u64,
}

impl TokenPair {
    fn new(access: IssuedToken, refresh: IssuedToken) -> Self {
        Self {
            access_token: access.token,
            refresh_token: refresh.token,
            expires_in: access.duration,
            expires_at: access.expires_at,
        }
    }
}

/// Public profile of an authenticated user.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: i64,
    pub email: String,
    pub role: UserRole,
    pub created_at: String,
}

/// Outcome classes of session operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    InvalidInput(&'static str),
    /// Bad credentials or a bad, expired or already-used token
    Unauthorized,
    /// Email already registered
    Conflict,
    NotFound,
    Internal,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::InvalidInput(msg) => write!(f, "{}", msg),
            SessionError::Unauthorized => write!(f, "Unauthorized"),
            SessionError::Conflict => write!(f, "Conflict"),
            SessionError::NotFound => write!(f, "Not found"),
            SessionError::Internal => write!(f, "Internal error"),
        }
    }
}

impl std::error::Error for SessionError {}

#[derive(Clone)]
pub struct SessionManager {
    db: Database,
    jwt: Arc<JwtConfig>,
    store_timeout: Duration,
}

impl SessionManager {
    pub fn new(db: Database, jwt: Arc<JwtConfig>, store_timeout: Duration) -> Self {
        Self {
            db,
            jwt,
            store_timeout,
        }
    }

    pub fn jwt(&self) -> &Arc<JwtConfig> {
        &self.jwt
    }

    /// Register a new account. Returns the new user id; no tokens are issued.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<i64, SessionError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(SessionError::InvalidInput("email and password required"));
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(SessionError::InvalidInput(
                "password must be at least 6 characters",
            ));
        }

        let owned = password.to_string();
        let hash = blocking(move || password::hash_password(&owned))
            .await?
            .map_err(|e| {
                error!(error = %e, "Failed to hash password");
                SessionError::Internal
            })?;

        match self.bounded(self.db.users().create(email, &hash)).await? {
            Ok(id) => {
                info!(user_id = id, "User created");
                Ok(id)
            }
            Err(e) if is_unique_violation(&e) => Err(SessionError::Conflict),
            Err(e) => {
                error!(error = %e, "Failed to create user");
                Err(SessionError::Internal)
            }
        }
    }

    /// Verify credentials and open a new session.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller,
    /// including in time spent.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, SessionError> {
        let user = self
            .store("Failed to look up user", self.db.users().get_by_email(email))
            .await?;

        let owned = password.to_string();
        let Some(user) = user else {
            blocking(move || password::dummy_verify(&owned)).await?;
            debug!("Login for unknown email");
            return Err(SessionError::Unauthorized);
        };

        let hash = user.password_hash.clone();
        let valid = blocking(move || password::verify_password(&owned, &hash)).await?;
        if !valid {
            debug!(user_id = user.id, "Login with wrong password");
            return Err(SessionError::Unauthorized);
        }

        let access = self
            .jwt
            .generate_access_token(user.id, &user.email)
            .map_err(signing_error)?;
        let refresh = self
            .jwt
            .generate_refresh_token(user.id, &user.email)
            .map_err(signing_error)?;

        // The row must exist before the client can see the token.
        self.store(
            "Failed to store refresh token",
            self.db
                .tokens()
                .create(user.id, &refresh.token, unix_i64(refresh.expires_at)?),
        )
        .await?;

        info!(user_id = user.id, "Login succeeded");
        Ok(TokenPair::new(access, refresh))
    }

    /// Exchange a refresh token for a new pair, consuming the old one.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError> {
        let claims = self
            .jwt
            .validate_refresh_token(refresh_token)
            .map_err(|e| {
                debug!(error = %e, "Refresh token rejected");
                SessionError::Unauthorized
            })?;
        let user_id = claims.user_id;
        let now = now_unix()?;

        // The signature proves authenticity; only the store knows about revocation.
        let live = self
            .store(
                "Failed to check refresh token",
                self.db.tokens().exists(refresh_token, user_id, now),
            )
            .await?;
        if !live {
            warn!(user_id, "Refresh token is not live (reused, revoked or expired)");
            return Err(SessionError::Unauthorized);
        }

        let access = self
            .jwt
            .generate_access_token(user_id, &claims.email)
            .map_err(signing_error)?;
        let refresh = self
            .jwt
            .generate_refresh_token(user_id, &claims.email)
            .map_err(signing_error)?;

        let rotated = self
            .store(
                "Failed to rotate refresh token",
                self.db.tokens().rotate(
                    refresh_token,
                    user_id,
                    &refresh.token,
                    unix_i64(refresh.expires_at)?,
                    now,
                ),
            )
            .await?;
        if !rotated {
            warn!(user_id, "Refresh token consumed by a concurrent request");
            return Err(SessionError::Unauthorized);
        }

        info!(user_id, "Refresh token rotated");
        Ok(TokenPair::new(access, refresh))
    }

    /// Revoke a refresh token. Unknown tokens are ignored.
    ///
    /// Access tokens already handed out stay valid until they expire.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), SessionError> {
        let revoked = self
            .store(
                "Failed to revoke refresh token",
                self.db.tokens().delete(refresh_token),
            )
            .await?;
        if revoked {
            info!("Refresh token revoked");
        }
        Ok(())
    }

    /// Profile of an authenticated subject.
    pub async fn me(&self, user_id: i64) -> Result<Profile, SessionError> {
        let user = self
            .store("Failed to get user", self.db.users().get_by_id(user_id))
            .await?
            .ok_or_else(|| {
                // A valid token for a missing row is a consistency bug, not a client error.
                error!(user_id, "Authenticated user has no row");
                SessionError::Internal
            })?;

        Ok(Profile {
            id: user.id,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        })
    }

    /// Run a store operation under the request timeout.
    async fn bounded<T, F>(&self, op: F) -> Result<Result<T, sqlx::Error>, SessionError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        tokio::time::timeout(self.store_timeout, op)
            .await
            .map_err(|_| {
                error!(timeout = ?self.store_timeout, "Store operation timed out");
                SessionError::Internal
            })
    }

    async fn store<T, F>(&self, context: &str, op: F) -> Result<T, SessionError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        self.bounded(op).await?.map_err(|e| {
            error!(error = %e, "{}", context);
            SessionError::Internal
        })
    }
}

/// Password hashing is CPU-bound; keep it off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, SessionError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!(error = %e, "Blocking task failed");
        SessionError::Internal
    })
}

fn signing_error(e: JwtError) -> SessionError {
    error!(error = %e, "Failed to issue token");
    SessionError::Internal
}

fn now_unix() -> Result<i64, SessionError> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| SessionError::Internal)?
        .as_secs();
    unix_i64(secs)
}

fn unix_i64(secs: u64) -> Result<i64, SessionError> {
    i64::try_from(secs).map_err(|_| SessionError::Internal)
}
