//! JWT token generation and validation.
//!
//! Access and refresh tokens share one encoding (HS256 compact JWS) and differ
//! only in the secret, the lifetime and the `typ` claim, so a token of one kind
//! never validates as the other.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Lifetime used when a TTL expression is empty.
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived, stateless
    Access,
    /// Long-lived, tracked server-side and single-use
    Refresh,
}

/// Wire claims. The subject is the decimal user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    #[serde(rename = "typ")]
    token_type: TokenType,
    /// Random id so two tokens minted in the same second still differ
    jti: String,
    iat: u64,
    exp: u64,
}

/// Claims recovered from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    pub user_id: i64,
    pub email: String,
    pub issued_at: u64,
    pub expires_at: u64,
}

/// Result of issuing a token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The JWT token string
    pub token: String,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Token duration in seconds
    pub duration: u64,
}

/// Parse a token lifetime.
///
/// Accepts a duration expression made of `<number><unit>` pairs (`"15m"`,
/// `"1h30m"`, `"1.5h"`, `"30s"`, units `ns us ms s m h`) or a bare integer
/// counted in minutes (`"20"`). An empty string yields [`DEFAULT_TTL`].
/// Lifetimes under one second are rejected.
pub fn parse_ttl(ttl: &str) -> Result<Duration, JwtError> {
    let trimmed = ttl.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_TTL);
    }

    let parsed = if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        trimmed
            .parse::<u64>()
            .ok()
            .and_then(|minutes| minutes.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        parse_duration_expr(trimmed)
    };

    match parsed {
        Some(duration) if duration.as_secs() > 0 => Ok(duration),
        _ => Err(JwtError::InvalidTtl(ttl.to_string())),
    }
}

fn parse_duration_expr(expr: &str) -> Option<Duration> {
    let mut rest = expr;
    let mut total = Duration::ZERO;

    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return None;
        }
        let (number, tail) = rest.split_at(num_len);
        let value: f64 = number.parse().ok()?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let secs_per_unit = match unit {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            _ => return None,
        };

        total = total.checked_add(Duration::try_from_secs_f64(value * secs_per_unit).ok()?)?;
        rest = tail;
    }

    Some(total)
}

fn now_secs() -> Result<u64, JwtError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| JwtError::TimeError)?
        .as_secs())
}

/// Signs and verifies one kind of token with one secret and one lifetime.
#[derive(Clone)]
pub struct TokenCodec {
    token_type: TokenType,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenCodec {
    /// Fails with [`JwtError::MissingSecret`] if `secret` is empty.
    pub fn new(token_type: TokenType, secret: &[u8], ttl: Duration) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::MissingSecret);
        }
        if ttl.as_secs() == 0 {
            return Err(JwtError::InvalidTtl(format!("{:?}", ttl)));
        }

        Ok(Self {
            token_type,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a signed token for `user_id`.
    pub fn issue(&self, user_id: i64, email: &str) -> Result<IssuedToken, JwtError> {
        let now = now_secs()?;
        let duration = self.ttl.as_secs();
        let exp = now + duration;

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            token_type: self.token_type,
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(IssuedToken {
            token,
            expires_at: exp,
            duration,
        })
    }

    /// Verify signature, algorithm, token type and expiry, then recover the subject.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(e),
            })?;
        let claims = token_data.claims;

        if claims.token_type != self.token_type {
            return Err(JwtError::WrongTokenType);
        }

        // The parser's exp check has a strict comparison; a token is dead at its exp second.
        if claims.exp <= now_secs()? {
            return Err(JwtError::Expired);
        }

        let user_id = match claims.sub.parse::<i64>() {
            Ok(id) if id > 0 => id,
            _ => return Err(JwtError::InvalidSubject),
        };

        Ok(AccessClaims {
            user_id,
            email: claims.email,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }
}

/// Both codecs, built once at startup and shared by the session manager and the gate.
#[derive(Clone)]
pub struct JwtConfig {
    access: TokenCodec,
    refresh: TokenCodec,
}

impl JwtConfig {
    pub fn new(
        access_secret: &[u8],
        access_ttl: Duration,
        refresh_secret: &[u8],
        refresh_ttl: Duration,
    ) -> Result<Self, JwtError> {
        Ok(Self {
            access: TokenCodec::new(TokenType::Access, access_secret, access_ttl)?,
            refresh: TokenCodec::new(TokenType::Refresh, refresh_secret, refresh_ttl)?,
        })
    }

    pub fn access(&self) -> &TokenCodec {
        &self.access
    }

    pub fn refresh(&self) -> &TokenCodec {
        &self.refresh
    }

    pub fn generate_access_token(&self, user_id: i64, email: &str) -> Result<IssuedToken, JwtError> {
        self.access.issue(user_id, email)
    }

    pub fn generate_refresh_token(
        &self,
        user_id: i64,
        email: &str,
    ) -> Result<IssuedToken, JwtError> {
        self.refresh.issue(user_id, email)
    }

    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        self.access.verify(token)
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        self.refresh.verify(token)
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Signing secret is empty
    MissingSecret,
    /// TTL expression could not be parsed
    InvalidTtl(String),
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Token is past its expiry
    Expired,
    /// Bad signature, disallowed algorithm or malformed token
    Invalid(jsonwebtoken::errors::Error),
    /// Wrong token type (e.g., using refresh token as access token)
    WrongTokenType,
    /// Subject is not a positive numeric user id
    InvalidSubject,
    /// System time error
    TimeError,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::MissingSecret => write!(f, "Signing secret not configured"),
            JwtError::InvalidTtl(ttl) => write!(f, "Invalid token TTL: {:?}", ttl),
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Expired => write!(f, "Token expired"),
            JwtError::Invalid(e) => write!(f, "Invalid token: {}", e),
            JwtError::WrongTokenType => write!(f, "Wrong token type"),
            JwtError::InvalidSubject => write!(f, "Invalid token subject"),
            JwtError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for JwtError {}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-key-for-testing";

    fn codec(token_type: TokenType, secret: &[u8]) -> TokenCodec {
        TokenCodec::new(token_type, secret, DEFAULT_TTL).unwrap()
    }

    fn forge(claims: &serde_json::Value, alg: Algorithm, secret: &[u8]) -> String {
        jsonwebtoken::encode(
            &Header::new(alg),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_ttl_expressions() {
        assert_eq!(parse_ttl("").unwrap(), Duration::from_secs(15 * 60));
        assert_eq!(parse_ttl("15m").unwrap(), Duration::from_secs(15 * 60));
        assert_eq!(parse_ttl("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_ttl("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_ttl("20").unwrap(), Duration::from_secs(20 * 60));
        assert_eq!(parse_ttl("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_ttl("1.5h").unwrap(), Duration::from_secs(5400));
    }

    #[test]
    fn test_parse_ttl_rejects_garbage() {
        for bad in ["abc", "15x", "m", "0", "0s", "500ms", "1..5h", "-5m"] {
            assert!(
                matches!(parse_ttl(bad), Err(JwtError::InvalidTtl(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_round_trip_for_every_ttl_form() {
        for ttl in ["15m", "1h", "30s", "20"] {
            let codec =
                TokenCodec::new(TokenType::Access, SECRET, parse_ttl(ttl).unwrap()).unwrap();
            let issued = codec.issue(42, "alice@example.com").unwrap();
            let claims = codec.verify(&issued.token).unwrap();

            assert_eq!(claims.user_id, 42);
            assert_eq!(claims.email, "alice@example.com");
            assert_eq!(claims.expires_at, issued.expires_at);
            assert_eq!(issued.duration, parse_ttl(ttl).unwrap().as_secs());
        }
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(
            TokenCodec::new(TokenType::Access, b"", DEFAULT_TTL),
            Err(JwtError::MissingSecret)
        ));
        assert!(JwtConfig::new(SECRET, DEFAULT_TTL, b"", DEFAULT_TTL).is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let issued = codec(TokenType::Access, b"secret-1").issue(1, "a@b.c").unwrap();
        let result = codec(TokenType::Access, b"secret-2").verify(&issued.token);
        assert!(matches!(result, Err(JwtError::Invalid(_))));
    }

    #[test]
    fn test_wrong_token_type_rejected() {
        // Same secret on purpose: only the typ claim separates them here.
        let access = codec(TokenType::Access, SECRET);
        let refresh = codec(TokenType::Refresh, SECRET);

        let a = access.issue(7, "a@b.c").unwrap();
        let r = refresh.issue(7, "a@b.c").unwrap();

        assert!(matches!(refresh.verify(&a.token), Err(JwtError::WrongTokenType)));
        assert!(matches!(access.verify(&r.token), Err(JwtError::WrongTokenType)));
    }

    #[test]
    fn test_unique_tokens_in_same_second() {
        let refresh = codec(TokenType::Refresh, SECRET);
        let first = refresh.issue(1, "a@b.c").unwrap();
        let second = refresh.issue(1, "a@b.c").unwrap();
        assert_ne!(first.token, second.token);
    }

    #[test]
    fn test_invalid_token() {
        let result = codec(TokenType::Access, SECRET).verify("invalid-token");
        assert!(matches!(result, Err(JwtError::Invalid(_))));
    }

    #[test]
    fn test_expired_token() {
        let now = now_secs().unwrap();
        let token = forge(
            &serde_json::json!({
                "sub": "1",
                "email": "alice@example.com",
                "typ": "access",
                "jti": "x",
                "iat": now - 100,
                "exp": now - 50,
            }),
            Algorithm::HS256,
            SECRET,
        );

        let result = codec(TokenType::Access, SECRET).verify(&token);
        assert!(matches!(result, Err(JwtError::Expired)));
    }

    #[test]
    fn test_short_ttl_expires_with_expiry_error() {
        let access = TokenCodec::new(TokenType::Access, SECRET, parse_ttl("1s").unwrap()).unwrap();
        let issued = access.issue(1, "a@b.c").unwrap();

        std::thread::sleep(Duration::from_millis(2100));

        assert!(matches!(access.verify(&issued.token), Err(JwtError::Expired)));
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let now = now_secs().unwrap();
        let token = forge(
            &serde_json::json!({
                "sub": "1",
                "email": "a@b.c",
                "typ": "access",
                "jti": "x",
                "iat": now,
                "exp": now + 600,
            }),
            Algorithm::HS512,
            SECRET,
        );

        let result = codec(TokenType::Access, SECRET).verify(&token);
        assert!(matches!(result, Err(JwtError::Invalid(_))));
    }

    #[test]
    fn test_non_numeric_subject_rejected() {
        let now = now_secs().unwrap();
        for sub in ["abc", "0", "-3"] {
            let token = forge(
                &serde_json::json!({
                    "sub": sub,
                    "email": "a@b.c",
                    "typ": "access",
                    "jti": "x",
                    "iat": now,
                    "exp": now + 600,
                }),
                Algorithm::HS256,
                SECRET,
            );

            let result = codec(TokenType::Access, SECRET).verify(&token);
            assert!(
                matches!(result, Err(JwtError::InvalidSubject)),
                "subject {sub:?} should be rejected"
            );
        }
    }
}
