//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::auth::ClientIpHeader;
use crate::db::Database;
use crate::jwt::{JwtConfig, parse_ttl};
use crate::rate_limit::RateLimitConfig;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

const MIN_SECRET_LENGTH: usize = 32;

/// Environment variables that carry signing secrets.
const SECRET_VARS: [&str; 2] = ["ACCESS_SECRET", "REFRESH_SECRET"];

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tollgate",
    about = "Session and token service: sign-up, login, refresh rotation, logout"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "4000")]
    pub port: u16,

    /// Path to SQLite database file (":memory:" for a throwaway database)
    #[arg(short, long, env = "DATABASE_PATH", default_value = "tollgate.db")]
    pub database: String,

    /// Secret for signing access tokens
    #[arg(long, env = "ACCESS_SECRET", hide_env_values = true)]
    pub access_secret: Option<String>,

    /// Access token lifetime ("15m", "1h", "30s", or bare minutes)
    #[arg(long, env = "ACCESS_TTL", default_value = "15m")]
    pub access_ttl: String,

    /// Secret for signing refresh tokens (must differ from the access secret)
    #[arg(long, env = "REFRESH_SECRET", hide_env_values = true)]
    pub refresh_secret: Option<String>,

    /// Refresh token lifetime
    #[arg(long, env = "REFRESH_TTL", default_value = "168h")]
    pub refresh_ttl: String,

    /// Upper bound on a single database operation, in seconds
    #[arg(long, env = "STORE_TIMEOUT_SECS", default_value = "5")]
    pub store_timeout_secs: u64,

    /// Disable per-IP rate limiting of /login and /signup
    #[arg(long)]
    pub no_rate_limit: bool,

    /// Read the client IP from this proxy header instead of the socket address
    #[arg(long, value_enum)]
    pub client_ip_header: Option<ClientIpHeader>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Remove secret variables from the process environment once parsed.
pub fn scrub_secret_env() {
    for var in SECRET_VARS {
        // SAFETY: called from main before the runtime spawns any other task,
        // and nothing else reads these variables.
        unsafe { std::env::remove_var(var) };
    }
}

/// Validate one signing secret.
fn check_secret(name: &str, secret: Option<&str>) -> Result<Vec<u8>, String> {
    let secret = secret
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("{} is required", name))?;

    if secret.len() < MIN_SECRET_LENGTH {
        return Err(format!(
            "{} is shorter than {} characters. Use a longer secret",
            name, MIN_SECRET_LENGTH
        ));
    }

    Ok(secret.as_bytes().to_vec())
}

/// Build the JWT configuration from arguments.
pub fn build_jwt_config(args: &Args) -> Result<JwtConfig, String> {
    let access_secret = check_secret("ACCESS_SECRET", args.access_secret.as_deref())?;
    let refresh_secret = check_secret("REFRESH_SECRET", args.refresh_secret.as_deref())?;

    if access_secret == refresh_secret {
        return Err("ACCESS_SECRET and REFRESH_SECRET must differ".to_string());
    }

    let access_ttl = parse_ttl(&args.access_ttl).map_err(|e| format!("ACCESS_TTL: {}", e))?;
    let refresh_ttl = parse_ttl(&args.refresh_ttl).map_err(|e| format!("REFRESH_TTL: {}", e))?;

    JwtConfig::new(&access_secret, access_ttl, &refresh_secret, refresh_ttl)
        .map_err(|e| e.to_string())
}

/// Build ServerConfig from validated arguments.
/// Returns None and logs an error if validation fails.
pub fn build_config(args: &Args, db: Database) -> Option<ServerConfig> {
    let jwt = match build_jwt_config(args) {
        Ok(jwt) => jwt,
        Err(e) => {
            error!("{}", e);
            return None;
        }
    };

    if args.store_timeout_secs == 0 {
        error!("Store timeout must be at least one second");
        return None;
    }

    let rate_limit = if args.no_rate_limit {
        None
    } else {
        Some(Arc::new(RateLimitConfig::new(args.client_ip_header)))
    };

    Some(ServerConfig {
        db,
        jwt,
        store_timeout: Duration::from_secs(args.store_timeout_secs),
        rate_limit,
    })
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
