//! Authentication user types.

use crate::jwt::AccessClaims;

/// Identity resolved by the gate and handed to protected handlers.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Database user ID taken from the token subject
    pub user_id: i64,
    /// Claims from the access token
    pub claims: AccessClaims,
}
