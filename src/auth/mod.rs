//! Bearer-token authentication gate for protected routes.
//!
//! Access tokens are verified statelessly against the access secret; nothing
//! here touches the database. Refresh tokens never pass this gate.

mod bearer;
mod errors;
mod extractors;
mod ip;
mod types;

pub use bearer::bearer_token;
pub use errors::{AuthErrorKind, AuthRejection};
pub use extractors::{Auth, authenticate, require_auth};
pub use ip::{ClientIpHeader, extract_client_ip};
pub use types::AuthenticatedUser;
