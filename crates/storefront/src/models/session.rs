//! Session-related types.
//!
//! Types stored in the HTTP session for authentication state.

use crate::baas::AuthUser;

/// Session-stored user identity, as reported by the auth provider.
pub type CurrentUser = AuthUser;

/// Session keys.
pub mod session_keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the receipt of the last completed checkout.
    pub const LAST_RECEIPT: &str = "last_receipt";
}
