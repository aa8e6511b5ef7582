//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use abc_retail_core::{Customer, Entity, EntityKey};

/// Session-stored customer identity.
///
/// Minimal data stored in the session to identify the logged-in customer.
/// The token must still match the one persisted on the customer record for
/// the identity to be honoured.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    /// Storage key of the customer record.
    pub customer: EntityKey,
    /// Session token issued at login.
    pub token: String,
}

impl SessionIdentity {
    /// Identity for a customer that has just been issued a token.
    ///
    /// Returns `None` if the customer holds no session token.
    #[must_use]
    pub fn for_customer(customer: &Customer) -> Option<Self> {
        customer.session_token.as_ref().map(|token| Self {
            customer: customer.key(),
            token: token.clone(),
        })
    }
}

// The token is a bearer credential.
impl std::fmt::Debug for SessionIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIdentity")
            .field("customer", &self.customer)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in customer.
    pub const CURRENT_CUSTOMER: &str = "current_customer";
}
