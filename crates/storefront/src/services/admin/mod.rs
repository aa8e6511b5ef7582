//! Catalogue, customer and order administration.
//!
//! Everything here except the public catalogue reads requires an
//! administrator session. Mutations are recorded on the audit queue on a
//! best-effort basis.

mod customers;
mod error;
mod orders;
mod products;

pub use customers::CustomerUpdate;
pub use error::AdminError;
pub use products::ProductInput;

use abc_retail_core::{AuditEvent, Customer};

use super::auth::AuthService;
use super::record_audit;
use crate::backends::Backends;
use crate::models::SessionIdentity;

/// Administration service.
pub struct AdminService<'a> {
    backends: &'a Backends,
}

impl<'a> AdminService<'a> {
    /// Create a new administration service.
    #[must_use]
    pub const fn new(backends: &'a Backends) -> Self {
        Self { backends }
    }

    async fn require_admin(
        &self,
        session: Option<&SessionIdentity>,
    ) -> Result<Customer, AdminError> {
        Ok(AuthService::new(self.backends)
            .require_admin(session)
            .await?)
    }

    async fn audit(&self, table_name: &str, action: &str, description: String) {
        record_audit(
            self.backends.audit.as_ref(),
            &AuditEvent::table(table_name, action, description),
        )
        .await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    use abc_retail_core::Customer;

    use crate::backends::{Backends, MemoryBackends};
    use crate::db::{EntityStore, expected_version};
    use crate::models::SessionIdentity;
    use crate::services::auth::{AuthService, RegisterRequest};

    pub fn registration(name: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.to_owned(),
            email: email.to_owned(),
            phone: "0821234567".to_owned(),
            address: None,
            password: "sneakers4life".to_owned(),
            confirm_password: "sneakers4life".to_owned(),
        }
    }

    /// Register a customer and promote it to administrator.
    pub async fn admin_session(
        memory: &MemoryBackends,
        backends: &Backends,
    ) -> (Customer, SessionIdentity) {
        let customer = AuthService::new(backends)
            .register(registration("Admin User", "admin@example.com"))
            .await
            .unwrap();
        let version = expected_version(&customer).unwrap();
        let mut promoted = customer;
        promoted.is_admin = true;
        let promoted = memory.customers.update(promoted, &version).await.unwrap();
        let session = SessionIdentity::for_customer(&promoted).unwrap();
        (promoted, session)
    }
}
