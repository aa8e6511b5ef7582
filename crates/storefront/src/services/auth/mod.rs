//! Authentication service.
//!
//! Password login over customer records, session tokens, registration and
//! the administrator guard.

mod error;

pub use error::AuthError;

use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use chrono::{Duration, Utc};
use futures::StreamExt;
use rand::RngCore;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::instrument;

use abc_retail_core::models::customer::{validate_name, validate_phone};
use abc_retail_core::{AuditEvent, Customer, Email, Entity, Filter, PartitionKey, RowKey};

use super::record_audit;
use crate::backends::Backends;
use crate::db::{StoreError, expected_version};
use crate::models::SessionIdentity;

/// Bytes of randomness in a session token.
const SESSION_TOKEN_BYTES: usize = 32;

/// Registration form.
#[derive(Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
    pub password: String,
    pub confirm_password: String,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("address", &self.address)
            .field("password", &"[REDACTED]")
            .field("confirm_password", &"[REDACTED]")
            .finish()
    }
}

/// Authentication service.
///
/// Handles registration, login, logout and session resolution.
pub struct AuthService<'a> {
    backends: &'a Backends,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(backends: &'a Backends) -> Self {
        Self { backends }
    }

    /// Register a new customer and sign them in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for malformed input.
    /// Returns `AuthError::AlreadyRegistered` if the email is taken.
    /// Returns `AuthError::Store` if the customer cannot be stored.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<Customer, AuthError> {
        let customer = self.new_account(&request).await?;
        let customer = self.backends.customers.add(customer).await?;
        tracing::info!(
            row_key = %customer.meta.row_key,
            customer_id = %customer.customer_id,
            "Customer registered"
        );

        let signed_in = self
            .authenticate(customer.email.as_str(), &request.password)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        record_audit(
            self.backends.audit.as_ref(),
            &AuditEvent::session(
                "Register",
                format!("Customer {} registered.", signed_in.name),
            ),
        )
        .await;

        Ok(signed_in)
    }

    /// Check an email and password.
    ///
    /// On success the customer is issued a fresh session token and its last
    /// login time is advanced. An unknown email and a wrong password both
    /// return `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Store` if the customer store fails, including a
    /// `Conflict` when a concurrent login updated the record first.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Customer>, AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(None);
        };
        let Some(mut customer) = self.find_by_email(&email).await? else {
            tracing::debug!("No customer with this email");
            return Ok(None);
        };
        if !verify_password(password, &customer.password_hash) {
            tracing::debug!(row_key = %customer.meta.row_key, "Password mismatch");
            return Ok(None);
        }

        let expected = expected_version(&customer)?;
        let now = Utc::now();
        customer.last_login = Some(match customer.last_login {
            // Clock has not moved past the previous login.
            Some(previous) if previous >= now => previous + Duration::microseconds(1),
            _ => now,
        });
        customer.session_token = Some(generate_session_token());
        let customer = self.backends.customers.update(customer, &expected).await?;

        tracing::info!(row_key = %customer.meta.row_key, "Customer signed in");
        record_audit(
            self.backends.audit.as_ref(),
            &AuditEvent::session("Login", format!("Customer {} logged in.", customer.name)),
        )
        .await;

        Ok(Some(customer))
    }

    /// Clear the customer's session token.
    ///
    /// Signing out an account that no longer exists is not an error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Store` if the read or update fails.
    #[instrument(skip(self))]
    pub async fn logout(
        &self,
        partition_key: &PartitionKey,
        row_key: &RowKey,
    ) -> Result<(), AuthError> {
        let mut customer = match self.backends.customers.get(partition_key, row_key).await {
            Ok(customer) => customer,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let expected = expected_version(&customer)?;
        customer.session_token = None;
        let customer = self.backends.customers.update(customer, &expected).await?;

        record_audit(
            self.backends.audit.as_ref(),
            &AuditEvent::session("Logout", format!("Customer {} logged out.", customer.name)),
        )
        .await;
        Ok(())
    }

    /// Load the customer behind a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthorized` when there is no session, the
    /// customer no longer exists, or the token does not match.
    pub async fn resolve_session(
        &self,
        session: Option<&SessionIdentity>,
    ) -> Result<Customer, AuthError> {
        let session = session.ok_or(AuthError::Unauthorized)?;
        let key = &session.customer;
        let customer = match self
            .backends
            .customers
            .get(&key.partition_key, &key.row_key)
            .await
        {
            Ok(customer) => customer,
            Err(e) if e.is_not_found() => return Err(AuthError::Unauthorized),
            Err(e) => return Err(e.into()),
        };
        if !session_matches(&customer, session) {
            return Err(AuthError::Unauthorized);
        }
        Ok(customer)
    }

    /// Guard for administrator-only operations.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthorized` without a valid session and
    /// `AuthError::Forbidden` when the customer is not an administrator.
    pub async fn require_admin(
        &self,
        session: Option<&SessionIdentity>,
    ) -> Result<Customer, AuthError> {
        let customer = self.resolve_session(session).await?;
        if !customer.is_admin {
            tracing::warn!(row_key = %customer.meta.row_key, "Administrator role required");
            return Err(AuthError::Forbidden);
        }
        Ok(customer)
    }

    /// Validate a registration form and build the account it describes.
    ///
    /// The account is not stored.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for malformed input and
    /// `AuthError::AlreadyRegistered` if the email is taken.
    pub(crate) async fn new_account(
        &self,
        request: &RegisterRequest,
    ) -> Result<Customer, AuthError> {
        validate_name(&request.name)?;
        let email = Email::parse(&request.email)?;
        validate_phone(&request.phone)?;
        if request.password.is_empty() {
            return Err(AuthError::Validation("password: is required".to_owned()));
        }
        if request.password != request.confirm_password {
            return Err(AuthError::Validation(
                "confirm_password: passwords do not match".to_owned(),
            ));
        }
        if self.find_by_email(&email).await?.is_some() {
            return Err(AuthError::AlreadyRegistered);
        }

        let address = request
            .address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_owned);
        Ok(Customer::new(
            &request.name,
            email,
            &request.phone,
            address,
            hash_password(&request.password),
        ))
    }

    /// First customer whose email matches exactly.
    pub(crate) async fn find_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<Customer>, StoreError> {
        let filter = Filter::eq("partition_key", Customer::PARTITION)
            .and(Filter::eq("email", email.as_str()));
        let mut matches = self.backends.customers.query(filter).await?;
        matches.next().await.transpose()
    }
}

/// Whether `session` carries the token currently stored on `customer`.
#[must_use]
pub fn session_matches(customer: &Customer, session: &SessionIdentity) -> bool {
    customer.key() == session.customer
        && customer
            .session_token
            .as_deref()
            .is_some_and(|token| token == session.token)
}

/// Password digest: base64 of the SHA-256 of the UTF-8 password.
#[must_use]
pub fn hash_password(password: &str) -> String {
    STANDARD.encode(Sha256::digest(password.as_bytes()))
}

fn verify_password(password: &str, stored_hash: &str) -> bool {
    hash_password(password) == stored_hash
}

/// Fresh random session token.
#[must_use]
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
