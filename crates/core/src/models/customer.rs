//! Customer accounts.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::EntityMetadata;
use crate::impl_entity;
use crate::types::Email;
use crate::validation::{ValidationError, min_chars};

/// A shopper account.
///
/// `customer_id` is a human-readable business identifier derived from name
/// and phone. It is ordinary data and is not guaranteed unique; identity is
/// the storage key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(flatten)]
    pub meta: EntityMetadata,
    pub customer_id: String,
    pub name: String,
    pub email: Email,
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
    pub password_hash: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    pub session_token: Option<String>,
}

impl_entity!(
    Customer,
    "customer",
    ["customer_id", "name", "email", "phone", "is_admin", "last_login"]
);

impl Customer {
    /// Partition every customer account lives in.
    pub const PARTITION: &'static str = "Customer";

    /// Build a new, not yet stored customer with a fresh row key.
    #[must_use]
    pub fn new(
        name: &str,
        email: Email,
        phone: &str,
        address: Option<String>,
        password_hash: String,
    ) -> Self {
        Self {
            meta: EntityMetadata::fresh(Self::PARTITION),
            customer_id: business_id(name, phone),
            name: name.trim().to_owned(),
            email,
            phone: phone.trim().to_owned(),
            address,
            password_hash,
            is_admin: false,
            last_login: None,
            session_token: None,
        }
    }

    /// Validate the editable profile fields.
    ///
    /// # Errors
    ///
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)?;
        validate_phone(&self.phone)
    }
}

/// Customer business ID: first three letters of the name upper-cased followed
/// by the last three characters of the phone number.
#[must_use]
pub fn business_id(name: &str, phone: &str) -> String {
    let prefix: String = name.trim().chars().take(3).collect::<String>().to_uppercase();
    let phone = phone.trim();
    let skip = phone.chars().count().saturating_sub(3);
    let suffix: String = phone.chars().skip(skip).collect();
    format!("{prefix}{suffix}")
}

/// Names need at least three characters.
///
/// # Errors
///
/// Returns a `ValidationError` on `name`.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    min_chars("name", name, 3)
}

/// Phone numbers are exactly ten digits.
///
/// # Errors
///
/// Returns a `ValidationError` on `phone`.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let phone = phone.trim();
    if phone.len() != 10 || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new("phone", "must be exactly 10 digits"));
    }
    Ok(())
}

// Credentials are redacted.
impl fmt::Debug for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Customer")
            .field("meta", &self.meta)
            .field("customer_id", &self.customer_id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("address", &self.address)
            .field("password_hash", &"[REDACTED]")
            .field("is_admin", &self.is_admin)
            .field("last_login", &self.last_login)
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}
