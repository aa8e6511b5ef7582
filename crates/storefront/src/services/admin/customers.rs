//! Customer account administration.

use serde::Deserialize;
use tracing::instrument;

use abc_retail_core::{Customer, Email, Entity, EntityKey, Filter, VersionToken};

use super::{AdminError, AdminService};
use crate::db::collect;
use crate::models::SessionIdentity;
use crate::services::auth::{AuthError, AuthService, RegisterRequest};
use crate::services::orders::invoice_directory;

/// Profile fields an administrator may change.
///
/// Credentials and the business ID are not editable here.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerUpdate {
    pub name: String,
    pub email: Email,
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub is_admin: Option<bool>,
}

impl CustomerUpdate {
    pub fn apply_to(self, customer: &mut Customer) {
        customer.name = self.name.trim().to_owned();
        customer.email = self.email;
        customer.phone = self.phone.trim().to_owned();
        customer.address = self
            .address
            .map(|a| a.trim().to_owned())
            .filter(|a| !a.is_empty());
        if let Some(is_admin) = self.is_admin {
            customer.is_admin = is_admin;
        }
    }
}

impl AdminService<'_> {
    /// Every customer account, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Auth` for non-administrators and
    /// `AdminError::Store` if the query fails.
    #[instrument(skip(self, session))]
    pub async fn list_customers(
        &self,
        session: Option<&SessionIdentity>,
    ) -> Result<Vec<Customer>, AdminError> {
        self.require_admin(session).await?;
        let filter = Filter::eq("partition_key", Customer::PARTITION);
        let mut customers = collect(self.backends.customers.as_ref(), filter).await?;
        customers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(customers)
    }

    /// # Errors
    ///
    /// Returns `AdminError::Auth` for non-administrators and
    /// `AdminError::Store` with `NotFound` if there is no such customer.
    pub async fn get_customer(
        &self,
        session: Option<&SessionIdentity>,
        key: &EntityKey,
    ) -> Result<Customer, AdminError> {
        self.require_admin(session).await?;
        Ok(self
            .backends
            .customers
            .get(&key.partition_key, &key.row_key)
            .await?)
    }

    /// Open an account on a customer's behalf.
    ///
    /// Validation matches self-registration. The new customer is not signed
    /// in.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Auth` for non-administrators or a taken email,
    /// `AdminError::Validation` for malformed input and `AdminError::Store`
    /// if the account cannot be stored.
    #[instrument(skip(self, session, request), fields(email = %request.email))]
    pub async fn create_customer(
        &self,
        session: Option<&SessionIdentity>,
        request: RegisterRequest,
    ) -> Result<Customer, AdminError> {
        self.require_admin(session).await?;

        let customer = AuthService::new(self.backends).new_account(&request).await?;
        let customer = self.backends.customers.add(customer).await?;
        tracing::info!(row_key = %customer.meta.row_key, "Customer created");
        self.audit("Customers", "Create", format!("Customer {} created.", customer.name))
            .await;
        Ok(customer)
    }

    /// Replace a customer record, provided nobody has written it since
    /// `expected` was read.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Auth` for non-administrators or when the email
    /// belongs to another account, `AdminError::Validation` for malformed
    /// fields and `AdminError::Store` with `NotFound` or `Conflict` from the
    /// conditional write.
    #[instrument(skip(self, session, customer), fields(row_key = %customer.meta.row_key))]
    pub async fn update_customer(
        &self,
        session: Option<&SessionIdentity>,
        customer: Customer,
        expected: &VersionToken,
    ) -> Result<Customer, AdminError> {
        self.require_admin(session).await?;
        customer.validate()?;

        let owner = AuthService::new(self.backends)
            .find_by_email(&customer.email)
            .await?;
        if owner.is_some_and(|owner| owner.key() != customer.key()) {
            return Err(AuthError::AlreadyRegistered.into());
        }

        let customer = self.backends.customers.update(customer, expected).await?;
        self.audit("Customers", "Update", format!("Customer {} updated.", customer.name))
            .await;
        Ok(customer)
    }

    /// Delete a customer and every invoice stored for them.
    ///
    /// The invoice directory goes first; if deleting the record then fails
    /// the invoices are already gone. Orders are kept.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Auth` for non-administrators and
    /// `AdminError::Store` with `NotFound` if there is no such customer or
    /// `StorageFailure` if either deletion fails.
    #[instrument(skip(self, session))]
    pub async fn delete_customer(
        &self,
        session: Option<&SessionIdentity>,
        key: &EntityKey,
    ) -> Result<(), AdminError> {
        self.require_admin(session).await?;

        let customer = self
            .backends
            .customers
            .get(&key.partition_key, &key.row_key)
            .await?;
        let directory = invoice_directory(&customer);
        self.backends.documents.delete_directory(&directory).await?;
        self.backends
            .customers
            .delete(&key.partition_key, &key.row_key)
            .await?;

        tracing::info!(row_key = %key.row_key, directory = %directory, "Customer deleted");
        self.audit("Customers", "Delete", format!("Customer {} deleted.", customer.name))
            .await;
        Ok(())
    }
}
