//! Customer account management.

use futures::StreamExt;

use abc_retail_core::{Customer, Email, Filter};
use abc_retail_storefront::db::{EntityStore, expected_version};

use super::{CommandError, connect};

/// Grant the administrator role to the customer registered under `email`.
///
/// # Errors
///
/// Returns `CommandError` if the email is malformed, no customer has it, or
/// the update loses a race with another writer.
pub async fn promote_by_email(email: &str) -> Result<(), CommandError> {
    let email = Email::parse(email).map_err(|e| CommandError::InvalidEmail(e.to_string()))?;
    let (backends, _pool) = connect().await?;
    let customer = promote(backends.customers.as_ref(), &email).await?;
    tracing::info!(
        "Customer promoted to administrator: {} ({})",
        customer.email,
        customer.customer_id
    );
    Ok(())
}

/// Read-modify-write of `is_admin` under the version that was read.
///
/// A concurrent write surfaces as a `Conflict`; it is not retried.
pub async fn promote(
    customers: &dyn EntityStore<Customer>,
    email: &Email,
) -> Result<Customer, CommandError> {
    let filter = Filter::eq("partition_key", Customer::PARTITION)
        .and(Filter::eq("email", email.as_str()));
    let mut matches = customers.query(filter).await?;
    let mut customer = matches
        .next()
        .await
        .transpose()?
        .ok_or_else(|| CommandError::CustomerNotFound(email.to_string()))?;

    if customer.is_admin {
        tracing::info!("Customer is already an administrator");
        return Ok(customer);
    }

    let expected = expected_version(&customer)?;
    customer.is_admin = true;
    Ok(customers.update(customer, &expected).await?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use abc_retail_storefront::db::MemoryEntityStore;
    use abc_retail_storefront::services::auth::hash_password;

    use super::*;

    fn customer(email: &str) -> Customer {
        Customer::new(
            "Thandi Mokoena",
            Email::parse(email).unwrap(),
            "0821234567",
            None,
            hash_password("sneakers4life"),
        )
    }

    #[tokio::test]
    async fn test_promote_sets_admin_flag() {
        let store = MemoryEntityStore::<Customer>::new();
        store.add(customer("thandi@example.com")).await.unwrap();
        store.add(customer("other@example.com")).await.unwrap();

        let email = Email::parse("thandi@example.com").unwrap();
        let promoted = promote(&store, &email).await.unwrap();
        assert!(promoted.is_admin);

        // Idempotent.
        let again = promote(&store, &email).await.unwrap();
        assert_eq!(again.meta.version, promoted.meta.version);
    }

    #[tokio::test]
    async fn test_promote_unknown_email() {
        let store = MemoryEntityStore::<Customer>::new();
        let email = Email::parse("nobody@example.com").unwrap();
        assert!(matches!(
            promote(&store, &email).await,
            Err(CommandError::CustomerNotFound(_))
        ));
    }
}
