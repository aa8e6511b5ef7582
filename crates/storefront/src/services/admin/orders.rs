//! Order administration.

use tracing::instrument;

use abc_retail_core::{EntityKey, Filter, Order, OrderLine, VersionToken};

use super::{AdminError, AdminService};
use crate::db::collect;
use crate::models::SessionIdentity;

impl AdminService<'_> {
    /// Every order, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Auth` for non-administrators and
    /// `AdminError::Store` if the query fails.
    #[instrument(skip(self, session))]
    pub async fn list_orders(
        &self,
        session: Option<&SessionIdentity>,
    ) -> Result<Vec<Order>, AdminError> {
        self.require_admin(session).await?;
        let mut orders = collect(self.backends.orders.as_ref(), Filter::All).await?;
        orders.sort_by_key(|order| order.meta.timestamp);
        Ok(orders)
    }

    /// # Errors
    ///
    /// Returns `AdminError::Auth` for non-administrators and
    /// `AdminError::Store` with `NotFound` if there is no such order.
    pub async fn get_order(
        &self,
        session: Option<&SessionIdentity>,
        key: &EntityKey,
    ) -> Result<Order, AdminError> {
        self.require_admin(session).await?;
        Ok(self
            .backends
            .orders
            .get(&key.partition_key, &key.row_key)
            .await?)
    }

    /// Change the size, quantity and colour of an order.
    ///
    /// The stored invoice is not regenerated.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Auth` for non-administrators,
    /// `AdminError::Validation` for a malformed line and `AdminError::Store`
    /// with `NotFound` or `Conflict` from the conditional write.
    #[instrument(skip(self, session, line))]
    pub async fn update_order(
        &self,
        session: Option<&SessionIdentity>,
        key: &EntityKey,
        line: OrderLine,
        expected: &VersionToken,
    ) -> Result<Order, AdminError> {
        self.require_admin(session).await?;
        line.validate()?;

        let mut order = self
            .backends
            .orders
            .get(&key.partition_key, &key.row_key)
            .await?;
        order.apply_line(line);
        let order = self.backends.orders.update(order, expected).await?;
        self.audit("Orders", "Update", format!("Order {} updated.", order.order_id))
            .await;
        Ok(order)
    }

    /// # Errors
    ///
    /// Returns `AdminError::Auth` for non-administrators and
    /// `AdminError::Store` with `NotFound` if there is no such order.
    #[instrument(skip(self, session))]
    pub async fn delete_order(
        &self,
        session: Option<&SessionIdentity>,
        key: &EntityKey,
    ) -> Result<(), AdminError> {
        self.require_admin(session).await?;

        let order = self
            .backends
            .orders
            .get(&key.partition_key, &key.row_key)
            .await?;
        self.backends
            .orders
            .delete(&key.partition_key, &key.row_key)
            .await?;
        self.audit("Orders", "Delete", format!("Order {} deleted.", order.order_id))
            .await;
        Ok(())
    }
}
