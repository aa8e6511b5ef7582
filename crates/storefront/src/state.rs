//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::backends::Backends;
use crate::config::StorefrontConfig;
use crate::services::admin::AdminService;
use crate::services::auth::AuthService;
use crate::services::orders::OrderWorkflow;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// storage backends, configuration and the services built on them.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backends: Backends,
    pool: Option<PgPool>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// `pool` is only used by the readiness check; backends that do not run
    /// on `PostgreSQL` pass `None`.
    #[must_use]
    pub fn new(config: StorefrontConfig, backends: Backends, pool: Option<PgPool>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                backends,
                pool,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the storage backends.
    #[must_use]
    pub fn backends(&self) -> &Backends {
        &self.inner.backends
    }

    /// Get a reference to the database connection pool, if any.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(&self.inner.backends)
    }

    #[must_use]
    pub fn orders(&self) -> OrderWorkflow<'_> {
        OrderWorkflow::new(&self.inner.backends)
    }

    #[must_use]
    pub fn admin(&self) -> AdminService<'_> {
        AdminService::new(&self.inner.backends)
    }
}
