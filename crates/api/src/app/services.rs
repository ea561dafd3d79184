use std::sync::Arc;

use storefront_infra::{
    AppConfig, InMemoryStore, LoggingNotifier, OrderWorkflow, PostgresStore, ReceiptNotifier, ReservationEngine,
    RetryPolicy, Store, StoreError, WorkflowResult, with_retry,
};

/// Services shared by every handler.
pub struct AppServices {
    pub engine: ReservationEngine,
    pub workflow: OrderWorkflow,
    pub retry: RetryPolicy,
}

impl AppServices {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn ReceiptNotifier>) -> Self {
        Self {
            engine: ReservationEngine::new(Arc::clone(&store)),
            workflow: OrderWorkflow::new(store, notifier),
            retry: RetryPolicy::default(),
        }
    }

    /// Run a mutating operation, retrying lock timeouts per the retry policy.
    pub async fn retrying<T, F, Fut>(&self, op: F) -> WorkflowResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = WorkflowResult<T>>,
    {
        with_retry(&self.retry, op).await
    }
}

/// Pick the store from configuration.
///
/// With `USE_PERSISTENT_STORES=true` the Postgres store is used and its schema
/// is created if missing; otherwise everything lives in memory.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, StoreError> {
    let store: Arc<dyn Store> = if config.use_persistent_stores {
        let url = config
            .database_url
            .as_deref()
            .ok_or_else(|| StoreError::Database("DATABASE_URL is not set".to_string()))?;
        let store = PostgresStore::connect(url, config.db_max_connections, config.lock_timeout).await?;
        store.ensure_schema().await?;
        tracing::info!(max_connections = config.db_max_connections, "using postgres store");
        Arc::new(store)
    } else {
        tracing::info!("using in-memory store");
        Arc::new(InMemoryStore::with_lock_timeout(config.lock_timeout))
    };

    Ok(AppServices::new(store, Arc::new(LoggingNotifier)))
}
