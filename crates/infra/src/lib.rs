//! Infrastructure layer: transactional stores, the reservation engine, the
//! order workflow, notifications and configuration.

pub mod config;
pub mod engine;
pub mod error;
pub mod notify;
pub mod retry;
pub mod store;
pub mod workflow;


pub use config::{AppConfig, ConfigError};
pub use engine::ReservationEngine;
pub use error::{StoreError, WorkflowError, WorkflowResult};
pub use notify::{LoggingNotifier, NotifyError, ReceiptNotifier, RecordingNotifier};
pub use retry::{BackoffStrategy, RetryPolicy, with_retry};
pub use store::{InMemoryStore, OrderFilter, PostgresStore, Store, StoreTx};
pub use workflow::OrderWorkflow;
