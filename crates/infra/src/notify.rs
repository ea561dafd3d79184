//! Receipt notifications sent after an order is completed.

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use storefront_sales::OrderSnapshot;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("receipt delivery failed: {0}")]
    Delivery(String),
}

/// Sends the customer a receipt for a completed order.
///
/// Called only after the completing transaction has committed. Failures never
/// affect the order.
#[async_trait]
pub trait ReceiptNotifier: Send + Sync {
    async fn send_receipt(&self, order: &OrderSnapshot) -> Result<(), NotifyError>;
}

/// Default notifier: records the receipt in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifier;

#[async_trait]
impl ReceiptNotifier for LoggingNotifier {
    async fn send_receipt(&self, order: &OrderSnapshot) -> Result<(), NotifyError> {
        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            email = %order.customer.email,
            total = order.total,
            "receipt sent"
        );
        Ok(())
    }
}

/// Notifier that keeps every receipt in memory. Can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<OrderSnapshot>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OrderSnapshot> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ReceiptNotifier for RecordingNotifier {
    async fn send_receipt(&self, order: &OrderSnapshot) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Delivery("mail transport unavailable".to_string()));
        }
        self.sent
            .lock()
            .map_err(|_| NotifyError::Delivery("lock poisoned".to_string()))?
            .push(order.clone());
        Ok(())
    }
}
