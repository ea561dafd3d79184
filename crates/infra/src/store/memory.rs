use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use storefront_core::{OrderId, ProductId};
use storefront_inventory::{PendingMovement, Product, StockMovement};
use storefront_sales::OrderSnapshot;

use super::{OrderFilter, Store, StoreTx};
use crate::error::StoreError;

type LockMap<K> = Mutex<HashMap<K, Arc<AsyncMutex<()>>>>;

#[derive(Debug, Default)]
struct Committed {
    products: HashMap<ProductId, Product>,
    movements: Vec<StockMovement>,
    orders: HashMap<OrderId, OrderSnapshot>,
    day_counters: HashMap<NaiveDate, u64>,
}

#[derive(Debug)]
struct Inner {
    committed: RwLock<Committed>,
    product_locks: LockMap<ProductId>,
    order_locks: LockMap<OrderId>,
    next_sequence: AtomicU64,
    lock_timeout: Duration,
}

/// In-memory transactional store.
///
/// Intended for tests/dev. Each product and order has its own async mutex; a
/// transaction keeps the owned guard until it commits or is dropped. Writes are
/// buffered in the transaction and applied in one step on commit.
///
/// Ledger sequence numbers and per-day order counters are taken eagerly, so a
/// rolled-back transaction may leave a gap.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(Duration::from_secs(5))
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                committed: RwLock::new(Committed::default()),
                product_locks: Mutex::new(HashMap::new()),
                order_locks: Mutex::new(HashMap::new()),
                next_sequence: AtomicU64::new(1),
                lock_timeout,
            }),
        }
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        Ok(Box::new(InMemoryTx {
            inner: Arc::clone(&self.inner),
            product_guards: HashMap::new(),
            order_guards: HashMap::new(),
            products: HashMap::new(),
            movements: Vec::new(),
            orders: HashMap::new(),
        }))
    }
}

fn poisoned() -> StoreError {
    StoreError::Database("lock poisoned".to_string())
}

fn lock_handle<K>(map: &LockMap<K>, key: K) -> Result<Arc<AsyncMutex<()>>, StoreError>
where
    K: std::hash::Hash + Eq,
{
    let mut locks = map.lock().map_err(|_| poisoned())?;
    Ok(Arc::clone(locks.entry(key).or_default()))
}

async fn acquire(
    handle: Arc<AsyncMutex<()>>,
    timeout: Duration,
    what: String,
) -> Result<OwnedMutexGuard<()>, StoreError> {
    tokio::time::timeout(timeout, handle.lock_owned())
        .await
        .map_err(|_| StoreError::LockTimeout(format!("{what} after {}ms", timeout.as_millis())))
}

/// Transaction over an [`InMemoryStore`].
pub struct InMemoryTx {
    inner: Arc<Inner>,
    product_guards: HashMap<ProductId, OwnedMutexGuard<()>>,
    order_guards: HashMap<OrderId, OwnedMutexGuard<()>>,
    products: HashMap<ProductId, Product>,
    movements: Vec<StockMovement>,
    orders: HashMap<OrderId, OrderSnapshot>,
}

impl InMemoryTx {
    fn product_view(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        if let Some(p) = self.products.get(&id) {
            return Ok(Some(p.clone()));
        }
        let committed = self.inner.committed.read().map_err(|_| poisoned())?;
        Ok(committed.products.get(&id).cloned())
    }

    fn order_view(&self, id: OrderId) -> Result<Option<OrderSnapshot>, StoreError> {
        if let Some(o) = self.orders.get(&id) {
            return Ok(Some(o.clone()));
        }
        let committed = self.inner.committed.read().map_err(|_| poisoned())?;
        Ok(committed.orders.get(&id).cloned())
    }

    fn is_new_product(&self, id: ProductId) -> Result<bool, StoreError> {
        let committed = self.inner.committed.read().map_err(|_| poisoned())?;
        Ok(self.products.contains_key(&id) && !committed.products.contains_key(&id))
    }

    fn is_new_order(&self, id: OrderId) -> Result<bool, StoreError> {
        let committed = self.inner.committed.read().map_err(|_| poisoned())?;
        Ok(self.orders.contains_key(&id) && !committed.orders.contains_key(&id))
    }

    fn movements_where<F>(&self, pred: F) -> Result<Vec<StockMovement>, StoreError>
    where
        F: Fn(&StockMovement) -> bool,
    {
        let committed = self.inner.committed.read().map_err(|_| poisoned())?;
        let mut out: Vec<StockMovement> = committed
            .movements
            .iter()
            .chain(self.movements.iter())
            .filter(|m| pred(m))
            .cloned()
            .collect();
        out.sort_by_key(|m| m.sequence);
        Ok(out)
    }

    fn sku_taken(committed: &Committed, pending: &HashMap<ProductId, Product>, product: &Product) -> bool {
        committed
            .products
            .values()
            .chain(pending.values())
            .any(|p| p.id != product.id && p.sku == product.sku)
    }
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn insert_product(&mut self, product: &Product) -> Result<(), StoreError> {
        {
            let committed = self.inner.committed.read().map_err(|_| poisoned())?;
            if committed.products.contains_key(&product.id) || self.products.contains_key(&product.id) {
                return Err(StoreError::Conflict(format!("product {} already exists", product.id)));
            }
            if Self::sku_taken(&committed, &self.products, product) {
                return Err(StoreError::Conflict(format!("sku {} already exists", product.sku)));
            }
        }
        self.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.product_view(id)
    }

    async fn lock_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        if self.product_guards.contains_key(&id) || self.is_new_product(id)? {
            return self.product_view(id);
        }

        let handle = lock_handle(&self.inner.product_locks, id)?;
        let guard = acquire(handle, self.inner.lock_timeout, format!("product {id}")).await?;
        self.product_guards.insert(id, guard);
        self.product_view(id)
    }

    async fn update_product_stock(&mut self, id: ProductId, stock: i64) -> Result<(), StoreError> {
        let mut product = self
            .product_view(id)?
            .ok_or_else(|| StoreError::NotFound(format!("product {id}")))?;
        product.stock = stock;
        self.products.insert(id, product);
        Ok(())
    }

    async fn list_products(&mut self) -> Result<Vec<Product>, StoreError> {
        let mut all: HashMap<ProductId, Product> = {
            let committed = self.inner.committed.read().map_err(|_| poisoned())?;
            committed.products.clone()
        };
        all.extend(self.products.iter().map(|(id, p)| (*id, p.clone())));

        let mut out: Vec<Product> = all.into_values().collect();
        out.sort_by(|a, b| a.sku.cmp(&b.sku));
        Ok(out)
    }

    async fn append_movement(&mut self, movement: PendingMovement) -> Result<StockMovement, StoreError> {
        let sequence = self.inner.next_sequence.fetch_add(1, Ordering::SeqCst);
        let stored = movement.commit(sequence);
        self.movements.push(stored.clone());
        Ok(stored)
    }

    async fn movements_for_product(&mut self, id: ProductId) -> Result<Vec<StockMovement>, StoreError> {
        self.movements_where(|m| m.product_id == id)
    }

    async fn movements_for_order(&mut self, id: OrderId) -> Result<Vec<StockMovement>, StoreError> {
        self.movements_where(|m| m.order_id == Some(id))
    }

    async fn next_order_sequence(&mut self, day: NaiveDate) -> Result<u64, StoreError> {
        let mut committed = self.inner.committed.write().map_err(|_| poisoned())?;
        let counter = committed.day_counters.entry(day).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn insert_order(&mut self, order: &OrderSnapshot) -> Result<(), StoreError> {
        {
            let committed = self.inner.committed.read().map_err(|_| poisoned())?;
            let number_taken = committed
                .orders
                .values()
                .chain(self.orders.values())
                .any(|o| o.order_number == order.order_number);
            if committed.orders.contains_key(&order.id) || self.orders.contains_key(&order.id) || number_taken {
                return Err(StoreError::Conflict(format!(
                    "order {} already exists",
                    order.order_number
                )));
            }
        }
        self.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get_order(&mut self, id: OrderId) -> Result<Option<OrderSnapshot>, StoreError> {
        self.order_view(id)
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<OrderSnapshot>, StoreError> {
        if self.order_guards.contains_key(&id) || self.is_new_order(id)? {
            return self.order_view(id);
        }

        let handle = lock_handle(&self.inner.order_locks, id)?;
        let guard = acquire(handle, self.inner.lock_timeout, format!("order {id}")).await?;
        self.order_guards.insert(id, guard);
        self.order_view(id)
    }

    async fn update_order(&mut self, order: &OrderSnapshot) -> Result<(), StoreError> {
        if self.order_view(order.id)?.is_none() {
            return Err(StoreError::NotFound(format!("order {}", order.id)));
        }
        self.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn list_orders(&mut self, filter: &OrderFilter) -> Result<Vec<OrderSnapshot>, StoreError> {
        let mut all: HashMap<OrderId, OrderSnapshot> = {
            let committed = self.inner.committed.read().map_err(|_| poisoned())?;
            committed.orders.clone()
        };
        all.extend(self.orders.iter().map(|(id, o)| (*id, o.clone())));

        let mut out: Vec<OrderSnapshot> = all.into_values().filter(|o| filter.matches(o)).collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.order_number.as_str().cmp(a.order_number.as_str())));
        Ok(out)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let tx = *self;
        {
            let mut committed = tx.inner.committed.write().map_err(|_| poisoned())?;

            let no_pending = HashMap::new();
            for product in tx.products.values() {
                if Self::sku_taken(&committed, &no_pending, product) {
                    return Err(StoreError::Conflict(format!("sku {} already exists", product.sku)));
                }
            }

            committed.products.extend(tx.products);
            committed.movements.extend(tx.movements);
            committed.orders.extend(tx.orders);
        }
        // Locks are released here, after the writes are visible.
        drop(tx.product_guards);
        drop(tx.order_guards);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
