use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bigdecimal::BigDecimal;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::cart::CartLine;
use crate::domain::catalog::{Address, Product};
use crate::domain::errors::DomainError;
use crate::domain::order::{NewOrder, Order, OrderLine, OrderPage, OrderStatus, PaymentStatus};
use crate::domain::ports::{
    AddressBook, CartStore, CatalogRead, EventOutbox, InventoryLedger, OrderStore, UnitOfWork,
};

#[derive(Debug, Clone)]
pub struct StoredEvent {
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub payload: Value,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: HashMap<Uuid, Product>,
    carts: HashMap<Uuid, Uuid>,
    cart_lines: Vec<CartLine>,
    addresses: Vec<Address>,
    orders: HashMap<Uuid, Order>,
    events: Vec<StoredEvent>,
}

/// In-memory store with the same transactional contract as the Postgres
/// adapter: `run` works on a snapshot of the state and commits it back
/// only on success, so a failing closure rolls back completely. The mutex
/// linearizes transactions, which makes reserve/release atomic exactly as
/// the ledger contract requires. Backs unit tests and sandbox runs.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn seed_product(&self, name: &str, unit_price: BigDecimal, stock: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.locked().products.insert(
            id,
            Product {
                id,
                name: name.to_string(),
                unit_price,
                stock,
                active: true,
            },
        );
        id
    }

    pub fn seed_address(&self, user_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.locked().addresses.push(Address {
            id,
            user_id,
            recipient: "Jamie Doe".to_string(),
            line1: "1 Harbour Street".to_string(),
            line2: None,
            city: "Portsmouth".to_string(),
            postal_code: "PO1 2AB".to_string(),
            country: "GB".to_string(),
        });
        id
    }

    pub fn set_price(&self, product_id: Uuid, unit_price: BigDecimal) {
        if let Some(product) = self.locked().products.get_mut(&product_id) {
            product.unit_price = unit_price;
        }
    }

    pub fn set_stock(&self, product_id: Uuid, stock: i32) {
        if let Some(product) = self.locked().products.get_mut(&product_id) {
            product.stock = stock;
        }
    }

    pub fn set_active(&self, product_id: Uuid, active: bool) {
        if let Some(product) = self.locked().products.get_mut(&product_id) {
            product.active = active;
        }
    }

    pub fn stock_of(&self, product_id: Uuid) -> Option<i32> {
        self.locked().products.get(&product_id).map(|p| p.stock)
    }

    pub fn order_by_id(&self, order_id: Uuid) -> Option<Order> {
        self.locked().orders.get(&order_id).cloned()
    }

    pub fn order_count(&self) -> usize {
        self.locked().orders.len()
    }

    pub fn events(&self) -> Vec<StoredEvent> {
        self.locked().events.clone()
    }
}

pub struct MemoryTx {
    state: MemoryState,
}

impl UnitOfWork for MemoryStore {
    type Tx = MemoryTx;

    fn run<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut Self::Tx) -> Result<T, DomainError>,
    {
        let mut guard = self.locked();
        let mut tx = MemoryTx {
            state: guard.clone(),
        };
        let value = f(&mut tx)?;
        *guard = tx.state;
        Ok(value)
    }
}

impl CatalogRead for MemoryTx {
    fn product(&mut self, product_id: Uuid) -> Result<Option<Product>, DomainError> {
        Ok(self.state.products.get(&product_id).cloned())
    }
}

impl InventoryLedger for MemoryTx {
    fn reserve(&mut self, product_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        let product = self
            .state
            .products
            .get_mut(&product_id)
            .ok_or(DomainError::NotFound("product"))?;
        if product.stock < quantity {
            return Err(DomainError::InsufficientStock {
                product_id,
                available: product.stock,
            });
        }
        product.stock -= quantity;
        Ok(())
    }

    fn release(&mut self, product_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        let product = self
            .state
            .products
            .get_mut(&product_id)
            .ok_or(DomainError::NotFound("product"))?;
        product.stock += quantity;
        Ok(())
    }
}

impl CartStore for MemoryTx {
    fn cart_id(&mut self, user_id: Uuid) -> Result<Option<Uuid>, DomainError> {
        Ok(self.state.carts.get(&user_id).copied())
    }

    fn create_cart(&mut self, user_id: Uuid) -> Result<Uuid, DomainError> {
        let id = Uuid::new_v4();
        self.state.carts.insert(user_id, id);
        Ok(id)
    }

    fn lines(&mut self, cart_id: Uuid) -> Result<Vec<CartLine>, DomainError> {
        Ok(self
            .state
            .cart_lines
            .iter()
            .filter(|line| line.cart_id == cart_id)
            .cloned()
            .collect())
    }

    fn line_for_product(
        &mut self,
        cart_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<CartLine>, DomainError> {
        Ok(self
            .state
            .cart_lines
            .iter()
            .find(|line| line.cart_id == cart_id && line.product_id == product_id)
            .cloned())
    }

    fn line_owned_by(
        &mut self,
        line_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<CartLine>, DomainError> {
        let owned_cart = self.state.carts.get(&user_id).copied();
        Ok(self
            .state
            .cart_lines
            .iter()
            .find(|line| line.id == line_id && Some(line.cart_id) == owned_cart)
            .cloned())
    }

    fn insert_line(
        &mut self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartLine, DomainError> {
        let line = CartLine {
            id: Uuid::new_v4(),
            cart_id,
            product_id,
            quantity,
        };
        self.state.cart_lines.push(line.clone());
        Ok(line)
    }

    fn set_line_quantity(&mut self, line_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        let line = self
            .state
            .cart_lines
            .iter_mut()
            .find(|line| line.id == line_id)
            .ok_or(DomainError::NotFound("cart line"))?;
        line.quantity = quantity;
        Ok(())
    }

    fn delete_line(&mut self, line_id: Uuid) -> Result<(), DomainError> {
        self.state.cart_lines.retain(|line| line.id != line_id);
        Ok(())
    }

    fn clear(&mut self, cart_id: Uuid) -> Result<(), DomainError> {
        self.state.cart_lines.retain(|line| line.cart_id != cart_id);
        Ok(())
    }
}

impl AddressBook for MemoryTx {
    fn address_owned_by(
        &mut self,
        address_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Address>, DomainError> {
        Ok(self
            .state
            .addresses
            .iter()
            .find(|address| address.id == address_id && address.user_id == user_id)
            .cloned())
    }
}

impl OrderStore for MemoryTx {
    fn insert(&mut self, order: NewOrder) -> Result<(), DomainError> {
        if self
            .state
            .orders
            .values()
            .any(|existing| existing.order_number == order.order_number)
        {
            return Err(DomainError::Conflict(format!(
                "order number {} already exists",
                order.order_number
            )));
        }

        let lines = order
            .lines
            .into_iter()
            .map(|line| OrderLine {
                id: Uuid::new_v4(),
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                line_subtotal: line.line_subtotal,
            })
            .collect();

        self.state.orders.insert(
            order.id,
            Order {
                id: order.id,
                order_number: order.order_number,
                user_id: order.user_id,
                shipping_address: order.shipping_address,
                status: OrderStatus::Pending,
                payment_status: PaymentStatus::Unpaid,
                payment_method: order.payment_method,
                notes: order.notes,
                subtotal: order.pricing.subtotal,
                tax: order.pricing.tax,
                shipping: order.pricing.shipping,
                total: order.pricing.total,
                lines,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    fn order(&mut self, order_id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.state.orders.get(&order_id).cloned())
    }

    fn orders_for_user(
        &mut self,
        user_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<OrderPage, DomainError> {
        let mut items: Vec<Order> = self
            .state
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = items.len() as i64;
        let offset = ((page - 1) * limit) as usize;
        let items = items
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .collect();
        Ok(OrderPage { items, total })
    }

    fn set_status(&mut self, order_id: Uuid, status: OrderStatus) -> Result<(), DomainError> {
        let order = self
            .state
            .orders
            .get_mut(&order_id)
            .ok_or(DomainError::NotFound("order"))?;
        order.status = status;
        Ok(())
    }

    fn set_payment_status(
        &mut self,
        order_id: Uuid,
        status: PaymentStatus,
    ) -> Result<(), DomainError> {
        let order = self
            .state
            .orders
            .get_mut(&order_id)
            .ok_or(DomainError::NotFound("order"))?;
        order.payment_status = status;
        Ok(())
    }
}

impl EventOutbox for MemoryTx {
    fn enqueue(
        &mut self,
        aggregate_id: Uuid,
        event_type: &str,
        payload: Value,
    ) -> Result<(), DomainError> {
        self.state.events.push(StoredEvent {
            aggregate_id,
            event_type: event_type.to_string(),
            payload,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;

    use super::MemoryStore;
    use crate::domain::errors::DomainError;
    use crate::domain::ports::{InventoryLedger, UnitOfWork};

    fn dec(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).expect("valid decimal")
    }

    #[test]
    fn failing_transaction_rolls_back_earlier_writes() {
        let store = MemoryStore::new();
        let product_id = store.seed_product("Lamp", dec("20.00"), 5);

        let result: Result<(), DomainError> = store.run(|tx| {
            tx.reserve(product_id, 4)?;
            Err(DomainError::Validation("boom".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(store.stock_of(product_id), Some(5), "reserve rolled back");
    }

    #[test]
    fn committed_transaction_is_visible_to_the_next_one() {
        let store = MemoryStore::new();
        let product_id = store.seed_product("Lamp", dec("20.00"), 5);

        store
            .run(|tx| tx.reserve(product_id, 2))
            .expect("reserve failed");
        assert_eq!(store.stock_of(product_id), Some(3));

        let err = store.run(|tx| tx.reserve(product_id, 4)).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientStock { available: 3, .. }
        ));
    }
}
