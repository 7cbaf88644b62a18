use bigdecimal::BigDecimal;
use serde_json::Value;
use uuid::Uuid;

use super::cart::CartLine;
use super::catalog::{Address, Product};
use super::errors::DomainError;
use super::order::{NewOrder, Order, OrderPage, OrderStatus, PaymentStatus};

/// One atomic transaction. Every read sees the transaction's isolation
/// level and every mutation performed inside the closure commits or rolls
/// back together; an `Err` return always rolls back.
pub trait UnitOfWork: Send + Sync + 'static {
    type Tx;

    fn run<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut Self::Tx) -> Result<T, DomainError>;
}

pub trait CatalogRead {
    fn product(&mut self, product_id: Uuid) -> Result<Option<Product>, DomainError>;
}

/// The only writer of product stock. Both operations are atomic with
/// respect to concurrent callers on the same product: two reservations of
/// the last unit can never both succeed.
pub trait InventoryLedger {
    /// Decrement stock by `quantity` iff current stock covers it, leaving
    /// stock untouched on failure.
    fn reserve(&mut self, product_id: Uuid, quantity: i32) -> Result<(), DomainError>;

    /// Increment stock by `quantity`, reversing a prior reservation. No
    /// upper bound applies.
    fn release(&mut self, product_id: Uuid, quantity: i32) -> Result<(), DomainError>;
}

pub trait CartStore {
    fn cart_id(&mut self, user_id: Uuid) -> Result<Option<Uuid>, DomainError>;
    fn create_cart(&mut self, user_id: Uuid) -> Result<Uuid, DomainError>;
    fn lines(&mut self, cart_id: Uuid) -> Result<Vec<CartLine>, DomainError>;
    fn line_for_product(
        &mut self,
        cart_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<CartLine>, DomainError>;
    /// Fetch a line only if it sits in `user_id`'s cart, so a miss and a
    /// foreign line are indistinguishable to the caller.
    fn line_owned_by(
        &mut self,
        line_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<CartLine>, DomainError>;
    fn insert_line(
        &mut self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartLine, DomainError>;
    fn set_line_quantity(&mut self, line_id: Uuid, quantity: i32) -> Result<(), DomainError>;
    fn delete_line(&mut self, line_id: Uuid) -> Result<(), DomainError>;
    fn clear(&mut self, cart_id: Uuid) -> Result<(), DomainError>;
}

pub trait AddressBook {
    fn address_owned_by(
        &mut self,
        address_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Address>, DomainError>;
}

pub trait OrderStore {
    /// Insert the order and its lines; a duplicate order number surfaces
    /// as `Conflict`.
    fn insert(&mut self, order: NewOrder) -> Result<(), DomainError>;
    fn order(&mut self, order_id: Uuid) -> Result<Option<Order>, DomainError>;
    fn orders_for_user(
        &mut self,
        user_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<OrderPage, DomainError>;
    fn set_status(&mut self, order_id: Uuid, status: OrderStatus) -> Result<(), DomainError>;
    fn set_payment_status(
        &mut self,
        order_id: Uuid,
        status: PaymentStatus,
    ) -> Result<(), DomainError>;
}

/// Same-transaction event record for downstream consumers (relay, CDC).
pub trait EventOutbox {
    fn enqueue(
        &mut self,
        aggregate_id: Uuid,
        event_type: &str,
        payload: Value,
    ) -> Result<(), DomainError>;
}

/// Everything a storefront transaction can touch.
pub trait StorefrontTx:
    CatalogRead + InventoryLedger + CartStore + AddressBook + OrderStore + EventOutbox
{
}

impl<T> StorefrontTx for T where
    T: CatalogRead + InventoryLedger + CartStore + AddressBook + OrderStore + EventOutbox
{
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeOutcome {
    Approved,
    Declined,
}

/// External payment collaborator. The core never processes payments
/// itself; sandbox and test doubles fix the outcome up front instead of
/// sampling it.
pub trait PaymentGateway: Send + Sync + 'static {
    fn charge(
        &self,
        order_number: &str,
        amount: &BigDecimal,
    ) -> Result<ChargeOutcome, DomainError>;
}
