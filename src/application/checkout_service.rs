use chrono::Utc;
use rand::Rng;
use serde_json::json;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{NewOrder, NewOrderLine, Order};
use crate::domain::ports::{
    AddressBook, CartStore, CatalogRead, EventOutbox, InventoryLedger, OrderStore, StorefrontTx,
    UnitOfWork,
};
use crate::domain::pricing::{self, PricedLine};

/// Converts a cart into an order inside one transaction: stock is
/// re-validated and reserved, pricing is computed at current catalog
/// prices, the order and its frozen lines are written, and the cart is
/// cleared. Any failure rolls the whole thing back.
#[derive(Clone)]
pub struct CheckoutService<U> {
    store: U,
}

impl<U> CheckoutService<U>
where
    U: UnitOfWork,
    U::Tx: StorefrontTx,
{
    pub fn new(store: U) -> Self {
        Self { store }
    }

    pub fn checkout(
        &self,
        user_id: Uuid,
        address_id: Uuid,
        payment_method: &str,
        notes: Option<&str>,
    ) -> Result<Order, DomainError> {
        if payment_method.trim().is_empty() {
            return Err(DomainError::Validation(
                "payment method is required".to_string(),
            ));
        }
        let order_number = new_order_number();

        self.store.run(|tx| {
            let cart_id = tx.cart_id(user_id)?.ok_or(DomainError::EmptyCart)?;
            let cart_lines = tx.lines(cart_id)?;
            if cart_lines.is_empty() {
                return Err(DomainError::EmptyCart);
            }

            let address = tx
                .address_owned_by(address_id, user_id)?
                .ok_or(DomainError::NotFound("address"))?;

            // Stock re-check under this transaction; the reserve calls
            // below are what actually exclude a concurrent checkout.
            let mut priced = Vec::with_capacity(cart_lines.len());
            for line in &cart_lines {
                let product = tx
                    .product(line.product_id)?
                    .ok_or(DomainError::NotFound("product"))?;
                if !product.active {
                    return Err(DomainError::Validation(format!(
                        "product {} is no longer available for sale",
                        line.product_id
                    )));
                }
                if product.stock < line.quantity {
                    return Err(DomainError::InsufficientStock {
                        product_id: line.product_id,
                        available: product.stock,
                    });
                }
                priced.push(PricedLine {
                    unit_price: product.unit_price,
                    quantity: line.quantity,
                });
            }

            let breakdown = pricing::price(&priced);
            let order_id = Uuid::new_v4();
            let order_lines = cart_lines
                .iter()
                .zip(&priced)
                .map(|(line, priced)| NewOrderLine {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit_price: priced.unit_price.clone(),
                    line_subtotal: pricing::line_subtotal(&priced.unit_price, line.quantity),
                })
                .collect();

            tx.insert(NewOrder {
                id: order_id,
                order_number: order_number.clone(),
                user_id,
                shipping_address: address,
                payment_method: payment_method.to_string(),
                notes: notes.map(str::to_string),
                pricing: breakdown.clone(),
                lines: order_lines,
            })?;

            for line in &cart_lines {
                tx.reserve(line.product_id, line.quantity)?;
            }

            tx.clear(cart_id)?;

            tx.enqueue(
                order_id,
                "OrderPlaced",
                json!({
                    "order_id": order_id,
                    "order_number": &order_number,
                    "user_id": user_id,
                    "total": breakdown.total.to_string(),
                }),
            )?;

            log::info!("order {order_number} placed for user {user_id}");
            tx.order(order_id)?
                .ok_or_else(|| DomainError::Unavailable("order missing after insert".to_string()))
        })
    }
}

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize] as char);
        value /= 36;
    }
    digits.iter().rev().collect()
}

/// `ORD-<base36 millis>-<4 base36 chars>`. Uniqueness is enforced by the
/// order-number constraint in the store; the rare collision surfaces as a
/// retryable `Conflict`, never a silent overwrite.
pub(crate) fn new_order_number() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let mut rng = rand::rng();
    let suffix: String = (0..4)
        .map(|_| BASE36[rng.random_range(0..36)] as char)
        .collect();
    format!("ORD-{}-{}", base36(millis), suffix)
}
