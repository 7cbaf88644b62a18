use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog product as the checkout core sees it. Stock is written only
/// through the inventory ledger port.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub unit_price: BigDecimal,
    pub stock: i32,
    pub active: bool,
}

/// Shipping address from the address book collaborator. Serializable so an
/// order can freeze it as a snapshot at checkout time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub recipient: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}
