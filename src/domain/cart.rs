use bigdecimal::BigDecimal;
use uuid::Uuid;

/// A stored cart line. Unique per (cart, product); quantity is always ≥ 1
/// since a zero-quantity update deletes the line instead.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Cart contents joined with live catalog data. Prices here are current
/// catalog prices; carts never freeze price.
#[derive(Debug, Clone)]
pub struct CartDetail {
    pub cart_id: Uuid,
    pub user_id: Uuid,
    pub lines: Vec<CartLineDetail>,
    pub summary: CartSummary,
}

#[derive(Debug, Clone)]
pub struct CartLineDetail {
    pub line_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub line_subtotal: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct CartSummary {
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal: BigDecimal,
}
