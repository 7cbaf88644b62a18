use uuid::Uuid;

use crate::domain::cart::{CartDetail, CartLineDetail, CartSummary};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartStore, CatalogRead, StorefrontTx, UnitOfWork};
use crate::domain::pricing::{self, PricedLine};

/// Cart mutations and the derived cart summary. Stock checks here are a
/// courtesy against live stock; the checkout transaction remains the final
/// authority since stock can change between add-to-cart and checkout.
#[derive(Clone)]
pub struct CartService<U> {
    store: U,
}

impl<U> CartService<U>
where
    U: UnitOfWork,
    U::Tx: StorefrontTx,
{
    pub fn new(store: U) -> Self {
        Self { store }
    }

    pub fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartDetail, DomainError> {
        if quantity < 1 {
            return Err(DomainError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }

        self.store.run(|tx| {
            let product = tx
                .product(product_id)?
                .ok_or(DomainError::NotFound("product"))?;
            if !product.active {
                return Err(DomainError::Validation(format!(
                    "product {product_id} is not available for sale"
                )));
            }

            let cart_id = match tx.cart_id(user_id)? {
                Some(id) => id,
                None => tx.create_cart(user_id)?,
            };

            let existing = tx.line_for_product(cart_id, product_id)?;
            let requested = match &existing {
                Some(line) => line.quantity + quantity,
                None => quantity,
            };
            if product.stock < requested {
                return Err(DomainError::InsufficientStock {
                    product_id,
                    available: product.stock,
                });
            }

            match existing {
                Some(line) => tx.set_line_quantity(line.id, requested)?,
                None => {
                    tx.insert_line(cart_id, product_id, quantity)?;
                }
            }

            Self::detail(tx, cart_id, user_id)
        })
    }

    /// Set a line's quantity; zero deletes the line. A line in another
    /// user's cart reads as absent, never as forbidden.
    pub fn update_item(
        &self,
        user_id: Uuid,
        line_id: Uuid,
        quantity: i32,
    ) -> Result<CartDetail, DomainError> {
        if quantity < 0 {
            return Err(DomainError::Validation(
                "quantity must not be negative".to_string(),
            ));
        }

        self.store.run(|tx| {
            let line = tx
                .line_owned_by(line_id, user_id)?
                .ok_or(DomainError::NotFound("cart line"))?;

            if quantity == 0 {
                tx.delete_line(line.id)?;
            } else {
                let product = tx
                    .product(line.product_id)?
                    .ok_or(DomainError::NotFound("product"))?;
                if product.stock < quantity {
                    return Err(DomainError::InsufficientStock {
                        product_id: line.product_id,
                        available: product.stock,
                    });
                }
                tx.set_line_quantity(line.id, quantity)?;
            }

            Self::detail(tx, line.cart_id, user_id)
        })
    }

    pub fn remove_item(&self, user_id: Uuid, line_id: Uuid) -> Result<CartDetail, DomainError> {
        self.store.run(|tx| {
            let line = tx
                .line_owned_by(line_id, user_id)?
                .ok_or(DomainError::NotFound("cart line"))?;
            tx.delete_line(line.id)?;
            Self::detail(tx, line.cart_id, user_id)
        })
    }

    pub fn clear(&self, user_id: Uuid) -> Result<(), DomainError> {
        self.store.run(|tx| {
            if let Some(cart_id) = tx.cart_id(user_id)? {
                tx.clear(cart_id)?;
            }
            Ok(())
        })
    }

    /// The cart is created lazily on first access.
    pub fn get_cart(&self, user_id: Uuid) -> Result<CartDetail, DomainError> {
        self.store.run(|tx| {
            let cart_id = match tx.cart_id(user_id)? {
                Some(id) => id,
                None => tx.create_cart(user_id)?,
            };
            Self::detail(tx, cart_id, user_id)
        })
    }

    fn detail(tx: &mut U::Tx, cart_id: Uuid, user_id: Uuid) -> Result<CartDetail, DomainError> {
        let lines = tx.lines(cart_id)?;
        let mut details = Vec::with_capacity(lines.len());
        let mut priced = Vec::with_capacity(lines.len());
        let mut total_quantity = 0i64;

        for line in &lines {
            let product = tx
                .product(line.product_id)?
                .ok_or(DomainError::NotFound("product"))?;
            total_quantity += i64::from(line.quantity);
            priced.push(PricedLine {
                unit_price: product.unit_price.clone(),
                quantity: line.quantity,
            });
            details.push(CartLineDetail {
                line_id: line.id,
                product_id: line.product_id,
                product_name: product.name,
                quantity: line.quantity,
                unit_price: product.unit_price.clone(),
                line_subtotal: pricing::line_subtotal(&product.unit_price, line.quantity),
            });
        }

        let subtotal = pricing::price(&priced).subtotal;
        Ok(CartDetail {
            cart_id,
            user_id,
            lines: details,
            summary: CartSummary {
                item_count: lines.len(),
                total_quantity,
                subtotal,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use uuid::Uuid;

    use super::CartService;
    use crate::domain::errors::DomainError;
    use crate::infrastructure::memory::MemoryStore;

    fn dec(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).expect("valid decimal")
    }

    fn service() -> (CartService<MemoryStore>, MemoryStore) {
        let store = MemoryStore::new();
        (CartService::new(store.clone()), store)
    }

    #[test]
    fn add_creates_cart_lazily_and_merges_repeat_adds() {
        let (carts, store) = service();
        let user_id = Uuid::new_v4();
        let product_id = store.seed_product("Keyboard", dec("49.90"), 10);

        let cart = carts.add_item(user_id, product_id, 2).expect("add failed");
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 2);

        let cart = carts.add_item(user_id, product_id, 3).expect("add failed");
        assert_eq!(cart.lines.len(), 1, "same product merges into one line");
        assert_eq!(cart.lines[0].quantity, 5);
        assert_eq!(cart.summary.total_quantity, 5);
        assert_eq!(cart.summary.subtotal, dec("249.50"));
    }

    #[test]
    fn add_rejects_non_positive_quantity() {
        let (carts, store) = service();
        let product_id = store.seed_product("Keyboard", dec("49.90"), 10);

        let err = carts.add_item(Uuid::new_v4(), product_id, 0).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn add_rejects_unknown_and_inactive_products() {
        let (carts, store) = service();
        let user_id = Uuid::new_v4();

        let err = carts.add_item(user_id, Uuid::new_v4(), 1).unwrap_err();
        assert!(matches!(err, DomainError::NotFound("product")));

        let product_id = store.seed_product("Discontinued", dec("5.00"), 3);
        store.set_active(product_id, false);
        let err = carts.add_item(user_id, product_id, 1).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn add_checks_live_stock_including_existing_line() {
        let (carts, store) = service();
        let user_id = Uuid::new_v4();
        let product_id = store.seed_product("Mug", dec("8.00"), 4);

        carts.add_item(user_id, product_id, 3).expect("add failed");
        let err = carts.add_item(user_id, product_id, 2).unwrap_err();
        assert!(
            matches!(err, DomainError::InsufficientStock { available: 4, .. }),
            "merged quantity 5 exceeds stock 4: {err:?}"
        );
    }

    #[test]
    fn update_to_zero_deletes_the_line() {
        let (carts, store) = service();
        let user_id = Uuid::new_v4();
        let product_id = store.seed_product("Mug", dec("8.00"), 4);

        let cart = carts.add_item(user_id, product_id, 2).expect("add failed");
        let line_id = cart.lines[0].line_id;

        let cart = carts.update_item(user_id, line_id, 0).expect("update failed");
        assert!(cart.lines.is_empty());
        assert_eq!(cart.summary.subtotal, dec("0.00"));
    }

    #[test]
    fn foreign_line_reads_as_not_found() {
        let (carts, store) = service();
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let product_id = store.seed_product("Mug", dec("8.00"), 4);

        let cart = carts.add_item(owner, product_id, 2).expect("add failed");
        let line_id = cart.lines[0].line_id;

        let err = carts.update_item(intruder, line_id, 1).unwrap_err();
        assert!(matches!(err, DomainError::NotFound("cart line")));
        let err = carts.remove_item(intruder, line_id).unwrap_err();
        assert!(matches!(err, DomainError::NotFound("cart line")));

        // owner still sees the untouched line
        let cart = carts.get_cart(owner).expect("get failed");
        assert_eq!(cart.lines[0].quantity, 2);
    }

    #[test]
    fn clear_empties_the_cart() {
        let (carts, store) = service();
        let user_id = Uuid::new_v4();
        let first = store.seed_product("Mug", dec("8.00"), 4);
        let second = store.seed_product("Plate", dec("12.00"), 4);

        carts.add_item(user_id, first, 1).expect("add failed");
        carts.add_item(user_id, second, 1).expect("add failed");
        carts.clear(user_id).expect("clear failed");

        let cart = carts.get_cart(user_id).expect("get failed");
        assert!(cart.lines.is_empty());
        assert_eq!(cart.summary.item_count, 0);
    }

    #[test]
    fn summary_follows_current_catalog_price() {
        let (carts, store) = service();
        let user_id = Uuid::new_v4();
        let product_id = store.seed_product("Mug", dec("8.00"), 10);

        carts.add_item(user_id, product_id, 2).expect("add failed");
        store.set_price(product_id, dec("9.50"));

        let cart = carts.get_cart(user_id).expect("get failed");
        assert_eq!(cart.summary.subtotal, dec("19.00"), "carts never freeze price");
    }
}
