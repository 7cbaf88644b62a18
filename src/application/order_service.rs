use serde_json::json;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::identity::Identity;
use crate::domain::order::{Order, OrderPage, OrderStatus, PaymentStatus};
use crate::domain::ports::{
    ChargeOutcome, EventOutbox, InventoryLedger, OrderStore, PaymentGateway, StorefrontTx,
    UnitOfWork,
};

/// Post-checkout order lifecycle: queries, cancellation, refunds and the
/// payment transitions. Cancel and refund re-credit every reserved line in
/// the same transaction that flips the status, so stock is never
/// double-credited and never lost.
#[derive(Clone)]
pub struct OrderService<U> {
    store: U,
}

impl<U> OrderService<U>
where
    U: UnitOfWork,
    U::Tx: StorefrontTx,
{
    pub fn new(store: U) -> Self {
        Self { store }
    }

    /// Owners see their own orders; admins see any. A foreign order reads
    /// as absent rather than forbidden.
    pub fn get(&self, order_id: Uuid, identity: Identity) -> Result<Order, DomainError> {
        self.store.run(|tx| {
            let order = tx.order(order_id)?.ok_or(DomainError::NotFound("order"))?;
            if order.user_id != identity.user_id && !identity.role.is_admin() {
                return Err(DomainError::NotFound("order"));
            }
            Ok(order)
        })
    }

    pub fn list_for_user(
        &self,
        user_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<OrderPage, DomainError> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);
        self.store.run(|tx| tx.orders_for_user(user_id, page, limit))
    }

    pub fn cancel(&self, order_id: Uuid, user_id: Uuid) -> Result<Order, DomainError> {
        self.store.run(|tx| {
            let order = tx
                .order(order_id)?
                .filter(|order| order.user_id == user_id)
                .ok_or(DomainError::NotFound("order"))?;
            let next = order.status.transition_to(OrderStatus::Cancelled)?;

            for line in &order.lines {
                tx.release(line.product_id, line.quantity)?;
            }
            tx.set_status(order_id, next)?;
            tx.enqueue(
                order_id,
                "OrderCancelled",
                json!({
                    "order_id": order_id,
                    "order_number": &order.order_number,
                }),
            )?;

            log::info!("order {} cancelled by its owner", order.order_number);
            Self::reload(tx, order_id)
        })
    }

    /// Admin-only. Requires a PAID order past confirmation; releases every
    /// line back to stock.
    pub fn refund(&self, order_id: Uuid, identity: Identity) -> Result<Order, DomainError> {
        if !identity.role.is_admin() {
            return Err(DomainError::Forbidden);
        }
        self.store.run(|tx| {
            let order = tx.order(order_id)?.ok_or(DomainError::NotFound("order"))?;
            let next_payment = order
                .payment_status
                .transition_to(PaymentStatus::Refunded)?;
            let next_status = order.status.transition_to(OrderStatus::Refunded)?;

            for line in &order.lines {
                tx.release(line.product_id, line.quantity)?;
            }
            tx.set_status(order_id, next_status)?;
            tx.set_payment_status(order_id, next_payment)?;
            tx.enqueue(
                order_id,
                "OrderRefunded",
                json!({
                    "order_id": order_id,
                    "order_number": &order.order_number,
                    "total": order.total.to_string(),
                }),
            )?;

            log::info!("order {} refunded", order.order_number);
            Self::reload(tx, order_id)
        })
    }

    /// Invoked by the payment collaborator on a successful charge.
    pub fn confirm_payment(&self, order_id: Uuid) -> Result<Order, DomainError> {
        self.store.run(|tx| {
            let order = tx.order(order_id)?.ok_or(DomainError::NotFound("order"))?;
            let next_status = order.status.transition_to(OrderStatus::Confirmed)?;
            let next_payment = order.payment_status.transition_to(PaymentStatus::Paid)?;

            tx.set_status(order_id, next_status)?;
            tx.set_payment_status(order_id, next_payment)?;
            tx.enqueue(
                order_id,
                "PaymentConfirmed",
                json!({
                    "order_id": order_id,
                    "order_number": order.order_number,
                }),
            )?;
            Self::reload(tx, order_id)
        })
    }

    /// Invoked by the payment collaborator on a failed charge. The order
    /// itself stays where it was and remains retryable.
    pub fn fail_payment(&self, order_id: Uuid) -> Result<Order, DomainError> {
        self.store.run(|tx| {
            let order = tx.order(order_id)?.ok_or(DomainError::NotFound("order"))?;
            let next_payment = order.payment_status.transition_to(PaymentStatus::Failed)?;

            tx.set_payment_status(order_id, next_payment)?;
            tx.enqueue(
                order_id,
                "PaymentFailed",
                json!({
                    "order_id": order_id,
                    "order_number": &order.order_number,
                }),
            )?;

            log::warn!("payment failed for order {}", order.order_number);
            Self::reload(tx, order_id)
        })
    }

    /// Resets a FAILED payment back to UNPAID so the owner can charge
    /// again.
    pub fn retry_payment(&self, order_id: Uuid, user_id: Uuid) -> Result<Order, DomainError> {
        self.store.run(|tx| {
            let order = tx
                .order(order_id)?
                .filter(|order| order.user_id == user_id)
                .ok_or(DomainError::NotFound("order"))?;
            let next_payment = order.payment_status.transition_to(PaymentStatus::Unpaid)?;

            tx.set_payment_status(order_id, next_payment)?;
            Self::reload(tx, order_id)
        })
    }

    /// Admin-only fulfilment step: CONFIRMED → DELIVERED.
    pub fn mark_delivered(&self, order_id: Uuid, identity: Identity) -> Result<Order, DomainError> {
        if !identity.role.is_admin() {
            return Err(DomainError::Forbidden);
        }
        self.store.run(|tx| {
            let order = tx.order(order_id)?.ok_or(DomainError::NotFound("order"))?;
            let next = order.status.transition_to(OrderStatus::Delivered)?;

            tx.set_status(order_id, next)?;
            tx.enqueue(
                order_id,
                "OrderDelivered",
                json!({
                    "order_id": order_id,
                    "order_number": order.order_number,
                }),
            )?;
            Self::reload(tx, order_id)
        })
    }

    /// Sandbox-path charge: asks the gateway synchronously and applies the
    /// matching payment transition. The charge itself happens outside any
    /// store transaction; only the resulting transition is transactional.
    pub fn capture_payment(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        gateway: &dyn PaymentGateway,
    ) -> Result<Order, DomainError> {
        let (order_number, total) = self.store.run(|tx| {
            let order = tx
                .order(order_id)?
                .filter(|order| order.user_id == user_id)
                .ok_or(DomainError::NotFound("order"))?;
            // reject up front if the transitions could not land
            order.status.transition_to(OrderStatus::Confirmed)?;
            order.payment_status.transition_to(PaymentStatus::Paid)?;
            Ok((order.order_number, order.total))
        })?;

        match gateway.charge(&order_number, &total)? {
            ChargeOutcome::Approved => self.confirm_payment(order_id),
            ChargeOutcome::Declined => self.fail_payment(order_id),
        }
    }

    fn reload(tx: &mut U::Tx, order_id: Uuid) -> Result<Order, DomainError> {
        tx.order(order_id)?
            .ok_or_else(|| DomainError::Unavailable("order missing after update".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use uuid::Uuid;

    use super::OrderService;
    use crate::application::cart_service::CartService;
    use crate::application::checkout_service::CheckoutService;
    use crate::domain::errors::DomainError;
    use crate::domain::identity::Identity;
    use crate::domain::order::{Order, OrderStatus, PaymentStatus};
    use crate::infrastructure::memory::MemoryStore;
    use crate::infrastructure::payment::SandboxPaymentGateway;

    fn dec(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).expect("valid decimal")
    }

    struct Fixture {
        store: MemoryStore,
        orders: OrderService<MemoryStore>,
        user_id: Uuid,
        product_id: Uuid,
        order: Order,
    }

    /// Seeds stock 5, checks out 3 units for a fresh user.
    fn placed_order() -> Fixture {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();
        let address_id = store.seed_address(user_id);
        let product_id = store.seed_product("Lamp", dec("20.00"), 5);
        CartService::new(store.clone())
            .add_item(user_id, product_id, 3)
            .expect("add failed");
        let order = CheckoutService::new(store.clone())
            .checkout(user_id, address_id, "card", None)
            .expect("checkout failed");
        Fixture {
            orders: OrderService::new(store.clone()),
            store,
            user_id,
            product_id,
            order,
        }
    }

    fn paid_order() -> Fixture {
        let f = placed_order();
        f.orders
            .confirm_payment(f.order.id)
            .expect("confirm failed");
        f
    }

    #[test]
    fn cancel_restores_stock_and_flips_status() {
        let f = placed_order();
        assert_eq!(f.store.stock_of(f.product_id), Some(2));

        let cancelled = f.orders.cancel(f.order.id, f.user_id).expect("cancel failed");
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(f.store.stock_of(f.product_id), Some(5));
    }

    #[test]
    fn cancelling_twice_does_not_double_credit() {
        let f = placed_order();
        f.orders.cancel(f.order.id, f.user_id).expect("cancel failed");

        let err = f.orders.cancel(f.order.id, f.user_id).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
        assert_eq!(f.store.stock_of(f.product_id), Some(5), "credited once only");
    }

    #[test]
    fn only_the_owner_can_cancel() {
        let f = placed_order();
        let err = f.orders.cancel(f.order.id, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, DomainError::NotFound("order")));
        assert_eq!(f.store.stock_of(f.product_id), Some(2));
    }

    #[test]
    fn confirmed_orders_cannot_cancel() {
        let f = paid_order();
        let err = f.orders.cancel(f.order.id, f.user_id).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn confirm_payment_moves_both_machines() {
        let f = placed_order();
        let order = f
            .orders
            .confirm_payment(f.order.id)
            .expect("confirm failed");
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.payment_status, PaymentStatus::Paid);

        let err = f.orders.confirm_payment(f.order.id).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn failed_payment_keeps_order_actionable() {
        let f = placed_order();
        let order = f.orders.fail_payment(f.order.id).expect("fail failed");
        assert_eq!(order.status, OrderStatus::Pending, "status untouched");
        assert_eq!(order.payment_status, PaymentStatus::Failed);

        let order = f
            .orders
            .retry_payment(f.order.id, f.user_id)
            .expect("retry failed");
        assert_eq!(order.payment_status, PaymentStatus::Unpaid);

        let order = f
            .orders
            .confirm_payment(f.order.id)
            .expect("confirm after retry failed");
        assert_eq!(order.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn refund_needs_the_admin_role() {
        let f = paid_order();
        let err = f
            .orders
            .refund(f.order.id, Identity::customer(f.user_id))
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden));
        assert_eq!(f.store.stock_of(f.product_id), Some(2), "no state change");
    }

    #[test]
    fn refund_needs_a_paid_order() {
        let f = placed_order();
        let err = f
            .orders
            .refund(f.order.id, Identity::admin(Uuid::new_v4()))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn refund_restores_stock_and_both_statuses() {
        let f = paid_order();
        let order = f
            .orders
            .refund(f.order.id, Identity::admin(Uuid::new_v4()))
            .expect("refund failed");
        assert_eq!(order.status, OrderStatus::Refunded);
        assert_eq!(order.payment_status, PaymentStatus::Refunded);
        assert_eq!(f.store.stock_of(f.product_id), Some(5));
    }

    #[test]
    fn delivered_orders_remain_refundable() {
        let f = paid_order();
        let admin = Identity::admin(Uuid::new_v4());
        let order = f
            .orders
            .mark_delivered(f.order.id, admin)
            .expect("deliver failed");
        assert_eq!(order.status, OrderStatus::Delivered);

        let order = f.orders.refund(f.order.id, admin).expect("refund failed");
        assert_eq!(order.status, OrderStatus::Refunded);
        assert_eq!(f.store.stock_of(f.product_id), Some(5));
    }

    #[test]
    fn mark_delivered_needs_admin_and_confirmation() {
        let f = placed_order();
        let err = f
            .orders
            .mark_delivered(f.order.id, Identity::customer(f.user_id))
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden));

        let err = f
            .orders
            .mark_delivered(f.order.id, Identity::admin(Uuid::new_v4()))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[test]
    fn foreign_orders_read_as_absent_even_when_fetching() {
        let f = placed_order();
        let err = f
            .orders
            .get(f.order.id, Identity::customer(Uuid::new_v4()))
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound("order")));

        // admins can inspect any order
        let order = f
            .orders
            .get(f.order.id, Identity::admin(Uuid::new_v4()))
            .expect("admin get failed");
        assert_eq!(order.id, f.order.id);
    }

    #[test]
    fn listing_pages_newest_first() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();
        let address_id = store.seed_address(user_id);
        let product_id = store.seed_product("Lamp", dec("20.00"), 50);
        let carts = CartService::new(store.clone());
        let checkout = CheckoutService::new(store.clone());
        for _ in 0..5 {
            carts.add_item(user_id, product_id, 1).expect("add failed");
            checkout
                .checkout(user_id, address_id, "card", None)
                .expect("checkout failed");
        }

        let orders = OrderService::new(store);
        let page1 = orders.list_for_user(user_id, 1, 3).expect("list failed");
        assert_eq!(page1.total, 5);
        assert_eq!(page1.items.len(), 3);
        let page2 = orders.list_for_user(user_id, 2, 3).expect("list failed");
        assert_eq!(page2.items.len(), 2);
    }

    #[test]
    fn capture_payment_applies_the_gateway_verdict() {
        let f = placed_order();
        let declined = f
            .orders
            .capture_payment(f.order.id, f.user_id, &SandboxPaymentGateway::declining())
            .expect("capture failed");
        assert_eq!(declined.payment_status, PaymentStatus::Failed);

        f.orders
            .retry_payment(f.order.id, f.user_id)
            .expect("retry failed");
        let approved = f
            .orders
            .capture_payment(f.order.id, f.user_id, &SandboxPaymentGateway::approving())
            .expect("capture failed");
        assert_eq!(approved.status, OrderStatus::Confirmed);
        assert_eq!(approved.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn lifecycle_writes_outbox_events() {
        let f = paid_order();
        f.orders
            .refund(f.order.id, Identity::admin(Uuid::new_v4()))
            .expect("refund failed");

        let kinds: Vec<String> = f
            .store
            .events()
            .into_iter()
            .map(|event| event.event_type)
            .collect();
        assert_eq!(kinds, ["OrderPlaced", "PaymentConfirmed", "OrderRefunded"]);
    }
}
