use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::catalog::Address;
use super::errors::DomainError;
use super::pricing::PriceBreakdown;

/// Order lifecycle. PENDING → CONFIRMED → DELIVERED, with side exits
/// PENDING → CANCELLED and CONFIRMED/DELIVERED → REFUNDED. Anything else
/// is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Refunded => "REFUNDED",
        }
    }

    pub fn parse(value: &str) -> Result<OrderStatus, DomainError> {
        match value {
            "PENDING" => Ok(OrderStatus::Pending),
            "CONFIRMED" => Ok(OrderStatus::Confirmed),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            "REFUNDED" => Ok(OrderStatus::Refunded),
            other => Err(DomainError::Unavailable(format!(
                "unknown order status '{other}' in store"
            ))),
        }
    }

    pub fn can_become(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Confirmed)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Confirmed, OrderStatus::Delivered)
                | (OrderStatus::Confirmed, OrderStatus::Refunded)
                | (OrderStatus::Delivered, OrderStatus::Refunded)
        )
    }

    pub fn transition_to(self, next: OrderStatus) -> Result<OrderStatus, DomainError> {
        if self.can_become(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidTransition {
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }
}

/// Payment lifecycle. UNPAID → PAID via the confirm callback; a failed
/// charge marks FAILED from either side, and FAILED resets to UNPAID on
/// retry. Refunds only ever come out of PAID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "UNPAID",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }

    pub fn parse(value: &str) -> Result<PaymentStatus, DomainError> {
        match value {
            "UNPAID" => Ok(PaymentStatus::Unpaid),
            "PAID" => Ok(PaymentStatus::Paid),
            "FAILED" => Ok(PaymentStatus::Failed),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            other => Err(DomainError::Unavailable(format!(
                "unknown payment status '{other}' in store"
            ))),
        }
    }

    pub fn can_become(self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Unpaid, PaymentStatus::Paid)
                | (PaymentStatus::Unpaid, PaymentStatus::Failed)
                | (PaymentStatus::Paid, PaymentStatus::Failed)
                | (PaymentStatus::Paid, PaymentStatus::Refunded)
                | (PaymentStatus::Failed, PaymentStatus::Unpaid)
        )
    }

    pub fn transition_to(self, next: PaymentStatus) -> Result<PaymentStatus, DomainError> {
        if self.can_become(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidTransition {
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }
}

/// Immutable order line snapshot: unit price is frozen at checkout time
/// and never follows later catalog changes.
#[derive(Debug, Clone)]
pub struct OrderLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub line_subtotal: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub shipping_address: Address,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub notes: Option<String>,
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub shipping: BigDecimal,
    pub total: BigDecimal,
    pub lines: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
}

/// Input for the single-transaction order insert at checkout. Status and
/// payment status always start at PENDING/UNPAID.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub shipping_address: Address,
    pub payment_method: String,
    pub notes: Option<String>,
    pub pricing: PriceBreakdown,
    pub lines: Vec<NewOrderLine>,
}

#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub line_subtotal: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct OrderPage {
    pub items: Vec<Order>,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_order_can_confirm_or_cancel() {
        assert!(OrderStatus::Pending.can_become(OrderStatus::Confirmed));
        assert!(OrderStatus::Pending.can_become(OrderStatus::Cancelled));
        assert!(!OrderStatus::Pending.can_become(OrderStatus::Delivered));
        assert!(!OrderStatus::Pending.can_become(OrderStatus::Refunded));
    }

    #[test]
    fn refund_only_after_confirmation() {
        assert!(OrderStatus::Confirmed.can_become(OrderStatus::Refunded));
        assert!(OrderStatus::Delivered.can_become(OrderStatus::Refunded));
        assert!(!OrderStatus::Cancelled.can_become(OrderStatus::Refunded));
    }

    #[test]
    fn terminal_states_reject_everything() {
        for next in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ] {
            assert!(!OrderStatus::Cancelled.can_become(next));
            assert!(!OrderStatus::Refunded.can_become(next));
        }
    }

    #[test]
    fn invalid_transition_names_both_states() {
        let err = OrderStatus::Cancelled
            .transition_to(OrderStatus::Cancelled)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid transition from CANCELLED to CANCELLED"
        );
    }

    #[test]
    fn failed_payment_is_retryable() {
        assert!(PaymentStatus::Unpaid.can_become(PaymentStatus::Failed));
        assert!(PaymentStatus::Failed.can_become(PaymentStatus::Unpaid));
        assert!(!PaymentStatus::Failed.can_become(PaymentStatus::Paid));
    }

    #[test]
    fn refund_requires_paid() {
        assert!(PaymentStatus::Paid.can_become(PaymentStatus::Refunded));
        assert!(!PaymentStatus::Unpaid.can_become(PaymentStatus::Refunded));
        assert!(!PaymentStatus::Refunded.can_become(PaymentStatus::Unpaid));
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()).expect("parses"), status);
        }
        assert!(OrderStatus::parse("SHIPPED").is_err());
    }
}
