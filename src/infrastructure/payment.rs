use bigdecimal::BigDecimal;

use crate::domain::errors::DomainError;
use crate::domain::ports::{ChargeOutcome, PaymentGateway};

/// Deterministic gateway for sandbox runs and tests: the outcome is fixed
/// at construction rather than sampled per charge.
#[derive(Debug, Clone, Copy)]
pub struct SandboxPaymentGateway {
    outcome: ChargeOutcome,
}

impl SandboxPaymentGateway {
    pub fn approving() -> Self {
        Self {
            outcome: ChargeOutcome::Approved,
        }
    }

    pub fn declining() -> Self {
        Self {
            outcome: ChargeOutcome::Declined,
        }
    }
}

impl PaymentGateway for SandboxPaymentGateway {
    fn charge(
        &self,
        order_number: &str,
        amount: &BigDecimal,
    ) -> Result<ChargeOutcome, DomainError> {
        log::info!("sandbox charge of {amount} for order {order_number}: {:?}", self.outcome);
        Ok(self.outcome)
    }
}
