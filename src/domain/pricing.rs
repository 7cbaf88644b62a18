use bigdecimal::{BigDecimal, RoundingMode, Zero};

/// A cart or order line reduced to what pricing needs.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub unit_price: BigDecimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBreakdown {
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub shipping: BigDecimal,
    pub total: BigDecimal,
}

/// Monetary values are kept at scale 2, rounded half-up at every derived
/// value so rounding error never compounds.
pub fn round2(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(2, RoundingMode::HalfUp)
}

pub fn line_subtotal(unit_price: &BigDecimal, quantity: i32) -> BigDecimal {
    round2(&(unit_price * BigDecimal::from(quantity)))
}

/// Pure pricing over the given lines: 10% flat tax, flat 10.00 shipping
/// waived once the subtotal exceeds 100.00. Deterministic for identical
/// inputs; no side effects.
pub fn price(lines: &[PricedLine]) -> PriceBreakdown {
    let subtotal = round2(&lines.iter().fold(BigDecimal::zero(), |acc, line| {
        acc + line_subtotal(&line.unit_price, line.quantity)
    }));
    let tax = round2(&(&subtotal / BigDecimal::from(10)));
    let shipping = if subtotal > BigDecimal::from(100) {
        round2(&BigDecimal::zero())
    } else {
        round2(&BigDecimal::from(10))
    };
    let total = round2(&(&subtotal + &tax + &shipping));
    PriceBreakdown {
        subtotal,
        tax,
        shipping,
        total,
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).expect("valid decimal")
    }

    fn line(unit_price: &str, quantity: i32) -> PricedLine {
        PricedLine {
            unit_price: dec(unit_price),
            quantity,
        }
    }

    #[test]
    fn small_order_pays_flat_shipping() {
        let breakdown = price(&[line("20.00", 3)]);
        assert_eq!(breakdown.subtotal, dec("60.00"));
        assert_eq!(breakdown.tax, dec("6.00"));
        assert_eq!(breakdown.shipping, dec("10.00"));
        assert_eq!(breakdown.total, dec("76.00"));
    }

    #[test]
    fn shipping_waived_above_threshold() {
        let breakdown = price(&[line("75.00", 2)]);
        assert_eq!(breakdown.subtotal, dec("150.00"));
        assert_eq!(breakdown.shipping, dec("0.00"));
        assert_eq!(breakdown.total, dec("165.00"));
    }

    #[test]
    fn subtotal_exactly_at_threshold_still_ships() {
        let breakdown = price(&[line("100.00", 1)]);
        assert_eq!(breakdown.shipping, dec("10.00"));
        assert_eq!(breakdown.total, dec("120.00"));
    }

    #[test]
    fn tax_rounds_half_up() {
        // 3 × 3.33 = 9.99; 10% tax 0.999 rounds to 1.00
        let breakdown = price(&[line("3.33", 3)]);
        assert_eq!(breakdown.subtotal, dec("9.99"));
        assert_eq!(breakdown.tax, dec("1.00"));
        assert_eq!(breakdown.total, dec("20.99"));
    }

    #[test]
    fn empty_input_prices_to_flat_shipping_only() {
        let breakdown = price(&[]);
        assert_eq!(breakdown.subtotal, dec("0.00"));
        assert_eq!(breakdown.total, dec("10.00"));
    }

    #[test]
    fn deterministic_for_identical_input() {
        let lines = [line("19.99", 2), line("4.50", 7)];
        assert_eq!(price(&lines), price(&lines));
    }
}
