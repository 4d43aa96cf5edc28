//! Service-fee schedule
//!
//! The fee is a policy knob, injected from configuration rather than baked
//! into the calculator. Both variants are monotonically non-decreasing in the
//! distinct store count.

use crate::domain::value_objects::Money;

#[derive(Clone, Debug)]
pub enum FeeSchedule {
    /// Fixed fee charged once per distinct store in the order.
    PerStore(Money),
    /// Fixed fee charged once for any non-empty order.
    Flat(Money),
}

impl FeeSchedule {
    pub fn fee_for(&self, distinct_stores: usize) -> Money {
        match self {
            Self::PerStore(fee) => fee.multiply(distinct_stores as u32),
            Self::Flat(fee) => {
                if distinct_stores == 0 { Money::ZERO } else { *fee }
            }
        }
    }

    /// Reads `SERVICE_FEE` (whole currency units, default 25 000) and
    /// `SERVICE_FEE_MODE` (`per_store` default, or `flat`). Negative
    /// configuration clamps to zero.
    pub fn from_env() -> Self {
        let fee = std::env::var("SERVICE_FEE")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(25_000)
            .max(0);
        match std::env::var("SERVICE_FEE_MODE").as_deref() {
            Ok("flat") => Self::Flat(Money::new(fee)),
            _ => Self::PerStore(Money::new(fee)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_store_fee() {
        let fees = FeeSchedule::PerStore(Money::new(25_000));
        assert_eq!(fees.fee_for(0), Money::ZERO);
        assert_eq!(fees.fee_for(1), Money::new(25_000));
        assert_eq!(fees.fee_for(3), Money::new(75_000));
    }

    #[test]
    fn test_flat_fee() {
        let fees = FeeSchedule::Flat(Money::new(10_000));
        assert_eq!(fees.fee_for(0), Money::ZERO);
        assert_eq!(fees.fee_for(1), Money::new(10_000));
        assert_eq!(fees.fee_for(5), Money::new(10_000));
    }

    #[test]
    fn test_monotonic_in_store_count() {
        for fees in [FeeSchedule::PerStore(Money::new(25_000)), FeeSchedule::Flat(Money::new(10_000))] {
            for n in 0..10 {
                assert!(fees.fee_for(n) <= fees.fee_for(n + 1));
            }
        }
    }
}
