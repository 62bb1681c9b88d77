//! Fee and settlement-time estimation.
//!
//! Pure: no collaborator calls, no failure mode. A missing or non-positive
//! amount yields an all-zero quote instead of an error.

use bigdecimal::{BigDecimal, Zero};
use lazy_static::lazy_static;
use serde::Serialize;
use std::str::FromStr;

use crate::types::Direction;

/// Flat bridge fee rate: 0.1% of the transfer amount.
pub const BRIDGE_FEE_RATE: &str = "0.001";

/// Typical confirmation latency of the L1->L2 path, in minutes.
pub const ETA_MINUTES_L1_TO_L2: u32 = 3;

/// Typical confirmation latency of the L2->L1 path, in minutes.
pub const ETA_MINUTES_L2_TO_L1: u32 = 2;

lazy_static! {
    static ref FEE_RATE: BigDecimal =
        BigDecimal::from_str(BRIDGE_FEE_RATE).expect("fee rate constant is a valid decimal");
}

/// Fee, net receive amount and expected settlement time for a transfer.
///
/// Snapshot values: computed once at submission time and stored on the
/// record, never recomputed from later conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeQuote {
    pub fee: BigDecimal,
    pub net_receive: BigDecimal,
    pub eta_minutes: u32,
}

impl BridgeQuote {
    pub fn zero() -> Self {
        BridgeQuote {
            fee: BigDecimal::zero(),
            net_receive: BigDecimal::zero(),
            eta_minutes: 0,
        }
    }
}

/// Quote a transfer of `amount` in display units along `direction`.
pub fn estimate(direction: Direction, amount: Option<&BigDecimal>) -> BridgeQuote {
    let amount = match amount {
        Some(a) if a > &BigDecimal::zero() => a,
        _ => return BridgeQuote::zero(),
    };

    let fee = amount * &*FEE_RATE;
    let net_receive = if amount >= &fee {
        amount - &fee
    } else {
        BigDecimal::zero()
    };

    let eta_minutes = match direction {
        Direction::L1ToL2 => ETA_MINUTES_L1_TO_L2,
        Direction::L2ToL1 => ETA_MINUTES_L2_TO_L1,
    };

    BridgeQuote {
        fee,
        net_receive,
        eta_minutes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_fee_is_exactly_one_tenth_percent() {
        let quote = estimate(Direction::L1ToL2, Some(&dec("5")));
        assert_eq!(quote.fee, dec("0.005"));
        assert_eq!(quote.net_receive, dec("4.995"));
    }

    #[test]
    fn test_eta_depends_on_direction_only() {
        assert_eq!(
            estimate(Direction::L1ToL2, Some(&dec("1"))).eta_minutes,
            ETA_MINUTES_L1_TO_L2
        );
        assert_eq!(
            estimate(Direction::L2ToL1, Some(&dec("1"))).eta_minutes,
            ETA_MINUTES_L2_TO_L1
        );
        assert_eq!(
            estimate(Direction::L2ToL1, Some(&dec("1000000"))).eta_minutes,
            ETA_MINUTES_L2_TO_L1
        );
    }

    #[test]
    fn test_missing_or_zero_amount_yields_zero_quote() {
        assert_eq!(estimate(Direction::L1ToL2, None), BridgeQuote::zero());
        assert_eq!(
            estimate(Direction::L2ToL1, Some(&dec("0"))),
            BridgeQuote::zero()
        );
        assert_eq!(
            estimate(Direction::L1ToL2, Some(&dec("-3"))),
            BridgeQuote::zero()
        );
    }

    proptest! {
        #[test]
        fn prop_fee_and_net_are_exact(raw in 1u64..=100_000_000_000u64) {
            // Amounts with up to 8 decimal places.
            let amount = BigDecimal::new(raw.into(), 8);
            let quote = estimate(Direction::L1ToL2, Some(&amount));
            prop_assert_eq!(&quote.fee, &(&amount * &dec("0.001")));
            prop_assert_eq!(&quote.net_receive, &(&amount - &quote.fee));
        }
    }
}
