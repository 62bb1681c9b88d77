//! Conversion between human-denominated KAS amounts and each ledger's
//! native integer unit.
//!
//! L1 accounts in 10^-8 units, L2 in 10^-18 (its execution environment's
//! convention); L2 contract tokens scale by their own declared decimals.
//! Conversion always floors: value below the smallest native unit is
//! truncated, never rounded up, so a conversion can lose at most one
//! native unit.

use alloy::primitives::U256;
use bigdecimal::num_bigint::{BigInt, Sign};
use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive, Zero};
use eyre::{eyre, Result};

/// Decimal places of the L1 native unit.
pub const L1_DECIMALS: u8 = 8;

/// Decimal places of the L2 native unit.
pub const L2_NATIVE_DECIMALS: u8 = 18;

/// Scale a display amount by `10^decimals` and floor to an integer.
fn floor_scaled(amount: &BigDecimal, decimals: u8) -> Result<BigInt> {
    if amount < &BigDecimal::zero() {
        return Err(eyre!("amount must not be negative: {amount}"));
    }
    let scale = BigInt::from(10u32).pow(decimals as u32);
    let scaled = amount * BigDecimal::from(scale);
    let (int, _exponent) = scaled
        .with_scale_round(0, RoundingMode::Floor)
        .into_bigint_and_exponent();
    Ok(int)
}

/// Convert a display amount into L1 native units.
pub fn to_l1_units(amount: &BigDecimal) -> Result<u64> {
    let int = floor_scaled(amount, L1_DECIMALS)?;
    int.to_u64()
        .ok_or_else(|| eyre!("amount {amount} overflows the L1 native unit range"))
}

/// Convert L1 native units back into a display amount.
pub fn from_l1_units(units: u64) -> BigDecimal {
    BigDecimal::new(BigInt::from(units), L1_DECIMALS as i64)
}

/// Convert a display amount into L2 native units (wei-style).
pub fn to_l2_units(amount: &BigDecimal) -> Result<U256> {
    to_scaled_units(amount, L2_NATIVE_DECIMALS)
}

/// Convert L2 native units back into a display amount.
pub fn from_l2_units(value: U256) -> BigDecimal {
    from_scaled_units(value, L2_NATIVE_DECIMALS)
}

/// Convert a display amount into a token's own base units.
pub fn to_scaled_units(amount: &BigDecimal, decimals: u8) -> Result<U256> {
    let int = floor_scaled(amount, decimals)?;
    let (_sign, bytes) = int.to_bytes_be();
    if bytes.len() > 32 {
        return Err(eyre!("amount {amount} overflows 256 bits at {decimals} decimals"));
    }
    Ok(U256::from_be_slice(&bytes))
}

/// Convert a token base-unit value back into a display amount.
pub fn from_scaled_units(value: U256, decimals: u8) -> BigDecimal {
    let int = BigInt::from_bytes_be(Sign::Plus, &value.to_be_bytes::<32>());
    BigDecimal::new(int, decimals as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_l1_whole_amounts() {
        assert_eq!(to_l1_units(&dec("1")).unwrap(), 100_000_000);
        assert_eq!(to_l1_units(&dec("5")).unwrap(), 500_000_000);
        assert_eq!(to_l1_units(&dec("0.01")).unwrap(), 1_000_000);
    }

    #[test]
    fn test_l1_truncates_below_smallest_unit() {
        // 0.123456789 carries 9 decimal places; the 9th is dropped, not rounded.
        assert_eq!(to_l1_units(&dec("0.123456789")).unwrap(), 12_345_678);
        assert_eq!(to_l1_units(&dec("0.000000019")).unwrap(), 1);
        assert_eq!(to_l1_units(&dec("0.000000001")).unwrap(), 0);
    }

    #[test]
    fn test_l1_never_rounds_up() {
        assert_eq!(to_l1_units(&dec("0.999999999")).unwrap(), 99_999_999);
    }

    #[test]
    fn test_l1_rejects_negative_and_overflow() {
        assert!(to_l1_units(&dec("-1")).is_err());
        // u64::MAX is ~1.8e19; 10^12 KAS scales to 10^20 native units.
        assert!(to_l1_units(&dec("1000000000000")).is_err());
    }

    #[test]
    fn test_l2_native_scale() {
        assert_eq!(
            to_l2_units(&dec("1")).unwrap(),
            U256::from(10u64).pow(U256::from(18u64))
        );
        assert_eq!(
            to_l2_units(&dec("0.5")).unwrap(),
            U256::from(5u64) * U256::from(10u64).pow(U256::from(17u64))
        );
    }

    #[test]
    fn test_token_scale_uses_declared_decimals() {
        // A 6-decimal token: 1.5 units is 1_500_000, not 1.5e18.
        assert_eq!(
            to_scaled_units(&dec("1.5"), 6).unwrap(),
            U256::from(1_500_000u64)
        );
        assert_eq!(
            to_scaled_units(&dec("1.5"), 8).unwrap(),
            U256::from(150_000_000u64)
        );
    }

    #[test]
    fn test_from_units_display() {
        assert_eq!(from_l1_units(150_000_000), dec("1.5"));
        assert_eq!(from_l2_units(U256::from(10u64).pow(U256::from(18u64))), dec("1"));
        assert_eq!(from_scaled_units(U256::from(1_500_000u64), 6), dec("1.5"));
    }

    proptest! {
        // Round-trip error is bounded by the smallest native unit.
        #[test]
        fn prop_l1_roundtrip_within_one_unit(raw in 0u64..=10_000_000_000_000u64) {
            // Amounts with up to 10 decimal places, so two below the L1 scale.
            let amount = BigDecimal::new(raw.into(), 10);
            let units = to_l1_units(&amount).unwrap();
            let back = from_l1_units(units);
            let err = &amount - &back;
            prop_assert!(err >= BigDecimal::from(0));
            prop_assert!(err < BigDecimal::new(1.into(), L1_DECIMALS as i64));
        }

        #[test]
        fn prop_l1_native_values_roundtrip_exactly(units in 0u64..=u64::MAX / 2) {
            let amount = from_l1_units(units);
            prop_assert_eq!(to_l1_units(&amount).unwrap(), units);
        }

        #[test]
        fn prop_token_roundtrip_within_one_unit(raw in 0u64..=1_000_000_000_000u64, decimals in 0u8..=18) {
            let amount = BigDecimal::new(raw.into(), 19);
            let units = to_scaled_units(&amount, decimals).unwrap();
            let back = from_scaled_units(units, decimals);
            let err = &amount - &back;
            prop_assert!(err >= BigDecimal::from(0));
            prop_assert!(err < BigDecimal::new(1.into(), decimals as i64));
        }
    }
}
