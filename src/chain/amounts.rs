// src/chain/amounts.rs

//! Decimal string <-> base-unit conversion.
//!
//! Parsing is strict: inputs with more fractional digits than the token's
//! `decimals` are rejected rather than silently truncated, so a quoted amount
//! always round-trips exactly.

use ethers_core::types::U256;
use serde::Serialize;

use crate::chain::error::ChainError;

fn invalid(input: &str, reason: &str) -> ChainError {
    ChainError::InvalidAmount {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse a human decimal string into base units.
pub fn to_base_units(human: &str, decimals: u32) -> Result<U256, ChainError> {
    let trimmed = human.trim();
    if trimmed.is_empty() {
        return Err(invalid(human, "empty amount"));
    }
    if trimmed.starts_with('-') {
        return Err(invalid(human, "amount must not be negative"));
    }
    if trimmed.starts_with('+') {
        return Err(invalid(human, "explicit sign is not accepted"));
    }

    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed, ""),
    };
    if frac_part.contains('.') {
        return Err(invalid(human, "more than one decimal point"));
    }
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid(human, "no digits"));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit())
        || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid(human, "not a decimal number"));
    }
    if frac_part.len() as u32 > decimals {
        return Err(invalid(
            human,
            &format!(
                "{} fractional digits exceed the token's {} decimals",
                frac_part.len(),
                decimals
            ),
        ));
    }

    let scale = U256::from(10u64)
        .checked_pow(U256::from(decimals))
        .ok_or_else(|| invalid(human, "decimal count out of range"))?;
    let int_units = U256::from_dec_str(if int_part.is_empty() { "0" } else { int_part })
        .map_err(|_| invalid(human, "integer part out of range"))?
        .checked_mul(scale)
        .ok_or_else(|| invalid(human, "amount overflows 256 bits"))?;

    let frac_units = if frac_part.is_empty() {
        U256::zero()
    } else {
        let padding = decimals - frac_part.len() as u32;
        U256::from_dec_str(frac_part)
            .map_err(|_| invalid(human, "fractional part out of range"))?
            .checked_mul(U256::from(10u64).pow(U256::from(padding)))
            .ok_or_else(|| invalid(human, "amount overflows 256 bits"))?
    };

    int_units
        .checked_add(frac_units)
        .ok_or_else(|| invalid(human, "amount overflows 256 bits"))
}

/// Format base units back into a canonical decimal string. Trailing
/// fractional zeros are trimmed; whole numbers carry no decimal point.
pub fn to_human_units(raw: U256, decimals: u32) -> String {
    if decimals == 0 {
        return raw.to_string();
    }
    // 10^77 is the largest power of ten below 2^256
    let decimals = decimals.min(77);
    let scale = U256::from(10u64).pow(U256::from(decimals));
    let whole = raw / scale;
    let frac = raw % scale;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac_str = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    let frac_trimmed = frac_str.trim_end_matches('0');
    format!("{}.{}", whole, frac_trimmed)
}

/// A base-unit amount paired with its canonical decimal rendering.
///
/// Invariant: `raw == to_base_units(&human, decimals)` and
/// `human == to_human_units(raw, decimals)`.
#[derive(Debug, Clone, Serialize)]
pub struct TokenAmount {
    #[serde(serialize_with = "serialize_u256_dec")]
    pub raw: U256,
    pub human: String,
    pub decimals: u32,
}

fn serialize_u256_dec<S: serde::Serializer>(value: &U256, ser: S) -> Result<S::Ok, S::Error> {
    ser.serialize_str(&value.to_string())
}

impl TokenAmount {
    pub fn from_raw(raw: U256, decimals: u32) -> Self {
        Self {
            raw,
            human: to_human_units(raw, decimals),
            decimals,
        }
    }

    pub fn parse(human: &str, decimals: u32) -> Result<Self, ChainError> {
        let raw = to_base_units(human, decimals)?;
        Ok(Self::from_raw(raw, decimals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!(
            to_base_units("1", 18).unwrap(),
            U256::from_dec_str("1000000000000000000").unwrap()
        );
        assert_eq!(
            to_base_units("0.5", 18).unwrap(),
            U256::from_dec_str("500000000000000000").unwrap()
        );
        assert_eq!(to_base_units("1.25", 6).unwrap(), U256::from(1_250_000u64));
        assert_eq!(to_base_units(".5", 1).unwrap(), U256::from(5u64));
        assert_eq!(to_base_units("7.", 2).unwrap(), U256::from(700u64));
        assert_eq!(to_base_units("0", 18).unwrap(), U256::zero());
    }

    #[test]
    fn rejects_malformed_input_before_any_io() {
        for bad in ["", "  ", "-1", "+1", "1.2.3", "abc", "1e18", "0x10", "."] {
            let err = to_base_units(bad, 18).unwrap_err();
            assert_eq!(err.kind(), "InvalidAmount", "input {:?}", bad);
        }
    }

    #[test]
    fn rejects_excess_precision_instead_of_truncating() {
        assert!(to_base_units("1.1234567", 6).is_err());
        assert!(to_base_units("0.0000001", 6).is_err());
        // exactly at the limit is fine
        assert!(to_base_units("1.123456", 6).is_ok());
    }

    #[test]
    fn formats_with_trimmed_zero_padding() {
        assert_eq!(to_human_units(U256::from(1_250_000u64), 6), "1.25");
        assert_eq!(to_human_units(U256::from(1_000_000u64), 6), "1");
        assert_eq!(to_human_units(U256::from(1u64), 6), "0.000001");
        assert_eq!(to_human_units(U256::zero(), 18), "0");
        assert_eq!(to_human_units(U256::from(42u64), 0), "42");
    }

    #[test]
    fn round_trip_is_lossless() {
        for (s, d) in [
            ("1", 18u32),
            ("0.5", 18),
            ("123456.789", 9),
            ("0.000001", 6),
            ("999999999999", 0),
            ("1.000001", 6),
        ] {
            let raw = to_base_units(s, d).unwrap();
            let human = to_human_units(raw, d);
            assert_eq!(to_base_units(&human, d).unwrap(), raw);
        }
        // canonical form trims redundant zeros
        let raw = to_base_units("1.50", 6).unwrap();
        assert_eq!(to_human_units(raw, 6), "1.5");
    }

    #[test]
    fn token_amount_holds_the_invariant() {
        let amount = TokenAmount::parse("2.5", 18).unwrap();
        assert_eq!(amount.human, "2.5");
        assert_eq!(amount.raw, to_base_units("2.5", 18).unwrap());
        let back = TokenAmount::from_raw(amount.raw, 18);
        assert_eq!(back.human, "2.5");
    }
}
