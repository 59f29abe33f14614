//! Shared helpers for Decimal ↔ f64 conversions and score formatting.
//!
//! Scores, weights and coefficients are stored as `NUMERIC` and read as
//! `Decimal`, but all averaging runs in f64. Two f64→Decimal strategies exist:
//!
//! - `f64_to_decimal_2dp`: rounds to 2 decimal places (stored general averages)
//! - `f64_to_decimal_full`: preserves full f64 precision (request inputs)
//!
//! Both return `Decimal::ZERO` for non-finite inputs (NaN, ±Inf).

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// Convert an f64 to Decimal, rounded to 2 decimal places.
///
/// Used for general averages frozen into a report: the stored value is the
/// same one the bulletin displays.
pub(crate) fn f64_to_decimal_2dp(v: f64) -> Decimal {
    if !v.is_finite() {
        tracing::warn!(
            "f64_to_decimal_2dp received non-finite value {}, defaulting to 0",
            v
        );
        return Decimal::ZERO;
    }
    Decimal::from_str_exact(&format!("{:.2}", v)).unwrap_or_default()
}

/// Convert an f64 to Decimal preserving full precision.
///
/// Used for grade values, ceilings and weights coming from request bodies.
pub(crate) fn f64_to_decimal_full(v: f64) -> Decimal {
    if !v.is_finite() {
        tracing::warn!(
            "f64_to_decimal_full received non-finite value {}, defaulting to 0",
            v
        );
        return Decimal::ZERO;
    }
    Decimal::from_f64(v).unwrap_or_else(|| Decimal::new(v as i64, 0))
}

/// Convert an optional f64 to Decimal (2 decimal places), returning None if input is None.
pub(crate) fn opt_f64_to_decimal_2dp(v: Option<f64>) -> Option<Decimal> {
    v.map(f64_to_decimal_2dp)
}

/// Convert a Decimal to f64, defaulting to 0.0 for values that can't be represented.
pub(crate) fn dec_to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

/// Convert an Option<Decimal> to Option<f64>.
pub(crate) fn opt_dec_to_f64(d: Option<Decimal>) -> Option<f64> {
    d.and_then(|v| v.to_f64())
}

/// Format a score with two decimals, e.g. `16.5` → `"16.50"`.
pub(crate) fn format_2dp(v: f64) -> String {
    format!("{:.2}", v)
}
