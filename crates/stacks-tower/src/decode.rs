//! Typed extraction from [RawValue].
//!
//! Both decoders are total: every shape has an outcome, and anything unrecognized yields
//! `None`, which callers treat as "field unknown" rather than as an error. The node's
//! encoding varies by call site (bare value, `ok`-wrapped, optional, or a flattened string),
//! so the decoders peel wrappers instead of assuming one schema.

use crate::clarity::RawValue;
use std::cmp::Ordering;

/// Strip any number of `(ok ...)` layers. `(err ...)` and an empty `ok` stay as they are.
fn peel_ok(mut v: &RawValue) -> &RawValue {
    while let RawValue::ResponseOk(Some(inner)) = v {
        v = inner.as_ref();
    }
    v
}

/// Decimal text of the first `uint` found under `ok` / `some` layers.
///
/// A `uint` node without a payload decodes as `"0"`.
pub fn decode_unsigned(v: &RawValue) -> Option<String> {
    let mut node = peel_ok(v);
    loop {
        match node {
            RawValue::UInt(n) => return Some(n.clone().unwrap_or_else(|| "0".to_string())),
            RawValue::Optional(Some(inner)) => node = peel_ok(inner),
            _ => return None,
        }
    }
}

/// Principal address from an optional-principal shaped value.
///
/// `none` means nobody has stacked yet and yields `None`, as does any other shape.
pub fn decode_optional_principal(v: &RawValue) -> Option<String> {
    if let RawValue::Text(s) = v {
        return Some(s.clone());
    }
    match peel_ok(v) {
        RawValue::Optional(None) => None,
        RawValue::Optional(Some(inner)) => match peel_ok(inner) {
            RawValue::Principal(addr) => addr.clone(),
            _ => None,
        },
        RawValue::Principal(addr) => addr.clone(),
        _ => None,
    }
}

/// Numeric comparison of two decimal strings of any length.
///
/// Returns `None` if either side is not a plain run of ASCII digits.
pub fn cmp_unsigned(a: &str, b: &str) -> Option<Ordering> {
    let a = canonical_digits(a)?;
    let b = canonical_digits(b)?;
    Some(a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
}

fn canonical_digits(s: &str) -> Option<&str> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let trimmed = s.trim_start_matches('0');
    Some(if trimmed.is_empty() { "0" } else { trimmed })
}
