//! Integer minor-unit arithmetic.
//!
//! Cash is held in cents, the asset in satoshis. Conversions floor
//! through `i128` so repeated trades never fabricate value and never
//! overflow on admin-inflated balances.

/// Cash in minor units (cents).
pub type Cents = i64;

/// Asset quantity in minor units (satoshis).
pub type Sats = i64;

/// Satoshis per whole asset unit.
pub const SATOSHI: i64 = 100_000_000;

/// Convert a cash amount into asset quantity at `price` cents per
/// whole unit, flooring and saturating at the `i64` range.
pub fn cash_to_asset(cash: Cents, price: Cents) -> Sats {
    if price <= 0 {
        return 0;
    }
    clamp_i64(cash as i128 * SATOSHI as i128 / price as i128)
}

/// Convert an asset quantity into cash at `price` cents per whole
/// unit, flooring.
pub fn asset_to_cash(qty: Sats, price: Cents) -> Cents {
    clamp_i64(qty as i128 * price as i128 / SATOSHI as i128)
}

fn clamp_i64(v: i128) -> i64 {
    i64::try_from(v).unwrap_or(if v < 0 { i64::MIN } else { i64::MAX })
}

/// Parse a non-negative decimal string into minor units with `scale`
/// fractional digits, rounding half-up on excess digits. Returns
/// `None` for malformed or negative input.
pub fn parse_minor_units(s: &str, scale: u32) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() || s.starts_with('-') || s.starts_with('+') {
        return None;
    }
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let base: i128 = if whole.is_empty() {
        0
    } else {
        whole.parse::<i128>().ok()?
    };
    let mut value = base.checked_mul(10i128.pow(scale))?;

    let scale = scale as usize;
    let kept = &frac[..frac.len().min(scale)];
    if !kept.is_empty() {
        let padded = kept.parse::<i128>().ok()? * 10i128.pow((scale - kept.len()) as u32);
        value = value.checked_add(padded)?;
    }
    // Round on the first dropped digit.
    if frac.len() > scale {
        let next = frac.as_bytes()[scale] - b'0';
        if next >= 5 {
            value = value.checked_add(1)?;
        }
    }
    i64::try_from(value).ok()
}

/// Parse a USD decimal string into cents.
pub fn parse_usd(s: &str) -> Option<Cents> {
    parse_minor_units(s, 2)
}

/// Parse a BTC decimal string into satoshis.
pub fn parse_btc(s: &str) -> Option<Sats> {
    parse_minor_units(s, 8)
}

/// Format cents as a USD string, e.g. 12345 -> "$123.45".
pub fn fmt_usd(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = (cents as i128).abs();
    format!("{}${}.{:02}", sign, abs / 100, abs % 100)
}

/// Format satoshis as a BTC string, e.g. 1_000_000 -> "0.01000000 BTC".
pub fn fmt_btc(sats: Sats) -> String {
    let sign = if sats < 0 { "-" } else { "" };
    let abs = (sats as i128).abs();
    format!(
        "{}{}.{:08} BTC",
        sign,
        abs / SATOSHI as i128,
        abs % SATOSHI as i128
    )
}
