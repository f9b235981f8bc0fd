//! Phone number normalization
//!
//! Every inbound number is keyed in E.164-ish form so that "0151 234",
//! "0049151234" and "+49151234" land on the same conversation. Numbers
//! without a country code are assumed to be German.

const DEFAULT_COUNTRY_PREFIX: &str = "+49";

/// Normalize a raw sender number, `None` if it contains no digits.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    if let Some(rest) = cleaned.strip_prefix('+') {
        return Some(drop_trunk_zero(format!("+{}", digits_only(rest))));
    }
    if let Some(rest) = cleaned.strip_prefix("00") {
        return Some(drop_trunk_zero(format!("+{}", digits_only(rest))));
    }
    if let Some(rest) = cleaned.strip_prefix('0') {
        if (10..=13).contains(&cleaned.len()) {
            return Some(format!("{DEFAULT_COUNTRY_PREFIX}{rest}"));
        }
    }
    Some(format!("{DEFAULT_COUNTRY_PREFIX}{}", digits_only(&cleaned)))
}

/// "+49 (0)151 ..." keeps the national trunk zero after the country code.
fn drop_trunk_zero(number: String) -> String {
    let trunk = format!("{DEFAULT_COUNTRY_PREFIX}0");
    match number.strip_prefix(&trunk) {
        Some(rest) => format!("{DEFAULT_COUNTRY_PREFIX}{rest}"),
        None => number,
    }
}

fn digits_only(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}
