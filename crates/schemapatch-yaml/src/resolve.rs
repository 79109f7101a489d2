//! Implicit tag resolution for plain scalars
//!
//! Untagged plain scalars get their tag from their text, following the YAML
//! 1.2 core schema (with the Go-style integer prefixes Kubernetes tooling
//! accepts). The emitter uses the same rules in reverse to decide when a
//! string has to be quoted.

pub const NULL_TAG: &str = "!!null";
pub const BOOL_TAG: &str = "!!bool";
pub const INT_TAG: &str = "!!int";
pub const FLOAT_TAG: &str = "!!float";
pub const STR_TAG: &str = "!!str";
pub const TIMESTAMP_TAG: &str = "!!timestamp";
pub const MAP_TAG: &str = "!!map";
pub const SEQ_TAG: &str = "!!seq";

const LONG_TAG_PREFIX: &str = "tag:yaml.org,2002:";

/// Resolve the tag an untagged plain scalar would get
pub fn resolve_plain(value: &str) -> &'static str {
    match value {
        "" | "~" | "null" | "Null" | "NULL" => NULL_TAG,
        "true" | "True" | "TRUE" | "false" | "False" | "FALSE" => BOOL_TAG,
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" | "-.inf" | "-.Inf" | "-.INF"
        | ".nan" | ".NaN" | ".NAN" => FLOAT_TAG,
        _ if parse_int(value).is_some() => INT_TAG,
        _ if parse_float(value).is_some() => FLOAT_TAG,
        _ if is_timestamp(value) => TIMESTAMP_TAG,
        _ => STR_TAG,
    }
}

/// Normalize a tag to its short `!!` form when it belongs to the core schema
pub fn short_tag(tag: &str) -> String {
    if let Some(rest) = tag.strip_prefix(LONG_TAG_PREFIX) {
        return format!("!!{}", rest);
    }
    if let Some(inner) = tag.strip_prefix("!<").and_then(|t| t.strip_suffix('>')) {
        if let Some(rest) = inner.strip_prefix(LONG_TAG_PREFIX) {
            return format!("!!{}", rest);
        }
    }
    tag.to_string()
}

/// Words that YAML 1.1 parsers (still common in the Kubernetes ecosystem)
/// read as booleans. Strings spelled like this are always quoted on emit.
pub(crate) fn is_yaml11_bool(value: &str) -> bool {
    matches!(
        value,
        "y" | "Y"
            | "yes"
            | "Yes"
            | "YES"
            | "n"
            | "N"
            | "no"
            | "No"
            | "NO"
            | "on"
            | "On"
            | "ON"
            | "off"
            | "Off"
            | "OFF"
    )
}

/// Parse an integer literal: decimal, `0x`, `0o`, `0b` or leading-zero octal
pub(crate) fn parse_int(value: &str) -> Option<i128> {
    let cleaned: String = value.chars().filter(|c| *c != '_').collect();
    let (negative, digits) = match cleaned.as_bytes().first()? {
        b'-' => (true, &cleaned[1..]),
        b'+' => (false, &cleaned[1..]),
        _ => (false, cleaned.as_str()),
    };
    if digits.is_empty() {
        return None;
    }

    let (radix, body) = if let Some(rest) = digits.strip_prefix("0x") {
        (16, rest)
    } else if let Some(rest) = digits.strip_prefix("0o") {
        (8, rest)
    } else if let Some(rest) = digits.strip_prefix("0b") {
        (2, rest)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };

    if body.is_empty() || !body.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let magnitude = i128::from_str_radix(body, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Parse a float literal in YAML 1.2 core syntax (including `.inf`/`.nan`)
pub(crate) fn parse_float(value: &str) -> Option<f64> {
    match value {
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => return Some(f64::INFINITY),
        "-.inf" | "-.Inf" | "-.INF" => return Some(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => return Some(f64::NAN),
        _ => {}
    }

    let bytes = value.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'-') | Some(b'+')) {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - int_start;
    let mut frac_digits = 0;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        frac_digits = i - frac_start;
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < bytes.len() && (bytes[i] == b'-' || bytes[i] == b'+') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return None;
        }
    }
    if i != bytes.len() {
        return None;
    }
    value.parse::<f64>().ok()
}

/// `YYYY-M-D`, optionally followed by a time part
fn is_timestamp(value: &str) -> bool {
    let bytes = value.as_bytes();
    let digits = |from: usize, min: usize, max: usize| -> Option<usize> {
        let mut end = from;
        while end < bytes.len() && end - from < max && bytes[end].is_ascii_digit() {
            end += 1;
        }
        (end - from >= min).then_some(end)
    };

    let Some(year_end) = digits(0, 4, 4) else {
        return false;
    };
    if bytes.get(year_end) != Some(&b'-') {
        return false;
    }
    let Some(month_end) = digits(year_end + 1, 1, 2) else {
        return false;
    };
    if bytes.get(month_end) != Some(&b'-') {
        return false;
    }
    let Some(day_end) = digits(month_end + 1, 1, 2) else {
        return false;
    };
    match bytes.get(day_end) {
        None => true,
        Some(b'T') | Some(b't') | Some(b' ') => bytes
            .get(day_end + 1)
            .is_some_and(|b| b.is_ascii_digit()),
        _ => false,
    }
}

/// Compare two scalar values that share a resolved tag
pub(crate) fn scalars_equal(tag: &str, left: &str, right: &str) -> bool {
    match tag {
        NULL_TAG => true,
        BOOL_TAG => left.eq_ignore_ascii_case(right),
        INT_TAG => match (parse_int(left), parse_int(right)) {
            (Some(a), Some(b)) => a == b,
            _ => left == right,
        },
        FLOAT_TAG => match (parse_float(left), parse_float(right)) {
            (Some(a), Some(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => left == right,
        },
        _ => left == right,
    }
}
