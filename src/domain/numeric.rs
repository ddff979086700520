use serde_json::Value;

/// Rounds ties toward positive infinity, matching the rounding the mobile
/// client applies to the same figures.
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

pub fn round_to_tenth(value: f64) -> f64 {
    round_half_up(value * 10.0) / 10.0
}

/// Strict reading used for request fields: a JSON number or a string that is
/// entirely a number. Anything non-finite is rejected.
pub fn strict_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Lenient reading used for model output: strings contribute their leading
/// numeric prefix, so `"350 kcal"` reads as 350.
pub fn lenient_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_number(s),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

fn leading_number(text: &str) -> Option<f64> {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let len = bytes.len();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let int_start = end;
    while end < len && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < len && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < len && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    if end < len && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < len && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < len && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2774.5), 2775.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(233.4), 233.0);
        assert_eq!(round_to_tenth(12.25), 12.3);
        assert_eq!(round_to_tenth(7.04), 7.0);
    }

    #[test]
    fn test_strict_number() {
        assert_eq!(strict_number(&json!(80)), Some(80.0));
        assert_eq!(strict_number(&json!(" 72.5 ")), Some(72.5));
        assert_eq!(strict_number(&json!("80kg")), None);
        assert_eq!(strict_number(&json!(null)), None);
        assert_eq!(strict_number(&json!(true)), None);
    }

    #[test]
    fn test_lenient_number_reads_prefix() {
        assert_eq!(lenient_number(&json!("350 kcal")), Some(350.0));
        assert_eq!(lenient_number(&json!("12.5g")), Some(12.5));
        assert_eq!(lenient_number(&json!("-.5")), Some(-0.5));
        assert_eq!(lenient_number(&json!("1e2 units")), Some(100.0));
        assert_eq!(lenient_number(&json!("about 300")), None);
        assert_eq!(lenient_number(&json!([1, 2])), None);
    }
}
