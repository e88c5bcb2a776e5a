//! Parsers for the numeric values that appear in chain files.

/// Parse a chained multiplier expression such as `*100`, `/10*10` or `/0.1`.
///
/// Tokens are applied left to right to an initial value of 1 with no operator
/// precedence. A leading bare number is taken as a multiplication.
pub fn parse_multiplier(expr: &str) -> Result<f64, String> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Err("empty multiplier".to_string());
    }

    let mut value = 1.0_f64;
    let mut rest = expr;
    let mut op = '*';
    if let Some(first) = rest.chars().next() {
        if first == '*' || first == '/' {
            op = first;
            rest = &rest[1..];
        }
    }

    loop {
        let end = rest.find(['*', '/']).unwrap_or(rest.len());
        let token = rest[..end].trim();
        let operand: f64 = token
            .parse()
            .map_err(|_| format!("invalid number '{}' in multiplier '{}'", token, expr))?;
        match op {
            '*' => value *= operand,
            _ => {
                if operand == 0.0 {
                    return Err(format!("division by zero in multiplier '{}'", expr));
                }
                value /= operand;
            }
        }
        if end == rest.len() {
            break;
        }
        op = rest[end..].chars().next().unwrap_or('*');
        rest = &rest[end + 1..];
    }

    if !value.is_finite() {
        return Err(format!("multiplier '{}' is not finite", expr));
    }
    Ok(value)
}

/// Parse a byte size such as `100MB`, `512k` or `1.5GiB` (binary multiples).
pub fn parse_bytes(text: &str) -> Result<u64, String> {
    let text = text.trim();
    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let number: f64 = number
        .parse()
        .map_err(|_| format!("invalid byte size '{}'", text))?;

    let scale: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => 1 << 10,
        "m" | "mb" | "mib" => 1 << 20,
        "g" | "gb" | "gib" => 1 << 30,
        "t" | "tb" | "tib" => 1 << 40,
        other => return Err(format!("unknown size unit '{}' in '{}'", other, text)),
    };

    let bytes = number * scale as f64;
    if !bytes.is_finite() || bytes < 0.0 || bytes > u64::MAX as f64 {
        return Err(format!("byte size '{}' out of range", text));
    }
    Ok(bytes as u64)
}

/// `-(amount * multiplier)` as a score delta. Whole multipliers stay in
/// integer arithmetic so large byte counts keep their precision; the result
/// saturates at the `i64` range.
pub fn scaled_penalty(amount: u64, multiplier: f64) -> i64 {
    if multiplier.fract() == 0.0 {
        let amount = i64::try_from(amount).unwrap_or(i64::MAX);
        return amount.saturating_mul(multiplier as i64).saturating_neg();
    }
    let scaled = (amount as f64 * multiplier).clamp(i64::MIN as f64, i64::MAX as f64);
    (scaled as i64).saturating_neg()
}
