// 🧾 Amount formatting helpers
//
// Two-decimal grouping per currency locale. `displayAmount` in the dataset
// stays opaque; these helpers are for callers building new display strings.

/// (grouping, decimal) separators for the supported locales.
fn separators(currency: &str) -> Option<(char, char)> {
    match currency.to_ascii_uppercase().as_str() {
        // en-AU, en-MY, en-GB
        "AUD" | "MYR" | "GBP" => Some((',', '.')),
        // de-DE
        "EUR" => Some(('.', ',')),
        _ => None,
    }
}

/// Format `amount` with two decimals using the currency's locale separators.
/// Unknown currencies get a plain `{:.2}` rendering; non-finite amounts are
/// rendered as-is.
pub fn format_amount(amount: f64, currency: &str) -> String {
    if !amount.is_finite() {
        return amount.to_string();
    }

    let plain = format!("{:.2}", amount);

    let Some((group, decimal)) = separators(currency) else {
        return plain;
    };

    let (sign, digits) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain.as_str()),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(group);
        }
        grouped.push(ch);
    }

    format!("{sign}{grouped}{decimal}{frac_part}")
}

/// Parse a locale-formatted amount back into a number.
///
/// EUR strings use `.` for grouping and `,` for decimals; everything else uses
/// `,` for grouping. Returns `None` for text that is not a finite number.
pub fn parse_display_amount(text: &str, currency: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let normalized = if currency.eq_ignore_ascii_case("EUR") {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.replace(',', "")
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}
