//! Display formatting for quoted rates and amounts

/// Round half-up to cents
pub fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Format a rate fraction as a percentage with 2-3 decimals.
///
/// The percentage is rounded to 3 decimals, then trailing zeros are dropped
/// while more than 2 fractional digits remain: 0.00115 -> "0.115%",
/// 0.002 -> "0.20%".
pub fn format_rate_percentage(rate: f64) -> String {
    let mut formatted = format!("{:.3}", rate * 100.0);

    while formatted.ends_with('0') && fraction_digits(&formatted) > 2 {
        formatted.pop();
    }

    formatted.push('%');
    formatted
}

fn fraction_digits(formatted: &str) -> usize {
    formatted.split_once('.').map_or(0, |(_, fraction)| fraction.len())
}

/// Format an amount as whole US dollars with thousands separators ("$1,500")
pub fn format_currency(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if rounded < 0.0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}
