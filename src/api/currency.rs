use serde::Deserialize;

/// Money as it arrives from a form or JSON body: either a bare number or
/// text such as `"$1,000,000"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CurrencyInput {
    Number(f64),
    Text(String),
}

impl CurrencyInput {
    pub fn into_text(self) -> String {
        match self {
            CurrencyInput::Number(v) => v.to_string(),
            CurrencyInput::Text(s) => s,
        }
    }
}

/// Strips `$`, `,` and surrounding whitespace, then parses. Non-finite
/// values such as `inf` are rejected.
pub fn parse_currency(input: &str) -> Option<f64> {
    let cleaned: String = input.chars().filter(|c| !matches!(c, '$' | ',')).collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `$1,234,568`
pub fn format_currency(value: f64) -> String {
    format_grouped(value, 0)
}

/// `$1,234,567.89`
pub fn format_currency_cents(value: f64) -> String {
    format_grouped(value, 2)
}

fn format_grouped(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return "N/A".to_string();
    }

    let formatted = format!("{:.*}", decimals, value.abs());
    let (whole, frac) = match formatted.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let rounds_to_zero = formatted.chars().all(|c| c == '0' || c == '.');
    let sign = if value < 0.0 && !rounds_to_zero { "-" } else { "" };
    match frac {
        Some(frac) => format!("{sign}${grouped}.{frac}"),
        None => format!("{sign}${grouped}"),
    }
}
