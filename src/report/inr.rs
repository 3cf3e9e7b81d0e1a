pub const CURRENCY_PREFIX: &str = "₹";
pub const PLACEHOLDER: &str = "-";

/// Formats a value as whole rupees using Indian digit grouping: the last three
/// digits, then groups of two (`₹12,34,568`).
pub fn format_inr(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let grouped = group_indian(&digits);
    if rounded < 0.0 {
        format!("{CURRENCY_PREFIX}-{grouped}")
    } else {
        format!("{CURRENCY_PREFIX}{grouped}")
    }
}

pub fn format_optional_inr(value: Option<f64>) -> String {
    value.map_or_else(|| PLACEHOLDER.to_string(), format_inr)
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, last_three) = digits.split_at(digits.len() - 3);
    let mut out = String::with_capacity(digits.len() + digits.len() / 2);
    for (idx, ch) in head.chars().enumerate() {
        if idx > 0 && (head.len() - idx) % 2 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.push(',');
    out.push_str(last_three);
    out
}
