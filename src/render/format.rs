use serde_json::{Number, Value};
use std::fmt;

/// How a single result field is shown in the generic listing.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayValue {
    /// Null or absent value, shown as "n/a".
    Missing,
    /// An empty array, shown as "vacío".
    Empty,
    /// An all-numeric array: element count, average and the values themselves.
    /// `collapsed` is set when there are too many values to show inline.
    NumberSummary {
        count: usize,
        average: String,
        values: Vec<String>,
        collapsed: bool,
    },
    /// Any other array, shown as its element count.
    Items(usize),
    /// A nested object, shown collapsible with pretty-printed JSON behind `summary`.
    Nested { summary: String, body: String },
    Bool(bool),
    Number(String),
    Link(String),
    Text(String),
}

// Arrays longer than this are summarized with their values collapsed.
const INLINE_VALUES_LIMIT: usize = 5;

impl fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayValue::Missing => f.write_str("n/a"),
            DisplayValue::Empty => f.write_str("vacío"),
            DisplayValue::NumberSummary {
                count,
                average,
                values,
                collapsed,
            } => {
                write!(f, "Total: {} elementos, Promedio: {}", count, average)?;
                if *collapsed {
                    write!(f, " (ver todos los valores: {})", values.join(", "))
                } else {
                    write!(f, ", Valores: {}", values.join(", "))
                }
            }
            DisplayValue::Items(count) => write!(f, "{} elementos", count),
            DisplayValue::Nested { summary, body } => write!(f, "[{}]\n{}", summary, body),
            DisplayValue::Bool(true) => f.write_str("Sí"),
            DisplayValue::Bool(false) => f.write_str("No"),
            DisplayValue::Number(n) => f.write_str(n),
            DisplayValue::Link(url) => f.write_str(url),
            DisplayValue::Text(s) => write!(f, "\"{}\"", s),
        }
    }
}

/// Turns a field name into a label.
///
/// # Arguments
///
/// * `key` - The raw field name, e.g. `avg_sequence_length`.
///
/// # Returns
///
/// The key with underscores replaced by spaces and the first character of every word
/// upper-cased, e.g. `Avg Sequence Length`.
pub fn humanize_label(key: &str) -> String {
    let mut label = String::with_capacity(key.len());
    let mut at_word_start = true;
    for c in key.chars() {
        let c = if c == '_' { ' ' } else { c };
        let is_word = c.is_alphanumeric();
        if is_word && at_word_start {
            label.extend(c.to_uppercase());
        } else {
            label.push(c);
        }
        at_word_start = !is_word;
    }
    label
}

/// Formats a field value for the generic listing.
///
/// # Arguments
///
/// * `key` - The field name; numbers are formatted according to it.
/// * `value` - The JSON value to format.
///
/// # Returns
///
/// The `DisplayValue` to show. Objects collapse to a summary; `results` objects are labelled
/// "Detalles".
pub fn format_value(key: &str, value: &Value) -> DisplayValue {
    match value {
        Value::Null => DisplayValue::Missing,
        Value::Bool(b) => DisplayValue::Bool(*b),
        Value::Number(n) => DisplayValue::Number(format_number(key, n)),
        Value::String(s) if s.starts_with("http") => DisplayValue::Link(s.clone()),
        Value::String(s) => DisplayValue::Text(s.clone()),
        Value::Array(items) if items.is_empty() => DisplayValue::Empty,
        Value::Array(items) => match items.iter().map(Value::as_f64).collect::<Option<Vec<_>>>() {
            Some(numbers) => {
                let average = numbers.iter().sum::<f64>() / numbers.len() as f64;
                DisplayValue::NumberSummary {
                    count: numbers.len(),
                    average: format!("{:.2}", average),
                    values: items
                        .iter()
                        .filter_map(|v| v.as_number().map(plain_number))
                        .collect(),
                    collapsed: numbers.len() > INLINE_VALUES_LIMIT,
                }
            }
            None => DisplayValue::Items(items.len()),
        },
        Value::Object(_) => DisplayValue::Nested {
            summary: if key == "results" {
                "Detalles".to_string()
            } else {
                key.to_string()
            },
            body: serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
        },
    }
}

/// Formats a number using a heuristic on its field name.
///
/// # Arguments
///
/// * `key` - The field name. Names containing `percent` or `gc_content` are percentages,
///   names containing `length` or `count` are quantities.
/// * `number` - The value to format.
///
/// # Returns
///
/// `33.33%` for percentages (two decimals), `1,500` for quantities (grouped digits), the
/// plain number otherwise.
pub fn format_number(key: &str, number: &Number) -> String {
    let key = key.to_lowercase();
    let value = number.as_f64().unwrap_or(0.0);

    if key.contains("percent") || key.contains("gc_content") {
        format!("{:.2}%", value)
    } else if key.contains("length") || key.contains("count") {
        group_thousands(value)
    } else {
        plain_number(number)
    }
}

/// Groups the integer digits in threes with `,` and keeps at most three decimals.
pub fn group_thousands(value: f64) -> String {
    // past 1e15 the milli-rounding below loses precision and huge magnitudes overflow
    if !value.is_finite() || value.abs() >= 1e15 {
        return plain_float(value);
    }
    let rounded = (value * 1000.0).round() / 1000.0;
    let sign = if rounded < 0.0 { "-" } else { "" };
    let abs = rounded.abs();

    let digits = format!("{}", abs.trunc() as u128);
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let fraction = format!("{:.3}", abs.fract());
    let fraction = fraction.trim_start_matches('0').trim_end_matches('0');
    if fraction == "." || fraction.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}{}", sign, grouped, fraction)
    }
}

// Integral floats print without a trailing ".0".
fn plain_number(number: &Number) -> String {
    if number.is_i64() || number.is_u64() {
        return number.to_string();
    }
    match number.as_f64() {
        Some(f) => plain_float(f),
        None => number.to_string(),
    }
}

fn plain_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}
