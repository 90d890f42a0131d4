//! Display formatting for exported tables

use crate::Value;

/// Columns shown as currency
pub const CURRENCY_FIELDS: [&str; 5] = [
    "Cost",
    "NetCost",
    "LimitNetCost",
    "Income",
    "CostEfficiency",
];

/// Check if `name` is displayed with a currency prefix
pub fn is_currency(name: &str) -> bool {
    CURRENCY_FIELDS.contains(&name)
}

/// Round to two decimals; `NaN` and infinities are spelled out
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        // avoid "-0"
        return "0".to_string();
    }
    format!("{}", rounded)
}

/// Format one table cell; missing values are empty
pub fn format_cell(name: &str, value: Option<&Value>) -> String {
    match value {
        None => String::new(),
        Some(v) => match v.as_float() {
            Some(number) => {
                let text = format_number(number);
                if is_currency(name) && number.is_finite() {
                    format!("${}", text)
                } else {
                    text
                }
            }
            None => v.to_string(),
        },
    }
}

/// Join fields into one CSV line, quoting where needed
pub fn csv_line(fields: &[String]) -> String {
    fields
        .iter()
        .map(|field| {
            if field.contains([',', '"', '\n']) {
                format!("\"{}\"", field.replace('"', "\"\""))
            } else {
                field.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(25.0), "25");
        assert_eq!(format_number(2.345678), "2.35");
        assert_eq!(format_number(-0.001), "0");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "inf");
    }

    #[test]
    fn test_format_cell() {
        assert_eq!(format_cell("Cost", Some(&Value::Int(300))), "$300");
        assert_eq!(format_cell("CostEfficiency", Some(&Value::Float(f64::NAN))), "NaN");
        assert_eq!(format_cell("Damage", Some(&Value::Float(1.0 / 3.0))), "0.33");
        assert_eq!(format_cell("Hidden", Some(&Value::Bool(true))), "true");
        assert_eq!(format_cell("UnitToSend", Some(&Value::from("Humvee"))), "Humvee");
        assert_eq!(format_cell("Damage", None), "");
    }

    #[test]
    fn test_csv_line() {
        let fields = vec!["a".to_string(), "b,c".to_string(), "say \"hi\"".to_string()];
        assert_eq!(csv_line(&fields), "a,\"b,c\",\"say \"\"hi\"\"\"");
    }
}
