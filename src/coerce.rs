//! Numeric coercion for loosely typed upstream fields.
//!
//! Upstream payloads carry numbers as JSON numbers, as formatted strings
//! (`"$1,234.56"`, `"R$ 560,54"`), as `null`, or not at all. Everything is
//! funnelled through [`NumberParser`] so the rest of the crate only ever sees
//! an [`Amount`]: finite and non-negative.

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// A field as it arrived on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawField {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl RawField {
    /// Text form of the field, used for names, labels and status codes.
    pub fn label(&self) -> Option<String> {
        let text = match self {
            RawField::Number(value) => value.to_string(),
            RawField::Text(text) => text.trim().to_string(),
            RawField::Other(_) => return None,
        };
        if text.is_empty() { None } else { Some(text) }
    }
}

impl From<serde_json::Value> for RawField {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(number) => match number.as_f64() {
                Some(value) => RawField::Number(value),
                None => RawField::Other(serde_json::Value::Number(number)),
            },
            serde_json::Value::String(text) => RawField::Text(text),
            other => RawField::Other(other),
        }
    }
}

impl From<f64> for RawField {
    fn from(value: f64) -> Self {
        RawField::Number(value)
    }
}

impl From<&str> for RawField {
    fn from(value: &str) -> Self {
        RawField::Text(value.to_string())
    }
}

/// Which character separates the fractional part in formatted amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecimalSeparator {
    /// `1,234.56`
    #[default]
    Dot,
    /// `1.234,56`
    Comma,
}

impl FromStr for DecimalSeparator {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dot" | "." | "en" | "us" => Ok(Self::Dot),
            "comma" | "," | "pt" | "br" => Ok(Self::Comma),
            other => Err(format!("unknown decimal separator '{other}'")),
        }
    }
}

/// A finite, non-negative quantity.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
#[serde(transparent)]
pub struct Amount(f64);

impl Amount {
    pub const ZERO: Amount = Amount(0.0);

    /// Anything that is not a finite positive number collapses to zero.
    pub fn new(value: f64) -> Self {
        if value.is_finite() && value > 0.0 {
            Amount(value)
        } else {
            Amount::ZERO
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }

    /// Nearest whole number, for counts that arrive as floats.
    pub fn count(self) -> u64 {
        self.0.round() as u64
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount::new(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        *self = *self + rhs;
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, Add::add)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NumberParser {
    separator: DecimalSeparator,
}

impl NumberParser {
    pub fn new(separator: DecimalSeparator) -> Self {
        Self { separator }
    }

    /// `None` when the field is missing or holds nothing numeric.
    pub fn parse(&self, field: Option<&RawField>) -> Option<Amount> {
        match field? {
            RawField::Number(value) => Some(Amount::new(*value)),
            RawField::Text(text) => self.parse_text(text).map(Amount::new),
            RawField::Other(_) => None,
        }
    }

    pub fn amount(&self, field: Option<&RawField>) -> Amount {
        self.parse(field).unwrap_or_default()
    }

    pub fn count(&self, field: Option<&RawField>) -> u64 {
        self.amount(field).count()
    }

    fn parse_text(&self, raw: &str) -> Option<f64> {
        let (decimal, grouping) = match self.separator {
            DecimalSeparator::Dot => ('.', ','),
            DecimalSeparator::Comma => (',', '.'),
        };

        let mut cleaned = String::with_capacity(raw.len());
        for ch in raw.trim().chars() {
            if ch.is_ascii_digit() {
                cleaned.push(ch);
            } else if ch == decimal {
                cleaned.push('.');
            } else if ch == '-' && cleaned.is_empty() {
                cleaned.push('-');
            } else if ch == grouping {
                continue;
            }
        }

        cleaned.parse::<f64>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dot() -> NumberParser {
        NumberParser::new(DecimalSeparator::Dot)
    }

    fn comma() -> NumberParser {
        NumberParser::new(DecimalSeparator::Comma)
    }

    fn field(value: serde_json::Value) -> Option<RawField> {
        serde_json::from_value::<Option<RawField>>(value).unwrap()
    }

    #[test]
    fn parses_plain_numbers() {
        assert_eq!(dot().amount(field(json!(544.46)).as_ref()).get(), 544.46);
        assert_eq!(dot().count(field(json!(532)).as_ref()), 532);
    }

    #[test]
    fn strips_currency_and_grouping_for_dot_locale() {
        let parsed = dot().amount(field(json!("$1,234.56")).as_ref());
        assert!((parsed.get() - 1234.56).abs() < 1e-9);
    }

    #[test]
    fn strips_currency_and_grouping_for_comma_locale() {
        let parsed = comma().amount(field(json!("R$ 560,54")).as_ref());
        assert!((parsed.get() - 560.54).abs() < 1e-9);

        let grouped = comma().amount(field(json!("R$ 1.234,56")).as_ref());
        assert!((grouped.get() - 1234.56).abs() < 1e-9);
    }

    #[test]
    fn unusable_input_becomes_zero() {
        for value in [
            json!(null),
            json!("n/a"),
            json!(""),
            json!(true),
            json!([1, 2]),
            json!({"value": 3}),
            json!(-12.5),
            json!("-$40.00"),
            json!("1.2.3"),
        ] {
            assert_eq!(dot().amount(field(value.clone()).as_ref()), Amount::ZERO, "{value}");
        }
        assert_eq!(dot().amount(None), Amount::ZERO);
    }

    #[test]
    fn parse_distinguishes_missing_from_zero() {
        assert_eq!(dot().parse(None), None);
        assert_eq!(dot().parse(field(json!("n/a")).as_ref()), None);
        assert_eq!(dot().parse(field(json!(0)).as_ref()), Some(Amount::ZERO));
        assert_eq!(dot().parse(field(json!(-3)).as_ref()), Some(Amount::ZERO));
    }

    #[test]
    fn amount_rejects_non_finite_values() {
        assert_eq!(Amount::new(f64::NAN), Amount::ZERO);
        assert_eq!(Amount::new(f64::INFINITY), Amount::ZERO);
        assert_eq!(Amount::new(-0.0), Amount::ZERO);
    }

    #[test]
    fn labels_trim_and_skip_structured_values() {
        assert_eq!(RawField::from("  ENABLED ").label().as_deref(), Some("ENABLED"));
        assert_eq!(RawField::from("   ").label(), None);
        assert_eq!(RawField::Other(json!({})).label(), None);
        assert_eq!(RawField::from(42.0).label().as_deref(), Some("42"));
    }

    #[test]
    fn separator_from_config_string() {
        assert_eq!("comma".parse::<DecimalSeparator>(), Ok(DecimalSeparator::Comma));
        assert_eq!("DOT".parse::<DecimalSeparator>(), Ok(DecimalSeparator::Dot));
        assert!("semicolon".parse::<DecimalSeparator>().is_err());
    }
}
