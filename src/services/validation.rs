//! Input validation shared by services. Failures are reported per field.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use crate::database::models::client::ClientKind;
use crate::error::ApiError;

/// Trimmed, non-empty required text
pub fn required(field: &str, value: &str, max_len: usize) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::invalid_field(field, "Field is required"));
    }
    if trimmed.chars().count() > max_len {
        return Err(ApiError::invalid_field(field, format!("Must be at most {} characters", max_len)));
    }
    Ok(trimmed.to_string())
}

/// Blank optional text collapses to `None`
pub fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Deserialize a nullable patch field: absent stays `None`, `null` becomes `Some(None)`.
///
/// Use with `#[serde(default, deserialize_with = "validation::nullable")]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Apply a nullable patch field over the stored value
pub fn patch<T>(update: Option<Option<T>>, current: Option<T>) -> Option<T> {
    match update {
        Some(value) => value,
        None => current,
    }
}

pub fn email(field: &str, value: &str) -> Result<String, ApiError> {
    let value = value.trim().to_lowercase();
    let mut parts = value.split('@');
    let valid = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && !domain.is_empty() && !value.chars().any(char::is_whitespace)
        }
        _ => false,
    };
    if !valid {
        return Err(ApiError::invalid_field(field, "Invalid email format"));
    }
    Ok(value)
}

/// CPF (11 digits) for individuals, CNPJ (14 digits) for companies. Punctuation is stripped.
pub fn document(kind: ClientKind, value: &str) -> Result<String, ApiError> {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    let stripped_only_punctuation = value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '/' | ' '));
    let expected = match kind {
        ClientKind::Individual => 11,
        ClientKind::Company => 14,
    };
    if !stripped_only_punctuation || digits.len() != expected {
        return Err(ApiError::invalid_field(
            "document",
            format!("Document must have {} digits for a {} client", expected, kind),
        ));
    }
    Ok(digits)
}

/// Strictly positive amount with at most two decimal places
pub fn money(field: &str, value: Decimal) -> Result<Decimal, ApiError> {
    if value <= Decimal::ZERO {
        return Err(ApiError::invalid_field(field, "Amount must be greater than zero"));
    }
    if value.normalize().scale() > 2 {
        return Err(ApiError::invalid_field(field, "Amount must have at most 2 decimal places"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn documents() {
        assert_eq!(document(ClientKind::Individual, "123.456.789-09").unwrap(), "12345678909");
        assert_eq!(document(ClientKind::Company, "12.345.678/0001-95").unwrap(), "12345678000195");
        assert!(document(ClientKind::Company, "123.456.789-09").is_err());
        assert!(document(ClientKind::Individual, "1234567890a").is_err());
    }

    #[test]
    fn emails() {
        assert_eq!(email("email", " Ana@Silva.ADV.br ").unwrap(), "ana@silva.adv.br");
        assert!(email("email", "ana").is_err());
        assert!(email("email", "@silva.adv.br").is_err());
        assert!(email("email", "ana@").is_err());
        assert!(email("email", "a@b@c").is_err());
        assert!(email("email", "an a@b.c").is_err());
    }

    #[test]
    fn money_rules() {
        assert!(money("amount", Decimal::from_str("10.50").unwrap()).is_ok());
        assert!(money("amount", Decimal::from_str("10.500").unwrap()).is_ok());
        assert!(money("amount", Decimal::from_str("10.505").unwrap()).is_err());
        assert!(money("amount", Decimal::ZERO).is_err());
        assert!(money("amount", Decimal::from_str("-1").unwrap()).is_err());
    }

    #[test]
    fn required_trims_and_limits() {
        assert_eq!(required("name", "  Ana  ", 10).unwrap(), "Ana");
        assert!(required("name", "   ", 10).is_err());
        assert!(required("name", "abcdefghijk", 10).is_err());
        assert_eq!(optional(Some("  ".into())), None);
    }

    #[derive(Deserialize)]
    struct Update {
        #[serde(default, deserialize_with = "nullable")]
        notes: Option<Option<String>>,
    }

    #[test]
    fn nullable_distinguishes_absent_from_null() {
        let absent: Update = serde_json::from_value(serde_json::json!({})).unwrap();
        let cleared: Update = serde_json::from_value(serde_json::json!({"notes": null})).unwrap();
        let set: Update = serde_json::from_value(serde_json::json!({"notes": "x"})).unwrap();

        let stored = Some("old".to_string());
        assert_eq!(patch(absent.notes, stored.clone()), stored);
        assert_eq!(patch(cleared.notes, stored.clone()), None);
        assert_eq!(patch(set.notes, stored), Some("x".to_string()));
    }
}
