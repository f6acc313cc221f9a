//! Address types.

use serde::{Deserialize, Serialize};

/// A billing or shipping address as entered on the checkout form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Full name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Address line 1.
    pub line1: String,
    /// Address line 2 (apt, suite, etc.).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    /// City.
    pub city: String,
    /// State/province.
    pub state: String,
    /// Postal/ZIP code.
    pub postal_code: String,
    /// Country code (e.g., "US").
    pub country: String,
}

impl Address {
    /// Create a new address.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        line1: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        postal_code: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            line1: line1.into(),
            line2: None,
            city: city.into(),
            state: state.into(),
            postal_code: postal_code.into(),
            country: country.into(),
        }
    }

    /// Names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("email", &self.email),
            ("address", &self.line1),
            ("city", &self.city),
            ("state", &self.state),
            ("postal code", &self.postal_code),
            ("country", &self.country),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(label, _)| label)
        .collect()
    }

    /// Check if every required field is filled in.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Check if the destination fields a shipping quote needs are filled in.
    pub fn is_quotable(&self) -> bool {
        [&self.line1, &self.city, &self.state, &self.postal_code]
            .iter()
            .all(|value| !value.trim().is_empty())
    }

    /// Format as single line.
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.line1.clone()];
        if let Some(ref line2) = self.line2 {
            parts.push(line2.clone());
        }
        parts.push(self.city.clone());
        parts.push(format!("{} {}", self.state, self.postal_code));
        parts.push(self.country.clone());
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Address {
        Address::new(
            "Jane Smith",
            "jane@example.com",
            "456 Oak Ave",
            "Los Angeles",
            "CA",
            "90001",
            "US",
        )
    }

    #[test]
    fn test_complete_address() {
        let addr = sample();
        assert!(addr.is_complete());
        assert!(addr.is_quotable());
        assert_eq!(addr.one_line(), "456 Oak Ave, Los Angeles, CA 90001, US");
    }

    #[test]
    fn test_missing_fields() {
        let mut addr = sample();
        addr.email = String::new();
        addr.postal_code = "   ".to_string();

        assert_eq!(addr.missing_fields(), vec!["email", "postal code"]);
        assert!(!addr.is_complete());
        assert!(!addr.is_quotable());
    }

    #[test]
    fn test_quotable_ignores_contact_fields() {
        let mut addr = sample();
        addr.name.clear();
        addr.email.clear();
        assert!(addr.is_quotable());
        assert!(!addr.is_complete());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["postalCode"], "90001");
        assert!(json.get("line2").is_none());
    }
}
