use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

lazy_static::lazy_static! {
    static ref HANDLE_REGEX: Regex = Regex::new(r"^@?[A-Za-z0-9_]{3,32}$").unwrap();
    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[0-9 ()\-]{6,20}$").unwrap();
}

/// How the shop reaches the customer. At least one field must be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_any_contact", skip_on_field_errors = false))]
pub struct ContactDetails {
    #[validate(regex(
        path = "HANDLE_REGEX",
        message = "Telegram handle must be 3-32 letters, digits or underscores"
    ))]
    pub handle: Option<String>,

    #[validate(regex(path = "PHONE_REGEX", message = "Phone number looks invalid"))]
    pub phone: Option<String>,
}

fn validate_any_contact(contact: &ContactDetails) -> Result<(), ValidationError> {
    if contact.handle.is_none() && contact.phone.is_none() {
        return Err(ValidationError::new("contact_required"));
    }
    Ok(())
}

impl ContactDetails {
    /// Trims both fields; blank input counts as absent.
    pub fn new(handle: Option<String>, phone: Option<String>) -> Self {
        let clean = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            handle: clean(handle),
            phone: clean(phone),
        }
    }

    /// Handle as shown to the shop, always `@`-prefixed.
    pub fn display_handle(&self) -> Option<String> {
        self.handle.as_ref().map(|h| {
            if h.starts_with('@') {
                h.clone()
            } else {
                format!("@{}", h)
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderStatus {
    #[default]
    Idle,
    Loading,
    Success,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Idle => write!(f, "idle"),
            OrderStatus::Loading => write!(f, "sending"),
            OrderStatus::Success => write!(f, "sent"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(handle: Option<&str>, phone: Option<&str>) -> ContactDetails {
        ContactDetails::new(handle.map(String::from), phone.map(String::from))
    }

    #[test]
    fn test_valid_contacts() {
        assert!(contact(Some("@buyer_01"), None).validate().is_ok());
        assert!(contact(None, Some("+66 81 234 5678")).validate().is_ok());
        assert!(contact(Some("buyer"), Some("081-234-5678")).validate().is_ok());
    }

    #[test]
    fn test_blank_contacts_rejected() {
        assert!(contact(None, None).validate().is_err());
        assert!(contact(Some("   "), Some("")).validate().is_err());
    }

    #[test]
    fn test_malformed_fields_rejected() {
        assert!(contact(Some("@a"), None).validate().is_err());
        assert!(contact(Some("bad handle!"), None).validate().is_err());
        assert!(contact(None, Some("call me")).validate().is_err());
    }

    #[test]
    fn test_display_handle_adds_at() {
        assert_eq!(contact(Some("buyer"), None).display_handle().as_deref(), Some("@buyer"));
        assert_eq!(contact(Some("@buyer"), None).display_handle().as_deref(), Some("@buyer"));
        assert_eq!(contact(None, Some("12345678")).display_handle(), None);
    }
}
