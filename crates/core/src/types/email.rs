//! Email address type used by registration and user profiles.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// The input string is empty.
    #[error("email cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("email must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains whitespace.
    #[error("email cannot contain whitespace")]
    Whitespace,
    /// The input does not contain an @ symbol.
    #[error("email must contain an @ symbol")]
    MissingAtSymbol,
    /// The input contains more than one @ symbol.
    #[error("email must contain exactly one @ symbol")]
    MultipleAtSymbols,
    /// The local part (before @) is empty.
    #[error("email local part cannot be empty")]
    EmptyLocalPart,
    /// The domain (after @) has no dot-separated labels.
    #[error("email domain must look like name.tld")]
    InvalidDomain,
}

/// A syntactically plausible email address.
///
/// Registration rejects addresses the backend would bounce anyway, matching
/// the `local@domain.tld` shape.
///
/// ## Constraints
///
/// - Length: 1-254 characters (RFC 5321 limit)
/// - No whitespace anywhere
/// - Exactly one @ symbol with a non-empty local part
/// - Domain contains a dot with characters on both sides
///
/// ## Examples
///
/// ```
/// use smart_parking_core::Email;
///
/// assert!(Email::parse("driver@example.com").is_ok());
/// assert!(Email::parse("first.last+parking@garage.co.uk").is_ok());
///
/// assert!(Email::parse("").is_err());                // empty
/// assert!(Email::parse("driver@localhost").is_err()); // no dot in domain
/// assert!(Email::parse("dri ver@example.com").is_err()); // whitespace
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse an `Email` from a string.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] describing the first rule the input breaks.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        if s.is_empty() {
            return Err(EmailError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if s.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let (local, domain) = s.split_once('@').ok_or(EmailError::MissingAtSymbol)?;

        if domain.contains('@') {
            return Err(EmailError::MultipleAtSymbols);
        }

        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }

        let has_inner_dot = domain
            .char_indices()
            .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());
        if !has_inner_dot {
            return Err(EmailError::InvalidDomain);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the email address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Email` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns the domain part of the email (after the @).
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split_once('@').map_or("", |(_, domain)| domain)
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_emails() {
        assert!(Email::parse("driver@example.com").is_ok());
        assert!(Email::parse("driver.name@example.com").is_ok());
        assert!(Email::parse("driver+tag@sub.example.com").is_ok());
        assert!(Email::parse("a@b.c").is_ok());
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Email::parse(""), Err(EmailError::Empty));
    }

    #[test]
    fn test_parse_too_long() {
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(
            Email::parse(&long),
            Err(EmailError::TooLong { .. })
        ));
    }

    #[test]
    fn test_parse_whitespace() {
        assert_eq!(
            Email::parse("driver @example.com"),
            Err(EmailError::Whitespace)
        );
    }

    #[test]
    fn test_parse_at_symbol_rules() {
        assert_eq!(
            Email::parse("no-at-symbol"),
            Err(EmailError::MissingAtSymbol)
        );
        assert_eq!(
            Email::parse("a@b@example.com"),
            Err(EmailError::MultipleAtSymbols)
        );
        assert_eq!(
            Email::parse("@example.com"),
            Err(EmailError::EmptyLocalPart)
        );
    }

    #[test]
    fn test_parse_domain_needs_inner_dot() {
        assert_eq!(Email::parse("driver@"), Err(EmailError::InvalidDomain));
        assert_eq!(
            Email::parse("driver@localhost"),
            Err(EmailError::InvalidDomain)
        );
        assert_eq!(
            Email::parse("driver@.com"),
            Err(EmailError::InvalidDomain)
        );
        assert_eq!(
            Email::parse("driver@example."),
            Err(EmailError::InvalidDomain)
        );
    }

    #[test]
    fn test_domain() {
        let email = Email::parse("driver@example.com").unwrap();
        assert_eq!(email.domain(), "example.com");
    }

    #[test]
    fn test_serde_is_plain_string() {
        let email = Email::parse("driver@example.com").unwrap();
        assert_eq!(
            serde_json::to_string(&email).unwrap(),
            "\"driver@example.com\""
        );
    }
}
