//! Subscriber identifiers (email address or phone number).

use std::fmt;
use std::str::FromStr;

use email_address::EmailAddress;

/// Longest identifier accepted; matches the `wifi_sessions.user_id` column.
pub const MAX_IDENTIFIER_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("identifier required")]
    Empty,
    #[error("identifier longer than {MAX_IDENTIFIER_LEN} characters")]
    TooLong,
}

/// How a subscriber can be reached, derived from the identifier's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierKind {
    Email,
    Phone,
    Unknown,
}

/// The key a portal session is stored under. Surrounding whitespace is trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::Empty);
        }
        if trimmed.chars().count() > MAX_IDENTIFIER_LEN {
            return Err(IdentifierError::TooLong);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A syntactically valid email address wins over the digits-only rule.
    pub fn kind(&self) -> IdentifierKind {
        if EmailAddress::is_valid(&self.0) {
            IdentifierKind::Email
        } else if self.0.bytes().all(|b| b.is_ascii_digit()) {
            IdentifierKind::Phone
        } else {
            IdentifierKind::Unknown
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
