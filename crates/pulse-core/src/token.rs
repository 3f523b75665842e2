//! # Invite Tokens
//!
//! Guest invite links carry a bearer token: 32 bytes from the operating
//! system RNG, hex-encoded. Possession of the token is the only credential a
//! guest presents, so the token is never written to logs.

use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Number of random bytes in a token.
const TOKEN_BYTES: usize = 32;

/// Length of the hex-encoded token.
pub const TOKEN_HEX_LEN: usize = TOKEN_BYTES * 2;

/// A guest invite token: 64 lowercase hex characters.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InviteToken(String);

impl InviteToken {
    /// Generate a fresh token from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Parse a token presented by a client.
    ///
    /// Surrounding whitespace is ignored. Uppercase hex is rejected so that
    /// every token has exactly one textual form.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        let well_formed = raw.len() == TOKEN_HEX_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !well_formed {
            return Err(ValidationError::InvalidToken);
        }
        Ok(Self(raw.to_string()))
    }

    /// The token text, for building magic links and database lookups.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for InviteToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InviteToken({}…)", &self.0[..6])
    }
}

impl TryFrom<String> for InviteToken {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<InviteToken> for String {
    fn from(value: InviteToken) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn generated_token_is_well_formed() {
        let token = InviteToken::generate();
        assert_eq!(token.as_str().len(), TOKEN_HEX_LEN);
        assert_eq!(InviteToken::parse(token.as_str()).unwrap(), token);
    }

    #[test]
    fn generated_tokens_differ() {
        assert_ne!(InviteToken::generate(), InviteToken::generate());
    }

    #[test]
    fn debug_does_not_leak_token() {
        let token = InviteToken::generate();
        let debug = format!("{token:?}");
        assert!(!debug.contains(token.as_str()));
        assert!(debug.starts_with("InviteToken("));
    }

    #[test]
    fn parse_rejects_bad_tokens() {
        assert!(InviteToken::parse("").is_err());
        assert!(InviteToken::parse("abc123").is_err());
        assert!(InviteToken::parse(&"g".repeat(64)).is_err());
        assert!(InviteToken::parse(&"A".repeat(64)).is_err());
        assert!(InviteToken::parse(&"a".repeat(65)).is_err());
    }

    proptest! {
        #[test]
        fn parse_accepts_any_lower_hex_of_correct_length(s in "[0-9a-f]{64}") {
            let token = InviteToken::parse(&s).unwrap();
            prop_assert_eq!(token.as_str(), s.as_str());
        }

        #[test]
        fn parse_rejects_wrong_lengths(s in "[0-9a-f]{0,63}") {
            prop_assert!(InviteToken::parse(&s).is_err());
        }
    }
}
