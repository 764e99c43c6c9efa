use crate::error::{BotError, BotResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::fmt;

const MASK: &str = "******";
const MASK_KEEP_HEAD: usize = 6;
const MASK_KEEP_TAIL: usize = 4;

/// Renders `0xABCDEF1234567890` as `0xABCD******7890`. Identifiers of ten
/// characters or fewer are returned unchanged.
pub fn mask_account(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    if chars.len() <= MASK_KEEP_HEAD + MASK_KEEP_TAIL {
        return id.to_string();
    }
    let head: String = chars[..MASK_KEEP_HEAD].iter().collect();
    let tail: String = chars[chars.len() - MASK_KEEP_TAIL..].iter().collect();
    format!("{}{}{}", head, MASK, tail)
}

/// Session-side identity of an account: standard base64 of the identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerIdentity(String);

impl WorkerIdentity {
    pub fn derive(account: &str) -> Self {
        Self(BASE64.encode(account.as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recovers the account identifier the identity was derived from.
    pub fn decode(&self) -> BotResult<String> {
        let bytes = BASE64
            .decode(&self.0)
            .map_err(|e| BotError::decode("worker identity", e))?;
        String::from_utf8(bytes).map_err(|e| BotError::decode("worker identity", e))
    }

    pub fn masked(&self) -> String {
        mask_account(&self.0)
    }
}

impl fmt::Display for WorkerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One loaded account. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: String,
    masked: String,
    identity: WorkerIdentity,
}

impl Account {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            masked: mask_account(&id),
            identity: WorkerIdentity::derive(&id),
            id,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn masked(&self) -> &str {
        &self.masked
    }

    pub fn identity(&self) -> &WorkerIdentity {
        &self.identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_long_identifier() {
        assert_eq!(mask_account("0xABCDEF1234567890"), "0xABCD******7890");
    }

    #[test]
    fn test_mask_short_identifier_unchanged() {
        assert_eq!(mask_account("0x12345678"), "0x12345678");
        assert_eq!(mask_account(""), "");
    }

    #[test]
    fn test_identity_is_reversible() {
        let account = Account::new("0xABCDEF1234567890");
        assert_eq!(account.identity().as_str(), "MHhBQkNERUYxMjM0NTY3ODkw");
        assert_eq!(
            account.identity().decode().expect("decodes"),
            "0xABCDEF1234567890"
        );
        assert_eq!(account.masked(), "0xABCD******7890");
    }
}
