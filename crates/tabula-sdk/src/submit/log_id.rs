//! Log entry identifiers
//!
//! An id is `{chain_id}-{tag}-{transaction_hash}-{log_index}`, computed from
//! the confirmation receipt alone, so every holder of the receipt derives the
//! same id the index assigns to the entity.

use crate::error::{Result, TabulaError};
use crate::traits::Receipt;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Entity family a log entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionTag {
    #[serde(rename = "P")]
    Publication,
    #[serde(rename = "A")]
    Article,
    #[serde(rename = "X")]
    Permission,
}

impl ActionTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionTag::Publication => "P",
            ActionTag::Article => "A",
            ActionTag::Permission => "X",
        }
    }
}

impl std::fmt::Display for ActionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionTag {
    type Err = TabulaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "P" | "p" | "publication" => Ok(ActionTag::Publication),
            "A" | "a" | "article" => Ok(ActionTag::Article),
            "X" | "x" | "permission" => Ok(ActionTag::Permission),
            other => Err(TabulaError::InvalidInput(format!("unknown action tag: {}", other))),
        }
    }
}

/// Identifier of one materialized log entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogEntryId {
    id: String,
    parts: LogEntryParts,
}

/// Components of a [`LogEntryId`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogEntryParts {
    pub chain_id: u64,
    pub tag: ActionTag,
    pub transaction_hash: String,
    pub log_index: u64,
}

impl LogEntryId {
    /// Derive the id from a confirmation receipt
    ///
    /// Uses the first log of the receipt; a receipt without logs did not
    /// produce an entry.
    pub fn derive(chain_id: u64, tag: ActionTag, receipt: &Receipt) -> Result<Self> {
        let log = receipt.logs.first().ok_or_else(|| {
            TabulaError::TransactionFailed(format!(
                "receipt {} carries no logs",
                receipt.transaction_hash
            ))
        })?;
        Ok(Self::from_parts(LogEntryParts {
            chain_id,
            tag,
            transaction_hash: receipt.transaction_hash.clone(),
            log_index: log.log_index,
        }))
    }

    pub fn from_parts(parts: LogEntryParts) -> Self {
        let id = format!(
            "{}-{}-{}-{}",
            parts.chain_id, parts.tag, parts.transaction_hash, parts.log_index
        );
        Self { id, parts }
    }

    /// Parse and validate an id, e.g. a route parameter
    pub fn parse(value: &str) -> Result<Self> {
        let parts = Self::split(value)?;
        Ok(Self {
            id: value.to_string(),
            parts,
        })
    }

    pub fn parts(&self) -> &LogEntryParts {
        &self.parts
    }

    /// Chain the entry was written on
    pub fn chain_id(&self) -> u64 {
        self.parts.chain_id
    }

    pub fn tag(&self) -> ActionTag {
        self.parts.tag
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }

    fn split(value: &str) -> Result<LogEntryParts> {
        let invalid = || TabulaError::InvalidInput(format!("invalid log entry id: {}", value));

        let mut fields = value.splitn(4, '-');
        let chain_id = fields.next().and_then(|f| f.parse().ok()).ok_or_else(invalid)?;
        let tag = fields
            .next()
            .and_then(|f| match f {
                "P" => Some(ActionTag::Publication),
                "A" => Some(ActionTag::Article),
                "X" => Some(ActionTag::Permission),
                _ => None,
            })
            .ok_or_else(invalid)?;
        let transaction_hash = fields.next().filter(|f| !f.is_empty()).ok_or_else(invalid)?;
        let log_index = fields.next().and_then(|f| f.parse().ok()).ok_or_else(invalid)?;

        Ok(LogEntryParts {
            chain_id,
            tag,
            transaction_hash: transaction_hash.to_string(),
            log_index,
        })
    }
}

impl std::fmt::Display for LogEntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

impl TryFrom<String> for LogEntryId {
    type Error = TabulaError;

    fn try_from(value: String) -> Result<Self> {
        let parts = Self::split(&value)?;
        Ok(Self { id: value, parts })
    }
}

impl From<LogEntryId> for String {
    fn from(id: LogEntryId) -> Self {
        id.id
    }
}

impl FromStr for LogEntryId {
    type Err = TabulaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for LogEntryId {
    fn as_ref(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::LogRef;

    fn receipt(logs: Vec<u64>) -> Receipt {
        Receipt {
            transaction_hash: "0x5e1f".into(),
            block_hash: "0xb10c".into(),
            logs: logs.into_iter().map(|log_index| LogRef { log_index }).collect(),
        }
    }

    #[test]
    fn test_derive_uses_first_log() {
        let id = LogEntryId::derive(11155111, ActionTag::Article, &receipt(vec![3, 4])).unwrap();
        assert_eq!(id.as_str(), "11155111-A-0x5e1f-3");
    }

    #[test]
    fn test_derive_is_pure() {
        let r = receipt(vec![0]);
        let a = LogEntryId::derive(10, ActionTag::Publication, &r).unwrap();
        let b = LogEntryId::derive(10, ActionTag::Publication, &r.clone()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_derive_without_logs_fails() {
        assert!(matches!(
            LogEntryId::derive(1, ActionTag::Permission, &receipt(vec![])),
            Err(TabulaError::TransactionFailed(_))
        ));
    }

    #[test]
    fn test_parse_recovers_parts() {
        let id: LogEntryId = "137-X-0xabc-12".parse().unwrap();
        let parts = id.parts();
        assert_eq!(parts.chain_id, 137);
        assert_eq!(parts.tag, ActionTag::Permission);
        assert_eq!(parts.transaction_hash, "0xabc");
        assert_eq!(parts.log_index, 12);
        assert_eq!(id.chain_id(), 137);
    }

    #[test]
    fn test_serde_as_plain_string() {
        let id = LogEntryId::parse("1-P-0xabc-0").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"1-P-0xabc-0\"");
        let back: LogEntryId = serde_json::from_str("\"1-P-0xabc-0\"").unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<LogEntryId>("\"nope\"").is_err());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "abc", "1-P-0xabc", "1-Q-0xabc-0", "x-P-0xabc-0", "1-P--0", "1-P-0xabc-z"] {
            assert!(LogEntryId::parse(bad).is_err(), "{} should not parse", bad);
        }
    }
}
