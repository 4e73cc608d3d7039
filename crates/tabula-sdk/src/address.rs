//! Content address handle

use crate::error::{Result, TabulaError};
use cid::Cid;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Gateway prefix the editor uses when displaying embedded media
pub const DEFAULT_GATEWAY: &str = "https://ipfs.io/ipfs/";

/// Opaque content address (content hash) returned by a content store
///
/// Never mutated once created. Identical bytes always map to the same
/// address under a given store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentAddress(String);

impl ContentAddress {
    /// Parse and validate a CID string (v0 `Qm…` or v1 `baf…`)
    pub fn parse(value: &str) -> Result<Self> {
        Cid::from_str(value)
            .map_err(|e| TabulaError::InvalidInput(format!("invalid content address {}: {}", value, e)))?;
        Ok(Self(value.to_string()))
    }

    /// Wrap a handle without validating it
    ///
    /// Used for addresses lifted out of rich text and for stores whose
    /// handles are not CIDs.
    pub fn unchecked(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Address of an already computed CID
    pub fn from_cid(cid: &Cid) -> Self {
        Self(cid.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Whether the handle parses as a CID
    pub fn is_cid(&self) -> bool {
        Cid::from_str(&self.0).is_ok()
    }

    /// Gateway URL under which the content can be displayed
    pub fn display_url(&self, gateway: &str) -> String {
        display_url(&self.0, gateway)
    }
}

impl std::fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ContentAddress {
    type Err = TabulaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Normalize a gateway prefix so that `prefix + address` is a valid URL
pub fn normalize_gateway(gateway: &str) -> String {
    if gateway.ends_with('/') {
        gateway.to_string()
    } else {
        format!("{}/", gateway)
    }
}

/// Gateway URL for a bare address
pub fn display_url(address: &str, gateway: &str) -> String {
    format!("{}{}", normalize_gateway(gateway), address)
}
