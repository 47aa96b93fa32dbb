use crate::error::{Result, TypesError};
use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Storage source tag recorded on contributor rows.
pub const STORAGE_SOURCE_GOOGLE_DRIVE: &str = "google-drive";

/// EVM-style wallet address identifying a contributor.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WalletAddress([u8; 20]);

impl WalletAddress {
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Parse a `0x`-prefixed (or bare) 40-digit hex address.
    pub fn from_hex(s: &str) -> Result<Self> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes =
            hex::decode(stripped).map_err(|e| TypesError::InvalidAddress(e.to_string()))?;
        if bytes.len() != 20 {
            return Err(TypesError::InvalidAddress(format!(
                "expected 20 bytes, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletAddress({})", self.to_hex())
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for WalletAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for WalletAddress {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        WalletAddress::from_hex(&s).map_err(D::Error::custom)
    }
}

/// Identity resolved from the storage provider's userinfo endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageUser {
    pub id: String,
    pub email: Option<String>,
    pub verified_email: bool,
}

/// Contributor row persisted once per proof run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contributor {
    pub wallet_address: WalletAddress,
    /// SHA-256 hex digest of the verified storage-account user id.
    pub storage_user_id_hash: Option<String>,
    pub storage_source: String,
    pub created_at: DateTime<Utc>,
}
