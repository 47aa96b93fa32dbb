use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes accumulated on a proof run.
///
/// Codes are collected in order on the run, never raised; a run with any
/// code present yields `valid = false`. The serialized names are the wire
/// format consumed downstream and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No storage-account token was configured for the run.
    MissingStorageToken,
    /// The token did not resolve to a storage-account user.
    UnverifiedStorageUser,
    /// The storage-account email is unverified.
    UnverifiedStorageEmail,
    /// The ledger already records contributions for this wallet.
    DuplicateContribution,
    /// A submission file failed structural schema validation.
    InvalidSchema,
    /// A submission file carried fewer coordinates than the minimum.
    NotEnoughData,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingStorageToken => "MISSING_STORAGE_TOKEN",
            ErrorCode::UnverifiedStorageUser => "UNVERIFIED_STORAGE_USER",
            ErrorCode::UnverifiedStorageEmail => "UNVERIFIED_STORAGE_EMAIL",
            ErrorCode::DuplicateContribution => "DUPLICATE_CONTRIBUTION",
            ErrorCode::InvalidSchema => "INVALID_SCHEMA",
            ErrorCode::NotEnoughData => "NOT_ENOUGH_DATA",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        let serialized = serde_json::to_string(&ErrorCode::DuplicateContribution).unwrap();
        assert_eq!(serialized, "\"DUPLICATE_CONTRIBUTION\"");

        let parsed: ErrorCode = serde_json::from_str("\"NOT_ENOUGH_DATA\"").unwrap();
        assert_eq!(parsed, ErrorCode::NotEnoughData);
    }

    #[test]
    fn test_display_matches_serde() {
        for code in [
            ErrorCode::MissingStorageToken,
            ErrorCode::UnverifiedStorageUser,
            ErrorCode::UnverifiedStorageEmail,
            ErrorCode::DuplicateContribution,
            ErrorCode::InvalidSchema,
            ErrorCode::NotEnoughData,
        ] {
            let serialized = serde_json::to_string(&code).unwrap();
            assert_eq!(serialized, format!("\"{}\"", code));
        }
    }
}
