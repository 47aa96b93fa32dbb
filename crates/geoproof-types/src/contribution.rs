use crate::account::WalletAddress;
use crate::codes::ErrorCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Append-only audit row persisted for each processed submission file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contribution {
    pub wallet_address: WalletAddress,
    /// External identifier of the submitted file.
    pub file_id: u64,
    pub score: f64,
    pub quality: f64,
    pub uniqueness: f64,
    pub authenticity: f64,
    pub ownership: f64,
    pub valid: bool,
    pub coordinates: u64,
    pub unique_coordinates: u64,
    /// Codes accumulated on the run up to this row; empty means none.
    pub errors: Vec<ErrorCode>,
    pub created_at: DateTime<Utc>,
}

/// Externally visible result of one proof run.
///
/// Constructed once per run and populated incrementally; every sub-score
/// and the composite stay within `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofResponse {
    pub dlp_id: u64,
    pub ownership: f64,
    pub quality: f64,
    pub authenticity: f64,
    pub uniqueness: f64,
    pub score: f64,
    pub valid: bool,
    /// Public properties describing the submission.
    #[serde(default)]
    pub attributes: Map<String, Value>,
    /// Metadata written on-chain alongside the proof.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ProofResponse {
    pub fn new(dlp_id: u64) -> Self {
        Self {
            dlp_id,
            ownership: 0.0,
            quality: 0.0,
            authenticity: 0.0,
            uniqueness: 0.0,
            score: 0.0,
            valid: false,
            attributes: Map::new(),
            metadata: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_response_is_zeroed() {
        let response = ProofResponse::new(42);
        assert_eq!(response.dlp_id, 42);
        assert_eq!(response.score, 0.0);
        assert!(!response.valid);
        assert!(response.attributes.is_empty());
    }

    #[test]
    fn test_contribution_serializes_error_codes() {
        let row = Contribution {
            wallet_address: WalletAddress::from_bytes([1; 20]),
            file_id: 7,
            score: 0.5,
            quality: 0.4,
            uniqueness: 0.6,
            authenticity: 0.0,
            ownership: 0.0,
            valid: false,
            coordinates: 10,
            unique_coordinates: 6,
            errors: vec![ErrorCode::NotEnoughData],
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["errors"][0], "NOT_ENOUGH_DATA");
        assert_eq!(json["file_id"], 7);
    }
}
