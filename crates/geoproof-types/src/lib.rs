pub mod account;
pub mod codes;
pub mod contribution;
pub mod coordinate;
pub mod error;
pub mod variant;

pub use account::{Contributor, StorageUser, WalletAddress, STORAGE_SOURCE_GOOGLE_DRIVE};
pub use codes::ErrorCode;
pub use contribution::{Contribution, ProofResponse};
pub use coordinate::Coordinate;
pub use error::{Result, TypesError};
pub use variant::SchemaVariant;
