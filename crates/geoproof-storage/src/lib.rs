pub mod backend;
pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocks;
pub mod store;

pub use backend::{DedupBackend, InsertOutcome, InsertStats, Result, StorageError};
pub use memory::MemoryBackend;
#[cfg(feature = "rocksdb")]
pub use rocks::RocksBackend;
pub use store::{BackendType, DedupStore, StoreConfig};
