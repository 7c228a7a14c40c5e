/// External game schedule consumed by the live-scoring core.
pub mod game_directory;
/// Database model definitions.
pub mod models;
/// MongoDB-backed implementations of the storage traits.
#[cfg(feature = "mongo-store")]
pub mod mongodb;
/// Persistence of live sessions and inning scores.
pub mod session_store;
/// Storage abstraction layer for database operations.
pub mod storage;
