mod config;
mod connection;
mod error;
mod game_directory;
mod models;
mod session_store;

pub use config::MongoConfig;
pub use connection::MongoHandle;
pub use error::MongoDaoError;
pub use game_directory::MongoGameDirectory;
pub use session_store::MongoSessionStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
