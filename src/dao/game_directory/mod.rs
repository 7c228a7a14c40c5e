pub mod memory;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{models::GameRecord, storage::StorageResult};

pub use self::memory::StaticGameDirectory;

/// Read and write access to the external game schedule.
///
/// The live-scoring core only reads game metadata and writes the final score; everything else
/// about games belongs to the schedule owner.
pub trait GameDirectory: Send + Sync {
    /// Look up a game by identifier.
    fn find_game(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameRecord>>>;
    /// Store final totals and flip the game status to final.
    fn record_final_score(
        &self,
        game_id: Uuid,
        home_total: u32,
        visitor_total: u32,
    ) -> BoxFuture<'static, StorageResult<()>>;
}
