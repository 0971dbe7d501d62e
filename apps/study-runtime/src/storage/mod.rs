//! Storage collaborator: where sets, cards and study data are persisted.

pub mod memory;
pub mod schema;
pub mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use crate::error::StorageError;
use flashset_core::{Card, CardId, FlashCardSet, SetStudyData};

type Result<T> = std::result::Result<T, StorageError>;

/// Set listing entry.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SetSummary {
    pub id: String,
    pub name: String,
    pub card_count: usize,
}

/// Repository for set metadata, card order and tag filter.
pub trait SetRepository {
    fn list_sets(&self) -> Result<Vec<SetSummary>>;
    /// The set with its order and filter. Cards are loaded separately.
    fn get_set(&self, set_id: &str) -> Result<Option<FlashCardSet>>;
    fn save_set(&mut self, set: &FlashCardSet) -> Result<()>;
}

/// Repository for card contents.
pub trait CardRepository {
    /// Cards of `set_id` among `card_ids`. Unknown and repeated ids are skipped.
    fn get_cards(&self, set_id: &str, card_ids: &[CardId]) -> Result<Vec<Card>>;
    fn save_card(&mut self, set_id: &str, card: &Card) -> Result<()>;
    fn delete_card(&mut self, set_id: &str, card_id: &str) -> Result<()>;
}

/// Repository for per-card study data.
pub trait StudyDataRepository {
    /// Study data of a set; empty when nothing was studied yet.
    fn get_study_data(&self, set_id: &str) -> Result<SetStudyData>;
    fn save_study_data(&mut self, data: &SetStudyData) -> Result<()>;
}

/// Everything the runtime needs from storage.
pub trait Storage: SetRepository + CardRepository + StudyDataRepository + Send + 'static {}

impl<T> Storage for T where T: SetRepository + CardRepository + StudyDataRepository + Send + 'static {}
