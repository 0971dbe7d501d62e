//! In-memory storage, used by tests and as a scratch backend.

use super::{CardRepository, SetRepository, SetSummary, StudyDataRepository};
use crate::error::StorageError;
use flashset_core::{Card, CardId, FlashCardSet, SetStudyData, TagFilter};
use std::collections::{BTreeMap, HashSet};

type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone)]
struct StoredSet {
    name: String,
    card_order: Vec<CardId>,
    filter: TagFilter,
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    sets: BTreeMap<String, StoredSet>,
    cards: BTreeMap<(String, CardId), Card>,
    study_data: BTreeMap<String, SetStudyData>,
    unavailable: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read and write fail, to exercise failure handling.
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable {
            Err(StorageError::Unavailable("memory storage switched off".to_string()))
        } else {
            Ok(())
        }
    }
}

impl SetRepository for MemoryStorage {
    fn list_sets(&self) -> Result<Vec<SetSummary>> {
        self.check_available()?;
        Ok(self
            .sets
            .iter()
            .map(|(id, set)| SetSummary {
                id: id.clone(),
                name: set.name.clone(),
                card_count: set.card_order.len(),
            })
            .collect())
    }

    fn get_set(&self, set_id: &str) -> Result<Option<FlashCardSet>> {
        self.check_available()?;
        match self.sets.get(set_id) {
            Some(set) => Ok(Some(FlashCardSet::from_parts(
                set_id,
                set.name.clone(),
                set.card_order.clone(),
                Vec::new(),
                set.filter.clone(),
            )?)),
            None => Ok(None),
        }
    }

    fn save_set(&mut self, set: &FlashCardSet) -> Result<()> {
        self.check_available()?;
        self.sets.insert(
            set.id().to_string(),
            StoredSet {
                name: set.name().to_string(),
                card_order: set.card_order().to_vec(),
                filter: set.filter().clone(),
            },
        );
        Ok(())
    }
}

impl CardRepository for MemoryStorage {
    fn get_cards(&self, set_id: &str, card_ids: &[CardId]) -> Result<Vec<Card>> {
        self.check_available()?;
        let mut seen = HashSet::new();
        Ok(card_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .filter_map(|id| self.cards.get(&(set_id.to_string(), id.clone())).cloned())
            .collect())
    }

    fn save_card(&mut self, set_id: &str, card: &Card) -> Result<()> {
        self.check_available()?;
        self.cards
            .insert((set_id.to_string(), card.id.clone()), card.clone());
        Ok(())
    }

    fn delete_card(&mut self, set_id: &str, card_id: &str) -> Result<()> {
        self.check_available()?;
        self.cards.remove(&(set_id.to_string(), card_id.to_string()));
        if let Some(data) = self.study_data.get_mut(set_id) {
            data.card_data.remove(card_id);
        }
        Ok(())
    }
}

impl StudyDataRepository for MemoryStorage {
    fn get_study_data(&self, set_id: &str) -> Result<SetStudyData> {
        self.check_available()?;
        Ok(self
            .study_data
            .get(set_id)
            .cloned()
            .unwrap_or_else(|| SetStudyData::new(set_id)))
    }

    fn save_study_data(&mut self, data: &SetStudyData) -> Result<()> {
        self.check_available()?;
        self.study_data.insert(data.set_id.clone(), data.clone());
        Ok(())
    }
}
