//! Shared fixtures for runtime integration tests.
//!
//! Sets are seeded straight into a `MemoryStorage` and the service is built
//! on top of it, so every test starts from storage the way the binary does.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use flashset_core::{Card, CardFace, FlashCardSet, SetStudyData, StudyDataEvent, StudySettings, TagFilter};
use flashset_runtime::service::StudyService;
use flashset_runtime::storage::{CardRepository, MemoryStorage, SetRepository, StudyDataRepository};

pub const SET_ID: &str = "set-1";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

/// Card with text on both faces and the given tags.
pub fn card(id: &str, tags: &[&str]) -> Card {
    let mut card = Card::blank(id).with_tags(tags.iter().copied());
    card.front = CardFace::rich_text(format!("front of {}", id));
    card.back = CardFace::rich_text(format!("back of {}", id));
    card
}

/// `count` untagged cards named `{prefix}0`, `{prefix}1`, ...
pub fn cards(prefix: &str, count: usize) -> Vec<Card> {
    (0..count).map(|i| card(&format!("{}{}", prefix, i), &[])).collect()
}

/// Study data where every listed card was reviewed and is due `due_in` from t0.
pub fn reviewed(card_ids: impl IntoIterator<Item = String>, due_in: Duration) -> SetStudyData {
    card_ids
        .into_iter()
        .fold(SetStudyData::new(SET_ID), |data, card_id| {
            data.apply(&StudyDataEvent::RescheduleCard {
                card_id,
                due_date: t0() + due_in,
                interval_days: 1.0,
                ease_factor: 2.5,
                at: t0() - Duration::days(1),
            })
        })
}

/// Storage holding one set with `cards` in order and optional study data.
pub fn seeded_storage(cards: &[Card], study_data: Option<SetStudyData>) -> MemoryStorage {
    let mut storage = MemoryStorage::new();
    let order = cards.iter().map(|c| c.id.clone()).collect();
    let set = FlashCardSet::from_parts(SET_ID, "Rust", order, Vec::new(), TagFilter::all()).unwrap();
    storage.save_set(&set).unwrap();
    for card in cards {
        storage.save_card(SET_ID, card).unwrap();
    }
    if let Some(data) = study_data {
        storage.save_study_data(&data).unwrap();
    }
    storage
}

pub fn service(storage: MemoryStorage) -> StudyService<MemoryStorage> {
    StudyService::new(storage, StudySettings::default())
}

/// Service over a seeded set, already opened.
pub async fn opened(cards: &[Card], study_data: Option<SetStudyData>) -> StudyService<MemoryStorage> {
    let service = service(seeded_storage(cards, study_data));
    service.open_set(SET_ID).await.unwrap();
    service
}
