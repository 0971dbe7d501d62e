//! Flashcard sets and the card store reducer.
//!
//! A [`FlashCardSet`] is only ever changed by folding a [`SetEvent`] into it
//! with [`FlashCardSet::apply`], which consumes the old value and returns the
//! new one. The filtered card order is recomputed on every event so it can
//! never go stale relative to the order, the tags or the active filter.

use crate::error::{CoreError, Result};
use crate::filter::filter_card_order;
use crate::types::{Card, CardFace, CardId, FaceSide, SetId, TagFilter};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// A named set of cards with a canonical order and an active tag filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FlashCardSetRecord")]
pub struct FlashCardSet {
    id: SetId,
    name: String,
    card_order: Vec<CardId>,
    cards: HashMap<CardId, Card>,
    filter: TagFilter,
    #[serde(skip_serializing)]
    filtered_card_order: Vec<CardId>,
}

/// Stored shape of a set. The filtered order is never trusted from storage.
#[derive(Debug, Deserialize)]
struct FlashCardSetRecord {
    id: SetId,
    name: String,
    #[serde(default)]
    card_order: Vec<CardId>,
    #[serde(default)]
    cards: HashMap<CardId, Card>,
    #[serde(default)]
    filter: TagFilter,
}

impl TryFrom<FlashCardSetRecord> for FlashCardSet {
    type Error = CoreError;

    fn try_from(record: FlashCardSetRecord) -> Result<Self> {
        Self::from_parts(
            record.id,
            record.name,
            record.card_order,
            record.cards.into_values(),
            record.filter,
        )
    }
}

impl FlashCardSet {
    /// Create a set whose cards are known by id but not loaded yet.
    pub fn new(id: impl Into<SetId>, name: impl Into<String>, card_order: Vec<CardId>) -> Result<Self> {
        Self::from_parts(id, name, card_order, Vec::new(), TagFilter::all())
    }

    /// Assemble a set from stored parts.
    ///
    /// Duplicate ids in `card_order` are an invariant violation. Cards whose id
    /// is not in `card_order` do not exist and are dropped.
    pub fn from_parts<I>(
        id: impl Into<SetId>,
        name: impl Into<String>,
        card_order: Vec<CardId>,
        cards: I,
        filter: TagFilter,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = Card>,
    {
        let id = id.into();
        let mut seen = HashSet::with_capacity(card_order.len());
        for card_id in &card_order {
            if !seen.insert(card_id.as_str()) {
                return Err(CoreError::invariant(format!(
                    "card {} appears twice in the order of set {}",
                    card_id, id
                )));
            }
        }

        let cards = cards
            .into_iter()
            .filter(|card| seen.contains(card.id.as_str()))
            .map(|card| (card.id.clone(), card))
            .collect();

        Ok(Self {
            id,
            name: name.into(),
            card_order,
            cards,
            filter,
            filtered_card_order: Vec::new(),
        }
        .refiltered())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical order; the source of truth for which cards exist.
    pub fn card_order(&self) -> &[CardId] {
        &self.card_order
    }

    /// Ids passing the active filter, in canonical order.
    pub fn filtered_card_order(&self) -> &[CardId] {
        &self.filtered_card_order
    }

    pub fn filter(&self) -> &TagFilter {
        &self.filter
    }

    pub fn card(&self, card_id: &str) -> Option<&Card> {
        self.cards.get(card_id)
    }

    /// Loaded cards in canonical order.
    pub fn cards(&self) -> impl Iterator<Item = &Card> + '_ {
        self.card_order.iter().filter_map(|id| self.cards.get(id))
    }

    pub fn card_count(&self) -> usize {
        self.card_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.card_order.is_empty()
    }

    pub fn contains(&self, card_id: &str) -> bool {
        self.card_order.iter().any(|id| id == card_id)
    }

    /// Ids in the order whose card has not been loaded.
    pub fn missing_cards(&self) -> Vec<CardId> {
        self.card_order
            .iter()
            .filter(|id| !self.cards.contains_key(id.as_str()))
            .cloned()
            .collect()
    }

    /// Every tag used by a loaded card.
    pub fn all_tags(&self) -> BTreeSet<String> {
        self.cards.values().flat_map(|card| card.tags.iter().cloned()).collect()
    }

    /// Fold one event into the set.
    pub fn apply(mut self, event: &SetEvent) -> Self {
        match event {
            SetEvent::ReceiveCards { cards } => {
                for card in cards {
                    if self.contains(&card.id) {
                        self.cards.insert(card.id.clone(), card.clone());
                    }
                }
            }
            SetEvent::AddCard { card } => {
                if !self.contains(&card.id) {
                    self.card_order.push(card.id.clone());
                    self.cards.insert(card.id.clone(), card.clone());
                }
            }
            SetEvent::DeleteCard { card_id } => {
                self.card_order.retain(|id| id != card_id);
                self.cards.remove(card_id);
            }
            SetEvent::SaveCardFace { card_id, side, face } => {
                if let Some(card) = self.cards.get_mut(card_id) {
                    *card.face_mut(*side) = face.clone();
                }
            }
            SetEvent::SwapCardFaces { card_id } => {
                if let Some(card) = self.cards.get_mut(card_id) {
                    std::mem::swap(&mut card.front, &mut card.back);
                }
            }
            SetEvent::SetCardTags { card_id, tags } => {
                if let Some(card) = self.cards.get_mut(card_id) {
                    card.tags = tags.clone();
                }
            }
            SetEvent::SetTagFilter { filter } => {
                self.filter = filter.clone();
            }
            SetEvent::Rename { name } => {
                if &self.name != name {
                    self.name = name.clone();
                }
            }
        }
        self.refiltered()
    }

    fn refiltered(mut self) -> Self {
        self.filtered_card_order = filter_card_order(&self.card_order, &self.cards, &self.filter);
        self
    }
}

/// Mutations of the card store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SetEvent {
    /// Cards returned by a load. Ids not in the set's order are ignored.
    ReceiveCards { cards: Vec<Card> },
    AddCard { card: Card },
    DeleteCard { card_id: CardId },
    SaveCardFace {
        card_id: CardId,
        side: FaceSide,
        face: CardFace,
    },
    SwapCardFaces { card_id: CardId },
    SetCardTags {
        card_id: CardId,
        tags: BTreeSet<String>,
    },
    SetTagFilter { filter: TagFilter },
    Rename { name: String },
}

impl SetEvent {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ReceiveCards { .. } => "receive_cards",
            Self::AddCard { .. } => "add_card",
            Self::DeleteCard { .. } => "delete_card",
            Self::SaveCardFace { .. } => "save_card_face",
            Self::SwapCardFaces { .. } => "swap_card_faces",
            Self::SetCardTags { .. } => "set_card_tags",
            Self::SetTagFilter { .. } => "set_tag_filter",
            Self::Rename { .. } => "rename",
        }
    }
}
