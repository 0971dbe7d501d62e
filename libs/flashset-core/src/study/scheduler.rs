//! Study deck selection.
//!
//! Cards that passed the tag filter are split into new cards (no due date)
//! and known cards (due date at or before now). Cards due in the future sit
//! this session out. Each group has its own quota and neither group fills
//! the other's unused slots.
//!
//! The deck is a stack: the last element is the next card to present.

use super::SetStudyData;
use crate::set::FlashCardSet;
use crate::settings::{DeckOrder, StudyLimits};
use crate::types::CardId;
use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

/// Eligible cards of one set at one instant, split by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyPlan {
    pub new_card_ids: Vec<CardId>,
    pub known_card_ids: Vec<CardId>,
}

impl StudyPlan {
    /// Partition `filtered_card_ids`, keeping their relative order.
    pub fn new(filtered_card_ids: &[CardId], study_data: &SetStudyData, now: DateTime<Utc>) -> Self {
        let mut new_card_ids = Vec::new();
        let mut known_card_ids = Vec::new();

        for card_id in filtered_card_ids {
            match study_data.get(card_id).and_then(|data| data.due_date) {
                None => new_card_ids.push(card_id.clone()),
                Some(due) if due <= now => known_card_ids.push(card_id.clone()),
                Some(_) => {}
            }
        }

        Self {
            new_card_ids,
            known_card_ids,
        }
    }

    pub fn new_cards_in_study(&self, limits: &StudyLimits) -> usize {
        self.new_card_ids
            .len()
            .min(limits.max_new_cards)
            .min(limits.max_total_cards)
    }

    pub fn known_cards_in_study(&self, limits: &StudyLimits) -> usize {
        let remaining = limits
            .max_total_cards
            .saturating_sub(self.new_cards_in_study(limits));
        self.known_card_ids.len().min(remaining)
    }

    /// Select the session's cards and arrange them as a stack.
    pub fn deck(&self, limits: &StudyLimits, order: DeckOrder) -> Vec<CardId> {
        let new_count = self.new_cards_in_study(limits);
        let known_count = self.known_cards_in_study(limits);

        let mut deck = Vec::with_capacity(new_count + known_count);
        deck.extend(self.new_card_ids.iter().take(new_count).cloned());
        deck.extend(self.known_card_ids.iter().take(known_count).cloned());

        if let DeckOrder::Shuffled(seed) = order {
            deck.shuffle(&mut StdRng::seed_from_u64(seed));
        }
        deck
    }
}

/// Build a study deck: new cards first, then known cards, within the quotas.
pub fn build_deck(
    filtered_card_ids: &[CardId],
    study_data: &SetStudyData,
    now: DateTime<Utc>,
    max_new_cards: usize,
    max_total_cards: usize,
) -> Vec<CardId> {
    let limits = StudyLimits {
        max_new_cards,
        max_total_cards,
    };
    StudyPlan::new(filtered_card_ids, study_data, now).deck(&limits, DeckOrder::Stacked)
}

/// Summary shown before a session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyOverview {
    pub set_id: String,
    pub total_cards: usize,
    pub filtered_cards: usize,
    pub new_cards: usize,
    pub known_cards: usize,
    pub new_cards_in_study: usize,
    pub known_cards_in_study: usize,
}

impl StudyOverview {
    pub fn new(
        set: &FlashCardSet,
        study_data: &SetStudyData,
        now: DateTime<Utc>,
        limits: &StudyLimits,
    ) -> Self {
        let plan = StudyPlan::new(set.filtered_card_order(), study_data, now);
        Self {
            set_id: set.id().to_string(),
            total_cards: set.card_count(),
            filtered_cards: set.filtered_card_order().len(),
            new_cards: plan.new_card_ids.len(),
            known_cards: plan.known_card_ids.len(),
            new_cards_in_study: plan.new_cards_in_study(limits),
            known_cards_in_study: plan.known_cards_in_study(limits),
        }
    }

    pub fn is_empty_set(&self) -> bool {
        self.total_cards == 0
    }

    /// False means the caller shows this overview instead of a session.
    pub fn has_eligible_cards(&self) -> bool {
        self.new_cards_in_study + self.known_cards_in_study > 0
    }
}
