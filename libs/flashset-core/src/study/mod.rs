//! Per-card scheduling state and the study data reducer.

pub mod review;
pub mod scheduler;
pub mod session;

use crate::types::{CardId, SetId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ease factor given to a card before its first passing review.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

fn default_ease_factor() -> f64 {
    DEFAULT_EASE_FACTOR
}

/// Scheduling state of one card.
///
/// There is no stored status: a card without a due date is new, a card whose
/// due date has passed is ready for review, and `redraw_time` marks a card
/// that should come back later in the current session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardStudyData {
    pub card_id: CardId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redraw_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub interval_days: f64,
    #[serde(default = "default_ease_factor")]
    pub ease_factor: f64,
}

impl CardStudyData {
    /// Entry for a card study logic has never touched.
    pub fn new(card_id: impl Into<CardId>) -> Self {
        Self {
            card_id: card_id.into(),
            due_date: None,
            redraw_time: None,
            interval_days: 0.0,
            ease_factor: DEFAULT_EASE_FACTOR,
        }
    }

    pub fn is_new(&self) -> bool {
        self.due_date.is_none()
    }

    /// Due date at or before `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        matches!(self.due_date, Some(due) if due <= now)
    }

    pub fn needs_redraw(&self) -> bool {
        self.redraw_time.is_some()
    }
}

/// Study data of every card in one set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetStudyData {
    pub set_id: SetId,
    #[serde(default)]
    pub card_data: BTreeMap<CardId, CardStudyData>,
}

impl SetStudyData {
    pub fn new(set_id: impl Into<SetId>) -> Self {
        Self {
            set_id: set_id.into(),
            card_data: BTreeMap::new(),
        }
    }

    pub fn get(&self, card_id: &str) -> Option<&CardStudyData> {
        self.card_data.get(card_id)
    }

    /// A card with no entry has never been studied.
    pub fn is_new(&self, card_id: &str) -> bool {
        self.get(card_id).map(CardStudyData::is_new).unwrap_or(true)
    }

    pub fn redraw_time(&self, card_id: &str) -> Option<DateTime<Utc>> {
        self.get(card_id).and_then(|data| data.redraw_time)
    }

    /// Fold one event into the study data.
    ///
    /// Events for cards without an entry create a default one; nothing here
    /// fails, so out-of-order or replayed events are harmless.
    pub fn apply(mut self, event: &StudyDataEvent) -> Self {
        match event {
            StudyDataEvent::ResetSessionStudyData => {
                for data in self.card_data.values_mut() {
                    data.redraw_time = None;
                }
            }
            StudyDataEvent::UpdateCardStudyData {
                card_id,
                redraw_time,
                at,
            } => {
                let data = self.upsert(card_id, *at);
                data.redraw_time = *redraw_time;
            }
            StudyDataEvent::RescheduleCard {
                card_id,
                due_date,
                interval_days,
                ease_factor,
                at,
            } => {
                let data = self.upsert(card_id, *at);
                data.due_date = Some(*due_date);
                data.interval_days = *interval_days;
                data.ease_factor = *ease_factor;
            }
            StudyDataEvent::ForgetCard { card_id } => {
                self.card_data.remove(card_id);
            }
        }
        self
    }

    /// Entry for `card_id`, created with its due date set to `at` when missing.
    fn upsert(&mut self, card_id: &str, at: DateTime<Utc>) -> &mut CardStudyData {
        let data = self
            .card_data
            .entry(card_id.to_string())
            .or_insert_with(|| CardStudyData::new(card_id));
        if data.due_date.is_none() {
            data.due_date = Some(at);
        }
        data
    }
}

/// Mutations of a set's study data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StudyDataEvent {
    /// Start of a session: clear every redraw marker.
    ResetSessionStudyData,
    /// A card was graded. `at` is the baseline due date for a first review.
    UpdateCardStudyData {
        card_id: CardId,
        redraw_time: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },
    /// A passing grade moved the card's due date.
    RescheduleCard {
        card_id: CardId,
        due_date: DateTime<Utc>,
        interval_days: f64,
        ease_factor: f64,
        at: DateTime<Utc>,
    },
    /// The card was deleted from the set.
    ForgetCard { card_id: CardId },
}

impl StudyDataEvent {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ResetSessionStudyData => "reset_session_study_data",
            Self::UpdateCardStudyData { .. } => "update_card_study_data",
            Self::RescheduleCard { .. } => "reschedule_card",
            Self::ForgetCard { .. } => "forget_card",
        }
    }
}
