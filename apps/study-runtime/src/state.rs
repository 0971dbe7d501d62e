//! Application state tree and its reducer.

use flashset_core::{
    Card, CardId, FlashCardSet, Remote, SetEvent, SetId, SetStudyData, StudyDataEvent,
};
use std::collections::{BTreeMap, BTreeSet};

/// Everything known about one set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetEntry {
    pub set: Remote<FlashCardSet>,
    pub study_data: Remote<SetStudyData>,
    /// Cards requested from storage and not yet received.
    pub cards_in_flight: BTreeSet<CardId>,
    /// Study events applied while a study data fetch was in flight. They are
    /// replayed onto the fetched value so it cannot wipe them out.
    pub pending_study_events: Vec<StudyDataEvent>,
}

/// Global application state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub sets: BTreeMap<SetId, SetEntry>,
}

/// Everything that can change the state tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    FetchSet { set_id: SetId },
    ReceiveSet { set: FlashCardSet },
    FetchSetFailed { set_id: SetId, message: String },
    FetchStudyData { set_id: SetId },
    ReceiveStudyData { data: SetStudyData },
    FetchStudyDataFailed { set_id: SetId, message: String },
    FetchCards { set_id: SetId, card_ids: Vec<CardId> },
    ReceiveCards { set_id: SetId, cards: Vec<Card>, requested: Vec<CardId> },
    FetchCardsFailed { set_id: SetId, card_ids: Vec<CardId> },
    Set { set_id: SetId, event: SetEvent },
    Study { set_id: SetId, event: StudyDataEvent },
}

impl Action {
    pub fn set_id(&self) -> &str {
        match self {
            Self::FetchSet { set_id }
            | Self::FetchSetFailed { set_id, .. }
            | Self::FetchStudyData { set_id }
            | Self::FetchStudyDataFailed { set_id, .. }
            | Self::FetchCards { set_id, .. }
            | Self::ReceiveCards { set_id, .. }
            | Self::FetchCardsFailed { set_id, .. }
            | Self::Set { set_id, .. }
            | Self::Study { set_id, .. } => set_id,
            Self::ReceiveSet { set } => set.id(),
            Self::ReceiveStudyData { data } => &data.set_id,
        }
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FetchSet { .. } => "fetch_set",
            Self::ReceiveSet { .. } => "receive_set",
            Self::FetchSetFailed { .. } => "fetch_set_failed",
            Self::FetchStudyData { .. } => "fetch_study_data",
            Self::ReceiveStudyData { .. } => "receive_study_data",
            Self::FetchStudyDataFailed { .. } => "fetch_study_data_failed",
            Self::FetchCards { .. } => "fetch_cards",
            Self::ReceiveCards { .. } => "receive_cards",
            Self::FetchCardsFailed { .. } => "fetch_cards_failed",
            Self::Set { event, .. } => event.kind(),
            Self::Study { event, .. } => event.kind(),
        }
    }
}

impl AppState {
    pub fn entry(&self, set_id: &str) -> Option<&SetEntry> {
        self.sets.get(set_id)
    }

    /// Fold one action into the state.
    pub fn reduce(mut self, action: Action) -> Self {
        let set_id = action.set_id().to_string();
        let entry = self.sets.remove(&set_id).unwrap_or_default();
        self.sets.insert(set_id, entry.reduce(action));
        self
    }
}

impl SetEntry {
    fn reduce(self, action: Action) -> Self {
        match action {
            Action::FetchSet { .. } => Self {
                set: self.set.fetching(),
                ..self
            },
            Action::ReceiveSet { set } => Self {
                set: self.set.received(set),
                cards_in_flight: BTreeSet::new(),
                ..self
            },
            Action::FetchSetFailed { message, .. } => Self {
                set: self.set.failed(message),
                ..self
            },
            Action::FetchStudyData { .. } => Self {
                study_data: self.study_data.fetching(),
                ..self
            },
            Action::ReceiveStudyData { data } => {
                let data = self
                    .pending_study_events
                    .iter()
                    .fold(data, |data, event| data.apply(event));
                Self {
                    study_data: self.study_data.received(data),
                    pending_study_events: Vec::new(),
                    ..self
                }
            }
            Action::FetchStudyDataFailed { message, .. } => Self {
                study_data: self.study_data.failed(message),
                pending_study_events: Vec::new(),
                ..self
            },
            Action::FetchCards { card_ids, .. } => {
                let mut cards_in_flight = self.cards_in_flight;
                cards_in_flight.extend(card_ids);
                Self {
                    cards_in_flight,
                    ..self
                }
            }
            Action::ReceiveCards {
                cards, requested, ..
            } => {
                let mut cards_in_flight = self.cards_in_flight;
                for card_id in &requested {
                    cards_in_flight.remove(card_id);
                }
                let event = SetEvent::ReceiveCards { cards };
                Self {
                    set: self.set.map_value(|set| set.apply(&event)),
                    cards_in_flight,
                    ..self
                }
            }
            Action::FetchCardsFailed { card_ids, .. } => {
                let mut cards_in_flight = self.cards_in_flight;
                for card_id in &card_ids {
                    cards_in_flight.remove(card_id);
                }
                Self {
                    cards_in_flight,
                    ..self
                }
            }
            Action::Set { event, .. } => Self {
                set: self.set.map_value(|set| set.apply(&event)),
                ..self
            },
            Action::Study { set_id, event } => {
                let mut pending_study_events = self.pending_study_events;
                if self.study_data.is_fetching {
                    pending_study_events.push(event.clone());
                }

                // Study events never fail: missing study data starts out empty
                let study_data = match self.study_data.value {
                    Some(_) => self.study_data.map_value(|data| data.apply(&event)),
                    None => Remote {
                        value: Some(SetStudyData::new(set_id).apply(&event)),
                        ..self.study_data
                    },
                };
                Self {
                    study_data,
                    pending_study_events,
                    ..self
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use flashset_core::{RemoteStatus, TagFilter};
    use pretty_assertions::assert_eq;

    fn sample_set() -> FlashCardSet {
        FlashCardSet::new("s", "Rust", vec!["a".to_string(), "b".to_string()]).unwrap()
    }

    #[test]
    fn set_fetch_lifecycle() {
        let state = AppState::default().reduce(Action::FetchSet {
            set_id: "s".to_string(),
        });
        assert_eq!(state.entry("s").unwrap().set.status(), RemoteStatus::Loading);

        let state = state.reduce(Action::ReceiveSet { set: sample_set() });
        let entry = state.entry("s").unwrap();
        assert_eq!(entry.set.status(), RemoteStatus::Present);
        assert_eq!(entry.set.value.as_ref().unwrap().name(), "Rust");
    }

    #[test]
    fn set_fetch_failure_is_recorded() {
        let state = AppState::default()
            .reduce(Action::FetchSet {
                set_id: "s".to_string(),
            })
            .reduce(Action::FetchSetFailed {
                set_id: "s".to_string(),
                message: "disk".to_string(),
            });
        assert_eq!(state.entry("s").unwrap().set.status(), RemoteStatus::Failed);
    }

    #[test]
    fn card_fetch_tracks_in_flight_ids() {
        let state = AppState::default()
            .reduce(Action::ReceiveSet { set: sample_set() })
            .reduce(Action::FetchCards {
                set_id: "s".to_string(),
                card_ids: vec!["a".to_string(), "b".to_string()],
            });
        assert_eq!(state.entry("s").unwrap().cards_in_flight.len(), 2);

        let state = state.reduce(Action::ReceiveCards {
            set_id: "s".to_string(),
            cards: vec![Card::blank("a")],
            requested: vec!["a".to_string()],
        });
        let entry = state.entry("s").unwrap();
        assert_eq!(entry.cards_in_flight.iter().collect::<Vec<_>>(), vec!["b"]);
        let set = entry.set.value.as_ref().unwrap();
        assert_eq!(set.filtered_card_order(), ["a".to_string()].as_slice());

        let state = state.reduce(Action::FetchCardsFailed {
            set_id: "s".to_string(),
            card_ids: vec!["b".to_string()],
        });
        assert!(state.entry("s").unwrap().cards_in_flight.is_empty());
    }

    #[test]
    fn set_events_on_unknown_set_are_ignored() {
        let state = AppState::default().reduce(Action::Set {
            set_id: "ghost".to_string(),
            event: SetEvent::SetTagFilter {
                filter: TagFilter::new(["x"]),
            },
        });
        assert_eq!(state.entry("ghost").unwrap().set.status(), RemoteStatus::Absent);
    }

    #[test]
    fn study_events_default_construct_missing_data() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let state = AppState::default().reduce(Action::Study {
            set_id: "s".to_string(),
            event: StudyDataEvent::UpdateCardStudyData {
                card_id: "a".to_string(),
                redraw_time: None,
                at: now,
            },
        });
        let data = state.entry("s").unwrap().study_data.value.as_ref().unwrap();
        assert_eq!(data.set_id, "s");
        assert_eq!(data.get("a").unwrap().due_date, Some(now));
    }

    #[test]
    fn study_events_during_a_refetch_survive_it() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let grade = StudyDataEvent::UpdateCardStudyData {
            card_id: "a".to_string(),
            redraw_time: Some(now),
            at: now,
        };
        let state = AppState::default()
            .reduce(Action::ReceiveStudyData {
                data: SetStudyData::new("s"),
            })
            .reduce(Action::FetchStudyData {
                set_id: "s".to_string(),
            })
            .reduce(Action::Study {
                set_id: "s".to_string(),
                event: grade,
            });
        assert_eq!(state.entry("s").unwrap().pending_study_events.len(), 1);

        // The refetch read storage before the grade was written
        let state = state.reduce(Action::ReceiveStudyData {
            data: SetStudyData::new("s"),
        });
        let entry = state.entry("s").unwrap();
        assert!(entry.pending_study_events.is_empty());
        let data = entry.study_data.require("study data").unwrap();
        assert_eq!(data.redraw_time("a"), Some(now));
    }

    #[test]
    fn replaying_actions_gives_the_same_state() {
        let actions = vec![
            Action::FetchSet {
                set_id: "s".to_string(),
            },
            Action::ReceiveSet { set: sample_set() },
            Action::Study {
                set_id: "s".to_string(),
                event: StudyDataEvent::ResetSessionStudyData,
            },
        ];
        let first = actions
            .iter()
            .cloned()
            .fold(AppState::default(), AppState::reduce);
        let second = actions
            .into_iter()
            .fold(AppState::default(), AppState::reduce);
        assert_eq!(first, second);
    }
}
