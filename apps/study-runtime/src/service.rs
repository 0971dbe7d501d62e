//! Operations offered to the presentation layer.
//!
//! Edits go through the [`Store`] first and are then written to storage.
//! Grades are the exception: they are written first, so a failed write leaves
//! the session where it was and the grade can be retried. Storage calls run
//! on the blocking pool so the store task is never held up by I/O.

use crate::error::{Result, RuntimeError, StorageError};
use crate::state::{Action, AppState, SetEntry};
use crate::storage::{SetSummary, Storage};
use crate::store::Store;
use chrono::{DateTime, Utc};
use flashset_core::{
    Card, CardFace, CardId, CoreError, EffectiveStudySettings, FaceSide, FlashCardSet, Rating,
    ReviewPolicy, SetEvent, SetId, SetStudyData, SetStudySettings, Sm2Policy, StudyDataEvent,
    StudyOverview, StudyPlan, StudySession, StudySettings, TagFilter,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Result of asking for a new session.
#[derive(Debug)]
pub enum SessionStart {
    /// Nothing is eligible; show the overview instead.
    Empty(StudyOverview),
    Started {
        session: StudySession,
        overview: StudyOverview,
    },
}

pub struct StudyService<S> {
    store: Store,
    storage: Arc<Mutex<S>>,
    settings: StudySettings,
    set_settings: HashMap<SetId, SetStudySettings>,
    policy: Box<dyn ReviewPolicy>,
}

impl<S: Storage> StudyService<S> {
    /// Create the service and spawn its store. Must run inside a tokio runtime.
    pub fn new(storage: S, settings: StudySettings) -> Self {
        let (store, _handle) = Store::spawn(AppState::default());
        Self {
            store,
            storage: Arc::new(Mutex::new(storage)),
            settings,
            set_settings: HashMap::new(),
            policy: Box::new(Sm2Policy::default()),
        }
    }

    pub fn with_policy(mut self, policy: Box<dyn ReviewPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_set_settings(mut self, set_id: impl Into<SetId>, settings: SetStudySettings) -> Self {
        self.set_settings.insert(set_id.into(), settings);
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn storage(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.storage)
    }

    pub fn effective_settings(&self, set_id: &str) -> EffectiveStudySettings {
        EffectiveStudySettings::merge(&self.settings, self.set_settings.get(set_id))
    }

    async fn with_storage<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut S) -> std::result::Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        let result = tokio::task::spawn_blocking(move || {
            let mut guard = storage.lock().map_err(|_| StorageError::LockPoisoned)?;
            f(&mut *guard)
        })
        .await??;
        Ok(result)
    }

    /// Run `f` against a set's entry, failing if the set was never opened.
    async fn with_entry<T, F>(&self, set_id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&SetEntry) -> std::result::Result<T, CoreError> + Send + 'static,
        T: Send + 'static,
    {
        let id = set_id.to_string();
        self.store
            .select(move |state| match state.entry(&id) {
                Some(entry) => f(entry).map_err(RuntimeError::from),
                None => Err(RuntimeError::SetNotFound(id.clone())),
            })
            .await?
    }

    // ==================== Sets ====================

    pub async fn list_sets(&self) -> Result<Vec<SetSummary>> {
        self.with_storage(|s| s.list_sets()).await
    }

    /// Create an empty set and make it available in the store.
    pub async fn create_set(&self, name: &str) -> Result<SetId> {
        let set = FlashCardSet::new(Uuid::new_v4().to_string(), name, Vec::new())?;
        let set_id = set.id().to_string();

        let to_save = set.clone();
        self.with_storage(move |s| s.save_set(&to_save)).await?;
        self.store.dispatch(Action::ReceiveSet { set }).await?;
        self.store
            .dispatch(Action::ReceiveStudyData {
                data: SetStudyData::new(set_id.clone()),
            })
            .await?;

        tracing::info!(set_id = %set_id, name, "created set");
        Ok(set_id)
    }

    /// Load a set, its study data and all of its cards.
    pub async fn open_set(&self, set_id: &str) -> Result<()> {
        tracing::info!(set_id, "opening set");
        self.fetch_set(set_id).await?;
        self.fetch_study_data(set_id).await?;

        let missing = self
            .with_entry(set_id, |entry| Ok(entry.set.require("set")?.missing_cards()))
            .await?;
        self.load_cards(set_id, missing).await?;
        Ok(())
    }

    async fn fetch_set(&self, set_id: &str) -> Result<()> {
        self.store
            .dispatch(Action::FetchSet {
                set_id: set_id.to_string(),
            })
            .await?;

        let id = set_id.to_string();
        match self.with_storage(move |s| s.get_set(&id)).await {
            Ok(Some(set)) => self.store.dispatch(Action::ReceiveSet { set }).await,
            Ok(None) => {
                self.fail_set(set_id, "set does not exist").await?;
                Err(RuntimeError::SetNotFound(set_id.to_string()))
            }
            Err(err) => {
                tracing::warn!(set_id, error = %err, "failed to fetch set");
                self.fail_set(set_id, &err.to_string()).await?;
                Err(err)
            }
        }
    }

    async fn fail_set(&self, set_id: &str, message: &str) -> Result<()> {
        self.store
            .dispatch(Action::FetchSetFailed {
                set_id: set_id.to_string(),
                message: message.to_string(),
            })
            .await
    }

    async fn fetch_study_data(&self, set_id: &str) -> Result<()> {
        self.store
            .dispatch(Action::FetchStudyData {
                set_id: set_id.to_string(),
            })
            .await?;

        let id = set_id.to_string();
        match self.with_storage(move |s| s.get_study_data(&id)).await {
            Ok(data) => self.store.dispatch(Action::ReceiveStudyData { data }).await,
            Err(err) => {
                tracing::warn!(set_id, error = %err, "failed to fetch study data");
                self.store
                    .dispatch(Action::FetchStudyDataFailed {
                        set_id: set_id.to_string(),
                        message: err.to_string(),
                    })
                    .await?;
                Err(err)
            }
        }
    }

    /// Load cards of an open set. Ids that are unknown, already loaded or
    /// already being fetched are skipped. Returns how many cards arrived.
    pub async fn load_cards(&self, set_id: &str, card_ids: Vec<CardId>) -> Result<usize> {
        let wanted = self
            .with_entry(set_id, move |entry| {
                let set = entry.set.require("set")?;
                let missing: HashSet<CardId> = set.missing_cards().into_iter().collect();
                let mut seen = HashSet::new();
                Ok(card_ids
                    .into_iter()
                    .filter(|id| missing.contains(id) && !entry.cards_in_flight.contains(id))
                    .filter(|id| seen.insert(id.clone()))
                    .collect::<Vec<_>>())
            })
            .await?;

        if wanted.is_empty() {
            return Ok(0);
        }

        self.store
            .dispatch(Action::FetchCards {
                set_id: set_id.to_string(),
                card_ids: wanted.clone(),
            })
            .await?;

        let id = set_id.to_string();
        let requested = wanted.clone();
        match self.with_storage(move |s| s.get_cards(&id, &requested)).await {
            Ok(cards) => {
                let count = cards.len();
                tracing::debug!(set_id, requested = wanted.len(), received = count, "loaded cards");
                self.store
                    .dispatch(Action::ReceiveCards {
                        set_id: set_id.to_string(),
                        cards,
                        requested: wanted,
                    })
                    .await?;
                Ok(count)
            }
            Err(err) => {
                tracing::warn!(set_id, error = %err, "failed to load cards");
                self.store
                    .dispatch(Action::FetchCardsFailed {
                        set_id: set_id.to_string(),
                        card_ids: wanted,
                    })
                    .await?;
                Err(err)
            }
        }
    }

    // ==================== Card store ====================

    /// Replace the active tag filter.
    pub async fn filter_cards(&self, set_id: &str, filter: TagFilter) -> Result<Vec<CardId>> {
        self.require_set(set_id).await?;
        self.apply_set_event(set_id, SetEvent::SetTagFilter { filter })
            .await?;
        self.persist_set(set_id).await?;
        self.with_entry(set_id, |entry| {
            Ok(entry.set.require("set")?.filtered_card_order().to_vec())
        })
        .await
    }

    pub async fn rename_set(&self, set_id: &str, name: &str) -> Result<()> {
        self.require_set(set_id).await?;
        self.apply_set_event(
            set_id,
            SetEvent::Rename {
                name: name.to_string(),
            },
        )
        .await?;
        self.persist_set(set_id).await
    }

    /// Append a blank card to the set and return its id.
    pub async fn add_card(&self, set_id: &str) -> Result<CardId> {
        self.require_set(set_id).await?;
        let card = Card::blank(Uuid::new_v4().to_string());
        let card_id = card.id.clone();

        self.apply_set_event(set_id, SetEvent::AddCard { card }).await?;
        self.persist_card(set_id, &card_id).await?;
        self.persist_set(set_id).await?;
        Ok(card_id)
    }

    pub async fn delete_card(&self, set_id: &str, card_id: &str) -> Result<()> {
        self.require_card(set_id, card_id).await?;
        self.apply_set_event(
            set_id,
            SetEvent::DeleteCard {
                card_id: card_id.to_string(),
            },
        )
        .await?;
        self.store
            .dispatch(Action::Study {
                set_id: set_id.to_string(),
                event: StudyDataEvent::ForgetCard {
                    card_id: card_id.to_string(),
                },
            })
            .await?;

        let (id, card) = (set_id.to_string(), card_id.to_string());
        self.with_storage(move |s| s.delete_card(&id, &card)).await?;
        self.persist_set(set_id).await
    }

    pub async fn save_card_face(
        &self,
        set_id: &str,
        card_id: &str,
        side: FaceSide,
        face: CardFace,
    ) -> Result<()> {
        self.require_card(set_id, card_id).await?;
        self.apply_set_event(
            set_id,
            SetEvent::SaveCardFace {
                card_id: card_id.to_string(),
                side,
                face,
            },
        )
        .await?;
        self.persist_card(set_id, card_id).await
    }

    pub async fn swap_card_faces(&self, set_id: &str, card_id: &str) -> Result<()> {
        self.require_card(set_id, card_id).await?;
        self.apply_set_event(
            set_id,
            SetEvent::SwapCardFaces {
                card_id: card_id.to_string(),
            },
        )
        .await?;
        self.persist_card(set_id, card_id).await
    }

    pub async fn set_card_tags(&self, set_id: &str, card_id: &str, tags: BTreeSet<String>) -> Result<()> {
        self.require_card(set_id, card_id).await?;
        self.apply_set_event(
            set_id,
            SetEvent::SetCardTags {
                card_id: card_id.to_string(),
                tags,
            },
        )
        .await?;
        self.persist_card(set_id, card_id).await
    }

    /// Loaded card, if any.
    pub async fn card(&self, set_id: &str, card_id: &str) -> Result<Option<Card>> {
        let card_id = card_id.to_string();
        self.with_entry(set_id, move |entry| {
            Ok(entry.set.require("set")?.card(&card_id).cloned())
        })
        .await
    }

    async fn apply_set_event(&self, set_id: &str, event: SetEvent) -> Result<()> {
        self.store
            .dispatch(Action::Set {
                set_id: set_id.to_string(),
                event,
            })
            .await
    }

    async fn require_set(&self, set_id: &str) -> Result<()> {
        self.with_entry(set_id, |entry| entry.set.require("set").map(|_| ()))
            .await
    }

    async fn require_card(&self, set_id: &str, card_id: &str) -> Result<()> {
        let card = card_id.to_string();
        let loaded = self
            .with_entry(set_id, move |entry| {
                Ok(entry.set.require("set")?.card(&card).is_some())
            })
            .await?;
        if loaded {
            Ok(())
        } else {
            Err(RuntimeError::CardNotFound(card_id.to_string()))
        }
    }

    async fn persist_set(&self, set_id: &str) -> Result<()> {
        let set = self
            .with_entry(set_id, |entry| Ok(entry.set.require("set")?.clone()))
            .await?;
        self.with_storage(move |s| s.save_set(&set)).await
    }

    async fn persist_card(&self, set_id: &str, card_id: &str) -> Result<()> {
        let card = self
            .card(set_id, card_id)
            .await?
            .ok_or_else(|| RuntimeError::CardNotFound(card_id.to_string()))?;
        let id = set_id.to_string();
        self.with_storage(move |s| s.save_card(&id, &card)).await
    }

    async fn persist_study_data(&self, set_id: &str) -> Result<()> {
        let data = self.study_data(set_id).await?;
        self.with_storage(move |s| s.save_study_data(&data)).await
    }

    // ==================== Study ====================

    /// Settled study data of an open set.
    pub async fn study_data(&self, set_id: &str) -> Result<SetStudyData> {
        self.with_entry(set_id, |entry| Ok(entry.study_data.require("study data")?.clone()))
            .await
    }

    /// Counts shown before a session. Fails while anything is still loading.
    pub async fn overview(&self, set_id: &str, now: DateTime<Utc>) -> Result<StudyOverview> {
        let limits = self.effective_settings(set_id).limits;
        self.with_entry(set_id, move |entry| {
            let set = entry.set.require("set")?;
            let data = entry.study_data.require("study data")?;
            Ok(StudyOverview::new(set, data, now, &limits))
        })
        .await
    }

    /// Clear last session's redraws and build a new deck.
    pub async fn start_study_session(&self, set_id: &str, now: DateTime<Utc>) -> Result<SessionStart> {
        // Nothing is reset until both the set and its study data are settled
        self.overview(set_id, now).await?;

        self.store
            .dispatch(Action::Study {
                set_id: set_id.to_string(),
                event: StudyDataEvent::ResetSessionStudyData,
            })
            .await?;
        self.persist_study_data(set_id).await?;

        let settings = self.effective_settings(set_id);
        let (deck, overview) = self
            .with_entry(set_id, move |entry| {
                let set = entry.set.require("set")?;
                let data = entry.study_data.require("study data")?;
                let plan = StudyPlan::new(set.filtered_card_order(), data, now);
                let deck = plan.deck(&settings.limits, settings.deck_order);
                Ok((deck, StudyOverview::new(set, data, now, &settings.limits)))
            })
            .await?;

        if deck.is_empty() {
            tracing::info!(set_id, "no eligible cards, showing overview");
            return Ok(SessionStart::Empty(overview));
        }

        tracing::info!(
            set_id,
            new_cards = overview.new_cards_in_study,
            known_cards = overview.known_cards_in_study,
            "study session started"
        );
        Ok(SessionStart::Started {
            session: StudySession::new(set_id, deck, now),
            overview,
        })
    }

    /// Present the next card of a session, or `None` when it is over.
    ///
    /// Cards deleted since the deck was built are skipped.
    pub async fn next_card(&self, session: &mut StudySession, now: DateTime<Utc>) -> Result<Option<Card>> {
        let set_id = session.set_id().to_string();
        let data = self.study_data(&set_id).await?;

        while let Some(card_id) = session.next_card(&data, now) {
            if let Some(card) = self.card(&set_id, &card_id).await? {
                return Ok(Some(card));
            }
            tracing::debug!(set_id = %set_id, card_id = %card_id, "skipping card that is no longer loaded");
            session.skip_current();
        }

        tracing::info!(set_id = %set_id, graded = session.graded(), "study session finished");
        Ok(None)
    }

    /// Record a grade for the presented card.
    ///
    /// On error nothing has changed: the card stays presented and ungraded.
    pub async fn grade_card(
        &self,
        session: &mut StudySession,
        card_id: &str,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let set_id = session.set_id().to_string();
        let data = self.study_data(&set_id).await?;
        let mut graded = session.clone();
        let events = graded.grade(card_id, rating, &data, self.policy.as_ref(), now)?;

        let updated = events.iter().fold(data, |data, event| data.apply(event));
        if let Err(err) = self.with_storage(move |s| s.save_study_data(&updated)).await {
            tracing::warn!(set_id = %set_id, card_id, error = %err, "failed to save grade");
            return Err(err);
        }

        tracing::debug!(set_id = %set_id, card_id, rating = rating.to_value(), "graded card");
        self.store
            .dispatch_all(events.into_iter().map(|event| Action::Study {
                set_id: set_id.clone(),
                event,
            }))
            .await?;
        *session = graded;
        Ok(())
    }
}
