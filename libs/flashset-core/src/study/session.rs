//! In-memory cursor over one study session.
//!
//! The session only holds the deck and the card on screen. Redraw markers live
//! in the set's study data, so grading a card and drawing the next one both
//! read the same state the reducer writes. Dropping a session abandons it;
//! nothing persisted needs to be rolled back.

use super::review::{ReviewPolicy, ReviewProcessor};
use super::{SetStudyData, StudyDataEvent};
use crate::error::{CoreError, Result};
use crate::types::{CardId, Rating, SetId};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct StudySession {
    set_id: SetId,
    deck: Vec<CardId>,
    members: BTreeSet<CardId>,
    current: Option<CardId>,
    graded: usize,
    started_at: DateTime<Utc>,
}

impl StudySession {
    /// Start a session over `deck`, consumed from the back.
    pub fn new(set_id: impl Into<SetId>, deck: Vec<CardId>, started_at: DateTime<Utc>) -> Self {
        Self {
            set_id: set_id.into(),
            members: deck.iter().cloned().collect(),
            deck,
            current: None,
            graded: 0,
            started_at,
        }
    }

    pub fn set_id(&self) -> &str {
        &self.set_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Card currently presented and not yet graded.
    pub fn current_card(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Cards still waiting in the deck (redraws not included).
    pub fn remaining(&self) -> usize {
        self.deck.len()
    }

    /// Number of grades recorded in this session.
    pub fn graded(&self) -> usize {
        self.graded
    }

    /// Session cards whose redraw marker is set.
    pub fn pending_redraws(&self, study_data: &SetStudyData) -> usize {
        self.members
            .iter()
            .filter(|id| study_data.redraw_time(id).is_some())
            .count()
    }

    /// Present the next card.
    ///
    /// Order: a redraw that has come due, then the top of the deck, then the
    /// earliest pending redraw. `None` means the session is over. Calling this
    /// again before grading returns the same card.
    pub fn next_card(&mut self, study_data: &SetStudyData, now: DateTime<Utc>) -> Option<CardId> {
        if let Some(current) = &self.current {
            return Some(current.clone());
        }

        let next = self
            .earliest_redraw(study_data, Some(now))
            .or_else(|| self.deck.pop())
            .or_else(|| self.earliest_redraw(study_data, None));

        self.current = next.clone();
        next
    }

    /// Record a grade for the presented card and return the events to dispatch.
    pub fn grade(
        &mut self,
        card_id: &str,
        rating: Rating,
        study_data: &SetStudyData,
        policy: &dyn ReviewPolicy,
        now: DateTime<Utc>,
    ) -> Result<Vec<StudyDataEvent>> {
        match self.current.as_deref() {
            Some(current) if current == card_id => {}
            Some(current) => {
                return Err(CoreError::invariant(format!(
                    "graded card {} but card {} is presented",
                    card_id, current
                )))
            }
            None => {
                return Err(CoreError::invariant(format!(
                    "graded card {} but no card is presented",
                    card_id
                )))
            }
        }

        let events = ReviewProcessor::new(policy).grade(study_data.get(card_id), card_id, rating, now);
        self.current = None;
        self.graded += 1;
        Ok(events)
    }

    /// Drop the presented card without grading it, e.g. when it was deleted.
    ///
    /// The card also leaves the session, so a pending redraw will not bring
    /// it back.
    pub fn skip_current(&mut self) -> Option<CardId> {
        let skipped = self.current.take()?;
        self.members.remove(&skipped);
        Some(skipped)
    }

    /// True once the deck is empty and no session card waits for a redraw.
    pub fn is_finished(&self, study_data: &SetStudyData) -> bool {
        self.current.is_none() && self.deck.is_empty() && self.pending_redraws(study_data) == 0
    }

    /// Session card with the earliest redraw time, optionally only those due by `due_by`.
    fn earliest_redraw(&self, study_data: &SetStudyData, due_by: Option<DateTime<Utc>>) -> Option<CardId> {
        self.members
            .iter()
            .filter_map(|id| study_data.redraw_time(id).map(|time| (time, id)))
            .filter(|(time, _)| due_by.map_or(true, |limit| *time <= limit))
            .min()
            .map(|(_, id)| id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::study::review::Sm2Policy;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn ids(values: &[&str]) -> Vec<CardId> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn grade_and_apply(
        session: &mut StudySession,
        data: SetStudyData,
        card_id: &str,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> SetStudyData {
        let events = session
            .grade(card_id, rating, &data, &Sm2Policy::default(), now)
            .unwrap();
        events.iter().fold(data, |d, e| d.apply(e))
    }

    #[test]
    fn pops_from_the_back() {
        let data = SetStudyData::new("s");
        let mut session = StudySession::new("s", ids(&["a", "b", "c"]), t0());
        assert_eq!(session.next_card(&data, t0()).as_deref(), Some("c"));
        assert_eq!(session.remaining(), 2);
    }

    #[test]
    fn next_card_is_stable_until_graded() {
        let data = SetStudyData::new("s");
        let mut session = StudySession::new("s", ids(&["a", "b"]), t0());
        let first = session.next_card(&data, t0());
        assert_eq!(session.next_card(&data, t0()), first);
        assert_eq!(session.remaining(), 1);
    }

    #[test]
    fn good_grades_run_through_the_deck() {
        let mut data = SetStudyData::new("s");
        let mut session = StudySession::new("s", ids(&["a", "b"]), t0());
        let mut seen = Vec::new();
        while let Some(card) = session.next_card(&data, t0()) {
            data = grade_and_apply(&mut session, data, &card, Rating::Good, t0());
            seen.push(card);
        }
        assert_eq!(seen, ids(&["b", "a"]));
        assert_eq!(session.graded(), 2);
        assert!(session.is_finished(&data));
    }

    #[test]
    fn failed_card_comes_back_when_its_redraw_is_due() {
        let mut data = SetStudyData::new("s");
        let mut session = StudySession::new("s", ids(&["a", "b", "c"]), t0());

        let card = session.next_card(&data, t0()).unwrap();
        assert_eq!(card, "c");
        data = grade_and_apply(&mut session, data, &card, Rating::Again, t0());
        assert_eq!(session.pending_redraws(&data), 1);

        // Redraw not due yet: the deck goes first
        let later = t0() + Duration::seconds(30);
        assert_eq!(session.next_card(&data, later).as_deref(), Some("b"));
        data = grade_and_apply(&mut session, data, "b", Rating::Good, later);

        let after_delay = t0() + Duration::minutes(2);
        assert_eq!(session.next_card(&data, after_delay).as_deref(), Some("c"));
        data = grade_and_apply(&mut session, data, "c", Rating::Good, after_delay);
        assert_eq!(session.pending_redraws(&data), 0);

        assert_eq!(session.next_card(&data, after_delay).as_deref(), Some("a"));
    }

    #[test]
    fn pending_redraw_is_shown_before_the_session_ends() {
        let mut data = SetStudyData::new("s");
        let mut session = StudySession::new("s", ids(&["a"]), t0());

        let card = session.next_card(&data, t0()).unwrap();
        data = grade_and_apply(&mut session, data, &card, Rating::Again, t0());
        assert!(!session.is_finished(&data));

        assert_eq!(session.next_card(&data, t0()).as_deref(), Some("a"));
        data = grade_and_apply(&mut session, data, "a", Rating::Good, t0());
        assert_eq!(session.next_card(&data, t0()), None);
        assert!(session.is_finished(&data));
    }

    #[test]
    fn redraws_of_cards_outside_the_session_are_ignored() {
        let data = SetStudyData::new("s").apply(&StudyDataEvent::UpdateCardStudyData {
            card_id: "elsewhere".to_string(),
            redraw_time: Some(t0()),
            at: t0(),
        });
        let mut session = StudySession::new("s", ids(&["a"]), t0());
        assert_eq!(session.next_card(&data, t0()).as_deref(), Some("a"));
    }

    #[test]
    fn grading_the_wrong_card_is_rejected() {
        let data = SetStudyData::new("s");
        let mut session = StudySession::new("s", ids(&["a", "b"]), t0());
        let policy = Sm2Policy::default();

        let err = session.grade("a", Rating::Good, &data, &policy, t0()).unwrap_err();
        assert!(matches!(err, CoreError::InvariantViolation(_)));

        session.next_card(&data, t0());
        let err = session.grade("a", Rating::Good, &data, &policy, t0()).unwrap_err();
        assert!(matches!(err, CoreError::InvariantViolation(_)));
        assert_eq!(session.current_card(), Some("b"));
    }

    #[test]
    fn skipped_card_leaves_the_session() {
        let mut data = SetStudyData::new("s");
        let mut session = StudySession::new("s", ids(&["a", "b"]), t0());

        assert_eq!(session.next_card(&data, t0()).as_deref(), Some("b"));
        data = grade_and_apply(&mut session, data, "b", Rating::Again, t0());

        assert_eq!(session.next_card(&data, t0()).as_deref(), Some("a"));
        data = grade_and_apply(&mut session, data, "a", Rating::Again, t0());

        // Both wait for a redraw; skipping "a" drops it for good
        let later = t0() + Duration::minutes(2);
        let first = session.next_card(&data, later).unwrap();
        assert_eq!(session.skip_current(), Some(first.clone()));
        assert_eq!(session.pending_redraws(&data), 1);

        let second = session.next_card(&data, later).unwrap();
        assert_ne!(second, first);
        data = grade_and_apply(&mut session, data, &second, Rating::Good, later);
        assert_eq!(session.next_card(&data, later), None);
        assert!(session.is_finished(&data));
        assert_eq!(session.skip_current(), None);
    }

    #[test]
    fn empty_deck_is_finished_immediately() {
        let data = SetStudyData::new("s");
        let mut session = StudySession::new("s", Vec::new(), t0());
        assert!(session.is_finished(&data));
        assert_eq!(session.next_card(&data, t0()), None);
    }
}
