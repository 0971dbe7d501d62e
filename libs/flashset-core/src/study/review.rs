//! Review processing: turning a grade into study data events.
//!
//! A [`ReviewPolicy`] decides when a graded card comes back in the current
//! session and whether its due date moves. [`ReviewProcessor::grade`] turns
//! that decision into the events applied to [`SetStudyData`](super::SetStudyData).

use super::{CardStudyData, StudyDataEvent, DEFAULT_EASE_FACTOR};
use crate::types::Rating;
use chrono::{DateTime, Duration, Utc};

/// New due date and the interval state behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct Reschedule {
    pub due_date: DateTime<Utc>,
    pub interval_days: f64,
    pub ease_factor: f64,
}

/// Outcome of grading one card.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewDecision {
    /// When to show the card again in this session, if at all.
    pub redraw_time: Option<DateTime<Utc>>,
    pub reschedule: Option<Reschedule>,
}

/// Trait for review scheduling policies.
pub trait ReviewPolicy: Send + Sync {
    /// Policy identifier.
    fn name(&self) -> &'static str;

    /// Decide what a grade means for a card. `previous` is `None` for a card
    /// that has never been graded.
    fn review(&self, previous: Option<&CardStudyData>, rating: Rating, now: DateTime<Utc>) -> ReviewDecision;
}

/// SM-2 style policy with in-session redraws for weak grades.
#[derive(Debug, Clone)]
pub struct Sm2Policy {
    pub minimum_ease: f64,
    pub easy_bonus: f64,
    pub hard_multiplier: f64,
    pub graduating_interval: f64,
    pub easy_interval: f64,
    pub again_delay: Duration,
    pub hard_delay: Duration,
    /// Longest interval ever scheduled, in days.
    pub maximum_interval: f64,
}

impl Default for Sm2Policy {
    fn default() -> Self {
        Self {
            minimum_ease: 1.3,
            easy_bonus: 1.3,
            hard_multiplier: 1.2,
            graduating_interval: 1.0,
            easy_interval: 4.0,
            again_delay: Duration::minutes(1),
            hard_delay: Duration::minutes(5),
            maximum_interval: 36500.0,
        }
    }
}

impl ReviewPolicy for Sm2Policy {
    fn name(&self) -> &'static str {
        "sm2"
    }

    fn review(&self, previous: Option<&CardStudyData>, rating: Rating, now: DateTime<Utc>) -> ReviewDecision {
        let interval = previous.map(|p| p.interval_days).unwrap_or(0.0);
        let ease = previous.map(|p| p.ease_factor).unwrap_or(DEFAULT_EASE_FACTOR);
        let first_pass = interval <= 0.0;

        let (redraw_time, next) = match rating {
            // Lapse: back to the start, shown again shortly
            Rating::Again => {
                let next = if first_pass {
                    None
                } else {
                    Some((self.graduating_interval, (ease - 0.2).max(self.minimum_ease)))
                };
                (Some(now + self.again_delay), next)
            }
            Rating::Hard => {
                let next_interval = (interval * self.hard_multiplier).max(self.graduating_interval);
                (
                    Some(now + self.hard_delay),
                    Some((next_interval, (ease - 0.15).max(self.minimum_ease))),
                )
            }
            Rating::Good => {
                let next_interval = if first_pass {
                    self.graduating_interval
                } else {
                    (interval * ease).max(1.0)
                };
                (None, Some((next_interval, ease)))
            }
            Rating::Easy => {
                let next_interval = if first_pass {
                    self.easy_interval
                } else {
                    (interval * ease * self.easy_bonus).max(1.0)
                };
                (None, Some((next_interval, ease + 0.15)))
            }
        };

        ReviewDecision {
            redraw_time,
            reschedule: next.map(|(interval_days, ease_factor)| {
                // Stored intervals are not trusted to stay in range
                let interval_days = interval_days.min(self.maximum_interval);
                Reschedule {
                    due_date: now
                        .checked_add_signed(Duration::days(interval_days.ceil() as i64))
                        .unwrap_or(DateTime::<Utc>::MAX_UTC),
                    interval_days,
                    ease_factor,
                }
            }),
        }
    }
}

/// Applies a review policy to graded cards.
pub struct ReviewProcessor<'a> {
    policy: &'a dyn ReviewPolicy,
}

impl<'a> ReviewProcessor<'a> {
    pub fn new(policy: &'a dyn ReviewPolicy) -> Self {
        Self { policy }
    }

    /// Events recording a grade, in the order they must be applied.
    pub fn grade(
        &self,
        previous: Option<&CardStudyData>,
        card_id: &str,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> Vec<StudyDataEvent> {
        let decision = self.policy.review(previous, rating, now);

        let mut events = vec![StudyDataEvent::UpdateCardStudyData {
            card_id: card_id.to_string(),
            redraw_time: decision.redraw_time,
            at: now,
        }];
        if let Some(next) = decision.reschedule {
            events.push(StudyDataEvent::RescheduleCard {
                card_id: card_id.to_string(),
                due_date: next.due_date,
                interval_days: next.interval_days,
                ease_factor: next.ease_factor,
                at: now,
            });
        }
        events
    }
}

/// Get policy by name.
pub fn get_policy(name: &str) -> Option<Box<dyn ReviewPolicy>> {
    match name {
        "sm2" => Some(Box::new(Sm2Policy::default())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::study::SetStudyData;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn reviewed(interval_days: f64, ease_factor: f64) -> CardStudyData {
        CardStudyData {
            due_date: Some(now()),
            interval_days,
            ease_factor,
            ..CardStudyData::new("c1")
        }
    }

    #[test]
    fn again_on_new_card_only_redraws() {
        let decision = Sm2Policy::default().review(None, Rating::Again, now());
        assert_eq!(decision.redraw_time, Some(now() + Duration::minutes(1)));
        assert_eq!(decision.reschedule, None);
    }

    #[test]
    fn good_on_new_card_graduates() {
        let decision = Sm2Policy::default().review(None, Rating::Good, now());
        assert_eq!(decision.redraw_time, None);
        let next = decision.reschedule.unwrap();
        assert_eq!(next.interval_days, 1.0);
        assert_eq!(next.due_date, now() + Duration::days(1));
    }

    #[test]
    fn easy_on_new_card_gets_longer_interval() {
        let decision = Sm2Policy::default().review(None, Rating::Easy, now());
        let next = decision.reschedule.unwrap();
        assert_eq!(next.interval_days, 4.0);
        assert!(next.ease_factor > DEFAULT_EASE_FACTOR);
    }

    #[test]
    fn hard_redraws_and_reschedules() {
        let previous = reviewed(10.0, 2.5);
        let decision = Sm2Policy::default().review(Some(&previous), Rating::Hard, now());
        assert_eq!(decision.redraw_time, Some(now() + Duration::minutes(5)));
        assert_eq!(decision.reschedule.as_ref().unwrap().due_date, now() + Duration::days(12));
        let next = decision.reschedule.unwrap();
        assert!((next.interval_days - 12.0).abs() < 1e-9);
        assert!((next.ease_factor - 2.35).abs() < 1e-9);
    }

    #[test]
    fn lapse_resets_interval() {
        let previous = reviewed(10.0, 2.5);
        let decision = Sm2Policy::default().review(Some(&previous), Rating::Again, now());
        let next = decision.reschedule.unwrap();
        assert_eq!(next.interval_days, 1.0);
        assert!((next.ease_factor - 2.3).abs() < 1e-9);
    }

    #[test]
    fn ease_factor_never_below_minimum() {
        let policy = Sm2Policy::default();
        let previous = reviewed(10.0, 1.4);
        let next = policy
            .review(Some(&previous), Rating::Again, now())
            .reschedule
            .unwrap();
        assert!(next.ease_factor >= policy.minimum_ease);
    }

    #[test]
    fn huge_stored_interval_is_capped() {
        let policy = Sm2Policy::default();
        let previous = reviewed(1.0e9, 2.5);
        let next = policy
            .review(Some(&previous), Rating::Good, now())
            .reschedule
            .unwrap();
        assert_eq!(next.interval_days, policy.maximum_interval);
        assert_eq!(next.due_date, now() + Duration::days(36500));

        let previous = reviewed(f64::MAX, f64::MAX);
        let next = policy
            .review(Some(&previous), Rating::Easy, now())
            .reschedule
            .unwrap();
        assert_eq!(next.interval_days, policy.maximum_interval);
    }

    #[test]
    fn processor_emits_update_then_reschedule() {
        let policy = Sm2Policy::default();
        let events = ReviewProcessor::new(&policy).grade(None, "c1", Rating::Good, now());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind(), "update_card_study_data");
        assert_eq!(events[1].kind(), "reschedule_card");

        let data = events.iter().fold(SetStudyData::new("s"), |d, e| d.apply(e));
        let card = data.get("c1").unwrap();
        assert_eq!(card.due_date, Some(now() + Duration::days(1)));
        assert_eq!(card.redraw_time, None);
    }

    #[test]
    fn processor_failed_first_review_keeps_baseline_due_date() {
        let policy = Sm2Policy::default();
        let events = ReviewProcessor::new(&policy).grade(None, "c1", Rating::Again, now());
        assert_eq!(events.len(), 1);

        let data = events.iter().fold(SetStudyData::new("s"), |d, e| d.apply(e));
        let card = data.get("c1").unwrap();
        assert_eq!(card.due_date, Some(now()));
        assert!(card.needs_redraw());
    }

    #[test]
    fn policy_lookup() {
        assert_eq!(get_policy("sm2").map(|p| p.name()), Some("sm2"));
        assert!(get_policy("fsrs").is_none());
    }
}
