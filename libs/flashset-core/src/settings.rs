//! Study limits and deck ordering settings.

use serde::{Deserialize, Serialize};

/// How the selected cards are arranged in the deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "seed", rename_all = "snake_case")]
pub enum DeckOrder {
    /// New cards followed by known cards, each group in canonical order.
    Stacked,
    /// The stacked deck shuffled with a seeded generator.
    Shuffled(u64),
}

impl Default for DeckOrder {
    fn default() -> Self {
        Self::Stacked
    }
}

impl DeckOrder {
    /// Shuffled order with a random seed.
    pub fn shuffled() -> Self {
        Self::Shuffled(rand::random())
    }
}

/// Per-session card quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyLimits {
    pub max_new_cards: usize,
    pub max_total_cards: usize,
}

impl Default for StudyLimits {
    fn default() -> Self {
        Self {
            max_new_cards: 20,
            max_total_cards: 40,
        }
    }
}

/// Global study settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySettings {
    pub limits: StudyLimits,
    pub deck_order: DeckOrder,
}

/// Per-set settings (all fields optional for overrides).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetStudySettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_new_cards: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_total_cards: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deck_order: Option<DeckOrder>,
}

/// Effective settings (global merged with set overrides).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveStudySettings {
    pub limits: StudyLimits,
    pub deck_order: DeckOrder,
}

impl EffectiveStudySettings {
    /// Merge global settings with optional set settings.
    pub fn merge(global: &StudySettings, set: Option<&SetStudySettings>) -> Self {
        match set {
            Some(s) => Self {
                limits: StudyLimits {
                    max_new_cards: s.max_new_cards.unwrap_or(global.limits.max_new_cards),
                    max_total_cards: s.max_total_cards.unwrap_or(global.limits.max_total_cards),
                },
                deck_order: s.deck_order.unwrap_or(global.deck_order),
            },
            None => Self {
                limits: global.limits,
                deck_order: global.deck_order,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_study_section_limits() {
        let limits = StudyLimits::default();
        assert_eq!(limits.max_new_cards, 20);
        assert_eq!(limits.max_total_cards, 40);
    }

    #[test]
    fn set_overrides_win_field_by_field() {
        let global = StudySettings::default();
        let overrides = SetStudySettings {
            max_new_cards: Some(5),
            ..Default::default()
        };
        let merged = EffectiveStudySettings::merge(&global, Some(&overrides));
        assert_eq!(merged.limits.max_new_cards, 5);
        assert_eq!(merged.limits.max_total_cards, 40);
        assert_eq!(merged.deck_order, DeckOrder::Stacked);
    }

    #[test]
    fn no_overrides_uses_global() {
        let global = StudySettings {
            limits: StudyLimits {
                max_new_cards: 3,
                max_total_cards: 9,
            },
            deck_order: DeckOrder::Shuffled(7),
        };
        let merged = EffectiveStudySettings::merge(&global, None);
        assert_eq!(merged.limits, global.limits);
        assert_eq!(merged.deck_order, DeckOrder::Shuffled(7));
    }

    #[test]
    fn deck_order_serialises_with_seed() {
        let json = serde_json::to_string(&DeckOrder::Shuffled(42)).unwrap();
        assert_eq!(json, r#"{"kind":"shuffled","seed":42}"#);
        let json = serde_json::to_string(&DeckOrder::Stacked).unwrap();
        let stacked: DeckOrder = serde_json::from_str(&json).unwrap();
        assert_eq!(stacked, DeckOrder::Stacked);
    }
}
