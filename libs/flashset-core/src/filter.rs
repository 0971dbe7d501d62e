//! Tag filtering over a set's canonical card order.

use crate::types::{Card, CardId, TagFilter};
use std::collections::HashMap;

/// Return the ids from `card_order` whose card carries every tag in `filter`.
///
/// The result keeps the relative order of `card_order`. Ids without a loaded
/// card are skipped: a card that is not in the store yet is not eligible for
/// anything.
pub fn filter_card_order(
    card_order: &[CardId],
    cards: &HashMap<CardId, Card>,
    filter: &TagFilter,
) -> Vec<CardId> {
    card_order
        .iter()
        .filter(|id| {
            cards
                .get(id.as_str())
                .map(|card| filter.matches(&card.tags))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}
