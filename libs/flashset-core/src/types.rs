//! Core types for flashcard sets.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identifier of a card, unique within its set.
pub type CardId = String;

/// Identifier of a flashcard set.
pub type SetId = String;

/// Kind of content stored on a card face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceType {
    RichText,
}

impl Default for FaceType {
    fn default() -> Self {
        Self::RichText
    }
}

impl FaceType {
    /// Get the face type name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RichText => "rich_text",
        }
    }

    /// Parse from string. Unknown discriminants are an error, never coerced.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "rich_text" => Ok(Self::RichText),
            other => Err(CoreError::UnknownFaceType(other.to_string())),
        }
    }
}

/// One side of a card. The content blob is owned by the editor and opaque here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardFace {
    pub face_type: FaceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl CardFace {
    pub fn rich_text(content: impl Into<String>) -> Self {
        Self {
            face_type: FaceType::RichText,
            content: Some(content.into()),
        }
    }
}

/// Which face of a card an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceSide {
    Front,
    Back,
}

/// A flashcard with its faces and tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub front: CardFace,
    pub back: CardFace,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Card {
    /// Create a card with empty faces and no tags.
    pub fn blank(id: impl Into<CardId>) -> Self {
        Self {
            id: id.into(),
            front: CardFace::default(),
            back: CardFace::default(),
            tags: BTreeSet::new(),
        }
    }

    /// Builder-style helper to attach tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn face(&self, side: FaceSide) -> &CardFace {
        match side {
            FaceSide::Front => &self.front,
            FaceSide::Back => &self.back,
        }
    }

    pub(crate) fn face_mut(&mut self, side: FaceSide) -> &mut CardFace {
        match side {
            FaceSide::Front => &mut self.front,
            FaceSide::Back => &mut self.back,
        }
    }
}

/// Active tag filter. A card matches when it carries every tag in the filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagFilter {
    tags: BTreeSet<String>,
}

impl TagFilter {
    /// Filter that lets every card through.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// True when `tags` is a superset of this filter.
    pub fn matches(&self, tags: &BTreeSet<String>) -> bool {
        self.tags.is_subset(tags)
    }
}

/// Grading outcome for a presented card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    /// Convert to 4-point numeric value (1-4).
    pub fn to_value(self) -> u8 {
        match self {
            Self::Again => 1,
            Self::Hard => 2,
            Self::Good => 3,
            Self::Easy => 4,
        }
    }

    /// Create from 4-point numeric value.
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Again),
            2 => Some(Self::Hard),
            3 => Some(Self::Good),
            4 => Some(Self::Easy),
            _ => None,
        }
    }

    /// Map 2-point rating to 4-point.
    /// Wrong -> Again, Correct -> Good
    pub fn from_2point(correct: bool) -> Self {
        if correct {
            Self::Good
        } else {
            Self::Again
        }
    }

    /// Whether the card was recalled well enough to move its due date.
    pub fn is_pass(self) -> bool {
        !matches!(self, Self::Again)
    }
}
