//! Core flashcard set library.
//!
//! Provides:
//! - Card store and tag filtering for flashcard sets
//! - Per-card study data with a pure event reducer
//! - Study deck selection with new/known quotas
//! - Review policies (SM-2) and the in-session cursor
//! - Shared types (Card, CardFace, Rating, Remote, etc.)

pub mod error;
pub mod filter;
pub mod remote;
pub mod set;
pub mod settings;
pub mod study;
pub mod types;

pub use error::{CoreError, Result};
pub use filter::filter_card_order;
pub use remote::{Remote, RemoteStatus};
pub use set::{FlashCardSet, SetEvent};
pub use settings::{DeckOrder, EffectiveStudySettings, SetStudySettings, StudyLimits, StudySettings};
pub use study::review::{get_policy, ReviewDecision, ReviewPolicy, ReviewProcessor, Reschedule, Sm2Policy};
pub use study::scheduler::{build_deck, StudyOverview, StudyPlan};
pub use study::session::StudySession;
pub use study::{CardStudyData, SetStudyData, StudyDataEvent};
pub use types::{Card, CardFace, CardId, FaceSide, FaceType, Rating, SetId, TagFilter};
