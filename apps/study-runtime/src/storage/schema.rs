//! SQLite schema definitions.

/// Current schema version for migrations.
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema for the local SQLite database.
pub const SCHEMA: &str = r#"
-- Flashcard sets. card_order and tag_filter are JSON arrays.
CREATE TABLE IF NOT EXISTS sets (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    card_order TEXT NOT NULL DEFAULT '[]',
    tag_filter TEXT NOT NULL DEFAULT '[]'
);

-- Cards. Face content is an opaque editor blob; tags is a JSON array.
CREATE TABLE IF NOT EXISTS cards (
    set_id TEXT NOT NULL REFERENCES sets(id),
    id TEXT NOT NULL,
    front_type TEXT NOT NULL DEFAULT 'rich_text',
    front_content TEXT,
    back_type TEXT NOT NULL DEFAULT 'rich_text',
    back_content TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    PRIMARY KEY (set_id, id)
);

-- Per-card study data
CREATE TABLE IF NOT EXISTS card_study_data (
    set_id TEXT NOT NULL,
    card_id TEXT NOT NULL,
    due_date TEXT,
    redraw_time TEXT,
    interval_days REAL NOT NULL DEFAULT 0,
    ease_factor REAL NOT NULL DEFAULT 2.5,
    PRIMARY KEY (set_id, card_id)
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_cards_set ON cards(set_id);
CREATE INDEX IF NOT EXISTS idx_card_study_data_due ON card_study_data(set_id, due_date);
"#;

/// Record the schema version if not recorded yet.
pub const INIT_SCHEMA_VERSION: &str = r#"
INSERT OR IGNORE INTO schema_version (version) VALUES (1);
"#;
