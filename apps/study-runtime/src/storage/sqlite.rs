//! SQLite implementation of the storage repositories.

use super::schema::{INIT_SCHEMA_VERSION, SCHEMA, SCHEMA_VERSION};
use super::{CardRepository, SetRepository, SetSummary, StudyDataRepository};
use crate::error::StorageError;
use chrono::{DateTime, Utc};
use flashset_core::{Card, CardFace, CardId, CardStudyData, FaceType, FlashCardSet, SetStudyData, TagFilter};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

type Result<T> = std::result::Result<T, StorageError>;

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open database at path, creating if necessary.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let storage = Self { conn };
        storage.initialize()?;
        Ok(storage)
    }

    /// Open in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self { conn };
        storage.initialize()?;
        Ok(storage)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        self.conn.execute_batch(INIT_SCHEMA_VERSION)?;
        Ok(())
    }

    pub fn schema_version(&self) -> Result<i32> {
        let version: Option<i32> = self
            .conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
        Ok(version.unwrap_or(SCHEMA_VERSION))
    }
}

fn parse_time(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value
        .map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| StorageError::InvalidData(format!("bad timestamp {}: {}", s, e)))
        })
        .transpose()
}

fn format_time(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(|dt| dt.to_rfc3339())
}

/// Columns: id, front_type, front_content, back_type, back_content, tags.
fn card_from_row(row: &Row<'_>) -> rusqlite::Result<(String, String, Option<String>, String, Option<String>, String)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

impl SetRepository for SqliteStorage {
    fn list_sets(&self) -> Result<Vec<SetSummary>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, card_order FROM sets ORDER BY name, id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut sets = Vec::new();
        for row in rows {
            let (id, name, card_order) = row?;
            let card_order: Vec<CardId> = serde_json::from_str(&card_order)?;
            sets.push(SetSummary {
                id,
                name,
                card_count: card_order.len(),
            });
        }
        Ok(sets)
    }

    fn get_set(&self, set_id: &str) -> Result<Option<FlashCardSet>> {
        let row = self
            .conn
            .query_row(
                "SELECT name, card_order, tag_filter FROM sets WHERE id = ?1",
                params![set_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((name, card_order, tag_filter)) => {
                let card_order: Vec<CardId> = serde_json::from_str(&card_order)?;
                let filter: TagFilter = serde_json::from_str(&tag_filter)?;
                let set = FlashCardSet::from_parts(set_id, name, card_order, Vec::new(), filter)?;
                Ok(Some(set))
            }
            None => Ok(None),
        }
    }

    fn save_set(&mut self, set: &FlashCardSet) -> Result<()> {
        let card_order = serde_json::to_string(set.card_order())?;
        let tag_filter = serde_json::to_string(set.filter())?;
        self.conn.execute(
            "INSERT INTO sets (id, name, card_order, tag_filter) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                card_order = excluded.card_order,
                tag_filter = excluded.tag_filter",
            params![set.id(), set.name(), card_order, tag_filter],
        )?;
        Ok(())
    }
}

impl CardRepository for SqliteStorage {
    fn get_cards(&self, set_id: &str, card_ids: &[CardId]) -> Result<Vec<Card>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, front_type, front_content, back_type, back_content, tags
             FROM cards WHERE set_id = ?1 AND id = ?2",
        )?;

        let mut seen = HashSet::new();
        let mut cards = Vec::with_capacity(card_ids.len());
        for card_id in card_ids {
            if !seen.insert(card_id.as_str()) {
                continue;
            }
            let row = stmt
                .query_row(params![set_id, card_id], card_from_row)
                .optional()?;
            if let Some((id, front_type, front_content, back_type, back_content, tags)) = row {
                let tags: BTreeSet<String> = serde_json::from_str(&tags)?;
                cards.push(Card {
                    id,
                    front: CardFace {
                        face_type: FaceType::parse(&front_type)?,
                        content: front_content,
                    },
                    back: CardFace {
                        face_type: FaceType::parse(&back_type)?,
                        content: back_content,
                    },
                    tags,
                });
            }
        }
        Ok(cards)
    }

    fn save_card(&mut self, set_id: &str, card: &Card) -> Result<()> {
        let tags = serde_json::to_string(&card.tags)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO cards (set_id, id, front_type, front_content, back_type, back_content, tags)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                set_id,
                card.id,
                card.front.face_type.as_str(),
                card.front.content,
                card.back.face_type.as_str(),
                card.back.content,
                tags
            ],
        )?;
        Ok(())
    }

    fn delete_card(&mut self, set_id: &str, card_id: &str) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM cards WHERE set_id = ?1 AND id = ?2",
            params![set_id, card_id],
        )?;
        tx.execute(
            "DELETE FROM card_study_data WHERE set_id = ?1 AND card_id = ?2",
            params![set_id, card_id],
        )?;
        tx.commit()?;
        Ok(())
    }
}

impl StudyDataRepository for SqliteStorage {
    fn get_study_data(&self, set_id: &str) -> Result<SetStudyData> {
        let mut stmt = self.conn.prepare(
            "SELECT card_id, due_date, redraw_time, interval_days, ease_factor
             FROM card_study_data WHERE set_id = ?1",
        )?;
        let rows = stmt.query_map(params![set_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
            ))
        })?;

        let mut data = SetStudyData::new(set_id);
        for row in rows {
            let (card_id, due_date, redraw_time, interval_days, ease_factor) = row?;
            data.card_data.insert(
                card_id.clone(),
                CardStudyData {
                    card_id,
                    due_date: parse_time(due_date)?,
                    redraw_time: parse_time(redraw_time)?,
                    interval_days,
                    ease_factor,
                },
            );
        }
        Ok(data)
    }

    /// Replace the set's study data; rows for cards no longer in `data` go.
    fn save_study_data(&mut self, data: &SetStudyData) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM card_study_data WHERE set_id = ?1",
            params![data.set_id],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO card_study_data
                 (set_id, card_id, due_date, redraw_time, interval_days, ease_factor)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for card in data.card_data.values() {
                stmt.execute(params![
                    data.set_id,
                    card.card_id,
                    format_time(card.due_date),
                    format_time(card.redraw_time),
                    card.interval_days,
                    card.ease_factor,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
