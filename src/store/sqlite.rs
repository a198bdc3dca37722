use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_id_list(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_else(|e| {
        tracing::error!("Invalid id list in database: '{}' - {}", s, e);
        Vec::new()
    })
}

fn format_id_list(ids: &[String]) -> String {
    serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string())
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

const CARD_COLUMNS: &str = "id, tenant_id, category_id, creator_id, created_by_role, question, \
     answer, tags, difficulty, is_public, fingerprint, created_at, updated_at";

fn read_card(row: &Row<'_>) -> rusqlite::Result<Card> {
    Ok(Card {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        category_id: row.get(2)?,
        creator_id: row.get(3)?,
        created_by_role: Role::parse(&row.get::<_, String>(4)?),
        question: row.get(5)?,
        answer: row.get(6)?,
        tags: parse_id_list(&row.get::<_, String>(7)?),
        difficulty: row.get(8)?,
        is_public: row.get(9)?,
        fingerprint: row.get(10)?,
        created_at: parse_datetime(&row.get::<_, String>(11)?),
        updated_at: parse_datetime(&row.get::<_, String>(12)?),
    })
}

const DECK_COLUMNS: &str = "id, tenant_id, owner_id, name, description, card_ids, \
     hidden_card_ids, category_ids, is_public, created_at, updated_at";

fn read_deck(row: &Row<'_>) -> rusqlite::Result<Deck> {
    Ok(Deck {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        owner_id: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        card_ids: parse_id_list(&row.get::<_, String>(5)?),
        hidden_card_ids: parse_id_list(&row.get::<_, String>(6)?),
        category_ids: parse_id_list(&row.get::<_, String>(7)?),
        is_public: row.get(8)?,
        created_at: parse_datetime(&row.get::<_, String>(9)?),
        updated_at: parse_datetime(&row.get::<_, String>(10)?),
    })
}

const SUGGESTION_COLUMNS: &str = "id, tenant_id, category_id, current_priority, \
     suggested_priority, reason, created_at, applied_at, dismissed_at";

fn read_suggestion(row: &Row<'_>) -> rusqlite::Result<PrioritySuggestion> {
    Ok(PrioritySuggestion {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        category_id: row.get(2)?,
        current_priority: row.get(3)?,
        suggested_priority: row.get(4)?,
        reason: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
        applied_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
        dismissed_at: row.get::<_, Option<String>>(8)?.map(|s| parse_datetime(&s)),
    })
}

fn read_tenant(row: &Row<'_>) -> rusqlite::Result<Tenant> {
    Ok(Tenant {
        id: row.get(0)?,
        name: row.get(1)?,
        tier: Tier::parse(&row.get::<_, String>(2)?),
        created_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

fn read_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        name: row.get(2)?,
        role: Role::parse(&row.get::<_, String>(3)?),
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        updated_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Tenant operations

    fn create_tenant(&self, tenant: &Tenant) -> Result<()> {
        self.conn().execute(
            "INSERT INTO tenants (id, name, tier, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                tenant.id,
                tenant.name,
                tenant.tier.as_str(),
                format_datetime(&tenant.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_tenant(&self, id: &str) -> Result<Option<Tenant>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, tier, created_at FROM tenants WHERE id = ?1",
            params![id],
            read_tenant,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_tenant_by_name(&self, name: &str) -> Result<Option<Tenant>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, tier, created_at FROM tenants WHERE name = ?1",
            params![name],
            read_tenant,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_tenants(&self, cursor: &str, limit: i32) -> Result<Vec<Tenant>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, tier, created_at FROM tenants WHERE id > ?1 ORDER BY id LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![cursor, limit], read_tenant)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_tenant_tier(&self, id: &str, tier: Tier) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE tenants SET tier = ?1 WHERE id = ?2",
            params![tier.as_str(), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_tenant(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tenants WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        self.conn().execute(
            "INSERT INTO users (id, tenant_id, name, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id,
                user.tenant_id,
                user.name,
                user.role.as_str(),
                format_datetime(&user.created_at),
                format_datetime(&user.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, tenant_id, name, role, created_at, updated_at FROM users WHERE id = ?1",
            params![id],
            read_user,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_tenant_users(&self, tenant_id: &str) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, tenant_id, name, role, created_at, updated_at
             FROM users WHERE tenant_id = ?1 ORDER BY name",
        )?;

        let rows = stmt.query_map(params![tenant_id], read_user)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_user(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.is_admin,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::TokenLookupCollision),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at
             FROM tokens WHERE token_lookup = ?1",
            params![lookup],
            |row| {
                Ok(Token {
                    id: row.get(0)?,
                    token_hash: row.get(1)?,
                    token_lookup: row.get(2)?,
                    is_admin: row.get(3)?,
                    user_id: row.get(4)?,
                    created_at: parse_datetime(&row.get::<_, String>(5)?),
                    expires_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
                    last_used_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn has_admin_token(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM tokens WHERE is_admin = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Category operations

    fn create_category(&self, category: &Category) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO categories (id, tenant_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                category.id,
                category.tenant_id,
                category.name,
                format_datetime(&category.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => {
                Err(Error::Conflict("category already exists".to_string()))
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_category(&self, id: &str) -> Result<Option<Category>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, tenant_id, name, created_at FROM categories WHERE id = ?1",
            params![id],
            |row| {
                Ok(Category {
                    id: row.get(0)?,
                    tenant_id: row.get(1)?,
                    name: row.get(2)?,
                    created_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_tenant_categories(&self, tenant_id: &str) -> Result<Vec<Category>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, tenant_id, name, created_at
             FROM categories WHERE tenant_id = ?1 ORDER BY name",
        )?;

        let rows = stmt.query_map(params![tenant_id], |row| {
            Ok(Category {
                id: row.get(0)?,
                tenant_id: row.get(1)?,
                name: row.get(2)?,
                created_at: parse_datetime(&row.get::<_, String>(3)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Card operations

    fn create_card(&self, card: &Card) -> Result<bool> {
        let result = self.conn().execute(
            "INSERT INTO cards (id, tenant_id, category_id, creator_id, created_by_role, question,
                                answer, tags, difficulty, is_public, fingerprint, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                card.id,
                card.tenant_id,
                card.category_id,
                card.creator_id,
                card.created_by_role.as_str(),
                card.question,
                card.answer,
                format_id_list(&card.tags),
                card.difficulty,
                card.is_public,
                card.fingerprint,
                format_datetime(&card.created_at),
                format_datetime(&card.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(true),
            // The (tenant, fingerprint) constraint: duplicate content
            // is "already exists", never a hard failure.
            Err(e) if is_constraint_violation(&e) => Ok(false),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn create_cards(&self, cards: &[Card]) -> Result<(usize, usize)> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let mut created = 0;
        for card in cards {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO cards (id, tenant_id, category_id, creator_id, created_by_role,
                     question, answer, tags, difficulty, is_public, fingerprint, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    card.id,
                    card.tenant_id,
                    card.category_id,
                    card.creator_id,
                    card.created_by_role.as_str(),
                    card.question,
                    card.answer,
                    format_id_list(&card.tags),
                    card.difficulty,
                    card.is_public,
                    card.fingerprint,
                    format_datetime(&card.created_at),
                    format_datetime(&card.updated_at),
                ],
            )?;
            created += inserted;
        }

        tx.commit()?;
        Ok((created, cards.len() - created))
    }

    fn get_card(&self, id: &str) -> Result<Option<Card>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = ?1"),
            params![id],
            read_card,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_category_cards(&self, category_id: &str) -> Result<Vec<Card>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE category_id = ?1 ORDER BY created_at"
        ))?;

        let rows = stmt.query_map(params![category_id], read_card)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_card_meta(&self, card: &Card) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE cards SET tags = ?1, difficulty = ?2, is_public = ?3, updated_at = ?4
             WHERE id = ?5",
            params![
                format_id_list(&card.tags),
                card.difficulty,
                card.is_public,
                format_datetime(&Utc::now()),
                card.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // Card access grants

    fn grant_card_access(&self, access: &CardAccess) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO card_access (tenant_id, card_id, user_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                access.tenant_id,
                access.card_id,
                access.user_id,
                format_datetime(&access.created_at),
            ],
        )?;
        Ok(())
    }

    fn has_card_access(&self, card_id: &str, user_id: &str) -> Result<bool> {
        let conn = self.conn();
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM card_access WHERE card_id = ?1 AND user_id = ?2",
            params![card_id, user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Progress operations

    fn get_progress(
        &self,
        tenant_id: &str,
        user_id: &str,
        card_id: &str,
    ) -> Result<Option<Progress>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT tenant_id, user_id, card_id, exposure_count, correct_count, incorrect_count,
                    mastery_score, repetitions, interval_days, ease_factor, next_review_at, last_seen_at
             FROM progress WHERE tenant_id = ?1 AND user_id = ?2 AND card_id = ?3",
            params![tenant_id, user_id, card_id],
            |row| {
                Ok(Progress {
                    tenant_id: row.get(0)?,
                    user_id: row.get(1)?,
                    card_id: row.get(2)?,
                    exposure_count: row.get(3)?,
                    correct_count: row.get(4)?,
                    incorrect_count: row.get(5)?,
                    mastery_score: row.get(6)?,
                    repetitions: row.get(7)?,
                    interval_days: row.get(8)?,
                    ease_factor: row.get(9)?,
                    next_review_at: parse_datetime(&row.get::<_, String>(10)?),
                    last_seen_at: parse_datetime(&row.get::<_, String>(11)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn upsert_progress(&self, write: &ProgressWrite) -> Result<()> {
        // One conditional statement; concurrent submissions for the
        // same triple serialize in the store. The insert arm seeds
        // repetitions at 0 so the recurrence starts counting from the
        // second review; the conflict arm stores the scheduler output
        // and keeps exposure = correct + incorrect by construction.
        let correct = i64::from(write.correct);
        let incorrect = 1 - correct;
        self.conn().execute(
            "INSERT INTO progress (tenant_id, user_id, card_id, exposure_count, correct_count,
                 incorrect_count, mastery_score, repetitions, interval_days, ease_factor,
                 next_review_at, last_seen_at)
             VALUES (?1, ?2, ?3, 1, ?4, ?5, CAST(?4 AS REAL), 0, ?7, ?8, ?9, ?10)
             ON CONFLICT (tenant_id, user_id, card_id) DO UPDATE SET
                 exposure_count = exposure_count + 1,
                 correct_count = correct_count + ?4,
                 incorrect_count = incorrect_count + ?5,
                 mastery_score = CAST(correct_count + ?4 AS REAL) / (exposure_count + 1),
                 repetitions = ?6,
                 interval_days = ?7,
                 ease_factor = ?8,
                 next_review_at = ?9,
                 last_seen_at = ?10",
            params![
                write.tenant_id,
                write.user_id,
                write.card_id,
                correct,
                incorrect,
                write.repetitions,
                write.interval_days,
                write.ease_factor,
                format_datetime(&write.next_review_at),
                format_datetime(&write.last_seen_at),
            ],
        )?;
        Ok(())
    }

    fn list_progress_samples(&self, tenant_id: &str) -> Result<Vec<ProgressSample>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT c.category_id, p.exposure_count, p.mastery_score
             FROM progress p
             JOIN cards c ON c.id = p.card_id
             WHERE p.tenant_id = ?1",
        )?;

        let rows = stmt.query_map(params![tenant_id], |row| {
            Ok(ProgressSample {
                category_id: row.get(0)?,
                exposure_count: row.get(1)?,
                mastery_score: row.get(2)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Deck operations

    fn create_deck(&self, deck: &Deck) -> Result<()> {
        self.conn().execute(
            "INSERT INTO decks (id, tenant_id, owner_id, name, description, card_ids,
                 hidden_card_ids, category_ids, is_public, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                deck.id,
                deck.tenant_id,
                deck.owner_id,
                deck.name,
                deck.description,
                format_id_list(&deck.card_ids),
                format_id_list(&deck.hidden_card_ids),
                format_id_list(&deck.category_ids),
                deck.is_public,
                format_datetime(&deck.created_at),
                format_datetime(&deck.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_deck(&self, id: &str) -> Result<Option<Deck>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {DECK_COLUMNS} FROM decks WHERE id = ?1"),
            params![id],
            read_deck,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_user_decks(&self, owner_id: &str) -> Result<Vec<Deck>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {DECK_COLUMNS} FROM decks WHERE owner_id = ?1 ORDER BY name"
        ))?;

        let rows = stmt.query_map(params![owner_id], read_deck)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_decks_shared_with(&self, user_id: &str) -> Result<Vec<Deck>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM decks d
             JOIN deck_shares s ON s.deck_id = d.id
             WHERE s.shared_with = ?1
             ORDER BY d.name",
            DECK_COLUMNS
                .split(", ")
                .map(|c| format!("d.{c}"))
                .collect::<Vec<_>>()
                .join(", ")
        ))?;

        let rows = stmt.query_map(params![user_id], read_deck)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_user_decks(&self, owner_id: &str) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM decks WHERE owner_id = ?1",
            params![owner_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn update_deck(&self, deck: &Deck) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE decks SET name = ?1, description = ?2, card_ids = ?3, hidden_card_ids = ?4,
                 category_ids = ?5, is_public = ?6, updated_at = ?7
             WHERE id = ?8",
            params![
                deck.name,
                deck.description,
                format_id_list(&deck.card_ids),
                format_id_list(&deck.hidden_card_ids),
                format_id_list(&deck.category_ids),
                deck.is_public,
                format_datetime(&Utc::now()),
                deck.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_deck(&self, id: &str) -> Result<bool> {
        // Cards and access grants stay; a deck is only a reference list.
        let rows = self
            .conn()
            .execute("DELETE FROM decks WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn get_deck_share(&self, deck_id: &str, user_id: &str) -> Result<Option<DeckShare>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT deck_id, shared_by, shared_with, created_at, updated_at
             FROM deck_shares WHERE deck_id = ?1 AND shared_with = ?2",
            params![deck_id, user_id],
            |row| {
                Ok(DeckShare {
                    deck_id: row.get(0)?,
                    shared_by: row.get(1)?,
                    shared_with: row.get(2)?,
                    created_at: parse_datetime(&row.get::<_, String>(3)?),
                    updated_at: parse_datetime(&row.get::<_, String>(4)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn accept_deck(
        &self,
        source: &Deck,
        acceptor: &User,
        max_cards: Limit,
    ) -> Result<(Deck, usize)> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let now = Utc::now();

        // Re-read inside the transaction: a concurrent delete of the
        // source must not produce a half-copied deck.
        let exists: Option<String> = tx
            .query_row(
                "SELECT id FROM decks WHERE id = ?1",
                params![source.id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(Error::NotFound);
        }

        let mut included: Vec<String> = Vec::new();
        for card_id in &source.card_ids {
            let card: Option<(String, bool)> = tx
                .query_row(
                    "SELECT creator_id, is_public FROM cards WHERE id = ?1",
                    params![card_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let Some((creator_id, is_public)) = card else {
                continue;
            };

            if creator_id == acceptor.id {
                included.push(card_id.clone());
                continue;
            }

            let has_access: i32 = tx.query_row(
                "SELECT COUNT(*) FROM card_access WHERE card_id = ?1 AND user_id = ?2",
                params![card_id, acceptor.id],
                |row| row.get(0),
            )?;
            if has_access > 0 {
                included.push(card_id.clone());
                continue;
            }

            if is_public {
                tx.execute(
                    "INSERT OR IGNORE INTO card_access (tenant_id, card_id, user_id, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![acceptor.tenant_id, card_id, acceptor.id, format_datetime(&now)],
                )?;
                included.push(card_id.clone());
            }
            // Private cards the acceptor cannot read are dropped, not errors.
        }

        included.truncate(max_cards.cap(included.len()));
        let accepted = included.len();

        let deck = Deck {
            id: Uuid::new_v4().to_string(),
            tenant_id: acceptor.tenant_id.clone(),
            owner_id: acceptor.id.clone(),
            name: source.name.clone(),
            description: source.description.clone(),
            card_ids: included,
            hidden_card_ids: Vec::new(),
            category_ids: source.category_ids.clone(),
            is_public: false,
            created_at: now,
            updated_at: now,
        };

        tx.execute(
            "INSERT INTO decks (id, tenant_id, owner_id, name, description, card_ids,
                 hidden_card_ids, category_ids, is_public, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                deck.id,
                deck.tenant_id,
                deck.owner_id,
                deck.name,
                deck.description,
                format_id_list(&deck.card_ids),
                format_id_list(&deck.hidden_card_ids),
                format_id_list(&deck.category_ids),
                deck.is_public,
                format_datetime(&deck.created_at),
                format_datetime(&deck.updated_at),
            ],
        )?;

        tx.commit()?;
        Ok((deck, accepted))
    }

    fn share_decks(
        &self,
        sharer: &User,
        decks: &[Deck],
        recipients: &ShareRecipients,
    ) -> Result<(usize, usize)> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let now = format_datetime(&Utc::now());

        let recipient_count = match recipients {
            ShareRecipients::All => {
                for deck in decks {
                    tx.execute(
                        "UPDATE decks SET is_public = 1, updated_at = ?1 WHERE id = ?2",
                        params![now, deck.id],
                    )?;
                }
                0
            }
            ShareRecipients::Users(user_ids) => {
                let mut count = 0;
                for user_id in user_ids {
                    if user_id == &sharer.id {
                        continue;
                    }
                    count += 1;
                    for deck in decks {
                        tx.execute(
                            "INSERT INTO deck_shares (deck_id, shared_by, shared_with, created_at, updated_at)
                             VALUES (?1, ?2, ?3, ?4, ?4)
                             ON CONFLICT (deck_id, shared_with) DO UPDATE SET
                                shared_by = excluded.shared_by,
                                updated_at = excluded.updated_at",
                            params![deck.id, sharer.id, user_id, now],
                        )?;
                    }
                }
                count
            }
        };

        tx.commit()?;
        Ok((decks.len(), recipient_count))
    }

    // Category priority operations

    fn get_category_priority(&self, tenant_id: &str, category_id: &str) -> Result<Option<i64>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT priority FROM category_priorities WHERE tenant_id = ?1 AND category_id = ?2",
            params![tenant_id, category_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
    }

    fn set_category_priority(
        &self,
        tenant_id: &str,
        category_id: &str,
        priority: i64,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO category_priorities (tenant_id, category_id, priority, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT (tenant_id, category_id) DO UPDATE SET
                priority = excluded.priority,
                updated_at = excluded.updated_at",
            params![tenant_id, category_id, priority, format_datetime(&Utc::now())],
        )?;
        Ok(())
    }

    fn set_user_category_priority(
        &self,
        tenant_id: &str,
        user_id: &str,
        category_id: &str,
        priority: i64,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO user_category_priorities (tenant_id, user_id, category_id, priority, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT (tenant_id, user_id, category_id) DO UPDATE SET
                priority = excluded.priority,
                updated_at = excluded.updated_at",
            params![tenant_id, user_id, category_id, priority, format_datetime(&Utc::now())],
        )?;
        Ok(())
    }

    fn get_user_category_priority(
        &self,
        tenant_id: &str,
        user_id: &str,
        category_id: &str,
    ) -> Result<Option<i64>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT priority FROM user_category_priorities
             WHERE tenant_id = ?1 AND user_id = ?2 AND category_id = ?3",
            params![tenant_id, user_id, category_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_category_priorities(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<Vec<CategoryPriorityView>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT cat.id, cat.name,
                    COALESCE(ucp.priority, cp.priority, 5) AS priority,
                    (SELECT COUNT(*) FROM cards c WHERE c.category_id = cat.id) AS card_count
             FROM categories cat
             LEFT JOIN category_priorities cp
                    ON cp.tenant_id = cat.tenant_id AND cp.category_id = cat.id
             LEFT JOIN user_category_priorities ucp
                    ON ucp.tenant_id = cat.tenant_id AND ucp.category_id = cat.id
                       AND ucp.user_id = ?2
             WHERE cat.tenant_id = ?1
             ORDER BY cat.name",
        )?;

        let rows = stmt.query_map(params![tenant_id, user_id], |row| {
            Ok(CategoryPriorityView {
                category_id: row.get(0)?,
                name: row.get(1)?,
                priority: row.get(2)?,
                card_count: row.get(3)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Suggestion operations

    fn create_suggestion(&self, suggestion: &PrioritySuggestion) -> Result<bool> {
        let result = self.conn().execute(
            "INSERT INTO priority_suggestions (id, tenant_id, category_id, current_priority,
                 suggested_priority, reason, created_at, applied_at, dismissed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, NULL)",
            params![
                suggestion.id,
                suggestion.tenant_id,
                suggestion.category_id,
                suggestion.current_priority,
                suggestion.suggested_priority,
                suggestion.reason,
                format_datetime(&suggestion.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(true),
            // Partial unique index: an open suggestion already exists.
            Err(e) if is_constraint_violation(&e) => Ok(false),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_suggestion(&self, id: &str) -> Result<Option<PrioritySuggestion>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {SUGGESTION_COLUMNS} FROM priority_suggestions WHERE id = ?1"),
            params![id],
            read_suggestion,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_open_suggestions(&self, tenant_id: &str) -> Result<Vec<PrioritySuggestion>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SUGGESTION_COLUMNS} FROM priority_suggestions
             WHERE tenant_id = ?1 AND applied_at IS NULL AND dismissed_at IS NULL
             ORDER BY created_at"
        ))?;

        let rows = stmt.query_map(params![tenant_id], read_suggestion)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn apply_suggestion(&self, id: &str, now: DateTime<Utc>) -> Result<PrioritySuggestion> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let mut suggestion = tx
            .query_row(
                &format!("SELECT {SUGGESTION_COLUMNS} FROM priority_suggestions WHERE id = ?1"),
                params![id],
                read_suggestion,
            )
            .optional()?
            .ok_or(Error::NotFound)?;

        if !suggestion.is_open() {
            return Err(Error::Conflict("suggestion already resolved".to_string()));
        }

        tx.execute(
            "INSERT INTO category_priorities (tenant_id, category_id, priority, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT (tenant_id, category_id) DO UPDATE SET
                priority = excluded.priority,
                updated_at = excluded.updated_at",
            params![
                suggestion.tenant_id,
                suggestion.category_id,
                suggestion.suggested_priority,
                format_datetime(&now),
            ],
        )?;

        tx.execute(
            "UPDATE priority_suggestions SET applied_at = ?1 WHERE id = ?2",
            params![format_datetime(&now), id],
        )?;

        tx.commit()?;
        suggestion.applied_at = Some(now);
        Ok(suggestion)
    }

    fn dismiss_suggestion(&self, id: &str, now: DateTime<Utc>) -> Result<PrioritySuggestion> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let mut suggestion = tx
            .query_row(
                &format!("SELECT {SUGGESTION_COLUMNS} FROM priority_suggestions WHERE id = ?1"),
                params![id],
                read_suggestion,
            )
            .optional()?
            .ok_or(Error::NotFound)?;

        if !suggestion.is_open() {
            return Err(Error::Conflict("suggestion already resolved".to_string()));
        }

        tx.execute(
            "UPDATE priority_suggestions SET dismissed_at = ?1 WHERE id = ?2",
            params![format_datetime(&now), id],
        )?;

        tx.commit()?;
        suggestion.dismissed_at = Some(now);
        Ok(suggestion)
    }

    // Tier limit operations

    fn get_tier_limit_row(&self, tier: Tier) -> Result<Option<TierLimitRow>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT tier, max_decks, max_cards_per_deck, updated_at
             FROM tier_limits WHERE tier = ?1",
            params![tier.as_str()],
            |row| {
                Ok(TierLimitRow {
                    tier: Tier::parse(&row.get::<_, String>(0)?),
                    max_decks: row.get(1)?,
                    max_cards_per_deck: row.get(2)?,
                    updated_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn ensure_tier_limits(&self, tier: Tier) -> Result<TierLimitRow> {
        let defaults = TierLimits::defaults(tier);
        self.conn().execute(
            "INSERT OR IGNORE INTO tier_limits (tier, max_decks, max_cards_per_deck, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                tier.as_str(),
                defaults.max_decks.sentinel(),
                defaults.max_cards_per_deck.sentinel(),
                format_datetime(&Utc::now()),
            ],
        )?;

        self.get_tier_limit_row(tier)?.ok_or(Error::NotFound)
    }

    fn set_tier_limits(&self, row: &TierLimitRow) -> Result<()> {
        self.conn().execute(
            "INSERT INTO tier_limits (tier, max_decks, max_cards_per_deck, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (tier) DO UPDATE SET
                max_decks = excluded.max_decks,
                max_cards_per_deck = excluded.max_cards_per_deck,
                updated_at = excluded.updated_at",
            params![
                row.tier.as_str(),
                row.max_decks,
                row.max_cards_per_deck,
                format_datetime(&row.updated_at),
            ],
        )?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    fn seed_tenant(store: &SqliteStore) -> (Tenant, User, Category) {
        let now = Utc::now();
        let tenant = Tenant {
            id: "tenant-1".to_string(),
            name: "acme".to_string(),
            tier: Tier::Free,
            created_at: now,
        };
        store.create_tenant(&tenant).unwrap();

        let user = User {
            id: "user-1".to_string(),
            tenant_id: tenant.id.clone(),
            name: "alice".to_string(),
            role: Role::Member,
            created_at: now,
            updated_at: now,
        };
        store.create_user(&user).unwrap();

        let category = Category {
            id: "cat-1".to_string(),
            tenant_id: tenant.id.clone(),
            name: "geography".to_string(),
            created_at: now,
        };
        store.create_category(&category).unwrap();

        (tenant, user, category)
    }

    fn make_card(id: &str, user: &User, category: &Category, fingerprint: &str) -> Card {
        let now = Utc::now();
        Card {
            id: id.to_string(),
            tenant_id: user.tenant_id.clone(),
            category_id: category.id.clone(),
            creator_id: user.id.clone(),
            created_by_role: user.role,
            question: format!("question {id}"),
            answer: format!("answer {id}"),
            tags: vec![],
            difficulty: None,
            is_public: false,
            fingerprint: fingerprint.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_initialize_creates_tables() {
        let (_temp, store) = open_store();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "tenants",
            "users",
            "tokens",
            "categories",
            "cards",
            "progress",
            "decks",
            "deck_shares",
            "card_access",
            "category_priorities",
            "user_category_priorities",
            "priority_suggestions",
            "tier_limits",
        ] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[test]
    fn test_tenant_crud() {
        let (_temp, store) = open_store();

        let tenant = Tenant {
            id: "t-1".to_string(),
            name: "globex".to_string(),
            tier: Tier::Pro,
            created_at: Utc::now(),
        };
        store.create_tenant(&tenant).unwrap();

        let fetched = store.get_tenant("t-1").unwrap().unwrap();
        assert_eq!(fetched.name, "globex");
        assert_eq!(fetched.tier, Tier::Pro);

        let by_name = store.get_tenant_by_name("globex").unwrap().unwrap();
        assert_eq!(by_name.id, "t-1");

        store.update_tenant_tier("t-1", Tier::Enterprise).unwrap();
        assert_eq!(
            store.get_tenant("t-1").unwrap().unwrap().tier,
            Tier::Enterprise
        );

        assert!(store.delete_tenant("t-1").unwrap());
        assert!(store.get_tenant("t-1").unwrap().is_none());
    }

    #[test]
    fn test_card_fingerprint_dedup() {
        let (_temp, store) = open_store();
        let (_tenant, user, category) = seed_tenant(&store);

        let first = make_card("card-1", &user, &category, "fp-same");
        assert!(store.create_card(&first).unwrap());

        let duplicate = make_card("card-2", &user, &category, "fp-same");
        assert!(!store.create_card(&duplicate).unwrap());

        assert!(store.get_card("card-2").unwrap().is_none());
    }

    #[test]
    fn test_create_cards_batch_skips_duplicates() {
        let (_temp, store) = open_store();
        let (_tenant, user, category) = seed_tenant(&store);

        let cards = vec![
            make_card("card-1", &user, &category, "fp-a"),
            make_card("card-2", &user, &category, "fp-b"),
            make_card("card-3", &user, &category, "fp-a"),
        ];
        let (created, skipped) = store.create_cards(&cards).unwrap();
        assert_eq!(created, 2);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_progress_upsert_counters() {
        let (_temp, store) = open_store();
        let (tenant, user, category) = seed_tenant(&store);
        let card = make_card("card-1", &user, &category, "fp-1");
        store.create_card(&card).unwrap();

        let now = Utc::now();
        let mut write = ProgressWrite {
            tenant_id: tenant.id.clone(),
            user_id: user.id.clone(),
            card_id: card.id.clone(),
            correct: true,
            repetitions: 1,
            interval_days: 1,
            ease_factor: 2.5,
            next_review_at: now,
            last_seen_at: now,
        };

        store.upsert_progress(&write).unwrap();
        let row = store
            .get_progress(&tenant.id, &user.id, &card.id)
            .unwrap()
            .unwrap();
        assert_eq!(row.exposure_count, 1);
        assert_eq!(row.correct_count, 1);
        // First sighting seeds the baseline: the recurrence starts
        // counting on the second review.
        assert_eq!(row.repetitions, 0);
        assert!((row.mastery_score - 1.0).abs() < 1e-9);

        write.correct = false;
        write.repetitions = 0;
        store.upsert_progress(&write).unwrap();
        let row = store
            .get_progress(&tenant.id, &user.id, &card.id)
            .unwrap()
            .unwrap();
        assert_eq!(row.exposure_count, 2);
        assert_eq!(row.correct_count, 1);
        assert_eq!(row.incorrect_count, 1);
        assert!((row.mastery_score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_open_suggestion_unique_per_category() {
        let (_temp, store) = open_store();
        let (tenant, _user, category) = seed_tenant(&store);

        let suggestion = PrioritySuggestion {
            id: "sug-1".to_string(),
            tenant_id: tenant.id.clone(),
            category_id: category.id.clone(),
            current_priority: 5,
            suggested_priority: 7,
            reason: "test".to_string(),
            created_at: Utc::now(),
            applied_at: None,
            dismissed_at: None,
        };
        assert!(store.create_suggestion(&suggestion).unwrap());

        let second = PrioritySuggestion {
            id: "sug-2".to_string(),
            ..suggestion.clone()
        };
        assert!(!store.create_suggestion(&second).unwrap());

        // Dismissing the open one frees the slot.
        store.dismiss_suggestion("sug-1", Utc::now()).unwrap();
        assert!(store.create_suggestion(&second).unwrap());
    }

    #[test]
    fn test_apply_suggestion_sets_priority_and_closes() {
        let (_temp, store) = open_store();
        let (tenant, _user, category) = seed_tenant(&store);

        let suggestion = PrioritySuggestion {
            id: "sug-1".to_string(),
            tenant_id: tenant.id.clone(),
            category_id: category.id.clone(),
            current_priority: 5,
            suggested_priority: 3,
            reason: "test".to_string(),
            created_at: Utc::now(),
            applied_at: None,
            dismissed_at: None,
        };
        store.create_suggestion(&suggestion).unwrap();

        let applied = store.apply_suggestion("sug-1", Utc::now()).unwrap();
        assert!(applied.applied_at.is_some());
        assert_eq!(
            store
                .get_category_priority(&tenant.id, &category.id)
                .unwrap(),
            Some(3)
        );

        let again = store.apply_suggestion("sug-1", Utc::now());
        assert!(matches!(again, Err(Error::Conflict(_))));
    }

    #[test]
    fn test_ensure_tier_limits_materializes_defaults() {
        let (_temp, store) = open_store();

        assert!(store.get_tier_limit_row(Tier::Free).unwrap().is_none());

        let row = store.ensure_tier_limits(Tier::Free).unwrap();
        assert_eq!(row.max_decks, 3);
        assert_eq!(row.max_cards_per_deck, 50);

        // Operator overrides survive later resolutions.
        store
            .set_tier_limits(&TierLimitRow {
                tier: Tier::Free,
                max_decks: 5,
                max_cards_per_deck: 50,
                updated_at: Utc::now(),
            })
            .unwrap();
        let row = store.ensure_tier_limits(Tier::Free).unwrap();
        assert_eq!(row.max_decks, 5);
    }

    #[test]
    fn test_share_decks_explicit_recipients_idempotent() {
        let (_temp, store) = open_store();
        let (tenant, user, _category) = seed_tenant(&store);

        let now = Utc::now();
        let other = User {
            id: "user-2".to_string(),
            tenant_id: tenant.id.clone(),
            name: "bob".to_string(),
            role: Role::Member,
            created_at: now,
            updated_at: now,
        };
        store.create_user(&other).unwrap();

        let deck = Deck {
            id: "deck-1".to_string(),
            tenant_id: tenant.id.clone(),
            owner_id: user.id.clone(),
            name: "capitals".to_string(),
            description: None,
            card_ids: vec![],
            hidden_card_ids: vec![],
            category_ids: vec![],
            is_public: false,
            created_at: now,
            updated_at: now,
        };
        store.create_deck(&deck).unwrap();

        let recipients =
            ShareRecipients::Users(vec![other.id.clone(), user.id.clone()]);
        let (deck_count, recipient_count) = store
            .share_decks(&user, std::slice::from_ref(&deck), &recipients)
            .unwrap();
        assert_eq!(deck_count, 1);
        // Self-share skipped.
        assert_eq!(recipient_count, 1);

        // Re-sharing updates in place rather than erroring.
        store
            .share_decks(&user, std::slice::from_ref(&deck), &recipients)
            .unwrap();

        assert!(store.get_deck_share("deck-1", &other.id).unwrap().is_some());
        // Sharing to a list never flips the deck public.
        assert!(!store.get_deck("deck-1").unwrap().unwrap().is_public);
    }
}
