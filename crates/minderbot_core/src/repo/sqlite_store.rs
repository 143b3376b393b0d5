//! SQLite implementation of the entity store.
//!
//! # Responsibility
//! - Map tags, suggestions, feedback and users onto the migrated schema.
//! - Keep ordered reference lists in position-indexed link tables.
//! - Provide transactional batches for repairs and service writes.
//!
//! # Invariants
//! - Reference lists round-trip exactly: order, duplicates and dangling ids
//!   are preserved.
//! - Multi-statement `put_*` writes are only all-or-nothing inside `atomic`.

use crate::model::feedback::Feedback;
use crate::model::suggestion::{Interval, Suggestion};
use crate::model::tag::Tag;
use crate::model::user::{User, UserId};
use crate::repo::{EntityStore, PageQuery, RepoError, RepoResult};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const REQUIRED_TABLES: &[&str] = &[
    "users",
    "suggestions",
    "suggestion_tags",
    "tags",
    "tag_suggestions",
    "feedback",
];

const SUGGESTION_SELECT_SQL: &str = "SELECT
    id,
    title,
    owner_id,
    author_id,
    days,
    months,
    years,
    miles,
    kilometers,
    previous,
    next,
    created
FROM suggestions";

/// SQLite-backed entity store.
pub struct SqliteEntityStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEntityStore<'conn> {
    /// Constructs a store from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        for table in REQUIRED_TABLES {
            if !table_exists(conn, table)? {
                return Err(RepoError::MissingRequiredTable(table));
            }
        }
        Ok(Self { conn })
    }
}

impl EntityStore for SqliteEntityStore<'_> {
    fn list_tags(&self, page: &PageQuery) -> RepoResult<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, count, created
             FROM tags
             WHERE (?1 IS NULL OR id > ?1)
             ORDER BY id ASC
             LIMIT ?2;",
        )?;
        let mut rows = stmt.query(params![page.after.as_deref(), i64::from(page.limit)])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(parse_tag_row(self.conn, row)?);
        }
        Ok(tags)
    }

    fn list_suggestions(&self, page: &PageQuery) -> RepoResult<Vec<Suggestion>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SUGGESTION_SELECT_SQL}
             WHERE (?1 IS NULL OR id > ?1)
             ORDER BY id ASC
             LIMIT ?2;"
        ))?;
        let mut rows = stmt.query(params![page.after.as_deref(), i64::from(page.limit)])?;
        let mut suggestions = Vec::new();
        while let Some(row) = rows.next()? {
            suggestions.push(parse_suggestion_row(self.conn, row)?);
        }
        Ok(suggestions)
    }

    fn list_feedback(&self, page: &PageQuery) -> RepoResult<Vec<Feedback>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, message, page, submitter_id, submitted
             FROM feedback
             WHERE (?1 IS NULL OR id > ?1)
             ORDER BY id ASC
             LIMIT ?2;",
        )?;
        let mut rows = stmt.query(params![page.after.as_deref(), i64::from(page.limit)])?;
        let mut feedback = Vec::new();
        while let Some(row) = rows.next()? {
            feedback.push(parse_feedback_row(row)?);
        }
        Ok(feedback)
    }

    fn list_user_ids(&self, page: &PageQuery) -> RepoResult<Vec<UserId>> {
        let mut stmt = self.conn.prepare(
            "SELECT id
             FROM users
             WHERE (?1 IS NULL OR id > ?1)
             ORDER BY id ASC
             LIMIT ?2;",
        )?;
        let mut rows = stmt.query(params![page.after.as_deref(), i64::from(page.limit)])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get("id")?);
        }
        Ok(ids)
    }

    fn get_tag(&self, id: &str) -> RepoResult<Option<Tag>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, count, created FROM tags WHERE id = ?1;")?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_tag_row(self.conn, row)?));
        }
        Ok(None)
    }

    fn get_suggestion(&self, id: &str) -> RepoResult<Option<Suggestion>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SUGGESTION_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_suggestion_row(self.conn, row)?));
        }
        Ok(None)
    }

    fn get_feedback(&self, id: &str) -> RepoResult<Option<Feedback>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, message, page, submitter_id, submitted
             FROM feedback
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_feedback_row(row)?));
        }
        Ok(None)
    }

    fn get_user(&self, id: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, email, is_staff FROM users WHERE id = ?1;")?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(User {
                id: row.get("id")?,
                email: row.get("email")?,
                is_staff: int_to_bool(row.get("is_staff")?, "users.is_staff")?,
            }));
        }
        Ok(None)
    }

    fn put_tag(&self, tag: &Tag) -> RepoResult<()> {
        tag.validate()?;

        self.conn.execute(
            "INSERT INTO tags (id, count, created)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (id) DO UPDATE SET
                count = excluded.count,
                created = excluded.created;",
            params![tag.id.as_str(), tag.count, tag.created],
        )?;
        self.conn.execute(
            "DELETE FROM tag_suggestions WHERE tag_id = ?1;",
            [tag.id.as_str()],
        )?;

        let mut insert = self.conn.prepare(
            "INSERT INTO tag_suggestions (tag_id, position, suggestion_id)
             VALUES (?1, ?2, ?3);",
        )?;
        for (position, suggestion_id) in tag.suggestions.iter().enumerate() {
            insert.execute(params![
                tag.id.as_str(),
                position_to_db(position)?,
                suggestion_id.as_str()
            ])?;
        }
        Ok(())
    }

    fn delete_tag(&self, id: &str) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM tag_suggestions WHERE tag_id = ?1;", [id])?;
        self.conn.execute("DELETE FROM tags WHERE id = ?1;", [id])?;
        Ok(())
    }

    fn put_suggestion(&self, suggestion: &Suggestion) -> RepoResult<()> {
        suggestion.validate()?;

        self.conn.execute(
            "INSERT INTO suggestions (
                id,
                title,
                owner_id,
                author_id,
                days,
                months,
                years,
                miles,
                kilometers,
                previous,
                next,
                created
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT (id) DO UPDATE SET
                title = excluded.title,
                owner_id = excluded.owner_id,
                author_id = excluded.author_id,
                days = excluded.days,
                months = excluded.months,
                years = excluded.years,
                miles = excluded.miles,
                kilometers = excluded.kilometers,
                previous = excluded.previous,
                next = excluded.next,
                created = excluded.created;",
            params![
                suggestion.id.as_str(),
                suggestion.title.as_str(),
                suggestion.owner.as_deref(),
                suggestion.author.as_deref(),
                suggestion.interval.days,
                suggestion.interval.months,
                suggestion.interval.years,
                suggestion.interval.miles,
                suggestion.interval.kilometers,
                suggestion.previous,
                suggestion.next,
                suggestion.created,
            ],
        )?;
        self.conn.execute(
            "DELETE FROM suggestion_tags WHERE suggestion_id = ?1;",
            [suggestion.id.as_str()],
        )?;

        let mut insert = self.conn.prepare(
            "INSERT INTO suggestion_tags (suggestion_id, position, tag_id)
             VALUES (?1, ?2, ?3);",
        )?;
        for (position, tag_id) in suggestion.tags.iter().enumerate() {
            insert.execute(params![
                suggestion.id.as_str(),
                position_to_db(position)?,
                tag_id.as_str()
            ])?;
        }
        Ok(())
    }

    fn delete_suggestion(&self, id: &str) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM suggestion_tags WHERE suggestion_id = ?1;",
            [id],
        )?;
        self.conn
            .execute("DELETE FROM suggestions WHERE id = ?1;", [id])?;
        Ok(())
    }

    fn put_feedback(&self, feedback: &Feedback) -> RepoResult<()> {
        feedback.validate()?;

        self.conn.execute(
            "INSERT INTO feedback (id, message, page, submitter_id, submitted)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (id) DO UPDATE SET
                message = excluded.message,
                page = excluded.page,
                submitter_id = excluded.submitter_id,
                submitted = excluded.submitted;",
            params![
                feedback.id.as_str(),
                feedback.message.as_str(),
                feedback.page.as_str(),
                feedback.submitter.as_deref(),
                feedback.submitted,
            ],
        )?;
        Ok(())
    }

    fn put_user(&self, user: &User) -> RepoResult<()> {
        user.validate()?;

        self.conn.execute(
            "INSERT INTO users (id, email, is_staff)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (id) DO UPDATE SET
                email = excluded.email,
                is_staff = excluded.is_staff;",
            params![user.id.as_str(), user.email.as_str(), bool_to_int(user.is_staff)],
        )?;
        Ok(())
    }

    fn atomic<T, F>(&self, batch: F) -> RepoResult<T>
    where
        Self: Sized,
        F: FnOnce(&Self) -> RepoResult<T>,
    {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        // Dropping `tx` on the error path rolls the whole batch back.
        let value = batch(self)?;
        tx.commit()?;
        Ok(value)
    }
}

fn parse_tag_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Tag> {
    let id: String = row.get("id")?;
    let suggestions = load_reference_list(
        conn,
        "SELECT suggestion_id FROM tag_suggestions WHERE tag_id = ?1 ORDER BY position ASC;",
        &id,
    )?;
    Ok(Tag {
        id,
        suggestions,
        count: row.get("count")?,
        created: row.get("created")?,
    })
}

fn parse_suggestion_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Suggestion> {
    let id: String = row.get("id")?;
    let tags = load_reference_list(
        conn,
        "SELECT tag_id FROM suggestion_tags WHERE suggestion_id = ?1 ORDER BY position ASC;",
        &id,
    )?;
    Ok(Suggestion {
        id,
        title: row.get("title")?,
        tags,
        owner: row.get("owner_id")?,
        author: row.get("author_id")?,
        interval: Interval {
            days: row.get("days")?,
            months: row.get("months")?,
            years: row.get("years")?,
            miles: row.get("miles")?,
            kilometers: row.get("kilometers")?,
        },
        previous: row.get("previous")?,
        next: row.get("next")?,
        created: row.get("created")?,
    })
}

fn parse_feedback_row(row: &Row<'_>) -> RepoResult<Feedback> {
    Ok(Feedback {
        id: row.get("id")?,
        message: row.get("message")?,
        page: row.get("page")?,
        submitter: row.get("submitter_id")?,
        submitted: row.get("submitted")?,
    })
}

fn load_reference_list(conn: &Connection, sql: &str, owner_id: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([owner_id])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        ids.push(row.get(0)?);
    }
    Ok(ids)
}

fn position_to_db(position: usize) -> RepoResult<i64> {
    i64::try_from(position)
        .map_err(|_| RepoError::InvalidData(format!("reference position {position} overflows")))
}

fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
