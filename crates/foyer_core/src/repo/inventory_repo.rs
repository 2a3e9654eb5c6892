//! Inventory repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Stored quantities never go negative (`adjust_quantity` refuses it).
//! - Barcodes are unique across articles.
//! - Name lookups are case-insensitive and unit-sensitive.

use crate::model::inventory::{Article, ArticleId};
use crate::model::product_key;
use crate::repo::{ensure_tables, parse_uuid, Page, RepoError, RepoResult, PAGE_LIMIT_MAX};
use crate::validation::{ValidationError, ValidationErrorKind};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::Serialize;

const ARTICLE_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    category,
    quantity,
    unit,
    min_quantity,
    location,
    expiry_date,
    barcode
FROM inventory_articles";

#[derive(Debug, Clone, Default)]
pub struct InventoryQuery {
    pub category: Option<String>,
    pub location: Option<String>,
    pub page: Page,
}

pub trait InventoryRepository {
    fn create_article(&self, article: &Article) -> RepoResult<ArticleId>;
    fn update_article(&self, article: &Article) -> RepoResult<()>;
    fn get_article(&self, id: ArticleId) -> RepoResult<Option<Article>>;
    fn find_by_barcode(&self, barcode: &str) -> RepoResult<Option<Article>>;
    fn find_by_name(&self, name: &str, unit: &str) -> RepoResult<Option<Article>>;
    fn list_articles(&self, query: &InventoryQuery) -> RepoResult<Vec<Article>>;
    /// Every article by name, fetched page by page.
    fn list_all_articles(&self) -> RepoResult<Vec<Article>> {
        let mut articles = Vec::new();
        let mut offset = 0;
        loop {
            let batch = self.list_articles(&InventoryQuery {
                page: Page::new(PAGE_LIMIT_MAX, offset),
                ..InventoryQuery::default()
            })?;
            let fetched = batch.len();
            articles.extend(batch);
            if fetched < PAGE_LIMIT_MAX as usize {
                return Ok(articles);
            }
            offset += PAGE_LIMIT_MAX;
        }
    }
    /// Articles with an expiry date on or before `until`, soonest first.
    fn list_expiring(&self, until: NaiveDate) -> RepoResult<Vec<Article>>;
    fn delete_article(&self, id: ArticleId) -> RepoResult<()>;
    /// Adds `delta` (may be negative) and returns the new quantity.
    fn adjust_quantity(&self, id: ArticleId, delta: f64) -> RepoResult<f64>;
    /// Inserts or merges (same name and unit) every article in one
    /// transaction.
    fn upsert_many(&self, articles: &[Article]) -> Result<UpsertCounts, UpsertError>;
}

/// Outcome of a bulk upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertCounts {
    pub inserted: usize,
    pub merged: usize,
}

/// Failed bulk upsert. Nothing from the batch is kept.
#[derive(Debug)]
pub struct UpsertError {
    /// Position of the rejected article, `None` for transaction failures.
    pub index: Option<usize>,
    pub source: RepoError,
}

impl UpsertError {
    fn at(index: usize) -> impl FnOnce(RepoError) -> Self {
        move |source| Self {
            index: Some(index),
            source,
        }
    }
}

impl From<rusqlite::Error> for UpsertError {
    fn from(value: rusqlite::Error) -> Self {
        Self {
            index: None,
            source: value.into(),
        }
    }
}

pub struct SqliteInventoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteInventoryRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["inventory_articles"])?;
        Ok(Self { conn })
    }

    fn ensure_barcode_free(&self, article: &Article) -> RepoResult<()> {
        let Some(barcode) = article.barcode.as_deref() else {
            return Ok(());
        };
        match self.find_by_barcode(barcode)? {
            Some(owner) if owner.id != article.id => Err(RepoError::Validation(
                ValidationError::new(
                    "article.barcode",
                    ValidationErrorKind::Duplicate(barcode.trim().to_string()),
                ),
            )),
            _ => Ok(()),
        }
    }

    fn query_articles(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Article>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut articles = Vec::new();
        while let Some(row) = rows.next()? {
            articles.push(parse_article_row(row)?);
        }
        Ok(articles)
    }
}

impl InventoryRepository for SqliteInventoryRepository<'_> {
    fn create_article(&self, article: &Article) -> RepoResult<ArticleId> {
        article.validate()?;
        self.ensure_barcode_free(article)?;
        self.conn.execute(
            "INSERT INTO inventory_articles (
                uuid,
                name,
                category,
                quantity,
                unit,
                min_quantity,
                location,
                expiry_date,
                barcode
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                article.id.to_string(),
                article.name.trim(),
                article.category.trim(),
                article.quantity,
                article.unit.trim(),
                article.min_quantity,
                article.location.trim(),
                article.expiry_date,
                article.barcode.as_deref().map(str::trim),
            ],
        )?;
        Ok(article.id)
    }

    fn update_article(&self, article: &Article) -> RepoResult<()> {
        article.validate()?;
        self.ensure_barcode_free(article)?;
        let changed = self.conn.execute(
            "UPDATE inventory_articles
             SET
                name = ?1,
                category = ?2,
                quantity = ?3,
                unit = ?4,
                min_quantity = ?5,
                location = ?6,
                expiry_date = ?7,
                barcode = ?8,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?9;",
            params![
                article.name.trim(),
                article.category.trim(),
                article.quantity,
                article.unit.trim(),
                article.min_quantity,
                article.location.trim(),
                article.expiry_date,
                article.barcode.as_deref().map(str::trim),
                article.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "article",
                id: article.id,
            });
        }
        Ok(())
    }

    fn get_article(&self, id: ArticleId) -> RepoResult<Option<Article>> {
        self.conn
            .query_row(
                &format!("{ARTICLE_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                |row| Ok(parse_article_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn find_by_barcode(&self, barcode: &str) -> RepoResult<Option<Article>> {
        self.conn
            .query_row(
                &format!("{ARTICLE_SELECT_SQL} WHERE barcode = ?1;"),
                [barcode.trim()],
                |row| Ok(parse_article_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn find_by_name(&self, name: &str, unit: &str) -> RepoResult<Option<Article>> {
        // SQLite `lower()` is ASCII-only, so accented names are matched here.
        let wanted = product_key(name, unit);
        let candidates = self.query_articles(
            &format!("{ARTICLE_SELECT_SQL} ORDER BY uuid ASC;"),
            Vec::new(),
        )?;
        Ok(candidates
            .into_iter()
            .find(|article| product_key(&article.name, &article.unit) == wanted))
    }

    fn list_articles(&self, query: &InventoryQuery) -> RepoResult<Vec<Article>> {
        let mut sql = format!("{ARTICLE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(category) = query.category.as_ref() {
            sql.push_str(" AND category = ? COLLATE NOCASE");
            bind_values.push(Value::Text(category.clone()));
        }
        if let Some(location) = query.location.as_ref() {
            sql.push_str(" AND location = ? COLLATE NOCASE");
            bind_values.push(Value::Text(location.clone()));
        }
        sql.push_str(" ORDER BY name COLLATE NOCASE ASC, uuid ASC");
        query.page.push_sql(&mut sql, &mut bind_values);
        self.query_articles(&sql, bind_values)
    }

    fn list_expiring(&self, until: NaiveDate) -> RepoResult<Vec<Article>> {
        self.query_articles(
            &format!(
                "{ARTICLE_SELECT_SQL}
                 WHERE expiry_date IS NOT NULL AND expiry_date <= ?
                 ORDER BY expiry_date ASC, name COLLATE NOCASE ASC;"
            ),
            vec![Value::Text(until.format("%F").to_string())],
        )
    }

    fn delete_article(&self, id: ArticleId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM inventory_articles WHERE uuid = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "article",
                id,
            });
        }
        Ok(())
    }

    fn adjust_quantity(&self, id: ArticleId, delta: f64) -> RepoResult<f64> {
        let tx = self.conn.unchecked_transaction()?;
        let current: Option<f64> = self
            .conn
            .query_row(
                "SELECT quantity FROM inventory_articles WHERE uuid = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(current) = current else {
            return Err(RepoError::NotFound {
                entity: "article",
                id,
            });
        };
        let next = current + delta;
        if !next.is_finite() || next < -f64::EPSILON {
            return Err(RepoError::Validation(ValidationError::new(
                "article.quantity",
                ValidationErrorKind::Negative,
            )));
        }
        let next = next.max(0.0);
        self.conn.execute(
            "UPDATE inventory_articles
             SET quantity = ?1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?2;",
            params![next, id.to_string()],
        )?;
        tx.commit()?;
        Ok(next)
    }

    fn upsert_many(&self, articles: &[Article]) -> Result<UpsertCounts, UpsertError> {
        let tx = self.conn.unchecked_transaction()?;
        let mut counts = UpsertCounts::default();
        for (index, article) in articles.iter().enumerate() {
            let existing = self
                .find_by_name(&article.name, &article.unit)
                .map_err(UpsertError::at(index))?;
            match existing {
                Some(mut existing) => {
                    existing.merge_stock(article);
                    self.update_article(&existing).map_err(UpsertError::at(index))?;
                    counts.merged += 1;
                }
                None => {
                    self.create_article(article).map_err(UpsertError::at(index))?;
                    counts.inserted += 1;
                }
            }
        }
        tx.commit()?;
        Ok(counts)
    }
}

fn parse_article_row(row: &Row<'_>) -> RepoResult<Article> {
    let uuid_text: String = row.get("uuid")?;
    let article = Article {
        id: parse_uuid("inventory_articles.uuid", &uuid_text)?,
        name: row.get("name")?,
        category: row.get("category")?,
        quantity: row.get("quantity")?,
        unit: row.get("unit")?,
        min_quantity: row.get("min_quantity")?,
        location: row.get("location")?,
        expiry_date: row.get("expiry_date")?,
        barcode: row.get("barcode")?,
    };
    article.validate()?;
    Ok(article)
}
