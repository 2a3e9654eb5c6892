//! Pantry inventory use-cases.
//!
//! # Responsibility
//! - Merge arrivals into existing stock, consume and restock.
//! - Derive low-stock and expiry alerts.
//! - Export and import the inventory as CSV.
//!
//! # Invariants
//! - Stock never goes negative; consuming more than available fails.
//! - CSV import writes nothing unless every line parses and validates.

use crate::error::{AppError, AppResult};
use crate::model::inventory::{is_valid_barcode, Article, ArticleId};
use crate::repo::inventory_repo::{InventoryQuery, InventoryRepository, UpsertCounts};
use crate::repo::RepoError;
use crate::service::csv_io::{read_rows, write_record};
use crate::validation::{require_positive, ValidationError, ValidationErrorKind};
use chrono::{Days, NaiveDate};
use log::info;
use serde::Serialize;

pub const INVENTORY_CSV_HEADER: [&str; 8] = [
    "name",
    "category",
    "quantity",
    "unit",
    "min_quantity",
    "location",
    "expiry_date",
    "barcode",
];

/// Result of [`InventoryService::add_article`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockEntry {
    pub article: Article,
    /// `true` when the arrival was folded into an existing article.
    pub merged: bool,
}

pub struct InventoryService<R: InventoryRepository> {
    repo: R,
}

impl<R: InventoryRepository> InventoryService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Stores an arrival, merging it into the article with the same name
    /// and unit when one exists.
    pub fn add_article(&self, article: Article) -> AppResult<StockEntry> {
        article.validate()?;
        let entry = match self.repo.find_by_name(&article.name, &article.unit)? {
            Some(mut existing) => {
                existing.merge_stock(&article);
                self.repo.update_article(&existing)?;
                StockEntry {
                    article: existing,
                    merged: true,
                }
            }
            None => {
                self.repo.create_article(&article)?;
                StockEntry {
                    article,
                    merged: false,
                }
            }
        };
        info!(
            "event=inventory_add module=inventory status=ok merged={}",
            entry.merged
        );
        Ok(entry)
    }

    pub fn update_article(&self, article: &Article) -> AppResult<Article> {
        self.repo.update_article(article)?;
        self.get_article(article.id)
    }

    pub fn get_article(&self, id: ArticleId) -> AppResult<Article> {
        self.repo
            .get_article(id)?
            .ok_or_else(|| AppError::not_found("article", id))
    }

    pub fn list_articles(&self, query: &InventoryQuery) -> AppResult<Vec<Article>> {
        Ok(self.repo.list_articles(query)?)
    }

    pub fn delete_article(&self, id: ArticleId) -> AppResult<()> {
        self.repo.delete_article(id)?;
        info!("event=inventory_delete module=inventory status=ok");
        Ok(())
    }

    /// Takes `quantity` out of stock and returns the updated article.
    pub fn consume(&self, id: ArticleId, quantity: f64) -> AppResult<Article> {
        require_positive("inventory.consume", quantity)?;
        let article = self.get_article(id)?;
        if quantity > article.quantity + f64::EPSILON {
            return Err(ValidationError::new(
                "inventory.consume",
                ValidationErrorKind::OutOfRange {
                    min: 0.0,
                    max: article.quantity,
                },
            )
            .into());
        }
        self.repo.adjust_quantity(id, -quantity)?;
        info!("event=inventory_consume module=inventory status=ok");
        self.get_article(id)
    }

    pub fn restock(&self, id: ArticleId, quantity: f64) -> AppResult<Article> {
        require_positive("inventory.restock", quantity)?;
        self.repo.adjust_quantity(id, quantity)?;
        info!("event=inventory_restock module=inventory status=ok");
        self.get_article(id)
    }

    /// Articles at or below their threshold, by name.
    pub fn low_stock(&self) -> AppResult<Vec<Article>> {
        Ok(self
            .repo
            .list_all_articles()?
            .into_iter()
            .filter(Article::is_low_stock)
            .collect())
    }

    /// Articles expiring between `today` and `today + within_days`, soonest
    /// first. Already expired articles are excluded.
    pub fn expiring(&self, today: NaiveDate, within_days: u32) -> AppResult<Vec<Article>> {
        let until = today
            .checked_add_days(Days::new(u64::from(within_days)))
            .unwrap_or(NaiveDate::MAX);
        Ok(self
            .repo
            .list_expiring(until)?
            .into_iter()
            .filter(|article| !article.is_expired(today))
            .collect())
    }

    /// Articles whose expiry date is before `today`.
    pub fn expired(&self, today: NaiveDate) -> AppResult<Vec<Article>> {
        let Some(yesterday) = today.pred_opt() else {
            return Ok(Vec::new());
        };
        Ok(self.repo.list_expiring(yesterday)?)
    }

    pub fn scan_barcode(&self, code: &str) -> AppResult<Article> {
        let code = code.trim();
        if !is_valid_barcode(code) {
            return Err(ValidationError::invalid(
                "barcode",
                "expected an EAN-8, UPC-A or EAN-13 code with a valid check digit",
            )
            .into());
        }
        self.repo
            .find_by_barcode(code)?
            .ok_or_else(|| AppError::not_found("article", code))
    }

    /// Whole inventory as CSV text with a header line.
    pub fn export_csv(&self) -> AppResult<String> {
        let articles = self.repo.list_all_articles()?;
        let mut out = write_record(&INVENTORY_CSV_HEADER[..]);
        out.push('\n');
        for article in &articles {
            let row = [
                article.name.clone(),
                article.category.clone(),
                article.quantity.to_string(),
                article.unit.clone(),
                article.min_quantity.to_string(),
                article.location.clone(),
                article
                    .expiry_date
                    .map(|date| date.format("%F").to_string())
                    .unwrap_or_default(),
                article.barcode.clone().unwrap_or_default(),
            ];
            out.push_str(&write_record(&row[..]));
            out.push('\n');
        }
        info!(
            "event=inventory_export module=inventory status=ok rows={}",
            articles.len()
        );
        Ok(out)
    }

    /// Imports CSV produced by [`Self::export_csv`], merging by name and
    /// unit. Nothing is written if any line is invalid.
    pub fn import_csv(&self, text: &str) -> AppResult<UpsertCounts> {
        let rows = read_rows(text, &INVENTORY_CSV_HEADER)?;
        let mut articles = Vec::with_capacity(rows.len());
        let mut lines = Vec::with_capacity(rows.len());
        for (line, fields) in rows {
            let article = parse_article_fields(&fields).map_err(|message| AppError::Import {
                line,
                message,
            })?;
            article
                .validate()
                .map_err(|err| AppError::Import {
                    line,
                    message: err.to_string(),
                })?;
            articles.push(article);
            lines.push(line);
        }
        let counts = self.repo.upsert_many(&articles).map_err(|err| {
            match (err.index.and_then(|index| lines.get(index)), err.source) {
                (Some(&line), RepoError::Validation(source)) => AppError::Import {
                    line,
                    message: source.to_string(),
                },
                (_, source) => AppError::from(source),
            }
        })?;
        info!(
            "event=inventory_import module=inventory status=ok inserted={} merged={}",
            counts.inserted, counts.merged
        );
        Ok(counts)
    }
}

fn parse_article_fields(fields: &[String]) -> Result<Article, String> {
    let quantity = parse_number("quantity", &fields[2])?;
    let mut article = Article::new(fields[0].trim(), quantity, fields[3].trim());
    article.category = fields[1].trim().to_string();
    article.min_quantity = if fields[4].trim().is_empty() {
        0.0
    } else {
        parse_number("min_quantity", &fields[4])?
    };
    article.location = fields[5].trim().to_string();
    article.expiry_date = match fields[6].trim() {
        "" => None,
        text => Some(
            NaiveDate::parse_from_str(text, "%F")
                .map_err(|_| format!("invalid expiry_date `{text}`, expected YYYY-MM-DD"))?,
        ),
    };
    article.barcode = Some(fields[7].trim().to_string()).filter(|code| !code.is_empty());
    Ok(article)
}

fn parse_number(field: &str, text: &str) -> Result<f64, String> {
    // French exports use a decimal comma.
    text.trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| format!("invalid {field} `{}`", text.trim()))
}
