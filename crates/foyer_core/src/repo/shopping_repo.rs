//! Shopping list repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Listing order is `bought ASC, category, name`, so open items come first.
//! - `find_open` only ever matches items that are not bought yet.

use crate::model::product_key;
use crate::model::shopping::{ItemSource, ShoppingItem, ShoppingItemId};
use crate::repo::{
    bool_to_int, ensure_tables, int_to_bool, parse_enum, parse_uuid, RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

const ITEM_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    quantity,
    unit,
    category,
    bought,
    source,
    created_at
FROM shopping_items";

pub trait ShoppingRepository {
    fn create_item(&self, item: &ShoppingItem) -> RepoResult<ShoppingItemId>;
    fn update_item(&self, item: &ShoppingItem) -> RepoResult<()>;
    fn get_item(&self, id: ShoppingItemId) -> RepoResult<Option<ShoppingItem>>;
    fn list_items(&self, include_bought: bool) -> RepoResult<Vec<ShoppingItem>>;
    fn delete_item(&self, id: ShoppingItemId) -> RepoResult<()>;
    fn set_bought(&self, id: ShoppingItemId, bought: bool) -> RepoResult<()>;
    /// Deletes bought items and returns how many were removed.
    fn clear_bought(&self) -> RepoResult<usize>;
    /// Open (not bought) item for the same product, if any.
    fn find_open(&self, name: &str, unit: &str) -> RepoResult<Option<ShoppingItem>>;
}

pub struct SqliteShoppingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteShoppingRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["shopping_items"])?;
        Ok(Self { conn })
    }
}

impl ShoppingRepository for SqliteShoppingRepository<'_> {
    fn create_item(&self, item: &ShoppingItem) -> RepoResult<ShoppingItemId> {
        item.validate()?;
        self.conn.execute(
            "INSERT INTO shopping_items (
                uuid,
                name,
                quantity,
                unit,
                category,
                bought,
                source,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                item.id.to_string(),
                item.name.trim(),
                item.quantity,
                item.unit.trim(),
                item.category.trim(),
                bool_to_int(item.bought),
                item.source.as_str(),
                item.created_at,
            ],
        )?;
        Ok(item.id)
    }

    fn update_item(&self, item: &ShoppingItem) -> RepoResult<()> {
        item.validate()?;
        let changed = self.conn.execute(
            "UPDATE shopping_items
             SET name = ?1, quantity = ?2, unit = ?3, category = ?4, bought = ?5, source = ?6
             WHERE uuid = ?7;",
            params![
                item.name.trim(),
                item.quantity,
                item.unit.trim(),
                item.category.trim(),
                bool_to_int(item.bought),
                item.source.as_str(),
                item.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "shopping_item",
                id: item.id,
            });
        }
        Ok(())
    }

    fn get_item(&self, id: ShoppingItemId) -> RepoResult<Option<ShoppingItem>> {
        self.conn
            .query_row(
                &format!("{ITEM_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                |row| Ok(parse_item_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_items(&self, include_bought: bool) -> RepoResult<Vec<ShoppingItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ITEM_SELECT_SQL}
             WHERE (?1 = 1 OR bought = 0)
             ORDER BY bought ASC, category COLLATE NOCASE ASC, name COLLATE NOCASE ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([bool_to_int(include_bought)])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }

    fn delete_item(&self, id: ShoppingItemId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM shopping_items WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "shopping_item",
                id,
            });
        }
        Ok(())
    }

    fn set_bought(&self, id: ShoppingItemId, bought: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE shopping_items SET bought = ?1 WHERE uuid = ?2;",
            params![bool_to_int(bought), id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "shopping_item",
                id,
            });
        }
        Ok(())
    }

    fn clear_bought(&self) -> RepoResult<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM shopping_items WHERE bought = 1;", [])?)
    }

    fn find_open(&self, name: &str, unit: &str) -> RepoResult<Option<ShoppingItem>> {
        let wanted = product_key(name, unit);
        Ok(self
            .list_items(false)?
            .into_iter()
            .find(|item| product_key(&item.name, &item.unit) == wanted))
    }
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<ShoppingItem> {
    let uuid_text: String = row.get("uuid")?;
    let source_text: String = row.get("source")?;
    let item = ShoppingItem {
        id: parse_uuid("shopping_items.uuid", &uuid_text)?,
        name: row.get("name")?,
        quantity: row.get("quantity")?,
        unit: row.get("unit")?,
        category: row.get("category")?,
        bought: int_to_bool("shopping_items.bought", row.get("bought")?)?,
        source: parse_enum("shopping_items.source", &source_text, ItemSource::parse)?,
        created_at: row.get("created_at")?,
    };
    item.validate()?;
    Ok(item)
}
