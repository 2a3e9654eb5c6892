//! Recipe repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist recipes together with their ordered ingredient rows.
//! - Provide filtered listing and per-category counts.
//!
//! # Invariants
//! - Recipe row and ingredient rows are written in one transaction.
//! - Soft-deleted recipes are hidden unless explicitly requested.
//! - Listing order is `name COLLATE NOCASE ASC, uuid ASC`.

use crate::model::recipe::{Recipe, RecipeId, RecipeIngredient};
use crate::repo::{
    bool_to_int, ensure_tables, from_json, int_to_bool, parse_uuid, to_json, CountBy, Page,
    RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const RECIPE_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    description,
    category,
    servings,
    prep_minutes,
    cook_minutes,
    tags_json,
    is_deleted
FROM recipes";

/// Query options for listing recipes.
#[derive(Debug, Clone, Default)]
pub struct RecipeListQuery {
    /// Exact (normalized) category match.
    pub category: Option<String>,
    /// Single-tag exact match.
    pub tag: Option<String>,
    /// Case-insensitive substring of the recipe name.
    pub text: Option<String>,
    pub include_deleted: bool,
    pub page: Page,
}

/// Repository interface for recipe CRUD operations.
pub trait RecipeRepository {
    fn create_recipe(&self, recipe: &Recipe) -> RepoResult<RecipeId>;
    fn update_recipe(&self, recipe: &Recipe) -> RepoResult<()>;
    fn get_recipe(&self, id: RecipeId, include_deleted: bool) -> RepoResult<Option<Recipe>>;
    fn list_recipes(&self, query: &RecipeListQuery) -> RepoResult<Vec<Recipe>>;
    fn set_deleted(&self, id: RecipeId, deleted: bool) -> RepoResult<()>;
    /// Active recipe counts grouped by category.
    fn count_by_category(&self) -> RepoResult<Vec<CountBy>>;
}

/// SQLite-backed recipe repository.
pub struct SqliteRecipeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecipeRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["recipes", "recipe_ingredients"])?;
        Ok(Self { conn })
    }

    fn replace_ingredients(
        &self,
        recipe_id: RecipeId,
        ingredients: &[RecipeIngredient],
    ) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM recipe_ingredients WHERE recipe_uuid = ?1;",
            [recipe_id.to_string()],
        )?;
        for (position, ingredient) in ingredients.iter().enumerate() {
            self.conn.execute(
                "INSERT INTO recipe_ingredients (recipe_uuid, position, name, quantity, unit)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    recipe_id.to_string(),
                    position as i64,
                    ingredient.name.trim(),
                    ingredient.quantity,
                    ingredient.unit.trim(),
                ],
            )?;
        }
        Ok(())
    }

    fn load_ingredients(&self, recipe_uuid: &str) -> RepoResult<Vec<RecipeIngredient>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, quantity, unit
             FROM recipe_ingredients
             WHERE recipe_uuid = ?1
             ORDER BY position ASC;",
        )?;
        let mut rows = stmt.query([recipe_uuid])?;
        let mut ingredients = Vec::new();
        while let Some(row) = rows.next()? {
            ingredients.push(RecipeIngredient {
                name: row.get("name")?,
                quantity: row.get("quantity")?,
                unit: row.get("unit")?,
            });
        }
        Ok(ingredients)
    }

    fn parse_recipe_row(&self, row: &Row<'_>) -> RepoResult<Recipe> {
        let uuid_text: String = row.get("uuid")?;
        let tags_text: String = row.get("tags_json")?;
        let recipe = Recipe {
            id: parse_uuid("recipes.uuid", &uuid_text)?,
            name: row.get("name")?,
            description: row.get("description")?,
            category: row.get("category")?,
            servings: row.get("servings")?,
            prep_minutes: row.get("prep_minutes")?,
            cook_minutes: row.get("cook_minutes")?,
            tags: from_json("recipes.tags_json", &tags_text)?,
            ingredients: self.load_ingredients(&uuid_text)?,
            is_deleted: int_to_bool("recipes.is_deleted", row.get("is_deleted")?)?,
        };
        recipe.validate()?;
        Ok(recipe)
    }
}

impl RecipeRepository for SqliteRecipeRepository<'_> {
    fn create_recipe(&self, recipe: &Recipe) -> RepoResult<RecipeId> {
        recipe.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        self.conn.execute(
            "INSERT INTO recipes (
                uuid,
                name,
                description,
                category,
                servings,
                prep_minutes,
                cook_minutes,
                tags_json,
                is_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                recipe.id.to_string(),
                recipe.name.as_str(),
                recipe.description.as_str(),
                recipe.category.as_str(),
                recipe.servings,
                recipe.prep_minutes,
                recipe.cook_minutes,
                to_json(&recipe.tags)?,
                bool_to_int(recipe.is_deleted),
            ],
        )?;
        self.replace_ingredients(recipe.id, &recipe.ingredients)?;
        tx.commit()?;

        Ok(recipe.id)
    }

    fn update_recipe(&self, recipe: &Recipe) -> RepoResult<()> {
        recipe.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        let changed = self.conn.execute(
            "UPDATE recipes
             SET
                name = ?1,
                description = ?2,
                category = ?3,
                servings = ?4,
                prep_minutes = ?5,
                cook_minutes = ?6,
                tags_json = ?7,
                is_deleted = ?8,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?9;",
            params![
                recipe.name.as_str(),
                recipe.description.as_str(),
                recipe.category.as_str(),
                recipe.servings,
                recipe.prep_minutes,
                recipe.cook_minutes,
                to_json(&recipe.tags)?,
                bool_to_int(recipe.is_deleted),
                recipe.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "recipe",
                id: recipe.id,
            });
        }
        self.replace_ingredients(recipe.id, &recipe.ingredients)?;
        tx.commit()?;

        Ok(())
    }

    fn get_recipe(&self, id: RecipeId, include_deleted: bool) -> RepoResult<Option<Recipe>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RECIPE_SELECT_SQL}
             WHERE uuid = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(self.parse_recipe_row(row)?));
        }
        Ok(None)
    }

    fn list_recipes(&self, query: &RecipeListQuery) -> RepoResult<Vec<Recipe>> {
        let mut sql = format!("{RECIPE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND is_deleted = 0");
        }
        if let Some(category) = query.category.as_ref() {
            sql.push_str(" AND category = ?");
            bind_values.push(Value::Text(category.clone()));
        }
        if let Some(tag) = query.tag.as_ref() {
            sql.push_str(
                " AND EXISTS (SELECT 1 FROM json_each(recipes.tags_json) WHERE value = ?)",
            );
            bind_values.push(Value::Text(tag.clone()));
        }
        if let Some(text) = query.text.as_ref().filter(|t| !t.trim().is_empty()) {
            sql.push_str(" AND name LIKE ? ESCAPE '\\'");
            bind_values.push(Value::Text(format!("%{}%", escape_like(text.trim()))));
        }

        sql.push_str(" ORDER BY name COLLATE NOCASE ASC, uuid ASC");
        query.page.push_sql(&mut sql, &mut bind_values);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut recipes = Vec::new();
        while let Some(row) = rows.next()? {
            recipes.push(self.parse_recipe_row(row)?);
        }
        Ok(recipes)
    }

    fn set_deleted(&self, id: RecipeId, deleted: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE recipes
             SET
                is_deleted = ?1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?2;",
            params![bool_to_int(deleted), id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "recipe",
                id,
            });
        }
        Ok(())
    }

    fn count_by_category(&self) -> RepoResult<Vec<CountBy>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, COUNT(*) AS total
             FROM recipes
             WHERE is_deleted = 0
             GROUP BY category
             ORDER BY total DESC, category ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut counts = Vec::new();
        while let Some(row) = rows.next()? {
            let total: i64 = row.get("total")?;
            counts.push(CountBy {
                key: row.get("category")?,
                count: u64::try_from(total).unwrap_or(0),
            });
        }
        Ok(counts)
    }
}

/// Escapes `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
pub(crate) fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
