//! Recipe use-case service.
//!
//! # Responsibility
//! - Normalize and persist recipes, reading every write back.
//! - Serve the per-category statistic through a TTL cache.
//!
//! # Invariants
//! - Any write invalidates the statistics cache before returning.
//! - `delete_recipe` is a soft delete; `restore_recipe` reverts it.

use crate::cache::TtlCache;
use crate::error::{AppError, AppResult};
use crate::model::recipe::{Recipe, RecipeId, RecipeIngredient};
use crate::repo::recipe_repo::{RecipeListQuery, RecipeRepository};
use crate::repo::CountBy;
use crate::validation::{ValidationError, ValidationErrorKind};
use log::info;
use std::time::Duration;

const CATEGORY_STATS_KEY: &str = "recipes:category_stats";

/// Recipe service facade over a repository implementation.
pub struct RecipeService<R: RecipeRepository> {
    repo: R,
    stats_cache: TtlCache<Vec<CountBy>>,
}

impl<R: RecipeRepository> RecipeService<R> {
    pub fn new(repo: R, cache_ttl: Duration) -> Self {
        Self {
            repo,
            stats_cache: TtlCache::new(cache_ttl),
        }
    }

    pub fn create_recipe(&self, mut recipe: Recipe) -> AppResult<Recipe> {
        recipe.normalize();
        let id = self.repo.create_recipe(&recipe)?;
        self.stats_cache.clear();
        info!(
            "event=recipe_create module=recipe status=ok ingredients={}",
            recipe.ingredients.len()
        );
        self.get_recipe(id)
    }

    /// Full replacement of an existing recipe.
    pub fn update_recipe(&self, mut recipe: Recipe) -> AppResult<Recipe> {
        recipe.normalize();
        self.repo.update_recipe(&recipe)?;
        self.stats_cache.clear();
        info!("event=recipe_update module=recipe status=ok");
        self.get_recipe(recipe.id)
    }

    /// Active recipe by id; deleted recipes are reported as not found.
    pub fn get_recipe(&self, id: RecipeId) -> AppResult<Recipe> {
        self.repo
            .get_recipe(id, false)?
            .ok_or_else(|| AppError::not_found("recipe", id))
    }

    pub fn list_recipes(&self, query: &RecipeListQuery) -> AppResult<Vec<Recipe>> {
        let mut query = query.clone();
        query.category = query.category.map(|value| value.trim().to_lowercase());
        query.tag = query.tag.map(|value| value.trim().to_lowercase());
        Ok(self.repo.list_recipes(&query)?)
    }

    pub fn delete_recipe(&self, id: RecipeId) -> AppResult<()> {
        self.repo.set_deleted(id, true)?;
        self.stats_cache.clear();
        info!("event=recipe_delete module=recipe status=ok soft=true");
        Ok(())
    }

    pub fn restore_recipe(&self, id: RecipeId) -> AppResult<Recipe> {
        self.repo.set_deleted(id, false)?;
        self.stats_cache.clear();
        info!("event=recipe_restore module=recipe status=ok");
        self.get_recipe(id)
    }

    /// Ingredients of `id` scaled to `servings`.
    pub fn scaled_ingredients(
        &self,
        id: RecipeId,
        servings: u32,
    ) -> AppResult<Vec<RecipeIngredient>> {
        if servings == 0 {
            return Err(ValidationError::new("servings", ValidationErrorKind::NotPositive).into());
        }
        Ok(self.get_recipe(id)?.scaled_ingredients(servings))
    }

    /// Active recipes per category, most populated first.
    pub fn category_stats(&self) -> AppResult<Vec<CountBy>> {
        self.stats_cache
            .get_or_try_insert_with(CATEGORY_STATS_KEY, || self.repo.count_by_category())
            .map_err(AppError::from)
    }

    pub fn total_minutes(&self, id: RecipeId) -> AppResult<u32> {
        Ok(self.get_recipe(id)?.total_minutes())
    }
}
