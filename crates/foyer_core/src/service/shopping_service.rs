//! Shopping list use-cases.
//!
//! # Responsibility
//! - Keep one open line per product by merging repeated additions.
//! - Generate lines from low stock and from recipe needs.
//!
//! # Invariants
//! - Merges only target open (not bought) lines with the same name and
//!   unit, compared case-insensitively.
//! - Low-stock generation is idempotent: re-running it never increases a
//!   line past the computed shortfall.

use crate::error::{AppError, AppResult};
use crate::model::inventory::Article;
use crate::model::recipe::Recipe;
use crate::model::shopping::{ItemSource, ShoppingItem, ShoppingItemId};
use crate::model::{now_epoch_ms, round_quantity};
use crate::repo::inventory_repo::InventoryRepository;
use crate::repo::shopping_repo::ShoppingRepository;
use crate::validation::{require_positive, ValidationError, ValidationErrorKind};
use log::info;
use std::collections::BTreeMap;

/// Category label for lines without a category.
pub const UNCATEGORIZED: &str = "autre";

const LOW_STOCK_TARGET_FACTOR: f64 = 2.0;
const LOW_STOCK_MIN_SHORTFALL: f64 = 1.0;

pub struct ShoppingService<S: ShoppingRepository, I: InventoryRepository> {
    shopping: S,
    inventory: I,
}

impl<S: ShoppingRepository, I: InventoryRepository> ShoppingService<S, I> {
    pub fn new(shopping: S, inventory: I) -> Self {
        Self {
            shopping,
            inventory,
        }
    }

    /// Adds a manual line, merging into an open line for the same product.
    pub fn add_item(
        &self,
        name: &str,
        quantity: f64,
        unit: &str,
        category: &str,
    ) -> AppResult<ShoppingItem> {
        self.merge_or_create(name, quantity, unit, category, ItemSource::Manual)
    }

    pub fn get_item(&self, id: ShoppingItemId) -> AppResult<ShoppingItem> {
        self.shopping
            .get_item(id)?
            .ok_or_else(|| AppError::not_found("shopping_item", id))
    }

    pub fn list_items(&self, include_bought: bool) -> AppResult<Vec<ShoppingItem>> {
        Ok(self.shopping.list_items(include_bought)?)
    }

    pub fn remove_item(&self, id: ShoppingItemId) -> AppResult<()> {
        self.shopping.delete_item(id)?;
        Ok(())
    }

    pub fn mark_bought(&self, id: ShoppingItemId) -> AppResult<ShoppingItem> {
        self.shopping.set_bought(id, true)?;
        self.get_item(id)
    }

    pub fn unmark_bought(&self, id: ShoppingItemId) -> AppResult<ShoppingItem> {
        self.shopping.set_bought(id, false)?;
        self.get_item(id)
    }

    pub fn clear_bought(&self) -> AppResult<usize> {
        let removed = self.shopping.clear_bought()?;
        info!("event=shopping_clear module=shopping status=ok removed={removed}");
        Ok(removed)
    }

    /// Adds a line for every low-stock article so that buying it brings the
    /// stock to twice its threshold. Returns the touched lines.
    pub fn generate_from_low_stock(&self) -> AppResult<Vec<ShoppingItem>> {
        let mut touched = Vec::new();
        for article in self
            .inventory
            .list_all_articles()?
            .into_iter()
            .filter(Article::is_low_stock)
        {
            let needed = low_stock_shortfall(&article);
            let item = match self.shopping.find_open(&article.name, &article.unit)? {
                Some(mut existing) => {
                    if existing.quantity < needed {
                        existing.quantity = needed;
                        self.shopping.update_item(&existing)?;
                    }
                    existing
                }
                None => {
                    let mut item = ShoppingItem::new(
                        article.name.trim(),
                        needed,
                        article.unit.trim(),
                        ItemSource::LowStock,
                        now_epoch_ms(),
                    );
                    item.category = article.category.clone();
                    self.shopping.create_item(&item)?;
                    item
                }
            };
            touched.push(item);
        }
        info!(
            "event=shopping_from_stock module=shopping status=ok items={}",
            touched.len()
        );
        Ok(touched)
    }

    /// Adds what is missing to cook `recipe` for `servings`: the scaled
    /// ingredient quantity minus the current stock of the same product.
    /// Ingredients fully covered by the stock are skipped.
    pub fn add_recipe(&self, recipe: &Recipe, servings: u32) -> AppResult<Vec<ShoppingItem>> {
        if servings == 0 {
            return Err(ValidationError::new("servings", ValidationErrorKind::NotPositive).into());
        }
        let mut touched = Vec::new();
        for ingredient in recipe.scaled_ingredients(servings) {
            let in_stock = self
                .inventory
                .find_by_name(&ingredient.name, &ingredient.unit)?
                .map_or(0.0, |article| article.quantity);
            let missing = round_quantity(ingredient.quantity - in_stock);
            if missing <= 0.0 {
                continue;
            }
            touched.push(self.merge_or_create(
                &ingredient.name,
                missing,
                &ingredient.unit,
                "",
                ItemSource::Recipe,
            )?);
        }
        info!(
            "event=shopping_from_recipe module=shopping status=ok items={}",
            touched.len()
        );
        Ok(touched)
    }

    /// Open lines grouped by category; blank categories use
    /// [`UNCATEGORIZED`].
    pub fn grouped_by_category(&self) -> AppResult<BTreeMap<String, Vec<ShoppingItem>>> {
        let mut groups: BTreeMap<String, Vec<ShoppingItem>> = BTreeMap::new();
        for item in self.shopping.list_items(false)? {
            let key = match item.category.trim() {
                "" => UNCATEGORIZED.to_string(),
                category => category.to_lowercase(),
            };
            groups.entry(key).or_default().push(item);
        }
        Ok(groups)
    }

    fn merge_or_create(
        &self,
        name: &str,
        quantity: f64,
        unit: &str,
        category: &str,
        source: ItemSource,
    ) -> AppResult<ShoppingItem> {
        require_positive("shopping_item.quantity", quantity)?;
        if let Some(mut existing) = self.shopping.find_open(name, unit)? {
            existing.quantity = round_quantity(existing.quantity + quantity);
            if existing.category.trim().is_empty() && !category.trim().is_empty() {
                existing.category = category.trim().to_string();
            }
            self.shopping.update_item(&existing)?;
            info!("event=shopping_add module=shopping status=ok merged=true");
            return Ok(existing);
        }
        let mut item =
            ShoppingItem::new(name.trim(), quantity, unit.trim(), source, now_epoch_ms());
        item.category = category.trim().to_string();
        self.shopping.create_item(&item)?;
        info!("event=shopping_add module=shopping status=ok merged=false");
        Ok(item)
    }
}

/// Quantity to buy so the stock reaches `2 × min_quantity`, at least 1.
pub fn low_stock_shortfall(article: &Article) -> f64 {
    let target = article.min_quantity * LOW_STOCK_TARGET_FACTOR;
    round_quantity((target - article.quantity).max(LOW_STOCK_MIN_SHORTFALL))
}
