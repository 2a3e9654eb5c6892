//! Recipe domain model.
//!
//! # Invariants
//! - `servings > 0`; every ingredient quantity is strictly positive.
//! - `tags` are stored normalized (see [`normalize_tags`]).
//! - Deletion is a soft-delete tombstone.

use crate::model::{normalize_tags, round_quantity};
use crate::validation::{
    require_max_len, require_non_blank, require_positive, ValidationError, ValidationErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type RecipeId = Uuid;

const NAME_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub name: String,
    pub quantity: f64,
    /// Free-form unit (`g`, `ml`, `pièce`). Empty means "unit-less count".
    pub unit: String,
}

impl RecipeIngredient {
    pub fn new(name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit: unit.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub servings: u32,
    pub prep_minutes: u32,
    pub cook_minutes: u32,
    pub tags: Vec<String>,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_deleted: bool,
}

impl Recipe {
    pub fn new(name: impl Into<String>, servings: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            category: String::new(),
            servings,
            prep_minutes: 0,
            cook_minutes: 0,
            tags: Vec::new(),
            ingredients: Vec::new(),
            is_deleted: false,
        }
    }

    #[must_use]
    pub fn with_ingredient(mut self, name: &str, quantity: f64, unit: &str) -> Self {
        self.ingredients
            .push(RecipeIngredient::new(name, quantity, unit));
        self
    }

    #[must_use]
    pub fn with_times(mut self, prep_minutes: u32, cook_minutes: u32) -> Self {
        self.prep_minutes = prep_minutes;
        self.cook_minutes = cook_minutes;
        self
    }

    pub fn total_minutes(&self) -> u32 {
        self.prep_minutes.saturating_add(self.cook_minutes)
    }

    /// Normalizes tags in place.
    pub fn normalize(&mut self) {
        self.tags = normalize_tags(&self.tags);
        self.name = self.name.trim().to_string();
        self.category = self.category.trim().to_lowercase();
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("recipe.name", &self.name)?;
        require_max_len("recipe.name", &self.name, NAME_MAX_CHARS)?;
        if self.servings == 0 {
            return Err(ValidationError::new(
                "recipe.servings",
                ValidationErrorKind::NotPositive,
            ));
        }
        for ingredient in &self.ingredients {
            require_non_blank("recipe.ingredients.name", &ingredient.name)?;
            require_positive("recipe.ingredients.quantity", ingredient.quantity)?;
        }
        Ok(())
    }

    /// Ingredient list scaled proportionally to `servings`, rounded to two
    /// decimals. `servings == 0` yields an empty list.
    pub fn scaled_ingredients(&self, servings: u32) -> Vec<RecipeIngredient> {
        if servings == 0 || self.servings == 0 {
            return Vec::new();
        }
        let factor = f64::from(servings) / f64::from(self.servings);
        self.ingredients
            .iter()
            .map(|ingredient| RecipeIngredient {
                name: ingredient.name.clone(),
                quantity: round_quantity(ingredient.quantity * factor),
                unit: ingredient.unit.clone(),
            })
            .collect()
    }

    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
    }

    pub fn restore(&mut self) {
        self.is_deleted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::Recipe;

    #[test]
    fn scaling_doubles_quantities() {
        let recipe = Recipe::new("Gratin", 4)
            .with_ingredient("pommes de terre", 800.0, "g")
            .with_ingredient("crème", 20.0, "cl");
        let scaled = recipe.scaled_ingredients(8);
        assert_eq!(scaled[0].quantity, 1600.0);
        assert_eq!(scaled[1].quantity, 40.0);
    }

    #[test]
    fn scaling_rounds_to_two_decimals() {
        let recipe = Recipe::new("Pâte", 3).with_ingredient("oeufs", 1.0, "");
        assert_eq!(recipe.scaled_ingredients(1)[0].quantity, 0.33);
        assert!(recipe.scaled_ingredients(0).is_empty());
    }

    #[test]
    fn validate_rejects_zero_servings_and_bad_ingredients() {
        assert!(Recipe::new("Soupe", 0).validate().is_err());
        assert!(Recipe::new("  ", 2).validate().is_err());
        let bad = Recipe::new("Soupe", 2).with_ingredient("eau", 0.0, "l");
        assert!(bad.validate().is_err());
        let good = Recipe::new("Soupe", 2).with_ingredient("eau", 1.5, "l");
        assert!(good.validate().is_ok());
    }

    #[test]
    fn normalize_lowercases_category_and_tags() {
        let mut recipe = Recipe::new(" Curry ", 2);
        recipe.category = " Plat ".into();
        recipe.tags = vec!["Épicé".into(), "épicé".into()];
        recipe.normalize();
        assert_eq!(recipe.name, "Curry");
        assert_eq!(recipe.category, "plat");
        assert_eq!(recipe.tags, vec!["épicé"]);
    }
}
