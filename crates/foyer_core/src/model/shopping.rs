//! Shopping list model.

use crate::validation::{require_non_blank, require_positive, ValidationError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

pub type ShoppingItemId = Uuid;

/// Where a shopping item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSource {
    Manual,
    /// Generated from an inventory low-stock alert.
    LowStock,
    /// Generated from a recipe's missing ingredients.
    Recipe,
}

impl ItemSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::LowStock => "low_stock",
            Self::Recipe => "recipe",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "manual" => Some(Self::Manual),
            "low_stock" => Some(Self::LowStock),
            "recipe" => Some(Self::Recipe),
            _ => None,
        }
    }
}

impl FromStr for ItemSource {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value.trim()).ok_or_else(|| format!("unknown item source `{value}`"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub id: ShoppingItemId,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub category: String,
    pub bought: bool,
    pub source: ItemSource,
    pub created_at: i64,
}

impl ShoppingItem {
    pub fn new(
        name: impl Into<String>,
        quantity: f64,
        unit: impl Into<String>,
        source: ItemSource,
        created_at: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            quantity,
            unit: unit.into(),
            category: String::new(),
            bought: false,
            source,
            created_at,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("shopping_item.name", &self.name)?;
        require_positive("shopping_item.quantity", self.quantity)
    }
}
