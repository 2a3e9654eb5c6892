//! Recipe, inventory, shopping and batch-cooking commands.

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use foyer_core::model::batch::StorageKind;
use foyer_core::model::recipe::RecipeIngredient;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Parser)]
pub struct RecipeCommand {
    #[command(subcommand)]
    pub action: RecipeAction,
}

#[derive(Debug, Subcommand)]
pub enum RecipeAction {
    /// Add a recipe.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "4")]
        servings: u32,
        #[arg(long, default_value = "")]
        category: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Hands-on minutes.
        #[arg(long, default_value = "0")]
        prep: u32,
        /// Cooking minutes.
        #[arg(long, default_value = "0")]
        cook: u32,
        /// Repeatable.
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// `name:quantity[:unit]`, repeatable.
        #[arg(long = "ingredient", value_parser = parse_ingredient)]
        ingredients: Vec<RecipeIngredient>,
    },
    /// List recipes.
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        /// Substring of the name.
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        include_deleted: bool,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show one recipe.
    Show { id: Uuid },
    /// Move a recipe to the trash.
    Delete { id: Uuid },
    /// Take a recipe out of the trash.
    Restore { id: Uuid },
    /// Ingredients scaled to a number of servings.
    Scale { id: Uuid, servings: u32 },
    /// Recipe count per category.
    Stats,
}

#[derive(Debug, Parser)]
pub struct InventoryCommand {
    #[command(subcommand)]
    pub action: InventoryAction,
}

#[derive(Debug, Subcommand)]
pub enum InventoryAction {
    /// Add stock; merges into the article with the same name and unit.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        quantity: f64,
        #[arg(long, default_value = "")]
        unit: String,
        #[arg(long, default_value = "")]
        category: String,
        /// Low-stock threshold.
        #[arg(long, default_value = "0")]
        min: f64,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long)]
        expires: Option<NaiveDate>,
        #[arg(long)]
        barcode: Option<String>,
    },
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        location: Option<String>,
    },
    /// Take a quantity out of the stock.
    Consume { id: Uuid, quantity: f64 },
    /// Put a quantity back into the stock.
    Restock { id: Uuid, quantity: f64 },
    /// Articles at or below their threshold.
    Low,
    /// Articles expiring soon; defaults to the configured warning window.
    Expiring {
        #[arg(long)]
        days: Option<u32>,
    },
    /// Articles past their expiry date.
    Expired,
    /// Write the stock as CSV to a file or stdout.
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Merge a CSV file into the stock.
    Import { file: PathBuf },
    /// Look an article up by EAN/UPC code.
    Scan { code: String },
    Delete { id: Uuid },
}

#[derive(Debug, Parser)]
pub struct ShoppingCommand {
    #[command(subcommand)]
    pub action: ShoppingAction,
}

#[derive(Debug, Subcommand)]
pub enum ShoppingAction {
    /// Open lines grouped by category.
    List {
        /// Flat list including bought lines.
        #[arg(long)]
        all: bool,
    },
    Add {
        name: String,
        #[arg(long, default_value = "1")]
        quantity: f64,
        #[arg(long, default_value = "")]
        unit: String,
        #[arg(long, default_value = "")]
        category: String,
    },
    /// Mark a line as bought.
    Bought { id: Uuid },
    /// Put a bought line back on the list.
    Unbought { id: Uuid },
    Remove { id: Uuid },
    /// Delete every bought line.
    Clear,
    /// Add lines for low-stock articles.
    FromStock,
    /// Add what is missing to cook a recipe.
    FromRecipe {
        id: Uuid,
        #[arg(long)]
        servings: Option<u32>,
    },
}

#[derive(Debug, Parser)]
pub struct BatchCommand {
    #[command(subcommand)]
    pub action: BatchAction,
}

#[derive(Debug, Subcommand)]
pub enum BatchAction {
    /// Plan a session over recipes.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        date: NaiveDate,
        /// Repeatable.
        #[arg(long = "recipe", required = true)]
        recipes: Vec<Uuid>,
    },
    List,
    /// Generate the steps of a planned session.
    Plan { session: Uuid },
    /// Append a manual step.
    AddStep {
        session: Uuid,
        #[arg(long)]
        title: String,
        #[arg(long)]
        minutes: u32,
        #[arg(long)]
        recipe: Option<Uuid>,
        #[arg(long)]
        group: Option<u32>,
    },
    Steps { session: Uuid },
    Start { session: Uuid },
    StepStart { step: Uuid },
    StepDone { step: Uuid },
    StepSkip { step: Uuid },
    Finish { session: Uuid },
    Cancel { session: Uuid },
    Progress { session: Uuid },
    /// Record a preparation produced by a session.
    Store {
        session: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long)]
        portions: u32,
        #[arg(long, value_enum, default_value = "fridge")]
        storage: Storage,
        #[arg(long)]
        recipe: Option<Uuid>,
    },
    /// Stored preparations; `--expiring` keeps those expiring soon.
    Preps {
        #[arg(long)]
        session: Option<Uuid>,
        #[arg(long)]
        expiring: Option<u32>,
    },
    /// Eat portions of a preparation.
    Eat { preparation: Uuid, portions: u32 },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Storage {
    Fridge,
    Freezer,
}

impl From<Storage> for StorageKind {
    fn from(value: Storage) -> Self {
        match value {
            Storage::Fridge => StorageKind::Fridge,
            Storage::Freezer => StorageKind::Freezer,
        }
    }
}

/// Parses `name:quantity[:unit]`.
pub fn parse_ingredient(value: &str) -> Result<RecipeIngredient, String> {
    let mut parts = value.splitn(3, ':');
    let name = parts.next().unwrap_or_default().trim();
    let quantity = parts
        .next()
        .ok_or_else(|| format!("expected name:quantity[:unit], got `{value}`"))?
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| format!("invalid quantity in `{value}`"))?;
    let unit = parts.next().unwrap_or_default().trim();
    if name.is_empty() {
        return Err(format!("missing ingredient name in `{value}`"));
    }
    Ok(RecipeIngredient::new(name, quantity, unit))
}
