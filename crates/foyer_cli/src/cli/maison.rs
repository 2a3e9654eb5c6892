//! Garden commands.

use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Debug, Parser)]
pub struct GardenCommand {
    #[command(subcommand)]
    pub action: GardenAction,
}

#[derive(Debug, Subcommand)]
pub enum GardenAction {
    /// Add a garden zone.
    Add {
        name: String,
        #[arg(long)]
        surface: f64,
        /// Days between two waterings.
        #[arg(long, default_value = "2")]
        every: u32,
        /// Repeatable.
        #[arg(long = "plant")]
        plants: Vec<String>,
    },
    /// Zones with their watering status.
    List,
    /// Record a watering on the reference day.
    Water { id: Uuid },
    /// Zones that need water.
    Due,
}
