//! Family, health record and agenda commands.

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Debug, Parser)]
pub struct FamilyCommand {
    #[command(subcommand)]
    pub action: FamilyAction,
}

#[derive(Debug, Subcommand)]
pub enum FamilyAction {
    /// Add a family member.
    Add {
        name: String,
        #[arg(long)]
        birth: Option<NaiveDate>,
        #[arg(long)]
        child: bool,
    },
    List,
    /// Record a vaccine injection.
    Vaccine {
        member: Uuid,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "1")]
        dose: u32,
        /// Defaults to the reference day.
        #[arg(long)]
        given: Option<NaiveDate>,
        /// Date of the next injection.
        #[arg(long)]
        next: Option<NaiveDate>,
    },
    /// Vaccines of a member.
    Vaccines { member: Uuid },
    /// Booster injections due within a number of days.
    VaccinesDue {
        #[arg(long, default_value = "30")]
        days: u32,
    },
    /// Record a growth measurement.
    Growth {
        member: Uuid,
        #[arg(long)]
        height: f64,
        #[arg(long)]
        weight: f64,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Growth chart of a member.
    GrowthHistory { member: Uuid },
    /// Add a calendar event; times are `YYYY-MM-DDTHH:MM:SS`.
    Event {
        #[arg(long)]
        title: String,
        #[arg(long)]
        start: NaiveDateTime,
        #[arg(long)]
        end: Option<NaiveDateTime>,
        /// Member id, repeatable.
        #[arg(long = "with")]
        participants: Vec<Uuid>,
        #[arg(long, default_value = "")]
        category: String,
    },
    DeleteEvent { id: Uuid },
    /// Events between two days (inclusive) or of one member.
    Agenda {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        member: Option<Uuid>,
    },
}
