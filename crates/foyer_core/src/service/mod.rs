//! Use-case services over the repositories.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep front-ends decoupled from storage details.
//! - Convert repository failures into [`crate::error::AppError`].

pub mod batch_service;
pub mod betting_service;
pub mod budget_service;
pub mod csv_io;
pub mod famille_service;
pub mod garden_service;
pub mod inventory_service;
pub mod lottery_service;
pub mod planner;
pub mod recipe_service;
pub mod shopping_service;
