//! Human-readable layouts.

use foyer_core::model::batch::{BatchSession, BatchStep, Preparation};
use foyer_core::model::garden::GardenZone;
use foyer_core::model::inventory::Article;
use foyer_core::model::recipe::{Recipe, RecipeIngredient};
use foyer_core::model::shopping::ShoppingItem;
use foyer_core::service::batch_service::SessionProgress;
use foyer_core::service::betting_service::SeriesStats;
use foyer_core::service::budget_service::MonthlySummary;
use foyer_core::service::garden_service::WateringStatus;
use foyer_core::service::lottery_service::{BallStats, GridCheck, LotteryStats};
use std::collections::BTreeMap;

const RULE_WIDTH: usize = 40;

fn section(title: &str, count: usize) -> String {
    format!("{title} ({count})\n{}", "-".repeat(RULE_WIDTH))
}

pub fn euros(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{sign}{}.{:02} €", cents / 100, cents % 100)
}

fn quantity(value: f64, unit: &str) -> String {
    if unit.is_empty() {
        format!("{value}")
    } else {
        format!("{value} {unit}")
    }
}

pub fn format_recipe(recipe: &Recipe) -> String {
    let mut output = format!(
        "{} [{}]\n  ID: {}\n  Portions: {}\n  Temps: {} min (prép. {} + cuisson {})",
        recipe.name,
        if recipe.category.is_empty() { "-" } else { &recipe.category },
        recipe.id,
        recipe.servings,
        recipe.total_minutes(),
        recipe.prep_minutes,
        recipe.cook_minutes,
    );
    if !recipe.tags.is_empty() {
        output.push_str(&format!("\n  Tags: {}", recipe.tags.join(", ")));
    }
    for ingredient in &recipe.ingredients {
        output.push_str(&format!("\n  - {}", format_ingredient(ingredient)));
    }
    if recipe.is_deleted {
        output.push_str("\n  (corbeille)");
    }
    output
}

pub fn format_ingredient(ingredient: &RecipeIngredient) -> String {
    format!("{} : {}", ingredient.name, quantity(ingredient.quantity, &ingredient.unit))
}

pub fn format_ingredients(ingredients: &[RecipeIngredient]) -> String {
    ingredients
        .iter()
        .map(format_ingredient)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_recipes(recipes: &[Recipe]) -> String {
    if recipes.is_empty() {
        return "Aucune recette.".to_string();
    }
    let mut output = section("RECETTES", recipes.len());
    for recipe in recipes {
        output.push_str(&format!(
            "\n{}  {} ({} pers., {} min)",
            recipe.id,
            recipe.name,
            recipe.servings,
            recipe.total_minutes()
        ));
    }
    output
}

pub fn format_article(article: &Article) -> String {
    let mut output = format!(
        "{}  {} : {}",
        article.id,
        article.name,
        quantity(article.quantity, &article.unit)
    );
    if article.min_quantity > 0.0 {
        output.push_str(&format!(" (seuil {})", article.min_quantity));
    }
    if let Some(expiry) = article.expiry_date {
        output.push_str(&format!(" DLC {expiry}"));
    }
    if !article.location.is_empty() {
        output.push_str(&format!(" @{}", article.location));
    }
    output
}

pub fn format_articles(articles: &[Article]) -> String {
    if articles.is_empty() {
        return "Aucun article.".to_string();
    }
    let mut output = section("STOCK", articles.len());
    for article in articles {
        output.push_str(&format!("\n{}", format_article(article)));
    }
    output
}

pub fn format_shopping_item(item: &ShoppingItem) -> String {
    format!(
        "[{}] {}  {} : {}",
        if item.bought { "x" } else { " " },
        item.id,
        item.name,
        quantity(item.quantity, &item.unit)
    )
}

pub fn format_shopping_items(items: &[ShoppingItem]) -> String {
    if items.is_empty() {
        return "Liste vide.".to_string();
    }
    let mut output = section("COURSES", items.len());
    for item in items {
        output.push_str(&format!("\n{}", format_shopping_item(item)));
    }
    output
}

pub fn format_shopping_groups(groups: &BTreeMap<String, Vec<ShoppingItem>>) -> String {
    if groups.is_empty() {
        return "Liste vide.".to_string();
    }
    let mut output = String::new();
    for (category, items) in groups {
        if !output.is_empty() {
            output.push('\n');
        }
        output.push_str(&category.to_uppercase());
        for item in items {
            output.push_str(&format!("\n  {}", format_shopping_item(item)));
        }
    }
    output
}

pub fn format_session(session: &BatchSession) -> String {
    format!(
        "{} [{}]\n  ID: {}\n  Date: {}\n  Recettes: {}",
        session.name,
        session.status.as_str(),
        session.id,
        session.planned_date,
        session.recipe_ids.len()
    )
}

pub fn format_sessions(sessions: &[BatchSession]) -> String {
    if sessions.is_empty() {
        return "Aucune session.".to_string();
    }
    let mut output = section("SESSIONS", sessions.len());
    for session in sessions {
        output.push_str(&format!("\n{}", format_session(session)));
    }
    output
}

pub fn format_step(step: &BatchStep) -> String {
    let group = step
        .parallel_group
        .map(|group| format!(" ∥{group}"))
        .unwrap_or_default();
    format!(
        "{:>2}. [{}] {} ({} min{group})\n    ID: {}",
        step.position,
        step.status.as_str(),
        step.title,
        step.duration_minutes,
        step.id
    )
}

pub fn format_steps(steps: &[BatchStep]) -> String {
    if steps.is_empty() {
        return "Aucune étape.".to_string();
    }
    let mut output = section("ÉTAPES", steps.len());
    for step in steps {
        output.push_str(&format!("\n{}", format_step(step)));
    }
    output
}

pub fn format_progress(progress: &SessionProgress) -> String {
    format!(
        "{}/{} étapes ({:.0} %), reste environ {} min",
        progress.closed_steps,
        progress.total_steps,
        progress.ratio * 100.0,
        progress.remaining_minutes
    )
}

pub fn format_preparation(preparation: &Preparation) -> String {
    format!(
        "{}  {} : {}/{} portions, {} jusqu'au {}",
        preparation.id,
        preparation.name,
        preparation.remaining_portions,
        preparation.portions,
        preparation.storage.as_str(),
        preparation.expires_on
    )
}

pub fn format_preparations(preparations: &[Preparation]) -> String {
    if preparations.is_empty() {
        return "Aucune préparation.".to_string();
    }
    let mut output = section("PRÉPARATIONS", preparations.len());
    for preparation in preparations {
        output.push_str(&format!("\n{}", format_preparation(preparation)));
    }
    output
}

fn format_balls(balls: &[u8]) -> String {
    balls
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_ball_table(title: &str, stats: &[BallStats]) -> String {
    let mut output = format!("{title}\n  boule  sorties  écart  max  score");
    for ball in stats {
        output.push_str(&format!(
            "\n  {:>5}  {:>7}  {:>5}  {:>3}  {:.2}",
            ball.ball,
            ball.frequency,
            ball.last_seen_draws_ago
                .map_or_else(|| "-".to_string(), |gap| gap.to_string()),
            ball.max_gap,
            ball.streak_score
        ));
    }
    output
}

pub fn format_lottery_stats(stats: &LotteryStats, top: usize) -> String {
    let mut output = format!("Tirages analysés : {}", stats.draws_analyzed);
    if stats.from_fallback {
        output.push_str(" (historique de démonstration)");
    }
    output.push_str(&format!(
        "\nNuméros chauds : {}\nNuméros froids : {}\nNuméros en retard : {}\
         \nÉtoiles chaudes : {}\nÉtoiles en retard : {}",
        format_balls(&stats.hot_numbers(top)),
        format_balls(&stats.cold_numbers(top)),
        format_balls(&stats.overdue_numbers(top)),
        format_balls(&stats.hot_stars(top.min(2))),
        format_balls(&stats.overdue_stars(top.min(2))),
    ));
    output.push('\n');
    output.push_str(&format_ball_table("ÉTOILES", &stats.stars));
    output
}

pub fn format_grid(numbers: &[u8], stars: &[u8]) -> String {
    format!("{} | {}", format_balls(numbers), format_balls(stars))
}

pub fn format_grid_check(check: &GridCheck) -> String {
    let rank = check
        .prize_rank
        .map_or_else(|| "aucun gain".to_string(), |rank| format!("rang {rank}"));
    format!(
        "{} numéro(s), {} étoile(s) : {rank}",
        check.matched_numbers.len(),
        check.matched_stars.len()
    )
}

pub fn format_series(series: &BTreeMap<String, SeriesStats>) -> String {
    if series.is_empty() {
        return "Aucun pari.".to_string();
    }
    let mut output = String::from("marché        paris  G/P    taux  série  bénéfice");
    for (market, stats) in series {
        output.push_str(&format!(
            "\n{:<12}  {:>5}  {:>2}/{:<2}  {:>3.0} %  {:>+5}  {}",
            market,
            stats.total,
            stats.won,
            stats.lost,
            stats.win_rate * 100.0,
            stats.current_streak,
            euros(stats.profit_cents)
        ));
    }
    output
}

pub fn format_budget(summary: &MonthlySummary) -> String {
    let mut output = format!("BUDGET {:04}-{:02}", summary.year, summary.month);
    output.push('\n');
    output.push_str(&"-".repeat(RULE_WIDTH));
    for line in &summary.categories {
        output.push_str(&format!(
            "\n{:<16} {:>12} / {:>12}  {}",
            line.category.name,
            euros(line.spent_cents),
            euros(line.category.monthly_limit_cents),
            line.status.as_str()
        ));
    }
    output.push_str(&format!(
        "\n{:<16} {:>12} / {:>12}  {}",
        "TOTAL",
        euros(summary.total_spent_cents),
        euros(summary.total_limit_cents),
        summary.status.as_str()
    ));
    output
}

pub fn format_zone(zone: &GardenZone) -> String {
    let watered = zone
        .last_watered_on
        .map_or_else(|| "jamais arrosé".to_string(), |day| format!("arrosé le {day}"));
    format!(
        "{}  {} ({} m², tous les {} j) {watered}",
        zone.id, zone.name, zone.surface_m2, zone.watering_interval_days
    )
}

pub fn format_zones(zones: &[GardenZone]) -> String {
    if zones.is_empty() {
        return "Aucune zone à arroser.".to_string();
    }
    let mut output = section("ZONES", zones.len());
    for zone in zones {
        output.push_str(&format!("\n{}", format_zone(zone)));
    }
    output
}

pub fn format_schedule(schedule: &[WateringStatus]) -> String {
    if schedule.is_empty() {
        return "Aucune zone.".to_string();
    }
    let mut output = section("JARDIN", schedule.len());
    for status in schedule {
        let when = if status.due {
            "à arroser".to_string()
        } else {
            format!("dans {} j", status.days_until_watering)
        };
        output.push_str(&format!("\n{}  [{when}]", format_zone(&status.zone)));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::euros;

    #[test]
    fn euros_keep_two_decimals() {
        assert_eq!(euros(1_250), "12.50 €");
        assert_eq!(euros(5), "0.05 €");
        assert_eq!(euros(-300), "-3.00 €");
    }
}
