//! Command dispatch over the core services.

use crate::cli::cuisine::{BatchAction, InventoryAction, RecipeAction, ShoppingAction};
use crate::cli::famille::FamilyAction;
use crate::cli::finances::BudgetAction;
use crate::cli::jeux::{BetsAction, LotteryAction};
use crate::cli::maison::GardenAction;
use crate::cli::{Commands, OutputFormat};
use crate::error::{CliError, CliResult};
use crate::output::{as_json, emit, pretty};
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use foyer_core::model::famille::{CalendarEvent, GrowthMeasurement, Vaccine};
use foyer_core::model::garden::GardenZone;
use foyer_core::model::inventory::Article;
use foyer_core::model::jeux::{Bet, LotteryDraw, LotteryGrid};
use foyer_core::model::now_epoch_ms;
use foyer_core::model::recipe::Recipe;
use foyer_core::repo::batch_repo::SqliteBatchRepository;
use foyer_core::repo::famille_repo::SqliteFamilleRepository;
use foyer_core::repo::finance_repo::SqliteFinanceRepository;
use foyer_core::repo::garden_repo::SqliteGardenRepository;
use foyer_core::repo::inventory_repo::{InventoryQuery, SqliteInventoryRepository};
use foyer_core::repo::jeux_repo::SqliteJeuxRepository;
use foyer_core::repo::recipe_repo::{RecipeListQuery, SqliteRecipeRepository};
use foyer_core::repo::shopping_repo::SqliteShoppingRepository;
use foyer_core::repo::Page;
use foyer_core::service::batch_service::{BatchService, NewStep, ShelfLife};
use foyer_core::service::betting_service::BettingService;
use foyer_core::service::budget_service::BudgetService;
use foyer_core::service::famille_service::FamilleService;
use foyer_core::service::garden_service::GardenService;
use foyer_core::service::inventory_service::InventoryService;
use foyer_core::service::lottery_service::LotteryService;
use foyer_core::service::planner::SequentialPlanner;
use foyer_core::service::recipe_service::RecipeService;
use foyer_core::service::shopping_service::ShoppingService;
use foyer_core::AppConfig;
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::path::Path;

/// Values shared by every command.
pub struct Context {
    pub config: AppConfig,
    pub format: OutputFormat,
    pub today: NaiveDate,
    pub now_ms: i64,
}

pub fn run(conn: &Connection, ctx: &Context, command: Commands) -> CliResult<()> {
    match command {
        Commands::Init => {
            emit(ctx.format, &ctx.config.db_path, |path| {
                format!("Base prête : {}", path.display())
            });
            Ok(())
        }
        Commands::Recipe(cmd) => run_recipe(conn, ctx, cmd.action),
        Commands::Inventory(cmd) => run_inventory(conn, ctx, cmd.action),
        Commands::Shopping(cmd) => run_shopping(conn, ctx, cmd.action),
        Commands::Batch(cmd) => run_batch(conn, ctx, cmd.action),
        Commands::Lottery(cmd) => run_lottery(conn, ctx, cmd.action),
        Commands::Bets(cmd) => run_bets(conn, ctx, cmd.action),
        Commands::Budget(cmd) => run_budget(conn, ctx, cmd.action),
        Commands::Family(cmd) => run_family(conn, ctx, cmd.action),
        Commands::Garden(cmd) => run_garden(conn, ctx, cmd.action),
    }
}

fn recipe_service<'c>(
    conn: &'c Connection,
    ctx: &Context,
) -> CliResult<RecipeService<SqliteRecipeRepository<'c>>> {
    Ok(RecipeService::new(
        SqliteRecipeRepository::try_new(conn)?,
        ctx.config.cache_ttl(),
    ))
}

fn run_recipe(conn: &Connection, ctx: &Context, action: RecipeAction) -> CliResult<()> {
    let service = recipe_service(conn, ctx)?;
    match action {
        RecipeAction::Add {
            name,
            servings,
            category,
            description,
            prep,
            cook,
            tags,
            ingredients,
        } => {
            let mut recipe = Recipe::new(name, servings).with_times(prep, cook);
            recipe.category = category;
            recipe.description = description;
            recipe.tags = tags;
            recipe.ingredients = ingredients;
            let recipe = service.create_recipe(recipe)?;
            emit(ctx.format, &recipe, pretty::format_recipe);
        }
        RecipeAction::List {
            category,
            tag,
            search,
            include_deleted,
            limit,
        } => {
            let recipes = service.list_recipes(&RecipeListQuery {
                category,
                tag,
                text: search,
                include_deleted,
                page: Page { limit, offset: 0 },
            })?;
            emit(ctx.format, recipes.as_slice(), pretty::format_recipes);
        }
        RecipeAction::Show { id } => {
            emit(ctx.format, &service.get_recipe(id)?, pretty::format_recipe);
        }
        RecipeAction::Delete { id } => {
            service.delete_recipe(id)?;
            emit(ctx.format, &id, |id| format!("Recette {id} mise à la corbeille"));
        }
        RecipeAction::Restore { id } => {
            emit(ctx.format, &service.restore_recipe(id)?, pretty::format_recipe);
        }
        RecipeAction::Scale { id, servings } => {
            let ingredients = service.scaled_ingredients(id, servings)?;
            emit(ctx.format, ingredients.as_slice(), pretty::format_ingredients);
        }
        RecipeAction::Stats => {
            let stats = service.category_stats()?;
            emit(ctx.format, stats.as_slice(), |stats| {
                stats
                    .iter()
                    .map(|row| format!("{:<20} {}", row.key, row.count))
                    .collect::<Vec<_>>()
                    .join("\n")
            });
        }
    }
    Ok(())
}

fn run_inventory(conn: &Connection, ctx: &Context, action: InventoryAction) -> CliResult<()> {
    let service = InventoryService::new(SqliteInventoryRepository::try_new(conn)?);
    match action {
        InventoryAction::Add {
            name,
            quantity,
            unit,
            category,
            min,
            location,
            expires,
            barcode,
        } => {
            let mut article = Article::new(name, quantity, unit);
            article.category = category;
            article.min_quantity = min;
            article.location = location;
            article.expiry_date = expires;
            article.barcode = barcode;
            let entry = service.add_article(article)?;
            emit(ctx.format, &entry, |entry| {
                let verb = if entry.merged { "Fusionné" } else { "Ajouté" };
                format!("{verb} : {}", pretty::format_article(&entry.article))
            });
        }
        InventoryAction::List { category, location } => {
            let articles = service.list_articles(&InventoryQuery {
                category,
                location,
                page: Page::default(),
            })?;
            emit(ctx.format, articles.as_slice(), pretty::format_articles);
        }
        InventoryAction::Consume { id, quantity } => {
            emit(ctx.format, &service.consume(id, quantity)?, pretty::format_article);
        }
        InventoryAction::Restock { id, quantity } => {
            emit(ctx.format, &service.restock(id, quantity)?, pretty::format_article);
        }
        InventoryAction::Low => {
            emit(ctx.format, service.low_stock()?.as_slice(), pretty::format_articles);
        }
        InventoryAction::Expiring { days } => {
            let days = days.unwrap_or(ctx.config.expiry_warning_days);
            let articles = service.expiring(ctx.today, days)?;
            emit(ctx.format, articles.as_slice(), pretty::format_articles);
        }
        InventoryAction::Expired => {
            let articles = service.expired(ctx.today)?;
            emit(ctx.format, articles.as_slice(), pretty::format_articles);
        }
        InventoryAction::Export { output } => {
            let csv = service.export_csv()?;
            match output {
                Some(path) => std::fs::write(&path, csv).map_err(|source| CliError::Io {
                    path: path.clone(),
                    source,
                })?,
                None => print!("{csv}"),
            }
        }
        InventoryAction::Import { file } => {
            let counts = service.import_csv(&read_file(&file)?)?;
            emit(ctx.format, &counts, |counts| {
                format!("{} ajouté(s), {} fusionné(s)", counts.inserted, counts.merged)
            });
        }
        InventoryAction::Scan { code } => {
            emit(ctx.format, &service.scan_barcode(&code)?, pretty::format_article);
        }
        InventoryAction::Delete { id } => {
            service.delete_article(id)?;
            emit(ctx.format, &id, |id| format!("Article {id} supprimé"));
        }
    }
    Ok(())
}

fn run_shopping(conn: &Connection, ctx: &Context, action: ShoppingAction) -> CliResult<()> {
    let service = ShoppingService::new(
        SqliteShoppingRepository::try_new(conn)?,
        SqliteInventoryRepository::try_new(conn)?,
    );
    match action {
        ShoppingAction::List { all: true } => {
            let items = service.list_items(true)?;
            emit(ctx.format, items.as_slice(), pretty::format_shopping_items);
        }
        ShoppingAction::List { all: false } => {
            let groups = service.grouped_by_category()?;
            emit(ctx.format, &groups, pretty::format_shopping_groups);
        }
        ShoppingAction::Add {
            name,
            quantity,
            unit,
            category,
        } => {
            let item = service.add_item(&name, quantity, &unit, &category)?;
            emit(ctx.format, &item, pretty::format_shopping_item);
        }
        ShoppingAction::Bought { id } => {
            emit(ctx.format, &service.mark_bought(id)?, pretty::format_shopping_item);
        }
        ShoppingAction::Unbought { id } => {
            emit(ctx.format, &service.unmark_bought(id)?, pretty::format_shopping_item);
        }
        ShoppingAction::Remove { id } => {
            service.remove_item(id)?;
            emit(ctx.format, &id, |id| format!("Ligne {id} supprimée"));
        }
        ShoppingAction::Clear => {
            let removed = service.clear_bought()?;
            emit(ctx.format, &removed, |removed| format!("{removed} ligne(s) retirée(s)"));
        }
        ShoppingAction::FromStock => {
            let items = service.generate_from_low_stock()?;
            emit(ctx.format, items.as_slice(), pretty::format_shopping_items);
        }
        ShoppingAction::FromRecipe { id, servings } => {
            let recipe = recipe_service(conn, ctx)?.get_recipe(id)?;
            let servings = servings.unwrap_or(recipe.servings);
            let items = service.add_recipe(&recipe, servings)?;
            emit(ctx.format, items.as_slice(), pretty::format_shopping_items);
        }
    }
    Ok(())
}

fn run_batch(conn: &Connection, ctx: &Context, action: BatchAction) -> CliResult<()> {
    let service = BatchService::new(
        SqliteBatchRepository::try_new(conn)?,
        SqliteRecipeRepository::try_new(conn)?,
        ShelfLife::from_config(&ctx.config),
    );
    match action {
        BatchAction::Create {
            name,
            date,
            recipes,
        } => {
            let session = service.create_session(&name, date, recipes)?;
            emit(ctx.format, &session, pretty::format_session);
        }
        BatchAction::List => {
            let sessions = service.list_sessions(None)?;
            emit(ctx.format, sessions.as_slice(), pretty::format_sessions);
        }
        BatchAction::Plan { session } => {
            let steps = service.plan_steps(session, &SequentialPlanner)?;
            emit(ctx.format, steps.as_slice(), pretty::format_steps);
        }
        BatchAction::AddStep {
            session,
            title,
            minutes,
            recipe,
            group,
        } => {
            let step = service.add_step(
                session,
                NewStep {
                    title,
                    duration_minutes: minutes,
                    recipe_id: recipe,
                    parallel_group: group,
                },
            )?;
            emit(ctx.format, &step, pretty::format_step);
        }
        BatchAction::Steps { session } => {
            let steps = service.list_steps(session)?;
            emit(ctx.format, steps.as_slice(), pretty::format_steps);
        }
        BatchAction::Start { session } => {
            let session = service.start_session(session, ctx.now_ms)?;
            emit(ctx.format, &session, pretty::format_session);
        }
        BatchAction::StepStart { step } => {
            emit(ctx.format, &service.start_step(step, ctx.now_ms)?, pretty::format_step);
        }
        BatchAction::StepDone { step } => {
            emit(ctx.format, &service.complete_step(step, ctx.now_ms)?, pretty::format_step);
        }
        BatchAction::StepSkip { step } => {
            emit(ctx.format, &service.skip_step(step, ctx.now_ms)?, pretty::format_step);
        }
        BatchAction::Finish { session } => {
            let session = service.finish_session(session, ctx.now_ms)?;
            emit(ctx.format, &session, pretty::format_session);
        }
        BatchAction::Cancel { session } => {
            let session = service.cancel_session(session, ctx.now_ms)?;
            emit(ctx.format, &session, pretty::format_session);
        }
        BatchAction::Progress { session } => {
            let progress = service.session_progress(session, ctx.now_ms)?;
            emit(ctx.format, &progress, pretty::format_progress);
        }
        BatchAction::Store {
            session,
            name,
            portions,
            storage,
            recipe,
        } => {
            let preparation = service.store_preparation(
                session,
                &name,
                portions,
                storage.into(),
                ctx.today,
                recipe,
            )?;
            emit(ctx.format, &preparation, pretty::format_preparation);
        }
        BatchAction::Preps { session, expiring } => {
            let preparations = match expiring {
                Some(days) => service.expiring_preparations(ctx.today, days)?,
                None => service.list_preparations(session)?,
            };
            emit(ctx.format, preparations.as_slice(), pretty::format_preparations);
        }
        BatchAction::Eat {
            preparation,
            portions,
        } => {
            let preparation = service.consume_portions(preparation, portions)?;
            emit(ctx.format, &preparation, pretty::format_preparation);
        }
    }
    Ok(())
}

fn run_lottery(conn: &Connection, ctx: &Context, action: LotteryAction) -> CliResult<()> {
    let service = LotteryService::new(SqliteJeuxRepository::try_new(conn)?, ctx.config.cache_ttl());
    match action {
        LotteryAction::AddDraw {
            date,
            numbers,
            stars,
            jackpot,
        } => {
            let mut draw = LotteryDraw::new(date, numbers, stars);
            draw.jackpot_cents = jackpot;
            let draw = service.add_draw(draw)?;
            emit(ctx.format, &draw, |draw| {
                format!("{} : {}", draw.draw_date, pretty::format_grid(&draw.numbers, &draw.stars))
            });
        }
        LotteryAction::Import { file } => {
            let inserted = service.import_draws_csv(&read_file(&file)?)?;
            emit(ctx.format, &inserted, |inserted| format!("{inserted} tirage(s) importé(s)"));
        }
        LotteryAction::Draws { limit } => {
            let draws = service.list_draws(Some(limit))?;
            emit(ctx.format, draws.as_slice(), |draws| {
                draws
                    .iter()
                    .map(|draw| {
                        let grid = pretty::format_grid(&draw.numbers, &draw.stars);
                        format!("{} : {grid}", draw.draw_date)
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            });
        }
        LotteryAction::Stats { top } => {
            let stats = service.stats()?;
            emit(ctx.format, &stats, |stats| pretty::format_lottery_stats(stats, top));
        }
        LotteryAction::Check {
            date,
            numbers,
            stars,
        } => {
            let check = service.check(&numbers, &stars, date)?;
            emit(ctx.format, &check, pretty::format_grid_check);
        }
        LotteryAction::Suggest { strategy } => {
            let grid = service.suggest(strategy.into())?;
            emit(ctx.format, &grid, |grid| pretty::format_grid(&grid.numbers, &grid.stars));
        }
        LotteryAction::Play {
            date,
            numbers,
            stars,
            stake,
        } => {
            let grid =
                service.save_grid(LotteryGrid::new(date, numbers, stars, stake, ctx.now_ms))?;
            emit(ctx.format, &grid, |grid| {
                format!(
                    "Grille {} pour le {} : {}",
                    grid.id,
                    grid.draw_date,
                    pretty::format_grid(&grid.numbers, &grid.stars)
                )
            });
        }
        LotteryAction::Performance => {
            let performance = service.grid_performance()?;
            emit(ctx.format, &performance, |performance| {
                format!(
                    "{} grille(s), {} vérifiée(s), {} gagnante(s), mise totale {}",
                    performance.grids_played,
                    performance.grids_checked,
                    performance.winning_grids,
                    pretty::euros(performance.total_staked_cents)
                )
            });
        }
    }
    Ok(())
}

fn run_bets(conn: &Connection, ctx: &Context, action: BetsAction) -> CliResult<()> {
    let service = BettingService::new(SqliteJeuxRepository::try_new(conn)?);
    match action {
        BetsAction::Add {
            event,
            market,
            selection,
            odds,
            stake,
            date,
        } => {
            let mut bet = Bet::new(date.unwrap_or(ctx.today), event, market, odds, stake);
            bet.selection = selection;
            let bet = service.place_bet(bet)?;
            emit(ctx.format, &bet, as_json);
        }
        BetsAction::List { market } => {
            let bets = service.list_bets(market.as_deref())?;
            emit(ctx.format, bets.as_slice(), as_json);
        }
        BetsAction::Settle { id, outcome } => {
            let bet = service.settle(id, outcome.into())?;
            emit(ctx.format, &bet, as_json);
        }
        BetsAction::Stats { market: Some(market) } => {
            let mut series = BTreeMap::new();
            series.insert(market.clone(), service.series_for_market(&market)?);
            emit(ctx.format, &series, pretty::format_series);
        }
        BetsAction::Stats { market: None } => {
            emit(ctx.format, &service.series_by_market()?, pretty::format_series);
        }
    }
    Ok(())
}

fn run_budget(conn: &Connection, ctx: &Context, action: BudgetAction) -> CliResult<()> {
    let service = BudgetService::new(
        SqliteFinanceRepository::try_new(conn)?,
        ctx.config.budget_warning_ratio,
    )?;
    let current_month = |year: Option<i32>, month: Option<u32>| {
        (
            year.unwrap_or_else(|| ctx.today.year()),
            month.unwrap_or_else(|| ctx.today.month()),
        )
    };
    match action {
        BudgetAction::Category { name, limit } => {
            emit(ctx.format, &service.set_category(&name, limit)?, as_json);
        }
        BudgetAction::Categories => {
            emit(ctx.format, service.list_categories()?.as_slice(), as_json);
        }
        BudgetAction::Expense {
            category,
            amount,
            label,
            date,
        } => {
            let expense =
                service.add_expense(&category, amount, date.unwrap_or(ctx.today), &label)?;
            emit(ctx.format, &expense, as_json);
        }
        BudgetAction::Expenses { year, month } => {
            let (year, month) = current_month(year, month);
            emit(ctx.format, service.list_expenses(year, month)?.as_slice(), as_json);
        }
        BudgetAction::DeleteExpense { id } => {
            service.delete_expense(id)?;
            emit(ctx.format, &id, |id| format!("Dépense {id} supprimée"));
        }
        BudgetAction::Summary { year, month } => {
            let (year, month) = current_month(year, month);
            emit(ctx.format, &service.monthly_summary(year, month)?, pretty::format_budget);
        }
    }
    Ok(())
}

fn run_family(conn: &Connection, ctx: &Context, action: FamilyAction) -> CliResult<()> {
    let service = FamilleService::new(SqliteFamilleRepository::try_new(conn)?);
    match action {
        FamilyAction::Add { name, birth, child } => {
            emit(ctx.format, &service.add_member(&name, birth, child)?, as_json);
        }
        FamilyAction::List => {
            emit(ctx.format, service.list_members()?.as_slice(), as_json);
        }
        FamilyAction::Vaccine {
            member,
            name,
            dose,
            given,
            next,
        } => {
            let mut vaccine = Vaccine::new(member, name, dose, given.unwrap_or(ctx.today));
            vaccine.next_due = next;
            emit(ctx.format, &service.record_vaccine(vaccine)?, as_json);
        }
        FamilyAction::Vaccines { member } => {
            emit(ctx.format, service.vaccines_for(member)?.as_slice(), as_json);
        }
        FamilyAction::VaccinesDue { days } => {
            let until = add_days(ctx.today, days);
            emit(ctx.format, service.vaccines_due(until)?.as_slice(), as_json);
        }
        FamilyAction::Growth {
            member,
            height,
            weight,
            date,
        } => {
            let measurement =
                GrowthMeasurement::new(member, date.unwrap_or(ctx.today), height, weight);
            emit(ctx.format, &service.record_growth(measurement)?, as_json);
        }
        FamilyAction::GrowthHistory { member } => {
            emit(ctx.format, service.growth_history(member)?.as_slice(), as_json);
        }
        FamilyAction::Event {
            title,
            start,
            end,
            participants,
            category,
        } => {
            let mut event = CalendarEvent::new(title, epoch_ms(start), end.map(epoch_ms));
            event.participants = participants;
            event.category = category;
            emit(ctx.format, &service.add_event(event)?, as_json);
        }
        FamilyAction::DeleteEvent { id } => {
            service.delete_event(id)?;
            emit(ctx.format, &id, |id| format!("Événement {id} supprimé"));
        }
        FamilyAction::Agenda {
            member: Some(member),
            ..
        } => {
            emit(ctx.format, service.events_for_member(member)?.as_slice(), as_json);
        }
        FamilyAction::Agenda {
            from, to, member: None,
        } => {
            let from = from.unwrap_or(ctx.today);
            let to = to.unwrap_or_else(|| add_days(from, 7));
            let events = service.agenda(day_start_ms(from), day_start_ms(add_days(to, 1)) - 1)?;
            emit(ctx.format, events.as_slice(), as_json);
        }
    }
    Ok(())
}

fn run_garden(conn: &Connection, ctx: &Context, action: GardenAction) -> CliResult<()> {
    let service = GardenService::new(SqliteGardenRepository::try_new(conn)?);
    match action {
        GardenAction::Add {
            name,
            surface,
            every,
            plants,
        } => {
            let mut zone = GardenZone::new(name, surface, every);
            zone.plants = plants;
            emit(ctx.format, &service.add_zone(zone)?, pretty::format_zone);
        }
        GardenAction::List => {
            let schedule = service.watering_schedule(ctx.today)?;
            emit(ctx.format, schedule.as_slice(), pretty::format_schedule);
        }
        GardenAction::Water { id } => {
            emit(ctx.format, &service.record_watering(id, ctx.today)?, pretty::format_zone);
        }
        GardenAction::Due => {
            emit(ctx.format, service.zones_due(ctx.today)?.as_slice(), pretty::format_zones);
        }
    }
    Ok(())
}

fn read_file(path: &Path) -> CliResult<String> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn add_days(day: NaiveDate, days: u32) -> NaiveDate {
    day.checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}

/// Agenda instants are naive wall-clock times read as UTC.
fn epoch_ms(at: NaiveDateTime) -> i64 {
    at.and_utc().timestamp_millis()
}

fn day_start_ms(day: NaiveDate) -> i64 {
    epoch_ms(day.and_time(chrono::NaiveTime::MIN))
}
