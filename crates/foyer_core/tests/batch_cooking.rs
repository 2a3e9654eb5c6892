use chrono::NaiveDate;
use foyer_core::db::open_db_in_memory;
use foyer_core::model::batch::{SessionStatus, StepStatus, StorageKind};
use foyer_core::model::recipe::{Recipe, RecipeId};
use foyer_core::repo::batch_repo::SqliteBatchRepository;
use foyer_core::repo::recipe_repo::{RecipeRepository, SqliteRecipeRepository};
use foyer_core::service::batch_service::{BatchService, NewStep, ShelfLife};
use foyer_core::service::planner::{
    FallbackPlanner, LlmClient, LlmError, LlmStepPlanner, SequentialPlanner, PASSIVE_GROUP,
};
use foyer_core::AppError;
use rusqlite::Connection;

const T0: i64 = 1_767_261_600_000;
const MINUTE: i64 = 60_000;

fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn seed_recipes(conn: &Connection) -> (RecipeId, RecipeId) {
    let repo = SqliteRecipeRepository::try_new(conn).unwrap();
    let bolognaise = repo
        .create_recipe(&Recipe::new("Bolognaise", 8).with_times(20, 90))
        .unwrap();
    let quiche = repo
        .create_recipe(&Recipe::new("Quiche", 6).with_times(15, 40))
        .unwrap();
    (bolognaise, quiche)
}

fn service(
    conn: &Connection,
) -> BatchService<SqliteBatchRepository<'_>, SqliteRecipeRepository<'_>> {
    BatchService::new(
        SqliteBatchRepository::try_new(conn).unwrap(),
        SqliteRecipeRepository::try_new(conn).unwrap(),
        ShelfLife::default(),
    )
}

struct ScriptedClient(Result<String, LlmError>);

impl LlmClient for ScriptedClient {
    fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
        self.0.clone()
    }
}

#[test]
fn session_requires_existing_distinct_recipes() {
    let conn = open_db_in_memory().unwrap();
    let (bolognaise, _) = seed_recipes(&conn);
    let service = service(&conn);

    let err = service
        .create_session("Dimanche", day(2026, 1, 4), vec![bolognaise, bolognaise])
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = service
        .create_session("Dimanche", day(2026, 1, 4), vec![uuid::Uuid::new_v4()])
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound { entity: "recipe", .. }));

    let err = service
        .create_session("Dimanche", day(2026, 1, 4), Vec::new())
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[test]
fn sequential_plan_overlaps_cooking_steps() {
    let conn = open_db_in_memory().unwrap();
    let (bolognaise, quiche) = seed_recipes(&conn);
    let service = service(&conn);
    let session = service
        .create_session("Dimanche", day(2026, 1, 4), vec![quiche, bolognaise])
        .unwrap();

    let steps = service.plan_steps(session.id, &SequentialPlanner).unwrap();
    let titles: Vec<_> = steps.iter().map(|step| step.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Préparer : Bolognaise",
            "Cuisson : Bolognaise",
            "Préparer : Quiche",
            "Cuisson : Quiche",
            "Portionner et ranger",
        ]
    );
    let positions: Vec<_> = steps.iter().map(|step| step.position).collect();
    assert_eq!(positions, vec![1, 2, 3, 4, 5]);
    assert_eq!(steps[1].parallel_group, Some(PASSIVE_GROUP));
    assert_eq!(steps[1].recipe_id, Some(bolognaise));

    let progress = service.session_progress(session.id, T0).unwrap();
    assert_eq!(progress.total_steps, 5);
    assert_eq!(progress.closed_steps, 0);
    assert_eq!(progress.remaining_minutes, 20 + 15 + 15 + 90);

    let replanned = service.plan_steps(session.id, &SequentialPlanner).unwrap();
    assert_eq!(replanned.len(), 5);
    assert_eq!(service.list_steps(session.id).unwrap().len(), 5);
}

#[test]
fn running_session_tracks_progress_and_finish_skips_open_steps() {
    let conn = open_db_in_memory().unwrap();
    let (bolognaise, quiche) = seed_recipes(&conn);
    let service = service(&conn);
    let session = service
        .create_session("Dimanche", day(2026, 1, 4), vec![bolognaise, quiche])
        .unwrap();
    let steps = service.plan_steps(session.id, &SequentialPlanner).unwrap();

    let err = service.start_step(steps[0].id, T0).unwrap_err();
    assert!(matches!(err, AppError::InvalidState { action: "start_step", .. }));

    let started = service.start_session(session.id, T0).unwrap();
    assert_eq!(started.status, SessionStatus::InProgress);
    assert!(matches!(
        service.plan_steps(session.id, &SequentialPlanner).unwrap_err(),
        AppError::InvalidState { .. }
    ));

    service.start_step(steps[0].id, T0).unwrap();
    let done = service.complete_step(steps[0].id, T0 + 20 * MINUTE).unwrap();
    assert_eq!(done.status, StepStatus::Done);
    assert_eq!(
        service
            .step_elapsed_minutes(steps[0].id, T0 + 60 * MINUTE)
            .unwrap(),
        Some(20)
    );

    service.start_step(steps[1].id, T0 + 20 * MINUTE).unwrap();
    let progress = service
        .session_progress(session.id, T0 + 30 * MINUTE)
        .unwrap();
    assert_eq!(progress.closed_steps, 1);
    assert_eq!(progress.ratio, 0.2);
    assert_eq!(progress.remaining_minutes, 15 + 15 + 80);

    let extra = service
        .add_step(
            session.id,
            NewStep {
                title: "Laver la vaisselle".to_string(),
                duration_minutes: 10,
                ..NewStep::default()
            },
        )
        .unwrap();
    assert_eq!(extra.position, 6);

    let finished = service
        .finish_session(session.id, T0 + 3 * 60 * MINUTE)
        .unwrap();
    assert_eq!(finished.status, SessionStatus::Done);
    let steps = service.list_steps(session.id).unwrap();
    assert_eq!(steps[0].status, StepStatus::Done);
    assert!(steps[1..]
        .iter()
        .all(|step| step.status == StepStatus::Skipped));

    assert!(matches!(
        service.cancel_session(session.id, T0).unwrap_err(),
        AppError::InvalidState { .. }
    ));
}

#[test]
fn preparations_expire_by_storage_and_track_portions() {
    let conn = open_db_in_memory().unwrap();
    let (bolognaise, quiche) = seed_recipes(&conn);
    let service = service(&conn);
    let session = service
        .create_session("Dimanche", day(2026, 1, 4), vec![bolognaise])
        .unwrap();

    let err = service
        .store_preparation(
            session.id,
            "Sauce",
            4,
            StorageKind::Freezer,
            day(2026, 1, 4),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState { .. }));

    service.start_session(session.id, T0).unwrap();
    let err = service
        .store_preparation(
            session.id,
            "Quiche",
            6,
            StorageKind::Fridge,
            day(2026, 1, 4),
            Some(quiche),
        )
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let frozen = service
        .store_preparation(
            session.id,
            "Sauce bolognaise",
            6,
            StorageKind::Freezer,
            day(2026, 1, 4),
            Some(bolognaise),
        )
        .unwrap();
    assert_eq!(frozen.expires_on, day(2026, 4, 4));
    let fridge = service
        .store_preparation(
            session.id,
            "Pâtes cuites",
            2,
            StorageKind::Fridge,
            day(2026, 1, 4),
            None,
        )
        .unwrap();
    assert_eq!(fridge.expires_on, day(2026, 1, 7));

    let after = service.consume_portions(frozen.id, 4).unwrap();
    assert_eq!(after.remaining_portions, 2);
    assert!(matches!(
        service.consume_portions(frozen.id, 3).unwrap_err(),
        AppError::Validation(_)
    ));

    let soon = service.expiring_preparations(day(2026, 1, 5), 3).unwrap();
    assert_eq!(soon.len(), 1);
    assert_eq!(soon[0].id, fridge.id);

    service.consume_portions(fridge.id, 2).unwrap();
    assert!(service
        .expiring_preparations(day(2026, 1, 5), 3)
        .unwrap()
        .is_empty());
    assert_eq!(service.list_preparations(Some(session.id)).unwrap().len(), 2);
}

#[test]
fn llm_plan_is_used_when_answer_is_valid() {
    let conn = open_db_in_memory().unwrap();
    let (bolognaise, quiche) = seed_recipes(&conn);
    let service = service(&conn);
    let session = service
        .create_session("Dimanche", day(2026, 1, 4), vec![bolognaise, quiche])
        .unwrap();

    let answer = "Voici le plan :\n```json\n[\
        {\"title\": \"Lancer la sauce\", \"recipe\": \"bolognaise\", \"duration_minutes\": 90, \
         \"parallel_group\": 1},\
        {\"title\": \"Pâte à quiche\", \"recipe\": \"Quiche\", \"duration_minutes\": 20}\
    ]\n```";
    let planner =
        FallbackPlanner::new(LlmStepPlanner::new(ScriptedClient(Ok(answer.to_string()))));
    let steps = service.plan_steps(session.id, &planner).unwrap();

    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].recipe_id, Some(bolognaise));
    assert_eq!(steps[0].parallel_group, Some(1));
    assert_eq!(steps[1].recipe_id, Some(quiche));
    assert_eq!(steps[1].parallel_group, None);
}

#[test]
fn unavailable_llm_falls_back_to_sequential_plan() {
    let conn = open_db_in_memory().unwrap();
    let (bolognaise, quiche) = seed_recipes(&conn);
    let service = service(&conn);
    let session = service
        .create_session("Dimanche", day(2026, 1, 4), vec![bolognaise, quiche])
        .unwrap();

    let down = ScriptedClient(Err(LlmError::Unavailable("timeout".to_string())));
    let steps = service
        .plan_steps(session.id, &FallbackPlanner::new(LlmStepPlanner::new(down)))
        .unwrap();
    assert_eq!(steps.len(), 5);

    let garbage = ScriptedClient(Ok("je ne sais pas".to_string()));
    let steps = service
        .plan_steps(session.id, &FallbackPlanner::new(LlmStepPlanner::new(garbage)))
        .unwrap();
    assert_eq!(steps.last().unwrap().title, "Portionner et ranger");

    let limited = ScriptedClient(Err(LlmError::RateLimited {
        retry_after_secs: 30,
    }));
    let err = service
        .plan_steps(session.id, &FallbackPlanner::new(LlmStepPlanner::new(limited)))
        .unwrap_err();
    assert!(matches!(err, AppError::RateLimit { retry_after_secs: 30 }));
}
