use chrono::NaiveDate;
use foyer_core::db::open_db_in_memory;
use foyer_core::model::famille::{CalendarEvent, GrowthMeasurement, Vaccine};
use foyer_core::model::garden::GardenZone;
use foyer_core::repo::famille_repo::SqliteFamilleRepository;
use foyer_core::repo::finance_repo::SqliteFinanceRepository;
use foyer_core::repo::garden_repo::SqliteGardenRepository;
use foyer_core::service::budget_service::{BudgetService, BudgetStatus};
use foyer_core::service::famille_service::FamilleService;
use foyer_core::service::garden_service::GardenService;
use foyer_core::AppError;

fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

#[test]
fn budget_warning_ratio_must_be_a_fraction() {
    let conn = open_db_in_memory().unwrap();
    for ratio in [0.0, 1.5, f64::NAN] {
        let result = BudgetService::new(SqliteFinanceRepository::try_new(&conn).unwrap(), ratio);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}

#[test]
fn monthly_summary_classifies_each_category() {
    let conn = open_db_in_memory().unwrap();
    let service =
        BudgetService::new(SqliteFinanceRepository::try_new(&conn).unwrap(), 0.8).unwrap();

    service.set_category("Courses", 40_000).unwrap();
    service.set_category("Loisirs", 10_000).unwrap();
    service.set_category("Santé", 5_000).unwrap();
    service
        .add_expense("courses", 33_000, day(2026, 4, 3), "hypermarché")
        .unwrap();
    service
        .add_expense("Loisirs", 12_000, day(2026, 4, 10), "concert")
        .unwrap();
    service
        .add_expense("Courses", 5_000, day(2026, 5, 1), "marché")
        .unwrap();

    let summary = service.monthly_summary(2026, 4).unwrap();
    let lines: Vec<_> = summary
        .categories
        .iter()
        .map(|line| (line.category.name.as_str(), line.spent_cents, line.status))
        .collect();
    assert_eq!(
        lines,
        vec![
            ("Courses", 33_000, BudgetStatus::Warning),
            ("Loisirs", 12_000, BudgetStatus::Over),
            ("Santé", 0, BudgetStatus::Ok),
        ]
    );
    assert_eq!(summary.categories[1].remaining_cents, -2_000);
    assert_eq!(summary.categories[1].ratio, 1.2);
    assert_eq!(summary.total_limit_cents, 55_000);
    assert_eq!(summary.total_spent_cents, 45_000);
    assert_eq!(summary.status, BudgetStatus::Warning);

    assert_eq!(service.list_expenses(2026, 5).unwrap().len(), 1);
    assert!(matches!(
        service.monthly_summary(2026, 13).unwrap_err(),
        AppError::Validation(_)
    ));
}

#[test]
fn categories_are_upserted_by_name_and_expenses_need_one() {
    let conn = open_db_in_memory().unwrap();
    let service =
        BudgetService::new(SqliteFinanceRepository::try_new(&conn).unwrap(), 0.8).unwrap();

    let first = service.set_category("Courses", 40_000).unwrap();
    let second = service.set_category(" courses ", 45_000).unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.name, "Courses");
    assert_eq!(second.monthly_limit_cents, 45_000);
    assert_eq!(service.list_categories().unwrap().len(), 1);

    assert!(matches!(
        service
            .add_expense("Vacances", 1_000, day(2026, 4, 1), "")
            .unwrap_err(),
        AppError::NotFound { .. }
    ));
    assert!(matches!(
        service
            .add_expense("Courses", 0, day(2026, 4, 1), "")
            .unwrap_err(),
        AppError::Validation(_)
    ));

    let expense = service
        .add_expense("Courses", 1_250, day(2026, 4, 1), " pain ")
        .unwrap();
    assert_eq!(expense.label, "pain");
    service.delete_expense(expense.id).unwrap();
    assert!(service.list_expenses(2026, 4).unwrap().is_empty());
    assert!(matches!(
        service.delete_expense(expense.id).unwrap_err(),
        AppError::NotFound { .. }
    ));
}

#[test]
fn child_health_record_tracks_vaccines_and_growth() {
    let conn = open_db_in_memory().unwrap();
    let service = FamilleService::new(SqliteFamilleRepository::try_new(&conn).unwrap());

    let lea = service
        .add_member(" Léa ", Some(day(2024, 3, 15)), true)
        .unwrap();
    service.add_member("Paul", None, false).unwrap();
    assert_eq!(lea.name, "Léa");
    assert_eq!(service.list_members().unwrap().len(), 2);
    assert_eq!(service.age_in_months(lea.id, day(2026, 3, 14)).unwrap(), Some(23));
    assert_eq!(service.age_in_months(lea.id, day(2026, 3, 15)).unwrap(), Some(24));

    let mut dtp = Vaccine::new(lea.id, "DTP", 1, day(2024, 5, 15));
    dtp.next_due = Some(day(2024, 7, 15));
    service.record_vaccine(dtp).unwrap();
    let mut ror = Vaccine::new(lea.id, "ROR", 1, day(2025, 3, 15));
    ror.next_due = Some(day(2026, 9, 15));
    service.record_vaccine(ror).unwrap();

    let mut backwards = Vaccine::new(lea.id, "Hépatite B", 1, day(2024, 5, 15));
    backwards.next_due = Some(day(2024, 4, 1));
    assert!(matches!(
        service.record_vaccine(backwards).unwrap_err(),
        AppError::Validation(_)
    ));
    assert!(matches!(
        service
            .record_vaccine(Vaccine::new(uuid::Uuid::new_v4(), "DTP", 1, day(2024, 5, 15)))
            .unwrap_err(),
        AppError::NotFound { .. }
    ));

    assert_eq!(service.vaccines_for(lea.id).unwrap().len(), 2);
    let due: Vec<_> = service
        .vaccines_due(day(2026, 1, 1))
        .unwrap()
        .into_iter()
        .map(|vaccine| vaccine.name)
        .collect();
    assert_eq!(due, vec!["DTP"]);

    service
        .record_growth(GrowthMeasurement::new(lea.id, day(2025, 3, 15), 75.0, 9.5))
        .unwrap();
    service
        .record_growth(GrowthMeasurement::new(lea.id, day(2024, 9, 15), 68.0, 8.0))
        .unwrap();
    assert!(matches!(
        service
            .record_growth(GrowthMeasurement::new(lea.id, day(2025, 9, 15), 0.0, 10.0))
            .unwrap_err(),
        AppError::Validation(_)
    ));

    let history = service.growth_history(lea.id).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].age_months, Some(6));
    assert_eq!(history[1].age_months, Some(12));
    assert_eq!(history[1].bmi, 16.9);
}

#[test]
fn agenda_returns_overlapping_events() {
    let conn = open_db_in_memory().unwrap();
    let service = FamilleService::new(SqliteFamilleRepository::try_new(&conn).unwrap());
    let lea = service.add_member("Léa", None, true).unwrap();

    let mut swim = CalendarEvent::new("Piscine", 1_000, Some(2_000));
    swim.participants = vec![lea.id];
    swim.category = " Sport ".to_string();
    let swim = service.add_event(swim).unwrap();
    assert_eq!(swim.category, "sport");
    let dentist = service
        .add_event(CalendarEvent::new("Dentiste", 5_000, None))
        .unwrap();

    let mut ghost = CalendarEvent::new("Anniversaire", 3_000, None);
    ghost.participants = vec![uuid::Uuid::new_v4()];
    assert!(matches!(
        service.add_event(ghost).unwrap_err(),
        AppError::NotFound { .. }
    ));
    assert!(matches!(
        service
            .add_event(CalendarEvent::new("Retour", 2_000, Some(1_000)))
            .unwrap_err(),
        AppError::Validation(_)
    ));

    let window: Vec<_> = service
        .agenda(1_500, 4_000)
        .unwrap()
        .into_iter()
        .map(|event| event.id)
        .collect();
    assert_eq!(window, vec![swim.id]);
    assert_eq!(service.agenda(0, 10_000).unwrap().len(), 2);
    assert_eq!(service.agenda(5_000, 5_000).unwrap()[0].id, dentist.id);
    assert!(matches!(
        service.agenda(4_000, 1_000).unwrap_err(),
        AppError::Validation(_)
    ));

    assert_eq!(service.events_for_member(lea.id).unwrap().len(), 1);
    service.delete_event(swim.id).unwrap();
    assert!(service.events_for_member(lea.id).unwrap().is_empty());
    assert!(matches!(
        service.delete_event(swim.id).unwrap_err(),
        AppError::NotFound { .. }
    ));
}

#[test]
fn watering_schedule_puts_due_zones_first() {
    let conn = open_db_in_memory().unwrap();
    let service = GardenService::new(SqliteGardenRepository::try_new(&conn).unwrap());

    let mut potager = GardenZone::new(" Potager ", 12.0, 2);
    potager.plants = vec!["Tomate".to_string(), "tomate".to_string(), "Basilic".to_string()];
    let potager = service.add_zone(potager).unwrap();
    assert_eq!(potager.name, "Potager");
    assert_eq!(potager.plants, vec!["basilic".to_string(), "tomate".to_string()]);
    let pelouse = service.add_zone(GardenZone::new("Pelouse", 80.0, 7)).unwrap();
    let serre = service.add_zone(GardenZone::new("Serre", 6.0, 1)).unwrap();
    assert!(matches!(
        service
            .add_zone(GardenZone::new("Haie", 10.0, 0))
            .unwrap_err(),
        AppError::Validation(_)
    ));

    service.record_watering(potager.id, day(2026, 5, 1)).unwrap();
    let watered = service.record_watering(pelouse.id, day(2026, 5, 1)).unwrap();
    assert_eq!(watered.last_watered_on, Some(day(2026, 5, 1)));

    let today = day(2026, 5, 3);
    let schedule = service.watering_schedule(today).unwrap();
    let order: Vec<_> = schedule
        .iter()
        .map(|status| (status.zone.name.as_str(), status.due, status.days_until_watering))
        .collect();
    assert_eq!(
        order,
        vec![("Potager", true, 0), ("Serre", true, 0), ("Pelouse", false, 5)]
    );

    let due: Vec<_> = service
        .zones_due(today)
        .unwrap()
        .into_iter()
        .map(|zone| zone.id)
        .collect();
    assert_eq!(due, vec![potager.id, serre.id]);

    assert!(matches!(
        service
            .record_watering(uuid::Uuid::new_v4(), today)
            .unwrap_err(),
        AppError::NotFound { .. }
    ));
}
