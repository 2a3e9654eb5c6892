use chrono::NaiveDate;
use foyer_core::db::open_db_in_memory;
use foyer_core::model::jeux::{Bet, BetOutcome, LotteryDraw, LotteryGrid};
use foyer_core::repo::jeux_repo::SqliteJeuxRepository;
use foyer_core::service::betting_service::{BettingService, ALL_MARKETS};
use foyer_core::service::lottery_service::{LotteryService, SuggestStrategy};
use foyer_core::AppError;
use std::time::Duration;

fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn draw(date: NaiveDate, numbers: [u8; 5], stars: [u8; 2]) -> LotteryDraw {
    LotteryDraw::new(date, numbers.to_vec(), stars.to_vec())
}

fn seed_draws(service: &LotteryService<SqliteJeuxRepository<'_>>) {
    service
        .add_draw(draw(day(2026, 1, 9), [9, 8, 7, 6, 1], [4, 1]))
        .unwrap();
    service
        .add_draw(draw(day(2026, 1, 2), [1, 2, 3, 4, 5], [1, 2]))
        .unwrap();
    service
        .add_draw(draw(day(2026, 1, 6), [1, 2, 3, 10, 20], [1, 3]))
        .unwrap();
}

#[test]
fn empty_history_uses_fallback_dataset() {
    let conn = open_db_in_memory().unwrap();
    let service = LotteryService::new(
        SqliteJeuxRepository::try_new(&conn).unwrap(),
        Duration::from_secs(600),
    );

    let stats = service.stats().unwrap();
    assert!(stats.from_fallback);
    assert_eq!(stats.draws_analyzed, 12);
    assert_eq!(stats.numbers.len(), 50);
    assert_eq!(stats.stars.len(), 12);
    assert!(service.latest_draw().unwrap().is_none());
}

#[test]
fn stats_follow_chronological_order_and_cache_is_invalidated() {
    let conn = open_db_in_memory().unwrap();
    let service = LotteryService::new(
        SqliteJeuxRepository::try_new(&conn).unwrap(),
        Duration::from_secs(600),
    );
    service
        .add_draw(draw(day(2026, 1, 9), [9, 8, 7, 6, 1], [4, 1]))
        .unwrap();
    assert_eq!(service.stats().unwrap().draws_analyzed, 1);

    service
        .add_draw(draw(day(2026, 1, 2), [1, 2, 3, 4, 5], [1, 2]))
        .unwrap();
    service
        .add_draw(draw(day(2026, 1, 6), [1, 2, 3, 10, 20], [1, 3]))
        .unwrap();
    let stats = service.stats().unwrap();
    assert!(!stats.from_fallback);
    assert_eq!(stats.draws_analyzed, 3);

    let one = &stats.numbers[0];
    assert_eq!(one.frequency, 3);
    assert_eq!(one.last_seen_draws_ago, Some(0));
    assert_eq!(one.max_gap, 0);

    let four = &stats.numbers[3];
    assert_eq!(four.frequency, 1);
    assert_eq!(four.last_seen_draws_ago, Some(2));
    assert_eq!(four.max_gap, 2);
    assert_eq!(four.average_gap, 3.0);

    let fifty = &stats.numbers[49];
    assert_eq!(fifty.frequency, 0);
    assert_eq!(fifty.last_seen_draws_ago, None);
    assert_eq!(fifty.max_gap, 3);
    assert_eq!(fifty.streak_score, 0.0);

    assert_eq!(stats.hot_numbers(3), vec![1, 2, 3]);
    assert_eq!(stats.cold_numbers(2), vec![11, 12]);
    assert_eq!(stats.hot_stars(1), vec![1]);

    let latest = service.latest_draw().unwrap().unwrap();
    assert_eq!(latest.draw_date, day(2026, 1, 9));
    assert_eq!(latest.numbers, vec![1, 6, 7, 8, 9]);
}

#[test]
fn duplicate_draw_date_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = LotteryService::new(
        SqliteJeuxRepository::try_new(&conn).unwrap(),
        Duration::from_secs(60),
    );
    seed_draws(&service);

    let err = service
        .add_draw(draw(day(2026, 1, 2), [11, 12, 13, 14, 15], [5, 6]))
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = service
        .add_draw(draw(day(2026, 1, 13), [1, 1, 2, 3, 4], [5, 6]))
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[test]
fn grid_check_reports_prize_rank() {
    let conn = open_db_in_memory().unwrap();
    let service = LotteryService::new(
        SqliteJeuxRepository::try_new(&conn).unwrap(),
        Duration::from_secs(60),
    );
    seed_draws(&service);

    let check = service
        .check(&[1, 2, 3, 4, 30], &[1, 2], day(2026, 1, 2))
        .unwrap();
    assert_eq!(check.matched_numbers, vec![1, 2, 3, 4]);
    assert_eq!(check.matched_stars, vec![1, 2]);
    assert_eq!(check.prize_rank, Some(4));

    let check = service
        .check(&[1, 2, 3, 4, 30], &[1, 2], day(2026, 1, 6))
        .unwrap();
    assert_eq!(check.prize_rank, Some(9));

    let check = service
        .check(&[40, 41, 42, 43, 44], &[11, 12], day(2026, 1, 6))
        .unwrap();
    assert_eq!(check.prize_rank, None);

    let err = service
        .check(&[1, 2, 3, 4, 5], &[1, 2], day(2026, 1, 3))
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
}

#[test]
fn grid_check_rejects_malformed_grids() {
    let conn = open_db_in_memory().unwrap();
    let service = LotteryService::new(
        SqliteJeuxRepository::try_new(&conn).unwrap(),
        Duration::from_secs(60),
    );
    seed_draws(&service);

    let too_many: Vec<u8> = (1..=10).collect();
    match service.check(&too_many, &[1, 2], day(2026, 1, 2)) {
        Err(AppError::Validation(err)) => assert_eq!(err.field, "lottery_grid.numbers"),
        other => panic!("expected validation error, got {other:?}"),
    }
    match service.check(&[1, 2, 3, 4, 5], &[1, 99], day(2026, 1, 2)) {
        Err(AppError::Validation(err)) => assert_eq!(err.field, "lottery_grid.stars"),
        other => panic!("expected validation error, got {other:?}"),
    }

    for (numbers, stars) in [
        (vec![1, 2, 3, 4, 5], vec![1, 2, 3]),
        (vec![1, 1, 2, 3, 4], vec![1, 2]),
        (vec![0, 1, 2, 3, 4], vec![1, 2]),
    ] {
        let err = service.check(&numbers, &stars, day(2026, 1, 2)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    // Validation comes before the draw lookup.
    let err = service.check(&too_many, &[1, 2], day(2026, 1, 3)).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[test]
fn suggestions_are_valid_grids() {
    let conn = open_db_in_memory().unwrap();
    let service = LotteryService::new(
        SqliteJeuxRepository::try_new(&conn).unwrap(),
        Duration::from_secs(60),
    );
    seed_draws(&service);

    let hot = service.suggest(SuggestStrategy::Hot).unwrap();
    assert_eq!(hot.numbers, vec![1, 2, 3, 4, 5]);
    assert_eq!(hot.stars, vec![1, 2]);

    for strategy in [
        SuggestStrategy::Hot,
        SuggestStrategy::Overdue,
        SuggestStrategy::Balanced,
    ] {
        let grid = service.suggest(strategy).unwrap();
        LotteryDraw::new(day(2030, 1, 1), grid.numbers.clone(), grid.stars.clone())
            .validate()
            .unwrap();
    }
}

#[test]
fn csv_import_skips_known_dates_and_rejects_bad_lines() {
    let conn = open_db_in_memory().unwrap();
    let service = LotteryService::new(
        SqliteJeuxRepository::try_new(&conn).unwrap(),
        Duration::from_secs(600),
    );
    service
        .add_draw(draw(day(2026, 1, 2), [1, 2, 3, 4, 5], [1, 2]))
        .unwrap();
    assert_eq!(service.stats().unwrap().draws_analyzed, 1);

    let csv = "date,n1,n2,n3,n4,n5,s1,s2\n\
               2026-01-02,1,2,3,4,5,1,2\n\
               2026-01-06,1,2,3,10,20,1,3\n\
               \n\
               2026-01-09,9,8,7,6,1,4,1\n";
    assert_eq!(service.import_draws_csv(csv).unwrap(), 2);
    assert_eq!(service.list_draws(None).unwrap().len(), 3);
    assert_eq!(service.stats().unwrap().draws_analyzed, 3);

    let duplicated = "date,n1,n2,n3,n4,n5,s1,s2\n\
                      2026-02-03,1,2,3,4,5,1,2\n\
                      2026-02-03,6,7,8,9,10,3,4\n";
    let err = service.import_draws_csv(duplicated).unwrap_err();
    assert!(matches!(err, AppError::Import { line: 3, .. }));

    let out_of_range = "date,n1,n2,n3,n4,n5,s1,s2\n\
                        2026-02-06,1,2,3,4,5,1,2\n\
                        2026-02-10,1,2,3,4,51,1,2\n";
    let err = service.import_draws_csv(out_of_range).unwrap_err();
    assert!(matches!(err, AppError::Import { line: 3, .. }));
    assert_eq!(service.list_draws(None).unwrap().len(), 3);
}

#[test]
fn grid_performance_counts_only_known_draws() {
    let conn = open_db_in_memory().unwrap();
    let service = LotteryService::new(
        SqliteJeuxRepository::try_new(&conn).unwrap(),
        Duration::from_secs(60),
    );
    seed_draws(&service);

    let winning = LotteryGrid::new(day(2026, 1, 2), vec![30, 4, 3, 2, 1], vec![2, 1], 250, 1);
    assert_eq!(winning.numbers, vec![1, 2, 3, 4, 30]);
    service.save_grid(winning).unwrap();
    service
        .save_grid(LotteryGrid::new(
            day(2026, 1, 6),
            vec![40, 41, 42, 43, 44],
            vec![11, 12],
            250,
            2,
        ))
        .unwrap();
    service
        .save_grid(LotteryGrid::new(
            day(2026, 1, 13),
            vec![1, 2, 3, 4, 5],
            vec![1, 2],
            250,
            3,
        ))
        .unwrap();

    let err = service
        .save_grid(LotteryGrid::new(day(2026, 1, 13), vec![1, 2, 3, 4, 5], vec![1, 2], 0, 4))
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let performance = service.grid_performance().unwrap();
    assert_eq!(performance.grids_played, 3);
    assert_eq!(performance.grids_checked, 2);
    assert_eq!(performance.total_staked_cents, 750);
    assert_eq!(performance.winning_grids, 1);
    assert_eq!(performance.ranks.get(&4), Some(&1));
    assert_eq!(service.grids_for_date(day(2026, 1, 13)).unwrap().len(), 1);
}

#[test]
fn bets_series_are_grouped_by_market() {
    let conn = open_db_in_memory().unwrap();
    let service = BettingService::new(SqliteJeuxRepository::try_new(&conn).unwrap());

    let results = [
        (1, "Ligue1", 2.0, BetOutcome::Won),
        (2, "ligue1", 2.5, BetOutcome::Lost),
        (3, " LIGUE1 ", 1.5, BetOutcome::Won),
        (4, "tennis", 3.0, BetOutcome::Won),
        (5, "ligue1", 2.0, BetOutcome::Void),
    ];
    for (day_of_month, market, odds, outcome) in results {
        let bet = service
            .place_bet(Bet::new(day(2026, 3, day_of_month), "match", market, odds, 1_000))
            .unwrap();
        assert_eq!(bet.outcome, BetOutcome::Pending);
        service.settle(bet.id, outcome).unwrap();
    }
    service
        .place_bet(Bet::new(day(2026, 3, 6), "finale", "tennis", 1.8, 500))
        .unwrap();

    let series = service.series_by_market().unwrap();
    assert_eq!(series.len(), 3);

    let ligue1 = &series["ligue1"];
    assert_eq!(ligue1.total, 4);
    assert_eq!(ligue1.won, 2);
    assert_eq!(ligue1.lost, 1);
    assert_eq!(ligue1.void, 1);
    assert_eq!(ligue1.current_streak, 1);
    assert_eq!(ligue1.profit_cents, 1_000 - 1_000 + 500);

    let tennis = &series["tennis"];
    assert_eq!(tennis.pending, 1);
    assert_eq!(tennis.won, 1);
    assert_eq!(tennis.staked_cents, 1_500);

    let all = &series[ALL_MARKETS];
    assert_eq!(all.total, 6);
    assert_eq!(all.longest_win_streak, 2);
    assert_eq!(all.current_streak, 2);

    assert_eq!(service.series_for_market("LIGUE1").unwrap(), *ligue1);
    assert_eq!(service.list_bets(Some("Tennis")).unwrap().len(), 2);
}

#[test]
fn settled_bet_cannot_be_settled_again() {
    let conn = open_db_in_memory().unwrap();
    let service = BettingService::new(SqliteJeuxRepository::try_new(&conn).unwrap());

    let bet = service
        .place_bet(Bet::new(day(2026, 3, 1), "match", "ligue1", 2.0, 1_000))
        .unwrap();
    assert!(matches!(
        service.settle(bet.id, BetOutcome::Pending).unwrap_err(),
        AppError::Validation(_)
    ));
    let settled = service.settle(bet.id, BetOutcome::Won).unwrap();
    assert_eq!(settled.outcome, BetOutcome::Won);
    assert!(matches!(
        service.settle(bet.id, BetOutcome::Lost).unwrap_err(),
        AppError::Validation(_)
    ));
    assert!(matches!(
        service.settle(uuid::Uuid::new_v4(), BetOutcome::Won).unwrap_err(),
        AppError::NotFound { .. }
    ));

    let err = service
        .place_bet(Bet::new(day(2026, 3, 1), "match", "ligue1", 1.0, 1_000))
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}
