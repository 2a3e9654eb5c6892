use chrono::NaiveDate;
use foyer_core::db::open_db_in_memory;
use foyer_core::model::inventory::Article;
use foyer_core::model::recipe::Recipe;
use foyer_core::model::shopping::ItemSource;
use foyer_core::repo::inventory_repo::{InventoryQuery, SqliteInventoryRepository};
use foyer_core::repo::shopping_repo::SqliteShoppingRepository;
use foyer_core::service::inventory_service::InventoryService;
use foyer_core::service::shopping_service::{ShoppingService, UNCATEGORIZED};
use foyer_core::{AppError, ValidationErrorKind};

fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn article(name: &str, quantity: f64, unit: &str) -> Article {
    Article::new(name, quantity, unit)
}

#[test]
fn same_product_arrivals_are_merged() {
    let conn = open_db_in_memory().unwrap();
    let service = InventoryService::new(SqliteInventoryRepository::try_new(&conn).unwrap());

    let mut first = article("Lait", 2.0, "l");
    first.expiry_date = Some(day(2026, 5, 20));
    let first = service.add_article(first).unwrap();
    assert!(!first.merged);

    let mut second = article("lait", 1.0, "L");
    second.expiry_date = Some(day(2026, 5, 10));
    second.location = "frigo".to_string();
    let second = service.add_article(second).unwrap();

    assert!(second.merged);
    assert_eq!(second.article.id, first.article.id);
    assert_eq!(second.article.quantity, 3.0);
    assert_eq!(second.article.expiry_date, Some(day(2026, 5, 10)));
    assert_eq!(second.article.location, "frigo");
    assert_eq!(
        service.list_articles(&InventoryQuery::default()).unwrap().len(),
        1
    );
}

#[test]
fn consume_cannot_exceed_stock() {
    let conn = open_db_in_memory().unwrap();
    let service = InventoryService::new(SqliteInventoryRepository::try_new(&conn).unwrap());

    let entry = service.add_article(article("Riz", 1.0, "kg")).unwrap();
    let after = service.consume(entry.article.id, 0.25).unwrap();
    assert_eq!(after.quantity, 0.75);

    let err = service.consume(entry.article.id, 5.0).unwrap_err();
    match err {
        AppError::Validation(err) => {
            assert!(matches!(err.kind, ValidationErrorKind::OutOfRange { .. }))
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(service.get_article(entry.article.id).unwrap().quantity, 0.75);

    let restocked = service.restock(entry.article.id, 2.0).unwrap();
    assert_eq!(restocked.quantity, 2.75);
}

#[test]
fn expiry_windows_split_expired_and_expiring() {
    let conn = open_db_in_memory().unwrap();
    let service = InventoryService::new(SqliteInventoryRepository::try_new(&conn).unwrap());
    let today = day(2026, 5, 1);

    for (name, expiry) in [
        ("yaourt", Some(day(2026, 4, 28))),
        ("jambon", Some(day(2026, 5, 1))),
        ("beurre", Some(day(2026, 5, 3))),
        ("fromage", Some(day(2026, 5, 20))),
        ("pâtes", None),
    ] {
        let mut item = article(name, 1.0, "");
        item.expiry_date = expiry;
        service.add_article(item).unwrap();
    }

    let expiring: Vec<_> = service
        .expiring(today, 3)
        .unwrap()
        .into_iter()
        .map(|article| article.name)
        .collect();
    assert_eq!(expiring, vec!["jambon", "beurre"]);

    let expired: Vec<_> = service
        .expired(today)
        .unwrap()
        .into_iter()
        .map(|article| article.name)
        .collect();
    assert_eq!(expired, vec!["yaourt"]);
}

#[test]
fn barcode_lookup_validates_checksum() {
    let conn = open_db_in_memory().unwrap();
    let service = InventoryService::new(SqliteInventoryRepository::try_new(&conn).unwrap());

    let mut coffee = article("Café", 1.0, "paquet");
    coffee.barcode = Some("4006381333931".to_string());
    service.add_article(coffee).unwrap();

    assert_eq!(service.scan_barcode(" 4006381333931 ").unwrap().name, "Café");
    assert!(matches!(
        service.scan_barcode("4006381333932").unwrap_err(),
        AppError::Validation(_)
    ));
    assert!(matches!(
        service.scan_barcode("036000291452").unwrap_err(),
        AppError::NotFound { .. }
    ));
}

#[test]
fn barcode_belongs_to_a_single_product() {
    let conn = open_db_in_memory().unwrap();
    let service = InventoryService::new(SqliteInventoryRepository::try_new(&conn).unwrap());

    let mut coffee = article("Café", 1.0, "paquet");
    coffee.barcode = Some("4006381333931".to_string());
    service.add_article(coffee.clone()).unwrap();

    let again = service.add_article(coffee).unwrap();
    assert!(again.merged);
    assert_eq!(again.article.quantity, 2.0);

    let mut tea = article("Thé", 1.0, "boîte");
    tea.barcode = Some("4006381333931".to_string());
    let err = service.add_article(tea).unwrap_err();
    match &err {
        AppError::Validation(err) => {
            assert_eq!(err.field, "article.barcode");
            assert_eq!(
                err.kind,
                ValidationErrorKind::Duplicate("4006381333931".to_string())
            );
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    let csv = "name,category,quantity,unit,min_quantity,location,expiry_date,barcode\n\
               riz,,1,kg,,,,\n\
               thé,,1,boîte,,,,4006381333931\n";
    let err = service.import_csv(csv).unwrap_err();
    assert!(matches!(err, AppError::Import { line: 3, .. }));
    let names: Vec<String> = service
        .list_articles(&InventoryQuery::default())
        .unwrap()
        .into_iter()
        .map(|article| article.name)
        .collect();
    assert_eq!(names, vec!["Café"]);
}

#[test]
fn csv_export_then_import_merges_into_existing_stock() {
    let source_conn = open_db_in_memory().unwrap();
    let source = InventoryService::new(SqliteInventoryRepository::try_new(&source_conn).unwrap());
    let mut flour = article("Farine, T55", 1.5, "kg");
    flour.category = "épicerie".to_string();
    flour.expiry_date = Some(day(2026, 12, 31));
    source.add_article(flour).unwrap();
    source.add_article(article("Oeufs", 6.0, "")).unwrap();
    let csv = source.export_csv().unwrap();
    assert!(csv.starts_with(
        "name,category,quantity,unit,min_quantity,location,expiry_date,barcode"
    ));
    assert!(csv.contains("\"Farine, T55\""));

    let target_conn = open_db_in_memory().unwrap();
    let target = InventoryService::new(SqliteInventoryRepository::try_new(&target_conn).unwrap());
    target.add_article(article("oeufs", 2.0, "")).unwrap();
    let counts = target.import_csv(&csv).unwrap();

    assert_eq!(counts.inserted, 1);
    assert_eq!(counts.merged, 1);
    let articles = target.list_articles(&InventoryQuery::default()).unwrap();
    let flour = articles.iter().find(|a| a.name == "Farine, T55").unwrap();
    assert_eq!(flour.quantity, 1.5);
    assert_eq!(flour.expiry_date, Some(day(2026, 12, 31)));
    let eggs = articles.iter().find(|a| a.name == "oeufs").unwrap();
    assert_eq!(eggs.quantity, 8.0);
}

#[test]
fn invalid_csv_line_aborts_import() {
    let conn = open_db_in_memory().unwrap();
    let service = InventoryService::new(SqliteInventoryRepository::try_new(&conn).unwrap());

    let csv = "name,category,quantity,unit,min_quantity,location,expiry_date,barcode\n\
               riz,,1,kg,,,,\n\
               sucre,,beaucoup,kg,,,,\n";
    let err = service.import_csv(csv).unwrap_err();
    assert!(matches!(err, AppError::Import { line: 3, .. }));
    assert!(service
        .list_articles(&InventoryQuery::default())
        .unwrap()
        .is_empty());

    let err = service.import_csv("nom,quantite\nriz,1\n").unwrap_err();
    assert!(matches!(err, AppError::Import { line: 1, .. }));
}

#[test]
fn low_stock_generates_refill_lines_once() {
    let conn = open_db_in_memory().unwrap();
    let inventory = InventoryService::new(SqliteInventoryRepository::try_new(&conn).unwrap());
    let mut rice = article("Riz", 0.5, "kg");
    rice.min_quantity = 1.0;
    rice.category = "Épicerie".to_string();
    inventory.add_article(rice).unwrap();
    let mut salt = article("Sel", 3.0, "kg");
    salt.min_quantity = 1.0;
    inventory.add_article(salt).unwrap();

    let shopping = ShoppingService::new(
        SqliteShoppingRepository::try_new(&conn).unwrap(),
        SqliteInventoryRepository::try_new(&conn).unwrap(),
    );
    let touched = shopping.generate_from_low_stock().unwrap();
    assert_eq!(touched.len(), 1);
    assert_eq!(touched[0].name, "Riz");
    assert_eq!(touched[0].quantity, 1.5);
    assert_eq!(touched[0].source, ItemSource::LowStock);

    shopping.generate_from_low_stock().unwrap();
    let open = shopping.list_items(false).unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].quantity, 1.5);
}

#[test]
fn recipe_lines_subtract_current_stock() {
    let conn = open_db_in_memory().unwrap();
    let inventory = InventoryService::new(SqliteInventoryRepository::try_new(&conn).unwrap());
    inventory.add_article(article("pâtes", 250.0, "g")).unwrap();
    inventory.add_article(article("crème", 50.0, "cl")).unwrap();

    let shopping = ShoppingService::new(
        SqliteShoppingRepository::try_new(&conn).unwrap(),
        SqliteInventoryRepository::try_new(&conn).unwrap(),
    );
    let recipe = Recipe::new("Carbonara", 2)
        .with_ingredient("pâtes", 200.0, "g")
        .with_ingredient("crème", 10.0, "cl")
        .with_ingredient("lardons", 100.0, "g");

    let touched = shopping.add_recipe(&recipe, 4).unwrap();
    let lines: Vec<_> = touched
        .iter()
        .map(|item| (item.name.as_str(), item.quantity))
        .collect();
    assert_eq!(lines, vec![("pâtes", 150.0), ("lardons", 200.0)]);
    assert!(touched.iter().all(|item| item.source == ItemSource::Recipe));

    assert!(matches!(
        shopping.add_recipe(&recipe, 0).unwrap_err(),
        AppError::Validation(_)
    ));
}

#[test]
fn manual_lines_merge_and_bought_lines_clear() {
    let conn = open_db_in_memory().unwrap();
    let shopping = ShoppingService::new(
        SqliteShoppingRepository::try_new(&conn).unwrap(),
        SqliteInventoryRepository::try_new(&conn).unwrap(),
    );

    let milk = shopping.add_item("Lait", 1.0, "l", "frais").unwrap();
    let merged = shopping.add_item(" lait ", 2.0, "L", "").unwrap();
    assert_eq!(merged.id, milk.id);
    assert_eq!(merged.quantity, 3.0);

    let bread = shopping.add_item("Pain", 1.0, "", "").unwrap();
    let groups = shopping.grouped_by_category().unwrap();
    assert_eq!(groups["frais"].len(), 1);
    assert_eq!(groups[UNCATEGORIZED][0].id, bread.id);

    assert!(shopping.mark_bought(bread.id).unwrap().bought);
    assert_eq!(shopping.list_items(false).unwrap().len(), 1);
    assert_eq!(shopping.list_items(true).unwrap().len(), 2);
    assert_eq!(shopping.clear_bought().unwrap(), 1);
    assert!(matches!(
        shopping.get_item(bread.id).unwrap_err(),
        AppError::NotFound { .. }
    ));

    let err = shopping.add_item("Beurre", 0.0, "g", "").unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}
