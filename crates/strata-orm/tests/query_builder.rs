//! Query builder flows against the recording driver.

mod common;

use common::{aggregate, setup, user, User};
use strata_orm::prelude::*;
use strata_orm::{ExecResult, OrmError, SqlValue};

#[tokio::test]
async fn test_users_scenario() {
    let (db, driver) = setup();
    driver.push_exec(ExecResult::inserted(1, 1));
    driver.push_rows(vec![user(1, "Sam", false)]);
    driver.push_exec(ExecResult::inserted(1, 2));
    driver.push_rows(vec![user(2, "Bob", false)]);
    driver.push_exec(ExecResult::affected(1));

    let sam = User::query(&db)
        .insert(Attributes::new().with("username", "Sam"))
        .await
        .unwrap();
    let bob = User::query(&db)
        .insert(Attributes::new().with("username", "Bob"))
        .await
        .unwrap();
    assert_eq!((sam.id, bob.id), (1, 2));
    assert!(!sam.is_admin);

    let updated = User::query(&db)
        .where_eq("username", "Sam")
        .update(Attributes::new().with("is_admin", 1))
        .await
        .unwrap();
    assert_eq!(updated, 1);

    assert_eq!(
        driver.sql_log(),
        [
            "INSERT INTO `users` SET `username` = 'Sam'",
            "SELECT * FROM `users` WHERE (`id` = 1) LIMIT 1",
            "INSERT INTO `users` SET `username` = 'Bob'",
            "SELECT * FROM `users` WHERE (`id` = 2) LIMIT 1",
            "UPDATE `users` SET `is_admin` = 1 WHERE (`username` = 'Sam')",
        ]
    );
    assert_eq!(driver.pending_responses(), 0);
}

#[tokio::test]
async fn test_relation_keys_are_dropped_from_insert() {
    let (db, driver) = setup();
    driver.push_exec(ExecResult::inserted(1, 5));
    driver.push_rows(vec![user(5, "Sam", false)]);

    User::query(&db)
        .insert(
            Attributes::new()
                .with("username", "Sam")
                .with("books", SqlValue::Null),
        )
        .await
        .unwrap();

    assert_eq!(
        driver.sql_log()[0],
        "INSERT INTO `users` SET `username` = 'Sam'"
    );
}

#[tokio::test]
async fn test_model_update_refreshes_instance() {
    let (db, driver) = setup();
    driver.push_rows(vec![user(3, "Sam", false)]);
    let sam = User::query(&db).first().await.unwrap().unwrap();

    driver.push_exec(ExecResult::affected(1));
    driver.push_rows(vec![user(3, "Sam", true)]);
    let refreshed = sam
        .update(&db, Attributes::new().with("is_admin", true))
        .await
        .unwrap();

    assert!(refreshed.is_admin);
    assert_eq!(
        &driver.sql_log()[1..],
        [
            "UPDATE `users` SET `is_admin` = true WHERE (`id` = 3)",
            "SELECT * FROM `users` WHERE (`id` = 3) LIMIT 1",
        ]
    );
}

#[tokio::test]
async fn test_model_update_runs_on_spawned_task() {
    let (db, driver) = setup();
    driver.push_rows(vec![user(4, "Ada", false)]);
    let ada = User::query(&db).first().await.unwrap().unwrap();

    driver.push_exec(ExecResult::affected(1));
    driver.push_rows(vec![user(4, "Ada", true)]);
    let task = tokio::spawn(async move {
        ada.update(&db, Attributes::new().with("is_admin", true))
            .await
    });
    let refreshed = task.await.unwrap().unwrap();

    assert!(refreshed.is_admin);
    assert_eq!(driver.pending_responses(), 0);
}

#[tokio::test]
async fn test_model_refresh_of_deleted_row() {
    let (db, driver) = setup();
    driver.push_rows(vec![user(3, "Sam", false)]);
    let sam = User::query(&db).first().await.unwrap().unwrap();

    driver.push_exec(ExecResult::affected(1));
    assert!(sam.delete(&db).await.unwrap());

    let err = sam.refresh(&db).await.unwrap_err();
    assert!(matches!(err, OrmError::NotFound));
    assert_eq!(
        driver.sql_log()[1],
        "DELETE FROM `users` WHERE (`id` = 3)"
    );
}

#[tokio::test]
async fn test_driver_errors_propagate() {
    let (db, driver) = setup();
    driver.push_error("Duplicate entry 'Sam' for key 'username'");
    let err = User::query(&db)
        .insert(Attributes::new().with("username", "Sam"))
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::Database(_)));
    assert_eq!(driver.statements().len(), 1);
}

#[tokio::test]
async fn test_count_and_sum() {
    let (db, driver) = setup();
    driver.push_rows(aggregate(2_i64));
    driver.push_rows(aggregate(7.5_f64));

    let query = User::query(&db).where_op("id", Operator::Gt, 0);
    assert_eq!(query.count("id").await.unwrap(), 2);
    assert_eq!(query.sum("id").await.unwrap(), Some(7.5));
    assert_eq!(
        driver.sql_log(),
        [
            "SELECT COUNT(`id`) AS aggregate FROM `users` WHERE (`id` > 0)",
            "SELECT SUM(`id`) AS aggregate FROM `users` WHERE (`id` > 0)",
        ]
    );
}

#[tokio::test]
async fn test_min_on_empty_table() {
    let (db, driver) = setup();
    driver.push_rows(aggregate(SqlValue::Null));
    assert_eq!(User::query(&db).min("id").await.unwrap(), None);
}

#[test]
fn test_limit_and_ordering_render() {
    let (db, _) = setup();
    let statement = User::query(&db)
        .where_eq("is_admin", true)
        .order_by_desc("id")
        .order_by_asc("username")
        .take(10)
        .to_statement()
        .unwrap();
    assert_eq!(
        statement.to_string(),
        "SELECT * FROM `users` WHERE (`is_admin` = true) ORDER BY `id` DESC, `username` ASC LIMIT 10"
    );
}

#[test]
fn test_injection_attempt_is_escaped() {
    let (db, _) = setup();
    let statement = User::query(&db)
        .where_eq("username", "x' OR '1'='1")
        .to_statement()
        .unwrap();
    assert_eq!(statement.sql(), "SELECT * FROM ?? WHERE (?? = ?)");
    assert_eq!(
        statement.to_string(),
        "SELECT * FROM `users` WHERE (`username` = 'x\\' OR \\'1\\'=\\'1')"
    );
}
