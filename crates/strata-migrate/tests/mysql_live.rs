//! Migrations against a live MySQL server.
//!
//! Run with `DATABASE_URL=mysql://... cargo test -- --ignored`.

mod common;

use common::{all_migrations, Book, User};
use strata_migrate::prelude::*;
use strata_migrate::Inspector;
use strata_orm::prelude::*;
use strata_orm::{DatabaseOptions, Statement};

async fn connect() -> Database {
    let options = DatabaseOptions::from_env().expect("DATABASE_URL must be set");
    let db = Database::connect(&options).await.expect("connect");
    for table in ["books", "users", "migrations"] {
        db.execute(&Statement::new("DROP TABLE IF EXISTS ??").ident(table))
            .await
            .expect("drop");
    }
    db
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_migrate_rollback_and_reset() {
    let db = connect().await;
    let inspector = Inspector::new(&db);
    let runner = MigrationRunner::new(&db).migrations(all_migrations());

    assert_eq!(runner.run_up().await.unwrap().len(), 4);
    assert!(runner.run_up().await.unwrap().is_empty());
    assert!(inspector
        .has_columns("users", &["id", "username", "is_admin", "unique_index", "indexed_col"])
        .await
        .unwrap());
    assert_eq!(
        inspector.column_type("books", "user_id").await.unwrap(),
        Some(ColumnType::BigInt)
    );
    assert_eq!(runner.repository().last_batch_number().await.unwrap(), 1);

    let user = User::query(&db)
        .insert(
            Attributes::new()
                .with("username", "sam")
                .with("unique_index", "sam")
                .with("indexed_col", "reader"),
        )
        .await
        .unwrap();
    Book::query(&db)
        .insert(Attributes::new().with("user_id", user.id).with("title", "Dune"))
        .await
        .unwrap();
    let users = User::query(&db).with("books").get().await.unwrap();
    assert_eq!(users[0].has_many::<Book>("books").unwrap().len(), 1);
    Book::query(&db).delete().await.unwrap();

    assert_eq!(runner.rollback().await.unwrap().len(), 4);
    assert!(!inspector.has_table("users").await.unwrap());
    assert!(inspector.has_table("migrations").await.unwrap());

    runner.run_up().await.unwrap();
    assert_eq!(runner.repository().last_batch_number().await.unwrap(), 1);
    assert_eq!(runner.run_down().await.unwrap().len(), 4);
    assert!(inspector.tables().await.unwrap().iter().all(|t| t != "books"));
}
