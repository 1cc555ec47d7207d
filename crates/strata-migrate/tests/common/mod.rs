#![allow(dead_code)]

use strata_migrate::prelude::*;
use strata_orm::prelude::*;
use strata_orm::{ExecResult, RecordingDriver};

// ===== Models =====

#[derive(Debug)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub relations: Relations,
}

impl Model for User {
    fn descriptor() -> ModelDescriptor {
        ModelDescriptor::new("User")
            .table("users")
            .field("username", AttributeType::String)
            .cast_field("is_admin", AttributeType::Boolean, CastType::Bool)
            .has_many::<Book>("books", "user_id", "id")
    }

    fn from_attributes(attributes: &Attributes) -> strata_orm::Result<Self> {
        Ok(Self {
            id: attributes.get("id")?,
            username: attributes.get("username")?,
            relations: Relations::new(),
        })
    }

    fn to_attributes(&self) -> Attributes {
        Attributes::new()
            .with("id", self.id)
            .with("username", self.username.as_str())
    }

    fn relations(&self) -> &Relations {
        &self.relations
    }

    fn relations_mut(&mut self) -> &mut Relations {
        &mut self.relations
    }
}

#[derive(Debug)]
pub struct Book {
    pub id: i64,
    pub user_id: i64,
    pub title: Option<String>,
    pub relations: Relations,
}

impl Model for Book {
    fn descriptor() -> ModelDescriptor {
        ModelDescriptor::new("Book")
            .table("books")
            .cast_field("user_id", AttributeType::Integer, CastType::Int)
            .field("title", AttributeType::String)
            .has_one::<User>("user", "id", "user_id")
    }

    fn from_attributes(attributes: &Attributes) -> strata_orm::Result<Self> {
        Ok(Self {
            id: attributes.get("id")?,
            user_id: attributes.get("user_id")?,
            title: attributes.get_opt("title")?,
            relations: Relations::new(),
        })
    }

    fn to_attributes(&self) -> Attributes {
        let mut attributes = Attributes::new()
            .with("id", self.id)
            .with("user_id", self.user_id);
        if let Some(title) = &self.title {
            attributes.set("title", title.as_str());
        }
        attributes
    }

    fn relations(&self) -> &Relations {
        &self.relations
    }

    fn relations_mut(&mut self) -> &mut Relations {
        &mut self.relations
    }
}

// ===== Migrations =====

pub struct CreateUsersTable;

impl Migration for CreateUsersTable {
    fn name(&self) -> &str {
        "0001_create_users_table"
    }

    fn up(&self, schema: &mut Schema) {
        schema.create::<User>(|table| {
            table.increments("id");
            table.string("username", 255);
            table.timestamps(0);
        });
    }

    fn down(&self, schema: &mut Schema) {
        schema.drop_if_exists::<User>();
    }
}

pub struct AddAdminFlag;

impl Migration for AddAdminFlag {
    fn name(&self) -> &str {
        "0002_add_admin_flag"
    }

    fn up(&self, schema: &mut Schema) {
        schema.update::<User>(|table| {
            table.boolean("is_admin").default(false);
        });
    }

    fn down(&self, schema: &mut Schema) {
        schema.update::<User>(|table| {
            table.drop_column_if_exists("is_admin");
        });
    }
}

pub struct AddIndexes;

impl Migration for AddIndexes {
    fn name(&self) -> &str {
        "0003_add_indexes"
    }

    fn up(&self, schema: &mut Schema) {
        schema.update::<User>(|table| {
            table.string("unique_index", 255).unique();
            table.string("indexed_col", 255).index();
            table.index(["unique_index", "indexed_col"], Some("custom_index"));
        });
    }

    fn down(&self, schema: &mut Schema) {
        schema.update::<User>(|table| {
            table.drop_column_if_exists("unique_index");
            table.drop_column_if_exists("indexed_col");
        });
    }
}

pub struct CreateBooksTable;

impl Migration for CreateBooksTable {
    fn name(&self) -> &str {
        "0004_create_books_table"
    }

    fn up(&self, schema: &mut Schema) {
        schema.create::<Book>(|table| {
            table.increments("id");
            table.string("title", 255).nullable();
            table.belongs_to::<User>("user_id");
            table.timestamps(0);
        });
    }

    fn down(&self, schema: &mut Schema) {
        schema.drop_if_exists::<Book>();
    }
}

pub fn all_migrations() -> Vec<Box<dyn Migration>> {
    vec![
        Box::new(CreateUsersTable),
        Box::new(AddAdminFlag),
        Box::new(AddIndexes),
        Box::new(CreateBooksTable),
    ]
}

// ===== Driver scripting =====

pub const HAS_MIGRATIONS_TABLE: &str = "SELECT table_name FROM information_schema.tables \
     WHERE table_schema = DATABASE() AND table_name = 'migrations' \
     AND table_type = 'BASE TABLE'";

pub const CREATE_MIGRATIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS `migrations` (\
     `id` int auto_increment primary key, \
     `migration` varchar(255) not null, \
     `batch` int not null)";

pub const RAN: &str = "SELECT * FROM `migrations` ORDER BY `batch` DESC, `id` DESC";

pub const LAST_BATCH_NUMBER: &str = "SELECT MAX(`batch`) AS aggregate FROM `migrations`";

pub fn live_columns_sql(table: &str) -> String {
    format!(
        "SELECT column_name AS `column_name` FROM information_schema.columns \
         WHERE table_schema = DATABASE() AND table_name = '{table}' \
         ORDER BY ordinal_position"
    )
}

pub fn setup() -> (Database, RecordingDriver) {
    let driver = RecordingDriver::new();
    (Database::new(driver.clone()), driver)
}

pub fn record(id: i64, migration: &str, batch: i64) -> Attributes {
    Attributes::new()
        .with("id", id)
        .with("migration", migration)
        .with("batch", batch)
}

pub fn columns(names: &[&str]) -> Vec<Attributes> {
    names
        .iter()
        .map(|n| Attributes::new().with("column_name", *n))
        .collect()
}

pub fn aggregate(value: i64) -> Vec<Attributes> {
    vec![Attributes::new().with("aggregate", value)]
}

/// History table present.
pub fn script_existing_history(driver: &RecordingDriver) {
    driver.push_rows(vec![Attributes::new().with("table_name", "migrations")]);
}

/// History table missing: it is created, then reads empty.
pub fn script_fresh_history(driver: &RecordingDriver) {
    driver.push_rows(Vec::new());
    driver.push_exec(ExecResult::default());
    driver.push_rows(Vec::new());
    driver.push_rows(Vec::new());
}

/// A successful history insert and its read back.
pub fn script_log(driver: &RecordingDriver, id: u64, migration: &str, batch: i64) {
    driver.push_exec(ExecResult::inserted(1, id));
    driver.push_rows(vec![record(id as i64, migration, batch)]);
}

pub fn insert_sql(migration: &str, batch: i64) -> String {
    format!("INSERT INTO `migrations` SET `migration` = '{migration}', `batch` = {batch}")
}

pub fn refetch_sql(id: u64) -> String {
    format!("SELECT * FROM `migrations` WHERE (`id` = {id}) LIMIT 1")
}
