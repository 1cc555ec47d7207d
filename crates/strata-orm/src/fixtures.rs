//! Models shared by the unit tests.

use chrono::NaiveDate;

use crate::attributes::{Attributes, CastType};
use crate::error::Result;
use crate::metadata::{AttributeType, ModelDescriptor};
use crate::model::Model;
use crate::relations::Relations;

pub fn user_row(id: i64, username: &str, is_admin: i64) -> Attributes {
    Attributes::new()
        .with("id", id)
        .with("username", username)
        .with("is_admin", is_admin)
}

pub fn book_row(id: i64, user_id: i64) -> Attributes {
    Attributes::new()
        .with("id", id)
        .with("user_id", user_id)
        .with("title", format!("book {id}"))
}

#[derive(Debug)]
pub struct TestUserModel {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
    pub password: Option<String>,
    pub relations: Relations,
}

impl Model for TestUserModel {
    fn descriptor() -> ModelDescriptor {
        ModelDescriptor::new("TestUserModel")
            .field("username", AttributeType::String)
            .cast_field("is_admin", AttributeType::Boolean, CastType::Bool)
            .field("password", AttributeType::String)
            .property("nickname")
            .hidden(["password"])
    }

    fn from_attributes(attributes: &Attributes) -> Result<Self> {
        Ok(Self {
            id: attributes.get("id")?,
            username: attributes.get("username")?,
            is_admin: attributes.get_opt("is_admin")?.unwrap_or(false),
            password: attributes.get_opt("password")?,
            relations: Relations::new(),
        })
    }

    fn to_attributes(&self) -> Attributes {
        let mut attributes = Attributes::new()
            .with("id", self.id)
            .with("username", self.username.as_str())
            .with("is_admin", self.is_admin);
        if let Some(password) = &self.password {
            attributes.set("password", password.as_str());
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

#[derive(Debug)]
pub struct TestUserModelWithHooks {
    pub id: i64,
    pub username: String,
    pub created_hook_ran: bool,
    pub relations: Relations,
}

fn stamp(day: u32) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

impl Model for TestUserModelWithHooks {
    fn descriptor() -> ModelDescriptor {
        ModelDescriptor::new("TestUserModelWithHooks")
            .table("test_user_models")
            .field("username", AttributeType::String)
            .cast_field("is_admin", AttributeType::Boolean, CastType::Bool)
            .cast_field("created_at", AttributeType::DateTime, CastType::DateTime)
            .cast_field("updated_at", AttributeType::DateTime, CastType::DateTime)
    }

    fn from_attributes(attributes: &Attributes) -> Result<Self> {
        Ok(Self {
            id: attributes.get("id")?,
            username: attributes.get("username")?,
            created_hook_ran: false,
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

    fn before_create(attributes: Attributes) -> Attributes {
        attributes.with("created_at", stamp(1))
    }

    fn after_create(mut self) -> Self {
        self.created_hook_ran = true;
        self
    }

    fn before_update(attributes: Attributes) -> Attributes {
        attributes.with("updated_at", stamp(2))
    }
}

#[derive(Debug)]
pub struct TestBookModel {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub relations: Relations,
}

impl Model for TestBookModel {
    fn descriptor() -> ModelDescriptor {
        ModelDescriptor::new("TestBookModel")
            .cast_field("user_id", AttributeType::Integer, CastType::Int)
            .field("title", AttributeType::String)
            .has_one::<TestUserModel>("user", "id", "user_id")
    }

    fn from_attributes(attributes: &Attributes) -> Result<Self> {
        Ok(Self {
            id: attributes.get("id")?,
            user_id: attributes.get("user_id")?,
            title: attributes.get("title")?,
            relations: Relations::new(),
        })
    }

    fn to_attributes(&self) -> Attributes {
        Attributes::new()
            .with("id", self.id)
            .with("user_id", self.user_id)
            .with("title", self.title.as_str())
    }

    fn relations(&self) -> &Relations {
        &self.relations
    }

    fn relations_mut(&mut self) -> &mut Relations {
        &mut self.relations
    }
}

#[derive(Debug)]
pub struct TestUserModelWithRelationship {
    pub id: i64,
    pub username: String,
    pub relations: Relations,
}

impl Model for TestUserModelWithRelationship {
    fn descriptor() -> ModelDescriptor {
        ModelDescriptor::new("TestUserModelWithRelationship")
            .table("test_user_models")
            .field("username", AttributeType::String)
            .has_many::<TestBookModel>("books", "user_id", "id")
            .has_one::<TestBookModel>("book", "user_id", "id")
    }

    fn from_attributes(attributes: &Attributes) -> Result<Self> {
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
