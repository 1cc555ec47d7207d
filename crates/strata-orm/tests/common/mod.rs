#![allow(dead_code)]

use strata_orm::prelude::*;
use strata_orm::{RecordingDriver, ToSqlValue};

// =============================================================================
// Models
// =============================================================================

#[derive(Debug)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
    pub relations: Relations,
}

impl Model for User {
    fn descriptor() -> ModelDescriptor {
        ModelDescriptor::new("User")
            .field("username", AttributeType::String)
            .cast_field("is_admin", AttributeType::Boolean, CastType::Bool)
            .has_many::<Book>("books", "user_id", "id")
            .has_one::<Profile>("profile", "user_id", "id")
    }

    fn from_attributes(attributes: &Attributes) -> Result<Self> {
        Ok(Self {
            id: attributes.get("id")?,
            username: attributes.get("username")?,
            is_admin: attributes.get_opt("is_admin")?.unwrap_or(false),
            relations: Relations::new(),
        })
    }

    fn to_attributes(&self) -> Attributes {
        Attributes::new()
            .with("id", self.id)
            .with("username", self.username.as_str())
            .with("is_admin", self.is_admin)
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
    pub title: String,
    pub relations: Relations,
}

impl Model for Book {
    fn descriptor() -> ModelDescriptor {
        ModelDescriptor::new("Book")
            .cast_field("user_id", AttributeType::Integer, CastType::Int)
            .field("title", AttributeType::String)
            .has_one::<User>("user", "id", "user_id")
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
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub bio: Option<String>,
    pub relations: Relations,
}

impl Model for Profile {
    fn descriptor() -> ModelDescriptor {
        ModelDescriptor::new("Profile")
            .cast_field("user_id", AttributeType::Integer, CastType::Int)
            .field("bio", AttributeType::String)
    }

    fn from_attributes(attributes: &Attributes) -> Result<Self> {
        Ok(Self {
            id: attributes.get("id")?,
            user_id: attributes.get("user_id")?,
            bio: attributes.get_opt("bio")?,
            relations: Relations::new(),
        })
    }

    fn to_attributes(&self) -> Attributes {
        let mut attributes = Attributes::new()
            .with("id", self.id)
            .with("user_id", self.user_id);
        attributes.set("bio", self.bio.clone());
        attributes
    }

    fn relations(&self) -> &Relations {
        &self.relations
    }

    fn relations_mut(&mut self) -> &mut Relations {
        &mut self.relations
    }
}

// =============================================================================
// Helpers
// =============================================================================

pub fn setup() -> (Database, RecordingDriver) {
    let driver = RecordingDriver::new();
    (Database::new(driver.clone()), driver)
}

pub fn user(id: i64, username: &str, is_admin: bool) -> Attributes {
    Attributes::new()
        .with("id", id)
        .with("username", username)
        .with("is_admin", i64::from(is_admin))
}

pub fn book(id: i64, user_id: i64, title: &str) -> Attributes {
    Attributes::new()
        .with("id", id)
        .with("user_id", user_id)
        .with("title", title)
}

pub fn aggregate(value: impl ToSqlValue) -> Vec<Attributes> {
    vec![Attributes::new().with("aggregate", value)]
}
