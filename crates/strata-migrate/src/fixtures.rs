//! Models shared by the unit tests.

use strata_orm::prelude::*;

#[derive(Debug)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub relations: Relations,
}

impl Model for Author {
    fn descriptor() -> ModelDescriptor {
        ModelDescriptor::new("Author")
            .table("authors")
            .field("name", AttributeType::String)
            .has_many::<Post>("posts", "author_id", "id")
    }

    fn from_attributes(attributes: &Attributes) -> Result<Self> {
        Ok(Self {
            id: attributes.get("id")?,
            name: attributes.get("name")?,
            relations: Relations::new(),
        })
    }

    fn to_attributes(&self) -> Attributes {
        Attributes::new()
            .with("id", self.id)
            .with("name", self.name.as_str())
    }

    fn relations(&self) -> &Relations {
        &self.relations
    }

    fn relations_mut(&mut self) -> &mut Relations {
        &mut self.relations
    }
}

#[derive(Debug)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub title: Option<String>,
    pub relations: Relations,
}

impl Model for Post {
    fn descriptor() -> ModelDescriptor {
        ModelDescriptor::new("Post")
            .table("posts")
            .field("author_id", AttributeType::Integer)
            .field("title", AttributeType::String)
            .has_one::<Author>("author", "id", "author_id")
    }

    fn from_attributes(attributes: &Attributes) -> Result<Self> {
        Ok(Self {
            id: attributes.get("id")?,
            author_id: attributes.get("author_id")?,
            title: attributes.get_opt("title")?,
            relations: Relations::new(),
        })
    }

    fn to_attributes(&self) -> Attributes {
        let mut attributes = Attributes::new()
            .with("id", self.id)
            .with("author_id", self.author_id);
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
