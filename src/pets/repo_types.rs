use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Dog,
    Cat,
    Bird,
    Other,
}

impl Category {
    pub const ALL: [Category; 4] = [Category::Dog, Category::Cat, Category::Bird, Category::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Dog => "Dog",
            Category::Cat => "Cat",
            Category::Bird => "Bird",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow::anyhow!("unknown pet category {:?}", s))
    }
}

/// Row as stored, joined with the owner's username.
#[derive(Debug, Clone, FromRow)]
pub struct PetRow {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub age: i64,
    pub breed: String,
    pub description: String,
    pub image: String,
    pub available: bool,
    pub owner_id: i64,
    pub owner_username: String,
    pub contact_email: Option<String>,
    pub adopted: bool,
    pub approved: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pet {
    pub id: i64,
    pub name: String,
    pub category: Category,
    pub age: i64,
    pub breed: String,
    pub description: String,
    pub image: String,
    pub available: bool,
    pub owner_id: i64,
    pub owner_username: String,
    pub contact_email: Option<String>,
    pub adopted: bool,
    pub approved: bool,
    pub created_at: OffsetDateTime,
}

impl Pet {
    /// "Available" until an adoption request is approved, then "Adopted".
    pub fn status(&self) -> &'static str {
        if self.available {
            "Available"
        } else {
            "Adopted"
        }
    }
}

impl TryFrom<PetRow> for Pet {
    type Error = anyhow::Error;

    fn try_from(r: PetRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            name: r.name,
            category: r.category.parse()?,
            age: r.age,
            breed: r.breed,
            description: r.description,
            image: r.image,
            available: r.available,
            owner_id: r.owner_id,
            owner_username: r.owner_username,
            contact_email: r.contact_email,
            adopted: r.adopted,
            approved: r.approved,
            created_at: r.created_at,
        })
    }
}

/// Validated, user-editable pet fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PetAttributes {
    pub name: String,
    pub category: Category,
    pub age: i64,
    pub breed: String,
    pub description: String,
    pub contact_email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, FromRow)]
pub struct PetCounts {
    pub total_pets: i64,
    pub available_pets: i64,
    pub adopted_pets: i64,
}
