use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct Quote {
    pub id: i32,
    pub text: String,
    pub source: String,
    pub type_of_source: SourceType,
    pub weight: i32,
    pub views: i32,
    pub likes: i32,
    pub dislikes: i32,
    pub created_at: chrono::NaiveDateTime,
    pub author: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, FromRow)]
pub struct QuoteVote {
    pub id: i32,
    pub quote_id: i32,
    pub username: String,
    pub direction: Direction,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "source_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Film,
    Book,
    Game,
    Series,
    Comic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "vote_direction", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Like,
    Dislike,
}

impl Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Like => write!(f, "like"),
            Self::Dislike => write!(f, "dislike"),
        }
    }
}

/// The vote route takes the direction as a raw path segment, so parsing
/// failures must map to the InvalidDirection error rather than a generic
/// path deserialization failure.
impl FromStr for Direction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Self::Like),
            "dislike" => Ok(Self::Dislike),
            _ => Err(()),
        }
    }
}
