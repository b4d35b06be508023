use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::schema::db::{Direction, Quote, SourceType};

#[derive(Deserialize, Debug)]
pub struct NewQuote {
    pub text: String,
    pub source: String,
    pub type_of_source: SourceType,
    pub weight: Option<i32>,
}

#[derive(Deserialize, Debug)]
pub struct EditQuote {
    pub text: Option<String>,
    pub source: Option<String>,
    pub type_of_source: Option<SourceType>,
    pub weight: Option<i32>,
}

#[derive(Deserialize, Debug)]
pub struct TopParams {
    pub limit: Option<i64>,
}

#[derive(Deserialize, Debug)]
pub struct SourceParams {
    #[serde(rename = "type")]
    pub type_of_source: Option<SourceType>,
}

#[derive(Serialize, Debug)]
pub struct RandomQuoteResponse {
    pub quote: Option<Quote>,
    pub user_vote: Option<Direction>,
}

#[derive(Serialize, Debug)]
pub struct UserVoteResponse {
    pub direction: Option<Direction>,
}

#[derive(Serialize, Debug, FromRow)]
pub struct VoteCounts {
    pub likes: i32,
    pub dislikes: i32,
}

#[derive(Serialize, Debug)]
pub struct SourceQuotesResponse {
    pub source: Option<String>,
    pub quotes: Vec<Quote>,
}

#[derive(Serialize, Debug, FromRow)]
pub struct TypeCount {
    pub type_of_source: SourceType,
    pub total: i64,
}

#[derive(Serialize, Debug, FromRow)]
pub struct TypeVoteTotals {
    pub type_of_source: SourceType,
    pub likes: i64,
    pub dislikes: i64,
}

#[derive(Serialize, Debug, FromRow)]
pub struct TypeViewTotals {
    pub type_of_source: SourceType,
    pub views: i64,
}

#[derive(Serialize, Debug, FromRow)]
pub struct DailyVoteCount {
    pub day: chrono::NaiveDate,
    pub direction: Direction,
    pub total: i64,
}

#[derive(Serialize, Debug, FromRow)]
pub struct AuthorCount {
    pub author: String,
    pub total: i64,
}

#[derive(Serialize, Debug)]
pub struct DashboardResponse {
    pub quotes_by_type: Vec<TypeCount>,
    pub votes_by_type: Vec<TypeVoteTotals>,
    pub views_by_type: Vec<TypeViewTotals>,
    pub votes_last_week: Vec<DailyVoteCount>,
    pub top_authors: Vec<AuthorCount>,
}
