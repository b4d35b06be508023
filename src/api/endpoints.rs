use actix_web::{
    get, post, put,
    web::{Data, Json, Path, Query},
    HttpResponse,
};
use log::{log, Level};
use rand::{seq::SliceRandom, thread_rng};
use sqlx::{query, query_as, query_scalar, FromRow, Pool, Postgres, Transaction};

use crate::{
    api::db::{log_query, open_transaction, retry_transient, violates_unique},
    app::AppState,
    auth::User,
    errors::ApiError,
    schema::{
        api::{
            AuthorCount, DailyVoteCount, DashboardResponse, EditQuote, NewQuote,
            RandomQuoteResponse, SourceParams, SourceQuotesResponse, TopParams, TypeCount,
            TypeViewTotals, TypeVoteTotals, UserVoteResponse, VoteCounts,
        },
        db::{Direction, Quote, QuoteVote},
    },
    selection::select_random,
    voting::{reconcile, VoteOutcome},
};

const MAX_QUOTES_PER_SOURCE: i64 = 3;
const DEFAULT_TOP_LIMIT: i64 = 10;

#[derive(FromRow)]
struct QuoteWeight {
    id: i32,
    weight: i32,
}

#[get("/")]
pub async fn random_quote(
    state: Data<AppState>,
    user: Option<User>,
) -> Result<HttpResponse, ApiError> {
    log!(Level::Info, "GET /");

    let candidates = log_query(
        query_as::<_, QuoteWeight>("SELECT id, weight FROM quotes ORDER BY id")
            .fetch_all(&state.db)
            .await,
    )?;

    let weights: Vec<i32> = candidates.iter().map(|quote| quote.weight).collect();
    let picked = select_random(&weights, &mut thread_rng());
    let Some(index) = picked else {
        // Empty quote set (or nothing selectable): render the empty state
        // without touching any counter.
        return Ok(HttpResponse::Ok().json(RandomQuoteResponse {
            quote: None,
            user_vote: None,
        }));
    };
    let selected_id = candidates[index].id;

    // Single-statement increment, so concurrent views never lose updates.
    let quote = log_query(
        query_as::<_, Quote>("UPDATE quotes SET views = views + 1 WHERE id = $1 RETURNING *")
            .bind(selected_id)
            .fetch_one(&state.db)
            .await,
    )?;

    let user_vote = match &user {
        Some(user) => {
            log_query(
                query_scalar::<_, Direction>(
                    "SELECT direction FROM quote_votes WHERE quote_id = $1 AND username = $2",
                )
                .bind(selected_id)
                .bind(&user.username)
                .fetch_optional(&state.db)
                .await,
            )?
        }
        None => None,
    };

    Ok(HttpResponse::Ok().json(RandomQuoteResponse {
        quote: Some(quote),
        user_vote,
    }))
}

#[get("/vote/{quote_id}")]
pub async fn get_user_vote(
    state: Data<AppState>,
    path: Path<(i32,)>,
    user: User,
) -> Result<HttpResponse, ApiError> {
    let (quote_id,) = path.into_inner();
    log!(Level::Info, "GET /vote/{}", quote_id);

    let exists = log_query(
        query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM quotes WHERE id = $1)")
            .bind(quote_id)
            .fetch_one(&state.db)
            .await,
    )?;
    if !exists {
        return Err(ApiError::NotFound);
    }

    let direction = log_query(
        query_scalar::<_, Direction>(
            "SELECT direction FROM quote_votes WHERE quote_id = $1 AND username = $2",
        )
        .bind(quote_id)
        .bind(&user.username)
        .fetch_optional(&state.db)
        .await,
    )?;

    Ok(HttpResponse::Ok().json(UserVoteResponse { direction }))
}

#[post("/vote/{quote_id}/{direction}")]
pub async fn vote_quote(
    state: Data<AppState>,
    path: Path<(i32, String)>,
    user: User,
) -> Result<HttpResponse, ApiError> {
    let (quote_id, raw_direction) = path.into_inner();
    log!(Level::Info, "POST /vote/{}/{}", quote_id, raw_direction);

    let direction: Direction = raw_direction
        .parse()
        .map_err(|()| ApiError::InvalidDirection)?;

    let counts =
        retry_transient(|| apply_vote(&state.db, quote_id, &user.username, direction)).await?;
    Ok(HttpResponse::Ok().json(counts))
}

/// One reconciliation as a single atomic unit: the quote row lock taken
/// first serialises every vote for that quote, so the ledger read below
/// always sees the latest committed state.
async fn apply_vote(
    db: &Pool<Postgres>,
    quote_id: i32,
    username: &str,
    requested: Direction,
) -> Result<VoteCounts, ApiError> {
    let mut transaction = open_transaction(db).await?;

    let locked = log_query(
        query_scalar::<_, i32>("SELECT id FROM quotes WHERE id = $1 FOR UPDATE")
            .bind(quote_id)
            .fetch_optional(&mut *transaction)
            .await,
    )?;
    if locked.is_none() {
        return Err(ApiError::NotFound);
    }

    let ledger_row = log_query(
        query_as::<_, QuoteVote>(
            "SELECT * FROM quote_votes WHERE quote_id = $1 AND username = $2",
        )
        .bind(quote_id)
        .bind(username)
        .fetch_optional(&mut *transaction)
        .await,
    )?;

    match reconcile(ledger_row.map(|row| row.direction), requested)? {
        VoteOutcome::Created(direction) => {
            log_query(
                query("INSERT INTO quote_votes (quote_id, username, direction) VALUES ($1, $2, $3)")
                    .bind(quote_id)
                    .bind(username)
                    .bind(direction)
                    .execute(&mut *transaction)
                    .await,
            )?;
            log!(Level::Trace, "created vote ledger row");
        }
        VoteOutcome::Flipped { to, .. } => {
            log_query(
                query(
                    "UPDATE quote_votes SET direction = $1 WHERE quote_id = $2 AND username = $3",
                )
                .bind(to)
                .bind(quote_id)
                .bind(username)
                .execute(&mut *transaction)
                .await,
            )?;
            log!(Level::Trace, "flipped vote ledger row");
        }
    }

    // Counters are a materialized cache over the ledger, refreshed in the
    // same transaction as the ledger write. They cannot drift or go
    // negative because they are recomputed, not adjusted.
    let counts = log_query(
        query_as::<_, VoteCounts>(
            "UPDATE quotes SET
                likes = (SELECT count(*)::int FROM quote_votes
                         WHERE quote_id = quotes.id AND direction = 'like'),
                dislikes = (SELECT count(*)::int FROM quote_votes
                            WHERE quote_id = quotes.id AND direction = 'dislike')
             WHERE id = $1
             RETURNING likes, dislikes",
        )
        .bind(quote_id)
        .fetch_one(&mut *transaction)
        .await,
    )?;

    transaction.commit().await?;
    Ok(counts)
}

#[get("/top")]
pub async fn top_quotes(
    state: Data<AppState>,
    params: Query<TopParams>,
) -> Result<HttpResponse, ApiError> {
    log!(Level::Info, "GET /top");

    let limit = params.limit.unwrap_or(DEFAULT_TOP_LIMIT).clamp(1, 100);
    // id ascending keeps ties in insertion order.
    let quotes = log_query(
        query_as::<_, Quote>("SELECT * FROM quotes ORDER BY likes DESC, id ASC LIMIT $1")
            .bind(limit)
            .fetch_all(&state.db)
            .await,
    )?;

    Ok(HttpResponse::Ok().json(quotes))
}

#[post("/add")]
pub async fn add_quote(
    state: Data<AppState>,
    body: Json<NewQuote>,
    user: Option<User>,
) -> Result<HttpResponse, ApiError> {
    log!(Level::Info, "POST /add");

    let weight = body.weight.unwrap_or(1);
    validate_quote_fields(&body.text, &body.source, weight)?;

    let author = user.map(|user| user.username);
    let quote =
        retry_transient(|| insert_quote(&state.db, &body, weight, author.as_deref())).await?;
    Ok(HttpResponse::Created().json(quote))
}

async fn insert_quote(
    db: &Pool<Postgres>,
    new_quote: &NewQuote,
    weight: i32,
    author: Option<&str>,
) -> Result<Quote, ApiError> {
    let mut transaction = open_transaction(db).await?;

    // Normalize once; the lock, the count and the stored row must all use
    // the same key or padded input slips past the quota.
    let source = source_key(&new_quote.source);
    check_source_quota(&mut transaction, source, None).await?;

    let quote = log_query(
        query_as::<_, Quote>(
            "INSERT INTO quotes (text, source, type_of_source, weight, author)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(new_quote.text.trim())
        .bind(source)
        .bind(new_quote.type_of_source)
        .bind(weight)
        .bind(author)
        .fetch_one(&mut *transaction)
        .await,
    )
    .map_err(|err| {
        if violates_unique(&err, "quotes_text_key") {
            ApiError::DuplicateText
        } else {
            err
        }
    })?;

    transaction.commit().await?;
    log!(Level::Trace, "created quote {}", quote.id);
    Ok(quote)
}

#[put("/edit/{quote_id}")]
pub async fn edit_quote(
    state: Data<AppState>,
    path: Path<(i32,)>,
    body: Json<EditQuote>,
    user: User,
) -> Result<HttpResponse, ApiError> {
    let (quote_id,) = path.into_inner();
    log!(Level::Info, "PUT /edit/{}", quote_id);

    let quote =
        retry_transient(|| update_quote(&state.db, quote_id, &user.username, &body)).await?;
    Ok(HttpResponse::Ok().json(quote))
}

async fn update_quote(
    db: &Pool<Postgres>,
    quote_id: i32,
    editor: &str,
    fields: &EditQuote,
) -> Result<Quote, ApiError> {
    let mut transaction = open_transaction(db).await?;

    let quote = log_query(
        query_as::<_, Quote>("SELECT * FROM quotes WHERE id = $1 FOR UPDATE")
            .bind(quote_id)
            .fetch_optional(&mut *transaction)
            .await,
    )?
    .ok_or(ApiError::NotFound)?;

    // Authorless quotes have no editor.
    if quote.author.as_deref() != Some(editor) {
        return Err(ApiError::NotAuthor);
    }

    let text = fields.text.as_deref().unwrap_or(&quote.text).trim();
    let source = source_key(fields.source.as_deref().unwrap_or(&quote.source));
    let type_of_source = fields.type_of_source.unwrap_or(quote.type_of_source);
    let weight = fields.weight.unwrap_or(quote.weight);
    validate_quote_fields(text, source, weight)?;

    if source != quote.source {
        check_source_quota(&mut transaction, source, Some(quote_id)).await?;
    }

    let updated = log_query(
        query_as::<_, Quote>(
            "UPDATE quotes SET text = $1, source = $2, type_of_source = $3, weight = $4
             WHERE id = $5
             RETURNING *",
        )
        .bind(text)
        .bind(source)
        .bind(type_of_source)
        .bind(weight)
        .bind(quote_id)
        .fetch_one(&mut *transaction)
        .await,
    )
    .map_err(|err| {
        if violates_unique(&err, "quotes_text_key") {
            ApiError::DuplicateText
        } else {
            err
        }
    })?;

    transaction.commit().await?;
    Ok(updated)
}

/// Canonical source key. Insert and edit must lock, count and store under
/// this same key, or the quota could be bypassed with padded input.
fn source_key(source: &str) -> &str {
    source.trim()
}

fn enforce_source_quota(existing: i64) -> Result<(), ApiError> {
    if existing >= MAX_QUOTES_PER_SOURCE {
        return Err(ApiError::SourceQuotaExceeded);
    }
    Ok(())
}

/// Enforce the three-quotes-per-source cap. The advisory lock keyed on the
/// source string serialises concurrent submissions for the same source,
/// including the first ever submission where no row exists to lock.
/// Callers pass the `source_key` form.
async fn check_source_quota(
    transaction: &mut Transaction<'static, Postgres>,
    source: &str,
    exclude_id: Option<i32>,
) -> Result<(), ApiError> {
    log_query(
        query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(source)
            .execute(&mut **transaction)
            .await,
    )?;

    let count = log_query(
        query_scalar::<_, i64>("SELECT count(*) FROM quotes WHERE source = $1 AND id <> $2")
            .bind(source)
            .bind(exclude_id.unwrap_or(-1))
            .fetch_one(&mut **transaction)
            .await,
    )?;
    enforce_source_quota(count)
}

fn validate_quote_fields(text: &str, source: &str, weight: i32) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::Validation("Quote text must not be empty"));
    }
    if source.trim().is_empty() {
        return Err(ApiError::Validation("Source must not be empty"));
    }
    // VARCHAR(255) limits characters, not bytes.
    if source.trim().chars().count() > 255 {
        return Err(ApiError::Validation("Source must be at most 255 characters"));
    }
    if weight < 0 {
        return Err(ApiError::Validation("Weight must not be negative"));
    }
    Ok(())
}

#[get("/random_source")]
pub async fn random_source_quotes(
    state: Data<AppState>,
    params: Query<SourceParams>,
) -> Result<HttpResponse, ApiError> {
    log!(Level::Info, "GET /random_source");

    let sources = match params.type_of_source {
        Some(type_of_source) => log_query(
            query_scalar::<_, String>(
                "SELECT DISTINCT source FROM quotes WHERE type_of_source = $1",
            )
            .bind(type_of_source)
            .fetch_all(&state.db)
            .await,
        )?,
        None => log_query(
            query_scalar::<_, String>("SELECT DISTINCT source FROM quotes")
                .fetch_all(&state.db)
                .await,
        )?,
    };

    let Some(source) = sources.choose(&mut thread_rng()).cloned() else {
        return Ok(HttpResponse::Ok().json(SourceQuotesResponse {
            source: None,
            quotes: Vec::new(),
        }));
    };

    let quotes = log_query(
        query_as::<_, Quote>("SELECT * FROM quotes WHERE source = $1 ORDER BY id")
            .bind(&source)
            .fetch_all(&state.db)
            .await,
    )?;

    Ok(HttpResponse::Ok().json(SourceQuotesResponse {
        source: Some(source),
        quotes,
    }))
}

#[get("/dashboard")]
pub async fn dashboard(state: Data<AppState>, _user: User) -> Result<HttpResponse, ApiError> {
    log!(Level::Info, "GET /dashboard");

    let quotes_by_type = log_query(
        query_as::<_, TypeCount>(
            "SELECT type_of_source, count(*) AS total
             FROM quotes GROUP BY type_of_source ORDER BY type_of_source",
        )
        .fetch_all(&state.db)
        .await,
    )?;

    let votes_by_type = log_query(
        query_as::<_, TypeVoteTotals>(
            "SELECT type_of_source, sum(likes)::bigint AS likes, sum(dislikes)::bigint AS dislikes
             FROM quotes GROUP BY type_of_source ORDER BY type_of_source",
        )
        .fetch_all(&state.db)
        .await,
    )?;

    let views_by_type = log_query(
        query_as::<_, TypeViewTotals>(
            "SELECT type_of_source, sum(views)::bigint AS views
             FROM quotes GROUP BY type_of_source ORDER BY type_of_source",
        )
        .fetch_all(&state.db)
        .await,
    )?;

    let votes_last_week = log_query(
        query_as::<_, DailyVoteCount>(
            "SELECT created_at::date AS day, direction, count(*) AS total
             FROM quote_votes
             WHERE created_at >= now() - interval '7 days'
             GROUP BY day, direction
             ORDER BY day, direction",
        )
        .fetch_all(&state.db)
        .await,
    )?;

    let top_authors = log_query(
        query_as::<_, AuthorCount>(
            "SELECT author, count(*) AS total
             FROM quotes WHERE author IS NOT NULL
             GROUP BY author ORDER BY total DESC, author ASC LIMIT 5",
        )
        .fetch_all(&state.db)
        .await,
    )?;

    Ok(HttpResponse::Ok().json(DashboardResponse {
        quotes_by_type,
        votes_by_type,
        views_by_type,
        votes_last_week,
        top_authors,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_rejects_bad_fields() {
        assert!(matches!(
            validate_quote_fields("", "Dune (1984)", 1),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            validate_quote_fields("   ", "Dune (1984)", 1),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            validate_quote_fields("Fear is the mind-killer.", "", 1),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            validate_quote_fields("Fear is the mind-killer.", "Dune (1984)", -1),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            validate_quote_fields("Fear is the mind-killer.", &"s".repeat(256), 1),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn validation_accepts_zero_weight() {
        // Weight 0 is legal: the quote just becomes unselectable.
        assert!(validate_quote_fields("Fear is the mind-killer.", "Dune (1984)", 0).is_ok());
    }

    #[test]
    fn validation_counts_source_length_in_characters() {
        // 200 two-byte characters fit in VARCHAR(255) even though they
        // exceed 255 bytes.
        let source = "ц".repeat(200);
        assert!(validate_quote_fields("Fear is the mind-killer.", &source, 1).is_ok());
        let too_long = "ц".repeat(256);
        assert!(matches!(
            validate_quote_fields("Fear is the mind-killer.", &too_long, 1),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn quota_rejects_a_fourth_quote_per_source() {
        assert!(enforce_source_quota(0).is_ok());
        assert!(enforce_source_quota(2).is_ok());
        assert!(matches!(
            enforce_source_quota(3),
            Err(ApiError::SourceQuotaExceeded)
        ));
        assert!(matches!(
            enforce_source_quota(7),
            Err(ApiError::SourceQuotaExceeded)
        ));
    }

    #[test]
    fn padded_source_shares_the_stored_key() {
        // A submission of " Dune " must lock, count and store under the
        // same key as the three existing "Dune" rows.
        assert_eq!(source_key(" Dune "), "Dune");
        assert_eq!(source_key(" Dune "), source_key("Dune"));
        assert_eq!(source_key("\tDune\n"), "Dune");
    }
}
