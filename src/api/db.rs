use std::future::Future;

use log::{log, Level};
use sqlx::{Pool, Postgres, Transaction};

use crate::errors::ApiError;

pub async fn open_transaction(
    db: &Pool<Postgres>,
) -> Result<Transaction<'static, Postgres>, ApiError> {
    match db.begin().await {
        Ok(transaction) => Ok(transaction),
        Err(err) => {
            log!(Level::Error, "Failed to open transaction: {}", err);
            Err(err.into())
        }
    }
}

/// Log a failed query before converting it. Rollback happens implicitly
/// when the erroring transaction is dropped by the caller's `?`.
pub fn log_query<T>(result: Result<T, sqlx::Error>) -> Result<T, ApiError> {
    result.map_err(|err| {
        log!(Level::Warn, "Query failed: {}", err);
        err.into()
    })
}

/// Run a transactional unit of work, rerunning it exactly once if it fails
/// on a Postgres serialization failure or deadlock. A second conflict
/// surfaces as a transient error to the client.
pub async fn retry_transient<T, Fut>(mut op: impl FnMut() -> Fut) -> Result<T, ApiError>
where
    Fut: Future<Output = Result<T, ApiError>>,
{
    match op().await {
        Err(err) if err.is_transient_conflict() => {
            log!(Level::Warn, "Transaction conflict, retrying once: {}", err);
            op().await.map_err(|err| {
                if err.is_transient_conflict() {
                    ApiError::Transient
                } else {
                    err
                }
            })
        }
        other => other,
    }
}

/// Whether a database error is a unique violation on the named constraint.
pub fn violates_unique(err: &ApiError, constraint: &str) -> bool {
    match err {
        ApiError::Sqlx(sqlx::Error::Database(db_err)) => {
            db_err.code().as_deref() == Some("23505")
                && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn retry_reruns_only_transient_failures() {
        let mut calls = 0;
        let result: Result<(), ApiError> = retry_transient(|| {
            calls += 1;
            async { Err(ApiError::DuplicateVote) }
        })
        .await;
        assert!(matches!(result, Err(ApiError::DuplicateVote)));
        assert_eq!(calls, 1);
    }

    #[actix_web::test]
    async fn retry_passes_through_success() {
        let result = retry_transient(|| async { Ok::<_, ApiError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }
}
