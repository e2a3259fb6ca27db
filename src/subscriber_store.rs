use chrono::Utc;
use sqlx::SqlitePool;

use crate::domain::EmailAddress;

/// Subscriber record
#[derive(Debug, serde::Serialize, sqlx::FromRow)]
pub struct Subscriber {
    pub id: i64,
    pub email: String,
}

/// Subscriber store error type
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email is already registered")]
    DuplicateEmail,
    #[error("subscriber not found")]
    NotFound,
    #[error("a database error was encountered")]
    Database(#[source] sqlx::Error),
}

/// Insert a subscriber into the database and return the stored record
#[tracing::instrument(name = "Saving new subscriber details in the database", skip(db_pool))]
pub async fn insert_subscriber(
    db_pool: &SqlitePool,
    email: &EmailAddress,
) -> Result<Subscriber, StoreError> {
    sqlx::query_as::<_, Subscriber>(
        r"
        INSERT INTO subscribers (email, subscribed_at)
        VALUES ($1, $2)
        RETURNING id, email
        ",
    )
    .bind(email.as_ref())
    .bind(Utc::now())
    .fetch_one(db_pool)
    .await
    .map_err(|e| {
        if e.as_database_error()
            .is_some_and(|db_err| db_err.is_unique_violation())
        {
            StoreError::DuplicateEmail
        } else {
            tracing::error!("Failed to execute query: {e:?}");
            StoreError::Database(e)
        }
    })
}

/// List subscribers, ordered by id
#[tracing::instrument(name = "Listing subscribers", skip(db_pool))]
pub async fn list_subscribers(
    db_pool: &SqlitePool,
    skip: i64,
    limit: i64,
) -> Result<Vec<Subscriber>, StoreError> {
    sqlx::query_as::<_, Subscriber>(
        r"
        SELECT id, email
        FROM subscribers
        ORDER BY id
        LIMIT $1 OFFSET $2
        ",
    )
    .bind(limit)
    .bind(skip)
    .fetch_all(db_pool)
    .await
    .map_err(StoreError::Database)
}

/// Remove a subscriber by email
#[tracing::instrument(name = "Removing subscriber from the database", skip(db_pool))]
pub async fn remove_subscriber(db_pool: &SqlitePool, email: &str) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM subscribers WHERE email = $1")
        .bind(email)
        .execute(db_pool)
        .await
        .map_err(StoreError::Database)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

/// Get the email addresses of all current subscribers
#[tracing::instrument(name = "Getting subscriber emails", skip(db_pool))]
pub async fn subscriber_emails(db_pool: &SqlitePool) -> Result<Vec<String>, StoreError> {
    let rows = sqlx::query_scalar::<_, String>("SELECT email FROM subscribers ORDER BY id")
        .fetch_all(db_pool)
        .await
        .map_err(StoreError::Database)?;

    Ok(rows)
}
