use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use sqlx::SqlitePool;

use crate::domain::EmailAddress;
use crate::routes::helpers::{error_chain_fmt, see_other};
use crate::subscriber_store::{self, StoreError, Subscriber};

/// JSON request body carrying a subscriber email
#[derive(serde::Deserialize)]
pub struct SubscriberData {
    email: String,
}

/// Web form data
#[derive(serde::Deserialize)]
pub struct FormData {
    email: String,
}

/// Pagination query parameters
#[derive(serde::Deserialize)]
pub struct Pagination {
    skip: Option<i64>,
    limit: Option<i64>,
}

/// Subscriber endpoint error type
#[derive(thiserror::Error)]
pub enum SubscriberError {
    #[error("{0}")]
    ValidationError(String),
    #[error("email is already registered")]
    DuplicateEmail,
    #[error("subscriber not found")]
    NotFound,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl From<StoreError> for SubscriberError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => Self::DuplicateEmail,
            StoreError::NotFound => Self::NotFound,
            StoreError::Database(e) => Self::UnexpectedError(e.into()),
        }
    }
}

impl fmt::Debug for SubscriberError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SubscriberError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) | Self::DuplicateEmail => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Create subscriber handler
#[tracing::instrument(
    name = "Adding a new subscriber",
    skip(user, db_pool),
    fields(subscriber_email = %user.email)
)]
pub async fn create_subscriber(
    user: web::Json<SubscriberData>,
    db_pool: web::Data<SqlitePool>,
) -> Result<web::Json<Subscriber>, SubscriberError> {
    let email = EmailAddress::parse(user.0.email).map_err(SubscriberError::ValidationError)?;
    let subscriber = subscriber_store::insert_subscriber(&db_pool, &email).await?;
    Ok(web::Json(subscriber))
}

/// List subscribers handler
#[tracing::instrument(name = "Listing subscribers", skip(pagination, db_pool))]
pub async fn list_subscribers(
    pagination: web::Query<Pagination>,
    db_pool: web::Data<SqlitePool>,
) -> Result<web::Json<Vec<Subscriber>>, SubscriberError> {
    let skip = pagination.skip.unwrap_or(0);
    let limit = pagination.limit.unwrap_or(100);
    let subscribers = subscriber_store::list_subscribers(&db_pool, skip, limit).await?;
    Ok(web::Json(subscribers))
}

/// Remove subscriber handler
#[tracing::instrument(
    name = "Removing a subscriber",
    skip(user, db_pool),
    fields(subscriber_email = %user.email)
)]
pub async fn remove_subscriber(
    user: web::Json<SubscriberData>,
    db_pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, SubscriberError> {
    subscriber_store::remove_subscriber(&db_pool, &user.email).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Form-encoded convenience handler to create a subscriber
#[tracing::instrument(
    name = "Adding a new subscriber via form",
    skip(form, db_pool),
    fields(subscriber_email = %form.email)
)]
pub async fn subscribe_form(
    form: web::Form<FormData>,
    db_pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, SubscriberError> {
    let email = EmailAddress::parse(form.0.email).map_err(SubscriberError::ValidationError)?;
    subscriber_store::insert_subscriber(&db_pool, &email).await?;
    Ok(see_other("/"))
}

/// Form-encoded convenience handler to remove a subscriber
#[tracing::instrument(
    name = "Removing a subscriber via form",
    skip(form, db_pool),
    fields(subscriber_email = %form.email)
)]
pub async fn unsubscribe_form(
    form: web::Form<FormData>,
    db_pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, SubscriberError> {
    subscriber_store::remove_subscriber(&db_pool, &form.email).await?;
    Ok(see_other("/"))
}
