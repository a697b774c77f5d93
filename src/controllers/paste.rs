use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::Paste;
use crate::types::api::NewPaste;
use crate::App;

/// Store a validated paste under a fresh id.
pub async fn create(app: &App, new_paste: NewPaste, now: i64) -> ApiResult<Paste> {
    let id = Uuid::new_v4().to_string();
    let paste = new_paste.into_paste(id, now)?;

    info!(
        "new paste: id='{id}', size={size}, expires_at={expires_at:?}, max_views={views:?}",
        id = paste.id,
        size = paste.content.len(),
        expires_at = paste.expires_at,
        views = paste.remaining_views,
    );

    app.database.insert_paste(&paste).await?;

    Ok(paste)
}

/// Fetch a paste, spending one of its views.
pub async fn consume(app: &App, id: &str, now: i64) -> ApiResult<Paste> {
    let paste = app
        .database
        .read_and_consume(id, now)
        .await?
        .ok_or(ApiError::NotFound)?;
    debug!("consumed view of paste {id}, remaining={:?}", paste.remaining_views);
    Ok(paste)
}

/// Fetch a paste without spending a view.
pub async fn peek(app: &App, id: &str, now: i64) -> ApiResult<Paste> {
    app.database
        .read_without_consuming(id, now)
        .await?
        .ok_or(ApiError::NotFound)
}

pub async fn purge_expired(app: &App, now: i64) -> ApiResult<u64> {
    let count = app.database.purge_expired(now).await?;

    if count > 0 {
        info!("deleted {count} expired pastes");
    }

    Ok(count)
}
