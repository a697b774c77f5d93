use tracing::info;

use crate::clock::wall_clock_ms;
use crate::controllers;
use crate::App;

/// Delete pastes that have expired but were never read again.
pub async fn run(app: App) -> anyhow::Result<()> {
    let deleted = controllers::paste::purge_expired(&app, wall_clock_ms()).await?;
    if deleted == 0 {
        info!("no expired pastes to delete");
    }
    app.database.close().await;
    Ok(())
}
