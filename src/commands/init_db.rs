use tracing::info;

use crate::App;

pub async fn run(app: App) -> anyhow::Result<()> {
    app.database.init_schema().await?;
    info!("paste table ready");
    app.database.close().await;
    Ok(())
}
