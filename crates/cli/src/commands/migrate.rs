//! Database migrations.
//!
//! ```bash
//! ps-cli migrate
//! ```
//!
//! Migration files live in `crates/storefront/migrations/`.

use super::{CommandError, connect};

/// Run the storefront migrations.
pub async fn run() -> Result<(), CommandError> {
    let client = connect().await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations")
        .run(client.pool())
        .await?;

    tracing::info!("Storefront migrations complete");
    Ok(())
}
