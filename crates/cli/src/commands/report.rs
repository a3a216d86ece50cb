//! Cross-tenant reports under the service access mode.
//!
//! ```bash
//! SERVICE_TOKEN=... ps-cli report orders --token "$SERVICE_TOKEN"
//! ```

use paintstore_storefront::config::service_token_from_env;
use paintstore_storefront::scope::{PlatformRepository, ServiceCredential, ServiceScope};
use secrecy::SecretString;

use super::{CommandError, connect};

/// Print order count and revenue per tenant as JSON lines.
#[allow(clippy::print_stdout)]
pub async fn orders(token: String) -> Result<(), CommandError> {
    dotenvy::dotenv().ok();
    let expected = service_token_from_env()?.map(|t| ServiceCredential::new(&t));
    let scope = ServiceScope::authorize("report-orders", &SecretString::from(token), expected.as_ref())?;

    let client = connect().await?;
    let totals = PlatformRepository::new(&client, &scope)
        .order_totals_by_tenant()
        .await?;

    for row in &totals {
        println!("{}", serde_json::to_string(row)?);
    }
    tracing::info!(tenants = totals.len(), "order report complete");
    Ok(())
}
