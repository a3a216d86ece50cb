//! Paintstore CLI - migrations, tenant roles and platform reports.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! ps-cli migrate
//!
//! # List active tenants
//! ps-cli tenants list
//!
//! # Grant or revoke a tenant role
//! ps-cli roles grant -t pinteya -p 6f1c...-... -r tenant_staff --permissions '{"orders":{"view":true}}'
//! ps-cli roles revoke -t pinteya -p 6f1c...-...
//!
//! # Shared stock pools
//! ps-cli pools create --name "Depósito central" --quantity 120
//! ps-cli pools share -t pinteya --pool 9a2e...-...
//!
//! # Platform super admins
//! ps-cli super-admin grant -p 6f1c...-...
//!
//! # Cross-tenant order report (service mode)
//! ps-cli report orders --token "$SERVICE_TOKEN"
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ps-cli")]
#[command(author, version, about = "Paintstore platform CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Inspect the tenant registry
    Tenants {
        #[command(subcommand)]
        action: TenantsAction,
    },
    /// Manage per-tenant roles
    Roles {
        #[command(subcommand)]
        action: RolesAction,
    },
    /// Manage shared stock pools and which tenants may use them
    Pools {
        #[command(subcommand)]
        action: PoolsAction,
    },
    /// Manage the platform super-admin flag
    SuperAdmin {
        #[command(subcommand)]
        action: SuperAdminAction,
    },
    /// Cross-tenant reports (requires the service token)
    Report {
        #[command(subcommand)]
        report: Report,
    },
}

#[derive(Subcommand)]
enum TenantsAction {
    /// List active tenants
    List,
}

#[derive(Subcommand)]
enum RolesAction {
    /// Grant a role in one tenant (replaces any existing assignment)
    Grant {
        /// Tenant slug
        #[arg(short, long)]
        tenant: String,

        /// Principal id (UUID)
        #[arg(short, long)]
        principal: String,

        /// Role (`tenant_staff`, `tenant_admin`)
        #[arg(short, long, default_value = "tenant_staff")]
        role: String,

        /// Permission matrix as JSON (ignored for `tenant_admin`)
        #[arg(long)]
        permissions: Option<String>,
    },
    /// Revoke a principal's role in one tenant
    Revoke {
        /// Tenant slug
        #[arg(short, long)]
        tenant: String,

        /// Principal id (UUID)
        #[arg(short, long)]
        principal: String,
    },
}

#[derive(Subcommand)]
enum PoolsAction {
    /// Create a shared stock pool
    Create {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Units in the pool
        #[arg(short, long, default_value_t = 0)]
        quantity: i64,
    },
    /// Allow a tenant to link products to a pool
    Share {
        /// Tenant slug
        #[arg(short, long)]
        tenant: String,

        /// Pool id (UUID)
        #[arg(long)]
        pool: String,
    },
    /// Withdraw a pool from a tenant
    Unshare {
        /// Tenant slug
        #[arg(short, long)]
        tenant: String,

        /// Pool id (UUID)
        #[arg(long)]
        pool: String,
    },
}

#[derive(Subcommand)]
enum SuperAdminAction {
    /// Flag a principal as super admin
    Grant {
        /// Principal id (UUID)
        #[arg(short, long)]
        principal: String,
    },
    /// Remove the super-admin flag
    Revoke {
        /// Principal id (UUID)
        #[arg(short, long)]
        principal: String,
    },
}

#[derive(Subcommand)]
enum Report {
    /// Order count and revenue per tenant
    Orders {
        /// Service token to present
        #[arg(long, env = "PS_SERVICE_TOKEN", hide_env_values = true)]
        token: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ps_cli=info,paintstore_storefront=info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Tenants { action } => match action {
            TenantsAction::List => commands::tenants::list().await?,
        },
        Commands::Roles { action } => match action {
            RolesAction::Grant {
                tenant,
                principal,
                role,
                permissions,
            } => {
                commands::roles::grant(&tenant, &principal, &role, permissions.as_deref()).await?;
            }
            RolesAction::Revoke { tenant, principal } => {
                commands::roles::revoke(&tenant, &principal).await?;
            }
        },
        Commands::Pools { action } => match action {
            PoolsAction::Create { name, quantity } => commands::pools::create(&name, quantity).await?,
            PoolsAction::Share { tenant, pool } => commands::pools::share(&tenant, &pool).await?,
            PoolsAction::Unshare { tenant, pool } => commands::pools::unshare(&tenant, &pool).await?,
        },
        Commands::SuperAdmin { action } => match action {
            SuperAdminAction::Grant { principal } => commands::roles::grant_super(&principal).await?,
            SuperAdminAction::Revoke { principal } => {
                commands::roles::revoke_super(&principal).await?;
            }
        },
        Commands::Report { report } => match report {
            Report::Orders { token } => commands::report::orders(token).await?,
        },
    }
    Ok(())
}
