//! Nuel Store CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the document and session tables
//! nuel-cli migrate
//!
//! # Load products from a YAML file
//! nuel-cli seed products crates/cli/seed/products.yaml
//!
//! # Give or take away the admin role
//! nuel-cli admin grant admin@example.com
//! nuel-cli admin revoke admin@example.com
//! ```
//!
//! All commands read `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use nuel_store_core::Role;

mod commands;

#[derive(Parser)]
#[command(name = "nuel-cli")]
#[command(author, version, about = "Nuel Store CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations (documents and sessions)
    Migrate,
    /// Seed the document store
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage admin roles
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Add remote products from a YAML file
    Products {
        /// Path to the YAML file
        file: String,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Give a user the admin role
    Grant {
        /// The user's sign-up email
        email: String,
    },
    /// Return a user to the regular role
    Revoke {
        /// The user's sign-up email
        email: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Products { file } => {
                commands::seed::products(&file).await?;
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::Grant { email } => commands::admin::set_role(&email, Role::Admin).await?,
            AdminAction::Revoke { email } => commands::admin::set_role(&email, Role::User).await?,
        },
    }
    Ok(())
}
