//! ABC Retail CLI - Storage provisioning and account management.
//!
//! # Usage
//!
//! ```bash
//! # Create every table, the audit queue and the invoice share
//! abc-cli provision
//!
//! # Give an existing customer the administrator role
//! abc-cli customer promote --email admin@example.com
//! ```
//!
//! Configuration is read from the same environment variables as the
//! storefront (`STOREFRONT_DATABASE_URL`, table names, share root).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "abc-cli")]
#[command(author, version, about = "ABC Retail CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create all storage containers if absent
    Provision,
    /// Manage customer accounts
    Customer {
        #[command(subcommand)]
        action: CustomerAction,
    },
}

#[derive(Subcommand)]
enum CustomerAction {
    /// Grant the administrator role
    Promote {
        /// Email address of the customer
        #[arg(short, long)]
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

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Provision => commands::provision::run().await?,
        Commands::Customer { action } => match action {
            CustomerAction::Promote { email } => {
                commands::customer::promote_by_email(&email).await?;
            }
        },
    }
    Ok(())
}
