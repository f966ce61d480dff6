use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pixelmint_imagegen::Orientation;

/// Pixelmint operator CLI
#[derive(Debug, Parser)]
#[command(name = "pixelmint", about = "Token ledger, payments and image generation for the pixelmint bot")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "pixelmint.toml", env = "PIXELMINT_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show a user's token balance
    Balance {
        /// Chat user id
        #[arg(long)]
        user: i64,
    },
    /// Add tokens to a user's balance
    Grant {
        /// Chat user id
        #[arg(long)]
        user: i64,
        /// Tokens to add
        #[arg(long)]
        tokens: u64,
    },
    /// List purchasable token packages
    Packages,
    /// Run a charged image generation
    Generate {
        #[command(subcommand)]
        kind: GenerateCommand,
    },
    /// Crypto Pay invoices
    Invoice {
        #[command(subcommand)]
        action: InvoiceCommand,
    },
    /// Show recent generations of a user
    History {
        /// Chat user id
        #[arg(long)]
        user: i64,
        /// Number of records
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Debug, Subcommand)]
pub enum GenerateCommand {
    /// Free-form prompt
    Prompt {
        /// Chat user id
        #[arg(long)]
        user: i64,
        /// What to draw
        #[arg(long)]
        prompt: String,
        /// Template prefix, e.g. a style name
        #[arg(long)]
        template: Option<String>,
        /// Reference image (repeatable)
        #[arg(long = "reference")]
        references: Vec<PathBuf>,
    },
    /// Styled photosession from reference faces
    Photosession {
        /// Chat user id
        #[arg(long)]
        user: i64,
        /// Style name
        #[arg(long)]
        style: String,
        /// Optional prompt replacing the generic style description
        #[arg(long)]
        prompt: Option<String>,
        /// vertical, horizontal or any
        #[arg(long, default_value = "vertical")]
        orientation: Orientation,
        /// Reference image (repeatable)
        #[arg(long = "reference")]
        references: Vec<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum InvoiceCommand {
    /// Issue an invoice for a package
    Create {
        /// Chat user id
        #[arg(long)]
        user: i64,
        /// Package code
        #[arg(long)]
        package: String,
    },
    /// Check an invoice and credit it if paid
    Check {
        /// Chat user id
        #[arg(long)]
        user: i64,
        /// Crypto Pay invoice id
        #[arg(long)]
        invoice: i64,
    },
}
