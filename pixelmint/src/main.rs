#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod app;
mod args;

use app::App;
use args::{Args, Command, GenerateCommand, InvoiceCommand};
use clap::Parser;
use pixelmint_config::Config;
use pixelmint_core::UserFacing;
use pixelmint_imagegen::{GenerationRequest, PhotosessionRequest, PromptRequest};
use pixelmint_payments::ReconcileOutcome;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load(&args.config)?;

    // Initialize logging
    pixelmint_telemetry::init(&config.telemetry)?;

    tracing::debug!(config_path = %args.config.display(), "starting pixelmint");

    let app = App::build(&config).await?;

    run(&app, args.command).await
}

async fn run(app: &App, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Balance { user } => {
            let account = app.onboard(user).await?;
            println!("user {user}: {} tokens{}", account.tokens, if account.is_blocked { " (blocked)" } else { "" });
        }
        Command::Grant { user, tokens } => {
            app.onboard(user).await?;
            let balance = app.ledger.add(user, tokens).await?;
            tracing::info!(user_id = user, tokens, balance, "tokens granted");
            println!("user {user}: {balance} tokens");
        }
        Command::Packages => {
            let catalog = app.reconciler.catalog();
            for package in catalog.packages() {
                println!(
                    "{:<12} {:<16} {:>4} tokens  {:>8} ({} {}){}",
                    package.code,
                    package.title,
                    package.tokens,
                    package.price,
                    catalog.crypto_price(package),
                    catalog.asset(),
                    if package.highlight { "  *" } else { "" }
                );
            }
        }
        Command::Generate { kind } => generate(app, kind).await?,
        Command::Invoice { action } => invoice(app, action).await?,
        Command::History { user, limit } => {
            for record in app.studio.history(user, limit).await? {
                println!(
                    "#{:<6} {} {:<12} {:<10} {} tokens  {}  {}",
                    record.id,
                    record.created_at,
                    record.kind,
                    record.status,
                    record.tokens_spent,
                    record.template.as_deref().map_or_else(|| record.prompt.clone(), |t| format!("{t}: {}", record.prompt)),
                    record.result_location.as_deref().unwrap_or("-"),
                );
            }
        }
    }

    Ok(())
}

async fn generate(app: &App, kind: GenerateCommand) -> anyhow::Result<()> {
    let (user, cost, request) = match kind {
        GenerateCommand::Prompt {
            user,
            prompt,
            template,
            references,
        } => (
            user,
            app.prompt_cost(),
            GenerationRequest::Prompt(PromptRequest {
                prompt,
                template,
                references,
            }),
        ),
        GenerateCommand::Photosession {
            user,
            style,
            prompt,
            orientation,
            references,
        } => (
            user,
            app.photosession_cost(),
            GenerationRequest::Photosession(PhotosessionRequest {
                style,
                prompt,
                orientation,
                references,
            }),
        ),
    };

    app.onboard(user).await?;

    match app.studio.run_generation(user, cost, request).await {
        Ok(output) => {
            println!(
                "generation #{} ready: {} (model {}, balance {})",
                output.record_id, output.location, output.image.model, output.balance
            );
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", err.user_message());
            Err(err.into())
        }
    }
}

async fn invoice(app: &App, action: InvoiceCommand) -> anyhow::Result<()> {
    match action {
        InvoiceCommand::Create { user, package } => {
            app.onboard(user).await?;
            let invoice = app.reconciler.create_invoice(user, &package).await.inspect_err(|e| {
                eprintln!("{}", e.user_message());
            })?;
            println!(
                "invoice {}: {} {} for {} tokens\n{}",
                invoice.invoice_id,
                invoice.amount,
                invoice.asset,
                invoice.tokens,
                invoice.invoice_url.as_deref().unwrap_or("-")
            );
        }
        InvoiceCommand::Check { user, invoice } => {
            app.onboard(user).await?;
            let outcome = app.reconciler.reconcile(invoice, user).await.inspect_err(|e| {
                eprintln!("{}", e.user_message());
            })?;
            match outcome {
                ReconcileOutcome::Credited { tokens, balance } => {
                    println!("payment received: +{tokens} tokens, balance {balance}");
                }
                ReconcileOutcome::AlreadyCredited { tokens, balance } => {
                    println!("already credited ({tokens} tokens), balance {balance}");
                }
                ReconcileOutcome::InProgress { tokens, balance } => {
                    println!("payment is being credited ({tokens} tokens), balance {balance}");
                }
                ReconcileOutcome::Pending { status, .. } => {
                    println!("invoice status: {status}");
                }
            }
        }
    }

    Ok(())
}
