//! Tuition server binary.

use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tuition_server::{stdio, Args, Command, Database, RequestHandler};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout carries responses and command output.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tuition_server=info,tuition_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = args.to_config();

    tracing::debug!(
        data_path = %config.data_path.display(),
        temporary = config.temporary,
        referential_policy = %config.referential_policy,
        unlabeled_access = %config.unlabeled_access,
        "configuration loaded"
    );

    match &args.command {
        Command::Export { output } => {
            let export = Database::declared_schema(&config)?.to_json()?;
            match output {
                Some(path) => {
                    std::fs::write(path, export)?;
                    tracing::info!(path = %path.display(), "schema exported");
                }
                None => println!("{}", export),
            }
        }
        Command::Provision => {
            let database = Database::open(&config)?;
            database.flush()?;
            tracing::info!(
                schema_version = database.schema_version(),
                "schema provisioned"
            );
        }
        Command::IssueKey { description } => {
            let database = Database::open(&config)?;
            let issued = database
                .api_keys()
                .issue(description.as_deref(), Utc::now())?;
            database.flush()?;
            println!("{}", serde_json::to_string_pretty(&issued)?);
        }
        Command::RotateKey { description } => {
            let database = Database::open(&config)?;
            let issued = database
                .api_keys()
                .rotate(description.as_deref(), Utc::now())?;
            database.flush()?;
            println!("{}", serde_json::to_string_pretty(&issued)?);
        }
        Command::Serve => {
            tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting tuition server");
            let database = Arc::new(Database::open(&config)?);
            let handler = Arc::new(RequestHandler::from_config(database.clone(), &config)?);

            tracing::info!(schema_version = database.schema_version(), "server ready, reading stdin");
            let handled = stdio(handler).run()?;
            database.flush()?;
            tracing::info!(requests = handled, "server shutdown complete");
        }
    }

    Ok(())
}
