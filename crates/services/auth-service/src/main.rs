//! Auth Service - command line front end for the token lifecycle.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use auth_service_lib::config::AuthServiceConfig;
use auth_service_lib::service::TokenLifecycle;
use auth_service_lib::MigrateAction;
use common::AppError;

#[derive(Parser)]
#[command(name = "auth-service")]
#[command(about = "Account and token lifecycle service")]
struct Cli {
    /// Log at debug level regardless of RUST_LOG
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database migration commands
    Migrate {
        #[command(subcommand)]
        action: MigrateCommands,
    },
    #[command(flatten)]
    Operation(Operation),
}

/// Commands run against the lifecycle service.
#[derive(Subcommand)]
enum Operation {
    /// Create an account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long, env = "AUTH_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log in and print an access/refresh pair
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "AUTH_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value = "127.0.0.1")]
        ip: String,
    },
    /// Check an access token and print its account id
    Validate {
        #[arg(long)]
        token: String,
    },
    /// Rotate a refresh token
    Refresh {
        #[arg(long)]
        token: String,
    },
    /// Revoke an access token
    Logout {
        #[arg(long)]
        token: String,
    },
    /// Print the account behind an access token
    Whoami {
        #[arg(long)]
        token: String,
    },
    /// Change the password of the account behind an access token
    ChangePassword {
        #[arg(long)]
        token: String,
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },
    /// Block an account permanently
    Block {
        #[arg(long)]
        id: Uuid,
        #[arg(long, default_value = "blocked by administrator")]
        reason: String,
    },
    /// Deactivate an account
    Deactivate {
        #[arg(long)]
        id: Uuid,
    },
    /// Reactivate an inactive account
    Activate {
        #[arg(long)]
        id: Uuid,
    },
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset database and run all migrations
    Fresh,
}

#[derive(Serialize)]
struct ErrorOutput {
    error: &'static str,
    message: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AuthServiceConfig::from_env()?;

    match cli.command {
        Commands::Migrate { action } => {
            let migrate_action = match action {
                MigrateCommands::Up => MigrateAction::Up,
                MigrateCommands::Down => MigrateAction::Down,
                MigrateCommands::Status => MigrateAction::Status,
                MigrateCommands::Fresh => MigrateAction::Fresh,
            };
            auth_service_lib::run_migrations(&config, migrate_action).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Operation(operation) => {
            let service = auth_service_lib::connect(&config).await?;
            Ok(execute(&service, operation).await)
        }
    }
}

async fn execute(service: &impl TokenLifecycle, operation: Operation) -> ExitCode {
    match operation {
        Operation::Register {
            email,
            name,
            password,
        } => render(service.register(&email, &name, &password).await),
        Operation::Login {
            email,
            password,
            ip,
        } => render(service.login(&email, &password, &ip).await),
        Operation::Validate { token } => render(
            service
                .validate_access(&token)
                .await
                .map(|id| serde_json::json!({ "user_id": id })),
        ),
        Operation::Refresh { token } => render(service.refresh(&token).await),
        Operation::Logout { token } => render(
            service
                .logout(&token)
                .await
                .map(|()| serde_json::json!({ "logged_out": true })),
        ),
        Operation::Whoami { token } => {
            let account = match service.validate_access(&token).await {
                Ok(id) => service.get_account(id).await,
                Err(e) => Err(e),
            };
            render(account)
        }
        Operation::ChangePassword {
            token,
            current,
            new,
        } => {
            let changed = match service.validate_access(&token).await {
                Ok(id) => service.change_password(id, &current, &new).await,
                Err(e) => Err(e),
            };
            render(changed.map(|()| serde_json::json!({ "password_changed": true })))
        }
        Operation::Block { id, reason } => render(service.block_account(id, &reason).await),
        Operation::Deactivate { id } => render(service.deactivate_account(id).await),
        Operation::Activate { id } => render(service.activate_account(id).await),
    }
}

/// Print a result as JSON: the value on stdout, or the error code on stderr.
fn render<T: Serialize>(result: Result<T, AppError>) -> ExitCode {
    match result {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("failed to encode output: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            let output = ErrorOutput {
                error: err.code(),
                message: err.user_message(),
            };
            match serde_json::to_string_pretty(&output) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("{}", err),
            }
            ExitCode::FAILURE
        }
    }
}
