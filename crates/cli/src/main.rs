//! Tienda CLI - storefront session, cart and orders from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (the credential is kept in ~/.tienda/credentials.json)
//! tienda login -e ana@example.com -p secret
//!
//! # Show who is signed in
//! tienda whoami
//!
//! # Cart
//! tienda cart show
//! tienda cart add 665f1c0e9b1e8a0012345678 -q 2
//! tienda cart clear
//!
//! # Order everything in the cart
//! tienda order --street "Juárez" --number 12 --neighborhood Centro --municipality Guadalupe
//!
//! # Sign out
//! tienda logout
//! ```
//!
//! # Environment Variables
//!
//! - `TIENDA_API_URL` - Backend origin (default `http://localhost:4000`)
//! - `TIENDA_CREDENTIAL_FILE` - Where the session credential is persisted
//! - `TIENDA_LOG_FORMAT` - `json` for structured logs on stderr
//! - `SENTRY_DSN` - Enables error tracking
//! - `RUST_LOG` - Log filter (default `info`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tienda_client::ClientConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

use commands::CliError;

#[derive(Parser)]
#[command(name = "tienda")]
#[command(author, version, about = "Tienda storefront client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the session
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "TIENDA_PASSWORD", hide_env_values = true)]
        password: String,

        /// Anti-bot challenge token
        #[arg(long)]
        captcha: Option<String>,
    },
    /// Create an account and sign in as it
    Register {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "TIENDA_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the session
    Logout,
    /// Show the signed-in identity
    Whoami,
    /// Inspect or change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Order everything in the cart
    Order(commands::order::OrderArgs),
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        /// Product id
        product: String,

        /// Units to add (values below 1 are sent as 1)
        #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove everything
    Clear,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    let json = std::env::var("TIENDA_LOG_FORMAT").is_ok_and(|format| format == "json");

    // Logs go to stderr; stdout is for command output.
    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration first (needed for Sentry init)
    let config = ClientConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    init_tracing();

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: &ClientConfig) -> Result<(), CliError> {
    let storefront = commands::open(config)?;

    match cli.command {
        Commands::Login {
            email,
            password,
            captcha,
        } => commands::session::login(&storefront, email, password, captcha).await,
        Commands::Register {
            name,
            email,
            password,
        } => commands::session::register(&storefront, name, email, password).await,
        Commands::Logout => commands::session::logout(&storefront).await,
        Commands::Whoami => commands::session::whoami(&storefront).await,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&storefront).await,
            CartAction::Add { product, quantity } => {
                commands::cart::add(&storefront, &product, quantity).await
            }
            CartAction::Clear => commands::cart::clear(&storefront).await,
        },
        Commands::Order(args) => commands::order::place(&storefront, &args).await,
    }
}
