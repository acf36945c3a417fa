//! Harbor CLI - drive the storefront core from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Log in (prompts for the password)
//! harbor login -e user@example.com --remember-me
//!
//! # Walk through the three-step password reset
//! harbor forgot-password -e user@example.com
//!
//! # Work with the cart
//! harbor cart add p-100
//! harbor cart qty p-100 3
//! harbor cart show
//!
//! # Show or edit the profile
//! harbor profile show
//! harbor profile update --name "Ada" --address "Taipei CityDa'an District 1 Road"
//! ```
//!
//! # Commands
//!
//! - `login`, `signup`, `forgot-password`, `logout`, `whoami` - account
//! - `cart` - cart contents and pricing
//! - `profile` - profile of the logged-in user
//!
//! Configuration comes from the environment (see `harbor_storefront::config`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sentry::ClientInitGuard;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use harbor_storefront::config::StorefrontConfig;
use harbor_storefront::{AppError, AppState};

mod commands;

#[derive(Parser)]
#[command(name = "harbor")]
#[command(author, version, about = "Harbor storefront client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and keep the session on disk
    Login {
        /// Account email; prompted for when omitted
        #[arg(short, long)]
        email: Option<String>,

        /// Ask the backend for a long-lived session
        #[arg(long)]
        remember_me: bool,
    },
    /// Create an account
    Signup {
        /// Account email; prompted for when omitted
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Reset a forgotten password with an emailed code
    ForgotPassword {
        /// Account email; prompted for when omitted
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show who is logged in
    Whoami,
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Show or edit the profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show items, add-ons and totals
    Show,
    /// Add one unit of a catalog product
    Add {
        /// Product ID from the catalog
        product_id: String,
    },
    /// Remove a product from the cart
    Remove { product_id: String },
    /// Set the quantity of a line; values below 1 become 1
    Qty {
        product_id: String,
        #[arg(allow_hyphen_values = true)]
        quantity: i64,
    },
    /// Flip whether a line counts toward the total
    Toggle { product_id: String },
    /// Select every line, or deselect with `--none`
    SelectAll {
        #[arg(long)]
        none: bool,
    },
    /// Apply a discount amount; negative values become 0
    Discount {
        #[arg(allow_hyphen_values = true)]
        amount: rust_decimal::Decimal,
    },
    /// Remove every line and the discount
    Clear,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Print the profile with its parsed address
    Show,
    /// Change profile fields; omitted fields are left as they are
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        /// Full address line; split into city, district and detail
        #[arg(long)]
        address: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize Sentry before tracing so the sentry layer has a client
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => {
            e.report();
            return ExitCode::FAILURE;
        }
    };

    match run(&state, cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            e.report();
            commands::print_failure(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(state: &AppState, cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Commands::Login { email, remember_me } => {
            commands::account::login(state, email, remember_me).await
        }
        Commands::Signup { email } => commands::account::signup(state, email).await,
        Commands::ForgotPassword { email } => {
            commands::account::forgot_password(state, email).await
        }
        Commands::Logout => {
            commands::account::logout(state);
            Ok(())
        }
        Commands::Whoami => {
            commands::account::whoami(state);
            Ok(())
        }
        Commands::Cart { action } => run_cart(state, action),
        Commands::Profile { action } => match action {
            ProfileAction::Show => commands::profile::show(state).await,
            ProfileAction::Update {
                name,
                phone,
                address,
            } => commands::profile::update(state, name, phone, address).await,
        },
    }
}

fn run_cart(state: &AppState, action: CartAction) -> Result<(), AppError> {
    use commands::cart;

    match action {
        CartAction::Show => cart::show(state),
        CartAction::Add { product_id } => cart::add(state, &product_id),
        CartAction::Remove { product_id } => cart::remove(state, &product_id),
        CartAction::Qty {
            product_id,
            quantity,
        } => cart::set_quantity(state, &product_id, quantity),
        CartAction::Toggle { product_id } => cart::toggle(state, &product_id),
        CartAction::SelectAll { none } => cart::select_all(state, !none),
        CartAction::Discount { amount } => cart::discount(state, amount),
        CartAction::Clear => cart::clear(state),
    }
}

/// Initialize Sentry error tracking.
///
/// Returns a guard that must be kept alive for the duration of the program.
fn init_sentry(config: &StorefrontConfig) -> Option<ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config.sentry_environment.clone().map(Into::into),
            attach_stacktrace: true,
            send_default_pii: false,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Initialize tracing on stderr, forwarding warnings and errors to Sentry.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("harbor_storefront=warn,harbor_cli=info"));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .try_init();
}

/// Errors become Sentry events; warnings and info become breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}
