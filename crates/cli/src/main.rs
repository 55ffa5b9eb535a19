//! Bazaar CLI - shopper and back-office console.
//!
//! # Usage
//!
//! ```bash
//! # Sign in; the credential is kept in BAZAAR_CREDENTIAL_PATH
//! bz login -e jane@example.com -p 'secret'
//!
//! # Browse and shop
//! bz products search kettle
//! bz cart add p-42 --qty 2
//! bz checkout --payment card --coupon WELCOME10
//!
//! # Back office (admin accounts only)
//! bz admin stats
//! bz admin order-status o-17 shipped --notes "left the warehouse"
//! ```
//!
//! Every command restores the session from the stored credential first.
//! Results go to stdout; logs go to stderr and are filtered by `RUST_LOG`
//! (default `bazaar=info`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use bazaar_core::{OrderStatus, UserRole};
use bazaar_storefront::{AppState, ClientConfig, Redirect};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod render;

#[derive(Parser)]
#[command(name = "bz")]
#[command(author, version, about = "Bazaar storefront console")]
struct Cli {
    /// Override `BAZAAR_API_BASE_URL`
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the credential
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Forget the stored credential
    Logout,
    /// Create an account
    Register {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        /// Full name
        #[arg(short, long)]
        name: String,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Show the signed-in identity
    Whoami,
    /// Password recovery and changes
    Password {
        #[command(subcommand)]
        action: PasswordAction,
    },
    /// Confirm an email address with the token from the verification mail
    VerifyEmail { token: String },
    /// Browse the catalog
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// List categories
    Categories,
    /// List brands
    Brands,
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Read notifications
    Notifications {
        #[command(subcommand)]
        action: NotificationAction,
    },
    /// Order history and tracking
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Place an order for everything in the cart
    Checkout {
        /// Saved address to ship to; defaults to the default address
        #[arg(long)]
        address: Option<String>,
        #[arg(long, default_value = "credit_card")]
        payment: String,
        #[arg(long)]
        coupon: Option<String>,
        /// Only print the summary
        #[arg(long)]
        dry_run: bool,
    },
    /// Back-office commands (admin accounts only)
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum PasswordAction {
    /// Send a reset link
    Forgot {
        #[arg(short, long)]
        email: String,
    },
    /// Set a new password with a reset token
    Reset {
        #[arg(long)]
        token: String,
        #[arg(short, long)]
        password: String,
    },
    /// Change the password of the signed-in account
    Change {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// List products
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        brand: Option<String>,
        #[arg(long)]
        min_price: Option<Decimal>,
        #[arg(long)]
        max_price: Option<Decimal>,
        /// Only featured products
        #[arg(long)]
        featured: bool,
    },
    /// Show one product with its reviews
    Show { id: String },
    /// Full-text search
    Search { query: String },
}

#[derive(Subcommand)]
enum CartAction {
    Show,
    Add {
        product: String,
        #[arg(long, default_value_t = 1)]
        qty: u32,
    },
    /// Set a line's quantity; 0 removes it
    Set { line: String, qty: u32 },
    Remove { line: String },
    Clear,
}

#[derive(Subcommand)]
enum WishlistAction {
    Show,
    Add { product: String },
    Remove { product: String },
    Toggle { product: String },
}

#[derive(Subcommand)]
enum NotificationAction {
    List,
    Read { id: String },
    ReadAll,
}

#[derive(Subcommand)]
enum OrderAction {
    List {
        #[arg(long)]
        status: Option<OrderStatus>,
    },
    Show {
        id: String,
    },
    Cancel {
        id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    Track {
        tracking_number: String,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Dashboard statistics
    Stats,
    /// List users
    Users {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        role: Option<UserRole>,
    },
    /// Change a user's role
    UserRole { id: String, role: UserRole },
    Ban {
        id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    Unban {
        id: String,
    },
    /// Move an order to a new status
    OrderStatus {
        id: String,
        status: OrderStatus,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Show store settings
    Settings,
    /// List coupons
    Coupons,
    /// Review moderation queue
    Reviews {
        #[arg(long, default_value = "pending")]
        filter: bazaar_admin::ReviewFilter,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
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

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            commands::fail(&format!("Invalid configuration: {e}"));
            std::process::exit(1);
        }
    };
    if let Some(url) = cli.api_url.clone() {
        config.api_base_url = url;
    }

    // Sentry first so the tracing layer has a client to report to
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bazaar=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        commands::fail(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::from_config(config)?;

    let mut redirects = state.api().subscribe_redirects();
    tokio::spawn(async move {
        while let Ok(Redirect::SignIn) = redirects.recv().await {
            tracing::warn!("Session expired; run `bz login` to sign in again");
        }
    });

    state.session().restore().await;
    commands::account::tag_sentry_user(&state);

    match cli.command {
        Commands::Login { email, password } => {
            commands::account::login(&state, &email, password).await?;
        }
        Commands::Logout => commands::account::logout(&state),
        Commands::Register {
            email,
            password,
            name,
            phone,
        } => commands::account::register(&state, &email, password, name, phone).await?,
        Commands::Whoami => commands::account::whoami(&state),
        Commands::Password { action } => match action {
            PasswordAction::Forgot { email } => {
                commands::account::forgot_password(&state, &email).await?;
            }
            PasswordAction::Reset { token, password } => {
                commands::account::reset_password(&state, &token, password).await?;
            }
            PasswordAction::Change { current, new } => {
                commands::account::change_password(&state, current, new).await?;
            }
        },
        Commands::VerifyEmail { token } => commands::account::verify_email(&state, &token).await?,
        Commands::Products { action } => match action {
            ProductAction::List {
                page,
                limit,
                category,
                brand,
                min_price,
                max_price,
                featured,
            } => {
                if featured {
                    commands::catalog::featured(&state).await?;
                } else {
                    let query = bazaar_storefront::models::ProductQuery {
                        page,
                        limit,
                        category,
                        brand,
                        min_price,
                        max_price,
                        ..Default::default()
                    };
                    commands::catalog::list(&state, &query).await?;
                }
            }
            ProductAction::Show { id } => commands::catalog::show(&state, id).await?,
            ProductAction::Search { query } => commands::catalog::search(&state, &query).await?,
        },
        Commands::Categories => commands::catalog::categories(&state).await?,
        Commands::Brands => commands::catalog::brands(&state).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::shopping::cart_show(&state).await?,
            CartAction::Add { product, qty } => {
                commands::shopping::cart_add(&state, product, qty).await?;
            }
            CartAction::Set { line, qty } => commands::shopping::cart_set(&state, line, qty).await?,
            CartAction::Remove { line } => commands::shopping::cart_remove(&state, line).await?,
            CartAction::Clear => commands::shopping::cart_clear(&state).await?,
        },
        Commands::Wishlist { action } => match action {
            WishlistAction::Show => commands::shopping::wishlist_show(&state).await?,
            WishlistAction::Add { product } => {
                commands::shopping::wishlist_add(&state, product).await?;
            }
            WishlistAction::Remove { product } => {
                commands::shopping::wishlist_remove(&state, product).await?;
            }
            WishlistAction::Toggle { product } => {
                commands::shopping::wishlist_toggle(&state, product).await?;
            }
        },
        Commands::Notifications { action } => match action {
            NotificationAction::List => commands::notifications::list(&state).await?,
            NotificationAction::Read { id } => commands::notifications::read(&state, id).await?,
            NotificationAction::ReadAll => commands::notifications::read_all(&state).await?,
        },
        Commands::Orders { action } => match action {
            OrderAction::List { status } => commands::orders::list(&state, status).await?,
            OrderAction::Show { id } => commands::orders::show(&state, id).await?,
            OrderAction::Cancel { id, reason } => {
                commands::orders::cancel(&state, id, reason.as_deref()).await?;
            }
            OrderAction::Track { tracking_number } => {
                commands::orders::track(&state, &tracking_number).await?;
            }
        },
        Commands::Checkout {
            address,
            payment,
            coupon,
            dry_run,
        } => {
            let request = commands::orders::CheckoutRequest {
                address,
                payment,
                coupon,
                dry_run,
            };
            commands::orders::checkout(&state, request).await?;
        }
        Commands::Admin { action } => {
            let admin = commands::admin::Console::new(&state);
            match action {
                AdminAction::Stats => admin.stats().await?,
                AdminAction::Users { search, role } => admin.users(search, role).await?,
                AdminAction::UserRole { id, role } => admin.user_role(id, role).await?,
                AdminAction::Ban { id, reason } => admin.ban(id, reason.as_deref()).await?,
                AdminAction::Unban { id } => admin.unban(id).await?,
                AdminAction::OrderStatus { id, status, notes } => {
                    admin.order_status(id, status, notes.as_deref()).await?;
                }
                AdminAction::Settings => admin.settings().await?,
                AdminAction::Coupons => admin.coupons().await?,
                AdminAction::Reviews { filter } => admin.reviews(filter).await?,
            }
        }
    }
    Ok(())
}
