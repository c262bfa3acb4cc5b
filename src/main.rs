use std::net::SocketAddr;

use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bazaar::config::Config;
use bazaar::db::{create_pool, init_db, queries, AppState};
use bazaar::handlers;
use bazaar::models::{CreateCategory, CreateProduct, CreateTenant, CreateUser};

#[derive(Parser, Debug)]
#[command(name = "bazaar")]
#[command(about = "Multi-tenant digital goods marketplace backend")]
struct Cli {
    /// Seed the database with dev data (tenant, categories, products, buyer)
    #[arg(long)]
    seed: bool,

    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

/// Seeds the database with dev data for local testing.
/// Creates: two categories (one nested), an onboarded tenant with two
/// products, and a buyer with a session token.
/// Only runs in dev mode and when the database is empty.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let existing = queries::get_tenant_by_slug(&conn, "acme").expect("Failed to query tenants");
    if existing.is_some() {
        tracing::info!("Dev data already present, skipping seed");
        return;
    }

    let software = queries::create_category(
        &conn,
        &CreateCategory {
            name: "Software".to_string(),
            slug: "software".to_string(),
            color: Some("#B5B9F8".to_string()),
            parent_id: None,
        },
    )
    .expect("Failed to create category");

    queries::create_category(
        &conn,
        &CreateCategory {
            name: "Developer Tools".to_string(),
            slug: "developer-tools".to_string(),
            color: None,
            parent_id: Some(software.id.clone()),
        },
    )
    .expect("Failed to create subcategory");

    let tenant = queries::create_tenant(
        &conn,
        &CreateTenant {
            name: "Acme Goods".to_string(),
            slug: "acme".to_string(),
            payout_account_id: "acct_dev_seed".to_string(),
            details_submitted: true,
        },
    )
    .expect("Failed to create tenant");

    for (name, price_cents) in [("Starter Pack", 1000i64), ("Pro Bundle", 2500)] {
        queries::create_product(
            &conn,
            &tenant.id,
            &CreateProduct {
                name: name.to_string(),
                description: Some(format!("{} from the dev seed", name)),
                price_cents,
                currency: Some("usd".to_string()),
                category_id: Some(software.id.clone()),
                refund_policy: Some("30-day".to_string()),
            },
        )
        .expect("Failed to create product");
    }

    let buyer = queries::create_user(
        &conn,
        &CreateUser {
            email: "buyer@dev.local".to_string(),
            name: "Dev Buyer".to_string(),
        },
    )
    .expect("Failed to create buyer");

    let token = queries::create_session(&conn, &buyer.id, None).expect("Failed to create session");

    tracing::info!("============================================");
    tracing::info!("DEV SEED COMPLETE");
    tracing::info!("Tenant: {} (slug: acme)", tenant.name);
    tracing::info!("Buyer:  {} ({})", buyer.name, buyer.email);
    tracing::info!("Bearer token: {}", token);
    tracing::info!("============================================");
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bazaar=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match config.payment_provider {
        bazaar::payments::PaymentProvider::Stripe => {
            assert!(
                config.stripe.is_some(),
                "PAYMENT_PROVIDER=stripe requires STRIPE_SECRET_KEY and STRIPE_WEBHOOK_SECRET"
            );
        }
        bazaar::payments::PaymentProvider::Razorpay => {
            assert!(
                config.razorpay.is_some(),
                "PAYMENT_PROVIDER=razorpay requires RAZORPAY_KEY_ID, RAZORPAY_KEY_SECRET and RAZORPAY_WEBHOOK_SECRET"
            );
        }
    }

    let pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = pool.get().expect("Failed to get database connection");
        init_db(&conn).expect("Failed to initialize database schema");

        // Abandoned carts only; completed sessions document orders.
        let purged = queries::purge_old_checkout_sessions(&conn, config.checkout_session_retention_days)
            .expect("Failed to purge old checkout sessions");
        if purged > 0 {
            tracing::info!("Purged {} abandoned checkout sessions", purged);
        }
    }

    let state = AppState {
        db: pool,
        app_url: config.app_url.clone(),
        platform_fee_bps: config.platform_fee_bps,
        payment_provider: config.payment_provider,
        stripe: config.stripe.clone(),
        razorpay: config.razorpay.clone(),
    };

    if cli.seed {
        if config.dev_mode {
            seed_dev_data(&state);
        } else {
            tracing::warn!("--seed ignored outside dev mode (set BAZAAR_ENV=dev)");
        }
    }

    let app = handlers::router_with_rate_limits(state).layer(TraceLayer::new_for_http());

    let addr = config.addr();
    tracing::info!(
        "bazaar listening on {} (provider: {}, fee: {}bps)",
        addr,
        config.payment_provider.as_str(),
        config.platform_fee_bps
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");

    if cli.ephemeral && config.dev_mode {
        let _ = std::fs::remove_file(&config.database_path);
        tracing::info!("Ephemeral mode: database deleted");
    }
}
