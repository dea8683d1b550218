use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use diesel::prelude::*;
use famiglia_server::api::public::auth::find_user_by_email;
use famiglia_server::auth::{clean_expired, hash_register_key};
use famiglia_server::config::Config;
use famiglia_server::db::{create_pool, DbPool};
use famiglia_server::labels::seed_from_file;
use famiglia_server::llm::{LlmProvider, OpenRouterProvider};
use famiglia_server::mail::mailer_from_config;
use famiglia_server::models::Role;
use famiglia_server::schema::users;
use famiglia_server::telemetry::init_telemetry;
use famiglia_server::{api, app, AppState};
use std::sync::Arc;
use std::time::Duration;

/// How often expired sessions and verification tokens are purged.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Parser)]
#[command(name = "famiglia-server")]
#[command(about = "Famiglia Recipes API server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed labels, start the cleanup task and serve HTTP (default)
    Serve,
    /// Insert or update labels from LABELS_FILE or the built-in set
    SeedLabels,
    /// Print REGISTER_KEY_SALT and REGISTER_KEY_HASH lines for a register key
    HashRegisterKey {
        /// The key family members will type when signing up
        key: String,
    },
    /// Change a user's role
    SetRole {
        email: String,
        /// user, manager or admin
        role: Role,
    },
    /// Print the OpenAPI document and exit
    Openapi,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Openapi => {
            let spec = api::openapi()
                .to_pretty_json()
                .context("failed to render OpenAPI document")?;
            println!("{}", spec);
            Ok(())
        }
        Commands::HashRegisterKey { key } => {
            let Some((salt, hash)) = hash_register_key(&key) else {
                bail!("failed to hash register key");
            };
            println!("REGISTER_KEY_SALT={}", salt);
            println!("REGISTER_KEY_HASH={}", hash);
            Ok(())
        }
        Commands::SeedLabels => {
            let (config, pool) = setup()?;
            let mut conn = pool.get()?;
            let count = seed_from_file(&mut conn, config.labels_file.as_deref())?;
            println!("Seeded {} labels", count);
            Ok(())
        }
        Commands::SetRole { email, role } => {
            let (_, pool) = setup()?;
            let mut conn = pool.get()?;
            let Some(user) = find_user_by_email(&mut conn, &email)? else {
                bail!("no user with email {}", email);
            };
            diesel::update(users::table.find(user.id))
                .set(users::role.eq(role.as_str()))
                .execute(&mut conn)?;
            println!("{} is now {}", user.email, role);
            Ok(())
        }
        Commands::Serve => serve().await,
    }
}

/// Loads `.env`, logging, configuration and the database.
fn setup() -> Result<(Config, DbPool)> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: could not read .env: {}", e);
        }
    }
    init_telemetry();

    let config = Config::from_env().context("invalid configuration")?;
    let pool = create_pool(&config.database_url)
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    Ok((config, pool))
}

fn llm_from_config(config: &Config) -> Option<Arc<dyn LlmProvider>> {
    match &config.open_router {
        Some(settings) => {
            tracing::info!(model = %settings.model, "recipe extraction enabled");
            Some(Arc::new(OpenRouterProvider::new(
                settings.api_key.clone(),
                settings.model.clone(),
            )))
        }
        None => {
            tracing::warn!("OPEN_ROUTER_API_KEY not set, recipe extraction disabled");
            None
        }
    }
}

fn spawn_cleanup(pool: Arc<DbPool>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let pool = pool.clone();
            let result = tokio::task::spawn_blocking(move || {
                let mut conn = pool.get().map_err(|e| e.to_string())?;
                clean_expired(&mut conn).map_err(|e| e.to_string())
            })
            .await;
            match result {
                Ok(Ok((sessions, verifications))) => {
                    tracing::debug!(sessions, verifications, "expired tokens cleaned")
                }
                Ok(Err(e)) => tracing::error!(error = %e, "token cleanup failed"),
                Err(e) => tracing::error!(error = %e, "token cleanup task panicked"),
            }
        }
    });
}

async fn serve() -> Result<()> {
    let (config, pool) = setup()?;

    {
        let mut conn = pool.get()?;
        seed_from_file(&mut conn, config.labels_file.as_deref())?;
    }

    let mailer = mailer_from_config(&config).context("invalid mail settings")?;
    let llm = llm_from_config(&config);
    let bind_addr = config.bind_addr.clone();
    let base_url = config.base_url.clone();

    let state = AppState::new(pool, config, mailer, llm);
    tokio::fs::create_dir_all(state.images.dir())
        .await
        .with_context(|| format!("failed to create {}", state.images.dir().display()))?;
    spawn_cleanup(state.pool.clone());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Server listening on {}", listener.local_addr()?);
    tracing::info!("Swagger UI available at {}/swagger-ui/", base_url);
    tracing::info!("OpenAPI spec available at {}/api-docs/openapi.json", base_url);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
