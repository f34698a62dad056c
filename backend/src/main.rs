use std::sync::Arc;
use backend::{
    accounts::AccountProcessor,
    build_rocket,
    config::AppConfig,
    processor::VoteProcessor,
    queries::PgStore,
    routes::AppState,
};
use shuttle_runtime::CustomError;
use sqlx::PgPool;
use tracing::info;

#[shuttle_runtime::main]
async fn rocket(
    #[shuttle_shared_db::Postgres] pool: PgPool,
    #[shuttle_runtime::Secrets] secret_store: shuttle_runtime::SecretStore,
) -> shuttle_rocket::ShuttleRocket {
    info!("🚀 Starting ballot box server");

    let config = AppConfig::from_lookup(|key| secret_store.get(key)).map_err(CustomError::new)?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(CustomError::new)?;

    info!("📋 Migrations complete");

    let store = Arc::new(PgStore::new(pool));
    let state = AppState::new(store, &config);

    if !config.seed_options.is_empty() {
        VoteProcessor::seed_options(&*state.store, &config.seed_options)
            .await
            .map_err(CustomError::new)?;
        info!("🗳️ Seeded {} vote options", config.seed_options.len());
    }

    if let Some(seed) = &config.admin {
        AccountProcessor::ensure_admin(&*state.store, &state.passwords, seed)
            .await
            .map_err(CustomError::new)?;
    }

    Ok(build_rocket(state, config.cors_origin.clone()).into())
}
