//! # Rusty-Writers Binary
//!
//! The entry point that assembles the application based on compile-time features.

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use rw_api::middleware::{cors_policy, standard_middleware};
use rw_api::{configure_routes, AppState};
use rw_config::Settings;
use rw_core::{
    DocumentStore, OfflineCritic, PasswordHasher, PersistenceAdapter, StoryCritic, StoryService,
    UserService,
};

#[cfg(not(feature = "auth-argon2"))]
compile_error!("rusty-writers needs a password hasher; enable the `auth-argon2` feature");

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Settings::load().context("failed to load settings")?;

    // 1. Persistence
    let adapter = persistence(&settings);

    // 2. Password hashing
    let hasher: Arc<dyn PasswordHasher> = Arc::new(rw_auth_argon2::Argon2Hasher::new());

    // 3. Critic
    let critic = critic(&settings)?;

    let store = Arc::new(DocumentStore::new(adapter));
    store.hydrate().await.context("failed to load the document store")?;

    let state = web::Data::new(AppState {
        stories: StoryService::new(store.clone(), critic)
            .with_critic_timeout(settings.critic.timeout()),
        users: UserService::new(store, hasher),
    });

    let (host, port) = settings.bind_addr();
    log::info!("Rusty-Writers starting on http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(standard_middleware())
            .wrap(cors_policy())
            .configure(configure_routes)
    })
    .bind((host, port))?
    .run()
    .await?;

    Ok(())
}

#[cfg(feature = "persist-file")]
fn persistence(settings: &Settings) -> Arc<dyn PersistenceAdapter> {
    let storage = &settings.storage;
    let adapter = rw_persist_file::FilePersistence::new(storage.data_dir.clone(), &storage.key);
    log::info!("persisting to {}", adapter.path().display());
    Arc::new(adapter)
}

#[cfg(not(feature = "persist-file"))]
fn persistence(_settings: &Settings) -> Arc<dyn PersistenceAdapter> {
    log::warn!("file persistence disabled; data lives only as long as the process");
    Arc::new(rw_core::MemoryPersistence::new())
}

#[cfg(feature = "critic-openrouter")]
fn critic(settings: &Settings) -> anyhow::Result<Arc<dyn StoryCritic>> {
    let cfg = &settings.critic;
    let Some(api_key) = cfg.api_key() else {
        log::warn!("no critic API key set; stories get the fallback rating");
        return Ok(Arc::new(OfflineCritic));
    };
    let critic = rw_critic_openrouter::OpenRouterCritic::new(
        &cfg.base_url,
        &cfg.model,
        Some(api_key.to_string()),
    )
    .context("failed to build the critic client")?
    .with_site(cfg.site_url.clone(), cfg.site_name.clone())
    .with_request_timeout(cfg.timeout());
    log::info!("critic model: {}", critic.model());
    Ok(Arc::new(critic))
}

#[cfg(not(feature = "critic-openrouter"))]
fn critic(_settings: &Settings) -> anyhow::Result<Arc<dyn StoryCritic>> {
    log::warn!("critic disabled; stories get the fallback rating");
    Ok(Arc::new(OfflineCritic))
}
