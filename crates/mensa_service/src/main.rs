mod api;
mod config;
mod database;
mod dialogue;
mod directory;
mod dishes;
mod error;
mod menu;
mod openmensa;
mod ratings;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{CONFIG, DISH_UPDATE_COOLDOWN, MENSA_REFRESH_INTERVAL};
use crate::dialogue::context::ContextStore;
use crate::dialogue::DialogueEngine;
use crate::directory::CanteenDirectory;
use crate::dishes::DishIndex;
use crate::menu::MenuService;
use crate::openmensa::OpenMensaClient;
use crate::ratings::RatingStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(CONFIG.tracing_level()).init();
    info!("mensa-service {} starting", env!("CARGO_PKG_VERSION"));

    let db = Arc::new(database::setup_database().await?);

    let client = Arc::new(OpenMensaClient::new(CONFIG.openmensa_endpoint.clone()));
    let dishes = Arc::new(DishIndex::new(db.clone(), DISH_UPDATE_COOLDOWN));
    let directory = Arc::new(CanteenDirectory::new(
        db.clone(),
        client.clone(),
        MENSA_REFRESH_INTERVAL,
        CONFIG.max_candidates,
    ));
    let menu = Arc::new(MenuService::new(client, dishes.clone()));
    let ratings = Arc::new(RatingStore::new(db.clone()));
    let contexts = Arc::new(ContextStore::new());
    let engine = Arc::new(DialogueEngine::new(
        directory.clone(),
        menu.clone(),
        ratings.clone(),
        contexts.clone(),
    ));

    // Startup must not depend on OpenMensa being reachable.
    match directory.refresh_all().await {
        Ok(count) if count > 0 => info!("canteen directory primed with {} canteens", count),
        Ok(_) => {}
        Err(e) => warn!("initial canteen refresh failed: {:#}", e),
    }

    let ttl = CONFIG.context_ttl();
    let sweep_contexts = contexts.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60 * 60));
        loop {
            interval.tick().await;
            let evicted = sweep_contexts.evict_idle(ttl);
            if evicted > 0 {
                info!(evicted, remaining = sweep_contexts.len(), "idle conversation contexts dropped");
            }
        }
    });

    let app = api::router(db, directory, dishes, menu, ratings, engine).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let listener = tokio::net::TcpListener::bind(&CONFIG.bind).await?;
    info!("listening on {}", CONFIG.bind);
    axum::serve(listener, app).await?;
    Ok(())
}
