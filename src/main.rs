//! Harbor - per-user registry of named object-storage endpoints

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use harbor::{
    config::Args,
    db::{
        schemas::{StorageEntryDoc, STORAGE_COLLECTION},
        MongoClient,
    },
    registry::StorageRegistry,
    server,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("harbor={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Harbor - storage endpoint registry");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Endpoint prefix: {}", args.endpoint_prefix);
    info!("======================================");

    // Connect to MongoDB (optional in dev mode)
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => {
            info!("MongoDB connected successfully");
            Some(client)
        }
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB connection failed (dev mode, continuing without): {}", e);
                None
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    // Open the storages collection once and hand it to the registry; the
    // handle is shared across all requests for the process lifetime.
    let registry = match &mongo {
        Some(client) => {
            match client
                .collection::<StorageEntryDoc>(STORAGE_COLLECTION)
                .await
            {
                Ok(collection) => Some(Arc::new(StorageRegistry::new(
                    collection,
                    args.endpoint_prefix.clone(),
                ))),
                Err(e) => {
                    error!("Failed to open storages collection: {}", e);
                    std::process::exit(1);
                }
            }
        }
        None => None,
    };

    // Create application state
    let state = Arc::new(server::AppState::new(args, mongo, registry));

    // Run the server
    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
