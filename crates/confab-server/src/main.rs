//! Ingestion service binary: wires the metadata store, the object store
//! gateway, the sync engine, the analytics pool and the HTTP surface.

use std::net::SocketAddr;
use std::sync::Arc;

use analytics_worker::AnalyticsPool;
use blob_store::S3Config;
use confab_server::config::Config;
use confab_server::{api, logging, shutdown};
use meta_store::Database;
use sync_engine::SyncEngine;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let config = Config::from_env()?;

    let database = async {
        let db = Database::connect(&config.database_url, config.db_max_connections).await?;
        db.ensure_schema().await?;
        Ok::<_, meta_store::Error>(db)
    };

    let blobs = S3Config {
        bucket: config.bucket.clone(),
        endpoint: config.s3_endpoint.clone(),
        region: config.s3_region.clone(),
        force_path_style: config.s3_endpoint.is_some(),
    }
    .connect();

    let (database, blobs) = tokio::join!(database, blobs);
    let database = match database {
        Ok(db) => db,
        Err(error) => {
            tracing::error!(
                message = "error initializing metadata store",
                error.display = %error,
                alert = true,
            );
            return Err(error.into());
        }
    };

    let engine = SyncEngine::new(database, Arc::new(blobs), config.engine_config());

    let worker_shutdown = CancellationToken::new();
    let analytics = AnalyticsPool::spawn(
        engine.clone(),
        config.analytics_config(),
        worker_shutdown.clone(),
    );

    let state = api::AppState::new(
        engine,
        config.append_rpm_per_user,
        config.validate_rpm_per_ip,
    );
    let app = api::router(state, config.request_timeout);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(message = "listening", %addr, bucket = %config.bucket);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown::signal_received())
    .await?;

    // requests have drained; stop the workers and wait for their in-flight
    // sessions before exiting
    worker_shutdown.cancel();
    analytics.join().await;

    Ok(())
}
