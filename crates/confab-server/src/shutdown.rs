//! Graceful-shutdown signal. Resolves on SIGTERM (the platform's stop
//! signal) or Ctrl-C; if neither handler can be installed we block forever
//! rather than shutting down an otherwise healthy server.

use tokio::signal::unix::{SignalKind, signal};

pub async fn signal_received() {
    let sigterm = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::warn!(
                    message = "error setting up SIGTERM handler, can't shut down gracefully",
                    ?error
                );
                std::future::pending::<()>().await;
            }
        }
    };

    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = sigterm => tracing::info!("SIGTERM recieved, shutting down"),
        _ = ctrl_c => tracing::info!("interrupt recieved, shutting down"),
    }
}
