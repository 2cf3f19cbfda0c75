use engine_logging::{engine_error, engine_info, engine_warn};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Cancels `token` on Ctrl+C or SIGTERM. The in-flight batch is allowed to
/// finish; the orchestrator stops at the next batch boundary.
pub async fn cancel_on_shutdown(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            engine_error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                engine_warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => engine_info!("Received Ctrl+C, finishing current batch"),
        _ = terminate => engine_info!("Received SIGTERM, finishing current batch"),
    }
    token.cancel();
}
