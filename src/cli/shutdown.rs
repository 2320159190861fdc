use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Cancels `cancelation` on Ctrl-C. Collection itself can't be interrupted, the CLI just stops
/// waiting for it.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl-C");
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => {},
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_once_cancelled_elsewhere() {
        let token = CancellationToken::new();
        let handle = tokio::spawn(detect_shutdown(token.clone()));
        token.cancel();
        handle.await.unwrap();
    }
}
