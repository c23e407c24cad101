use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use codec_msgpack::MsgpackCodec;
use gateway_api::{EnvelopeCodec, EnvelopeQueue};
use queue_memory::MemoryQueue;
use queue_redis::{RedisMode, RedisQueue, redact_url};

use crate::config::{QueueConfig, QueueKind, ServeArgs, ServerConfig};
use crate::error::ServerError;

pub async fn run(args: ServeArgs) -> Result<(), ServerError> {
    tracing::info!("gateway-server starting");

    // --- Load config ---
    let config = ServerConfig::resolve(&args)?;
    match &args.config {
        Some(path) => tracing::info!(config = %path, "loaded config"),
        None => tracing::info!("no config file, using defaults"),
    }

    // --- Queue ---
    let queue = connect_queue(&config.queue).await?;
    tracing::info!(
        queue = %queue.describe(),
        name = %config.queue.name,
        "queue connected"
    );

    // --- Codec ---
    let codec: Arc<dyn EnvelopeCodec> = Arc::new(MsgpackCodec);
    tracing::info!(codec = codec.name(), "envelope codec ready");

    // --- HTTP ---
    let settings = config.settings();
    tracing::info!(
        append_timeout = ?settings.append_timeout,
        trace_header = ?settings.trace_header,
        "gateway settings"
    );
    let app = gateway_http::router(queue, codec, settings);

    let listener = TcpListener::bind(&config.listen)
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.listen.clone(),
            source,
        })?;
    let local = listener
        .local_addr()
        .map_or_else(|_| config.listen.clone(), |a| a.to_string());

    let token = CancellationToken::new();
    let http_token = token.clone();
    let mut http_handle = tokio::spawn(async move {
        gateway_http::serve(listener, app, http_token).await
    });

    tracing::info!(addr = %local, path = gateway_http::SUBMIT_PATH, "gateway listening");

    // --- Wait for shutdown signal or server exit ---
    tokio::select! {
        signal = shutdown_signal() => signal?,
        joined = &mut http_handle => {
            // Server stopped on its own: surface the cause.
            return match joined {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(ServerError::Serve(e)),
                Err(e) => Err(ServerError::Serve(std::io::Error::other(e))),
            };
        }
    }
    tracing::info!("shutting down...");

    // Stop accepting; in-flight requests keep running until the grace period ends.
    token.cancel();

    let grace = config.shutdown_grace();
    match tokio::time::timeout(grace, &mut http_handle).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "http server error"),
        Ok(Err(e)) => tracing::error!(error = %e, "http server task failed"),
        Err(_) => {
            tracing::warn!(grace = ?grace, "in-flight requests still running, aborting");
            http_handle.abort();
        }
    }

    tracing::info!("shutdown complete");
    Ok(())
}

async fn connect_queue(config: &QueueConfig) -> Result<Arc<dyn EnvelopeQueue>, ServerError> {
    let queue: Arc<dyn EnvelopeQueue> = match config.kind {
        QueueKind::Memory => Arc::new(MemoryQueue::new(config.max_entries)),
        QueueKind::RedisList | QueueKind::RedisStream => {
            let mode = if config.kind == QueueKind::RedisStream {
                RedisMode::Stream {
                    field: config.stream_field.clone(),
                }
            } else {
                RedisMode::List
            };
            let queue = RedisQueue::connect(&config.url, mode)
                .await
                .map_err(|source| ServerError::Queue {
                    target: redact_url(&config.url),
                    source,
                })?;
            Arc::new(queue)
        }
    };
    Ok(queue)
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<(), ServerError> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        r = tokio::signal::ctrl_c() => r?,
        _ = term.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<(), ServerError> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_queue_needs_no_broker() {
        let config = QueueConfig {
            kind: QueueKind::Memory,
            url: String::new(),
            max_entries: 1,
            ..QueueConfig::default()
        };
        let queue = connect_queue(&config).await.unwrap();
        queue.ping().await.unwrap();
        assert_eq!(queue.describe(), "memory (max_entries=1)");

        queue.push("q", vec![1, 2, 3]).await.unwrap();
        let full = queue.push("q", vec![4]).await.unwrap_err();
        assert_eq!(full.kind(), gateway_api::ErrorKind::Io);
    }

    #[tokio::test]
    async fn malformed_redis_url_fails_startup() {
        let config = QueueConfig {
            url: "not a url".into(),
            ..QueueConfig::default()
        };
        match connect_queue(&config).await {
            Err(ServerError::Queue { target, .. }) => assert_eq!(target, "not a url"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected connect failure"),
        }
    }
}
