#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("queue {target}: {source:?}")]
    Queue {
        target: String,
        source: gateway_api::GatewayError,
    },

    #[error("bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("http server: {0}")]
    Serve(std::io::Error),

    #[error("signal: {0}")]
    Signal(#[from] std::io::Error),
}
